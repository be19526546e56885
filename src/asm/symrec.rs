//! The symbol table.
//!
//! Symbols are created on first use or definition and live in an arena addressed by `SymbolId`.
//! Registered symbols are also indexed by name; traversal visits them in name order.
//! Symbols created outside the table (e.g. transient labels such as `$`) are invisible to lookup and traversal
//! and must be destroyed by whoever created them via `SymbolTable::delete()`.
//!
//! Problems such as duplicate definitions are reported to a `Diagnostics` sink and processing continues.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use rug::Integer;

use super::arch::ArchBytecodes;
use super::bytecode::{BytecodeId, get_offset};
use super::expr::{Expr, Lookup, SymbolLookup};
use super::objfmt::{DeclData, ObjectFormat};
use super::section::{SectionId, Sections};
use crate::common::{SourceLoc, Diagnostics, DiagnosticKind};
use crate::common::util::{Indent, Punctuated};

macro_rules! impl_flag {
    ($mask_name:ident, $set:ident, $get:ident => $from:ty [ $mask:literal ]) => {
        pub const $mask_name: $from = $mask;
        pub fn $set(&mut self) { self.0 |= $mask }
        pub const fn $get(self) -> bool { (self.0 & $mask) != 0 }
    }
}

/// The bookkeeping state of a symbol (independent flags).
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct SymStatus(pub u8);
impl SymStatus {
    impl_flag! { MASK_USED, set_used, get_used                => u8 [0x01] }
    impl_flag! { MASK_DEFINED, set_defined, get_defined       => u8 [0x02] }
    impl_flag! { MASK_VALUED, set_valued, get_valued          => u8 [0x04] }
    impl_flag! { MASK_NOTINTABLE, set_notintable, get_notintable => u8 [0x08] }

    fn names(self) -> Vec<&'static str> {
        let mut res = vec![];
        if self.get_used() { res.push("Used"); }
        if self.get_defined() { res.push("Defined"); }
        if self.get_valued() { res.push("Valued"); }
        if self.get_notintable() { res.push("Not in Table"); }
        res
    }
}
impl fmt::Display for SymStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", Punctuated::join_or(&self.names(), ",", "None"))
    }
}

/// A single linkage visibility, as given to `SymbolTable::declare()`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Visibility {
    Global,
    Common,
    Extern,
}
impl Visibility {
    fn mask(self) -> u8 {
        match self {
            Visibility::Global => VisibilityFlags::MASK_GLOBAL,
            Visibility::Common => VisibilityFlags::MASK_COMMON,
            Visibility::Extern => VisibilityFlags::MASK_EXTERN,
        }
    }
    /// Gets the declaration data slot used by this visibility.
    pub fn slot(self) -> DataSlot {
        match self {
            Visibility::Global => DataSlot::Global,
            Visibility::Common | Visibility::Extern => DataSlot::CommonExtern,
        }
    }
}

/// The set of visibilities a symbol has been declared with (empty means local).
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct VisibilityFlags(pub u8);
impl VisibilityFlags {
    impl_flag! { MASK_GLOBAL, set_global, get_global => u8 [0x01] }
    impl_flag! { MASK_COMMON, set_common, get_common => u8 [0x02] }
    impl_flag! { MASK_EXTERN, set_extern, get_extern => u8 [0x04] }

    pub const fn is_local(self) -> bool {
        self.0 == 0
    }
    pub const fn contains(self, vis: Visibility) -> bool {
        let mask = match vis {
            Visibility::Global => Self::MASK_GLOBAL,
            Visibility::Common => Self::MASK_COMMON,
            Visibility::Extern => Self::MASK_EXTERN,
        };
        (self.0 & mask) != 0
    }
    /// Checks if the symbol is common or extern (i.e. defined in some other way than by this file's content).
    pub const fn is_common_or_extern(self) -> bool {
        (self.0 & mask!(VisibilityFlags: MASK_COMMON | MASK_EXTERN)) != 0
    }

    fn names(self) -> Vec<&'static str> {
        let mut res = vec![];
        if self.get_global() { res.push("Global"); }
        if self.get_common() { res.push("Common"); }
        if self.get_extern() { res.push("Extern"); }
        res
    }
}
impl fmt::Display for VisibilityFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", Punctuated::join_or(&self.names(), ",", "Local"))
    }
}

/// The two places object-format declaration data can be attached to a symbol.
/// Common and extern share a slot since a symbol can never legally be both.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DataSlot {
    Global,
    CommonExtern,
}

/// Object-format data attached to a symbol, along with the visibility it was declared with.
#[derive(Default)]
struct BackendData {
    global: Option<(Visibility, DeclData)>,
    common_extern: Option<(Visibility, DeclData)>,
}
impl BackendData {
    fn slot(&self, slot: DataSlot) -> &Option<(Visibility, DeclData)> {
        match slot {
            DataSlot::Global => &self.global,
            DataSlot::CommonExtern => &self.common_extern,
        }
    }
    fn slot_mut(&mut self, slot: DataSlot) -> &mut Option<(Visibility, DeclData)> {
        match slot {
            DataSlot::Global => &mut self.global,
            DataSlot::CommonExtern => &mut self.common_extern,
        }
    }
}
impl fmt::Debug for BackendData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let show = |x: &Option<(Visibility, DeclData)>| x.as_ref().map(|(vis, _)| *vis);
        write!(f, "BackendData {{ global: {:?}, common_extern: {:?} }}", show(&self.global), show(&self.common_extern))
    }
}

/// The broad type of a symbol.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SymType {
    /// Not defined by this file's content (yet). Common/extern symbols stay this way.
    Unknown,
    Equ,
    Label,
}

/// The location a label refers to: just after `preceding` in `section` (or the start of the section if `None`).
///
/// These are handles, not ownership: the section and its bytecodes outlive every symbol that refers to them.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Label {
    pub section: SectionId,
    pub preceding: Option<BytecodeId>,
}

/// The value of a symbol. Its variant is fixed by the first successful definition.
#[derive(Clone, Debug, PartialEq)]
pub enum SymValue {
    Unknown,
    Equ(Expr),
    Label(Label),
}

#[derive(Debug)]
pub struct Symbol {
    name: String,
    value: SymValue,
    status: SymStatus,
    visibility: VisibilityFlags,
    /// Where the symbol was first used, or else where it was defined/declared.
    loc: SourceLoc,
    backend: BackendData,
}
impl Symbol {
    fn new(name: &str, loc: &SourceLoc, in_table: bool) -> Self {
        let mut status = SymStatus::default();
        if !in_table { status.set_notintable(); }
        Self { name: name.to_owned(), value: SymValue::Unknown, status, visibility: Default::default(), loc: loc.clone(), backend: Default::default() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn visibility(&self) -> VisibilityFlags {
        self.visibility
    }
    pub fn status(&self) -> SymStatus {
        self.status
    }
    pub fn loc(&self) -> &SourceLoc {
        &self.loc
    }
    pub fn value(&self) -> &SymValue {
        &self.value
    }
    pub fn sym_type(&self) -> SymType {
        match self.value {
            SymValue::Unknown => SymType::Unknown,
            SymValue::Equ(_) => SymType::Equ,
            SymValue::Label(_) => SymType::Label,
        }
    }
    /// Gets the expression of an equ symbol (`None` for any other type).
    pub fn equ(&self) -> Option<&Expr> {
        match &self.value {
            SymValue::Equ(expr) => Some(expr),
            _ => None,
        }
    }
    pub fn label(&self) -> Option<Label> {
        match &self.value {
            SymValue::Label(label) => Some(*label),
            _ => None,
        }
    }
    /// Checks if declaration data is attached in the given slot.
    pub fn has_decl_data(&self, slot: DataSlot) -> bool {
        self.backend.slot(slot).is_some()
    }
    /// Gets the declaration data attached in the given slot.
    pub fn decl_data(&self, slot: DataSlot) -> Option<&DeclData> {
        self.backend.slot(slot).as_ref().map(|(_, data)| data)
    }

    /// Checks if the symbol was used but never defined.
    pub fn is_undefined_use(&self) -> bool {
        self.status.get_used() && !self.status.get_defined()
    }
}

/// A handle to a symbol in a `SymbolTable`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SymbolId(usize);

/// Everything needed to print symbols in full.
pub struct DumpContext<'a> {
    pub sections: &'a Sections,
    pub arch: &'a dyn ArchBytecodes,
    pub objfmt: &'a dyn ObjectFormat,
}

/// The symbol table of a translation unit.
#[derive(Debug, Default)]
pub struct SymbolTable {
    arena: Vec<Option<Symbol>>,
    names: BTreeMap<String, SymbolId>,
}
impl SymbolTable {
    /// Constructs an empty symbol table.
    pub fn new() -> Self {
        Self { arena: vec![], names: Default::default() }
    }

    fn get_or_new(&mut self, name: &str, in_table: bool, loc: &SourceLoc) -> SymbolId {
        if in_table {
            if let Some(&id) = self.names.get(name) {
                return id;
            }
        }
        let id = SymbolId(self.arena.len());
        self.arena.push(Some(Symbol::new(name, loc, in_table)));
        if in_table {
            self.names.insert(name.to_owned(), id);
        }
        id
    }
    fn sym_mut(&mut self, id: SymbolId) -> &mut Symbol {
        match self.arena.get_mut(id.0) {
            Some(Some(sym)) => sym,
            _ => unreachable!("symbol handle {:?} was just created or looked up", id),
        }
    }

    /// Marks `name` as used, creating it if it does not exist.
    /// Using an undefined symbol is not an error until `finalize_parser_pass()`.
    pub fn use_symbol(&mut self, name: &str, loc: &SourceLoc) -> SymbolId {
        let id = self.get_or_new(name, true, loc);
        self.sym_mut(id).status.set_used();
        id
    }

    fn define(&mut self, name: &str, value: SymValue, in_table: bool, loc: &SourceLoc, diags: &mut Diagnostics) -> (SymbolId, bool) {
        let id = self.get_or_new(name, in_table, loc);
        let sym = self.sym_mut(id);
        if sym.status.get_defined() {
            diags.error(loc.clone(), DiagnosticKind::DuplicateDefinition { name: name.to_owned(), first_line: sym.loc.line_num });
            return (id, false);
        }
        sym.loc = loc.clone();
        sym.value = value;
        sym.status.set_defined();
        (id, true)
    }

    /// Defines `name` as an alias for `expr`.
    /// If it was already defined, a diagnostic is reported and the original definition is kept.
    pub fn define_equ(&mut self, name: &str, expr: Expr, loc: &SourceLoc, diags: &mut Diagnostics) -> SymbolId {
        let (id, ok) = self.define(name, SymValue::Equ(expr), true, loc, diags);
        if ok {
            self.sym_mut(id).status.set_valued();
        }
        id
    }

    /// Defines `name` as the location just after `preceding` in `section` (or the start of the section if `None`).
    /// If `in_table` is false, a fresh symbol is created outside the table (the caller must `delete()` it).
    pub fn define_label(&mut self, name: &str, section: SectionId, preceding: Option<BytecodeId>, in_table: bool, loc: &SourceLoc, diags: &mut Diagnostics) -> SymbolId {
        self.define(name, SymValue::Label(Label { section, preceding }), in_table, loc, diags).0
    }

    /// Declares the visibility of `name`, attaching object-format data if given.
    ///
    /// Common and extern declarations also count as definitions.
    /// It is an error to declare something common/extern if it was already defined (unless it was extern),
    /// or to mix common and extern. On error, `data` is handed back to the object format for destruction.
    pub fn declare(&mut self, name: &str, vis: Visibility, data: Option<DeclData>, loc: &SourceLoc, objfmt: &dyn ObjectFormat, diags: &mut Diagnostics) -> SymbolId {
        let id = self.get_or_new(name, true, loc);
        let sym = self.sym_mut(id);

        let conflict = (sym.status.get_defined() && !sym.visibility.get_extern())
            || (sym.visibility.get_common() && vis == Visibility::Extern)
            || (sym.visibility.get_extern() && vis == Visibility::Common);
        if conflict {
            diags.error(loc.clone(), DiagnosticKind::DuplicateDefinition { name: name.to_owned(), first_line: sym.loc.line_num });
            if let Some(data) = data {
                objfmt.declare_data_delete(vis, data);
            }
            return id;
        }

        sym.loc = loc.clone();
        sym.visibility.0 |= vis.mask();
        if vis != Visibility::Global {
            sym.status.set_defined();
        }
        if let Some(data) = data {
            if let Some((old_vis, old)) = sym.backend.slot_mut(vis.slot()).replace((vis, data)) {
                objfmt.declare_data_delete(old_vis, old);
            }
        }
        id
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.arena.get(id.0).and_then(Option::as_ref)
    }
    /// Looks up a registered symbol by name.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.names.get(name).copied()
    }
    pub fn get_name(&self, id: SymbolId) -> Option<&str> {
        self.get(id).map(Symbol::name)
    }
    pub fn get_visibility(&self, id: SymbolId) -> Option<VisibilityFlags> {
        self.get(id).map(Symbol::visibility)
    }
    pub fn get_equ(&self, id: SymbolId) -> Option<&Expr> {
        self.get(id).and_then(Symbol::equ)
    }
    /// Gets the number of registered symbols.
    pub fn len(&self) -> usize {
        self.names.len()
    }
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Gets the integer value of a symbol if it can be determined right now.
    /// Equ symbols are evaluated; labels are only considered if `resolve_label` is set and their offset is known.
    pub fn get_int_value(&self, id: SymbolId, resolve_label: bool, sections: &Sections) -> Option<Integer> {
        match self.get(id)?.value() {
            SymValue::Unknown => None,
            SymValue::Equ(expr) => expr.eval_int(self).ok(),
            SymValue::Label(label) => {
                if !resolve_label { return None; }
                get_offset(sections.get(label.section)?, label.preceding).map(Integer::from)
            }
        }
    }

    /// Calls `visitor` on every registered symbol in name order.
    /// Stops early and returns `false` if `visitor` returns `false`; otherwise returns `true`.
    pub fn traverse<C, F>(&self, ctx: &mut C, mut visitor: F) -> bool where F: FnMut(&Symbol, &mut C) -> bool {
        for id in self.names.values() {
            if let Some(sym) = self.get(*id) {
                if !visitor(sym, ctx) { return false; }
            }
        }
        true
    }

    /// Reports every symbol that was used but never defined (at its first use),
    /// followed by a single note at the earliest such location.
    pub fn finalize_parser_pass(&self, diags: &mut Diagnostics) {
        let mut first_undef: Option<SourceLoc> = None;
        self.traverse(&mut *diags, |sym, diags| {
            if sym.is_undefined_use() {
                diags.error(sym.loc.clone(), DiagnosticKind::UndefinedSymbol { name: sym.name.clone() });
                if first_undef.as_ref().map_or(true, |first| sym.loc.line_num < first.line_num) {
                    first_undef = Some(sym.loc.clone());
                }
            }
            true
        });
        if let Some(loc) = first_undef {
            diags.note(loc, DiagnosticKind::UndefinedSummary);
        }
    }

    fn delete_one(sym: Symbol, objfmt: &dyn ObjectFormat) {
        let Symbol { value, visibility, backend, .. } = sym;
        drop(value);
        for slot in [backend.global, backend.common_extern].iter_mut() {
            if let Some((vis, data)) = slot.take() {
                if visibility.contains(vis) {
                    objfmt.declare_data_delete(vis, data);
                }
            }
        }
    }

    /// Destroys every registered symbol (and everything it owns), leaving the table empty.
    /// Symbols created outside the table are unaffected.
    ///
    /// Once no such symbol is alive either, the storage is reclaimed so the table can be reused for another
    /// translation unit. Handles obtained before that point must not be used afterwards.
    pub fn delete_all(&mut self, objfmt: &dyn ObjectFormat) {
        tracing::debug!(count = self.names.len(), "deleting symbol table");
        for (_, id) in std::mem::take(&mut self.names) {
            if let Some(sym) = self.arena[id.0].take() {
                Self::delete_one(sym, objfmt);
            }
        }
        if self.arena.iter().all(Option::is_none) {
            self.arena.clear();
        }
    }

    /// Destroys a symbol created outside the table. Symbols in the table are left alone.
    pub fn delete(&mut self, id: SymbolId, objfmt: &dyn ObjectFormat) {
        let slot = match self.arena.get_mut(id.0) {
            Some(slot) => slot,
            None => return,
        };
        if slot.as_ref().map_or(false, |sym| sym.status.get_notintable()) {
            if let Some(sym) = slot.take() {
                Self::delete_one(sym, objfmt);
            }
        }
    }

    pub fn print_all(&self, f: &mut dyn Write, indent: usize, ctx: &DumpContext) -> io::Result<()> {
        for id in self.names.values() {
            if let Some(sym) = self.get(*id) {
                writeln!(f, "{}Symbol `{}'", Indent(indent), sym.name)?;
                self.print(f, indent + 1, sym, ctx)?;
            }
        }
        Ok(())
    }

    pub fn print(&self, f: &mut dyn Write, indent: usize, sym: &Symbol, ctx: &DumpContext) -> io::Result<()> {
        let ind = Indent(indent);
        match &sym.value {
            SymValue::Unknown => writeln!(f, "{}-Unknown (Common/Extern)-", ind)?,
            SymValue::Equ(expr) => {
                writeln!(f, "{}_EQU_", ind)?;
                writeln!(f, "{}Expn={}", ind, expr)?;
            }
            SymValue::Label(label) => {
                writeln!(f, "{}_Label_", ind)?;
                writeln!(f, "{}Section:", ind)?;
                match ctx.sections.get(label.section) {
                    Some(sect) => sect.print(f, indent + 1, false, ctx.arch)?,
                    None => writeln!(f, "{}(missing)", ind.next())?,
                }
                match label.preceding {
                    None => writeln!(f, "{}First bytecode", ind)?,
                    Some(bc) => {
                        writeln!(f, "{}Preceding bytecode:", ind)?;
                        match ctx.sections.bytecode(label.section, bc) {
                            Some(bc) => bc.print(f, indent + 1, ctx.arch)?,
                            None => writeln!(f, "{}(deleted)", ind.next())?,
                        }
                    }
                }
            }
        }

        writeln!(f, "{}Status={}", ind, sym.status)?;
        writeln!(f, "{}Visibility={}", ind, sym.visibility)?;

        if sym.visibility.get_global() {
            writeln!(f, "{}Global object format-specific data:", ind)?;
            let data = sym.backend.global.as_ref().map(|(_, data)| &**data);
            ctx.objfmt.declare_data_print(f, indent + 1, Visibility::Global, data)?;
        }
        if sym.visibility.is_common_or_extern() {
            writeln!(f, "{}Common/Extern object format-specific data:", ind)?;
            let vis = if sym.visibility.get_common() { Visibility::Common } else { Visibility::Extern };
            let data = sym.backend.common_extern.as_ref().map(|(_, data)| &**data);
            ctx.objfmt.declare_data_print(f, indent + 1, vis, data)?;
        }

        writeln!(f, "{}Filename=\"{}\" Line Number={}", ind, sym.loc.file_or("(NULL)"), sym.loc.line_num)
    }
}
impl SymbolLookup for SymbolTable {
    fn lookup_expr(&self, name: &str) -> Lookup<'_> {
        match self.lookup(name).and_then(|id| self.get(id)) {
            None => Lookup::Undefined,
            Some(sym) => match &sym.value {
                SymValue::Equ(expr) => Lookup::Expr(expr),
                _ if sym.status.get_defined() => Lookup::Unresolved,
                _ => Lookup::Undefined,
            }
        }
    }
}

#[test]
fn test_flag_display() {
    let mut status = SymStatus::default();
    assert_eq!(status.to_string(), "None");
    status.set_used();
    status.set_defined();
    assert_eq!(status.to_string(), "Used,Defined");
    status.set_notintable();
    assert_eq!(status.to_string(), "Used,Defined,Not in Table");

    let mut vis = VisibilityFlags::default();
    assert!(vis.is_local());
    assert_eq!(vis.to_string(), "Local");
    vis.set_global();
    assert!(!vis.is_common_or_extern());
    vis.set_extern();
    assert!(vis.is_common_or_extern());
    assert!(vis.contains(Visibility::Extern) && !vis.contains(Visibility::Common));
    assert_eq!(vis.to_string(), "Global,Extern");
}
#[test]
fn test_visibility_slots() {
    assert_eq!(Visibility::Global.slot(), DataSlot::Global);
    assert_eq!(Visibility::Common.slot(), DataSlot::CommonExtern);
    assert_eq!(Visibility::Extern.slot(), DataSlot::CommonExtern);
}
#[test]
fn test_use_then_define() {
    let mut s = SymbolTable::new();
    let mut diags = Diagnostics::new();
    let a = s.use_symbol("foo", &SourceLoc::new("a.asm", 2));
    assert_eq!(s.get(a).unwrap().sym_type(), SymType::Unknown);
    assert!(s.get(a).unwrap().is_undefined_use());
    let b = s.define_equ("foo", 5.into(), &SourceLoc::new("a.asm", 4), &mut diags);
    assert_eq!(a, b);
    assert!(diags.is_empty());
    let sym = s.get(a).unwrap();
    assert_eq!(sym.status().to_string(), "Used,Defined,Valued");
    assert_eq!(sym.loc().line_num, 4);
    assert_eq!(s.get_int_value(a, false, &Sections::new()).unwrap(), 5);
}
#[test]
fn test_reuse_after_delete_all() {
    use super::objfmt::NullObjectFormat;
    use super::section::Sections;

    let mut s = SymbolTable::new();
    let mut diags = Diagnostics::new();
    let mut sects = Sections::new();
    let text = sects.get_or_create(".text");

    s.use_symbol("a", &SourceLoc::new("a.asm", 1));
    let tmp = s.define_label("$", text, None, false, &SourceLoc::new("a.asm", 2), &mut diags);
    s.use_symbol("b", &SourceLoc::new("a.asm", 3));
    s.delete_all(&NullObjectFormat);
    assert_eq!(s.arena.len(), 3); // the transient label is still alive
    assert_eq!(s.get_name(tmp), Some("$"));

    s.delete(tmp, &NullObjectFormat);
    s.delete_all(&NullObjectFormat);
    assert!(s.arena.is_empty());

    // a second translation unit starts from scratch
    for i in 0..4 {
        s.use_symbol(&format!("sym{}", i), &SourceLoc::new("b.asm", i + 1));
    }
    s.delete_all(&NullObjectFormat);
    assert!(s.arena.is_empty());
    assert!(s.is_empty());
}
