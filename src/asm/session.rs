//! The state of a single translation: everything the parser front end builds into.

use std::any::Any;
use std::collections::BTreeMap;
use std::io::{self, Write};
use rug::Integer;

use super::arch::{ArchBytecodes, NoExtensions};
use super::bytecode::{Bytecode, BytecodeId};
use super::dataval::DataValueList;
use super::expr::Expr;
use super::objfmt::{DeclData, NullObjectFormat, ObjectFormat};
use super::section::{SectionId, Sections};
use super::symrec::{DumpContext, SymbolId, SymbolTable, Visibility};
use crate::common::{Diagnostics, InternalError, SourceLoc};

/// Symbols which are defined before any source is read.
/// Each becomes an equ symbol at line 0.
#[derive(Clone, Debug, Default)]
pub struct Predefines(BTreeMap<String, Expr>);
impl Predefines {
    /// Adds a single predefined symbol.
    /// If it was already defined, returns `Err` with its name and leaves `self` unmodified.
    pub fn define(&mut self, name: &str, value: Expr) -> Result<(), String> {
        if self.0.contains_key(name) {
            return Err(name.to_owned());
        }
        self.0.insert(name.to_owned(), value);
        Ok(())
    }
    /// Appends another set of predefines.
    /// If any new symbol was already defined, returns `Err` with the name of the conflicting symbol.
    /// In the case of an error, `self` is not modified.
    pub fn append(&mut self, other: Predefines) -> Result<(), String> {
        for key in other.0.keys() {
            if self.0.contains_key(key) {
                return Err(key.clone());
            }
        }
        self.0.extend(other.0);
        Ok(())
    }
    pub fn get(&self, name: &str) -> Option<&Expr> {
        self.0.get(name)
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A translation unit in progress.
///
/// The session is the context every operation runs in: it owns the symbol table, the sections,
/// the diagnostics sink, the current source location, and the backend dispatch tables.
pub struct Session {
    arch: Box<dyn ArchBytecodes>,
    objfmt: Box<dyn ObjectFormat>,
    symbols: SymbolTable,
    sections: Sections,
    diags: Diagnostics,
    loc: SourceLoc,
}
impl Default for Session {
    fn default() -> Self {
        Self::new(Box::new(NoExtensions), Box::new(NullObjectFormat), Default::default())
    }
}
impl Session {
    pub fn new(arch: Box<dyn ArchBytecodes>, objfmt: Box<dyn ObjectFormat>, predefines: Predefines) -> Self {
        let mut symbols = SymbolTable::new();
        let mut diags = Diagnostics::new();
        let predef_loc = SourceLoc::default();
        for (name, value) in predefines.0 {
            symbols.define_equ(&name, value, &predef_loc, &mut diags);
        }
        tracing::debug!(predefines = symbols.len(), "session created");
        Self { arch, objfmt, symbols, sections: Sections::new(), diags, loc: Default::default() }
    }

    /// Sets the source location stamped onto everything created from now on.
    pub fn set_location(&mut self, file: &str, line_num: usize) {
        if self.loc.file.as_deref() != Some(file) {
            self.loc.file = Some(file.into());
        }
        self.loc.line_num = line_num;
    }
    pub fn location(&self) -> &SourceLoc {
        &self.loc
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }
    pub fn sections(&self) -> &Sections {
        &self.sections
    }
    pub fn sections_mut(&mut self) -> &mut Sections {
        &mut self.sections
    }
    pub fn diags(&self) -> &Diagnostics {
        &self.diags
    }
    /// Takes all diagnostics recorded so far, leaving the sink empty.
    pub fn take_diags(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diags)
    }
    pub fn arch(&self) -> &dyn ArchBytecodes {
        &*self.arch
    }
    pub fn objfmt(&self) -> &dyn ObjectFormat {
        &*self.objfmt
    }

    pub fn use_symbol(&mut self, name: &str) -> SymbolId {
        self.symbols.use_symbol(name, &self.loc)
    }
    pub fn define_equ(&mut self, name: &str, expr: Expr) -> SymbolId {
        self.symbols.define_equ(name, expr, &self.loc, &mut self.diags)
    }
    pub fn define_label(&mut self, name: &str, section: SectionId, preceding: Option<BytecodeId>, in_table: bool) -> SymbolId {
        self.symbols.define_label(name, section, preceding, in_table, &self.loc, &mut self.diags)
    }
    /// Defines a label at the current end of `section`.
    pub fn define_label_here(&mut self, name: &str, section: SectionId) -> SymbolId {
        let preceding = self.sections.get(section).and_then(|s| s.bcs.last_id());
        self.define_label(name, section, preceding, true)
    }
    pub fn declare(&mut self, name: &str, vis: Visibility, data: Option<DeclData>) -> SymbolId {
        self.symbols.declare(name, vis, data, &self.loc, &*self.objfmt, &mut self.diags)
    }
    /// Destroys a symbol created outside the table.
    pub fn delete_symbol(&mut self, id: SymbolId) {
        self.symbols.delete(id, &*self.objfmt);
    }
    pub fn get_int_value(&self, id: SymbolId, resolve_label: bool) -> Option<Integer> {
        self.symbols.get_int_value(id, resolve_label, &self.sections)
    }

    /// Gets the section with the given name, creating it if needed.
    pub fn section(&mut self, name: &str) -> SectionId {
        self.sections.get_or_create(name)
    }

    pub fn new_empty(&self) -> Bytecode {
        Bytecode::new_empty(self.loc.clone())
    }
    pub fn new_data(&self, values: DataValueList, element_size: u8) -> Bytecode {
        Bytecode::new_data(values, element_size, self.loc.clone())
    }
    pub fn new_reserve(&self, count: Expr, item_size: u8) -> Bytecode {
        Bytecode::new_reserve(count, item_size, self.loc.clone())
    }
    pub fn new_extended(&self, tag: u8, payload: Box<dyn Any>) -> Bytecode {
        Bytecode::new_extended(tag, payload, self.loc.clone())
    }
    /// Appends a bytecode to a section (empty bytecodes are discarded and yield `None`).
    pub fn append_bytecode(&mut self, section: SectionId, bc: Bytecode) -> Option<BytecodeId> {
        self.sections.get_mut(section)?.bcs.append(bc)
    }

    /// Runs the end-of-parse passes: undefined symbol reporting, then bytecode finalization of every section.
    /// Reportable problems go to the diagnostics; the first internal error aborts and is returned.
    pub fn finalize(&mut self) -> Result<(), InternalError> {
        tracing::trace!("finalize start");
        self.symbols.finalize_parser_pass(&mut self.diags);
        for sect in self.sections.iter_mut() {
            sect.bcs.finalize_all(&*self.arch)?;
        }
        tracing::trace!(errors = self.diags.error_count(), "finalize end");
        Ok(())
    }

    /// Writes a debug dump of all sections (with their bytecodes) followed by all symbols.
    pub fn dump(&self, f: &mut dyn Write) -> io::Result<()> {
        writeln!(f, "Sections:")?;
        for (_, sect) in self.sections.iter() {
            sect.print(f, 1, true, &*self.arch)?;
        }
        writeln!(f, "Symbol Table:")?;
        let ctx = DumpContext { sections: &self.sections, arch: &*self.arch, objfmt: &*self.objfmt };
        self.symbols.print_all(f, 1, &ctx)
    }

    /// Destroys everything built so far: every section's bytecodes, then the symbol table.
    /// All of it is destroyed even if a bytecode fails to delete, in which case the first such error is returned.
    pub fn teardown(&mut self) -> Result<(), InternalError> {
        tracing::trace!(sections = self.sections.len(), symbols = self.symbols.len(), "teardown");
        let mut res = Ok(());
        for sect in self.sections.iter_mut() {
            if let Err(e) = sect.bcs.delete_all(&*self.arch) {
                if res.is_ok() { res = Err(e); }
            }
        }
        self.symbols.delete_all(&*self.objfmt);
        res
    }
}

#[test]
fn test_predefines() {
    let mut a = Predefines::default();
    a.define("foo", 1.into()).unwrap();
    assert_eq!(a.define("foo", 2.into()), Err("foo".to_owned()));
    assert_eq!(a.get("foo"), Some(&Expr::from(1)));

    let mut b = Predefines::default();
    b.define("bar", 2.into()).unwrap();
    b.define("foo", 3.into()).unwrap();
    assert_eq!(a.append(b), Err("foo".to_owned()));
    assert_eq!(a.len(), 1);
    assert!(a.get("bar").is_none());

    let mut c = Predefines::default();
    c.define("baz", 4.into()).unwrap();
    a.append(c).unwrap();
    assert_eq!(a.len(), 2);
}
