//! Bytecodes and bytecode lists.
//!
//! A bytecode is one not-yet-finalized unit of section content: raw data, reserved space,
//! or an architecture-specific instruction that is still being assembled.
//! Each section owns a `BytecodeList` holding its bytecodes in program order.

use std::any::Any;
use std::fmt;
use std::io::{self, Write};
use num_traits::FromPrimitive;

use super::arch::ArchBytecodes;
use super::dataval::DataValueList;
use super::expr::{Expr, OP};
use super::section::Section;
use crate::common::{SourceLoc, InternalError};
use crate::common::util::Indent;

/// The tags of the bytecode kinds built into the core.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive)]
#[repr(u8)]
pub enum BuiltinType {
    Empty = 0,
    Data = 1,
    Reserve = 2,
}
/// The first tag available to architecture-specific bytecodes.
pub const EXTENDED_BASE: u8 = 3;

/// How a raw bytecode tag is interpreted.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TagClass {
    Builtin(BuiltinType),
    /// Dispatched to the architecture table.
    Extended,
    /// Neither built in nor in the range of the architecture table.
    Unknown,
}
/// Classifies a raw bytecode tag against the built-in kinds and the given architecture.
pub fn classify(tag: u8, arch: &dyn ArchBytecodes) -> TagClass {
    match BuiltinType::from_u8(tag) {
        Some(t) => TagClass::Builtin(t),
        None if arch.handles(tag) => TagClass::Extended,
        None => TagClass::Unknown,
    }
}

/// The content of a bytecode.
pub enum BytecodeKind {
    /// Placeholder with no content. Never stored in a `BytecodeList`.
    Empty,
    /// Literal values, each emitted with a final width of `element_size` bytes.
    Data { values: DataValueList, element_size: u8 },
    /// Reserved space of `count * item_size` bytes. The count is evaluated by a later pass.
    Reserve { count: Expr, item_size: u8 },
    /// An architecture-specific kind, only interpretable through the architecture's dispatch table.
    Extended { tag: u8, payload: Box<dyn Any> },
}
impl BytecodeKind {
    /// Gets the raw tag of this kind.
    pub fn tag(&self) -> u8 {
        match self {
            BytecodeKind::Empty => BuiltinType::Empty as u8,
            BytecodeKind::Data { .. } => BuiltinType::Data as u8,
            BytecodeKind::Reserve { .. } => BuiltinType::Reserve as u8,
            BytecodeKind::Extended { tag, .. } => *tag,
        }
    }
}
impl fmt::Debug for BytecodeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BytecodeKind::Empty => write!(f, "Empty"),
            BytecodeKind::Data { values, element_size } => write!(f, "Data({:?}, size {})", values, element_size),
            BytecodeKind::Reserve { count, item_size } => write!(f, "Reserve({}, size {})", count, item_size),
            BytecodeKind::Extended { tag, .. } => write!(f, "Extended({})", tag),
        }
    }
}

/// A single bytecode.
///
/// `len` and `offset` are `None` until the finalization and offset resolution passes determine them.
#[derive(Debug)]
pub struct Bytecode {
    kind: BytecodeKind,
    multiple: Option<Expr>,
    len: Option<u64>,
    loc: SourceLoc,
    offset: Option<u64>,
}
impl Bytecode {
    /// Creates the shell shared by all bytecode constructors: no multiplier and unknown length/offset.
    pub fn new_common(kind: BytecodeKind, loc: SourceLoc) -> Self {
        Self { kind, multiple: None, len: None, loc, offset: None }
    }
    pub fn new_empty(loc: SourceLoc) -> Self {
        Self::new_common(BytecodeKind::Empty, loc)
    }
    /// Creates a data bytecode, taking ownership of the values.
    pub fn new_data(values: DataValueList, element_size: u8, loc: SourceLoc) -> Self {
        Self::new_common(BytecodeKind::Data { values, element_size }, loc)
    }
    /// Creates a reserve bytecode, taking ownership of the (possibly not yet evaluatable) count.
    pub fn new_reserve(count: Expr, item_size: u8, loc: SourceLoc) -> Self {
        Self::new_common(BytecodeKind::Reserve { count, item_size }, loc)
    }
    /// Creates an architecture-specific bytecode.
    pub fn new_extended(tag: u8, payload: Box<dyn Any>, loc: SourceLoc) -> Self {
        Self::new_common(BytecodeKind::Extended { tag, payload }, loc)
    }

    pub fn kind(&self) -> &BytecodeKind {
        &self.kind
    }
    pub fn kind_mut(&mut self) -> &mut BytecodeKind {
        &mut self.kind
    }
    pub fn tag(&self) -> u8 {
        self.kind.tag()
    }
    pub fn is_empty_kind(&self) -> bool {
        matches!(self.kind, BytecodeKind::Empty)
    }
    pub fn loc(&self) -> &SourceLoc {
        &self.loc
    }

    /// Gets the repeat count, or `None` if it is the implicit 1.
    pub fn multiple(&self) -> Option<&Expr> {
        self.multiple.as_ref()
    }
    /// Applies a repeat count.
    /// If one was already applied, the result repeats by both (i.e. `old * expr`).
    pub fn set_multiple(&mut self, expr: Expr) {
        self.multiple = Some(match self.multiple.take() {
            Some(old) => (OP::Mul, old, expr).into(),
            None => expr,
        });
    }

    pub fn len(&self) -> Option<u64> {
        self.len
    }
    pub fn set_len(&mut self, len: u64) {
        self.len = Some(len);
    }
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }
    pub fn set_offset(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    /// Destroys the bytecode along with everything it owns.
    /// Extended payloads are handed back to the architecture.
    pub fn delete(self, arch: &dyn ArchBytecodes) -> Result<(), InternalError> {
        let Bytecode { kind, multiple, .. } = self;
        drop(multiple);
        match kind {
            BytecodeKind::Empty => (),
            BytecodeKind::Data { mut values, .. } => values.delete_all(),
            BytecodeKind::Reserve { count, .. } => drop(count),
            BytecodeKind::Extended { tag, payload } => match classify(tag, arch) {
                TagClass::Extended => arch.delete(tag, payload),
                _ => return Err(InternalError::UnknownBytecodeType(tag)),
            }
        }
        Ok(())
    }
    /// As `delete()`, but accepts no bytecode at all (in which case nothing happens).
    pub fn delete_opt(bc: Option<Bytecode>, arch: &dyn ArchBytecodes) -> Result<(), InternalError> {
        match bc {
            Some(bc) => bc.delete(arch),
            None => Ok(()),
        }
    }

    /// Runs the end-of-parse finalization step for this bytecode.
    pub fn finalize(&mut self, arch: &dyn ArchBytecodes) -> Result<(), InternalError> {
        match &mut self.kind {
            BytecodeKind::Empty => Err(InternalError::EmptyBytecode(self.loc.clone())),
            BytecodeKind::Data { .. } | BytecodeKind::Reserve { .. } => Ok(()),
            BytecodeKind::Extended { tag, payload } => match classify(*tag, arch) {
                TagClass::Extended => {
                    if let Some(len) = arch.finalize(*tag, payload.as_mut()) {
                        self.len = Some(len);
                    }
                    Ok(())
                }
                _ => Err(InternalError::UnknownBytecodeType(*tag)),
            }
        }
    }

    pub fn print(&self, f: &mut dyn Write, indent: usize, arch: &dyn ArchBytecodes) -> io::Result<()> {
        let ind = Indent(indent);
        match &self.kind {
            BytecodeKind::Empty => writeln!(f, "{}_Empty_", ind)?,
            BytecodeKind::Data { values, element_size } => {
                writeln!(f, "{}_Data_", ind)?;
                writeln!(f, "{}Final Element Size={}", ind.next(), element_size)?;
                writeln!(f, "{}Elements:", ind.next())?;
                values.print(f, indent + 2)?;
            }
            BytecodeKind::Reserve { count, item_size } => {
                writeln!(f, "{}_Reserve_", ind)?;
                writeln!(f, "{}Num Items={}", ind, count)?;
                writeln!(f, "{}Item Size={}", ind, item_size)?;
            }
            BytecodeKind::Extended { tag, payload } => match classify(*tag, arch) {
                TagClass::Extended => arch.print(f, indent, *tag, payload.as_ref())?,
                _ => writeln!(f, "{}_Unknown_", ind)?,
            }
        }
        match &self.multiple {
            None => writeln!(f, "{}Multiple=nil (1)", ind)?,
            Some(expr) => writeln!(f, "{}Multiple={}", ind, expr)?,
        }
        match self.len {
            None => writeln!(f, "{}Length=unknown", ind)?,
            Some(len) => writeln!(f, "{}Length={}", ind, len)?,
        }
        writeln!(f, "{}Filename=\"{}\" Line Number={}", ind, self.loc.file_or("<UNKNOWN>"), self.loc.line_num)?;
        match self.offset {
            None => writeln!(f, "{}Offset=unknown", ind),
            Some(offset) => writeln!(f, "{}Offset={:x}", ind, offset),
        }
    }
}

/// Gets the offset of the end of `bc` (or of the start of the section if `None`) within `sect`.
///
/// Offsets are determined by a later pass which does not exist yet, so this is never available.
pub fn get_offset(sect: &Section, bc: Option<BytecodeId>) -> Option<u64> {
    tracing::trace!(section = %sect.name(), ?bc, "bytecode offset requested before offset resolution");
    None
}

/// A handle to a bytecode within its `BytecodeList`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct BytecodeId(usize);
impl BytecodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// An ordered sequence of bytecodes (the content of one section).
#[derive(Debug, Default)]
pub struct BytecodeList {
    bcs: Vec<Bytecode>,
}
impl BytecodeList {
    pub fn new() -> Self {
        Self { bcs: vec![] }
    }

    /// Adds a bytecode to the end of the list and returns its handle.
    /// Empty bytecodes are destroyed instead of being stored, in which case `None` is returned.
    pub fn append(&mut self, bc: Bytecode) -> Option<BytecodeId> {
        if bc.is_empty_kind() {
            tracing::debug!(loc = %bc.loc, "discarding empty bytecode");
            return None;
        }
        self.bcs.push(bc);
        Some(BytecodeId(self.bcs.len() - 1))
    }

    /// Deletes every bytecode in list order, leaving the list empty.
    /// Handles given out previously no longer refer to anything.
    /// A bytecode that fails to delete does not stop the rest from being deleted; the first such error is returned.
    pub fn delete_all(&mut self, arch: &dyn ArchBytecodes) -> Result<(), InternalError> {
        tracing::trace!(count = self.bcs.len(), "deleting bytecodes");
        let mut res = Ok(());
        for bc in self.bcs.drain(..) {
            if let Err(e) = bc.delete(arch) {
                if res.is_ok() { res = Err(e); }
            }
        }
        res
    }

    /// Finalizes every bytecode in list order.
    /// The first internal error aborts the pass.
    pub fn finalize_all(&mut self, arch: &dyn ArchBytecodes) -> Result<(), InternalError> {
        tracing::trace!(count = self.bcs.len(), "finalizing bytecodes");
        for bc in self.bcs.iter_mut() {
            bc.finalize(arch)?;
        }
        Ok(())
    }

    pub fn print_all(&self, f: &mut dyn Write, indent: usize, arch: &dyn ArchBytecodes) -> io::Result<()> {
        for bc in self.bcs.iter() {
            writeln!(f, "{}Next Bytecode:", Indent(indent))?;
            bc.print(f, indent + 1, arch)?;
        }
        Ok(())
    }

    pub fn get(&self, id: BytecodeId) -> Option<&Bytecode> {
        self.bcs.get(id.0)
    }
    pub fn get_mut(&mut self, id: BytecodeId) -> Option<&mut Bytecode> {
        self.bcs.get_mut(id.0)
    }
    /// Gets the handle of the most recently appended bytecode.
    pub fn last_id(&self) -> Option<BytecodeId> {
        self.bcs.len().checked_sub(1).map(BytecodeId)
    }
    pub fn len(&self) -> usize {
        self.bcs.len()
    }
    pub fn is_empty(&self) -> bool {
        self.bcs.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Bytecode> {
        self.bcs.iter()
    }
}

#[test]
fn test_classify() {
    use super::arch::NoExtensions;
    assert_eq!(classify(0, &NoExtensions), TagClass::Builtin(BuiltinType::Empty));
    assert_eq!(classify(1, &NoExtensions), TagClass::Builtin(BuiltinType::Data));
    assert_eq!(classify(2, &NoExtensions), TagClass::Builtin(BuiltinType::Reserve));
    assert_eq!(classify(EXTENDED_BASE, &NoExtensions), TagClass::Unknown);
}
#[test]
fn test_set_multiple() {
    let mut bc = Bytecode::new_reserve(4.into(), 1, SourceLoc::new("a.asm", 1));
    assert!(bc.multiple().is_none());
    bc.set_multiple(Expr::ident("a"));
    assert_eq!(bc.multiple().unwrap(), &Expr::ident("a"));
    bc.set_multiple(Expr::ident("b"));
    assert_eq!(bc.multiple().unwrap(), &Expr::from((OP::Mul, Expr::ident("a"), Expr::ident("b"))));
    bc.set_multiple(3.into());
    assert_eq!(bc.multiple().unwrap().to_string(), "(a*b)*3");
}
#[test]
fn test_new_common_state() {
    let bc = Bytecode::new_data(Default::default(), 2, SourceLoc::new("a.asm", 7));
    assert_eq!(bc.tag(), BuiltinType::Data as u8);
    assert_eq!(bc.len(), None);
    assert_eq!(bc.offset(), None);
    assert_eq!(bc.loc(), &SourceLoc::new("a.asm", 7));
    assert!(bc.multiple().is_none());
}
