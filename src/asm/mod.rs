//! The core data structures of the assembler: expressions, bytecodes, sections, and the symbol table.
//!
//! The parser front end builds into a `Session`; architecture and object-format backends plug in
//! through the `ArchBytecodes` and `ObjectFormat` traits.

pub mod expr;
pub mod dataval;
pub mod arch;
pub mod objfmt;
pub mod bytecode;
pub mod operand;
pub mod section;
pub mod symrec;
pub mod session;

pub use arch::{ArchBytecodes, NoExtensions};
pub use bytecode::{Bytecode, BytecodeId, BytecodeKind, BytecodeList};
pub use dataval::{DataValue, DataValueList};
pub use expr::{Expr, OP};
pub use objfmt::{NullObjectFormat, ObjectFormat};
pub use operand::{EffAddr, ImmVal};
pub use section::{Section, SectionId, Sections};
pub use session::{Predefines, Session};
pub use symrec::{SymbolId, SymbolTable, Visibility};
