//! The interface through which architecture backends supply their own bytecode kinds.
//!
//! The core only knows the built-in kinds (empty, data, reserve).
//! Any other kind is an extended bytecode: a tag plus a type-erased payload that only the
//! architecture which created it can interpret (via downcasting the `Any`).
//! The core hands such payloads back to the architecture for deletion, printing, and finalization.

use std::any::Any;
use std::io::{self, Write};

use super::bytecode::EXTENDED_BASE;
use crate::common::util::Indent;

/// An architecture's bytecode dispatch table.
pub trait ArchBytecodes {
    /// One past the largest extended tag this architecture defines.
    /// Tags in `EXTENDED_BASE..type_max()` are dispatched here; anything at or above it is an internal error.
    fn type_max(&self) -> u8;

    /// Destroys an extended payload.
    fn delete(&self, tag: u8, payload: Box<dyn Any>);
    /// Writes a debug dump of an extended payload at the given indentation.
    fn print(&self, f: &mut dyn Write, indent: usize, tag: u8, payload: &dyn Any) -> io::Result<()>;
    /// Resolves deferred content of an extended payload.
    /// Returns the final length in bytes if it is known after this step.
    fn finalize(&self, tag: u8, payload: &mut dyn Any) -> Option<u64>;

    /// Checks if `tag` is an extended tag handled by this table.
    fn handles(&self, tag: u8) -> bool {
        tag >= EXTENDED_BASE && tag < self.type_max()
    }
}

/// The dispatch table of an architecture without extended bytecodes.
#[derive(Clone, Copy, Default, Debug)]
pub struct NoExtensions;
impl ArchBytecodes for NoExtensions {
    fn type_max(&self) -> u8 {
        EXTENDED_BASE
    }
    fn delete(&self, _: u8, payload: Box<dyn Any>) {
        drop(payload);
    }
    fn print(&self, f: &mut dyn Write, indent: usize, _: u8, _: &dyn Any) -> io::Result<()> {
        writeln!(f, "{}_Unknown_", Indent(indent))
    }
    fn finalize(&self, _: u8, _: &mut dyn Any) -> Option<u64> {
        None
    }
}

#[test]
fn test_no_extensions() {
    let arch = NoExtensions;
    assert!(!arch.handles(0));
    assert!(!arch.handles(EXTENDED_BASE - 1));
    assert!(!arch.handles(EXTENDED_BASE));
    assert!(!arch.handles(u8::MAX));
}
