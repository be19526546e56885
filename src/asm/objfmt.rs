//! The interface to the object-format backend for symbol declaration data.
//!
//! When a symbol is declared global, common, or extern, the object format may attach its own data
//! (e.g. the size and alignment of a common block). The symbol table owns that data but cannot interpret it,
//! so destruction and printing go back through the object format.

use std::any::Any;
use std::io::{self, Write};

use super::symrec::Visibility;
use crate::common::util::Indent;

/// Opaque object-format data attached to a symbol declaration.
pub type DeclData = Box<dyn Any>;

pub trait ObjectFormat {
    /// Destroys declaration data previously attached with the given visibility.
    fn declare_data_delete(&self, vis: Visibility, data: DeclData);
    /// Writes a debug dump of declaration data (`None` if nothing was attached).
    fn declare_data_print(&self, f: &mut dyn Write, indent: usize, vis: Visibility, data: Option<&dyn Any>) -> io::Result<()>;
}

/// An object format which attaches no meaning to declaration data.
#[derive(Clone, Copy, Default, Debug)]
pub struct NullObjectFormat;
impl ObjectFormat for NullObjectFormat {
    fn declare_data_delete(&self, _: Visibility, data: DeclData) {
        drop(data);
    }
    fn declare_data_print(&self, f: &mut dyn Write, indent: usize, _: Visibility, data: Option<&dyn Any>) -> io::Result<()> {
        match data {
            None => writeln!(f, "{}(none)", Indent(indent)),
            Some(_) => writeln!(f, "{}(opaque)", Indent(indent)),
        }
    }
}
