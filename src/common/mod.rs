//! Everything that is used by both the bytecode and the symbol table machinery.

use std::fmt;
use std::rc::Rc;

pub mod diag;
pub(crate) mod util;

pub use diag::{Diagnostic, DiagnosticKind, Diagnostics, InternalError, Severity};

/// The source position of a node, captured by value when the node is created.
///
/// File names are shared (many nodes come from the same file), so cloning is cheap.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceLoc {
    /// Name of the source file, if known.
    pub file: Option<Rc<str>>,
    /// Line number in the source file (1-based, 0 for predefined/synthesized content).
    pub line_num: usize,
}
impl SourceLoc {
    pub fn new(file: &str, line_num: usize) -> Self {
        Self { file: Some(file.into()), line_num }
    }
    /// Gets the file name, or `fallback` if none was recorded.
    pub fn file_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.file.as_deref().unwrap_or(fallback)
    }
}
impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.file_or("<unknown>"), self.line_num)
    }
}
#[test]
fn test_source_loc() {
    assert_eq!(SourceLoc::new("foo.asm", 12).to_string(), "foo.asm:12");
    assert_eq!(SourceLoc::default().to_string(), "<unknown>:0");
    assert_eq!(SourceLoc::default().file_or("(NULL)"), "(NULL)");

    let a = SourceLoc::new("foo.asm", 3);
    let b = SourceLoc { line_num: 4, ..a.clone() };
    assert!(Rc::ptr_eq(a.file.as_ref().unwrap(), b.file.as_ref().unwrap()));
}
