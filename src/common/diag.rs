//! Diagnostics reporting.
//!
//! There are two tiers of failure.
//! A `Diagnostic` is a user-facing problem (e.g. a duplicate definition) which is recorded in a `Diagnostics` sink,
//! after which processing continues so that as many problems as possible are found in a single run.
//! An `InternalError` denotes a broken invariant elsewhere in the assembler and is returned as `Err` so the run is aborted.

use std::fmt;
use std::error::Error;

use super::SourceLoc;

/// How serious a diagnostic is.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Severity {
    Error,
    /// Additional information attached to a previous error.
    Note,
}

/// The kinds of problems reported by the bytecode and symbol machinery.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum DiagnosticKind {
    /// A symbol was defined (or declared common/extern) more than once.
    DuplicateDefinition { name: String, first_line: usize },
    /// A symbol was used but never defined.
    UndefinedSymbol { name: String },
    /// Follows the undefined symbol errors of a pass, attributed to the earliest one.
    UndefinedSummary,
}
impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DiagnosticKind::DuplicateDefinition { name, first_line } => write!(f, "duplicate definition of `{}'; first defined on line {}", name, first_line),
            DiagnosticKind::UndefinedSymbol { name } => write!(f, "undefined symbol `{}' (first use)", name),
            DiagnosticKind::UndefinedSummary => write!(f, " (Each undefined symbol is reported only once.)"),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Diagnostic {
    /// The type of problem that was encountered.
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// Where the problem should be reported.
    pub loc: SourceLoc,
}
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sev = match self.severity {
            Severity::Error => "error",
            Severity::Note => "note",
        };
        write!(f, "{}: {}: {}", self.loc, sev, self.kind)
    }
}

/// An append-only sink of diagnostics for one translation unit.
#[derive(Default, Debug)]
pub struct Diagnostics {
    raw: Vec<Diagnostic>,
}
impl Diagnostics {
    pub fn new() -> Self {
        Self { raw: vec![] }
    }

    /// Records an error at the given location.
    pub fn error(&mut self, loc: SourceLoc, kind: DiagnosticKind) {
        self.push(Diagnostic { kind, severity: Severity::Error, loc });
    }
    /// Records a note at the given location.
    pub fn note(&mut self, loc: SourceLoc, kind: DiagnosticKind) {
        self.push(Diagnostic { kind, severity: Severity::Note, loc });
    }
    pub fn push(&mut self, diag: Diagnostic) {
        tracing::warn!(loc = %diag.loc, "{}", diag.kind);
        self.raw.push(diag);
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
    pub fn len(&self) -> usize {
        self.raw.len()
    }
    /// Counts the recorded diagnostics with `Severity::Error`.
    pub fn error_count(&self) -> usize {
        self.raw.iter().filter(|d| d.severity == Severity::Error).count()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.raw.iter()
    }
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.raw
    }
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.raw
    }
    /// Removes all recorded diagnostics.
    pub fn clear(&mut self) {
        self.raw.clear();
    }
}

/// An unrecoverable consistency failure.
/// These are never caused by user input, so they are not reported as diagnostics.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum InternalError {
    /// A bytecode tag which is neither built in nor handled by the architecture.
    UnknownBytecodeType(u8),
    /// An empty bytecode reached a pass that requires content (it should have been discarded on append).
    EmptyBytecode(SourceLoc),
}
impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InternalError::UnknownBytecodeType(tag) => write!(f, "internal error: unknown bytecode type {}", tag),
            InternalError::EmptyBytecode(loc) => write!(f, "internal error: got empty bytecode in parser_finalize ({})", loc),
        }
    }
}
impl Error for InternalError {}

#[test]
fn test_diagnostic_messages() {
    let d = Diagnostic {
        kind: DiagnosticKind::DuplicateDefinition { name: "foo".into(), first_line: 3 },
        severity: Severity::Error,
        loc: SourceLoc::new("a.asm", 9),
    };
    assert_eq!(d.to_string(), "a.asm:9: error: duplicate definition of `foo'; first defined on line 3");
    assert_eq!(DiagnosticKind::UndefinedSymbol { name: "bar".into() }.to_string(), "undefined symbol `bar' (first use)");
    assert_eq!(InternalError::UnknownBytecodeType(200).to_string(), "internal error: unknown bytecode type 200");
}
#[test]
fn test_diagnostics_counts() {
    let mut diags = Diagnostics::new();
    assert!(diags.is_empty());
    diags.error(SourceLoc::new("a.asm", 1), DiagnosticKind::UndefinedSymbol { name: "x".into() });
    diags.note(SourceLoc::new("a.asm", 1), DiagnosticKind::UndefinedSummary);
    assert_eq!(diags.len(), 2);
    assert_eq!(diags.error_count(), 1);
    diags.clear();
    assert!(diags.is_empty());
}
