//! Diagnostic collector (Component C).
//!
//! Append-only, threaded by reference through tokenization, parsing,
//! resolution, and code generation; the runtime writes its own errors
//! straight to stderr since by then the collector's job (let earlier stages
//! decide whether to proceed) is done. Duplicates are never deduplicated —
//! per spec §7 that is deliberate, not an oversight.

use std::fmt;
use std::rc::Rc;

/// A `file:line:column` anchor. Line and column are 1-based for display,
/// matching conventional compiler output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: Rc<str>,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: Rc<str>, line: u32, column: u32) -> Self {
        SourceLocation { file, line, column }
    }

    /// A placeholder location for synthesized nodes (e.g. the implicit
    /// `halt` the code generator appends) that have no source text of their
    /// own.
    pub fn synthetic(file: Rc<str>) -> Self {
        SourceLocation { file, line: 0, column: 0 }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// The stage that produced a diagnostic, per spec §7's four kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Token,
    Parse,
    Resolve,
    Runtime,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Token => write!(f, "token"),
            Stage::Parse => write!(f, "parse"),
            Stage::Resolve => write!(f, "resolve"),
            Stage::Runtime => write!(f, "runtime"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub stage: Stage,
    pub severity: Severity,
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.severity, self.message)
    }
}

/// Append-only diagnostic list. Every pipeline stage holds a `&mut
/// DiagnosticCollector` (or is handed one to push into) rather than owning
/// its own; this is the "diagnostic collector threaded through all stages"
/// from spec §2.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    items: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        DiagnosticCollector { items: Vec::new() }
    }

    pub fn push(&mut self, stage: Stage, severity: Severity, message: impl Into<String>, location: SourceLocation) {
        self.items.push(Diagnostic {
            stage,
            severity,
            message: message.into(),
            location,
        });
    }

    pub fn error(&mut self, stage: Stage, message: impl Into<String>, location: SourceLocation) {
        self.push(stage, Severity::Error, message, location);
    }

    pub fn warning(&mut self, stage: Stage, message: impl Into<String>, location: SourceLocation) {
        self.push(stage, Severity::Warning, message, location);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
