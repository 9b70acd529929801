//! Unified diagnostic reporting (spec §7).
//!
//! Every phase pushes into a single `DiagnosticSink` rather than returning
//! bespoke error types to its caller; this lets a phase keep going until a
//! structural boundary (statement/block) instead of aborting on the first
//! mistake, matching the "each phase emits diagnostics ... and continues
//! until a structural boundary" rule. A fatal diagnostic still stops the
//! phase before the next one starts - see `DiagnosticSink::has_fatal`.

use crate::source::SourceLocation;

/// Compile-time error kinds, exactly as enumerated in spec §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lex,
    Parse,
    TypeMismatch,
    NarrowingRequired,
    Undefined,
    Redefinition,
    BadControlFlow,
    OptionViolation,
    BackendInvariant,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Lex => "LEX",
            ErrorKind::Parse => "PARSE",
            ErrorKind::TypeMismatch => "TYPE_MISMATCH",
            ErrorKind::NarrowingRequired => "NARROWING_REQUIRED",
            ErrorKind::Undefined => "UNDEFINED",
            ErrorKind::Redefinition => "REDEFINITION",
            ErrorKind::BadControlFlow => "BAD_CONTROL_FLOW",
            ErrorKind::OptionViolation => "OPTION_VIOLATION",
            ErrorKind::BackendInvariant => "BACKEND_INVARIANT",
        }
    }

    /// `BACKEND_INVARIANT` is the only compile-time kind the spec calls
    /// "fatal" outright; everything else is recoverable up to a phase
    /// boundary per §7.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorKind::BackendInvariant)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
    pub location: SourceLocation,
}

impl Diagnostic {
    pub fn error(kind: ErrorKind, location: SourceLocation, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            severity: Severity::Error,
            message: message.into(),
            location,
        }
    }

    pub fn warning(kind: ErrorKind, location: SourceLocation, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            severity: Severity::Warning,
            message: message.into(),
            location,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(
            f,
            "{}: {} [{}] {}",
            self.location,
            label,
            self.kind.code(),
            self.message
        )
    }
}

/// Accumulates diagnostics for a whole compilation run.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        DiagnosticSink::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, kind: ErrorKind, location: SourceLocation, message: impl Into<String>) {
        self.push(Diagnostic::error(kind, location, message));
    }

    pub fn warning(&mut self, kind: ErrorKind, location: SourceLocation, message: impl Into<String>) {
        self.push(Diagnostic::warning(kind, location, message));
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn has_fatal(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error && d.kind.is_fatal())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn loc() -> SourceLocation {
        SourceLocation::new(PathBuf::from("t.bas"), 0, 0)
    }

    #[test]
    fn sink_tracks_errors_separately_from_warnings() {
        let mut sink = DiagnosticSink::new();
        sink.warning(ErrorKind::NarrowingRequired, loc(), "narrowing");
        assert!(!sink.has_errors());
        sink.error(ErrorKind::Undefined, loc(), "undefined identifier FOO");
        assert!(sink.has_errors());
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn backend_invariant_is_fatal_others_are_not() {
        assert!(ErrorKind::BackendInvariant.is_fatal());
        assert!(!ErrorKind::TypeMismatch.is_fatal());
        assert!(!ErrorKind::Parse.is_fatal());
    }
}
