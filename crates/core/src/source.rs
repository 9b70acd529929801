//! Source locations for error reporting across every compiler phase.

use std::path::PathBuf;

/// A span in a source file, used by every token, AST node, and diagnostic.
///
/// Lines and columns are 0-indexed internally (so tooling that wants
/// LSP-style positions gets them for free) and are rendered 1-indexed in
/// `Display`, matching what a user expects to see.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(file: PathBuf, line: usize, column: usize) -> Self {
        SourceLocation { file, line, column }
    }

    /// A location with no real file, for synthetic nodes (e.g. the `IfStatement`
    /// the CFG builder fabricates for a `SELECT CASE` arm).
    pub fn synthetic() -> Self {
        SourceLocation {
            file: PathBuf::from("<synthetic>"),
            line: 0,
            column: 0,
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.file.display(),
            self.line + 1,
            self.column + 1
        )
    }
}
