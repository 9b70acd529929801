//! FasterBASIC Core: shared foundation for the compiler and the QBE backend
//!
//! This crate provides the language-agnostic primitives that both
//! `fbasic-compiler` and `fbasic-qbe-backend` depend on, so neither has to
//! redefine source locations or diagnostic reporting:
//!
//! - `source`: `SourceLocation`, a line/column span into a source file.
//! - `diagnostics`: `ErrorKind`, `Diagnostic`, `DiagnosticSink` (§7 of the spec).
//! - `interner`: a simple string interner used for the QBE string pool and
//!   for backend symbol/label tables.
//! - `ids`: a generic newtype-index helper used for block ids, UDT ids, and
//!   temporary ids across the compiler and backend.

pub mod diagnostics;
pub mod ids;
pub mod interner;
pub mod source;

pub use diagnostics::{Diagnostic, DiagnosticSink, ErrorKind, Severity};
pub use ids::Id;
pub use interner::Interner;
pub use source::SourceLocation;
