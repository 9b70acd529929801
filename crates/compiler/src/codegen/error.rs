//! Code generation errors: failures that only the backend-facing stage
//! can detect (spec §4.5, §7's `BACKEND_INVARIANT`), because they depend
//! on decisions the type system alone doesn't make - a function falling
//! off its end without returning, an array descriptor with no declared
//! element size, a symbol the mapper was asked to lower but never saw
//! declared.

use std::fmt;

use fbasic_core::SourceLocation;

#[derive(Debug, Clone)]
pub enum CodeGenError {
    UndeclaredSymbol { name: String, location: SourceLocation },
    MissingFunctionReturn { name: String },
    UnsupportedCoercion { from: String, to: String, location: SourceLocation },
    UnknownRuntimeFunction { name: String },
}

impl fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeGenError::UndeclaredSymbol { name, location } => {
                write!(f, "{location}: codegen saw undeclared symbol '{name}'")
            }
            CodeGenError::MissingFunctionReturn { name } => {
                write!(f, "function '{name}' does not return on every path")
            }
            CodeGenError::UnsupportedCoercion { from, to, location } => {
                write!(f, "{location}: codegen cannot coerce {from} to {to}")
            }
            CodeGenError::UnknownRuntimeFunction { name } => {
                write!(f, "no runtime signature registered for '{name}'")
            }
        }
    }
}

impl std::error::Error for CodeGenError {}
