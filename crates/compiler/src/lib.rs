//! FasterBASIC compiler core: lexing, parsing, semantic analysis, CFG
//! construction, and QBE IL code generation.
//!
//! This crate has no knowledge of how its output reaches a binary - the
//! CLI driver (`src/main.rs`) is the only piece that shells out to an
//! assembler/linker, and it treats this crate as a pure `&str -> String`
//! pipeline (source text in, QBE IL text out).

pub mod ast;
pub mod cfg;
pub mod codegen;
pub mod config;
pub mod lexer;
pub mod parser;
pub mod semantic;
pub mod symbols;
pub mod token;
pub mod types;

use std::path::PathBuf;

use fbasic_core::DiagnosticSink;

pub struct CompileOutput {
    pub qbe_il: String,
    pub diagnostics: DiagnosticSink,
}

/// Runs the full pipeline over one source file's contents and returns the
/// generated QBE IL, along with every diagnostic collected along the way.
/// `None` is returned only when parsing fails outright (a malformed
/// program has no AST to analyze).
pub fn compile(source: &str, file: PathBuf) -> Option<CompileOutput> {
    let mut sink = DiagnosticSink::new();
    let mut parser = parser::Parser::new(source, file, &mut sink);
    let program = parser.parse_program().ok()?;

    let analyzer = semantic::Analyzer::new(&mut sink);
    let semantic::SemanticResult { symbols, types, config } = analyzer.analyze(&program);

    if sink.has_fatal() {
        return Some(CompileOutput { qbe_il: String::new(), diagnostics: sink });
    }

    let qbe_il = codegen::generate(&program, &symbols, &types, &config, &mut sink);
    Some(CompileOutput { qbe_il, diagnostics: sink })
}
