//! Code generation (spec §4.5): walks the AST once semantic analysis has
//! produced a `SymbolTable`/`TypeRegistry`, builds a CFG per routine, and
//! lowers each to QBE IL text. The submodules mirror the spec's named
//! collaborators:
//!
//! - [`builder`] - `QBEBuilder`, the textual IL writer.
//! - [`type_manager`] - `TypeManager`, type-to-IL mapping.
//! - [`symbol_mapper`] - `SymbolMapper`, name mangling.
//! - [`runtime_library`] - `RuntimeLibrary`, typed calls into the runtime.
//! - [`ast_emitter`] - `ASTEmitter`, expression/straight-line lowering.
//! - [`cfg_emitter`] - `CFGEmitter`, block/jump lowering.
//! - [`globals`], [`array_cleanup`], [`exceptions`] - the ambient
//!   concerns those emitters lean on.

pub mod array_cleanup;
pub mod ast_emitter;
pub mod builder;
pub mod cfg_emitter;
pub mod error;
pub mod exceptions;
pub mod globals;
pub mod runtime_library;
pub mod symbol_mapper;
pub mod type_manager;

use fbasic_core::{DiagnosticSink, ErrorKind};

use crate::ast::{Param, Program, Statement};
use crate::config::CompilerConfig;
use crate::symbols::{SymbolTable, TypeRegistry};
use crate::types::{BaseType, TypeDescriptor};

use array_cleanup::DeferList;
use ast_emitter::ASTEmitter;
use builder::QBEBuilder;
use cfg_emitter::CFGEmitter;
use runtime_library::RuntimeLibrary;
use symbol_mapper::SymbolMapper;
use type_manager::TypeManager;

/// Runs codegen over the whole program, returning the QBE IL text. Any
/// error a subcomponent raises becomes a `BACKEND_INVARIANT` diagnostic
/// (spec §7: the only codegen-stage kind, since everything coercion- or
/// scope-related was already caught by semantic analysis).
pub fn generate(
    program: &Program,
    symbols: &SymbolTable,
    types: &TypeRegistry,
    config: &CompilerConfig,
    sink: &mut DiagnosticSink,
) -> String {
    let mut b = QBEBuilder::new();
    let mut runtime = RuntimeLibrary::new();

    let globals = collect_globals(program);
    globals::GlobalLayout::collect(symbols, &globals).emit(&mut b);

    let mut main_body = Vec::new();
    for stmt in program {
        match stmt {
            Statement::SubDef { name, params, body, .. } => {
                emit_routine(&mut b, symbols, types, config, &mut runtime, name, params, body, RoutineKind::Sub, sink);
            }
            Statement::FunctionDef { name, params, body, .. } => {
                emit_routine(&mut b, symbols, types, config, &mut runtime, name, params, body, RoutineKind::Function, sink);
            }
            Statement::TypeDef { .. } | Statement::DefFn { .. } => {}
            other => main_body.push(other.clone()),
        }
    }
    emit_routine(&mut b, symbols, types, config, &mut runtime, "main", &[], &main_body, RoutineKind::Main, sink);

    b.emit_string_pool();
    b.finish()
}

fn collect_globals(program: &Program) -> Vec<(String, TypeDescriptor)> {
    let mut out = Vec::new();
    for stmt in program {
        if let Statement::Dim { name, as_type, dims, .. } = stmt {
            let base = as_type
                .as_ref()
                .and_then(|tn| base_type_from_name(&tn.base))
                .unwrap_or_else(|| base_type_from_suffix(name));
            let ty = if dims.is_empty() {
                TypeDescriptor::scalar(base)
            } else {
                TypeDescriptor::array(base, vec![0; dims.len()])
            };
            out.push((name.clone(), ty));
        }
    }
    out
}

fn base_type_from_suffix(name: &str) -> BaseType {
    use crate::token::Suffix;
    match name.chars().last().and_then(Suffix::from_char) {
        Some(Suffix::Byte) => BaseType::Byte,
        Some(Suffix::Short) => BaseType::Short,
        Some(Suffix::Integer) => BaseType::Integer,
        Some(Suffix::Long) => BaseType::Long,
        Some(Suffix::Single) => BaseType::Single,
        Some(Suffix::Double) => BaseType::Double,
        Some(Suffix::String) => BaseType::String,
        None => BaseType::Double,
    }
}

fn strip_suffix(name: &str) -> &str {
    name.trim_end_matches(['@', '^', '%', '&', '!', '#', '$'])
}

/// Which exit convention a routine's `@tidy_exit` falls into (spec
/// §4.5.6): a sub has no value, main's exit code is always 0, and a
/// function reads back whatever was stored to its own (suffix-stripped)
/// name during the body.
enum RoutineKind {
    Main,
    Sub,
    Function,
}

fn base_type_from_name(name: &str) -> Option<BaseType> {
    Some(match name.to_ascii_uppercase().as_str() {
        "BYTE" => BaseType::Byte,
        "SHORT" => BaseType::Short,
        "INTEGER" => BaseType::Integer,
        "LONG" => BaseType::Long,
        "SINGLE" => BaseType::Single,
        "DOUBLE" => BaseType::Double,
        "STRING" => BaseType::String,
        "UNICODE" => BaseType::Unicode,
        _ => return None,
    })
}

fn emit_routine(
    b: &mut QBEBuilder,
    symbols: &SymbolTable,
    types: &TypeRegistry,
    config: &CompilerConfig,
    runtime: &mut RuntimeLibrary,
    name: &str,
    params: &[Param],
    body: &[Statement],
    kind: RoutineKind,
    sink: &mut DiagnosticSink,
) {
    let symbol = if name == "main" { "$main".to_string() } else { SymbolMapper::function_symbol(name) };
    let param_text = params
        .iter()
        .map(|p| {
            let ty = symbols
                .lookup(&p.name, Some(name))
                .map(|s| s.ty.clone())
                .unwrap_or_else(|| TypeDescriptor::scalar(BaseType::Double));
            format!("{} {}", TypeManager::qbe_letter(&ty), SymbolMapper::temp_name(&p.name))
        })
        .collect::<Vec<_>>()
        .join(", ");
    let ret_letter = match kind {
        RoutineKind::Main => Some("w"),
        RoutineKind::Sub => None,
        RoutineKind::Function => {
            let ty = symbols
                .lookup(strip_suffix(name), Some(name))
                .map(|s| s.ty.clone())
                .unwrap_or_else(|| TypeDescriptor::scalar(BaseType::Double));
            Some(TypeManager::qbe_letter(&ty))
        }
    };
    let header_ty = ret_letter.map(|l| format!("{l} ")).unwrap_or_default();
    b.emit_line(format!("export function {header_ty}{symbol}({param_text}) {{"));
    b.label("@start");

    let mut defer = DeferList::new();
    let mut emitter = ASTEmitter {
        symbols,
        types,
        config,
        runtime,
        current_function: if name == "main" { None } else { Some(name.to_string()) },
        defer: &mut defer,
        locals: std::collections::HashMap::new(),
    };
    // `main`'s top-level declarations are globals (`collect_globals`
    // already laid them out), not routine locals - only a real
    // SUB/FUNCTION body gets stack slots.
    if !matches!(kind, RoutineKind::Main) {
        emitter.emit_prologue(b, params, body);
    }

    let cfg = crate::cfg::build(body);
    if let Err(err) = CFGEmitter::emit(b, &mut emitter, &cfg) {
        sink.error(
            ErrorKind::BackendInvariant,
            fbasic_core::SourceLocation::synthetic(),
            err.to_string(),
        );
    }

    emitter.defer.emit_tidy_exit(b, &mut *emitter.runtime);
    match kind {
        RoutineKind::Main => b.emit_line("    ret 0"),
        RoutineKind::Sub => b.emit_line("    ret"),
        RoutineKind::Function => {
            let (val, _ty) = emitter.load_variable(b, strip_suffix(name));
            b.emit_line(format!("    ret {val}"));
        }
    }
    b.emit_line("}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::parser::Parser;
    use crate::semantic::Analyzer;

    fn compile(src: &str) -> String {
        let mut sink = DiagnosticSink::new();
        let mut parser = Parser::new(src, PathBuf::from("t.bas"), &mut sink);
        let program = parser.parse_program().expect("parse should succeed");
        let analyzer = Analyzer::new(&mut sink);
        let result = analyzer.analyze(&program);
        generate(&program, &result.symbols, &result.types, &result.config, &mut sink)
    }

    #[test]
    fn simple_program_emits_a_main_function() {
        let il = compile("PRINT 1");
        assert!(il.contains("function w $main"));
        assert!(il.contains("@tidy_exit"));
    }

    #[test]
    fn sub_definition_emits_its_own_function() {
        let il = compile("SUB Greet\nPRINT 1\nEND SUB");
        assert!(il.contains("$fn_Greet"));
    }

    #[test]
    fn string_literal_is_pooled_in_the_data_segment() {
        let il = compile("PRINT \"hi\"");
        assert!(il.contains("data $str1"));
    }
}
