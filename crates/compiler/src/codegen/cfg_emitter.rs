//! `CFGEmitter`: walks a routine's `ControlFlowGraph` (spec §4.4, §4.5.7)
//! emitting one QBE label per reachable block and lowering each
//! `Terminator` to the matching jump instruction. Unreachable blocks are
//! still emitted (with a trailing `hlt`) so every label the CFG names
//! actually exists in the output, matching the CFG builder's own
//! decision not to drop them.

use std::collections::HashMap;

use crate::cfg::{BlockId, ControlFlowGraph, Terminator};
use crate::codegen::ast_emitter::ASTEmitter;
use crate::codegen::builder::QBEBuilder;

use super::error::CodeGenError;

pub struct CFGEmitter;

impl CFGEmitter {
    pub fn emit(
        b: &mut QBEBuilder,
        emitter: &mut ASTEmitter,
        cfg: &ControlFlowGraph,
    ) -> Result<(), CodeGenError> {
        let mut labels: HashMap<BlockId, String> = HashMap::new();
        for block in &cfg.blocks {
            labels.insert(block.id, b.fresh_label("block"));
        }

        for block in &cfg.blocks {
            b.label(labels.get(&block.id).expect("every block was pre-labeled"));
            for stmt in &block.statements {
                emitter.emit_statement(b, stmt)?;
            }
            match &block.terminator {
                Terminator::Fallthrough(next) => {
                    b.emit_line(format!("    jmp {}", labels[next]));
                }
                Terminator::Conditional { condition, then_block, else_block } => {
                    let (val, _) = emitter.emit_expr(b, condition)?;
                    b.emit_line(format!("    jnz {val}, {}, {}", labels[then_block], labels[else_block]));
                }
                Terminator::Multiway { selector, arms, default } => {
                    Self::emit_multiway(b, emitter, selector, arms, &labels, labels[default].clone())?;
                }
                Terminator::Return => {
                    b.emit_line("    jmp @tidy_exit");
                }
                Terminator::Unreachable => {
                    b.emit_line("    hlt");
                }
            }
        }
        Ok(())
    }

    /// A `MULTIWAY` edge set is lowered to a linear chain of comparisons
    /// against each arm's test, falling through to `default` if none
    /// match - the same shape the CFG builder would have produced had it
    /// kept `SELECT CASE` as nested `IF`s instead of collapsing them
    /// (spec §4.4).
    fn emit_multiway(
        b: &mut QBEBuilder,
        emitter: &mut ASTEmitter,
        selector: &crate::ast::Expr,
        arms: &[(crate::ast::CaseTest, BlockId)],
        labels: &HashMap<BlockId, String>,
        default_label: String,
    ) -> Result<(), CodeGenError> {
        let (sel_val, sel_ty) = emitter.emit_expr(b, selector)?;
        for (test, target) in arms {
            let next_check = b.fresh_label("case_next");
            let target_label = labels[target].clone();
            match test {
                crate::ast::CaseTest::Value(expr) => {
                    let (val, _) = emitter.emit_expr(b, expr)?;
                    let cmp = b.fresh_temp();
                    b.emit_line(format!("    {cmp} =w ceq{} {sel_val}, {val}", crate::types::TypeDescriptor::qbe_type(&sel_ty).letter()));
                    b.emit_line(format!("    jnz {cmp}, {target_label}, {next_check}"));
                }
                crate::ast::CaseTest::Range(lo, hi) => {
                    let (lo_val, _) = emitter.emit_expr(b, lo)?;
                    let (hi_val, _) = emitter.emit_expr(b, hi)?;
                    let ge = b.fresh_temp();
                    let le = b.fresh_temp();
                    let both = b.fresh_temp();
                    let letter = crate::types::TypeDescriptor::qbe_type(&sel_ty).letter();
                    b.emit_line(format!("    {ge} =w cge{letter} {sel_val}, {lo_val}"));
                    b.emit_line(format!("    {le} =w cle{letter} {sel_val}, {hi_val}"));
                    b.emit_line(format!("    {both} =w and {ge}, {le}"));
                    b.emit_line(format!("    jnz {both}, {target_label}, {next_check}"));
                }
                crate::ast::CaseTest::Is(op, expr) => {
                    let (val, _) = emitter.emit_expr(b, expr)?;
                    let letter = crate::types::TypeDescriptor::qbe_type(&sel_ty).letter();
                    let code = match op {
                        crate::ast::CompareOp::Eq => "eq",
                        crate::ast::CompareOp::Ne => "ne",
                        crate::ast::CompareOp::Lt => "lt",
                        crate::ast::CompareOp::Le => "le",
                        crate::ast::CompareOp::Gt => "gt",
                        crate::ast::CompareOp::Ge => "ge",
                    };
                    let cmp = b.fresh_temp();
                    b.emit_line(format!("    {cmp} =w c{code}{letter} {sel_val}, {val}"));
                    b.emit_line(format!("    jnz {cmp}, {target_label}, {next_check}"));
                }
            }
            b.label(&next_check);
        }
        b.emit_line(format!("    jmp {default_label}"));
        Ok(())
    }
}
