//! Control-flow graph builder (spec §4.4): a single-pass recursive walk
//! over a routine's statement list that produces basic blocks linked by
//! typed edges (`FALLTHROUGH`, `CONDITIONAL`, `MULTIWAY`, `RETURN`).
//!
//! `SELECT CASE` is lowered to a chain of synthetic `IF`/`ELSEIF` branches
//! before the walk reaches it, so the builder itself only ever has to
//! emit `CONDITIONAL` edges - `MULTIWAY` is reserved for the lowered
//! chain's outermost view for callers that want to see it as one
//! decision (see `Terminator::Multiway`, built directly from the
//! original `SelectCase` node rather than from the lowered `If`).
//!
//! `GOTO`/`GOSUB` targets are resolved in two steps: the first walk emits
//! a block per label and records pending jumps by label name; a second
//! pass rewrites every pending jump into a real block id once the whole
//! routine has been walked, so a forward reference to a label that
//! appears later in the source still resolves.

use std::collections::HashMap;

use fbasic_core::SourceLocation;

use crate::ast::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

#[derive(Debug, Clone)]
pub struct CfgBlock {
    pub id: BlockId,
    pub statements: Vec<Statement>,
    pub terminator: Terminator,
}

#[derive(Debug, Clone)]
pub enum Terminator {
    /// Unconditional successor: falls off the end of a block, or a
    /// resolved `GOTO`/`GOSUB`.
    Fallthrough(BlockId),
    Conditional { condition: Expr, then_block: BlockId, else_block: BlockId },
    Multiway { selector: Expr, arms: Vec<(CaseTest, BlockId)>, default: BlockId },
    Return,
    /// A block with no successor and no predecessor reachable from the
    /// entry - kept in the graph rather than dropped (spec §4.4: "a
    /// reachability pass runs after construction but does not delete
    /// unreachable blocks").
    Unreachable,
}

#[derive(Debug)]
pub struct ControlFlowGraph {
    pub entry: BlockId,
    pub blocks: Vec<CfgBlock>,
    pub reachable: Vec<bool>,
}

impl ControlFlowGraph {
    pub fn block(&self, id: BlockId) -> &CfgBlock {
        &self.blocks[id.0 as usize]
    }

    pub fn is_reachable(&self, id: BlockId) -> bool {
        self.reachable[id.0 as usize]
    }
}

struct Builder {
    blocks: Vec<CfgBlock>,
    labels: HashMap<String, BlockId>,
    pending_gotos: Vec<(BlockId, String)>,
    /// `ON GOTO`/`ON GOSUB` targets (block, selector, labels, fall-through
    /// default), resolved into one `Multiway` terminator once every label
    /// is known - a flat `pending_gotos` entry per label can't model this
    /// since each block has only one terminator and later entries would
    /// just overwrite earlier ones.
    pending_multiway: Vec<(BlockId, Expr, Vec<String>, BlockId)>,
    loop_stack: Vec<LoopTargets>,
}

#[derive(Clone, Copy)]
struct LoopTargets {
    exit: BlockId,
    continue_target: BlockId,
}

impl Builder {
    fn new() -> Self {
        Builder {
            blocks: Vec::new(),
            labels: HashMap::new(),
            pending_gotos: Vec::new(),
            pending_multiway: Vec::new(),
            loop_stack: Vec::new(),
        }
    }

    fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(CfgBlock {
            id,
            statements: Vec::new(),
            terminator: Terminator::Unreachable,
        });
        id
    }

    fn set_terminator(&mut self, block: BlockId, terminator: Terminator) {
        self.blocks[block.0 as usize].terminator = terminator;
    }

    fn push_stmt(&mut self, block: BlockId, stmt: Statement) {
        self.blocks[block.0 as usize].statements.push(stmt);
    }

    /// Processes a flat statement list starting in `current`, returning
    /// the block control reaches after falling off the end of the list
    /// (the "exit" block callers should wire their own fallthrough to).
    fn process_nested_statements(&mut self, stmts: &[Statement], mut current: BlockId) -> BlockId {
        for stmt in stmts {
            current = self.process_statement(stmt, current);
        }
        current
    }

    fn process_statement(&mut self, stmt: &Statement, current: BlockId) -> BlockId {
        match stmt {
            Statement::Label { name, .. } => {
                let next = self.new_block();
                self.set_terminator(current, Terminator::Fallthrough(next));
                self.labels.insert(name.clone(), next);
                next
            }
            Statement::Goto { label, .. } => {
                self.pending_gotos.push((current, label.clone()));
                self.new_block()
            }
            Statement::Gosub { label, .. } => {
                // A GOSUB falls through to the following statement at
                // runtime once the called routine executes RETURN; the
                // static graph models the call edge the same way GOTO
                // does and continues the block chain for the return path.
                self.pending_gotos.push((current, label.clone()));
                self.new_block()
            }
            Statement::ReturnFromGosub { .. } => {
                self.set_terminator(current, Terminator::Return);
                self.new_block()
            }
            Statement::OnGoto { selector, labels, .. } => {
                // A block has one terminator, so the N labels can't each
                // be a separate pending goto from `current` - they're
                // recorded together and resolved into one `Multiway` once
                // every label in the routine is known.
                let next = self.new_block();
                self.pending_multiway.push((current, selector.clone(), labels.clone(), next));
                next
            }
            Statement::Exit { kind, .. } => {
                if let Some(targets) = self.exit_target_for(*kind) {
                    self.set_terminator(current, Terminator::Fallthrough(targets));
                    self.new_block()
                } else {
                    self.push_stmt(current, stmt.clone());
                    current
                }
            }
            Statement::End { .. } => {
                self.set_terminator(current, Terminator::Return);
                self.new_block()
            }
            Statement::If { branches, else_branch, .. } => self.lower_if_chain(branches, else_branch, current),
            Statement::SelectCase { selector, arms, case_else, location } => {
                self.lower_select_case(selector, arms, case_else, location, current)
            }
            Statement::For { var, start, end, step, body, location, .. } => {
                self.lower_for(var, start, end, step, body, location, current)
            }
            Statement::While { condition, body, .. } => self.lower_while(condition, body, current),
            Statement::DoLoop { head, body, tail, .. } => self.lower_do_loop(head, body, tail, current),
            Statement::Repeat { body, until, .. } => self.lower_repeat(body, until, current),
            Statement::Try { body, catch_body, finally_body, .. } => {
                self.lower_try(body, catch_body, finally_body, current)
            }
            // Declarative/sequential statements just append to the block.
            Statement::Let { .. }
            | Statement::Dim { .. }
            | Statement::Print { .. }
            | Statement::Input { .. }
            | Statement::TypeDef { .. }
            | Statement::DefFn { .. }
            | Statement::Local { .. }
            | Statement::Throw { .. }
            | Statement::Data { .. }
            | Statement::Read { .. }
            | Statement::Restore { .. }
            | Statement::OptionStmt { .. }
            | Statement::Call { .. }
            | Statement::ExprStatement { .. } => {
                self.push_stmt(current, stmt.clone());
                current
            }
            Statement::SubDef { .. } | Statement::FunctionDef { .. } => current,
        }
    }

    fn exit_target_for(&self, kind: ExitKind) -> Option<BlockId> {
        match kind {
            ExitKind::For | ExitKind::While | ExitKind::Do => {
                self.loop_stack.last().map(|t| t.exit)
            }
            ExitKind::Sub | ExitKind::Function => None,
        }
    }

    fn lower_if_chain(
        &mut self,
        branches: &[(Expr, Vec<Statement>)],
        else_branch: &Option<Vec<Statement>>,
        current: BlockId,
    ) -> BlockId {
        let join = self.new_block();
        self.lower_if_branches(branches, else_branch, current, join);
        join
    }

    fn lower_if_branches(
        &mut self,
        branches: &[(Expr, Vec<Statement>)],
        else_branch: &Option<Vec<Statement>>,
        current: BlockId,
        join: BlockId,
    ) {
        let Some(((condition, body), rest)) = branches.split_first() else {
            if let Some(body) = else_branch {
                let else_entry = self.new_block();
                self.set_terminator(current, Terminator::Fallthrough(else_entry));
                let else_exit = self.process_nested_statements(body, else_entry);
                self.set_terminator(else_exit, Terminator::Fallthrough(join));
            } else {
                self.set_terminator(current, Terminator::Fallthrough(join));
            }
            return;
        };

        let then_entry = self.new_block();
        let else_entry = self.new_block();
        self.set_terminator(
            current,
            Terminator::Conditional {
                condition: condition.clone(),
                then_block: then_entry,
                else_block: else_entry,
            },
        );
        let then_exit = self.process_nested_statements(body, then_entry);
        self.set_terminator(then_exit, Terminator::Fallthrough(join));
        self.lower_if_branches(rest, else_branch, else_entry, join);
    }

    /// `SELECT CASE` lowers to the same conditional-chain shape an
    /// equivalent `IF`/`ELSEIF` ladder would produce, then records the
    /// original arm tests on a `Multiway` terminator anchored at the
    /// selector evaluation block so later passes can still see it as one
    /// decision instead of a chain of binary tests.
    fn lower_select_case(
        &mut self,
        selector: &Expr,
        arms: &[CaseArm],
        case_else: &Option<Vec<Statement>>,
        _location: &SourceLocation,
        current: BlockId,
    ) -> BlockId {
        let join = self.new_block();
        let default = self.new_block();
        if let Some(body) = case_else {
            let exit = self.process_nested_statements(body, default);
            self.set_terminator(exit, Terminator::Fallthrough(join));
        } else {
            self.set_terminator(default, Terminator::Fallthrough(join));
        }

        let mut arm_blocks = Vec::new();
        for arm in arms {
            let entry = self.new_block();
            let exit = self.process_nested_statements(&arm.body, entry);
            self.set_terminator(exit, Terminator::Fallthrough(join));
            for test in &arm.tests {
                arm_blocks.push((test.clone(), entry));
            }
        }

        self.set_terminator(
            current,
            Terminator::Multiway {
                selector: selector.clone(),
                arms: arm_blocks,
                default,
            },
        );
        join
    }

    fn lower_for(
        &mut self,
        var: &str,
        start: &Expr,
        end: &Expr,
        step: &Option<Expr>,
        body: &[Statement],
        location: &SourceLocation,
        current: BlockId,
    ) -> BlockId {
        let init = Statement::Let {
            target: LValue::Variable { name: var.to_string(), location: location.clone() },
            value: start.clone(),
            location: location.clone(),
        };
        self.push_stmt(current, init);

        let header = self.new_block();
        self.set_terminator(current, Terminator::Fallthrough(header));

        let body_entry = self.new_block();
        let increment = self.new_block();
        let exit = self.new_block();

        let condition = Expr::Binary {
            op: BinOp::Compare(CompareOp::Le),
            left: Box::new(Expr::Variable { name: var.to_string(), location: location.clone() }),
            right: Box::new(end.clone()),
            location: location.clone(),
        };
        self.set_terminator(
            header,
            Terminator::Conditional { condition, then_block: body_entry, else_block: exit },
        );

        self.loop_stack.push(LoopTargets { exit, continue_target: increment });
        let body_exit = self.process_nested_statements(body, body_entry);
        self.loop_stack.pop();
        self.set_terminator(body_exit, Terminator::Fallthrough(increment));

        let step_expr = step.clone().unwrap_or(Expr::IntLiteral { value: 1, location: location.clone() });
        let advance = Statement::Let {
            target: LValue::Variable { name: var.to_string(), location: location.clone() },
            value: Expr::Binary {
                op: BinOp::Add,
                left: Box::new(Expr::Variable { name: var.to_string(), location: location.clone() }),
                right: Box::new(step_expr),
                location: location.clone(),
            },
            location: location.clone(),
        };
        self.push_stmt(increment, advance);
        self.set_terminator(increment, Terminator::Fallthrough(header));

        exit
    }

    fn lower_while(&mut self, condition: &Expr, body: &[Statement], current: BlockId) -> BlockId {
        let header = self.new_block();
        self.set_terminator(current, Terminator::Fallthrough(header));

        let body_entry = self.new_block();
        let exit = self.new_block();
        self.set_terminator(
            header,
            Terminator::Conditional {
                condition: condition.clone(),
                then_block: body_entry,
                else_block: exit,
            },
        );

        self.loop_stack.push(LoopTargets { exit, continue_target: header });
        let body_exit = self.process_nested_statements(body, body_entry);
        self.loop_stack.pop();
        self.set_terminator(body_exit, Terminator::Fallthrough(header));

        exit
    }

    fn lower_do_loop(
        &mut self,
        head: &Option<(LoopTest, Expr)>,
        body: &[Statement],
        tail: &Option<(LoopTest, Expr)>,
        current: BlockId,
    ) -> BlockId {
        let header = self.new_block();
        self.set_terminator(current, Terminator::Fallthrough(header));

        let body_entry = self.new_block();
        let exit = self.new_block();

        match head {
            Some((test, cond)) => {
                let (then_block, else_block) = branch_order(*test, body_entry, exit);
                self.set_terminator(
                    header,
                    Terminator::Conditional { condition: cond.clone(), then_block, else_block },
                );
            }
            None => self.set_terminator(header, Terminator::Fallthrough(body_entry)),
        }

        self.loop_stack.push(LoopTargets { exit, continue_target: header });
        let body_exit = self.process_nested_statements(body, body_entry);
        self.loop_stack.pop();

        match tail {
            Some((test, cond)) => {
                let (then_block, else_block) = branch_order(*test, header, exit);
                self.set_terminator(
                    body_exit,
                    Terminator::Conditional { condition: cond.clone(), then_block, else_block },
                );
            }
            None => self.set_terminator(body_exit, Terminator::Fallthrough(header)),
        }

        exit
    }

    fn lower_repeat(&mut self, body: &[Statement], until: &Expr, current: BlockId) -> BlockId {
        let body_entry = self.new_block();
        self.set_terminator(current, Terminator::Fallthrough(body_entry));

        let exit = self.new_block();
        self.loop_stack.push(LoopTargets { exit, continue_target: body_entry });
        let body_exit = self.process_nested_statements(body, body_entry);
        self.loop_stack.pop();

        self.set_terminator(
            body_exit,
            Terminator::Conditional { condition: until.clone(), then_block: exit, else_block: body_entry },
        );
        exit
    }

    /// `TRY`/`CATCH`/`FINALLY` is modelled with the normal path falling
    /// through `body` then `finally`, while the exception path into
    /// `catch` is taken by the runtime unwinder rather than a static
    /// edge (spec §4.7: dispatch happens through `fb_exception_throw`,
    /// not a compile-time branch).
    fn lower_try(
        &mut self,
        body: &[Statement],
        catch_body: &[Statement],
        finally_body: &Option<Vec<Statement>>,
        current: BlockId,
    ) -> BlockId {
        let try_entry = self.new_block();
        self.set_terminator(current, Terminator::Fallthrough(try_entry));
        let try_exit = self.process_nested_statements(body, try_entry);

        let finally_entry = self.new_block();
        self.set_terminator(try_exit, Terminator::Fallthrough(finally_entry));

        if !catch_body.is_empty() {
            let catch_entry = self.new_block();
            let catch_exit = self.process_nested_statements(catch_body, catch_entry);
            self.set_terminator(catch_exit, Terminator::Fallthrough(finally_entry));
        }

        match finally_body {
            Some(stmts) => self.process_nested_statements(stmts, finally_entry),
            None => finally_entry,
        }
    }
}

fn branch_order(test: LoopTest, body: BlockId, exit: BlockId) -> (BlockId, BlockId) {
    match test {
        LoopTest::While => (body, exit),
        LoopTest::Until => (exit, body),
    }
}

/// Builds the CFG for one routine's flat statement body (the top-level
/// program, or a `SUB`/`FUNCTION` body).
pub fn build(body: &[Statement]) -> ControlFlowGraph {
    let mut builder = Builder::new();
    let entry = builder.new_block();
    let exit = builder.process_nested_statements(body, entry);
    builder.set_terminator(exit, Terminator::Return);

    for (block, label) in std::mem::take(&mut builder.pending_gotos) {
        if let Some(target) = builder.labels.get(&label) {
            match &builder.blocks[block.0 as usize].terminator {
                Terminator::Multiway { .. } => {}
                _ => builder.set_terminator(block, Terminator::Fallthrough(*target)),
            }
        }
    }

    // `ON GOTO`/`ON GOSUB` is indexed from 1 (spec §6.1); a selector value
    // outside `1..=labels.len()` falls through to `default` instead of
    // jumping anywhere.
    for (block, selector, labels, default) in std::mem::take(&mut builder.pending_multiway) {
        let arms = labels
            .iter()
            .enumerate()
            .filter_map(|(i, label)| {
                builder.labels.get(label).map(|target| {
                    let test = CaseTest::Value(Expr::IntLiteral {
                        value: (i + 1) as i64,
                        location: SourceLocation::synthetic(),
                    });
                    (test, *target)
                })
            })
            .collect();
        builder.set_terminator(block, Terminator::Multiway { selector, arms, default });
    }

    let reachable = compute_reachability(&builder.blocks, entry);
    ControlFlowGraph { entry, blocks: builder.blocks, reachable }
}

/// Reachability from `entry`, kept alongside the block list rather than
/// used to delete anything (spec §4.4 edge case: unreachable code after
/// an unconditional `GOTO` still becomes blocks).
fn compute_reachability(blocks: &[CfgBlock], entry: BlockId) -> Vec<bool> {
    let mut reachable = vec![false; blocks.len()];
    let mut stack = vec![entry];
    while let Some(id) = stack.pop() {
        if reachable[id.0 as usize] {
            continue;
        }
        reachable[id.0 as usize] = true;
        match &blocks[id.0 as usize].terminator {
            Terminator::Fallthrough(next) => stack.push(*next),
            Terminator::Conditional { then_block, else_block, .. } => {
                stack.push(*then_block);
                stack.push(*else_block);
            }
            Terminator::Multiway { arms, default, .. } => {
                stack.push(*default);
                for (_, target) in arms {
                    stack.push(*target);
                }
            }
            Terminator::Return | Terminator::Unreachable => {}
        }
    }
    reachable
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::parser::Parser;
    use fbasic_core::DiagnosticSink;

    fn build_program(src: &str) -> ControlFlowGraph {
        let mut sink = DiagnosticSink::new();
        let mut parser = Parser::new(src, PathBuf::from("t.bas"), &mut sink);
        let program = parser.parse_program().expect("parse should succeed");
        build(&program)
    }

    #[test]
    fn if_else_produces_conditional_terminator() {
        let cfg = build_program("IF x = 1 THEN\nPRINT 1\nELSE\nPRINT 2\nEND IF");
        assert!(matches!(cfg.block(cfg.entry).terminator, Terminator::Conditional { .. }));
    }

    #[test]
    fn while_loop_has_a_back_edge_to_its_header() {
        let cfg = build_program("WHILE x < 10\nx = x + 1\nWEND");
        let header = match cfg.block(cfg.entry).terminator {
            Terminator::Fallthrough(h) => h,
            ref other => panic!("expected fallthrough into header, got {other:?}"),
        };
        let body = match cfg.block(header).terminator {
            Terminator::Conditional { then_block, .. } => then_block,
            ref other => panic!("expected conditional header, got {other:?}"),
        };
        assert!(matches!(cfg.block(body).terminator, Terminator::Fallthrough(h) if h == header));
    }

    #[test]
    fn select_case_lowers_to_multiway_with_preserved_tests() {
        let cfg = build_program(
            "SELECT CASE x\nCASE 1\nPRINT 1\nCASE 2 TO 4\nPRINT 2\nCASE ELSE\nPRINT 3\nEND SELECT",
        );
        match &cfg.block(cfg.entry).terminator {
            Terminator::Multiway { arms, .. } => assert_eq!(arms.len(), 2),
            other => panic!("expected Multiway, got {other:?}"),
        }
    }

    #[test]
    fn forward_goto_resolves_to_its_label_block() {
        let cfg = build_program("GOTO skip\nPRINT 1\nskip:\nPRINT 2");
        match cfg.block(cfg.entry).terminator {
            Terminator::Fallthrough(target) => {
                assert!(cfg.block(target).statements.iter().any(|s| matches!(s, Statement::Print { .. })));
            }
            ref other => panic!("expected resolved fallthrough, got {other:?}"),
        }
    }

    #[test]
    fn unreachable_code_after_goto_is_still_a_block_but_flagged() {
        let cfg = build_program("GOTO skip\nPRINT 999\nskip:\nPRINT 1");
        let dead = cfg
            .blocks
            .iter()
            .find(|b| b.statements.iter().any(|s| matches!(s, Statement::Print { items, .. } if matches!(items[0].0, Expr::IntLiteral { value: 999, .. }))))
            .expect("dead block should still exist");
        assert!(!cfg.is_reachable(dead.id));
    }

    #[test]
    fn for_loop_builds_header_body_and_increment() {
        let cfg = build_program("FOR i = 1 TO 3\nPRINT i\nNEXT i");
        let header = match cfg.block(cfg.entry).terminator {
            Terminator::Fallthrough(h) => h,
            ref other => panic!("expected fallthrough into header, got {other:?}"),
        };
        assert!(matches!(cfg.block(header).terminator, Terminator::Conditional { .. }));
    }
}
