//! Recursive-descent parser with a Pratt-style expression parser
//! (spec §4.2).

use std::path::PathBuf;

use fbasic_core::{DiagnosticSink, SourceLocation};

use crate::ast::*;
use crate::lexer::tokenize;
use crate::token::{Keyword, NumericLiteral, Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, String>;

impl Parser {
    pub fn new(source: &str, file: PathBuf, sink: &mut DiagnosticSink) -> Self {
        let tokens = tokenize(source, file, sink);
        Parser { tokens, pos: 0 }
    }

    // -- token stream helpers -------------------------------------------------

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn loc(&self) -> SourceLocation {
        self.current().location.clone()
    }

    fn is_eof(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if !self.is_eof() {
            self.pos += 1;
        }
        tok
    }

    fn skip_newlines(&mut self) {
        while matches!(self.current().kind, TokenKind::Newline) {
            self.advance();
        }
    }

    fn check_kw(&self, kw: Keyword) -> bool {
        matches!(&self.current().kind, TokenKind::Keyword(k) if *k == kw)
    }

    fn check_op(&self, op: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Op(o) if *o == op)
    }

    fn consume_kw(&mut self, kw: Keyword) -> PResult<()> {
        if self.check_kw(kw) {
            self.advance();
            Ok(())
        } else {
            Err(format!(
                "{}: expected keyword {:?}, found {:?}",
                self.loc(),
                kw,
                self.current().kind
            ))
        }
    }

    fn consume_op(&mut self, op: &str) -> PResult<()> {
        if self.check_op(op) {
            self.advance();
            Ok(())
        } else {
            Err(format!(
                "{}: expected '{}', found {:?}",
                self.loc(),
                op,
                self.current().kind
            ))
        }
    }

    fn expect_identifier(&mut self) -> PResult<String> {
        match self.current().kind.clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(format!("{}: expected identifier, found {:?}", self.loc(), other)),
        }
    }

    /// True when a multi-line block is at its natural end: a terminating
    /// keyword, or EOF. Used to stop collecting nested statement lists.
    fn at_block_end(&self, terminators: &[Keyword]) -> bool {
        if self.is_eof() {
            return true;
        }
        terminators.iter().any(|k| self.check_kw(*k))
    }

    // -- top level --------------------------------------------------------

    pub fn parse_program(&mut self) -> PResult<Program> {
        let mut stmts = Vec::new();
        self.skip_newlines();
        while !self.is_eof() {
            stmts.push(self.parse_statement()?);
            self.skip_newlines();
        }
        Ok(stmts)
    }

    /// Parses statements until one of `terminators` is seen (spec §4.2:
    /// "Nested statements in multi-line IF, ELSEIF, and ELSE blocks are
    /// collected into child lists").
    fn parse_block(&mut self, terminators: &[Keyword]) -> PResult<Vec<Statement>> {
        let mut stmts = Vec::new();
        self.skip_newlines();
        while !self.at_block_end(terminators) {
            stmts.push(self.parse_statement()?);
            self.skip_newlines();
        }
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> PResult<Statement> {
        let loc = self.loc();
        if let TokenKind::Keyword(kw) = self.current().kind {
            return match kw {
                Keyword::Let => self.parse_let(loc),
                Keyword::Dim => self.parse_dim(loc),
                Keyword::Print => self.parse_print(loc),
                Keyword::Input => self.parse_input(loc),
                Keyword::If => self.parse_if(loc),
                Keyword::For => self.parse_for(loc),
                Keyword::While => self.parse_while(loc),
                Keyword::Do => self.parse_do_loop(loc),
                Keyword::Repeat => self.parse_repeat(loc),
                Keyword::Select => self.parse_select_case(loc),
                Keyword::Goto => self.parse_goto(loc),
                Keyword::Gosub => self.parse_gosub(loc),
                Keyword::Return => {
                    self.advance();
                    Ok(Statement::ReturnFromGosub { location: loc })
                }
                Keyword::On => self.parse_on(loc),
                Keyword::Exit => self.parse_exit(loc),
                Keyword::Type => self.parse_type_def(loc),
                Keyword::Sub => self.parse_sub_def(loc),
                Keyword::Function => self.parse_function_def(loc),
                Keyword::Def => self.parse_def_fn(loc),
                Keyword::Local => self.parse_local(loc),
                Keyword::Try => self.parse_try(loc),
                Keyword::Throw => {
                    self.advance();
                    let value = self.parse_expr()?;
                    Ok(Statement::Throw { value, location: loc })
                }
                Keyword::End => {
                    self.advance();
                    Ok(Statement::End { location: loc })
                }
                Keyword::Data => self.parse_data(loc),
                Keyword::Read => self.parse_read(loc),
                Keyword::Restore => self.parse_restore(loc),
                Keyword::Option => self.parse_option(loc),
                Keyword::Call => self.parse_call_stmt(loc),
                _ => Err(format!("{}: unexpected keyword {:?}", loc, kw)),
            };
        }

        // `name:` is a label; `name = ...` is a LET without the keyword;
        // anything else falling through here is a bare call or expression.
        if let TokenKind::Identifier(name) = self.current().kind.clone() {
            if matches!(self.peek_kind(1), TokenKind::Op(":")) {
                self.advance();
                self.advance();
                return Ok(Statement::Label { name, location: loc });
            }
            return self.parse_implicit_let_or_call(loc);
        }

        Err(format!(
            "{}: unexpected token {:?}",
            loc,
            self.current().kind
        ))
    }

    fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind.clone())
            .unwrap_or(TokenKind::Eof)
    }

    // -- individual statements ---------------------------------------------

    fn parse_let(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // LET
        let target = self.parse_lvalue()?;
        self.consume_op("=")?;
        let value = self.parse_expr()?;
        Ok(Statement::Let { target, value, location: loc })
    }

    fn parse_implicit_let_or_call(&mut self, loc: SourceLocation) -> PResult<Statement> {
        let target = self.parse_lvalue()?;
        if self.check_op("=") {
            self.advance();
            let value = self.parse_expr()?;
            return Ok(Statement::Let { target, value, location: loc });
        }
        // Not an assignment: treat the already-parsed lvalue as a bare call
        // (e.g. `Demo` with no args) by reinterpreting it as an expression.
        let expr = lvalue_to_expr(target);
        Ok(Statement::ExprStatement { expr, location: loc })
    }

    fn parse_lvalue(&mut self) -> PResult<LValue> {
        let loc = self.loc();
        let name = self.expect_identifier()?;
        let mut lvalue = if self.check_op("(") {
            self.advance();
            let indices = self.parse_expr_list(")")?;
            self.consume_op(")")?;
            LValue::ArrayElement { name, indices, location: loc.clone() }
        } else {
            LValue::Variable { name, location: loc.clone() }
        };
        while self.check_op(".") {
            self.advance();
            let field_loc = self.loc();
            let field = self.expect_identifier()?;
            lvalue = LValue::Member {
                base: Box::new(lvalue),
                field,
                location: field_loc,
            };
        }
        Ok(lvalue)
    }

    fn parse_dim(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // DIM
        let name = self.expect_identifier()?;
        let mut dims = Vec::new();
        if self.check_op("(") {
            self.advance();
            dims = self.parse_expr_list(")")?;
            self.consume_op(")")?;
        }
        let as_type = self.parse_optional_as()?;
        Ok(Statement::Dim { name, dims, as_type, location: loc })
    }

    fn parse_optional_as(&mut self) -> PResult<Option<TypeName>> {
        if self.check_kw(Keyword::As) {
            self.advance();
            let loc = self.loc();
            let base = self.expect_identifier()?;
            return Ok(Some(TypeName { base, location: loc }));
        }
        Ok(None)
    }

    fn parse_print(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // PRINT
        let mut items = Vec::new();
        if self.at_statement_end() {
            return Ok(Statement::Print { items, location: loc });
        }
        loop {
            let expr = self.parse_expr()?;
            let sep = if self.check_op(";") {
                self.advance();
                Some(PrintSeparator::Semicolon)
            } else if self.check_op(",") {
                self.advance();
                Some(PrintSeparator::Comma)
            } else {
                None
            };
            let end = sep.is_none();
            items.push((expr, sep));
            if end || self.at_statement_end() {
                break;
            }
        }
        Ok(Statement::Print { items, location: loc })
    }

    fn at_statement_end(&self) -> bool {
        self.is_eof() || matches!(self.current().kind, TokenKind::Newline)
    }

    fn parse_input(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // INPUT
        let mut prompt = None;
        if let TokenKind::StringLiteral { text, .. } = self.current().kind.clone() {
            self.advance();
            self.consume_op(";").or_else(|_| self.consume_op(","))?;
            prompt = Some(text);
        }
        let mut targets = vec![self.parse_lvalue()?];
        while self.check_op(",") {
            self.advance();
            targets.push(self.parse_lvalue()?);
        }
        Ok(Statement::Input { prompt, targets, location: loc })
    }

    fn parse_if(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // IF
        let condition = self.parse_expr()?;
        self.consume_kw(Keyword::Then)?;

        // Single-line form: `IF cond THEN <stmt>` with no following newline
        // before a statement begins (spec §4.2).
        if !self.at_statement_end() && !self.check_kw(Keyword::End) {
            let branches = vec![(condition, vec![self.parse_statement()?])];
            let mut else_branch = None;
            if self.check_kw(Keyword::Else) {
                self.advance();
                else_branch = Some(vec![self.parse_statement()?]);
            }
            return Ok(Statement::If {
                branches,
                else_branch,
                single_line: true,
                location: loc,
            });
        }

        let mut branches = Vec::new();
        let body = self.parse_block(&[Keyword::ElseIf, Keyword::Else, Keyword::EndIf, Keyword::End])?;
        branches.push((condition, body));

        while self.check_kw(Keyword::ElseIf) {
            self.advance();
            let cond = self.parse_expr()?;
            self.consume_kw(Keyword::Then)?;
            let body = self.parse_block(&[Keyword::ElseIf, Keyword::Else, Keyword::EndIf, Keyword::End])?;
            branches.push((cond, body));
        }

        let else_branch = if self.check_kw(Keyword::Else) {
            self.advance();
            Some(self.parse_block(&[Keyword::EndIf, Keyword::End])?)
        } else {
            None
        };

        self.consume_end_if()?;
        Ok(Statement::If { branches, else_branch, single_line: false, location: loc })
    }

    /// Accepts both `END IF` and `ENDIF` spellings (spec §4.1).
    fn consume_end_if(&mut self) -> PResult<()> {
        if self.check_kw(Keyword::EndIf) {
            self.advance();
            return Ok(());
        }
        if self.check_kw(Keyword::End) {
            self.advance();
            self.consume_kw(Keyword::If)?;
            return Ok(());
        }
        Err(format!("{}: expected END IF", self.loc()))
    }

    fn parse_for(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // FOR
        let var = self.expect_identifier()?;
        self.consume_op("=")?;
        let start = self.parse_expr()?;
        self.consume_kw(Keyword::To)?;
        let end = self.parse_expr()?;
        let step = if self.check_kw(Keyword::Step) {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };
        let body = self.parse_block(&[Keyword::Next])?;
        self.consume_kw(Keyword::Next)?;
        let next_var = if let TokenKind::Identifier(name) = self.current().kind.clone() {
            self.advance();
            Some(name)
        } else {
            None
        };
        Ok(Statement::For { var, start, end, step, body, next_var, location: loc })
    }

    fn parse_while(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // WHILE
        let condition = self.parse_expr()?;
        let body = self.parse_block(&[Keyword::Wend])?;
        self.consume_kw(Keyword::Wend)?;
        Ok(Statement::While { condition, body, location: loc })
    }

    fn parse_do_loop(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // DO
        let head = self.parse_loop_test_opt()?;
        let body = self.parse_block(&[Keyword::Loop])?;
        self.consume_kw(Keyword::Loop)?;
        let tail = self.parse_loop_test_opt()?;
        Ok(Statement::DoLoop { head, body, tail, location: loc })
    }

    fn parse_loop_test_opt(&mut self) -> PResult<Option<(LoopTest, Expr)>> {
        if self.check_kw(Keyword::While) {
            self.advance();
            return Ok(Some((LoopTest::While, self.parse_expr()?)));
        }
        if self.check_kw(Keyword::Until) {
            self.advance();
            return Ok(Some((LoopTest::Until, self.parse_expr()?)));
        }
        Ok(None)
    }

    fn parse_repeat(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // REPEAT
        let body = self.parse_block(&[Keyword::Until])?;
        self.consume_kw(Keyword::Until)?;
        let until = self.parse_expr()?;
        Ok(Statement::Repeat { body, until, location: loc })
    }

    fn parse_select_case(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // SELECT
        self.consume_kw(Keyword::Case)?;
        let selector = self.parse_expr()?;
        self.skip_newlines();
        let mut arms = Vec::new();
        let mut case_else = None;
        while self.check_kw(Keyword::Case) {
            self.advance();
            let arm_loc = self.loc();
            if self.check_kw(Keyword::Else) {
                self.advance();
                case_else = Some(self.parse_block(&[Keyword::Case, Keyword::EndSelect, Keyword::End])?);
                break;
            }
            let tests = self.parse_case_tests()?;
            if self.check_op(":") {
                self.advance();
            }
            let body = self.parse_block(&[Keyword::Case, Keyword::EndSelect, Keyword::End])?;
            arms.push(CaseArm { tests, body, location: arm_loc });
        }
        self.consume_end_select()?;
        Ok(Statement::SelectCase { selector, arms, case_else, location: loc })
    }

    fn consume_end_select(&mut self) -> PResult<()> {
        if self.check_kw(Keyword::EndSelect) {
            self.advance();
            return Ok(());
        }
        if self.check_kw(Keyword::End) {
            self.advance();
            self.consume_kw(Keyword::Select)?;
            return Ok(());
        }
        Err(format!("{}: expected END SELECT", self.loc()))
    }

    fn parse_case_tests(&mut self) -> PResult<Vec<CaseTest>> {
        let mut tests = vec![self.parse_case_test()?];
        while self.check_op(",") {
            self.advance();
            tests.push(self.parse_case_test()?);
        }
        Ok(tests)
    }

    fn parse_case_test(&mut self) -> PResult<CaseTest> {
        if self.check_kw(Keyword::Is) {
            self.advance();
            let op = self.parse_compare_op()?;
            let value = self.parse_expr()?;
            return Ok(CaseTest::Is(op, value));
        }
        let first = self.parse_expr()?;
        if self.check_kw(Keyword::To) {
            self.advance();
            let second = self.parse_expr()?;
            return Ok(CaseTest::Range(first, second));
        }
        Ok(CaseTest::Value(first))
    }

    fn parse_compare_op(&mut self) -> PResult<CompareOp> {
        for (text, op) in [
            ("<=", CompareOp::Le),
            (">=", CompareOp::Ge),
            ("<>", CompareOp::Ne),
            ("><", CompareOp::Ne),
            ("=", CompareOp::Eq),
            ("<", CompareOp::Lt),
            (">", CompareOp::Gt),
        ] {
            if self.check_op(text) {
                self.advance();
                return Ok(op);
            }
        }
        Err(format!("{}: expected a comparison operator", self.loc()))
    }

    fn parse_goto(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // GOTO
        let label = self.expect_label()?;
        Ok(Statement::Goto { label, location: loc })
    }

    fn parse_gosub(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // GOSUB
        let label = self.expect_label()?;
        Ok(Statement::Gosub { label, location: loc })
    }

    /// A GOTO/GOSUB target is either an identifier label or a bare integer
    /// line number.
    fn expect_label(&mut self) -> PResult<String> {
        match self.current().kind.clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            TokenKind::Number(NumericLiteral::Integer(n), _) => {
                self.advance();
                Ok(n.to_string())
            }
            other => Err(format!("{}: expected a label, found {:?}", self.loc(), other)),
        }
    }

    fn parse_on(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // ON
        let selector = self.parse_expr()?;
        let is_gosub = if self.check_kw(Keyword::Gosub) {
            self.advance();
            true
        } else {
            self.consume_kw(Keyword::Goto)?;
            false
        };
        let mut labels = vec![self.expect_label()?];
        while self.check_op(",") {
            self.advance();
            labels.push(self.expect_label()?);
        }
        Ok(Statement::OnGoto { selector, labels, is_gosub, location: loc })
    }

    fn parse_exit(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // EXIT
        let kind = match self.current().kind {
            TokenKind::Keyword(Keyword::For) => ExitKind::For,
            TokenKind::Keyword(Keyword::While) => ExitKind::While,
            TokenKind::Keyword(Keyword::Do) => ExitKind::Do,
            TokenKind::Keyword(Keyword::Sub) => ExitKind::Sub,
            TokenKind::Keyword(Keyword::Function) => ExitKind::Function,
            ref other => return Err(format!("{}: invalid EXIT target {:?}", self.loc(), other)),
        };
        self.advance();
        Ok(Statement::Exit { kind, location: loc })
    }

    fn parse_type_def(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // TYPE
        let name = self.expect_identifier()?;
        self.skip_newlines();
        let mut fields = Vec::new();
        let mut seen = std::collections::HashSet::new();
        while !self.check_kw(Keyword::EndType) && !self.check_kw(Keyword::End) {
            let field_name = self.expect_identifier()?;
            if !seen.insert(field_name.clone()) {
                return Err(format!(
                    "{}: duplicate field '{}' in TYPE {}",
                    self.loc(), field_name, name
                ));
            }
            self.consume_kw(Keyword::As)?;
            let type_loc = self.loc();
            let base = self.expect_identifier()?;
            if self.check_op("(") {
                return Err(format!(
                    "{}: inline array fields are not allowed in TYPE",
                    self.loc()
                ));
            }
            fields.push((field_name, TypeName { base, location: type_loc }));
            self.skip_newlines();
        }
        if self.check_kw(Keyword::EndType) {
            self.advance();
        } else {
            self.consume_kw(Keyword::End)?;
            self.consume_kw(Keyword::Type)?;
        }
        Ok(Statement::TypeDef { name, fields, location: loc })
    }

    fn parse_params(&mut self) -> PResult<Vec<Param>> {
        let mut params = Vec::new();
        self.consume_op("(")?;
        if !self.check_op(")") {
            loop {
                let name = self.expect_identifier()?;
                let as_type = self
                    .parse_optional_as()?
                    .unwrap_or(TypeName { base: "DOUBLE".to_string(), location: self.loc() });
                params.push(Param { name, as_type, by_ref: false });
                if self.check_op(",") {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.consume_op(")")?;
        Ok(params)
    }

    fn parse_sub_def(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // SUB
        let name = self.expect_identifier()?;
        let params = self.parse_params()?;
        let body = self.parse_block(&[Keyword::EndSub, Keyword::End])?;
        if self.check_kw(Keyword::EndSub) {
            self.advance();
        } else {
            self.consume_kw(Keyword::End)?;
            self.consume_kw(Keyword::Sub)?;
        }
        Ok(Statement::SubDef { name, params, body, location: loc })
    }

    fn parse_function_def(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // FUNCTION
        let name = self.expect_identifier()?;
        let params = self.parse_params()?;
        let return_type = self.parse_optional_as()?;
        let body = self.parse_block(&[Keyword::EndFunction, Keyword::End])?;
        if self.check_kw(Keyword::EndFunction) {
            self.advance();
        } else {
            self.consume_kw(Keyword::End)?;
            self.consume_kw(Keyword::Function)?;
        }
        Ok(Statement::FunctionDef { name, params, return_type, body, location: loc })
    }

    fn parse_def_fn(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // DEF
        self.consume_kw(Keyword::Fn)?;
        let name = self.expect_identifier()?;
        let params = if self.check_op("(") {
            self.parse_params()?
        } else {
            Vec::new()
        };
        self.consume_op("=")?;
        let body = self.parse_expr()?;
        Ok(Statement::DefFn { name, params, body, location: loc })
    }

    fn parse_local(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // LOCAL
        let name = self.expect_identifier()?;
        self.consume_kw(Keyword::As)?;
        let type_loc = self.loc();
        let base = self.expect_identifier()?;
        Ok(Statement::Local {
            name,
            as_type: TypeName { base, location: type_loc },
            location: loc,
        })
    }

    fn parse_try(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // TRY
        let body = self.parse_block(&[Keyword::Catch, Keyword::Finally, Keyword::EndTry, Keyword::End])?;
        let mut catch_var = None;
        let mut catch_body = Vec::new();
        if self.check_kw(Keyword::Catch) {
            self.advance();
            if let TokenKind::Identifier(name) = self.current().kind.clone() {
                self.advance();
                catch_var = Some(name);
            }
            catch_body = self.parse_block(&[Keyword::Finally, Keyword::EndTry, Keyword::End])?;
        }
        let finally_body = if self.check_kw(Keyword::Finally) {
            self.advance();
            Some(self.parse_block(&[Keyword::EndTry, Keyword::End])?)
        } else {
            None
        };
        if self.check_kw(Keyword::EndTry) {
            self.advance();
        } else {
            self.consume_kw(Keyword::End)?;
            self.consume_kw(Keyword::Try)?;
        }
        Ok(Statement::Try { body, catch_var, catch_body, finally_body, location: loc })
    }

    fn parse_data(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // DATA
        let values = self.parse_expr_list_until_stmt_end()?;
        Ok(Statement::Data { values, location: loc })
    }

    fn parse_expr_list_until_stmt_end(&mut self) -> PResult<Vec<Expr>> {
        let mut values = vec![self.parse_expr()?];
        while self.check_op(",") {
            self.advance();
            values.push(self.parse_expr()?);
        }
        Ok(values)
    }

    fn parse_read(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // READ
        let mut targets = vec![self.parse_lvalue()?];
        while self.check_op(",") {
            self.advance();
            targets.push(self.parse_lvalue()?);
        }
        Ok(Statement::Read { targets, location: loc })
    }

    fn parse_restore(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // RESTORE
        let label_or_index = self.expect_label().ok();
        Ok(Statement::Restore { label_or_index, location: loc })
    }

    fn parse_option(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // OPTION
        let option = if self.check_kw(Keyword::Base) {
            self.advance();
            match self.current().kind.clone() {
                TokenKind::Number(NumericLiteral::Integer(0), _) => {
                    self.advance();
                    OptionKind::BaseZero
                }
                TokenKind::Number(NumericLiteral::Integer(1), _) => {
                    self.advance();
                    OptionKind::BaseOne
                }
                other => return Err(format!("{}: OPTION BASE must be 0 or 1, found {:?}", self.loc(), other)),
            }
        } else if self.check_kw(Keyword::Ascii) {
            self.advance();
            OptionKind::Ascii
        } else if self.check_kw(Keyword::Unicode) {
            self.advance();
            OptionKind::Unicode
        } else if self.check_kw(Keyword::DetectString) {
            self.advance();
            OptionKind::DetectString
        } else {
            return Err(format!("{}: unknown OPTION {:?}", self.loc(), self.current().kind));
        };
        Ok(Statement::OptionStmt { option, location: loc })
    }

    fn parse_call_stmt(&mut self, loc: SourceLocation) -> PResult<Statement> {
        self.advance(); // CALL
        let name = self.expect_identifier()?;
        let args = if self.check_op("(") {
            self.advance();
            let args = self.parse_expr_list(")")?;
            self.consume_op(")")?;
            args
        } else {
            Vec::new()
        };
        Ok(Statement::Call { name, args, location: loc })
    }

    fn parse_expr_list(&mut self, close: &str) -> PResult<Vec<Expr>> {
        let mut items = Vec::new();
        if self.check_op(close) {
            return Ok(items);
        }
        items.push(self.parse_expr()?);
        while self.check_op(",") {
            self.advance();
            items.push(self.parse_expr()?);
        }
        Ok(items)
    }

    // -- expressions (Pratt) ------------------------------------------------

    pub fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut left = self.parse_and()?;
        while self.check_kw(Keyword::Or) {
            let loc = self.loc();
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Binary { op: BinOp::Or, left: Box::new(left), right: Box::new(right), location: loc };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut left = self.parse_not()?;
        while self.check_kw(Keyword::And) {
            let loc = self.loc();
            self.advance();
            let right = self.parse_not()?;
            left = Expr::Binary { op: BinOp::And, left: Box::new(left), right: Box::new(right), location: loc };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> PResult<Expr> {
        if self.check_kw(Keyword::Not) {
            let loc = self.loc();
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Expr::Unary { op: UnaryOp::Not, operand: Box::new(operand), location: loc });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let left = self.parse_concat()?;
        if let Some(op) = self.try_compare_op() {
            let loc = self.loc();
            self.advance();
            let right = self.parse_concat()?;
            return Ok(Expr::Binary {
                op: BinOp::Compare(op),
                left: Box::new(left),
                right: Box::new(right),
                location: loc,
            });
        }
        Ok(left)
    }

    fn try_compare_op(&self) -> Option<CompareOp> {
        for (text, op) in [
            ("<=", CompareOp::Le),
            (">=", CompareOp::Ge),
            ("<>", CompareOp::Ne),
            ("><", CompareOp::Ne),
            ("=", CompareOp::Eq),
            ("<", CompareOp::Lt),
            (">", CompareOp::Gt),
        ] {
            if self.check_op(text) {
                return Some(op);
            }
        }
        None
    }

    fn parse_concat(&mut self) -> PResult<Expr> {
        // String concatenation shares `+`'s precedence level; additive
        // parsing decides Add vs Concat once operand types are known at
        // semantic analysis, so the parser just records `Add` here and the
        // semantic analyzer rewrites it to `Concat` when either side is a
        // string type.
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.check_op("+") {
                BinOp::Add
            } else if self.check_op("-") {
                BinOp::Sub
            } else {
                break;
            };
            let loc = self.loc();
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), location: loc };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.check_op("*") {
                BinOp::Mul
            } else if self.check_op("/") {
                BinOp::Div
            } else if self.check_op("\\") {
                BinOp::IntDiv
            } else if self.check_kw(Keyword::Mod) {
                BinOp::Mod
            } else {
                break;
            };
            let loc = self.loc();
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), location: loc };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        if self.check_op("-") {
            let loc = self.loc();
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary { op: UnaryOp::Neg, operand: Box::new(operand), location: loc });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        while self.check_op(".") {
            let loc = self.loc();
            self.advance();
            let field = self.expect_identifier()?;
            expr = Expr::Member { base: Box::new(expr), field, location: loc };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let loc = self.loc();
        match self.current().kind.clone() {
            TokenKind::Number(NumericLiteral::Integer(v), _) => {
                self.advance();
                Ok(Expr::IntLiteral { value: v, location: loc })
            }
            TokenKind::Number(NumericLiteral::Float(v), _) => {
                self.advance();
                Ok(Expr::FloatLiteral { value: v, location: loc })
            }
            TokenKind::StringLiteral { text, has_non_ascii } => {
                self.advance();
                Ok(Expr::StringLiteral { value: text, has_non_ascii, location: loc })
            }
            TokenKind::Op("(") => {
                self.advance();
                let inner = self.parse_expr()?;
                self.consume_op(")")?;
                Ok(inner)
            }
            TokenKind::Keyword(Keyword::Fn) => {
                self.advance();
                let name = self.expect_identifier()?;
                let args = if self.check_op("(") {
                    self.advance();
                    let args = self.parse_expr_list(")")?;
                    self.consume_op(")")?;
                    args
                } else {
                    Vec::new()
                };
                Ok(Expr::FnCall { name, args, location: loc })
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if self.check_op("(") {
                    self.advance();
                    let args = self.parse_expr_list(")")?;
                    self.consume_op(")")?;
                    // Disambiguated (array element vs. function call) by
                    // the semantic analyzer, which knows what `name` is.
                    return Ok(Expr::Call { name, args, location: loc });
                }
                Ok(Expr::Variable { name, location: loc })
            }
            other => Err(format!("{}: unexpected token in expression: {:?}", loc, other)),
        }
    }
}

/// Treats an already-parsed `LValue` as a no-argument call expression,
/// used when a statement that looks like an assignment target turns out
/// to be a bare call (`CALL`-less sub invocation).
fn lvalue_to_expr(lvalue: LValue) -> Expr {
    match lvalue {
        LValue::Variable { name, location } => Expr::Variable { name, location },
        LValue::ArrayElement { name, indices, location } => {
            Expr::ArrayAccess { name, indices, location }
        }
        LValue::Member { base, field, location } => {
            Expr::Member { base: Box::new(lvalue_to_expr(*base)), field, location }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Program {
        let mut sink = DiagnosticSink::new();
        let mut parser = Parser::new(src, PathBuf::from("t.bas"), &mut sink);
        parser.parse_program().expect("parse should succeed")
    }

    #[test]
    fn single_line_if_is_flagged_single_line() {
        let program = parse_ok("IF x = 1 THEN PRINT 1");
        match &program[0] {
            Statement::If { single_line, branches, .. } => {
                assert!(*single_line);
                assert_eq!(branches[0].1.len(), 1);
            }
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn multiline_if_collects_nested_statements_in_child_lists() {
        let program = parse_ok(
            "IF 1 = 1 THEN\n  j = 4\n  WHILE j <= 10\n    PRINT j\n    j = j + 2\n  WEND\nEND IF",
        );
        match &program[0] {
            Statement::If { single_line, branches, .. } => {
                assert!(!single_line);
                assert_eq!(branches[0].1.len(), 2);
                assert!(matches!(branches[0].1[1], Statement::While { .. }));
            }
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn select_case_parses_value_range_and_is_tests() {
        let program = parse_ok(
            "SELECT CASE x\nCASE 1.5\nPRINT \"a\"\nCASE 2.0 TO 3.0\nPRINT \"b\"\nCASE IS > 10\nPRINT \"c\"\nCASE ELSE\nPRINT \"z\"\nEND SELECT",
        );
        match &program[0] {
            Statement::SelectCase { arms, case_else, .. } => {
                assert_eq!(arms.len(), 3);
                assert!(matches!(arms[0].tests[0], CaseTest::Value(_)));
                assert!(matches!(arms[1].tests[0], CaseTest::Range(_, _)));
                assert!(matches!(arms[2].tests[0], CaseTest::Is(CompareOp::Gt, _)));
                assert!(case_else.is_some());
            }
            other => panic!("expected SelectCase, got {other:?}"),
        }
    }

    #[test]
    fn type_def_rejects_duplicate_fields() {
        let mut sink = DiagnosticSink::new();
        let mut parser = Parser::new(
            "TYPE Point\nx AS INTEGER\nx AS INTEGER\nEND TYPE",
            PathBuf::from("t.bas"),
            &mut sink,
        );
        assert!(parser.parse_program().is_err());
    }

    #[test]
    fn fn_call_parses_as_first_class_call() {
        let program = parse_ok("PRINT FN Square(3)");
        match &program[0] {
            Statement::Print { items, .. } => {
                assert!(matches!(items[0].0, Expr::FnCall { .. }));
            }
            other => panic!("expected Print, got {other:?}"),
        }
    }

    #[test]
    fn dim_with_as_type_and_dimensions_parses() {
        let program = parse_ok("DIM arr(10) AS LONG");
        match &program[0] {
            Statement::Dim { dims, as_type, .. } => {
                assert_eq!(dims.len(), 1);
                assert_eq!(as_type.as_ref().unwrap().base, "LONG");
            }
            other => panic!("expected Dim, got {other:?}"),
        }
    }

    #[test]
    fn try_catch_finally_parses_all_three_sections() {
        let program = parse_ok(
            "TRY\nPRINT 1\nCATCH e\nPRINT 2\nFINALLY\nPRINT 3\nEND TRY",
        );
        match &program[0] {
            Statement::Try { catch_var, catch_body, finally_body, .. } => {
                assert_eq!(catch_var.as_deref(), Some("e"));
                assert_eq!(catch_body.len(), 1);
                assert!(finally_body.is_some());
            }
            other => panic!("expected Try, got {other:?}"),
        }
    }
}
