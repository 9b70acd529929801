//! Semantic analyzer (spec §4.3): type collection, forward declaration,
//! and a statement walk that resolves types, tracks scope, and rejects
//! ill-typed or ill-scoped programs.
//!
//! Runs in four phases, each completing (and reporting every diagnostic it
//! can) before the next begins:
//!   1. `collect_types` - register every `TYPE ... END TYPE`, rejecting
//!      duplicate names and field-cycle chains.
//!   2. `collect_routines` - forward-declare every `SUB`/`FUNCTION`/`DEF FN`
//!      so forward calls resolve.
//!   3. `walk` - recurse through the statement tree, resolving expression
//!      types, checking coercions, and tracking `OPTION` state.
//!   4. label/GOTO resolution - every `GOTO`/`GOSUB` target must name a
//!      label or line number that exists somewhere in the same routine.

use std::collections::{HashMap, HashSet};

use fbasic_core::{DiagnosticSink, ErrorKind, SourceLocation};

use crate::ast::*;
use crate::config::{ArrayBase, CompilerConfig, StringMode};
use crate::symbols::{Scope, Symbol, SymbolKind, SymbolTable, TypeRegistry};
use crate::types::{classify_coercion, common_arithmetic_type, BaseType, Coercion, TypeDescriptor};

pub struct SemanticResult {
    pub symbols: SymbolTable,
    pub types: TypeRegistry,
    pub config: CompilerConfig,
}

pub struct Analyzer<'a> {
    sink: &'a mut DiagnosticSink,
    symbols: SymbolTable,
    types: TypeRegistry,
    config: CompilerConfig,
    current_function: Option<String>,
    labels_seen: HashSet<String>,
    goto_targets: Vec<(String, SourceLocation)>,
}

impl<'a> Analyzer<'a> {
    pub fn new(sink: &'a mut DiagnosticSink) -> Self {
        Analyzer {
            sink,
            symbols: SymbolTable::new(),
            types: TypeRegistry::new(),
            config: CompilerConfig::new(),
            current_function: None,
            labels_seen: HashSet::new(),
            goto_targets: Vec::new(),
        }
    }

    pub fn analyze(mut self, program: &Program) -> SemanticResult {
        self.collect_types(program);
        self.collect_routines(program);
        self.collect_labels(program);
        for stmt in program {
            self.walk_statement(stmt);
        }
        for (label, loc) in std::mem::take(&mut self.goto_targets) {
            if !self.labels_seen.contains(&label) {
                self.sink.error(
                    ErrorKind::BadControlFlow,
                    loc,
                    format!("GOTO/GOSUB target '{label}' is not defined"),
                );
            }
        }
        SemanticResult {
            symbols: self.symbols,
            types: self.types,
            config: self.config,
        }
    }

    // -- phase 1: types -----------------------------------------------------

    fn collect_types(&mut self, program: &Program) {
        let mut raw: HashMap<String, Vec<(String, TypeName)>> = HashMap::new();
        let mut order = Vec::new();
        for stmt in program {
            if let Statement::TypeDef { name, fields, location } = stmt {
                if raw.contains_key(name) {
                    self.sink.error(
                        ErrorKind::Redefinition,
                        location.clone(),
                        format!("type '{name}' is already defined"),
                    );
                    continue;
                }
                raw.insert(name.clone(), fields.clone());
                order.push((name.clone(), location.clone()));
            }
        }

        for (name, _) in &order {
            if self.type_has_cycle(name, &raw, &mut HashSet::new()) {
                let loc = order
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, l)| l.clone())
                    .unwrap_or_else(SourceLocation::synthetic);
                self.sink.error(
                    ErrorKind::TypeMismatch,
                    loc,
                    format!("type '{name}' has a cyclic field reference"),
                );
            }
        }

        for (name, location) in &order {
            let fields = &raw[name];
            let descriptors: Vec<(String, TypeDescriptor)> = fields
                .iter()
                .map(|(fname, tn)| (fname.clone(), self.resolve_type_name(tn)))
                .collect();
            if let Err(msg) = self.types.declare(name, &descriptors) {
                self.sink.error(ErrorKind::Redefinition, location.clone(), msg);
            }
        }
    }

    fn type_has_cycle(
        &self,
        name: &str,
        raw: &HashMap<String, Vec<(String, TypeName)>>,
        visiting: &mut HashSet<String>,
    ) -> bool {
        if !visiting.insert(name.to_string()) {
            return true;
        }
        if let Some(fields) = raw.get(name) {
            for (_, tn) in fields {
                if raw.contains_key(&tn.base) && self.type_has_cycle(&tn.base, raw, visiting) {
                    return true;
                }
            }
        }
        visiting.remove(name);
        false
    }

    fn resolve_type_name(&mut self, tn: &TypeName) -> TypeDescriptor {
        if let Some(base) = base_type_from_name(&tn.base) {
            return TypeDescriptor::scalar(base);
        }
        if let Some(sym) = self.types.get_by_name(&tn.base) {
            return TypeDescriptor::udt(sym.id);
        }
        self.sink.error(
            ErrorKind::Undefined,
            tn.location.clone(),
            format!("unknown type '{}'", tn.base),
        );
        TypeDescriptor::scalar(BaseType::Integer)
    }

    // -- phase 2: routines ----------------------------------------------------

    fn collect_routines(&mut self, program: &Program) {
        for stmt in program {
            match stmt {
                Statement::SubDef { name, params, location, .. } => {
                    self.declare_routine(name, params, TypeDescriptor::scalar(BaseType::Void), location);
                }
                Statement::FunctionDef { name, params, return_type, location, .. } => {
                    let ret = return_type
                        .as_ref()
                        .map(|tn| self.resolve_type_name(tn))
                        .unwrap_or_else(|| TypeDescriptor::scalar(BaseType::Double));
                    self.declare_routine(name, params, ret, location);
                }
                Statement::DefFn { name, params, location, .. } => {
                    self.declare_routine(
                        name,
                        params,
                        TypeDescriptor::scalar(BaseType::Double),
                        location,
                    );
                }
                _ => {}
            }
        }
    }

    fn declare_routine(
        &mut self,
        name: &str,
        params: &[Param],
        returns: TypeDescriptor,
        location: &SourceLocation,
    ) {
        let param_types = params
            .iter()
            .map(|p| self.resolve_type_name(&p.as_type))
            .collect();
        let symbol = Symbol {
            name: name.to_string(),
            kind: SymbolKind::Function { params: param_types, returns: returns.clone() },
            ty: returns,
            scope: Scope::Global,
        };
        if let Err(msg) = self.symbols.declare(symbol.clone()) {
            self.sink.error(ErrorKind::Redefinition, location.clone(), msg);
        }
        // A caller writes `T(...)`, not `T&(...)` - register the routine
        // under its bare name too so lookups from either spelling resolve
        // to the same symbol (its linkage name drops the suffix as well,
        // see `SymbolMapper::function_symbol`).
        let base = strip_suffix(name);
        if base != name {
            let _ = self.symbols.declare(Symbol { name: base.to_string(), ..symbol });
        }
    }

    // -- label collection -------------------------------------------------

    fn collect_labels(&mut self, stmts: &[Statement]) {
        for stmt in stmts {
            match stmt {
                Statement::Label { name, .. } => {
                    self.labels_seen.insert(name.clone());
                }
                Statement::If { branches, else_branch, .. } => {
                    for (_, body) in branches {
                        self.collect_labels(body);
                    }
                    if let Some(body) = else_branch {
                        self.collect_labels(body);
                    }
                }
                Statement::For { body, .. }
                | Statement::While { body, .. }
                | Statement::DoLoop { body, .. }
                | Statement::Repeat { body, .. }
                | Statement::SubDef { body, .. }
                | Statement::FunctionDef { body, .. } => self.collect_labels(body),
                Statement::SelectCase { arms, case_else, .. } => {
                    for arm in arms {
                        self.collect_labels(&arm.body);
                    }
                    if let Some(body) = case_else {
                        self.collect_labels(body);
                    }
                }
                Statement::Try { body, catch_body, finally_body, .. } => {
                    self.collect_labels(body);
                    self.collect_labels(catch_body);
                    if let Some(body) = finally_body {
                        self.collect_labels(body);
                    }
                }
                _ => {}
            }
        }
    }

    // -- phase 3: statement walk --------------------------------------------

    fn walk_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::OptionStmt { option, location } => self.apply_option(*option, location),
            Statement::Let { target, value, location } => {
                let value_ty = self.infer_expr(value);
                let target_ty = self.lvalue_type(target);
                if let Some(sym) = self.lvalue_symbol(target) {
                    if sym.kind == SymbolKind::Constant {
                        self.sink.error(
                            ErrorKind::Redefinition,
                            location.clone(),
                            "cannot assign to a constant",
                        );
                    }
                    if matches!(sym.kind, SymbolKind::Function { .. })
                        && self.current_function.as_deref() != Some(sym.name.as_str())
                    {
                        self.sink.error(
                            ErrorKind::BadControlFlow,
                            location.clone(),
                            format!("cannot assign to function '{}' outside its own body", sym.name),
                        );
                    }
                }
                self.check_coercion(&value_ty, &target_ty, location);
                self.declare_implicit(target, target_ty);
            }
            Statement::Dim { name, as_type, dims, location } => {
                for d in dims {
                    self.infer_expr(d);
                }
                let base_ty = as_type
                    .as_ref()
                    .map(|tn| self.resolve_type_name(tn))
                    .unwrap_or_else(|| type_from_suffix(name));
                let kind = if dims.is_empty() {
                    SymbolKind::Variable
                } else {
                    SymbolKind::Array { dims: vec![0; dims.len()] }
                };
                let ty = if dims.is_empty() {
                    base_ty
                } else {
                    TypeDescriptor::array(base_ty.base, vec![0; dims.len()])
                };
                let symbol = Symbol {
                    name: name.clone(),
                    kind,
                    ty,
                    scope: self.current_scope(),
                };
                if let Err(msg) = self.symbols.declare(symbol) {
                    self.sink.error(ErrorKind::Redefinition, location.clone(), msg);
                }
            }
            Statement::Print { items, .. } => {
                for (expr, _) in items {
                    self.infer_expr(expr);
                }
            }
            Statement::Input { targets, .. } => {
                for t in targets {
                    let ty = self.lvalue_type(t);
                    self.declare_implicit(t, ty);
                }
            }
            Statement::If { branches, else_branch, .. } => {
                for (cond, body) in branches {
                    self.infer_expr(cond);
                    for s in body {
                        self.walk_statement(s);
                    }
                }
                if let Some(body) = else_branch {
                    for s in body {
                        self.walk_statement(s);
                    }
                }
            }
            Statement::For { var, start, end, step, body, next_var, location } => {
                self.infer_expr(start);
                self.infer_expr(end);
                if let Some(s) = step {
                    self.infer_expr(s);
                }
                let symbol = Symbol {
                    name: var.clone(),
                    kind: SymbolKind::Variable,
                    ty: TypeDescriptor::scalar(BaseType::LoopIndex),
                    scope: self.current_scope(),
                };
                let _ = self.symbols.declare(symbol);
                if let Some(nv) = next_var {
                    if nv != var {
                        self.sink.error(
                            ErrorKind::BadControlFlow,
                            location.clone(),
                            format!("NEXT {nv} does not match FOR {var}"),
                        );
                    }
                }
                for s in body {
                    self.walk_statement(s);
                }
            }
            Statement::While { condition, body, .. } | Statement::Repeat { until: condition, body, .. } => {
                self.infer_expr(condition);
                for s in body {
                    self.walk_statement(s);
                }
            }
            Statement::DoLoop { head, body, tail, .. } => {
                if let Some((_, cond)) = head {
                    self.infer_expr(cond);
                }
                for s in body {
                    self.walk_statement(s);
                }
                if let Some((_, cond)) = tail {
                    self.infer_expr(cond);
                }
            }
            Statement::SelectCase { selector, arms, case_else, .. } => {
                self.infer_expr(selector);
                for arm in arms {
                    for test in &arm.tests {
                        match test {
                            CaseTest::Value(e) => {
                                self.infer_expr(e);
                            }
                            CaseTest::Range(a, b) => {
                                self.infer_expr(a);
                                self.infer_expr(b);
                            }
                            CaseTest::Is(_, e) => {
                                self.infer_expr(e);
                            }
                        }
                    }
                    for s in &arm.body {
                        self.walk_statement(s);
                    }
                }
                if let Some(body) = case_else {
                    for s in body {
                        self.walk_statement(s);
                    }
                }
            }
            Statement::Goto { label, location } | Statement::Gosub { label, location } => {
                self.goto_targets.push((label.clone(), location.clone()));
            }
            Statement::OnGoto { selector, labels, location, .. } => {
                self.infer_expr(selector);
                for l in labels {
                    self.goto_targets.push((l.clone(), location.clone()));
                }
            }
            Statement::SubDef { name, params, body, .. } => {
                self.current_function = Some(name.clone());
                self.declare_params(params);
                for s in body {
                    self.walk_statement(s);
                }
                self.current_function = None;
            }
            Statement::FunctionDef { name, params, body, return_type, .. } => {
                self.current_function = Some(name.clone());
                self.declare_params(params);
                // The return value is set by assigning to the function's
                // bare name (suffix stripped) from inside its own body,
                // e.g. `FUNCTION T&(...)` returns via `T = ...`.
                let ret_ty = return_type
                    .as_ref()
                    .map(|tn| self.resolve_type_name(tn))
                    .unwrap_or_else(|| TypeDescriptor::scalar(BaseType::Double));
                let _ = self.symbols.declare(Symbol {
                    name: strip_suffix(name).to_string(),
                    kind: SymbolKind::Variable,
                    ty: ret_ty,
                    scope: self.current_scope(),
                });
                for s in body {
                    self.walk_statement(s);
                }
                self.current_function = None;
            }
            Statement::DefFn { name, params, body, .. } => {
                self.current_function = Some(name.clone());
                self.declare_params(params);
                self.infer_expr(body);
                self.current_function = None;
            }
            Statement::Local { name, as_type, location } => {
                let ty = self.resolve_type_name(as_type);
                let symbol = Symbol {
                    name: name.clone(),
                    kind: SymbolKind::Variable,
                    ty,
                    scope: self.current_scope(),
                };
                if let Err(msg) = self.symbols.declare(symbol) {
                    self.sink.error(ErrorKind::Redefinition, location.clone(), msg);
                }
            }
            Statement::Try { body, catch_body, finally_body, .. } => {
                for s in body {
                    self.walk_statement(s);
                }
                for s in catch_body {
                    self.walk_statement(s);
                }
                if let Some(body) = finally_body {
                    for s in body {
                        self.walk_statement(s);
                    }
                }
            }
            Statement::Throw { value, .. } => {
                self.infer_expr(value);
            }
            Statement::Data { values, .. } => {
                for v in values {
                    self.infer_expr(v);
                }
            }
            Statement::Read { targets, .. } => {
                for t in targets {
                    let ty = self.lvalue_type(t);
                    self.declare_implicit(t, ty);
                }
            }
            Statement::Call { name, args, location } => {
                self.check_call(name, args, location);
            }
            Statement::ExprStatement { expr, .. } => {
                self.infer_expr(expr);
            }
            Statement::TypeDef { .. }
            | Statement::End { .. }
            | Statement::Restore { .. }
            | Statement::Label { .. }
            | Statement::Exit { .. }
            | Statement::ReturnFromGosub { .. } => {}
        }
    }

    fn declare_params(&mut self, params: &[Param]) {
        for p in params {
            let ty = self.resolve_type_name(&p.as_type);
            let symbol = Symbol {
                name: p.name.clone(),
                kind: SymbolKind::Variable,
                ty,
                scope: self.current_scope(),
            };
            let _ = self.symbols.declare(symbol);
        }
    }

    fn check_call(&mut self, name: &str, args: &[Expr], location: &SourceLocation) {
        for a in args {
            self.infer_expr(a);
        }
        match self.symbols.lookup(name, self.current_function.as_deref()).cloned() {
            Some(Symbol { kind: SymbolKind::Function { params, .. }, .. }) => {
                if params.len() != args.len() {
                    self.sink.error(
                        ErrorKind::TypeMismatch,
                        location.clone(),
                        format!(
                            "'{name}' expects {} argument(s), found {}",
                            params.len(),
                            args.len()
                        ),
                    );
                }
            }
            Some(_) => {}
            None => {
                if crate::codegen::symbol_mapper::SymbolMapper::builtin_runtime_name(name).is_none() {
                    self.sink.error(
                        ErrorKind::Undefined,
                        location.clone(),
                        format!("undefined procedure '{name}'"),
                    );
                }
            }
        }
    }

    fn apply_option(&mut self, option: OptionKind, _location: &SourceLocation) {
        match option {
            OptionKind::BaseZero => self.config.set_array_base(ArrayBase::Zero),
            OptionKind::BaseOne => self.config.set_array_base(ArrayBase::One),
            OptionKind::Ascii => self.config.set_string_mode(StringMode::Ascii),
            OptionKind::Unicode => self.config.set_string_mode(StringMode::Unicode),
            OptionKind::DetectString => self.config.set_detect_string(true),
        }
    }

    fn current_scope(&self) -> Scope {
        match &self.current_function {
            Some(f) => Scope::Function(f.clone()),
            None => Scope::Global,
        }
    }

    fn check_coercion(&mut self, from: &TypeDescriptor, to: &TypeDescriptor, location: &SourceLocation) {
        match classify_coercion(from, to) {
            Coercion::Identity | Coercion::Widen => {}
            Coercion::NarrowWithWarning => {
                self.sink.warning(
                    ErrorKind::TypeMismatch,
                    location.clone(),
                    "implicit narrowing conversion loses precision",
                );
            }
            Coercion::NarrowingRequired => {
                self.sink.error(
                    ErrorKind::NarrowingRequired,
                    location.clone(),
                    "float-to-integer assignment requires an explicit conversion",
                );
            }
            Coercion::Incompatible => {
                self.sink.error(
                    ErrorKind::TypeMismatch,
                    location.clone(),
                    "incompatible types in assignment",
                );
            }
        }
    }

    fn lvalue_symbol(&self, lvalue: &LValue) -> Option<Symbol> {
        match lvalue {
            LValue::Variable { name, .. } => {
                self.symbols.lookup(name, self.current_function.as_deref()).cloned()
            }
            LValue::ArrayElement { name, .. } => {
                self.symbols.lookup(name, self.current_function.as_deref()).cloned()
            }
            LValue::Member { .. } => None,
        }
    }

    fn lvalue_type(&mut self, lvalue: &LValue) -> TypeDescriptor {
        match lvalue {
            LValue::Variable { name, .. } => self
                .symbols
                .lookup(name, self.current_function.as_deref())
                .map(|s| s.ty.clone())
                .unwrap_or_else(|| type_from_suffix(name)),
            LValue::ArrayElement { name, indices, .. } => {
                for e in indices {
                    self.infer_expr(e);
                }
                self.symbols
                    .lookup(name, self.current_function.as_deref())
                    .map(|s| s.ty.clone())
                    .unwrap_or_else(|| type_from_suffix(name))
            }
            LValue::Member { base, field, location } => {
                let base_ty = self.lvalue_type(base);
                self.field_type(&base_ty, field, location)
            }
        }
    }

    fn field_type(&mut self, base_ty: &TypeDescriptor, field: &str, location: &SourceLocation) -> TypeDescriptor {
        if base_ty.base != BaseType::UserDefined {
            self.sink.error(
                ErrorKind::TypeMismatch,
                location.clone(),
                "member access on a non-record type",
            );
            return TypeDescriptor::scalar(BaseType::Integer);
        }
        match self.types.get(base_ty.udt_type_id).and_then(|t| t.find_field(field)) {
            Some(f) => f.ty.clone(),
            None => {
                self.sink.error(
                    ErrorKind::Undefined,
                    location.clone(),
                    format!("no field '{field}' on this type"),
                );
                TypeDescriptor::scalar(BaseType::Integer)
            }
        }
    }

    fn declare_implicit(&mut self, lvalue: &LValue, ty: TypeDescriptor) {
        if let LValue::Variable { name, .. } = lvalue {
            if self.symbols.lookup(name, self.current_function.as_deref()).is_none() {
                let symbol = Symbol {
                    name: name.clone(),
                    kind: SymbolKind::Variable,
                    ty,
                    scope: self.current_scope(),
                };
                let _ = self.symbols.declare(symbol);
            }
        }
    }

    fn infer_expr(&mut self, expr: &Expr) -> TypeDescriptor {
        match expr {
            Expr::IntLiteral { .. } => TypeDescriptor::scalar(BaseType::Integer),
            Expr::FloatLiteral { .. } => TypeDescriptor::scalar(BaseType::Double),
            Expr::StringLiteral { has_non_ascii, .. } => {
                let base = if *has_non_ascii || self.config.string_mode() == StringMode::Unicode {
                    BaseType::Unicode
                } else {
                    BaseType::String
                };
                TypeDescriptor::scalar(base)
            }
            Expr::Variable { name, location } => {
                match self.symbols.lookup(name, self.current_function.as_deref()) {
                    Some(sym) => sym.ty.clone(),
                    None => {
                        let inferred = type_from_suffix(name);
                        self.declare_implicit(
                            &LValue::Variable { name: name.clone(), location: location.clone() },
                            inferred.clone(),
                        );
                        inferred
                    }
                }
            }
            Expr::Binary { op, left, right, location } => {
                let lt = self.infer_expr(left);
                let rt = self.infer_expr(right);
                match op {
                    BinOp::Add if lt.is_string() || rt.is_string() => {
                        if lt.is_string() && rt.is_string() {
                            common_string_type(&lt, &rt)
                        } else {
                            self.sink.error(
                                ErrorKind::TypeMismatch,
                                location.clone(),
                                "cannot mix string and numeric operands",
                            );
                            TypeDescriptor::scalar(BaseType::String)
                        }
                    }
                    BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                        common_arithmetic_type(&lt, &rt)
                    }
                    BinOp::IntDiv | BinOp::Mod => TypeDescriptor::scalar(BaseType::Long),
                    BinOp::And | BinOp::Or => TypeDescriptor::scalar(BaseType::Integer),
                    BinOp::Concat => common_string_type(&lt, &rt),
                    BinOp::Compare(_) => TypeDescriptor::scalar(BaseType::Integer),
                }
            }
            Expr::Unary { operand, .. } => self.infer_expr(operand),
            Expr::Call { name, args, location } => {
                self.check_call(name, args, location);
                self.symbols
                    .lookup(name, self.current_function.as_deref())
                    .map(|s| s.ty.clone())
                    .or_else(|| {
                        crate::codegen::symbol_mapper::SymbolMapper::builtin_return_type(name)
                            .map(TypeDescriptor::scalar)
                    })
                    .unwrap_or_else(|| TypeDescriptor::scalar(BaseType::Double))
            }
            Expr::FnCall { name, args, location } => {
                self.check_call(name, args, location);
                TypeDescriptor::scalar(BaseType::Double)
            }
            Expr::ArrayAccess { name, indices, location } => {
                for i in indices {
                    self.infer_expr(i);
                }
                match self.symbols.lookup(name, self.current_function.as_deref()) {
                    Some(sym) => {
                        let mut elem = sym.ty.clone();
                        elem.array_dims.clear();
                        elem.attrs.remove(crate::types::TypeAttrs::IS_ARRAY);
                        elem
                    }
                    None => {
                        self.sink.error(
                            ErrorKind::Undefined,
                            location.clone(),
                            format!("undefined array '{name}'"),
                        );
                        TypeDescriptor::scalar(BaseType::Double)
                    }
                }
            }
            Expr::Member { base, field, location } => {
                let base_ty = self.infer_expr(base);
                self.field_type(&base_ty, field, location)
            }
        }
    }
}

fn common_string_type(a: &TypeDescriptor, b: &TypeDescriptor) -> TypeDescriptor {
    if a.base == BaseType::Unicode || b.base == BaseType::Unicode {
        TypeDescriptor::scalar(BaseType::Unicode)
    } else {
        TypeDescriptor::scalar(BaseType::String)
    }
}

/// Maps a BASIC type keyword to its `BaseType`, case-insensitively.
fn base_type_from_name(name: &str) -> Option<BaseType> {
    Some(match name.to_ascii_uppercase().as_str() {
        "BYTE" => BaseType::Byte,
        "UBYTE" => BaseType::UByte,
        "SHORT" => BaseType::Short,
        "USHORT" => BaseType::UShort,
        "INTEGER" => BaseType::Integer,
        "UINTEGER" => BaseType::UInteger,
        "LONG" => BaseType::Long,
        "ULONG" => BaseType::ULong,
        "SINGLE" => BaseType::Single,
        "DOUBLE" => BaseType::Double,
        "STRING" => BaseType::String,
        "UNICODE" => BaseType::Unicode,
        _ => return None,
    })
}

/// A bare variable's implicit type, from its trailing suffix character
/// (spec §6.1), defaulting to `DOUBLE` with no suffix.
fn strip_suffix(name: &str) -> &str {
    name.trim_end_matches(['@', '^', '%', '&', '!', '#', '$'])
}

fn type_from_suffix(name: &str) -> TypeDescriptor {
    use crate::token::Suffix;
    let base = match name.chars().last().and_then(Suffix::from_char) {
        Some(Suffix::Byte) => BaseType::Byte,
        Some(Suffix::Short) => BaseType::Short,
        Some(Suffix::Integer) => BaseType::Integer,
        Some(Suffix::Long) => BaseType::Long,
        Some(Suffix::Single) => BaseType::Single,
        Some(Suffix::Double) => BaseType::Double,
        Some(Suffix::String) => BaseType::String,
        None => BaseType::Double,
    };
    TypeDescriptor::scalar(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::parser::Parser;

    fn analyze(src: &str) -> (SemanticResult, DiagnosticSink) {
        let mut sink = DiagnosticSink::new();
        let mut parser = Parser::new(src, PathBuf::from("t.bas"), &mut sink);
        let program = parser.parse_program().expect("parse should succeed");
        let analyzer = Analyzer::new(&mut sink);
        let result = analyzer.analyze(&program);
        (result, sink)
    }

    #[test]
    fn undefined_goto_target_is_reported() {
        let (_, sink) = analyze("GOTO nowhere");
        assert!(sink.iter().any(|d| d.kind.code() == "BAD_CONTROL_FLOW"));
    }

    #[test]
    fn float_literal_assigned_to_integer_requires_conversion() {
        let (_, sink) = analyze("DIM n AS INTEGER\nn = 3.5");
        assert!(sink.iter().any(|d| d.kind.code() == "NARROWING_REQUIRED"));
    }

    #[test]
    fn for_next_mismatched_variable_is_an_error() {
        let (_, sink) = analyze("FOR i = 1 TO 10\nPRINT i\nNEXT j");
        assert!(sink.iter().any(|d| d.kind.code() == "BAD_CONTROL_FLOW"));
    }

    #[test]
    fn duplicate_type_names_are_rejected() {
        let (_, sink) = analyze("TYPE A\nx AS INTEGER\nEND TYPE\nTYPE A\ny AS INTEGER\nEND TYPE");
        assert!(sink.iter().any(|d| d.kind.code() == "REDEFINITION"));
    }

    #[test]
    fn calling_an_undeclared_function_is_undefined() {
        let (_, sink) = analyze("PRINT Mystery(1)");
        assert!(sink.iter().any(|d| d.kind.code() == "UNDEFINED"));
    }

    #[test]
    fn option_base_one_is_recorded_in_config() {
        let (result, sink) = analyze("OPTION BASE 1");
        assert!(!sink.has_errors());
        assert_eq!(result.config.array_base(), ArrayBase::One);
    }
}
