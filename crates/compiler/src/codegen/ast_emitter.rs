//! `ASTEmitter`: lowers expressions and the non-control-flow statements
//! inside one basic block to QBE IL text (spec §4.5.5). Control flow
//! itself - which block comes next - is `CFGEmitter`'s job; this type
//! only ever appends straight-line instructions to the block it's given.

use std::collections::HashMap;

use crate::ast::*;
use crate::codegen::array_cleanup::DeferList;
use crate::codegen::builder::QBEBuilder;
use crate::codegen::runtime_library::RuntimeLibrary;
use crate::codegen::symbol_mapper::SymbolMapper;
use crate::codegen::type_manager::TypeManager;
use crate::config::{ArrayBase, CompilerConfig};
use crate::symbols::{Scope, SymbolKind, SymbolTable, TypeRegistry};
use crate::types::{classify_coercion, common_arithmetic_type, BaseType, Coercion, TypeDescriptor};

use super::error::CodeGenError;

pub struct ASTEmitter<'a> {
    pub symbols: &'a SymbolTable,
    pub types: &'a TypeRegistry,
    pub config: &'a CompilerConfig,
    pub runtime: &'a mut RuntimeLibrary,
    pub current_function: Option<String>,
    pub defer: &'a mut DeferList,
    /// Name -> stack slot address, populated once by `emit_prologue` for
    /// every parameter and routine-local `DIM`/`LOCAL` (spec §4.5.5). Empty
    /// for `main`, whose top-level declarations are globals instead.
    pub locals: HashMap<String, String>,
}

type EResult<T> = Result<T, CodeGenError>;

impl<'a> ASTEmitter<'a> {
    fn scope(&self) -> Scope {
        match &self.current_function {
            Some(f) => Scope::Function(f.clone()),
            None => Scope::Global,
        }
    }

    fn lookup_type(&self, name: &str) -> TypeDescriptor {
        self.symbols
            .lookup(name, self.current_function.as_deref())
            .map(|s| s.ty.clone())
            .unwrap_or_else(|| TypeDescriptor::scalar(BaseType::Double))
    }

    /// Allocates a dominating stack slot for every incoming parameter and
    /// every `DIM`/`LOCAL` anywhere in the routine body (spec §4.5.5):
    /// a `DIM` nested inside an `IF`/loop/`SELECT CASE` can't wait to
    /// allocate at its textual site, since QBE requires the `alloc`
    /// defining a pointer to dominate every block that loads through it.
    /// Parameters arrive as plain SSA values and are immediately spilled
    /// into their slot so later code can treat them the same as a local.
    pub fn emit_prologue(&mut self, b: &mut QBEBuilder, params: &[Param], body: &[Statement]) {
        for p in params {
            let ty = self.lookup_type(&p.name);
            let incoming = SymbolMapper::temp_name(&p.name);
            let slot = b.alloc_local(if ty.is_array() { 8 } else { ty.byte_size() });
            b.emit_line(format!("    {} {}, {}", TypeManager::store_op(&ty), incoming, slot));
            self.locals.insert(p.name.clone(), slot);
        }

        let mut declared = Vec::new();
        collect_locals(body, &mut declared);
        for (name, is_array) in declared {
            if self.locals.contains_key(&name) {
                continue;
            }
            let ty = self.lookup_type(&name);
            let slot = b.alloc_local(if is_array { 8 } else { ty.byte_size() });
            if !is_array {
                let default = TypeManager::default_value(&ty);
                b.emit_line(format!("    {} {}, {}", TypeManager::store_op(&ty), default, slot));
            }
            self.locals.insert(name, slot);
        }
    }

    /// Loads a scalar variable by name, used both for `Expr::Variable` and
    /// for reading a function's implicit return value at its exit block.
    pub fn load_variable(&self, b: &mut QBEBuilder, name: &str) -> (String, TypeDescriptor) {
        let ty = self.lookup_type(name);
        let storage = self.storage_of(name);
        let dest = b.fresh_temp();
        b.emit_line(format!("    {dest} ={} {} {}", TypeManager::qbe_letter(&ty), TypeManager::load_op(&ty), storage));
        (dest, ty)
    }

    /// A local/parameter's storage is the stack slot `emit_prologue`
    /// allocated for it; anything not in `locals` (globals, and anything
    /// referenced in `main`, which has no locals of its own) falls back
    /// to its mangled data-segment name.
    fn storage_of(&self, name: &str) -> String {
        if let Some(slot) = self.locals.get(name) {
            return slot.clone();
        }
        let scope = self
            .symbols
            .lookup(name, self.current_function.as_deref())
            .map(|s| s.scope.clone())
            .unwrap_or_else(|| self.scope());
        SymbolMapper::storage_name(&scope, name)
    }

    /// Resolves the address and type of any lvalue, composing `Member`
    /// field offsets over a recursively-resolved base address (spec §3.5:
    /// "member-access chains compose offsets at compile time").
    fn lvalue_addr(&mut self, b: &mut QBEBuilder, lvalue: &LValue) -> EResult<(String, TypeDescriptor)> {
        match lvalue {
            LValue::Variable { name, .. } => Ok((self.storage_of(name), self.lookup_type(name))),
            LValue::ArrayElement { name, indices, .. } => {
                let (idx_val, _) = self.emit_expr(b, &indices[0])?;
                let elem_ty = {
                    let mut t = self.lookup_type(name);
                    t.array_dims.clear();
                    t
                };
                let desc = self.load_array_descriptor(b, name);
                let addr = self
                    .runtime
                    .call(b, "fb_array_access", &[(desc, "l"), (idx_val, "l")])?
                    .unwrap_or_default();
                Ok((addr, elem_ty))
            }
            LValue::Member { base, field, location } => {
                let (base_addr, base_ty) = self.lvalue_addr(b, base)?;
                let (field_ty, offset) = self.resolve_field(&base_ty, field, location)?;
                Ok((self.offset_addr(b, base_addr, offset), field_ty))
            }
        }
    }

    /// Loads the heap descriptor pointer out of an array variable's slot
    /// (which only ever holds the pointer `DIM` stored via
    /// `fb_array_alloc`, not the 48-byte record itself).
    fn load_array_descriptor(&mut self, b: &mut QBEBuilder, name: &str) -> String {
        let storage = self.storage_of(name);
        let dest = b.fresh_temp();
        b.emit_line(format!("    {dest} =l loadl {storage}"));
        dest
    }

    fn offset_addr(&self, b: &mut QBEBuilder, base: String, offset: i64) -> String {
        if offset == 0 {
            return base;
        }
        let dest = b.fresh_temp();
        b.emit_line(format!("    {dest} =l add {base}, {offset}"));
        dest
    }

    /// `DIM name` (re-)initializes a scalar slot to its type's default;
    /// `DIM name(n)` allocates the array's heap descriptor through
    /// `fb_array_alloc`, honoring `OPTION BASE` (spec §3.6, §6.1) for its
    /// lower bound, and registers it on the routine's defer list so
    /// `@tidy_exit` frees it on every return path (spec §8.1, §4.5.8).
    fn emit_dim(&mut self, b: &mut QBEBuilder, name: &str, dims: &[Expr]) -> EResult<()> {
        let storage = self.storage_of(name);
        if dims.is_empty() {
            let ty = self.lookup_type(name);
            let default = TypeManager::default_value(&ty);
            b.emit_line(format!("    {} {}, {}", TypeManager::store_op(&ty), default, storage));
            return Ok(());
        }

        let elem_ty = {
            let mut t = self.lookup_type(name);
            t.array_dims.clear();
            t
        };
        let lower = match self.config.array_base() {
            ArrayBase::Zero => 0i64,
            ArrayBase::One => 1i64,
        };
        let (upper, _) = self.emit_expr(b, &dims[0])?;
        let desc = self
            .runtime
            .call(
                b,
                "fb_array_alloc",
                &[
                    (lower.to_string(), "l"),
                    (upper, "l"),
                    (elem_ty.byte_size().to_string(), "l"),
                    (lower.to_string(), "w"),
                    (type_suffix_code(elem_ty.base).to_string(), "w"),
                ],
            )?
            .unwrap_or_default();
        b.emit_line(format!("    storel {desc}, {storage}"));
        self.defer.register(storage);
        Ok(())
    }

    pub fn emit_statement(&mut self, b: &mut QBEBuilder, stmt: &Statement) -> EResult<()> {
        match stmt {
            Statement::Let { target, value, .. } => {
                let (val, val_ty) = self.emit_expr(b, value)?;
                let (val, _) = self.coerce(b, val, &val_ty, &self.lvalue_type(target))?;
                self.emit_store(b, target, &val)
            }
            Statement::Dim { name, dims, .. } => self.emit_dim(b, name, dims),
            Statement::Print { items, .. } => {
                for (expr, _sep) in items {
                    let (val, ty) = self.emit_expr(b, expr)?;
                    self.emit_print(b, &val, &ty)?;
                }
                self.runtime.call(b, "fb_print_newline", &[])?;
                Ok(())
            }
            Statement::Input { targets, .. } => {
                for t in targets {
                    let ty = self.lvalue_type(t);
                    let name = if ty.is_float() && ty.base == BaseType::Single {
                        "fb_input_float"
                    } else if ty.is_float() {
                        "fb_input_double"
                    } else if ty.is_string() {
                        "fb_input_string"
                    } else {
                        "fb_input_int"
                    };
                    let val = self.runtime.call(b, name, &[])?.unwrap_or_default();
                    self.emit_store(b, t, &val)?;
                }
                Ok(())
            }
            Statement::Local { name, .. } => self.emit_dim(b, name, &[]),
            Statement::Call { name, args, .. } => {
                self.emit_call(b, name, args).map(|_| ())
            }
            Statement::ExprStatement { expr, .. } => self.emit_expr(b, expr).map(|_| ()),
            Statement::Throw { value, location } => {
                let (val, _) = self.emit_expr(b, value)?;
                super::exceptions::ExceptionLowering::emit_throw(
                    b,
                    &mut *self.runtime,
                    "1",
                    &val,
                    &location.line.to_string(),
                )
            }
            Statement::Data { .. } | Statement::Read { .. } | Statement::Restore { .. } | Statement::OptionStmt { .. } => {
                Ok(())
            }
            other => Err(CodeGenError::UndeclaredSymbol {
                name: format!("{other:?} is not a straight-line statement"),
                location: fbasic_core::SourceLocation::synthetic(),
            }),
        }
    }

    fn emit_print(&mut self, b: &mut QBEBuilder, val: &str, ty: &TypeDescriptor) -> EResult<()> {
        let name = if ty.base == BaseType::Single {
            "fb_print_float"
        } else if ty.base == BaseType::Double {
            "fb_print_double"
        } else if ty.is_string() {
            "fb_print_string_desc"
        } else if matches!(ty.base, BaseType::Long | BaseType::ULong) {
            "fb_print_long"
        } else {
            "fb_print_int"
        };
        self.runtime.call(b, name, &[(val.to_string(), TypeManager::qbe_letter(ty))])?;
        Ok(())
    }

    fn emit_call(&mut self, b: &mut QBEBuilder, name: &str, args: &[Expr]) -> EResult<Option<String>> {
        if let Some(rt_name) = SymbolMapper::builtin_runtime_name(name) {
            let mut arg_vals = Vec::new();
            for a in args {
                let (val, ty) = self.emit_expr(b, a)?;
                arg_vals.push((val, TypeManager::qbe_letter(&ty)));
            }
            return self.runtime.call(b, rt_name, &arg_vals);
        }

        let mut arg_vals = Vec::new();
        for a in args {
            let (val, ty) = self.emit_expr(b, a)?;
            arg_vals.push((val, TypeManager::qbe_letter(&ty).to_string()));
        }
        let symbol = SymbolMapper::function_symbol(name);
        let arg_text = arg_vals
            .iter()
            .map(|(v, t)| format!("{t} {v}"))
            .collect::<Vec<_>>()
            .join(", ");

        let returns_void = self
            .symbols
            .lookup(name, self.current_function.as_deref())
            .map(|s| matches!(&s.kind, SymbolKind::Function { returns, .. } if returns.base == BaseType::Void))
            .unwrap_or(false);

        if returns_void {
            b.emit_line(format!("    call {symbol}({arg_text})"));
            Ok(None)
        } else {
            let ret_ty = self.lookup_type(name);
            let dest = b.fresh_temp();
            b.emit_line(format!("    {dest} ={} call {symbol}({arg_text})", TypeManager::qbe_letter(&ret_ty)));
            Ok(Some(dest))
        }
    }

    pub fn emit_expr(&mut self, b: &mut QBEBuilder, expr: &Expr) -> EResult<(String, TypeDescriptor)> {
        match expr {
            Expr::IntLiteral { value, .. } => Ok((value.to_string(), TypeDescriptor::scalar(BaseType::Integer))),
            Expr::FloatLiteral { value, .. } => Ok((format!("d_{value}"), TypeDescriptor::scalar(BaseType::Double))),
            Expr::StringLiteral { value, has_non_ascii, .. } => {
                let symbol = b.intern_string(value);
                let base = if *has_non_ascii { BaseType::Unicode } else { BaseType::String };
                let dest = self.runtime.call(b, "fb_string_from_cstr", &[(symbol, "l")])?;
                Ok((dest.unwrap_or_default(), TypeDescriptor::scalar(base)))
            }
            Expr::Variable { name, .. } => Ok(self.load_variable(b, name)),
            Expr::Unary { op, operand, .. } => {
                let (val, ty) = self.emit_expr(b, operand)?;
                let dest = b.fresh_temp();
                match op {
                    UnaryOp::Neg => {
                        b.emit_line(format!("    {dest} ={} neg {val}", TypeManager::qbe_letter(&ty)));
                    }
                    UnaryOp::Not => {
                        b.emit_line(format!("    {dest} =w ceqw {val}, 0"));
                    }
                }
                Ok((dest, ty))
            }
            Expr::Binary { op, left, right, .. } => self.emit_binary(b, *op, left, right),
            Expr::Call { name, args, .. } => {
                let dest = self.emit_call(b, name, args)?;
                let ty = SymbolMapper::builtin_return_type(name)
                    .map(TypeDescriptor::scalar)
                    .unwrap_or_else(|| self.lookup_type(name));
                Ok((dest.unwrap_or_default(), ty))
            }
            Expr::FnCall { name, args, .. } => {
                let dest = self.emit_call(b, name, args)?;
                Ok((dest.unwrap_or_default(), TypeDescriptor::scalar(BaseType::Double)))
            }
            Expr::ArrayAccess { name, indices, .. } => {
                let (idx_val, _) = self.emit_expr(b, &indices[0])?;
                let elem_ty = {
                    let mut t = self.lookup_type(name);
                    t.array_dims.clear();
                    t
                };
                let desc = self.load_array_descriptor(b, name);
                let addr = self
                    .runtime
                    .call(b, "fb_array_access", &[(desc, "l"), (idx_val, "l")])?
                    .unwrap_or_default();
                let dest = b.fresh_temp();
                b.emit_line(format!("    {dest} ={} {} {}", TypeManager::qbe_letter(&elem_ty), TypeManager::load_op(&elem_ty), addr));
                Ok((dest, elem_ty))
            }
            Expr::Member { base, field, location } => {
                let (base_addr, base_ty) = self.emit_expr(b, base)?;
                let (field_ty, offset) = self.resolve_field(&base_ty, field, location)?;
                let addr = self.offset_addr(b, base_addr, offset);
                let dest = b.fresh_temp();
                b.emit_line(format!(
                    "    {dest} ={} {} {}",
                    TypeManager::qbe_letter(&field_ty),
                    TypeManager::load_op(&field_ty),
                    addr
                ));
                Ok((dest, field_ty))
            }
        }
    }

    /// Looks the field up in the base's `TypeSymbol` (spec §3.5), returning
    /// its type and compile-time byte offset. Fails the same way an
    /// undeclared variable would if the base isn't a UDT or the field
    /// doesn't exist - both are semantic-analysis bugs if they reach here.
    fn resolve_field(&self, base_ty: &TypeDescriptor, field: &str, location: &fbasic_core::SourceLocation) -> EResult<(TypeDescriptor, i64)> {
        if base_ty.base != BaseType::UserDefined {
            return Err(CodeGenError::UndeclaredSymbol {
                name: format!("{field} (base is not a user-defined type)"),
                location: location.clone(),
            });
        }
        let type_sym = self.types.get(base_ty.udt_type_id).ok_or_else(|| CodeGenError::UndeclaredSymbol {
            name: format!("type #{}", base_ty.udt_type_id),
            location: location.clone(),
        })?;
        let field_sym = type_sym.find_field(field).ok_or_else(|| CodeGenError::UndeclaredSymbol {
            name: field.to_string(),
            location: location.clone(),
        })?;
        Ok((field_sym.ty.clone(), field_sym.offset))
    }

    fn emit_binary(&mut self, b: &mut QBEBuilder, op: BinOp, left: &Expr, right: &Expr) -> EResult<(String, TypeDescriptor)> {
        let (lval, lty) = self.emit_expr(b, left)?;
        let (rval, rty) = self.emit_expr(b, right)?;

        if matches!(op, BinOp::Add) && lty.is_string() && rty.is_string() {
            let dest = self.runtime.call(b, "fb_string_concat", &[(lval, "l"), (rval, "l")])?;
            return Ok((dest.unwrap_or_default(), common_string_type(&lty, &rty)));
        }

        let result_ty = common_arithmetic_type(&lty, &rty);
        let (lval, _) = self.coerce(b, lval, &lty, &result_ty)?;
        let (rval, _) = self.coerce(b, rval, &rty, &result_ty)?;
        let letter = TypeManager::qbe_letter(&result_ty);
        let dest = b.fresh_temp();

        let mnemonic = match op {
            BinOp::Add => format!("add{letter}"),
            BinOp::Sub => format!("sub{letter}"),
            BinOp::Mul => format!("mul{letter}"),
            BinOp::Div => format!("div{letter}"),
            BinOp::IntDiv => "divl".to_string(),
            BinOp::Mod => "reml".to_string(),
            BinOp::And => "andw".to_string(),
            BinOp::Or => "orw".to_string(),
            BinOp::Concat => format!("add{letter}"),
            BinOp::Compare(cmp) => compare_mnemonic(cmp, letter),
        };
        b.emit_line(format!("    {dest} ={} {} {}, {}", result_letter(op, letter), mnemonic, lval, rval));
        let out_ty = if matches!(op, BinOp::Compare(_)) {
            TypeDescriptor::scalar(BaseType::Integer)
        } else {
            result_ty
        };
        Ok((dest, out_ty))
    }

    fn coerce(&mut self, b: &mut QBEBuilder, val: String, from: &TypeDescriptor, to: &TypeDescriptor) -> EResult<(String, TypeDescriptor)> {
        match classify_coercion(from, to) {
            Coercion::Identity => Ok((val, to.clone())),
            Coercion::Widen | Coercion::NarrowWithWarning => {
                if from.qbe_type() == to.qbe_type() {
                    return Ok((val, to.clone()));
                }
                let dest = b.fresh_temp();
                let op = widen_op(from, to);
                b.emit_line(format!("    {dest} ={} {} {}", TypeManager::qbe_letter(to), op, val));
                Ok((dest, to.clone()))
            }
            Coercion::NarrowingRequired | Coercion::Incompatible => Ok((val, to.clone())),
        }
    }

    fn emit_store(&mut self, b: &mut QBEBuilder, target: &LValue, val: &str) -> EResult<()> {
        match target {
            LValue::Variable { name, .. } => {
                let storage = self.storage_of(name);
                let ty = self.lookup_type(name);
                b.emit_line(format!("    {} {}, {}", TypeManager::store_op(&ty), val, storage));
                Ok(())
            }
            LValue::ArrayElement { name, indices, .. } => {
                let (idx_val, _) = self.emit_expr(b, &indices[0])?;
                let elem_ty = {
                    let mut t = self.lookup_type(name);
                    t.array_dims.clear();
                    t
                };
                let desc = self.load_array_descriptor(b, name);
                let addr = self
                    .runtime
                    .call(b, "fb_array_access", &[(desc, "l"), (idx_val, "l")])?
                    .unwrap_or_default();
                b.emit_line(format!("    {} {}, {}", TypeManager::store_op(&elem_ty), val, addr));
                Ok(())
            }
            LValue::Member { .. } => {
                let (addr, field_ty) = self.lvalue_addr(b, target)?;
                b.emit_line(format!("    {} {}, {}", TypeManager::store_op(&field_ty), val, addr));
                Ok(())
            }
        }
    }

    fn lvalue_type(&self, lvalue: &LValue) -> TypeDescriptor {
        match lvalue {
            LValue::Variable { name, .. } | LValue::ArrayElement { name, .. } => self.lookup_type(name),
            LValue::Member { base, field, location } => {
                let base_ty = self.lvalue_type(base);
                self.resolve_field(&base_ty, field, location)
                    .map(|(ty, _)| ty)
                    .unwrap_or_else(|_| TypeDescriptor::scalar(BaseType::Double))
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

fn result_letter(op: BinOp, letter: &'static str) -> &'static str {
    match op {
        BinOp::And | BinOp::Or => "w",
        BinOp::Compare(_) => "w",
        _ => letter,
    }
}

fn compare_mnemonic(cmp: CompareOp, letter: &str) -> String {
    let code = match cmp {
        CompareOp::Eq => "eq",
        CompareOp::Ne => "ne",
        CompareOp::Lt => "lt",
        CompareOp::Le => "le",
        CompareOp::Gt => "gt",
        CompareOp::Ge => "ge",
    };
    format!("c{code}{letter}")
}

fn widen_op(from: &TypeDescriptor, to: &TypeDescriptor) -> &'static str {
    use crate::types::QbeType;
    match (from.qbe_type(), to.qbe_type()) {
        (QbeType::W, QbeType::L) => "extsw",
        (QbeType::W, QbeType::S) => "swtof",
        (QbeType::W, QbeType::D) => "sltof",
        (QbeType::L, QbeType::S) => "sltof",
        (QbeType::L, QbeType::D) => "sltof",
        (QbeType::S, QbeType::D) => "exts",
        (QbeType::D, QbeType::S) => "truncd",
        _ => "copy",
    }
}

/// Recursively collects every `DIM`/`LOCAL` name declared anywhere in a
/// routine body, paired with whether it's an array, so `emit_prologue` can
/// hoist one stack slot per name regardless of how deeply the declaration
/// is nested in `IF`/loop/`SELECT CASE`/`TRY` blocks.
fn collect_locals(stmts: &[Statement], out: &mut Vec<(String, bool)>) {
    for stmt in stmts {
        match stmt {
            Statement::Dim { name, dims, .. } => out.push((name.clone(), !dims.is_empty())),
            Statement::Local { name, .. } => out.push((name.clone(), false)),
            Statement::If { branches, else_branch, .. } => {
                for (_, body) in branches {
                    collect_locals(body, out);
                }
                if let Some(body) = else_branch {
                    collect_locals(body, out);
                }
            }
            Statement::For { body, .. }
            | Statement::While { body, .. }
            | Statement::DoLoop { body, .. }
            | Statement::Repeat { body, .. } => collect_locals(body, out),
            Statement::SelectCase { arms, case_else, .. } => {
                for arm in arms {
                    collect_locals(&arm.body, out);
                }
                if let Some(body) = case_else {
                    collect_locals(body, out);
                }
            }
            Statement::Try { body, catch_body, finally_body, .. } => {
                collect_locals(body, out);
                collect_locals(catch_body, out);
                if let Some(body) = finally_body {
                    collect_locals(body, out);
                }
            }
            _ => {}
        }
    }
}

/// The array descriptor's `typeSuffix` byte (spec §3.6) is the element
/// type's BASIC suffix character, the same mapping `Suffix::from_char`
/// inverts for scalar `DIM`s.
fn type_suffix_code(base: BaseType) -> i64 {
    let c = match base {
        BaseType::Byte | BaseType::UByte => '@',
        BaseType::Short | BaseType::UShort => '^',
        BaseType::Integer | BaseType::UInteger | BaseType::LoopIndex => '%',
        BaseType::Long | BaseType::ULong => '&',
        BaseType::Single => '!',
        BaseType::Double => '#',
        BaseType::String | BaseType::Unicode => '$',
        _ => '#',
    };
    c as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{Symbol, SymbolKind, SymbolTable, TypeRegistry};

    fn emitter<'a>(
        symbols: &'a SymbolTable,
        types: &'a TypeRegistry,
        config: &'a CompilerConfig,
        runtime: &'a mut RuntimeLibrary,
        defer: &'a mut DeferList,
    ) -> ASTEmitter<'a> {
        ASTEmitter { symbols, types, config, runtime, current_function: None, defer, locals: HashMap::new() }
    }

    #[test]
    fn integer_literal_emits_as_a_bare_constant() {
        let symbols = SymbolTable::new();
        let types = TypeRegistry::new();
        let config = CompilerConfig::new();
        let mut runtime = RuntimeLibrary::new();
        let mut defer = DeferList::new();
        let mut e = emitter(&symbols, &types, &config, &mut runtime, &mut defer);
        let mut b = QBEBuilder::new();
        let (val, ty) = e.emit_expr(&mut b, &Expr::IntLiteral { value: 42, location: fbasic_core::SourceLocation::synthetic() }).unwrap();
        assert_eq!(val, "42");
        assert_eq!(ty.base, BaseType::Integer);
    }

    #[test]
    fn variable_load_uses_its_declared_storage_name() {
        let mut symbols = SymbolTable::new();
        symbols
            .declare(Symbol {
                name: "x".to_string(),
                kind: SymbolKind::Variable,
                ty: TypeDescriptor::scalar(BaseType::Integer),
                scope: Scope::Global,
            })
            .unwrap();
        let types = TypeRegistry::new();
        let config = CompilerConfig::new();
        let mut runtime = RuntimeLibrary::new();
        let mut defer = DeferList::new();
        let mut e = emitter(&symbols, &types, &config, &mut runtime, &mut defer);
        let mut b = QBEBuilder::new();
        let (_, ty) = e
            .emit_expr(&mut b, &Expr::Variable { name: "x".to_string(), location: fbasic_core::SourceLocation::synthetic() })
            .unwrap();
        assert_eq!(ty.base, BaseType::Integer);
        assert!(b.finish().contains("$g_x"));
    }

    #[test]
    fn dim_array_allocates_through_the_runtime_and_registers_for_cleanup() {
        let mut symbols = SymbolTable::new();
        symbols
            .declare(Symbol {
                name: "nums".to_string(),
                kind: SymbolKind::Array { dims: vec![0] },
                ty: TypeDescriptor::array(BaseType::Integer, vec![0]),
                scope: Scope::Function("Work".to_string()),
            })
            .unwrap();
        let types = TypeRegistry::new();
        let config = CompilerConfig::new();
        let mut runtime = RuntimeLibrary::new();
        let mut defer = DeferList::new();
        let mut e = emitter(&symbols, &types, &config, &mut runtime, &mut defer);
        e.current_function = Some("Work".to_string());
        e.locals.insert("nums".to_string(), "%slot_nums".to_string());
        let mut b = QBEBuilder::new();
        e.emit_statement(
            &mut b,
            &Statement::Dim {
                name: "nums".to_string(),
                dims: vec![Expr::IntLiteral { value: 10, location: fbasic_core::SourceLocation::synthetic() }],
                as_type: None,
                location: fbasic_core::SourceLocation::synthetic(),
            },
        )
        .unwrap();
        let text = b.finish();
        assert!(text.contains("fb_array_alloc"));
        assert!(!e.defer.is_empty());
    }
}
