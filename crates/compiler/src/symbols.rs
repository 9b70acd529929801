//! Symbols, scope, and user-defined types (spec §3.4, §3.5).

use std::collections::HashMap;

use crate::types::TypeDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Function(String),
}

impl Scope {
    /// Symbols are keyed `global::name` or `function:F::name` (spec §3.4).
    pub fn key(&self, name: &str) -> String {
        match self {
            Scope::Global => format!("global::{name}"),
            Scope::Function(f) => format!("function:{f}::{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Variable,
    Array { dims: Vec<i64> },
    Type,
    Function { params: Vec<TypeDescriptor>, returns: TypeDescriptor },
    Constant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: TypeDescriptor,
    pub scope: Scope,
}

/// A field within a user-defined type, with its compile-time byte offset
/// (spec §3.5: "determined by natural alignment").
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSymbol {
    pub name: String,
    pub ty: TypeDescriptor,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeSymbol {
    pub id: u32,
    pub name: String,
    pub fields: Vec<FieldSymbol>,
    pub size: i64,
    /// Tagged for potential future vectorisation; `{DOUBLE,DOUBLE}` and
    /// `{SINGLE,SINGLE,SINGLE,SINGLE}` layouts (spec §3.5). Never consulted
    /// by codegen beyond this flag - it changes no generated code today.
    pub simd_candidate: bool,
}

impl TypeSymbol {
    pub fn find_field(&self, name: &str) -> Option<&FieldSymbol> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Lays out a UDT's fields by natural alignment and computes its size
/// (spec §3.5): each field is placed at the next multiple of its own
/// alignment, and the struct size is the last field's offset plus its
/// size, rounded up to the alignment of the largest field.
pub fn layout_fields(raw: &[(String, TypeDescriptor)]) -> (Vec<FieldSymbol>, i64) {
    let mut fields = Vec::with_capacity(raw.len());
    let mut offset: i64 = 0;
    let mut max_align: i64 = 1;

    for (name, ty) in raw {
        let align = ty.alignment();
        max_align = max_align.max(align);
        let aligned_offset = round_up(offset, align);
        fields.push(FieldSymbol {
            name: name.clone(),
            ty: ty.clone(),
            offset: aligned_offset,
        });
        offset = aligned_offset + ty.byte_size();
    }

    let size = round_up(offset, max_align);
    (fields, size)
}

fn round_up(value: i64, align: i64) -> i64 {
    if align <= 1 {
        return value;
    }
    ((value + align - 1) / align) * align
}

/// Whether a UDT's field layout is a SIMD-vectorisation candidate
/// (spec §3.5): exactly `{DOUBLE, DOUBLE}` or four `SINGLE`s.
pub fn is_simd_candidate(fields: &[FieldSymbol]) -> bool {
    use crate::types::BaseType;
    match fields {
        [a, b] => a.ty.base == BaseType::Double && b.ty.base == BaseType::Double,
        [a, b, c, d] => [a, b, c, d]
            .iter()
            .all(|f| f.ty.base == BaseType::Single),
        _ => false,
    }
}

/// Registry of all `TYPE ... END TYPE` declarations; allocates each a
/// program-unique numeric id (spec §3.5: "two declarations of the same
/// name are an error").
#[derive(Debug, Default)]
pub struct TypeRegistry {
    by_name: HashMap<String, u32>,
    by_id: Vec<TypeSymbol>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    /// Registers a new UDT, returning its id, or `Err` if `name` is already
    /// declared.
    pub fn declare(
        &mut self,
        name: &str,
        raw_fields: &[(String, TypeDescriptor)],
    ) -> Result<u32, String> {
        if self.by_name.contains_key(name) {
            return Err(format!("type '{name}' is already defined"));
        }
        let id = self.by_id.len() as u32;
        let (fields, size) = layout_fields(raw_fields);
        let simd_candidate = is_simd_candidate(&fields);
        self.by_id.push(TypeSymbol {
            id,
            name: name.to_string(),
            fields,
            size,
            simd_candidate,
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn get(&self, id: u32) -> Option<&TypeSymbol> {
        self.by_id.get(id as usize)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&TypeSymbol> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }
}

/// Scoped symbol table: lookup tries the current function scope first,
/// then falls back to global (spec §3.4).
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn declare(&mut self, symbol: Symbol) -> Result<(), String> {
        let key = symbol.scope.key(&symbol.name);
        if self.symbols.contains_key(&key) {
            return Err(format!(
                "'{}' is already declared in this scope",
                symbol.name
            ));
        }
        self.symbols.insert(key, symbol);
        Ok(())
    }

    /// Looks up `name`, trying `function_scope` first (if any) and falling
    /// back to `Scope::Global`.
    pub fn lookup(&self, name: &str, function_scope: Option<&str>) -> Option<&Symbol> {
        if let Some(f) = function_scope {
            let key = Scope::Function(f.to_string()).key(name);
            if let Some(sym) = self.symbols.get(&key) {
                return Some(sym);
            }
        }
        self.symbols.get(&Scope::Global.key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BaseType;

    #[test]
    fn field_layout_respects_natural_alignment() {
        // BYTE then LONG: the LONG must start at offset 8, not 1.
        let raw = vec![
            ("flag".to_string(), TypeDescriptor::scalar(BaseType::Byte)),
            ("total".to_string(), TypeDescriptor::scalar(BaseType::Long)),
        ];
        let (fields, size) = layout_fields(&raw);
        assert_eq!(fields[0].offset, 0);
        assert_eq!(fields[1].offset, 8);
        assert_eq!(size, 16);
    }

    #[test]
    fn simd_candidate_detects_double_pair_and_single_quad() {
        let raw = vec![
            ("x".to_string(), TypeDescriptor::scalar(BaseType::Double)),
            ("y".to_string(), TypeDescriptor::scalar(BaseType::Double)),
        ];
        let (fields, _) = layout_fields(&raw);
        assert!(is_simd_candidate(&fields));
    }

    #[test]
    fn redeclaring_a_type_name_is_an_error() {
        let mut reg = TypeRegistry::new();
        let raw = vec![("x".to_string(), TypeDescriptor::scalar(BaseType::Integer))];
        assert!(reg.declare("Point", &raw).is_ok());
        assert!(reg.declare("Point", &raw).is_err());
    }

    #[test]
    fn lookup_prefers_function_scope_over_global() {
        let mut table = SymbolTable::new();
        table
            .declare(Symbol {
                name: "x".to_string(),
                kind: SymbolKind::Variable,
                ty: TypeDescriptor::scalar(BaseType::Integer),
                scope: Scope::Global,
            })
            .unwrap();
        table
            .declare(Symbol {
                name: "x".to_string(),
                kind: SymbolKind::Variable,
                ty: TypeDescriptor::scalar(BaseType::Double),
                scope: Scope::Function("Demo".to_string()),
            })
            .unwrap();
        let found = table.lookup("x", Some("Demo")).unwrap();
        assert_eq!(found.ty.base, BaseType::Double);
        let global_found = table.lookup("x", None).unwrap();
        assert_eq!(global_found.ty.base, BaseType::Integer);
    }
}
