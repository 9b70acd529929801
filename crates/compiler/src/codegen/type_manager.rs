//! `TypeManager`: the thin codegen-facing view over `types::TypeDescriptor`
//! (spec §4.5.2) - picks QBE type letters, default values, and the right
//! load/store width for a given `TypeDescriptor` so `ASTEmitter` never
//! matches on `BaseType` directly.

use crate::types::{default_value_text, QbeType, TypeDescriptor};

pub struct TypeManager;

impl TypeManager {
    pub fn qbe_letter(desc: &TypeDescriptor) -> &'static str {
        desc.qbe_type().letter()
    }

    pub fn memory_letter(desc: &TypeDescriptor) -> &'static str {
        desc.memory_letter()
    }

    pub fn default_value(desc: &TypeDescriptor) -> &'static str {
        default_value_text(desc)
    }

    /// The extending load instruction mnemonic for a value of this type
    /// (spec §3.3: sub-word fields widen on load).
    pub fn load_op(desc: &TypeDescriptor) -> String {
        match desc.base {
            crate::types::BaseType::Byte => "loadsb".to_string(),
            crate::types::BaseType::UByte => "loadub".to_string(),
            crate::types::BaseType::Short => "loadsh".to_string(),
            crate::types::BaseType::UShort => "loaduh".to_string(),
            _ => format!("load{}", Self::qbe_letter(desc)),
        }
    }

    pub fn store_op(desc: &TypeDescriptor) -> String {
        format!("store{}", Self::memory_letter(desc))
    }

    pub fn is_double_width(desc: &TypeDescriptor) -> bool {
        matches!(desc.qbe_type(), QbeType::L | QbeType::D)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BaseType;

    #[test]
    fn byte_loads_sign_extend() {
        let desc = TypeDescriptor::scalar(BaseType::Byte);
        assert_eq!(TypeManager::load_op(&desc), "loadsb");
    }

    #[test]
    fn long_uses_plain_load_and_store() {
        let desc = TypeDescriptor::scalar(BaseType::Long);
        assert_eq!(TypeManager::load_op(&desc), "loadl");
        assert_eq!(TypeManager::store_op(&desc), "storel");
    }
}
