//! The type system (spec §3.3): `TypeDescriptor`, `BaseType`, attribute
//! bits, the QBE type mapping, and the promotion ladder consulted by both
//! the semantic analyzer (to decide coercibility) and `ASTEmitter` (to pick
//! the right conversion op).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Byte,
    UByte,
    Short,
    UShort,
    Integer,
    UInteger,
    Long,
    ULong,
    Single,
    Double,
    String,
    Unicode,
    UserDefined,
    LoopIndex,
    ArrayDesc,
    StringDesc,
    Ptr,
    Void,
}

bitflags::bitflags! {
    /// `TypeDescriptor.attrs` bits (spec §3.3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeAttrs: u8 {
        const IS_ARRAY  = 0b0001;
        const IS_POINTER = 0b0010;
        const IS_CONST  = 0b0100;
        const IS_BYREF  = 0b1000;
    }
}

/// The QBE base type a `TypeDescriptor` lowers to (spec §3.3 mapping table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QbeType {
    W,
    L,
    S,
    D,
}

impl QbeType {
    pub fn letter(self) -> &'static str {
        match self {
            QbeType::W => "w",
            QbeType::L => "l",
            QbeType::S => "s",
            QbeType::D => "d",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub base: BaseType,
    pub attrs: TypeAttrs,
    /// Set for `BaseType::UserDefined`, 0 otherwise.
    pub udt_type_id: u32,
    /// One entry per array dimension; empty for scalars.
    pub array_dims: Vec<i64>,
}

impl TypeDescriptor {
    pub fn scalar(base: BaseType) -> Self {
        TypeDescriptor {
            base,
            attrs: TypeAttrs::empty(),
            udt_type_id: 0,
            array_dims: Vec::new(),
        }
    }

    pub fn array(base: BaseType, dims: Vec<i64>) -> Self {
        TypeDescriptor {
            base,
            attrs: TypeAttrs::IS_ARRAY,
            udt_type_id: 0,
            array_dims: dims,
        }
    }

    pub fn udt(type_id: u32) -> Self {
        TypeDescriptor {
            base: BaseType::UserDefined,
            attrs: TypeAttrs::empty(),
            udt_type_id: type_id,
            array_dims: Vec::new(),
        }
    }

    pub fn is_array(&self) -> bool {
        self.attrs.contains(TypeAttrs::IS_ARRAY)
    }

    pub fn is_float(&self) -> bool {
        matches!(self.base, BaseType::Single | BaseType::Double)
    }

    pub fn is_string(&self) -> bool {
        matches!(self.base, BaseType::String | BaseType::Unicode)
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self.base,
            BaseType::Byte
                | BaseType::UByte
                | BaseType::Short
                | BaseType::UShort
                | BaseType::Integer
                | BaseType::UInteger
                | BaseType::Long
                | BaseType::ULong
                | BaseType::LoopIndex
        )
    }

    /// QBE type mapping (spec §3.3): `w` for 8/16/32-bit integers, `l` for
    /// 64-bit integers/pointers/strings/arrays, `s`/`d` for floats.
    pub fn qbe_type(&self) -> QbeType {
        if self.is_array() {
            return QbeType::L;
        }
        match self.base {
            BaseType::Byte
            | BaseType::UByte
            | BaseType::Short
            | BaseType::UShort
            | BaseType::Integer
            | BaseType::UInteger
            | BaseType::LoopIndex => QbeType::W,
            BaseType::Long
            | BaseType::ULong
            | BaseType::String
            | BaseType::Unicode
            | BaseType::UserDefined
            | BaseType::ArrayDesc
            | BaseType::StringDesc
            | BaseType::Ptr => QbeType::L,
            BaseType::Single => QbeType::S,
            BaseType::Double => QbeType::D,
            BaseType::Void => QbeType::W,
        }
    }

    /// In-memory storage type: 8/16-bit integers narrow in memory (`sb`/`sh`
    /// with widening on load) even though their SSA values are `w`.
    pub fn memory_letter(&self) -> &'static str {
        match self.base {
            BaseType::Byte | BaseType::UByte => "b",
            BaseType::Short | BaseType::UShort => "h",
            _ => self.qbe_type().letter(),
        }
    }

    pub fn byte_size(&self) -> i64 {
        match self.base {
            BaseType::Byte | BaseType::UByte => 1,
            BaseType::Short | BaseType::UShort => 2,
            BaseType::Integer | BaseType::UInteger | BaseType::LoopIndex | BaseType::Single => 4,
            BaseType::Long
            | BaseType::ULong
            | BaseType::Double
            | BaseType::String
            | BaseType::Unicode
            | BaseType::UserDefined
            | BaseType::ArrayDesc
            | BaseType::StringDesc
            | BaseType::Ptr => 8,
            BaseType::Void => 0,
        }
    }

    pub fn alignment(&self) -> i64 {
        self.byte_size().max(1)
    }
}

/// Promotion ladder rank (spec §3.3): `BYTE -> SHORT -> INTEGER -> LONG ->
/// DOUBLE`, with `INTEGER -> SINGLE -> DOUBLE` also valid. Ranks increase
/// with width/precision; coercion from a lower rank to a higher one is
/// always implicit widening.
fn promotion_rank(base: BaseType) -> u8 {
    match base {
        BaseType::Byte | BaseType::UByte => 0,
        BaseType::Short | BaseType::UShort => 1,
        BaseType::Integer | BaseType::UInteger | BaseType::LoopIndex => 2,
        BaseType::Long | BaseType::ULong => 3,
        BaseType::Single => 4,
        BaseType::Double => 5,
        _ => u8::MAX,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// No conversion needed.
    Identity,
    /// Implicit widening, always safe.
    Widen,
    /// Implicit integer narrowing; legal but the spec requires a warning.
    NarrowWithWarning,
    /// Float-to-integer without an explicit conversion intrinsic: illegal.
    NarrowingRequired,
    /// The two types cannot be coerced into one another at all.
    Incompatible,
}

/// Decides how (if at all) `from` can be coerced to `to` (spec §3.3, §4.3).
pub fn classify_coercion(from: &TypeDescriptor, to: &TypeDescriptor) -> Coercion {
    if from.base == to.base {
        return Coercion::Identity;
    }

    if from.is_string() || to.is_string() {
        // Cross-mode STRING/UNICODE coercion (Open Question, spec §9):
        // reject unless both sides agree, or the destination is UNICODE.
        return match (from.base, to.base) {
            (BaseType::String, BaseType::Unicode) => Coercion::Widen,
            (BaseType::Unicode, BaseType::String) => Coercion::Incompatible,
            _ if from.is_string() && to.is_string() => Coercion::Identity,
            _ => Coercion::Incompatible,
        };
    }

    if from.base == BaseType::UserDefined || to.base == BaseType::UserDefined {
        return Coercion::Incompatible;
    }

    let from_float = from.is_float();
    let to_float = to.is_float();

    if from_float && !to_float {
        // Float -> integer always requires an explicit conversion intrinsic
        // (spec §3.3: "fails with NARROWING_REQUIRED otherwise").
        return Coercion::NarrowingRequired;
    }

    let from_rank = promotion_rank(from.base);
    let to_rank = promotion_rank(to.base);
    if from_rank == u8::MAX || to_rank == u8::MAX {
        return Coercion::Incompatible;
    }

    if from_rank <= to_rank {
        Coercion::Widen
    } else {
        Coercion::NarrowWithWarning
    }
}

/// Mixed integer/float arithmetic promotes to the widest floating type
/// present (spec §3.3).
pub fn common_arithmetic_type(a: &TypeDescriptor, b: &TypeDescriptor) -> TypeDescriptor {
    if a.base == BaseType::Double || b.base == BaseType::Double {
        return TypeDescriptor::scalar(BaseType::Double);
    }
    if a.base == BaseType::Single || b.base == BaseType::Single {
        return TypeDescriptor::scalar(BaseType::Single);
    }
    let winner = if promotion_rank(a.base) >= promotion_rank(b.base) {
        a.base
    } else {
        b.base
    };
    TypeDescriptor::scalar(winner)
}

/// A type-appropriate default/zero value, as text suitable for QBE IL
/// (spec §4.5.2: TypeManager "returns a type-appropriate default value").
pub fn default_value_text(desc: &TypeDescriptor) -> &'static str {
    match desc.qbe_type() {
        QbeType::W => "0",
        QbeType::L => "0",
        QbeType::S => "s_0",
        QbeType::D => "d_0",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_widens_to_long_without_warning() {
        let from = TypeDescriptor::scalar(BaseType::Byte);
        let to = TypeDescriptor::scalar(BaseType::Long);
        assert_eq!(classify_coercion(&from, &to), Coercion::Widen);
    }

    #[test]
    fn long_to_byte_narrows_with_warning() {
        let from = TypeDescriptor::scalar(BaseType::Long);
        let to = TypeDescriptor::scalar(BaseType::Byte);
        assert_eq!(classify_coercion(&from, &to), Coercion::NarrowWithWarning);
    }

    #[test]
    fn double_to_integer_requires_explicit_conversion() {
        let from = TypeDescriptor::scalar(BaseType::Double);
        let to = TypeDescriptor::scalar(BaseType::Integer);
        assert_eq!(classify_coercion(&from, &to), Coercion::NarrowingRequired);
    }

    #[test]
    fn string_to_unicode_widens_but_not_the_reverse() {
        let s = TypeDescriptor::scalar(BaseType::String);
        let u = TypeDescriptor::scalar(BaseType::Unicode);
        assert_eq!(classify_coercion(&s, &u), Coercion::Widen);
        assert_eq!(classify_coercion(&u, &s), Coercion::Incompatible);
    }

    #[test]
    fn mixed_int_float_arithmetic_promotes_to_widest_float() {
        let i = TypeDescriptor::scalar(BaseType::Integer);
        let d = TypeDescriptor::scalar(BaseType::Double);
        assert_eq!(common_arithmetic_type(&i, &d).base, BaseType::Double);
        let f = TypeDescriptor::scalar(BaseType::Single);
        assert_eq!(common_arithmetic_type(&i, &f).base, BaseType::Single);
    }

    #[test]
    fn qbe_type_mapping_matches_spec_table() {
        assert_eq!(TypeDescriptor::scalar(BaseType::Byte).qbe_type(), QbeType::W);
        assert_eq!(TypeDescriptor::scalar(BaseType::Long).qbe_type(), QbeType::L);
        assert_eq!(TypeDescriptor::scalar(BaseType::Single).qbe_type(), QbeType::S);
        assert_eq!(TypeDescriptor::scalar(BaseType::Double).qbe_type(), QbeType::D);
        assert_eq!(TypeDescriptor::scalar(BaseType::String).qbe_type(), QbeType::L);
    }
}
