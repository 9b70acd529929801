//! `SymbolMapper`: turns a scoped BASIC name into its QBE storage name,
//! and a suffixed builtin call (`TRIM$`, `LEN$`) into the runtime
//! function it lowers to (spec §4.5.3, §9: the `$` mangling only matters
//! at this lookup layer - the symbol table itself keys on the name as
//! written, suffix included).

use crate::symbols::Scope;
use crate::types::BaseType;

pub struct SymbolMapper;

impl SymbolMapper {
    /// `global::x` -> `$g_x`; `function:F::x` -> `%f_F_x` (function-local
    /// names become QBE temporaries, not globals).
    pub fn storage_name(scope: &Scope, name: &str) -> String {
        let clean = sanitize(name);
        match scope {
            Scope::Global => format!("$g_{clean}"),
            Scope::Function(f) => format!("%f_{}_{}", sanitize(f), clean),
        }
    }

    /// A routine's linkage name never carries its return-type suffix - a
    /// `FUNCTION T&` is called as `T(...)`, not `T&(...)`, so the suffix
    /// can't be part of how callers and the definition agree on a symbol.
    pub fn function_symbol(name: &str) -> String {
        let base = name.trim_end_matches(['$', '#', '!', '%', '&', '^', '@']);
        format!("$fn_{}", sanitize(base))
    }

    pub fn label_name(name: &str) -> String {
        format!("@lbl_{}", sanitize(name))
    }

    /// The SSA name a parameter arrives under in a function header, before
    /// the prologue spills it into its own stack slot. Distinct from
    /// `storage_name` so the incoming value and the addressable local it
    /// gets copied into never collide.
    pub fn temp_name(name: &str) -> String {
        format!("%arg_{}", sanitize(name))
    }

    /// Maps a suffixed identifier used as a call (`TRIM$(s)`) to the
    /// runtime function it names, independent of whatever the same
    /// spelling might mean as a plain variable elsewhere in the program.
    pub fn builtin_runtime_name(name: &str) -> Option<&'static str> {
        let base = name.trim_end_matches(['$', '#', '!', '%', '&', '^', '@']);
        Some(match base.to_ascii_uppercase().as_str() {
            "TRIM" => "fb_string_trim",
            "LTRIM" => "fb_string_ltrim",
            "RTRIM" => "fb_string_rtrim",
            "UCASE" => "fb_string_upper",
            "LCASE" => "fb_string_lower",
            "MID" => "fb_string_mid",
            "LEFT" => "fb_string_left",
            "RIGHT" => "fb_string_right",
            "LEN" => "fb_string_len",
            "CHR" => "fb_string_chr",
            "ASC" => "fb_string_asc",
            "STR" => "fb_str",
            "VAL" => "fb_val",
            "ABS" => "fb_math_abs_d",
            "SQR" => "fb_math_sqrt",
            "SIN" => "fb_math_sin",
            "COS" => "fb_math_cos",
            "TAN" => "fb_math_tan",
            "ATN" => "fb_math_atan",
            "LOG" => "fb_math_log",
            "EXP" => "fb_math_exp",
            "RND" => "fb_math_rnd",
            "INT" => "fb_math_int",
            "SGN" => "fb_math_sgn",
            _ => return None,
        })
    }

    /// The type a builtin call produces - not recoverable from
    /// `builtin_runtime_name`'s target alone, since several builtins
    /// share `AbiType::Long` at the ABI boundary for unrelated reasons
    /// (a string descriptor pointer vs. a genuine 64-bit count).
    pub fn builtin_return_type(name: &str) -> Option<BaseType> {
        let base = name.trim_end_matches(['$', '#', '!', '%', '&', '^', '@']);
        Some(match base.to_ascii_uppercase().as_str() {
            "TRIM" | "LTRIM" | "RTRIM" | "UCASE" | "LCASE" | "MID" | "LEFT" | "RIGHT" | "STR" | "CHR" => BaseType::String,
            "LEN" | "ASC" | "INT" | "SGN" => BaseType::Long,
            "VAL" | "ABS" | "SQR" | "SIN" | "COS" | "TAN" | "ATN" | "LOG" | "EXP" | "RND" => BaseType::Double,
            _ => return None,
        })
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_and_function_scopes_map_to_distinct_storage_kinds() {
        assert_eq!(SymbolMapper::storage_name(&Scope::Global, "count"), "$g_count");
        assert_eq!(
            SymbolMapper::storage_name(&Scope::Function("Main".to_string()), "count"),
            "%f_Main_count"
        );
    }

    #[test]
    fn suffix_is_stripped_before_builtin_lookup() {
        assert_eq!(SymbolMapper::builtin_runtime_name("TRIM$"), Some("fb_string_trim"));
        assert_eq!(SymbolMapper::builtin_runtime_name("trim$"), Some("fb_string_trim"));
    }

    #[test]
    fn suffix_character_is_sanitized_in_storage_names() {
        assert_eq!(SymbolMapper::storage_name(&Scope::Global, "total$"), "$g_total_");
    }
}
