//! The typed call surface of the runtime collaborator (spec §4.5.4).
//!
//! Data-driven the way the teacher's `codegen/runtime.rs` declares its
//! runtime functions in a single table instead of one `writeln!` per
//! function: `fbasic-compiler`'s `RuntimeLibrary` wrapper looks a function
//! up by name here to know its QBE call signature, rather than hard-coding
//! argument/return types at every call site.

use crate::abi_type::AbiType;

#[derive(Debug, Clone, Copy)]
pub struct RuntimeFunction {
    /// The symbol as declared/called in emitted QBE IL, e.g. `fb_print_int`.
    pub name: &'static str,
    pub params: &'static [AbiType],
    pub returns: AbiType,
}

macro_rules! rtfn {
    ($name:literal, [$($p:expr),* $(,)?], $ret:expr) => {
        RuntimeFunction { name: $name, params: &[$($p),*], returns: $ret }
    };
}

use AbiType::*;

pub static RUNTIME_FUNCTIONS: &[RuntimeFunction] = &[
    // PRINT family - dispatch chosen by the *expression's* result type (§4.5.5)
    rtfn!("fb_print_int", [Word], Void),
    rtfn!("fb_print_long", [Long], Void),
    rtfn!("fb_print_float", [Single], Void),
    rtfn!("fb_print_double", [Double], Void),
    rtfn!("fb_print_string_desc", [Long], Void),
    rtfn!("fb_print_cstr", [Long], Void),
    rtfn!("fb_print_newline", [], Void),
    rtfn!("fb_print_tab", [], Void),
    // INPUT family
    rtfn!("fb_input_int", [], Word),
    rtfn!("fb_input_float", [], Single),
    rtfn!("fb_input_double", [], Double),
    rtfn!("fb_input_string", [], Long),
    // String operations - STRING/UNICODE descriptors are always `l`
    rtfn!("fb_string_from_cstr", [Long], Long),
    rtfn!("fb_string_concat", [Long, Long], Long),
    rtfn!("fb_string_len", [Long], Long),
    rtfn!("fb_string_chr", [Word], Long),
    rtfn!("fb_string_asc", [Long], Word),
    rtfn!("fb_string_mid", [Long, Long, Long], Long),
    rtfn!("fb_string_left", [Long, Long], Long),
    rtfn!("fb_string_right", [Long, Long], Long),
    rtfn!("fb_string_compare", [Long, Long], Word),
    rtfn!("fb_string_assign", [Long, Long], Void),
    rtfn!("fb_string_upper", [Long], Long),
    rtfn!("fb_string_lower", [Long], Long),
    rtfn!("fb_string_trim", [Long], Long),
    rtfn!("fb_string_ltrim", [Long], Long),
    rtfn!("fb_string_rtrim", [Long], Long),
    rtfn!("fb_str", [Double], Long),
    rtfn!("fb_val", [Long], Double),
    // Array operations
    rtfn!("fb_array_access", [Long, Long], Long),
    rtfn!("fb_array_bounds_check", [Long, Long], Void),
    rtfn!("fb_array_alloc", [Long, Long, Long, Word, Word], Long),
    rtfn!("fb_array_free", [Long], Void),
    rtfn!("fb_array_redim", [Long, Long], Void),
    rtfn!("fb_array_redim_preserve", [Long, Long], Void),
    rtfn!("fb_array_erase", [Long], Void),
    // Math intrinsics
    rtfn!("fb_math_abs_i", [Word], Word),
    rtfn!("fb_math_abs_d", [Double], Double),
    rtfn!("fb_math_sqrt", [Double], Double),
    rtfn!("fb_math_sin", [Double], Double),
    rtfn!("fb_math_cos", [Double], Double),
    rtfn!("fb_math_tan", [Double], Double),
    rtfn!("fb_math_atan", [Double], Double),
    rtfn!("fb_math_atan2", [Double, Double], Double),
    rtfn!("fb_math_log", [Double], Double),
    rtfn!("fb_math_exp", [Double], Double),
    rtfn!("fb_math_rnd", [], Double),
    rtfn!("fb_math_rnd_int", [Word, Word], Word),
    rtfn!("fb_math_randomize", [Long], Void),
    rtfn!("fb_math_int", [Double], Double),
    rtfn!("fb_math_sgn", [Double], Word),
    rtfn!("fb_math_pow", [Double, Double], Double),
    // Exception subsystem (§4.7)
    rtfn!("fb_exception_push", [Word], Long),
    rtfn!("fb_exception_pop", [], Void),
    rtfn!("fb_exception_current", [], Long),
    rtfn!("fb_exception_throw", [Word, Long, Word], Void),
    rtfn!("fb_exception_longjmp", [Long, Word], Void),
    rtfn!("fb_exception_setjmp", [Long], Word),
    // Process control
    rtfn!("fb_end", [], Void),
];

/// Looks up a runtime function's signature by its emitted symbol name.
pub fn lookup(name: &str) -> Option<&'static RuntimeFunction> {
    RUNTIME_FUNCTIONS.iter().find(|f| f.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_function_name_is_unique() {
        let mut names: Vec<&str> = RUNTIME_FUNCTIONS.iter().map(|f| f.name).collect();
        let before = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(before, names.len(), "duplicate runtime function name");
    }

    #[test]
    fn lookup_finds_print_family_by_name() {
        let f = lookup("fb_print_double").expect("fb_print_double should exist");
        assert_eq!(f.params, &[AbiType::Double]);
        assert_eq!(f.returns, AbiType::Void);
        assert!(lookup("fb_does_not_exist").is_none());
    }
}
