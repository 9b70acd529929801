//! Whole-pipeline coverage for the scenarios this compiler is expected
//! to handle correctly end to end. Since nothing here assembles or runs
//! the emitted QBE IL, these tests check the *shape* of the IL rather
//! than a program's runtime output - that MADD fusion actually happens
//! is covered on the ARM64 side by `fbasic-qbe-backend`'s own test
//! suite, which feeds it IL shaped like what these tests assert on.

use std::path::PathBuf;

fn compile_ok(src: &str) -> String {
    let output = fbasicc::compile(src, PathBuf::from("t.bas")).expect("parse should succeed");
    for diag in output.diagnostics.iter() {
        if diag.kind.is_fatal() {
            panic!("unexpected fatal diagnostic: {diag}");
        }
    }
    output.qbe_il
}

#[test]
fn madd_candidate_emits_one_mul_and_one_add() {
    let il = compile_ok(
        "FUNCTION T&(a AS LONG, b AS LONG, c AS LONG) AS LONG\n\
         T = c + a * b\n\
         END FUNCTION\n\
         PRINT T(7, 8, 100)\n",
    );
    assert!(il.contains("$fn_T"));
    let mul_count = il.matches(" mul ").count();
    let add_count = il.matches(" add ").count();
    assert_eq!(mul_count, 1, "expected exactly one mul in:\n{il}");
    assert!(add_count >= 1, "expected at least one add in:\n{il}");
}

#[test]
fn nested_while_inside_if_builds_a_loop_header_and_back_edge() {
    let il = compile_ok(
        "DIM j AS INTEGER\n\
         IF 1 = 1 THEN\n\
         j = 4\n\
         WHILE j <= 10\n\
         PRINT j\n\
         j = j + 2\n\
         WEND\n\
         END IF\n",
    );
    assert!(il.contains("jnz"), "a while loop should compile to a conditional branch:\n{il}");
    assert!(il.contains("fb_print_int") || il.contains("fb_print_long"));
}

#[test]
fn for_loop_inside_sub_emits_its_own_function_and_loop_structure() {
    let il = compile_ok(
        "SUB Demo()\n\
         LOCAL i AS INTEGER\n\
         FOR i = 1 TO 3\n\
         PRINT \"i=\"; i\n\
         NEXT i\n\
         END SUB\n\
         CALL Demo\n",
    );
    assert!(il.contains("$fn_Demo"));
    assert!(il.contains("jnz"));
}

#[test]
fn try_catch_finally_emits_exception_runtime_calls() {
    let il = compile_ok(
        "TRY\n\
         PRINT \"before\"\n\
         CATCH err\n\
         PRINT \"caught\"\n\
         FINALLY\n\
         PRINT \"cleanup\"\n\
         END TRY\n\
         PRINT \"after\"\n",
    );
    assert!(il.contains("fb_exception_push"));
    assert!(il.contains("fb_exception_setjmp"));
    assert!(il.contains("fb_exception_pop"));
}

#[test]
fn select_case_with_range_and_is_lowers_to_a_multiway_comparison_chain() {
    let il = compile_ok(
        "DIM x AS DOUBLE\n\
         x = 2.5\n\
         SELECT CASE x\n\
         CASE 1.5 : PRINT \"a\"\n\
         CASE 2.0 TO 3.0 : PRINT \"b\"\n\
         CASE IS > 10 : PRINT \"c\"\n\
         CASE ELSE : PRINT \"z\"\n\
         END SELECT\n",
    );
    // a range test compiles to >= and <= combined with `and`
    assert!(il.contains("cge"));
    assert!(il.contains("cle"));
    assert!(il.contains("cgt"));
}

#[test]
fn option_detectstring_mixing_compiles_both_string_and_unicode_len() {
    let il = compile_ok(
        "DIM a$\n\
         a$ = \"hi\"\n\
         DIM b$\n\
         b$ = \"hi \u{1F30D}\"\n\
         PRINT LEN(a$); LEN(b$)\n",
    );
    assert!(il.contains("fb_string_len"));
}
