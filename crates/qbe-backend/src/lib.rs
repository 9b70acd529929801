//! A bundled, modified QBE ARM64 backend (spec §5, §8.4). Stock QBE
//! lowers IL straight to assembly with no fused multiply-accumulate;
//! this backend inserts a machine-independent cleanup stage ([`passes`])
//! and an ARM64-specific selection stage ([`isel`]) between parsing the
//! IL text ([`parse`]) and emitting assembly ([`emit3`]), so that
//! `a*b+c` patterns collapse into a single `madd`/`fmadd`.

pub mod emit3;
pub mod ins;
pub mod isel;
pub mod parse;
pub mod passes;

/// Runs the whole pipeline: parse this compiler's QBE IL text, run the
/// machine-independent passes, select ARM64 instructions (fusing
/// multiply-accumulate where it's safe), and emit assembly text.
pub fn compile_to_arm64(qbe_il: &str) -> String {
    let mut module = parse::parse_module(qbe_il);
    passes::run(&mut module);
    isel::select(&mut module);
    emit3::emit_module(&module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuses_a_mul_add_pair_emitted_by_the_front_end() {
        let il = "export function l $main() {\n\
@start\n\
    %t1 =l mul %a, %b\n\
    %t2 =l add %t1, %c\n\
    ret %t2\n\
}\n";
        let asm = compile_to_arm64(il);
        assert!(asm.contains("madd"));
        assert!(!asm.contains("mul "));
    }

    #[test]
    fn round_trips_a_trivial_main_function() {
        let il = "export function w $main() {\n@start\n    ret 0\n}\n";
        let asm = compile_to_arm64(il);
        assert!(asm.contains(".globl main"));
        assert!(asm.contains("ret"));
    }
}
