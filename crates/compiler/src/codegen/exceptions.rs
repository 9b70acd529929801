//! `TRY`/`CATCH`/`FINALLY` lowering (spec §4.7): a `TRY` block pushes an
//! `ExceptionContext`, calls `fb_exception_setjmp` on it, and branches on
//! the result - zero means the body ran normally, nonzero means a
//! `THROW` unwound into it via `fb_exception_longjmp`. `FINALLY` always
//! runs, so both the fallthrough-from-body path and the landing-from-
//! catch path route through it before the context is popped.

use super::builder::QBEBuilder;
use super::runtime_library::RuntimeLibrary;

pub struct ExceptionLowering;

impl ExceptionLowering {
    /// Emits the context push + `setjmp` dispatch. Returns the label the
    /// caller should emit the `TRY` body under, and the label for
    /// `CATCH`.
    pub fn emit_entry(
        b: &mut QBEBuilder,
        runtime: &mut RuntimeLibrary,
        ctx_slot: &str,
    ) -> Result<(String, String), super::error::CodeGenError> {
        let pushed = runtime.call(b, "fb_exception_push", &[("0".to_string(), "w")])?;
        let ctx = pushed.expect("fb_exception_push returns a context pointer");
        b.emit_line(format!("    storel {ctx}, {ctx_slot}"));

        let status = runtime.call(b, "fb_exception_setjmp", &[(ctx, "l")])?;
        let status = status.expect("fb_exception_setjmp returns a status word");

        let try_label = b.fresh_label("try_body");
        let catch_label = b.fresh_label("catch_body");
        b.emit_line(format!("    jnz {status}, {catch_label}, {try_label}"));
        b.label(&try_label);
        Ok((try_label, catch_label))
    }

    /// Emits the `fb_exception_pop` that every path - normal completion,
    /// catch, or an inner throw propagating further out - must run
    /// exactly once before `FINALLY` starts.
    pub fn emit_pop(b: &mut QBEBuilder, runtime: &mut RuntimeLibrary) -> Result<(), super::error::CodeGenError> {
        runtime.call(b, "fb_exception_pop", &[])?;
        Ok(())
    }

    /// `THROW expr` lowers to a call into `fb_exception_throw` with the
    /// current context; it never returns, so the caller should treat the
    /// following block as unreachable the same way a `RETURN` does.
    pub fn emit_throw(
        b: &mut QBEBuilder,
        runtime: &mut RuntimeLibrary,
        code: &str,
        message: &str,
        line: &str,
    ) -> Result<(), super::error::CodeGenError> {
        runtime.call(
            b,
            "fb_exception_throw",
            &[(code.to_string(), "w"), (message.to_string(), "l"), (line.to_string(), "w")],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_emits_setjmp_dispatch_with_two_labels() {
        let mut b = QBEBuilder::new();
        let mut runtime = RuntimeLibrary::new();
        let (try_label, catch_label) = ExceptionLowering::emit_entry(&mut b, &mut runtime, "%ctx_slot").unwrap();
        assert_ne!(try_label, catch_label);
        let text = b.finish();
        assert!(text.contains("jnz"));
        assert!(text.contains(&try_label));
    }
}
