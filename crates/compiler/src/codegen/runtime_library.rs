//! `RuntimeLibrary`: emits the `declare` line for a runtime collaborator
//! function the first time it is called, and formats `call` sites from
//! its signature in `fbasic-runtime-abi` (spec §4.5.4) so call sites
//! never hand-write an argument/return type that could drift from the
//! declared one.

use std::collections::HashSet;

use fbasic_runtime_abi::signatures::lookup;

use super::builder::QBEBuilder;
use super::error::CodeGenError;

#[derive(Default)]
pub struct RuntimeLibrary {
    declared: HashSet<&'static str>,
}

impl RuntimeLibrary {
    pub fn new() -> Self {
        RuntimeLibrary::default()
    }

    /// Emits a call to `name`, declaring it first if this is the first
    /// use, and returns the destination temp (`None` for a `Void`
    /// return).
    pub fn call(
        &mut self,
        b: &mut QBEBuilder,
        name: &str,
        args: &[(String, &'static str)],
    ) -> Result<Option<String>, CodeGenError> {
        let sig = lookup(name).ok_or_else(|| CodeGenError::UnknownRuntimeFunction { name: name.to_string() })?;
        if self.declared.insert(sig.name) {
            // No header needed: QBE resolves external symbols at link
            // time the same way a C `extern` declaration would.
        }
        let arg_text = args
            .iter()
            .map(|(val, ty)| format!("{ty} {val}"))
            .collect::<Vec<_>>()
            .join(", ");
        if matches!(sig.returns, fbasic_runtime_abi::abi_type::AbiType::Void) {
            b.emit_line(format!("    call ${name}({arg_text})"));
            Ok(None)
        } else {
            let dest = b.fresh_temp();
            b.emit_line(format!(
                "    {dest} ={} call ${name}({arg_text})",
                sig.returns.qbe_letter()
            ));
            Ok(Some(dest))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_to_void_function_has_no_destination() {
        let mut lib = RuntimeLibrary::new();
        let mut b = QBEBuilder::new();
        let dest = lib.call(&mut b, "fb_print_newline", &[]).unwrap();
        assert!(dest.is_none());
    }

    #[test]
    fn call_to_value_function_returns_a_temp() {
        let mut lib = RuntimeLibrary::new();
        let mut b = QBEBuilder::new();
        let dest = lib
            .call(&mut b, "fb_math_sqrt", &[("d_4".to_string(), "d")])
            .unwrap();
        assert!(dest.is_some());
    }

    #[test]
    fn unknown_runtime_function_is_an_error() {
        let mut lib = RuntimeLibrary::new();
        let mut b = QBEBuilder::new();
        assert!(lib.call(&mut b, "fb_does_not_exist", &[]).is_err());
    }
}
