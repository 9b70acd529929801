//! Compilation configuration: the `OPTION` modes a program can set
//! (spec §3.3, §4.3, §9) plus the handful of knobs the driver passes in.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayBase {
    Zero,
    One,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringMode {
    Ascii,
    Unicode,
}

/// Accumulates `OPTION` statements seen during semantic analysis and
/// driver-level flags. Built incrementally, the way the teacher's
/// `CompilerConfig` is threaded through phases as a shared `&mut`.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    array_base: ArrayBase,
    string_mode: StringMode,
    detect_string: bool,
    emit_debug_info: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            array_base: ArrayBase::Zero,
            string_mode: StringMode::Ascii,
            detect_string: false,
            emit_debug_info: false,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_array_base(mut self, base: ArrayBase) -> Self {
        self.array_base = base;
        self
    }

    pub fn with_string_mode(mut self, mode: StringMode) -> Self {
        self.string_mode = mode;
        self
    }

    pub fn with_detect_string(mut self, on: bool) -> Self {
        self.detect_string = on;
        self
    }

    pub fn with_debug_info(mut self, on: bool) -> Self {
        self.emit_debug_info = on;
        self
    }

    pub fn array_base(&self) -> ArrayBase {
        self.array_base
    }

    pub fn string_mode(&self) -> StringMode {
        self.string_mode
    }

    pub fn detect_string(&self) -> bool {
        self.detect_string
    }

    pub fn emit_debug_info(&self) -> bool {
        self.emit_debug_info
    }

    pub fn set_array_base(&mut self, base: ArrayBase) {
        self.array_base = base;
    }

    pub fn set_string_mode(&mut self, mode: StringMode) {
        self.string_mode = mode;
    }

    pub fn set_detect_string(&mut self, on: bool) {
        self.detect_string = on;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_base_zero_ascii() {
        let cfg = CompilerConfig::new();
        assert_eq!(cfg.array_base(), ArrayBase::Zero);
        assert_eq!(cfg.string_mode(), StringMode::Ascii);
        assert!(!cfg.detect_string());
    }

    #[test]
    fn builder_methods_chain() {
        let cfg = CompilerConfig::new()
            .with_array_base(ArrayBase::One)
            .with_string_mode(StringMode::Unicode)
            .with_detect_string(true);
        assert_eq!(cfg.array_base(), ArrayBase::One);
        assert_eq!(cfg.string_mode(), StringMode::Unicode);
        assert!(cfg.detect_string());
    }
}
