//! `QBEBuilder`: the textual QBE IL writer every other codegen
//! subcomponent emits through (spec §4.5.1). Owns temporary/label/string
//! counters and the growing output buffer; nothing else in `codegen/`
//! touches a `String` directly.

use std::collections::HashMap;
use std::fmt::Write as _;

pub struct QBEBuilder {
    out: String,
    temp_counter: u32,
    label_counter: u32,
    string_pool: HashMap<String, String>,
    string_counter: u32,
}

impl QBEBuilder {
    pub fn new() -> Self {
        QBEBuilder {
            out: String::new(),
            temp_counter: 0,
            label_counter: 0,
            string_pool: HashMap::new(),
            string_counter: 0,
        }
    }

    pub fn fresh_temp(&mut self) -> String {
        self.temp_counter += 1;
        format!("%t{}", self.temp_counter)
    }

    pub fn fresh_label(&mut self, hint: &str) -> String {
        self.label_counter += 1;
        format!("@{hint}{}", self.label_counter)
    }

    /// Allocates a dominating stack slot of at least `bytes`, returning its
    /// address (spec §4.5.5: a real variable's storage is a genuine
    /// pointer, not the SSA temp that happens to share its name).
    pub fn alloc_local(&mut self, bytes: i64) -> String {
        let dest = self.fresh_temp();
        self.emit_line(format!("    {dest} =l alloc8 {}", bytes.max(1)));
        dest
    }

    /// Interns a string literal's text into the data segment, returning
    /// its global symbol name (spec §4.5.6: literal pooling - identical
    /// text shares one global).
    pub fn intern_string(&mut self, text: &str) -> String {
        if let Some(existing) = self.string_pool.get(text) {
            return existing.clone();
        }
        self.string_counter += 1;
        let symbol = format!("$str{}", self.string_counter);
        self.string_pool.insert(text.to_string(), symbol.clone());
        symbol
    }

    pub fn emit_line(&mut self, line: impl AsRef<str>) {
        self.out.push_str(line.as_ref());
        self.out.push('\n');
    }

    pub fn emit(&mut self, args: std::fmt::Arguments<'_>) {
        self.out.write_fmt(args).expect("writing to a String cannot fail");
    }

    pub fn label(&mut self, name: &str) {
        self.emit_line(format!("{name}"));
    }

    /// Emits every pooled string literal as a QBE data definition, byte
    /// array followed by a NUL terminator the runtime's C-string helpers
    /// expect (spec §4.5.6).
    pub fn emit_string_pool(&mut self) {
        let mut entries: Vec<(String, String)> =
            self.string_pool.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1));
        for (text, symbol) in entries {
            let bytes: Vec<String> = text.bytes().map(|b| format!("b {b}")).collect();
            self.emit_line(format!("data {symbol} = {{ {}, b 0 }}", bytes.join(", ")));
        }
    }

    pub fn finish(self) -> String {
        self.out
    }
}

impl Default for QBEBuilder {
    fn default() -> Self {
        QBEBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_temps_are_unique_and_increasing() {
        let mut b = QBEBuilder::new();
        assert_eq!(b.fresh_temp(), "%t1");
        assert_eq!(b.fresh_temp(), "%t2");
    }

    #[test]
    fn interning_the_same_text_twice_returns_the_same_symbol() {
        let mut b = QBEBuilder::new();
        let a = b.intern_string("hello");
        let c = b.intern_string("hello");
        assert_eq!(a, c);
        let d = b.intern_string("world");
        assert_ne!(a, d);
    }
}
