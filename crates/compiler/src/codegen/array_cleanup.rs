//! Array lifetime cleanup (spec §4.5.8): every `DIM`'d array in a
//! routine is registered on a defer list as it comes into scope, and the
//! routine's single exit point (`@tidy_exit`) walks the list backwards
//! calling `fb_array_free`, so `EXIT FUNCTION`/`EXIT SUB` and a normal
//! fall-through both clean up the same way instead of duplicating frees
//! at every return site.

use super::builder::QBEBuilder;
use super::runtime_library::RuntimeLibrary;

#[derive(Default)]
pub struct DeferList {
    arrays: Vec<String>,
}

impl DeferList {
    pub fn new() -> Self {
        DeferList::default()
    }

    pub fn register(&mut self, storage_name: String) {
        self.arrays.push(storage_name);
    }

    /// Emits the `@tidy_exit` label and one `fb_array_free` call per
    /// registered array, in reverse declaration order.
    pub fn emit_tidy_exit(&self, b: &mut QBEBuilder, runtime: &mut RuntimeLibrary) {
        b.label("@tidy_exit");
        for storage in self.arrays.iter().rev() {
            let loaded = b.fresh_temp();
            b.emit_line(format!("    {loaded} =l loadl {storage}"));
            let _ = runtime.call(b, "fb_array_free", &[(loaded, "l")]);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tidy_exit_frees_in_reverse_declaration_order() {
        let mut defer = DeferList::new();
        defer.register("%arr_a".to_string());
        defer.register("%arr_b".to_string());
        let mut b = QBEBuilder::new();
        let mut runtime = RuntimeLibrary::new();
        defer.emit_tidy_exit(&mut b, &mut runtime);
        let text = b.finish();
        let a_pos = text.find("%arr_a").unwrap();
        let b_pos = text.find("%arr_b").unwrap();
        assert!(b_pos < a_pos, "arrays should be freed in reverse order");
    }
}
