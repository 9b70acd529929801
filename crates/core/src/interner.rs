//! A minimal string interner.
//!
//! Used by the codegen's string pool (spec §4.5.1: "callers register each
//! string literal once via `registerString(text) -> label`") and by the
//! backend's symbol table. Kept deliberately small: this is not a general
//! purpose interning crate, just "map distinct strings to stable small ids,
//! insertion order preserved for deterministic output".

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InternId(pub u32);

#[derive(Debug, Default)]
pub struct Interner {
    strings: Vec<String>,
    index: HashMap<String, InternId>,
}

impl Interner {
    pub fn new() -> Self {
        Interner::default()
    }

    /// Interns `text`, returning the same id on every subsequent call with
    /// an equal string (spec §8.2: "Registering the same string literal N
    /// times yields a single data label").
    pub fn intern(&mut self, text: &str) -> InternId {
        if let Some(id) = self.index.get(text) {
            return *id;
        }
        let id = InternId(self.strings.len() as u32);
        self.strings.push(text.to_string());
        self.index.insert(text.to_string(), id);
        id
    }

    pub fn resolve(&self, id: InternId) -> &str {
        &self.strings[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InternId, &str)> {
        self.strings
            .iter()
            .enumerate()
            .map(|(i, s)| (InternId(i as u32), s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_the_same_string_twice_returns_the_same_id() {
        let mut interner = Interner::new();
        let a = interner.intern("hello");
        let b = interner.intern("world");
        let c = interner.intern("hello");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn resolve_round_trips() {
        let mut interner = Interner::new();
        let id = interner.intern("hi 🌍");
        assert_eq!(interner.resolve(id), "hi 🌍");
    }
}
