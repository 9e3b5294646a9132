//! Interned string identifier.
//!
//! The front-end is single-threaded (see the resource model in SPEC_FULL.md
//! §5), so unlike a concurrent compiler's sharded interner this is a plain
//! `FxHashMap`-backed table owned by whoever drives a compilation.

use std::fmt;

use rustc_hash::FxHashMap;

/// Interned string identifier. Cheap to copy and compare.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// Pre-interned empty string; also used as the "no name" sentinel for
    /// unnamed (embedded) struct fields.
    pub const EMPTY: Name = Name(0);

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Name(raw)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Interns strings to compact `Name` handles.
///
/// Index 0 is always the empty string, matching `Name::EMPTY`.
pub struct StringInterner {
    map: FxHashMap<String, Name>,
    strings: Vec<String>,
}

impl StringInterner {
    pub fn new() -> Self {
        let mut interner = Self {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(256),
        };
        let empty = interner.intern("");
        debug_assert_eq!(empty, Name::EMPTY);
        interner
    }

    /// Intern `s`, returning its handle. Interning the same string twice
    /// returns the same `Name`.
    pub fn intern(&mut self, s: &str) -> Name {
        if let Some(&name) = self.map.get(s) {
            return name;
        }
        let name = Name::from_raw(self.strings.len() as u32);
        self.strings.push(s.to_owned());
        self.map.insert(s.to_owned(), name);
        name
    }

    /// Resolve a `Name` back to its string contents.
    ///
    /// Panics on an out-of-range `Name`; every `Name` in a typed AST is
    /// expected to have been produced by this same interner.
    pub fn lookup(&self, name: Name) -> &str {
        &self.strings[name.raw() as usize]
    }

    pub fn is_empty_name(&self, name: Name) -> bool {
        name == Name::EMPTY
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut interner = StringInterner::new();
        let a = interner.intern("foo");
        let b = interner.intern("foo");
        assert_eq!(a, b);
        assert_eq!(interner.lookup(a), "foo");
    }

    #[test]
    fn empty_string_is_pre_interned() {
        let interner = StringInterner::new();
        assert_eq!(interner.lookup(Name::EMPTY), "");
    }

    #[test]
    fn distinct_strings_get_distinct_names() {
        let mut interner = StringInterner::new();
        let a = interner.intern("Foo");
        let b = interner.intern("Bar");
        assert_ne!(a, b);
    }
}
