//! Append-only placeholder mapping
//!
//! Once an original value is assigned a placeholder the pair never changes.
//! Sequence numbers are global to the map, so placeholders stay unique
//! across categories.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bidirectional mapping between sensitive values and placeholder tokens
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionMap {
    /// placeholder -> original
    reverse: BTreeMap<String, String>,
    /// original -> placeholder
    forward: BTreeMap<String, String>,
    next_sequence: usize,
}

impl RedactionMap {
    /// Create an empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Placeholder for `original`, allocating `[<CATEGORY>_<NNN>]` on first sight.
    /// The sequence is padded to three digits and widens past 999.
    pub fn get_or_insert(&mut self, category: &str, original: &str) -> String {
        if let Some(existing) = self.forward.get(original) {
            return existing.clone();
        }
        let placeholder = format!("[{}_{:03}]", category.to_uppercase(), self.next_sequence);
        self.next_sequence += 1;
        self.forward.insert(original.to_string(), placeholder.clone());
        self.reverse.insert(placeholder.clone(), original.to_string());
        placeholder
    }

    /// Placeholder already assigned to `original`
    #[must_use]
    pub fn placeholder_for(&self, original: &str) -> Option<&str> {
        self.forward.get(original).map(String::as_str)
    }

    /// Original value behind `placeholder`
    #[must_use]
    pub fn original_for(&self, placeholder: &str) -> Option<&str> {
        self.reverse.get(placeholder).map(String::as_str)
    }

    /// Iterate `(placeholder, original)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.reverse.iter().map(|(p, o)| (p.as_str(), o.as_str()))
    }

    /// Number of mapped values
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    /// Whether nothing has been mapped
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }

    /// Whether every pair in `earlier` is still present unchanged
    #[must_use]
    pub fn extends(&self, earlier: &RedactionMap) -> bool {
        earlier
            .iter()
            .all(|(placeholder, original)| self.original_for(placeholder) == Some(original))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_value_reuses_placeholder() {
        let mut map = RedactionMap::new();
        let a = map.get_or_insert("name", "Jane Roe");
        let b = map.get_or_insert("name", "Jane Roe");
        assert_eq!(a, "[NAME_000]");
        assert_eq!(a, b);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn sequence_is_global_across_categories() {
        let mut map = RedactionMap::new();
        map.get_or_insert("name", "Jane Roe");
        let ssn = map.get_or_insert("ssn", "123-45-6789");
        assert_eq!(ssn, "[SSN_001]");
        assert_eq!(map.original_for("[SSN_001]"), Some("123-45-6789"));
        assert_eq!(map.placeholder_for("Jane Roe"), Some("[NAME_000]"));
    }

    #[test]
    fn growth_preserves_existing_pairs() {
        let mut map = RedactionMap::new();
        map.get_or_insert("email", "jane@example.com");
        let snapshot = map.clone();
        map.get_or_insert("phone", "555-123-4567");
        assert!(map.extends(&snapshot));
        assert!(!snapshot.extends(&map));
    }
}
