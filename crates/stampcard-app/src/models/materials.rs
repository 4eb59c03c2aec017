//! Study material lists.

use super::nullable;
use serde::{Deserialize, Serialize};

/// `materials/{uid}`: the textbooks, decks and courses a user logs against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialList {
    #[serde(default, deserialize_with = "nullable")]
    pub list: Vec<String>,
}

impl MaterialList {
    /// Add a material. Blank names are ignored and duplicates kept once.
    ///
    /// Returns the trimmed name when the list changed.
    pub fn add(&mut self, name: &str) -> Option<String> {
        let name = name.trim();
        if name.is_empty() || self.contains(name) {
            return None;
        }
        self.list.push(name.to_string());
        Some(name.to_string())
    }

    /// Remove a material. Returns whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.list.len();
        self.list.retain(|m| m != name.trim());
        self.list.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.list.iter().any(|m| m == name.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_trims_and_dedups() {
        let mut list = MaterialList::default();
        assert_eq!(list.add("  Kanji deck "), Some("Kanji deck".to_string()));
        assert_eq!(list.add("Kanji deck"), None);
        assert_eq!(list.add("   "), None);
        assert_eq!(list.add("Grammar"), Some("Grammar".to_string()));
        assert_eq!(list.list, vec!["Kanji deck", "Grammar"]);
    }

    #[test]
    fn remove() {
        let mut list = MaterialList {
            list: vec!["a".into(), "b".into()],
        };
        assert!(list.remove("a"));
        assert!(!list.remove("a"));
        assert_eq!(list.list, vec!["b"]);
    }
}
