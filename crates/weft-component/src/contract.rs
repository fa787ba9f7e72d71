//! Contract compatibility.
//!
//! Contracts are opaque strings. A provided contract satisfies a
//! required one when they are equal or when the provided contract has
//! been declared, directly or transitively, to subsume the required one.
//!
//! ```
//! use weft_component::ContractRegistry;
//!
//! let mut reg = ContractRegistry::new();
//! reg.declare("kv.redis", "kv.store");
//! reg.declare("kv.store", "kv.read");
//!
//! assert!(reg.is_compatible("kv.redis", "kv.read"));
//! assert!(!reg.is_compatible("kv.read", "kv.redis"));
//! ```

use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Declared subsumption edges between contracts.
#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    generals: BTreeMap<String, BTreeSet<String>>,
}

impl ContractRegistry {
    /// Creates a registry with no declarations (exact match only).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares that `specific` can stand in wherever `general` is required.
    ///
    /// Returns `false` and ignores the declaration if it is a self-edge
    /// or would make the subsumption relation cyclic.
    pub fn declare(&mut self, specific: impl Into<String>, general: impl Into<String>) -> bool {
        let specific = specific.into();
        let general = general.into();

        if specific == general || self.subsumes(&general, &specific) {
            tracing::warn!(
                specific = %specific,
                general = %general,
                "ignoring cyclic contract subsumption"
            );
            return false;
        }

        tracing::debug!(specific = %specific, general = %general, "contract subsumption declared");
        self.generals.entry(specific).or_default().insert(general)
    }

    /// Returns `true` if `provided` satisfies `required`.
    #[must_use]
    pub fn is_compatible(&self, provided: &str, required: &str) -> bool {
        provided == required || self.subsumes(provided, required)
    }

    /// Every contract `contract` transitively subsumes, sorted.
    #[must_use]
    pub fn generalizations(&self, contract: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([contract]);
        while let Some(current) = queue.pop_front() {
            if let Some(next) = self.generals.get(current) {
                for g in next {
                    if seen.insert(g.clone()) {
                        queue.push_back(g);
                    }
                }
            }
        }
        seen.into_iter().collect()
    }

    /// Number of declared edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.generals.values().map(BTreeSet::len).sum()
    }

    /// Returns `true` if nothing has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generals.is_empty()
    }

    fn subsumes(&self, specific: &str, general: &str) -> bool {
        self.generalizations(specific).iter().any(|g| g == general)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_without_declarations() {
        let reg = ContractRegistry::new();
        assert!(reg.is_compatible("X", "X"));
        assert!(!reg.is_compatible("X", "Y"));
        assert!(reg.is_empty());
    }

    #[test]
    fn transitive_subsumption() {
        let mut reg = ContractRegistry::new();
        assert!(reg.declare("a", "b"));
        assert!(reg.declare("b", "c"));
        assert!(reg.is_compatible("a", "c"));
        assert!(!reg.is_compatible("c", "a"));
        assert_eq!(reg.generalizations("a"), vec!["b", "c"]);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn cyclic_declaration_ignored() {
        let mut reg = ContractRegistry::new();
        reg.declare("a", "b");
        reg.declare("b", "c");
        assert!(!reg.declare("c", "a"));
        assert!(!reg.declare("a", "a"));
        assert!(!reg.is_compatible("c", "a"));
    }

    #[test]
    fn duplicate_declaration_returns_false() {
        let mut reg = ContractRegistry::new();
        assert!(reg.declare("a", "b"));
        assert!(!reg.declare("a", "b"));
        assert_eq!(reg.len(), 1);
    }
}
