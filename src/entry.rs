//! Cache slot state for a single effective key.

use crate::value::Value;

/// What the cache knows about one key.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// The key exists in the store but its value has not been fetched yet.
    Unloaded,

    /// The value is held in memory; reads do not touch the store.
    Materialized(Value),

    /// The store was asked and had no row. Only recorded when miss caching
    /// is enabled.
    KnownAbsent,
}

impl Slot {
    /// The in-memory value, if one has been loaded or written.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Slot::Materialized(value) => Some(value),
            _ => None,
        }
    }

    /// Whether the key should be reported by key listings.
    pub fn is_listed(&self) -> bool {
        !matches!(self, Slot::KnownAbsent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unloaded_slot() {
        let slot = Slot::Unloaded;
        assert!(slot.value().is_none());
        assert!(slot.is_listed());
    }

    #[test]
    fn test_materialized_slot() {
        let slot = Slot::Materialized(Value::from("dark"));
        assert_eq!(slot.value(), Some(&Value::from("dark")));
        assert!(slot.is_listed());
    }

    #[test]
    fn test_known_absent_is_hidden() {
        let slot = Slot::KnownAbsent;
        assert!(slot.value().is_none());
        assert!(!slot.is_listed());
    }
}
