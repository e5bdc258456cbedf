//! In-memory slot map in front of the store.
//!
//! Keys are effective keys. Listing operations scan this map only, which is
//! why every stored key is seeded as a placeholder when the store is opened.

use indexmap::IndexMap;
use std::collections::BTreeSet;

use crate::entry::Slot;
use crate::key::{child_segment, is_path_or_child, is_strict_child, ChildSegment};

#[derive(Debug, Clone, Default)]
pub(crate) struct SlotCache {
    slots: IndexMap<String, Slot>,
}

impl SlotCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record keys known to exist in the store without loading their values.
    pub(crate) fn seed<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = String>,
    {
        for key in keys {
            self.slots.entry(key).or_insert(Slot::Unloaded);
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Slot> {
        self.slots.get(key)
    }

    pub(crate) fn insert(&mut self, key: String, slot: Slot) {
        self.slots.insert(key, slot);
    }

    /// Drop `key` and every slot below it. Returns how many were dropped.
    pub(crate) fn remove_tree(&mut self, key: &str) -> usize {
        let before = self.slots.len();
        self.slots.retain(|k, _| !is_path_or_child(k, key));
        before - self.slots.len()
    }

    /// Whether a listed slot lies strictly below `key`.
    pub(crate) fn has_listed_children(&self, key: &str) -> bool {
        self.listed()
            .any(|k| is_strict_child(k, key))
    }

    /// Leaf keys directly inside `group`, sorted.
    pub(crate) fn child_keys(&self, group: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .listed()
            .filter_map(|k| match child_segment(k, group) {
                Some(ChildSegment::Key(name)) => Some(name.to_string()),
                _ => None,
            })
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Groups directly inside `group`, sorted and each reported once.
    pub(crate) fn child_groups(&self, group: &str) -> Vec<String> {
        let groups: BTreeSet<&str> = self
            .listed()
            .filter_map(|k| match child_segment(k, group) {
                Some(ChildSegment::Group(name)) => Some(name),
                _ => None,
            })
            .collect();
        groups.into_iter().map(str::to_string).collect()
    }

    /// Every listed key below `group`, relative to it, sorted.
    pub(crate) fn all_keys(&self, group: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .listed()
            .filter_map(|k| {
                if group.is_empty() {
                    Some(k.to_string())
                } else if is_strict_child(k, group) {
                    Some(k[group.len() + 1..].to_string())
                } else {
                    None
                }
            })
            .collect();
        keys.sort_unstable();
        keys
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    fn listed(&self) -> impl Iterator<Item = &String> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.is_listed())
            .map(|(k, _)| k)
    }
}
