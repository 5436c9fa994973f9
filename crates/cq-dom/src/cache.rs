//! Per-node associative store
//!
//! Side table keyed by node id and a `&'static str` type tag. Callers are
//! responsible for purging entries with the ids returned by
//! `Document::remove_subtree`, so entries never outlive their node.

use std::any::Any;
use std::collections::HashMap;

use crate::NodeId;

/// Per-node keyed value store
#[derive(Default)]
pub struct NodeCache {
    entries: HashMap<NodeId, HashMap<&'static str, Box<dyn Any>>>,
}

impl std::fmt::Debug for NodeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeCache")
            .field("nodes", &self.entries.len())
            .finish()
    }
}

impl NodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value for a node under a key, replacing any previous value
    pub fn set<T: Any>(&mut self, node: NodeId, key: &'static str, value: T) {
        self.entries
            .entry(node)
            .or_default()
            .insert(key, Box::new(value));
    }

    /// Get a stored value, if present and of the expected type
    pub fn get<T: Any>(&self, node: NodeId, key: &'static str) -> Option<&T> {
        self.entries.get(&node)?.get(key)?.downcast_ref()
    }

    pub fn get_mut<T: Any>(&mut self, node: NodeId, key: &'static str) -> Option<&mut T> {
        self.entries.get_mut(&node)?.get_mut(key)?.downcast_mut()
    }

    pub fn contains(&self, node: NodeId, key: &'static str) -> bool {
        self.entries
            .get(&node)
            .is_some_and(|keys| keys.contains_key(key))
    }

    /// Remove one entry
    pub fn remove(&mut self, node: NodeId, key: &'static str) -> Option<Box<dyn Any>> {
        let keys = self.entries.get_mut(&node)?;
        let removed = keys.remove(key);
        if keys.is_empty() {
            self.entries.remove(&node);
        }
        removed
    }

    /// Remove every entry for a node
    pub fn remove_all_for_node(&mut self, node: NodeId) {
        self.entries.remove(&node);
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;

    #[test]
    fn test_set_get_typed() {
        let mut doc = Document::new();
        let node = doc.create_element("div");
        let mut cache = NodeCache::new();

        cache.set(node, "counter", 41u32);
        assert_eq!(cache.get::<u32>(node, "counter"), Some(&41));
        // Wrong type reads as absent.
        assert_eq!(cache.get::<String>(node, "counter"), None);

        *cache.get_mut::<u32>(node, "counter").unwrap() += 1;
        assert_eq!(cache.get::<u32>(node, "counter"), Some(&42));
    }

    #[test]
    fn test_remove_all_for_node() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let mut cache = NodeCache::new();

        cache.set(a, "x", 1u8);
        cache.set(a, "y", 2u8);
        cache.set(b, "x", 3u8);

        cache.remove_all_for_node(a);
        assert!(!cache.contains(a, "x"));
        assert!(!cache.contains(a, "y"));
        assert_eq!(cache.get::<u8>(b, "x"), Some(&3));
    }

    #[test]
    fn test_remove_single_key() {
        let mut doc = Document::new();
        let node = doc.create_element("div");
        let mut cache = NodeCache::new();

        cache.set(node, "x", 1u8);
        assert!(cache.remove(node, "x").is_some());
        assert!(cache.remove(node, "x").is_none());
    }
}
