//! Generic per-node component service
//!
//! Composition over the per-node store: idempotent lookup-or-create of
//! "the instance of component type T for this node", plus subtree
//! collection. Component types are distinguished by a `&'static str` type
//! tag.

use std::any::Any;

use cq_dom::{Document, NodeCache, NodeId};

/// Per-node component instances keyed by type tag
#[derive(Debug, Default)]
pub struct Components {
    cache: NodeCache,
}

impl Components {
    pub fn new() -> Self {
        Self::default()
    }

    /// The instance of the tagged component for a node, if any
    pub fn get<T: Any>(&self, node: NodeId, tag: &'static str) -> Option<&T> {
        self.cache.get(node, tag)
    }

    pub fn get_mut<T: Any>(&mut self, node: NodeId, tag: &'static str) -> Option<&mut T> {
        self.cache.get_mut(node, tag)
    }

    pub fn contains(&self, node: NodeId, tag: &'static str) -> bool {
        self.cache.contains(node, tag)
    }

    /// Register an instance, replacing any previous one
    pub fn set<T: Any>(&mut self, node: NodeId, tag: &'static str, value: T) {
        self.cache.set(node, tag, value);
    }

    /// Idempotent lookup-or-create
    ///
    /// Returns `None` only when an existing entry under the tag has a
    /// different type than requested.
    pub fn get_or_create<T: Any>(
        &mut self,
        node: NodeId,
        tag: &'static str,
        factory: impl FnOnce() -> T,
    ) -> Option<&mut T> {
        if !self.cache.contains(node, tag) {
            self.cache.set(node, tag, factory());
        }
        self.cache.get_mut(node, tag)
    }

    /// Drop one instance
    pub fn remove(&mut self, node: NodeId, tag: &'static str) {
        self.cache.remove(node, tag);
    }

    /// Drop every instance for a node, whatever its tag
    pub fn remove_all_for_node(&mut self, node: NodeId) {
        self.cache.remove_all_for_node(node);
    }

    /// Instances of the tagged component registered on descendants of
    /// `root`, in document order
    pub fn all_within<T: Any + Copy>(
        &self,
        doc: &Document,
        root: NodeId,
        tag: &'static str,
    ) -> Vec<T> {
        doc.descendants(root)
            .into_iter()
            .filter_map(|node| self.get::<T>(node, tag).copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut doc = Document::new();
        let node = doc.create_element("div");
        let mut components = Components::new();

        let mut created = 0;
        for _ in 0..3 {
            components.get_or_create(node, "widget", || {
                created += 1;
                42u32
            });
        }
        assert_eq!(created, 1);
        assert_eq!(components.get::<u32>(node, "widget"), Some(&42));
    }

    #[test]
    fn test_type_mismatch_reads_as_none() {
        let mut doc = Document::new();
        let node = doc.create_element("div");
        let mut components = Components::new();

        components.set(node, "widget", 1u32);
        assert!(components.get_or_create(node, "widget", String::new).is_none());
    }

    #[test]
    fn test_all_within_walks_the_subtree() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        let stranger = doc.create_element("div");
        doc.append_child(doc.root(), outer).unwrap();
        doc.append_child(outer, inner).unwrap();
        doc.append_child(doc.root(), stranger).unwrap();

        let mut components = Components::new();
        components.set(inner, "widget", 1u32);
        components.set(stranger, "widget", 2u32);

        assert_eq!(components.all_within::<u32>(&doc, outer, "widget"), vec![1]);
        assert_eq!(
            components.all_within::<u32>(&doc, doc.root(), "widget"),
            vec![1, 2]
        );
    }
}
