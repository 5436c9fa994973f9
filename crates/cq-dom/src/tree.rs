//! Document tree (arena-based allocation)

use std::collections::HashSet;

use crate::geometry::ResizeEvent;
use crate::node::Node;
use crate::{DomError, NodeId};

/// Arena-based node tree
///
/// Slots of removed nodes are tombstoned rather than reused, keeping ids
/// stable for external side tables.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Option<Node>>,
    pub(crate) watched: HashSet<NodeId>,
    pub(crate) pending_resizes: Vec<ResizeEvent>,
}

impl Document {
    /// Create a new document containing only the root node
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::document())],
            watched: HashSet::new(),
            pending_resizes: Vec::new(),
        }
    }

    /// The document root
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.index())?.as_ref()
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.index())?.as_mut()
    }

    /// Check whether an id refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocate a detached element node
    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.push(Node::element(tag))
    }

    /// Allocate a detached text node
    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.push(Node::text(content))
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        id
    }

    /// Append `child` as the last child of `parent`
    ///
    /// A child that is already attached elsewhere is detached first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if !self.contains(parent) {
            return Err(DomError::UnknownNode(parent));
        }
        if !self.contains(child) {
            return Err(DomError::UnknownNode(child));
        }

        // Walking up from `parent` must never reach `child`.
        let mut ancestor = Some(parent);
        while let Some(a) = ancestor {
            if a == child {
                return Err(DomError::Cycle { parent, child });
            }
            ancestor = self.parent(a);
        }

        self.detach(child);

        let prev_last = self.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);
        {
            let node = self.get_mut(child).ok_or(DomError::UnknownNode(child))?;
            node.parent = parent;
            node.prev_sibling = prev_last;
        }
        if let Some(prev) = self.get_mut(prev_last) {
            prev.next_sibling = child;
        }
        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
        Ok(())
    }

    /// Detach a node from its parent, leaving it allocated
    pub fn detach(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else { return };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);
        if parent.is_none() {
            return;
        }

        if let Some(prev_node) = self.get_mut(prev) {
            prev_node.next_sibling = next;
        }
        if let Some(next_node) = self.get_mut(next) {
            next_node.prev_sibling = prev;
        }
        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child == id {
                parent_node.first_child = next;
            }
            if parent_node.last_child == id {
                parent_node.last_child = prev;
            }
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    /// Parent of a node, if attached
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.get(id)?.parent;
        if parent.is_none() { None } else { Some(parent) }
    }

    /// Children of a node in tree order
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.get(id).map(|n| n.first_child).unwrap_or(NodeId::NONE);
        while let Some(node) = self.get(current) {
            result.push(current);
            current = node.next_sibling;
        }
        result
    }

    /// Descendants of a node in document (preorder) order, excluding the
    /// node itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id);
        stack.reverse();
        while let Some(current) = stack.pop() {
            result.push(current);
            let mut kids = self.children(current);
            kids.reverse();
            stack.extend(kids);
        }
        result
    }

    /// Element tag name
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.as_element().map(|e| e.tag.as_str())
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.is_element())
    }

    /// Attribute value on an element
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)?.as_element()?.attributes.get(name)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// Set an attribute on an element, overwriting any previous value
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        let node = self.get_mut(id).ok_or(DomError::UnknownNode(id))?;
        let element = node.as_element_mut().ok_or(DomError::NotAnElement(id))?;
        element.attributes.set(name, value);
        Ok(())
    }

    /// Remove an attribute from an element
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        let node = self.get_mut(id).ok_or(DomError::UnknownNode(id))?;
        let element = node.as_element_mut().ok_or(DomError::NotAnElement(id))?;
        element.attributes.remove(name);
        Ok(())
    }

    /// Remove a node and its whole subtree
    ///
    /// Returns every removed id so callers can purge side tables keyed by
    /// them. Watch state and queued resize events for removed nodes are
    /// dropped.
    pub fn remove_subtree(&mut self, id: NodeId) -> Result<Vec<NodeId>, DomError> {
        if id == NodeId::ROOT {
            return Err(DomError::RootRemoval);
        }
        if !self.contains(id) {
            return Err(DomError::UnknownNode(id));
        }

        let mut removed = vec![id];
        removed.extend(self.descendants(id));

        self.detach(id);
        for &node in &removed {
            self.nodes[node.index()] = None;
            self.watched.remove(&node);
        }
        let gone: HashSet<NodeId> = removed.iter().copied().collect();
        self.pending_resizes.retain(|ev| !gone.contains(&ev.node));

        tracing::debug!("removed subtree of {} node(s)", removed.len());
        Ok(removed)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_children() {
        let mut doc = Document::new();
        let container = doc.create_element("div");
        let a = doc.create_element("span");
        let b = doc.create_element("span");
        doc.append_child(doc.root(), container).unwrap();
        doc.append_child(container, a).unwrap();
        doc.append_child(container, b).unwrap();

        assert_eq!(doc.children(container), vec![a, b]);
        assert_eq!(doc.parent(a), Some(container));
        assert_eq!(doc.parent(container), Some(doc.root()));
        assert_eq!(doc.parent(doc.root()), None);
    }

    #[test]
    fn test_append_detaches_from_old_parent() {
        let mut doc = Document::new();
        let first = doc.create_element("div");
        let second = doc.create_element("div");
        let child = doc.create_element("span");
        doc.append_child(doc.root(), first).unwrap();
        doc.append_child(doc.root(), second).unwrap();
        doc.append_child(first, child).unwrap();
        doc.append_child(second, child).unwrap();

        assert!(doc.children(first).is_empty());
        assert_eq!(doc.children(second), vec![child]);
    }

    #[test]
    fn test_append_rejects_cycle() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(doc.root(), outer).unwrap();
        doc.append_child(outer, inner).unwrap();

        assert!(matches!(
            doc.append_child(inner, outer),
            Err(DomError::Cycle { .. })
        ));
    }

    #[test]
    fn test_attributes() {
        let mut doc = Document::new();
        let el = doc.create_element("div");
        let text = doc.create_text("hi");

        doc.set_attribute(el, "class", "card").unwrap();
        assert_eq!(doc.attribute(el, "class"), Some("card"));

        doc.set_attribute(el, "class", "card wide").unwrap();
        assert_eq!(doc.attribute(el, "class"), Some("card wide"));

        doc.remove_attribute(el, "class").unwrap();
        assert!(!doc.has_attribute(el, "class"));

        assert!(matches!(
            doc.set_attribute(text, "class", "x"),
            Err(DomError::NotAnElement(_))
        ));
    }

    #[test]
    fn test_remove_subtree_returns_all_ids() {
        let mut doc = Document::new();
        let container = doc.create_element("div");
        let child = doc.create_element("span");
        let grandchild = doc.create_text("hi");
        doc.append_child(doc.root(), container).unwrap();
        doc.append_child(container, child).unwrap();
        doc.append_child(child, grandchild).unwrap();

        let removed = doc.remove_subtree(container).unwrap();
        assert_eq!(removed, vec![container, child, grandchild]);
        assert!(!doc.contains(container));
        assert!(!doc.contains(grandchild));
        assert!(doc.children(doc.root()).is_empty());

        // Ids are never reused.
        assert_eq!(doc.len(), 1);
        let fresh = doc.create_element("div");
        assert!(removed.iter().all(|&id| id != fresh));
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_root_is_not_removable() {
        let mut doc = Document::new();
        assert!(matches!(
            doc.remove_subtree(doc.root()),
            Err(DomError::RootRemoval)
        ));
    }

    #[test]
    fn test_descendants_preorder() {
        let mut doc = Document::new();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        let c = doc.create_element("c");
        let d = doc.create_element("d");
        doc.append_child(doc.root(), a).unwrap();
        doc.append_child(a, b).unwrap();
        doc.append_child(b, c).unwrap();
        doc.append_child(a, d).unwrap();

        assert_eq!(doc.descendants(doc.root()), vec![a, b, c, d]);
        assert_eq!(doc.descendants(a), vec![b, c, d]);
    }
}
