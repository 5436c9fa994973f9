//! Width metrics and resize events
//!
//! The host layout reports measured content widths; watched nodes enqueue
//! one [`ResizeEvent`] per real change, drained by the engine.

use crate::{Document, NodeId};

/// A detected width change on a watched node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeEvent {
    pub node: NodeId,
    pub width: u32,
}

impl Document {
    /// Last measured content width of a node, 0 when unknown
    pub fn content_width(&self, id: NodeId) -> u32 {
        self.get(id).map(|n| n.content_width).unwrap_or(0)
    }

    /// Record a measured content width
    ///
    /// Enqueues a [`ResizeEvent`] only when the node is watched and the
    /// width actually changed; repeated identical measurements are silent.
    pub fn set_content_width(&mut self, id: NodeId, width: u32) {
        let Some(node) = self.get_mut(id) else { return };
        if node.content_width == width {
            return;
        }
        node.content_width = width;
        if self.watched.contains(&id) {
            tracing::trace!("width of {:?} changed to {}", id, width);
            self.pending_resizes.push(ResizeEvent { node: id, width });
        }
    }

    /// Start watching a node for width changes
    pub fn watch_resize(&mut self, id: NodeId) {
        if self.contains(id) {
            self.watched.insert(id);
        }
    }

    /// Stop watching a node; queued events for it are kept
    pub fn unwatch_resize(&mut self, id: NodeId) {
        self.watched.remove(&id);
    }

    /// Whether a node is currently watched
    pub fn is_watched(&self, id: NodeId) -> bool {
        self.watched.contains(&id)
    }

    /// Drain all pending resize events in detection order
    pub fn take_resize_events(&mut self) -> Vec<ResizeEvent> {
        std::mem::take(&mut self.pending_resizes)
    }

    pub fn has_pending_resizes(&self) -> bool {
        !self.pending_resizes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwatched_nodes_are_silent() {
        let mut doc = Document::new();
        let el = doc.create_element("div");
        doc.set_content_width(el, 300);
        assert_eq!(doc.content_width(el), 300);
        assert!(!doc.has_pending_resizes());
    }

    #[test]
    fn test_one_event_per_real_change() {
        let mut doc = Document::new();
        let el = doc.create_element("div");
        doc.watch_resize(el);

        doc.set_content_width(el, 300);
        doc.set_content_width(el, 300);
        doc.set_content_width(el, 301);

        let events = doc.take_resize_events();
        assert_eq!(
            events,
            vec![
                ResizeEvent { node: el, width: 300 },
                ResizeEvent { node: el, width: 301 },
            ]
        );
        assert!(!doc.has_pending_resizes());
    }

    #[test]
    fn test_unwatch_stops_events() {
        let mut doc = Document::new();
        let el = doc.create_element("div");
        doc.watch_resize(el);
        doc.set_content_width(el, 100);
        doc.unwatch_resize(el);
        doc.set_content_width(el, 200);

        let events = doc.take_resize_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].width, 100);
    }

    #[test]
    fn test_removed_nodes_drop_queued_events() {
        let mut doc = Document::new();
        let el = doc.create_element("div");
        doc.append_child(doc.root(), el).unwrap();
        doc.watch_resize(el);
        doc.set_content_width(el, 100);

        doc.remove_subtree(el).unwrap();
        assert!(!doc.has_pending_resizes());
        assert_eq!(doc.content_width(el), 0);
    }
}
