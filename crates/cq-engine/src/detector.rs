//! Resize detection
//!
//! One [`ResizeDetector`] per observed container node, created lazily and
//! torn down when its last listener leaves. The actual width-observation
//! mechanism sits behind the [`WidthProbe`] trait so hosts and tests can
//! substitute their own.

use std::fmt;

use cq_dom::{Document, NodeId};

use crate::engine::ContainerQueryId;
use crate::ListenerError;

/// Detection-mechanism contract
///
/// Implementations register interest in a node's width, report the
/// current measurement, and release the mechanism on detach. Change
/// signals themselves arrive through the document's resize-event queue.
pub trait WidthProbe {
    /// Attach to the node; returns the initial measurement when the
    /// mechanism is immediately ready, `None` when readiness is deferred
    fn attach(&mut self, doc: &mut Document, node: NodeId) -> Option<u32>;

    /// Current measured width
    fn measure(&self, doc: &Document, node: NodeId) -> u32;

    /// Release the mechanism
    fn detach(&mut self, doc: &mut Document, node: NodeId);
}

/// Default probe over the document's watch/width surface
#[derive(Debug, Default)]
pub struct DocumentProbe;

impl WidthProbe for DocumentProbe {
    fn attach(&mut self, doc: &mut Document, node: NodeId) -> Option<u32> {
        doc.watch_resize(node);
        Some(doc.content_width(node))
    }

    fn measure(&self, doc: &Document, node: NodeId) -> u32 {
        doc.content_width(node)
    }

    fn detach(&mut self, doc: &mut Document, node: NodeId) {
        doc.unwatch_resize(node);
    }
}

/// Listener registration token, returned by `add_listener` and consumed
/// by `remove_listener`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// External width-change callback
pub type WidthCallback = Box<dyn FnMut(u32) -> Result<(), ListenerError>>;

pub(crate) enum ListenerKind {
    Callback(WidthCallback),
    Container(ContainerQueryId),
}

pub(crate) struct ListenerEntry {
    pub id: ListenerId,
    pub kind: ListenerKind,
}

/// Per-container width-change fan-out point
///
/// Shared by every container query observing the same node. The engine
/// owns one per node in its detector table.
pub struct ResizeDetector {
    target: Option<NodeId>,
    width: u32,
    ready: bool,
    active: bool,
    next_listener: u64,
    pub(crate) listeners: Vec<ListenerEntry>,
    probe: Box<dyn WidthProbe>,
}

impl ResizeDetector {
    pub(crate) fn new(target: Option<NodeId>, probe: Box<dyn WidthProbe>) -> Self {
        Self {
            target,
            width: 0,
            ready: false,
            active: false,
            next_listener: 1,
            listeners: Vec::new(),
            probe,
        }
    }

    /// Node being observed; `None` for an inert detector
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    /// Cached width, 0 until the mechanism reports a measurement
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Whether the detection mechanism is attached
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the mechanism has delivered its initial measurement
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Append a listener
    ///
    /// Lazily attaches the probe on first use; an inert detector never
    /// activates. Returns the registration token plus the current width
    /// when the mechanism is already ready, in which case the caller must
    /// invoke the new listener immediately so late subscribers are not
    /// silently behind.
    pub(crate) fn add_listener(
        &mut self,
        doc: &mut Document,
        kind: ListenerKind,
    ) -> (ListenerId, Option<u32>) {
        if !self.active {
            if let Some(node) = self.target {
                self.active = true;
                if let Some(initial) = self.probe.attach(doc, node) {
                    self.width = initial;
                    self.ready = true;
                }
                tracing::debug!("resize detector activated for {:?}", node);
            }
        }

        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push(ListenerEntry { id, kind });

        (id, self.ready.then_some(self.width))
    }

    /// Remove a listener; returns whether the set is now empty
    pub(crate) fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.retain(|entry| entry.id != id);
        self.listeners.is_empty()
    }

    /// Re-measure through the probe, without fan-out
    pub(crate) fn measure(&self, doc: &Document) -> u32 {
        match self.target {
            Some(node) => self.probe.measure(doc, node),
            None => 0,
        }
    }

    /// Record a width delivered by the mechanism
    pub(crate) fn record(&mut self, width: u32) {
        self.width = width;
        self.ready = true;
    }

    /// Detach the probe and clear all state
    pub(crate) fn destroy(&mut self, doc: &mut Document) {
        if self.active {
            if let Some(node) = self.target {
                self.probe.detach(doc, node);
                tracing::debug!("resize detector for {:?} torn down", node);
            }
        }
        self.active = false;
        self.ready = false;
        self.listeners.clear();
        self.target = None;
    }
}

impl fmt::Debug for ResizeDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResizeDetector")
            .field("target", &self.target)
            .field("width", &self.width)
            .field("ready", &self.ready)
            .field("active", &self.active)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
