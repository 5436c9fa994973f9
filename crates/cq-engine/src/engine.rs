//! Engine: detector and container tables plus the resize pipeline
//!
//! Owns every detector and container query, and drives the synchronous
//! pipeline: drained resize events fan out through the matching detector
//! to container recomputations in listener-registration order.

use std::collections::HashMap;

use cq_dom::{Document, DomError, NodeId};

use crate::component::Components;
use crate::container::{queries_from_node, ContainerQuery, QUERIES_ATTRIBUTE};
use crate::detector::{ListenerEntry, ListenerId, ListenerKind, ResizeDetector, WidthCallback};
use crate::query::{Query, QuerySpec};
use crate::{DispatchError, Options, PumpError, SubscribeError, UpdateError};

/// Component type tag under which container queries are registered
pub const CONTAINER_QUERY_COMPONENT: &str = "ContainerQuery";

/// Handle to a container query owned by an [`Engine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerQueryId(u64);

/// Container-query engine
///
/// Single-threaded and synchronous: all state is reached through `&mut`
/// methods, and every dispatch runs to completion before returning.
#[derive(Debug, Default)]
pub struct Engine {
    detectors: HashMap<NodeId, ResizeDetector>,
    containers: HashMap<ContainerQueryId, ContainerQuery>,
    components: Components,
    next_container: u64,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The container query registered for a node, if any
    pub fn container_for(&self, node: NodeId) -> Option<ContainerQueryId> {
        self.components
            .get::<ContainerQueryId>(node, CONTAINER_QUERY_COMPONENT)
            .copied()
    }

    pub fn container(&self, id: ContainerQueryId) -> Option<&ContainerQuery> {
        self.containers.get(&id)
    }

    /// The shared detector for a node, if one currently exists
    pub fn detector(&self, node: NodeId) -> Option<&ResizeDetector> {
        self.detectors.get(&node)
    }

    /// Generic per-node component service
    pub fn components(&mut self) -> &mut Components {
        &mut self.components
    }

    /// Create a container query for one node
    ///
    /// Idempotent: a node that already has one returns the existing
    /// handle. Explicit specs are merged with specs parsed from the
    /// node's queries annotation, the shared detector for the node's
    /// parent is resolved (created if absent), and one immediate
    /// synchronous update runs before returning.
    pub fn create(
        &mut self,
        doc: &mut Document,
        node: NodeId,
        specs: &[QuerySpec],
        options: &Options,
    ) -> Result<ContainerQueryId, UpdateError> {
        if let Some(existing) = self.container_for(node) {
            return Ok(existing);
        }
        if !doc.contains(node) {
            return Err(UpdateError::Dom(DomError::UnknownNode(node)));
        }
        if !doc.is_element(node) {
            return Err(UpdateError::Dom(DomError::NotAnElement(node)));
        }

        let mut merged: Vec<QuerySpec> = specs.to_vec();
        merged.extend(queries_from_node(doc, node));
        let queries: Vec<Query> = merged.iter().map(Query::from_spec).collect();

        let id = ContainerQueryId(self.next_container);
        self.next_container += 1;

        // The container's size is what is being queried, so the detector
        // observes the parent, not the node itself.
        let parent = doc.parent(node);
        let (detector_node, listener, immediate) = match parent {
            Some(container) => {
                let detector = self.detectors.entry(container).or_insert_with(|| {
                    ResizeDetector::new(Some(container), options.make_probe())
                });
                let (listener, immediate) =
                    detector.add_listener(doc, ListenerKind::Container(id));
                (Some(container), Some(listener), immediate)
            }
            None => (None, None, None),
        };

        self.containers
            .insert(id, ContainerQuery::new(node, queries, detector_node, listener));
        self.components.set(node, CONTAINER_QUERY_COMPONENT, id);
        tracing::debug!("container query {:?} created for {:?}", id, node);

        let width = match (immediate, detector_node) {
            (Some(width), _) => width,
            (None, Some(container)) => self
                .detectors
                .get(&container)
                .map(|d| d.width())
                .unwrap_or(0),
            (None, None) => 0,
        };
        self.update(doc, id, Some(width))?;
        Ok(id)
    }

    /// Recompute one container query
    ///
    /// `width` defaults to the shared detector's cached width (0 for an
    /// inert detector). A stale handle is an inert no-op.
    pub fn update(
        &mut self,
        doc: &mut Document,
        id: ContainerQueryId,
        width: Option<u32>,
    ) -> Result<(), UpdateError> {
        let width = match width {
            Some(width) => width,
            None => {
                let Some(container) = self.containers.get(&id) else {
                    return Ok(());
                };
                container
                    .detector_node()
                    .and_then(|node| self.detectors.get(&node))
                    .map(|detector| detector.width())
                    .unwrap_or(0)
            }
        };
        match self.containers.get_mut(&id) {
            Some(container) => container.update_with(doc, width),
            None => Ok(()),
        }
    }

    /// Append one query and immediately recompute
    pub fn add_query(
        &mut self,
        doc: &mut Document,
        id: ContainerQueryId,
        spec: &QuerySpec,
    ) -> Result<String, UpdateError> {
        let identifiers = self.add_queries(doc, id, std::slice::from_ref(spec))?;
        // add_queries returns exactly one identifier per spec.
        identifiers
            .into_iter()
            .next()
            .ok_or(UpdateError::Destroyed(id))
    }

    /// Append queries and recompute once
    ///
    /// Returns the identifiers of the new queries. Unlike `update`, a
    /// stale handle is an error: a destroyed container cannot grow.
    pub fn add_queries(
        &mut self,
        doc: &mut Document,
        id: ContainerQueryId,
        specs: &[QuerySpec],
    ) -> Result<Vec<String>, UpdateError> {
        let container = self
            .containers
            .get_mut(&id)
            .ok_or(UpdateError::Destroyed(id))?;

        let mut identifiers = Vec::with_capacity(specs.len());
        for spec in specs {
            let query = Query::from_spec(spec);
            identifiers.push(query.identifier().to_string());
            container.push_query(query);
        }

        self.update(doc, id, None)?;
        Ok(identifiers)
    }

    /// Mutable access to one owned query, matched by identifier
    ///
    /// The handle supports registering change listeners and forced
    /// single-query evaluation.
    pub fn query_mut(
        &mut self,
        id: ContainerQueryId,
        identifier: &str,
    ) -> Option<&mut Query> {
        self.containers.get_mut(&id)?.query_mut(identifier)
    }

    /// Destroy a container query
    ///
    /// Deregisters from the shared detector, tearing the detector down
    /// when this was its last listener. Destroying a stale handle is a
    /// no-op.
    pub fn destroy(&mut self, doc: &mut Document, id: ContainerQueryId) {
        let Some(container) = self.containers.remove(&id) else {
            return;
        };
        self.components
            .remove(container.node(), CONTAINER_QUERY_COMPONENT);
        if let (Some(node), Some(listener)) =
            (container.detector_node(), container.listener_id())
        {
            self.remove_detector_listener(doc, node, listener, false);
        }
        tracing::debug!("container query {:?} destroyed", id);
    }

    /// Subscribe an external callback to a node's width changes
    ///
    /// Creates the detector if absent. When the detection mechanism is
    /// already ready the callback is invoked immediately with the current
    /// width; a failure there is returned with the registration intact.
    pub fn add_resize_listener(
        &mut self,
        doc: &mut Document,
        node: NodeId,
        callback: WidthCallback,
        options: &Options,
    ) -> Result<ListenerId, SubscribeError> {
        let detector = self
            .detectors
            .entry(node)
            .or_insert_with(|| ResizeDetector::new(Some(node), options.make_probe()));
        let (id, immediate) = detector.add_listener(doc, ListenerKind::Callback(callback));

        if let Some(width) = immediate {
            let entry = detector.listeners.iter_mut().find(|entry| entry.id == id);
            if let Some(ListenerEntry {
                kind: ListenerKind::Callback(callback),
                ..
            }) = entry
            {
                if let Err(source) = callback(width) {
                    return Err(SubscribeError { id, source });
                }
            }
        }
        Ok(id)
    }

    /// Remove a detector listener
    ///
    /// Unless `preserve` is set, the detector is torn down once its
    /// listener set becomes empty.
    pub fn remove_resize_listener(
        &mut self,
        doc: &mut Document,
        node: NodeId,
        id: ListenerId,
        preserve: bool,
    ) {
        self.remove_detector_listener(doc, node, id, preserve);
    }

    fn remove_detector_listener(
        &mut self,
        doc: &mut Document,
        node: NodeId,
        id: ListenerId,
        preserve: bool,
    ) {
        let empty = {
            let Some(detector) = self.detectors.get_mut(&node) else {
                return;
            };
            detector.remove_listener(id)
        };
        if empty && !preserve {
            if let Some(mut detector) = self.detectors.remove(&node) {
                detector.destroy(doc);
            }
        }
    }

    /// Drain pending resize events and dispatch each to its detector
    ///
    /// One full, independent recomputation per event; bursts are not
    /// coalesced. All listeners run even when some fail; failures are
    /// aggregated into the returned error. Events enqueued during the
    /// pass are left for the next pump.
    pub fn pump(&mut self, doc: &mut Document) -> Result<(), PumpError> {
        let mut failures = Vec::new();
        for event in doc.take_resize_events() {
            tracing::trace!("dispatching resize of {:?} to {}", event.node, event.width);
            failures.extend(self.dispatch(doc, event.node, event.width));
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(PumpError(failures))
        }
    }

    /// Force one recomputation pass for a node's detector
    ///
    /// Re-measures through the probe and fans out as if the mechanism had
    /// signalled. A node without a detector is a no-op.
    pub fn force_update(&mut self, doc: &mut Document, node: NodeId) -> Result<(), PumpError> {
        let Some(detector) = self.detectors.get(&node) else {
            return Ok(());
        };
        let width = detector.measure(doc);
        let failures = self.dispatch(doc, node, width);
        if failures.is_empty() {
            Ok(())
        } else {
            Err(PumpError(failures))
        }
    }

    /// Fan a width out to every listener of a node's detector, in
    /// registration order
    ///
    /// Listeners are re-resolved per step so removal or teardown from
    /// within a listener is tolerated; listeners added mid-pass run from
    /// the next dispatch.
    fn dispatch(&mut self, doc: &mut Document, node: NodeId, width: u32) -> Vec<DispatchError> {
        enum Step {
            Ran,
            Container(ContainerQueryId),
        }

        let ids: Vec<ListenerId> = {
            let Some(detector) = self.detectors.get_mut(&node) else {
                return Vec::new();
            };
            detector.record(width);
            detector.listeners.iter().map(|entry| entry.id).collect()
        };

        let mut failures = Vec::new();
        for listener in ids {
            let step = {
                let Some(detector) = self.detectors.get_mut(&node) else {
                    // Torn down mid-pass.
                    break;
                };
                let Some(entry) = detector
                    .listeners
                    .iter_mut()
                    .find(|entry| entry.id == listener)
                else {
                    // Removed mid-pass.
                    continue;
                };
                match &mut entry.kind {
                    ListenerKind::Callback(callback) => {
                        if let Err(source) = callback(width) {
                            failures.push(DispatchError::Callback(source));
                        }
                        Step::Ran
                    }
                    ListenerKind::Container(id) => Step::Container(*id),
                }
            };
            if let Step::Container(id) = step {
                if let Err(error) = self.update(doc, id, Some(width)) {
                    failures.push(DispatchError::Update(error));
                }
            }
        }
        failures
    }

    /// Create container queries for every annotated element in a subtree
    ///
    /// "Annotated" means carrying the queries attribute; creation is
    /// idempotent per node.
    pub fn create_all_within(
        &mut self,
        doc: &mut Document,
        root: NodeId,
        specs: &[QuerySpec],
        options: &Options,
    ) -> Result<Vec<ContainerQueryId>, UpdateError> {
        let annotated = doc.query_selector_all(root, &format!("[{QUERIES_ATTRIBUTE}]"));
        annotated
            .into_iter()
            .map(|node| self.create(doc, node, specs, options))
            .collect()
    }

    /// Container queries registered on descendants of `root`
    pub fn all_within(&self, doc: &Document, root: NodeId) -> Vec<ContainerQueryId> {
        self.components
            .all_within::<ContainerQueryId>(doc, root, CONTAINER_QUERY_COMPONENT)
    }

    /// Destroy every container query in a subtree
    pub fn destroy_all_within(&mut self, doc: &mut Document, root: NodeId) {
        for id in self.all_within(doc, root) {
            self.destroy(doc, id);
        }
    }

    /// Remove a subtree from the document along with every component,
    /// detector, and store entry of its nodes
    pub fn remove_node(&mut self, doc: &mut Document, node: NodeId) -> Result<(), DomError> {
        let mut targets = vec![node];
        targets.extend(doc.descendants(node));
        for &target in &targets {
            if let Some(id) = self.container_for(target) {
                self.destroy(doc, id);
            }
        }

        let removed = doc.remove_subtree(node)?;
        for gone in removed {
            self.components.remove_all_for_node(gone);
            if let Some(mut detector) = self.detectors.remove(&gone) {
                detector.destroy(doc);
            }
        }
        Ok(())
    }
}
