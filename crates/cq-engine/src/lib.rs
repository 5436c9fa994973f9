//! cq-engine - Container queries
//!
//! Width-range predicates attached to nodes of a cq-dom tree. Each target
//! node owns a set of named queries evaluated against the width of its
//! container (parent); a shared per-container resize detector drives
//! recomputation, and the set of currently matching identifiers is written
//! back to the node as a derived attribute.

mod component;
mod container;
mod detector;
mod engine;
mod multi;
mod query;
mod range;

pub use component::Components;
pub use container::{ContainerQuery, MATCHES_ATTRIBUTE, QUERIES_ATTRIBUTE};
pub use detector::{DocumentProbe, ListenerId, ResizeDetector, WidthCallback, WidthProbe};
pub use engine::{CONTAINER_QUERY_COMPONENT, ContainerQueryId, Engine};
pub use multi::MultipleNodeContainerQuery;
pub use query::{Predicate, Query, QuerySpec};
pub use range::{EffectiveRange, Inclusive, Inclusivity, RangeSpec, parse_range};

use std::fmt;
use std::rc::Rc;

use cq_dom::{Document, DomError, NodeId};

/// Error produced by a change listener
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// One failed listener in a notification pass
#[derive(Debug, thiserror::Error)]
#[error("change listener {index} failed: {source}")]
pub struct ListenerFailure {
    /// Registration index of the listener within its owner
    pub index: usize,
    #[source]
    pub source: ListenerError,
}

/// Aggregate of listener failures from one query transition
///
/// The query's match state is updated before listeners run, so it is
/// valid even when this error is returned.
#[derive(Debug, thiserror::Error)]
#[error("{} change listener(s) failed for query `{identifier}`", .failures.len())]
pub struct NotifyError {
    pub identifier: String,
    /// Match state the query transitioned to
    pub matches: bool,
    pub failures: Vec<ListenerFailure>,
}

/// Failure of one container-query recomputation
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// Some query listeners failed; the matching-state annotation was
    /// still written
    #[error("{} of {total} queries reported listener failures", .notify.len())]
    Notify { total: usize, notify: Vec<NotifyError> },
    /// The derived annotation could not be written
    #[error("failed to write matching-state annotation")]
    Dom(#[from] DomError),
    /// The container query was already destroyed
    #[error("container query {0:?} no longer exists")]
    Destroyed(ContainerQueryId),
}

/// Failure of the immediate invocation of a freshly added resize
/// listener
///
/// The listener remains registered; `id` is its token.
#[derive(Debug, thiserror::Error)]
#[error("immediate resize callback failed")]
pub struct SubscribeError {
    pub id: ListenerId,
    #[source]
    pub source: ListenerError,
}

/// Failure of one detector listener during resize dispatch
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("resize callback failed")]
    Callback(#[source] ListenerError),
    #[error(transparent)]
    Update(#[from] UpdateError),
}

/// Aggregate of dispatch failures from one pump pass
///
/// Every listener in the pass has run by the time this is returned.
#[derive(Debug, thiserror::Error)]
#[error("{} resize listener failure(s)", .0.len())]
pub struct PumpError(pub Vec<DispatchError>);

/// Factory for detection-mechanism instances, one per detector
pub type ProbeFactory = Rc<dyn Fn() -> Box<dyn WidthProbe>>;

/// Construction options
#[derive(Clone, Default)]
pub struct Options {
    /// Overrides how the width-detection mechanism is obtained for a
    /// container, primarily for substituting a test double
    pub probe_factory: Option<ProbeFactory>,
}

impl Options {
    pub(crate) fn make_probe(&self) -> Box<dyn WidthProbe> {
        match &self.probe_factory {
            Some(factory) => factory(),
            None => Box::new(DocumentProbe),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("probe_factory", &self.probe_factory.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Construction target: one node, many nodes, or a selector
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Node(NodeId),
    Nodes(&'a [NodeId]),
    Selector(&'a str),
}

/// Result of [`container_query`]
#[derive(Debug)]
pub enum Attachment {
    Single(ContainerQueryId),
    Many(MultipleNodeContainerQuery),
}

/// Attach container queries to the target
///
/// A selector or node collection yields a fan-out wrapper over one
/// container query per node; a single node yields a single container
/// query.
pub fn container_query(
    engine: &mut Engine,
    doc: &mut Document,
    target: Target<'_>,
    specs: &[QuerySpec],
    options: &Options,
) -> Result<Attachment, UpdateError> {
    match target {
        Target::Node(node) => Ok(Attachment::Single(engine.create(doc, node, specs, options)?)),
        Target::Nodes(nodes) => Ok(Attachment::Many(MultipleNodeContainerQuery::new(
            engine, doc, nodes, specs, options,
        )?)),
        Target::Selector(selector) => {
            let nodes = doc.query_selector_all(doc.root(), selector);
            Ok(Attachment::Many(MultipleNodeContainerQuery::new(
                engine, doc, &nodes, specs, options,
            )?))
        }
    }
}
