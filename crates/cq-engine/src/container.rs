//! Per-node query orchestration
//!
//! A [`ContainerQuery`] binds one target node's queries to the shared
//! resize detector of its container and writes the matching-identifier
//! set back onto the node.

use cq_dom::{Document, NodeId};

use crate::detector::ListenerId;
use crate::query::{Query, QuerySpec};
use crate::range::parse_range;
use crate::UpdateError;

/// Declarative annotation read at construction: comma-separated
/// `name: range` pairs
pub const QUERIES_ATTRIBUTE: &str = "data-container-queries";

/// Derived annotation holding the space-joined matching identifiers
pub const MATCHES_ATTRIBUTE: &str = "data-container-query-matches";

/// Query set of one target node
///
/// Owned by the engine's container table; the detector is shared, not
/// owned.
pub struct ContainerQuery {
    node: NodeId,
    queries: Vec<Query>,
    detector: Option<NodeId>,
    listener: Option<ListenerId>,
}

impl ContainerQuery {
    pub(crate) fn new(
        node: NodeId,
        queries: Vec<Query>,
        detector: Option<NodeId>,
        listener: Option<ListenerId>,
    ) -> Self {
        Self {
            node,
            queries,
            detector,
            listener,
        }
    }

    /// Target node the matching state is written to
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Owned queries in declaration order
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    /// Identifiers of currently matching queries, in declaration order
    pub fn matching(&self) -> Vec<&str> {
        self.queries
            .iter()
            .filter(|q| q.matches())
            .map(|q| q.identifier())
            .collect()
    }

    /// The first owned query with the given identifier
    pub fn query(&self, identifier: &str) -> Option<&Query> {
        self.queries.iter().find(|q| q.identifier() == identifier)
    }

    pub(crate) fn query_mut(&mut self, identifier: &str) -> Option<&mut Query> {
        self.queries.iter_mut().find(|q| q.identifier() == identifier)
    }

    /// Node whose detector this container listens to
    pub(crate) fn detector_node(&self) -> Option<NodeId> {
        self.detector
    }

    pub(crate) fn listener_id(&self) -> Option<ListenerId> {
        self.listener
    }

    pub(crate) fn push_query(&mut self, query: Query) {
        self.queries.push(query);
    }

    /// Recompute every query against `width` and rewrite the derived
    /// annotation
    ///
    /// The annotation is written unconditionally, even when some query
    /// listeners fail; those failures are aggregated and returned after
    /// the write.
    pub(crate) fn update_with(
        &mut self,
        doc: &mut Document,
        width: u32,
    ) -> Result<(), UpdateError> {
        let mut notify = Vec::new();
        for query in &mut self.queries {
            if let Err(error) = query.update(width) {
                notify.push(error);
            }
        }

        let matches = self.matching().join(" ");
        let written = doc.set_attribute(self.node, MATCHES_ATTRIBUTE, matches);

        match written {
            Ok(()) if notify.is_empty() => Ok(()),
            Ok(()) => Err(UpdateError::Notify {
                total: self.queries.len(),
                notify,
            }),
            Err(dom) => {
                if !notify.is_empty() {
                    tracing::warn!(
                        "{} listener failure(s) shadowed by annotation write error on {:?}",
                        notify.len(),
                        self.node
                    );
                }
                Err(UpdateError::Dom(dom))
            }
        }
    }
}

impl std::fmt::Debug for ContainerQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerQuery")
            .field("node", &self.node)
            .field("queries", &self.queries)
            .field("detector", &self.detector)
            .finish()
    }
}

/// Specs declared on the node itself via the queries annotation
///
/// Pairs with an empty name or range are skipped; names and ranges are
/// trimmed of surrounding whitespace.
pub(crate) fn queries_from_node(doc: &Document, node: NodeId) -> Vec<QuerySpec> {
    let Some(attribute) = doc.attribute(node, QUERIES_ATTRIBUTE) else {
        return Vec::new();
    };

    let mut specs = Vec::new();
    for pair in attribute.split(',') {
        let Some((name, range)) = pair.split_once(':') else {
            continue;
        };
        let (name, range) = (name.trim(), range.trim());
        if name.is_empty() || range.is_empty() {
            continue;
        }
        let parsed = parse_range(range);
        specs.push(QuerySpec {
            identifier: Some(name.to_string()),
            min: parsed.min,
            max: parsed.max,
            inclusive: parsed.inclusivity.value(),
            test: None,
        });
    }
    specs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::Inclusive;

    #[test]
    fn test_queries_from_node() {
        let mut doc = Document::new();
        let node = doc.create_element("div");
        doc.set_attribute(node, QUERIES_ATTRIBUTE, "phone: <500, desktop: >=1000")
            .unwrap();

        let specs = queries_from_node(&doc, node);
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].identifier.as_deref(), Some("phone"));
        assert_eq!(specs[0].max, Some(500));
        assert_eq!(specs[0].inclusive, Inclusive::Neither);
        assert_eq!(specs[1].identifier.as_deref(), Some("desktop"));
        assert_eq!(specs[1].min, Some(1000));
        assert_eq!(specs[1].inclusive, Inclusive::Both);
    }

    #[test]
    fn test_queries_from_node_without_annotation() {
        let mut doc = Document::new();
        let node = doc.create_element("div");
        assert!(queries_from_node(&doc, node).is_empty());
    }

    #[test]
    fn test_malformed_pairs_are_skipped() {
        let mut doc = Document::new();
        let node = doc.create_element("div");
        doc.set_attribute(node, QUERIES_ATTRIBUTE, "noseparator, : 500, ok: 100...200,")
            .unwrap();

        let specs = queries_from_node(&doc, node);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].identifier.as_deref(), Some("ok"));
        assert_eq!(specs[0].min, Some(100));
        assert_eq!(specs[0].max, Some(200));
    }
}
