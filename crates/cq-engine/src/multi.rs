//! Multi-node fan-out
//!
//! Applies the same construction, update, and destroy operations across
//! many target nodes; no cross-node state beyond the construction-time
//! configuration.

use cq_dom::{Document, NodeId};

use crate::engine::{ContainerQueryId, Engine};
use crate::query::QuerySpec;
use crate::{DispatchError, Options, PumpError, UpdateError};

/// One container query per target node, in input order
#[derive(Debug)]
pub struct MultipleNodeContainerQuery {
    ids: Vec<ContainerQueryId>,
}

impl MultipleNodeContainerQuery {
    pub fn new(
        engine: &mut Engine,
        doc: &mut Document,
        nodes: &[NodeId],
        specs: &[QuerySpec],
        options: &Options,
    ) -> Result<Self, UpdateError> {
        let ids = nodes
            .iter()
            .map(|&node| engine.create(doc, node, specs, options))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { ids })
    }

    /// Handles of the owned container queries, in input order
    pub fn ids(&self) -> &[ContainerQueryId] {
        &self.ids
    }

    /// Recompute every owned container query in order
    ///
    /// Every container runs even when some fail; failures are aggregated.
    pub fn update(&self, engine: &mut Engine, doc: &mut Document) -> Result<(), PumpError> {
        let failures: Vec<DispatchError> = self
            .ids
            .iter()
            .filter_map(|&id| engine.update(doc, id, None).err())
            .map(DispatchError::Update)
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(PumpError(failures))
        }
    }

    /// Append the same query to every owned container query
    ///
    /// Returns one identifier per container (derived identifiers repeat,
    /// fallback identifiers differ per container).
    pub fn add_query(
        &self,
        engine: &mut Engine,
        doc: &mut Document,
        spec: &QuerySpec,
    ) -> Result<Vec<String>, UpdateError> {
        self.ids
            .iter()
            .map(|&id| engine.add_query(doc, id, spec))
            .collect()
    }

    /// Append several queries to every owned container query, with one
    /// recomputation per container
    pub fn add_queries(
        &self,
        engine: &mut Engine,
        doc: &mut Document,
        specs: &[QuerySpec],
    ) -> Result<Vec<Vec<String>>, UpdateError> {
        self.ids
            .iter()
            .map(|&id| engine.add_queries(doc, id, specs))
            .collect()
    }

    /// Destroy every owned container query
    pub fn destroy(&self, engine: &mut Engine, doc: &mut Document) {
        for &id in &self.ids {
            engine.destroy(doc, id);
        }
    }
}
