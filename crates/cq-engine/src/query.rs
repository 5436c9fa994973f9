//! Named width predicates
//!
//! A [`Query`] tracks the match state of one predicate and notifies its
//! change listeners only on true/false transitions.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::range::{Inclusive, RangeSpec};
use crate::{ListenerError, ListenerFailure, NotifyError};

/// Explicit predicate over a width
pub type Predicate = Rc<dyn Fn(u32) -> bool>;

type ChangeListener = Box<dyn FnMut(&Query) -> Result<(), ListenerError>>;

static NEXT_QUERY_INDEX: AtomicU64 = AtomicU64::new(1);

/// Construction input for one query
///
/// Either an explicit `test` predicate or bounds from which one is
/// derived. Serializable minus the predicate, so query sets can be loaded
/// from configuration.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySpec {
    pub identifier: Option<String>,
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub inclusive: Inclusive,
    #[serde(skip)]
    pub test: Option<Predicate>,
}

impl fmt::Debug for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySpec")
            .field("identifier", &self.identifier)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("inclusive", &self.inclusive)
            .field("test", &self.test.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// One named predicate with transition-tracked match state
pub struct Query {
    identifier: String,
    matches: bool,
    test: Predicate,
    listeners: Vec<ChangeListener>,
}

impl Query {
    /// Build a query from a spec
    ///
    /// Identifier resolution order: explicit identifier, identifier
    /// derived from the bounds, then a process-wide sequential fallback.
    pub fn from_spec(spec: &QuerySpec) -> Self {
        let range = RangeSpec {
            min: spec.min,
            max: spec.max,
            inclusivity: spec.inclusive.into(),
        };

        let identifier = spec
            .identifier
            .clone()
            .or_else(|| range.identifier())
            .unwrap_or_else(|| {
                format!(
                    "ContainerQuery{}",
                    NEXT_QUERY_INDEX.fetch_add(1, Ordering::Relaxed)
                )
            });

        let test: Predicate = match &spec.test {
            Some(test) => Rc::clone(test),
            None => {
                let effective = range.effective();
                Rc::new(move |width| effective.contains(width))
            }
        };

        Self {
            identifier,
            matches: false,
            test,
            listeners: Vec::new(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Match state as of the last update
    pub fn matches(&self) -> bool {
        self.matches
    }

    /// Evaluate the predicate without touching state
    pub fn test(&self, width: u32) -> bool {
        (self.test)(width)
    }

    /// Register a change listener; no deduplication, no removal
    pub fn on_change(
        &mut self,
        listener: impl FnMut(&Query) -> Result<(), ListenerError> + 'static,
    ) {
        self.listeners.push(Box::new(listener));
    }

    /// Re-evaluate against a width
    ///
    /// Listeners fire in registration order, only when the boolean result
    /// actually changed. A failing listener never stops later ones;
    /// failures are aggregated and returned after the full pass, with the
    /// match state already committed.
    pub fn update(&mut self, width: u32) -> Result<bool, NotifyError> {
        let last = self.matches;
        self.matches = (self.test)(width);
        if self.matches == last {
            return Ok(self.matches);
        }

        let mut listeners = std::mem::take(&mut self.listeners);
        let mut failures = Vec::new();
        for (index, listener) in listeners.iter_mut().enumerate() {
            if let Err(source) = listener(self) {
                failures.push(ListenerFailure { index, source });
            }
        }
        // Listeners registered during the pass take effect from the next
        // transition.
        listeners.append(&mut self.listeners);
        self.listeners = listeners;

        if failures.is_empty() {
            Ok(self.matches)
        } else {
            Err(NotifyError {
                identifier: self.identifier.clone(),
                matches: self.matches,
                failures,
            })
        }
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("identifier", &self.identifier)
            .field("matches", &self.matches)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn min_spec(min: u32) -> QuerySpec {
        QuerySpec {
            min: Some(min),
            ..Default::default()
        }
    }

    #[test]
    fn test_derived_identifier_and_bounds() {
        let query = Query::from_spec(&min_spec(500));
        assert_eq!(query.identifier(), ">=500");
        assert!(query.test(500));
        assert!(!query.test(499));
    }

    #[test]
    fn test_explicit_identifier_wins() {
        let spec = QuerySpec {
            identifier: Some("phone".into()),
            ..min_spec(500)
        };
        assert_eq!(Query::from_spec(&spec).identifier(), "phone");
    }

    #[test]
    fn test_fallback_identifier_is_sequential() {
        let a = Query::from_spec(&QuerySpec::default());
        let b = Query::from_spec(&QuerySpec::default());
        assert!(a.identifier().starts_with("ContainerQuery"));
        assert!(b.identifier().starts_with("ContainerQuery"));
        assert_ne!(a.identifier(), b.identifier());
    }

    #[test]
    fn test_explicit_predicate() {
        let spec = QuerySpec {
            test: Some(Rc::new(|width| width % 2 == 0)),
            ..Default::default()
        };
        let mut query = Query::from_spec(&spec);
        assert_eq!(query.update(4).unwrap(), true);
        assert_eq!(query.update(5).unwrap(), false);
    }

    #[test]
    fn test_update_returns_current_match_state() {
        let mut query = Query::from_spec(&min_spec(500));
        for width in [0, 499, 500, 501, 499, 500] {
            let result = query.update(width).unwrap();
            assert_eq!(result, query.matches());
        }
    }

    #[test]
    fn test_listeners_fire_only_on_transitions() {
        let transitions = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&transitions);

        let mut query = Query::from_spec(&min_spec(500));
        query.on_change(move |q| {
            seen.borrow_mut().push(q.matches());
            Ok(())
        });

        for width in [100, 200, 499, 500, 600, 700, 499, 100] {
            query.update(width).unwrap();
        }
        assert_eq!(*transitions.borrow(), vec![true, false]);
    }

    #[test]
    fn test_listener_order_is_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut query = Query::from_spec(&min_spec(500));
        for label in ["first", "second", "third"] {
            let order = Rc::clone(&order);
            query.on_change(move |_| {
                order.borrow_mut().push(label);
                Ok(())
            });
        }

        query.update(600).unwrap();
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_failing_listener_does_not_stop_later_ones() {
        let ran = Rc::new(RefCell::new(false));
        let ran_clone = Rc::clone(&ran);

        let mut query = Query::from_spec(&min_spec(500));
        query.on_change(|_| Err("boom".into()));
        query.on_change(move |_| {
            *ran_clone.borrow_mut() = true;
            Ok(())
        });

        let err = query.update(600).unwrap_err();
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].index, 0);
        assert!(err.matches);
        assert!(*ran.borrow());
        // State committed despite the failure.
        assert!(query.matches());
    }
}
