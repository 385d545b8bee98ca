//! Pipes: sinks that forward to their own sinks

use super::{Sink, Source, SourceBase};
use crate::graph::attribute::AttributeValue;
use crate::graph::event::GraphEvent;
use crate::graph::types::ElementKind;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Forwards every event unchanged
#[derive(Debug)]
pub struct PipeBase {
    base: SourceBase,
}

impl PipeBase {
    pub fn new(id: impl Into<String>) -> Self {
        PipeBase {
            base: SourceBase::new(id),
        }
    }
}

impl Source for PipeBase {
    fn source_base(&self) -> &SourceBase {
        &self.base
    }
}

impl Sink for PipeBase {
    fn receive(&self, event: &GraphEvent) {
        self.base.send(event.clone());
    }
}

/// Decides whether an attribute is filtered out. Receives the key and the
/// value after the change (`None` for removals).
pub trait AttributePredicate: Send + Sync {
    fn matches(&self, key: &str, value: Option<&AttributeValue>) -> bool;
}

impl<F> AttributePredicate for F
where
    F: Fn(&str, Option<&AttributeValue>) -> bool + Send + Sync,
{
    fn matches(&self, key: &str, value: Option<&AttributeValue>) -> bool {
        self(key, value)
    }
}

#[derive(Default, Clone)]
struct Filters {
    global: Option<Arc<dyn AttributePredicate>>,
    graph: Option<Arc<dyn AttributePredicate>>,
    node: Option<Arc<dyn AttributePredicate>>,
    edge: Option<Arc<dyn AttributePredicate>>,
}

impl Filters {
    fn scoped(&self, scope: ElementKind) -> Option<&Arc<dyn AttributePredicate>> {
        match scope {
            ElementKind::Graph => self.graph.as_ref(),
            ElementKind::Node => self.node.as_ref(),
            ElementKind::Edge => self.edge.as_ref(),
        }
    }
}

/// Forwards element events untouched and drops attribute events claimed by
/// either the global predicate or the one for the attribute's scope.
/// Without predicates everything passes.
pub struct AttributePipe {
    base: SourceBase,
    filters: RwLock<Filters>,
}

impl fmt::Debug for AttributePipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filters = self.filters.read();
        f.debug_struct("AttributePipe")
            .field("base", &self.base)
            .field("global", &filters.global.is_some())
            .field("graph", &filters.graph.is_some())
            .field("node", &filters.node.is_some())
            .field("edge", &filters.edge.is_some())
            .finish()
    }
}

impl AttributePipe {
    pub fn new(id: impl Into<String>) -> Self {
        AttributePipe {
            base: SourceBase::new(id),
            filters: RwLock::new(Filters::default()),
        }
    }

    pub fn set_global_filter(&self, predicate: impl AttributePredicate + 'static) {
        self.filters.write().global = Some(Arc::new(predicate));
    }

    pub fn set_graph_filter(&self, predicate: impl AttributePredicate + 'static) {
        self.filters.write().graph = Some(Arc::new(predicate));
    }

    pub fn set_node_filter(&self, predicate: impl AttributePredicate + 'static) {
        self.filters.write().node = Some(Arc::new(predicate));
    }

    pub fn set_edge_filter(&self, predicate: impl AttributePredicate + 'static) {
        self.filters.write().edge = Some(Arc::new(predicate));
    }

    pub fn clear_filters(&self) {
        *self.filters.write() = Filters::default();
    }

    /// True when the event would be dropped
    pub fn is_filtered(&self, event: &GraphEvent) -> bool {
        let (Some(scope), Some(key)) = (event.kind.attribute_scope(), event.kind.attribute_key()) else {
            return false;
        };
        let value = event.kind.attribute_value();
        let filters = self.filters.read();
        let claimed = |p: Option<&Arc<dyn AttributePredicate>>| p.is_some_and(|p| p.matches(key, value));
        claimed(filters.scoped(scope)) || claimed(filters.global.as_ref())
    }
}

impl Source for AttributePipe {
    fn source_base(&self) -> &SourceBase {
        &self.base
    }
}

impl Sink for AttributePipe {
    fn receive(&self, event: &GraphEvent) {
        if !self.is_filtered(event) {
            self.base.send(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::event::EventKind;
    use crate::stream::sinks::EventLog;

    fn node_attr(key: &str, value: i64) -> GraphEvent {
        GraphEvent::new(
            "g",
            1,
            EventKind::NodeAttributeAdded {
                node_id: "a".into(),
                key: key.into(),
                value: value.into(),
            },
        )
    }

    fn edge_attr(key: &str) -> GraphEvent {
        GraphEvent::new(
            "g",
            2,
            EventKind::EdgeAttributeRemoved {
                edge_id: "e".into(),
                key: key.into(),
            },
        )
    }

    #[test]
    fn test_pipe_base_forwards_everything() {
        let pipe = PipeBase::new("p");
        let log = Arc::new(EventLog::new());
        pipe.add_sink(log.clone());
        pipe.receive(&node_attr("x", 1));
        pipe.receive(&GraphEvent::new("g", 3, EventKind::GraphCleared));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_no_filters_pass_everything() {
        let pipe = AttributePipe::new("p");
        assert!(!pipe.is_filtered(&node_attr("ui.hidden", 1)));
        assert!(!pipe.is_filtered(&edge_attr("w")));
    }

    #[test]
    fn test_scoped_filter() {
        let pipe = AttributePipe::new("p");
        pipe.set_node_filter(|key: &str, _: Option<&AttributeValue>| key.starts_with("ui."));
        assert!(pipe.is_filtered(&node_attr("ui.label", 1)));
        assert!(!pipe.is_filtered(&node_attr("weight", 1)));
        // the node predicate does not apply to edges
        assert!(!pipe.is_filtered(&edge_attr("ui.label")));
    }

    #[test]
    fn test_global_or_scoped_filters() {
        let pipe = AttributePipe::new("p");
        pipe.set_global_filter(|key: &str, _: Option<&AttributeValue>| key == "secret");
        pipe.set_edge_filter(|_: &str, value: Option<&AttributeValue>| value.is_none());

        assert!(pipe.is_filtered(&node_attr("secret", 1)));
        assert!(pipe.is_filtered(&edge_attr("anything")));
        assert!(!pipe.is_filtered(&node_attr("public", 1)));

        pipe.clear_filters();
        assert!(!pipe.is_filtered(&node_attr("secret", 1)));
    }

    #[test]
    fn test_filtering_by_value() {
        let pipe = AttributePipe::new("p");
        let log = Arc::new(EventLog::new());
        pipe.add_sink(log.clone());
        pipe.set_node_filter(|_: &str, value: Option<&AttributeValue>| {
            value.and_then(AttributeValue::as_integer).is_some_and(|v| v > 10)
        });

        pipe.receive(&node_attr("x", 5));
        pipe.receive(&node_attr("x", 50));
        pipe.receive(&GraphEvent::new("g", 9, EventKind::NodeAdded { node_id: "b".into() }));
        assert_eq!(log.len(), 2);
    }
}
