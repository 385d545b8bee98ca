//! Graph change events
//!
//! Every mutation of a store is described by exactly one [`GraphEvent`]:
//! the id of the graph that originated it, a logical time that increases per
//! origin, and the typed payload.

use super::attribute::AttributeValue;
use super::types::ElementKind;
use serde::{Deserialize, Serialize};

/// A stamped change notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEvent {
    /// Graph that originated the change
    pub source_id: String,
    /// Logical time, strictly increasing per `source_id`
    pub time_id: u64,
    pub kind: EventKind,
}

impl GraphEvent {
    pub fn new(source_id: impl Into<String>, time_id: u64, kind: EventKind) -> Self {
        GraphEvent {
            source_id: source_id.into(),
            time_id,
            kind,
        }
    }

    /// Same change, restamped
    pub fn restamped(&self, source_id: impl Into<String>, time_id: u64) -> Self {
        GraphEvent {
            source_id: source_id.into(),
            time_id,
            kind: self.kind.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    NodeAdded {
        node_id: String,
    },
    NodeRemoved {
        node_id: String,
    },
    EdgeAdded {
        edge_id: String,
        from_id: String,
        to_id: String,
        directed: bool,
    },
    EdgeRemoved {
        edge_id: String,
    },
    GraphCleared,
    StepBegins {
        step: f64,
    },
    GraphAttributeAdded {
        key: String,
        value: AttributeValue,
    },
    GraphAttributeChanged {
        key: String,
        old_value: AttributeValue,
        new_value: AttributeValue,
    },
    GraphAttributeRemoved {
        key: String,
    },
    NodeAttributeAdded {
        node_id: String,
        key: String,
        value: AttributeValue,
    },
    NodeAttributeChanged {
        node_id: String,
        key: String,
        old_value: AttributeValue,
        new_value: AttributeValue,
    },
    NodeAttributeRemoved {
        node_id: String,
        key: String,
    },
    EdgeAttributeAdded {
        edge_id: String,
        key: String,
        value: AttributeValue,
    },
    EdgeAttributeChanged {
        edge_id: String,
        key: String,
        old_value: AttributeValue,
        new_value: AttributeValue,
    },
    EdgeAttributeRemoved {
        edge_id: String,
        key: String,
    },
}

/// Identity of the thing an event changes, ignoring how it changed.
///
/// Two events with the same key touch the same node, edge, attribute or
/// graph-wide state; an added and a changed event for one attribute share a
/// key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChangeKey {
    Node(String),
    Edge(String),
    GraphAttribute(String),
    NodeAttribute(String, String),
    EdgeAttribute(String, String),
    Step,
    Cleared,
}

impl EventKind {
    /// True for the nine attribute events
    pub fn is_attribute_event(&self) -> bool {
        self.attribute_key().is_some()
    }

    /// True for structural events: node/edge added/removed, clear, step
    pub fn is_element_event(&self) -> bool {
        !self.is_attribute_event()
    }

    /// Element whose attributes an attribute event touches
    pub fn attribute_scope(&self) -> Option<ElementKind> {
        use EventKind::*;
        match self {
            GraphAttributeAdded { .. } | GraphAttributeChanged { .. } | GraphAttributeRemoved { .. } => {
                Some(ElementKind::Graph)
            }
            NodeAttributeAdded { .. } | NodeAttributeChanged { .. } | NodeAttributeRemoved { .. } => {
                Some(ElementKind::Node)
            }
            EdgeAttributeAdded { .. } | EdgeAttributeChanged { .. } | EdgeAttributeRemoved { .. } => {
                Some(ElementKind::Edge)
            }
            _ => None,
        }
    }

    pub fn attribute_key(&self) -> Option<&str> {
        use EventKind::*;
        match self {
            GraphAttributeAdded { key, .. }
            | GraphAttributeChanged { key, .. }
            | GraphAttributeRemoved { key }
            | NodeAttributeAdded { key, .. }
            | NodeAttributeChanged { key, .. }
            | NodeAttributeRemoved { key, .. }
            | EdgeAttributeAdded { key, .. }
            | EdgeAttributeChanged { key, .. }
            | EdgeAttributeRemoved { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Value after the change; `None` for removals and structural events
    pub fn attribute_value(&self) -> Option<&AttributeValue> {
        use EventKind::*;
        match self {
            GraphAttributeAdded { value, .. }
            | NodeAttributeAdded { value, .. }
            | EdgeAttributeAdded { value, .. } => Some(value),
            GraphAttributeChanged { new_value, .. }
            | NodeAttributeChanged { new_value, .. }
            | EdgeAttributeChanged { new_value, .. } => Some(new_value),
            _ => None,
        }
    }

    pub fn change_key(&self) -> ChangeKey {
        use EventKind::*;
        match self {
            NodeAdded { node_id } | NodeRemoved { node_id } => ChangeKey::Node(node_id.clone()),
            EdgeAdded { edge_id, .. } | EdgeRemoved { edge_id } => ChangeKey::Edge(edge_id.clone()),
            GraphCleared => ChangeKey::Cleared,
            StepBegins { .. } => ChangeKey::Step,
            GraphAttributeAdded { key, .. }
            | GraphAttributeChanged { key, .. }
            | GraphAttributeRemoved { key } => ChangeKey::GraphAttribute(key.clone()),
            NodeAttributeAdded { node_id, key, .. }
            | NodeAttributeChanged { node_id, key, .. }
            | NodeAttributeRemoved { node_id, key } => {
                ChangeKey::NodeAttribute(node_id.clone(), key.clone())
            }
            EdgeAttributeAdded { edge_id, key, .. }
            | EdgeAttributeChanged { edge_id, key, .. }
            | EdgeAttributeRemoved { edge_id, key } => {
                ChangeKey::EdgeAttribute(edge_id.clone(), key.clone())
            }
        }
    }

    /// Short name, used in logs
    pub fn name(&self) -> &'static str {
        use EventKind::*;
        match self {
            NodeAdded { .. } => "node_added",
            NodeRemoved { .. } => "node_removed",
            EdgeAdded { .. } => "edge_added",
            EdgeRemoved { .. } => "edge_removed",
            GraphCleared => "graph_cleared",
            StepBegins { .. } => "step_begins",
            GraphAttributeAdded { .. } => "graph_attribute_added",
            GraphAttributeChanged { .. } => "graph_attribute_changed",
            GraphAttributeRemoved { .. } => "graph_attribute_removed",
            NodeAttributeAdded { .. } => "node_attribute_added",
            NodeAttributeChanged { .. } => "node_attribute_changed",
            NodeAttributeRemoved { .. } => "node_attribute_removed",
            EdgeAttributeAdded { .. } => "edge_attribute_added",
            EdgeAttributeChanged { .. } => "edge_attribute_changed",
            EdgeAttributeRemoved { .. } => "edge_attribute_removed",
        }
    }
}
