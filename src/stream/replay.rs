//! Snapshot of a store as a sequence of events
//!
//! Replaying brings a freshly attached sink up to date. The events are
//! stamped with their own source id and times counting from 1, so sinks
//! that already follow the original store do not refuse them as stale.

use crate::graph::event::{EventKind, GraphEvent};
use crate::graph::store::GraphStore;

/// Events that rebuild `store` from scratch: graph attributes, then each
/// node followed by its attributes, then each edge followed by its
/// attributes.
pub fn replay(store: &GraphStore, source_id: &str) -> Vec<GraphEvent> {
    let mut kinds = Vec::with_capacity(store.node_count() + store.edge_count());

    for (key, value) in store.attributes().iter() {
        kinds.push(EventKind::GraphAttributeAdded {
            key: key.to_string(),
            value: value.clone(),
        });
    }

    for node in store.nodes() {
        kinds.push(EventKind::NodeAdded {
            node_id: node.id().to_string(),
        });
        for (key, value) in node.attributes().iter() {
            kinds.push(EventKind::NodeAttributeAdded {
                node_id: node.id().to_string(),
                key: key.to_string(),
                value: value.clone(),
            });
        }
    }

    for edge in store.edges() {
        kinds.push(EventKind::EdgeAdded {
            edge_id: edge.id().to_string(),
            from_id: edge.source_id().to_string(),
            to_id: edge.target_id().to_string(),
            directed: edge.is_directed(),
        });
        for (key, value) in edge.attributes().iter() {
            kinds.push(EventKind::EdgeAttributeAdded {
                edge_id: edge.id().to_string(),
                key: key.to_string(),
                value: value.clone(),
            });
        }
    }

    kinds
        .into_iter()
        .zip(1u64..)
        .map(|(kind, time)| GraphEvent::new(source_id, time, kind))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_rebuilds_store() {
        let mut original = GraphStore::new("g1");
        original.set_graph_attribute("title", "demo");
        original.add_node("a").unwrap();
        original.add_node("b").unwrap();
        original.set_node_attribute("a", "x", 3i64).unwrap();
        original.add_edge("e", "a", "b", true).unwrap();
        original.set_edge_attribute("e", "weight", 0.5).unwrap();

        let events = replay(&original, "g1-replay");
        assert_eq!(events.len(), 6);
        assert_eq!(events[0].time_id, 1);
        assert!(events.windows(2).all(|w| w[0].time_id < w[1].time_id));

        let mut copy = GraphStore::new("g2");
        for event in &events {
            assert!(copy.apply(event).unwrap());
        }
        assert_eq!(copy.node_count(), 2);
        assert_eq!(copy.edge_count(), 1);
        assert!(copy.edge("e").unwrap().is_directed());
        assert_eq!(copy.node("a").unwrap().attributes().number("x"), Some(3.0));
        assert_eq!(copy.edge("e").unwrap().attributes().number("weight"), Some(0.5));
        assert_eq!(copy.graph_attribute("title").unwrap().as_label(), Some("demo"));
    }

    #[test]
    fn test_replay_of_empty_store() {
        assert!(replay(&GraphStore::new("g"), "r").is_empty());
    }
}
