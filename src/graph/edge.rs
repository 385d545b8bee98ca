//! Edge record
//!
//! An edge's endpoints are fixed for its lifetime. It refers to them through
//! node handles and keeps their ids for event payloads.

use super::adjacency::EdgeShape;
use super::attribute::{AttributeMode, AttributeValue, Attributes};
use super::node::Node;
use super::types::{EdgeHandle, NodeHandle};
use std::sync::Arc;

/// Builds edges for a store: `(id, source, target, directed) -> Edge`
pub type EdgeFactory = Arc<dyn Fn(&str, &Node, &Node, bool) -> Edge + Send + Sync>;

/// The factory used when none is installed
pub fn default_edge_factory() -> EdgeFactory {
    Arc::new(|id: &str, source: &Node, target: &Node, directed: bool| {
        Edge::new(id, source, target, directed)
    })
}

/// An edge of the graph, directed or not
#[derive(Debug, Clone)]
pub struct Edge {
    id: String,
    pub(crate) handle: EdgeHandle,
    /// Position in the store's dense edge table
    pub(crate) index: usize,
    source: NodeHandle,
    target: NodeHandle,
    source_id: String,
    target_id: String,
    directed: bool,
    pub(crate) attributes: Attributes,
}

impl Edge {
    /// Create a detached edge between two nodes
    pub fn new(id: impl Into<String>, source: &Node, target: &Node, directed: bool) -> Self {
        Edge {
            id: id.into(),
            handle: EdgeHandle {
                slot: u32::MAX,
                generation: 0,
            },
            index: usize::MAX,
            source: source.handle(),
            target: target.handle(),
            source_id: source.id().to_string(),
            target_id: target.id().to_string(),
            directed,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute_mode(mut self, mode: AttributeMode) -> Self {
        self.attributes.set_mode(mode);
        self
    }

    /// Pre-populate an attribute, announced right after the edge is added
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.set(key, value.into());
        self
    }

    pub(crate) fn attach(&mut self, handle: EdgeHandle, index: usize) {
        self.handle = handle;
        self.index = index;
    }

    pub(crate) fn shape(&self) -> EdgeShape {
        EdgeShape {
            handle: self.handle,
            source: self.source,
            target: self.target,
            directed: self.directed,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn handle(&self) -> EdgeHandle {
        self.handle
    }

    /// Current slot in the dense edge table
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn source(&self) -> NodeHandle {
        self.source
    }

    pub fn target(&self) -> NodeHandle {
        self.target
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn is_loop(&self) -> bool {
        self.source == self.target
    }

    /// The endpoint that is not `node`; the node itself for loops
    pub fn opposite(&self, node: NodeHandle) -> NodeHandle {
        if self.source == node {
            self.target
        } else {
            self.source
        }
    }

    /// Id of the endpoint that is not `node_id`
    pub fn opposite_id(&self, node_id: &str) -> &str {
        if self.source_id == node_id {
            &self.target_id
        } else {
            &self.source_id
        }
    }

    /// Check if this edge connects two specific nodes (in either direction)
    pub fn connects(&self, a: NodeHandle, b: NodeHandle) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }

    /// True if the edge can be traversed starting at `node`
    pub fn leaves(&self, node: NodeHandle) -> bool {
        self.source == node || (!self.directed && self.target == node)
    }

    /// True if the edge can be traversed ending at `node`
    pub fn enters(&self, node: NodeHandle) -> bool {
        self.target == node || (!self.directed && self.source == node)
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains(key)
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Edge {}

impl std::hash::Hash for Edge {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::AdjacencyKind;

    fn attached(id: &str, slot: u32) -> Node {
        let mut node = Node::new(id, AdjacencyKind::Multi);
        node.attach(NodeHandle::new(slot, 0), slot as usize);
        node
    }

    #[test]
    fn test_create_edge() {
        let a = attached("a", 0);
        let b = attached("b", 1);
        let edge = Edge::new("e1", &a, &b, true);

        assert_eq!(edge.id(), "e1");
        assert_eq!(edge.source(), a.handle());
        assert_eq!(edge.target(), b.handle());
        assert_eq!(edge.source_id(), "a");
        assert_eq!(edge.target_id(), "b");
        assert!(edge.is_directed());
        assert!(!edge.is_loop());
    }

    #[test]
    fn test_loop_detection() {
        let a = attached("a", 0);
        let edge = Edge::new("l", &a, &a, false);
        assert!(edge.is_loop());
        assert_eq!(edge.opposite(a.handle()), a.handle());
    }

    #[test]
    fn test_edge_direction() {
        let a = attached("a", 0);
        let b = attached("b", 1);
        let directed = Edge::new("d", &a, &b, true);
        assert!(directed.leaves(a.handle()));
        assert!(!directed.leaves(b.handle()));
        assert!(directed.enters(b.handle()));
        assert!(!directed.enters(a.handle()));

        let undirected = Edge::new("u", &a, &b, false);
        assert!(undirected.leaves(b.handle()));
        assert!(undirected.enters(a.handle()));
    }

    #[test]
    fn test_edge_connects() {
        let a = attached("a", 0);
        let b = attached("b", 1);
        let c = attached("c", 2);
        let edge = Edge::new("e", &a, &b, true);
        assert!(edge.connects(a.handle(), b.handle()));
        assert!(edge.connects(b.handle(), a.handle()));
        assert!(!edge.connects(a.handle(), c.handle()));
        assert_eq!(edge.opposite_id("a"), "b");
        assert_eq!(edge.opposite_id("b"), "a");
    }

    #[test]
    fn test_prepopulated_attribute() {
        let a = attached("a", 0);
        let b = attached("b", 1);
        let edge = Edge::new("e", &a, &b, false).with_attribute("weight", 0.5);
        assert_eq!(edge.attributes().number("weight"), Some(0.5));
        assert!(edge.has_attribute("weight"));
    }
}
