//! Node record
//!
//! A node owns its attribute bag and its [`NodeAdjacency`]; it refers to its
//! edges only through handles. Nodes are built by a [`NodeFactory`] and
//! become live once the store attaches them to a slot.

use super::adjacency::NodeAdjacency;
use super::attribute::{AttributeMode, AttributeValue, Attributes};
use super::types::{AdjacencyKind, EdgeHandle, NodeHandle};
use std::sync::Arc;

/// What a node factory knows about the graph it builds for
#[derive(Debug, Clone)]
pub struct NodeContext {
    pub graph_id: String,
    pub adjacency: AdjacencyKind,
    pub attribute_mode: AttributeMode,
}

/// Builds nodes for a store: `(id, context) -> Node`
pub type NodeFactory = Arc<dyn Fn(&str, &NodeContext) -> Node + Send + Sync>;

/// The factory used when none is installed
pub fn default_node_factory() -> NodeFactory {
    Arc::new(|id: &str, ctx: &NodeContext| {
        Node::new(id, ctx.adjacency).with_attribute_mode(ctx.attribute_mode)
    })
}

const DETACHED: NodeHandle = NodeHandle {
    slot: u32::MAX,
    generation: 0,
};

/// A node of the graph
#[derive(Debug, Clone)]
pub struct Node {
    id: String,
    pub(crate) handle: NodeHandle,
    /// Position in the store's dense node table
    pub(crate) index: usize,
    pub(crate) attributes: Attributes,
    pub(crate) adjacency: NodeAdjacency,
}

impl Node {
    /// Create a detached node with the given neighbor index
    pub fn new(id: impl Into<String>, kind: AdjacencyKind) -> Self {
        Node {
            id: id.into(),
            handle: DETACHED,
            index: usize::MAX,
            attributes: Attributes::new(),
            adjacency: NodeAdjacency::new(DETACHED, kind),
        }
    }

    pub fn with_attribute_mode(mut self, mode: AttributeMode) -> Self {
        self.attributes.set_mode(mode);
        self
    }

    /// Pre-populate an attribute. Attributes set this way are announced right
    /// after the node itself when the store adds it.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.set(key, value.into());
        self
    }

    pub(crate) fn attach(&mut self, handle: NodeHandle, index: usize) {
        self.handle = handle;
        self.index = index;
        self.adjacency.set_owner(handle);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    /// Current slot in the dense node table
    pub fn index(&self) -> usize {
        self.index
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

    pub fn adjacency(&self) -> &NodeAdjacency {
        &self.adjacency
    }

    pub fn degree(&self) -> usize {
        self.adjacency.degree()
    }

    pub fn in_degree(&self) -> usize {
        self.adjacency.in_degree()
    }

    pub fn out_degree(&self) -> usize {
        self.adjacency.out_degree()
    }

    pub fn edges(&self) -> &[EdgeHandle] {
        self.adjacency.edges()
    }

    pub fn entering_edges(&self) -> &[EdgeHandle] {
        self.adjacency.entering_edges()
    }

    pub fn leaving_edges(&self) -> &[EdgeHandle] {
        self.adjacency.leaving_edges()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_is_detached_and_empty() {
        let node = Node::new("a", AdjacencyKind::Multi);
        assert_eq!(node.id(), "a");
        assert_eq!(node.degree(), 0);
        assert_eq!(node.in_degree(), 0);
        assert_eq!(node.out_degree(), 0);
        assert_eq!(node.handle(), DETACHED);
        assert!(node.attributes().is_empty());
    }

    #[test]
    fn test_prepopulated_attributes() {
        let node = Node::new("a", AdjacencyKind::Single)
            .with_attribute("ui.label", "A")
            .with_attribute("weight", 2i64);
        assert_eq!(node.attribute("ui.label").unwrap().as_label(), Some("A"));
        assert_eq!(node.attributes().number("weight"), Some(2.0));
        assert!(node.has_attribute("weight"));
        assert_eq!(node.adjacency().kind(), AdjacencyKind::Single);
    }

    #[test]
    fn test_attach_sets_owner() {
        let mut node = Node::new("a", AdjacencyKind::Multi);
        let handle = NodeHandle::new(4, 2);
        node.attach(handle, 7);
        assert_eq!(node.handle(), handle);
        assert_eq!(node.index(), 7);
    }

    #[test]
    fn test_default_factory_follows_context() {
        let factory = default_node_factory();
        let ctx = NodeContext {
            graph_id: "g".to_string(),
            adjacency: AdjacencyKind::Single,
            attribute_mode: AttributeMode::SingleSlot,
        };
        let node = factory("n", &ctx);
        assert_eq!(node.adjacency().kind(), AdjacencyKind::Single);
        assert_eq!(node.attributes().mode(), AttributeMode::SingleSlot);
    }

    #[test]
    fn test_node_equality_by_id() {
        let a1 = Node::new("a", AdjacencyKind::Multi);
        let a2 = Node::new("a", AdjacencyKind::Single);
        let b = Node::new("b", AdjacencyKind::Multi);
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
    }
}
