//! Cursors over the dense node and edge tables
//!
//! A cursor holds a position instead of a borrow, so the element it just
//! returned can be removed through it. Removal moves the last element into
//! the freed position; the cursor steps back onto that position so the moved
//! element is still visited.

use super::edge::Edge;
use super::node::Node;
use super::store::{GraphError, GraphResult, GraphStore};
use super::types::{EdgeHandle, NodeHandle};

const NOTHING_TO_REMOVE: &str = "remove called before advance or twice for one element";

#[derive(Debug, Clone, Default)]
pub struct NodeCursor {
    next: usize,
    current: Option<NodeHandle>,
}

impl NodeCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, store: &GraphStore) -> Option<NodeHandle> {
        self.current = store.node_handle_at(self.next);
        if self.current.is_some() {
            self.next += 1;
        }
        self.current
    }

    /// Element returned by the last `advance`, unless removed since
    pub fn current(&self) -> Option<NodeHandle> {
        self.current
    }

    /// Remove the current node (and its edges) from the store
    pub fn remove(&mut self, store: &mut GraphStore) -> GraphResult<Node> {
        let handle = self
            .current
            .take()
            .ok_or(GraphError::InvalidIteratorState(NOTHING_TO_REMOVE))?;
        let node = store.remove_node_by_handle(handle)?;
        self.next = node.index();
        Ok(node)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EdgeCursor {
    next: usize,
    current: Option<EdgeHandle>,
}

impl EdgeCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, store: &GraphStore) -> Option<EdgeHandle> {
        self.current = store.edge_handle_at(self.next);
        if self.current.is_some() {
            self.next += 1;
        }
        self.current
    }

    pub fn current(&self) -> Option<EdgeHandle> {
        self.current
    }

    pub fn remove(&mut self, store: &mut GraphStore) -> GraphResult<Edge> {
        let handle = self
            .current
            .take()
            .ok_or(GraphError::InvalidIteratorState(NOTHING_TO_REMOVE))?;
        let edge = store.remove_edge_by_handle(handle)?;
        self.next = edge.index();
        Ok(edge)
    }
}
