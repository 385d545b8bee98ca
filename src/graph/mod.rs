//! Core graph implementation
//!
//! This module implements the dynamic graph model:
//! - Nodes and edges keyed by string ids, addressable by handle or position
//! - Directed, undirected and loop edges; simple or multigraph adjacency
//! - Attribute bags on the graph, nodes and edges
//! - One stamped [`GraphEvent`] per effective mutation

pub mod adjacency;
pub mod attribute;
pub mod config;
pub mod cursor;
pub mod edge;
pub mod event;
pub mod node;
pub mod store;
pub mod types;

// Re-export main types
pub use adjacency::{NodeAdjacency, Zone};
pub use attribute::{AttributeChange, AttributeMode, AttributeValue, Attributes};
pub use config::{GraphConfig, DEFAULT_GROWTH_FACTOR};
pub use cursor::{EdgeCursor, NodeCursor};
pub use edge::{default_edge_factory, Edge, EdgeFactory};
pub use event::{ChangeKey, EventKind, GraphEvent};
pub use node::{default_node_factory, Node, NodeContext, NodeFactory};
pub use store::{GraphError, GraphResult, GraphStore};
pub use types::{AdjacencyKind, EdgeHandle, ElementKind, NodeHandle};
