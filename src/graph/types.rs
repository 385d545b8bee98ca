//! Core type definitions for the graph store

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle to a node slot in the store's arena.
///
/// The generation is bumped every time a slot is vacated, so a handle kept
/// past the removal of its node no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl NodeHandle {
    pub(crate) fn new(slot: u32, generation: u32) -> Self {
        NodeHandle { slot, generation }
    }

    pub fn slot(&self) -> usize {
        self.slot as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeHandle({}v{})", self.slot, self.generation)
    }
}

/// Stable handle to an edge slot in the store's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeHandle {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl EdgeHandle {
    pub(crate) fn new(slot: u32, generation: u32) -> Self {
        EdgeHandle { slot, generation }
    }

    pub fn slot(&self) -> usize {
        self.slot as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for EdgeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeHandle({}v{})", self.slot, self.generation)
    }
}

/// Which kind of element an id or index refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Graph,
    Node,
    Edge,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::Graph => "graph",
            ElementKind::Node => "node",
            ElementKind::Edge => "edge",
        };
        f.write_str(name)
    }
}

/// Neighbor indexing strategy of a node's adjacency.
///
/// `Single` allows at most one edge per direction between two nodes,
/// `Multi` keeps every parallel edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AdjacencyKind {
    Single,
    #[default]
    Multi,
}
