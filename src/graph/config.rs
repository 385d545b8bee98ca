//! Graph store configuration

use super::attribute::AttributeMode;
use super::types::AdjacencyKind;
use serde::{Deserialize, Serialize};

/// Growth factor of node adjacency arrays and default of the dense tables
pub const DEFAULT_GROWTH_FACTOR: f64 = 1.1;

/// Capacity to grow to from a full table of `current` slots
pub(crate) fn grown_capacity(current: usize, factor: f64) -> usize {
    let factor = if factor.is_finite() && factor > 1.0 { factor } else { DEFAULT_GROWTH_FACTOR };
    ((current as f64 * factor) as usize + 1).max(current + 1)
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Duplicate ids and missing endpoints are errors instead of no-ops
    pub strict_checking: bool,
    /// Missing edge endpoints are created on the fly (non-strict only)
    pub auto_create: bool,
    /// Neighbor index used by nodes built with the default factory
    pub adjacency: AdjacencyKind,
    /// Attribute storage of every element
    pub attribute_mode: AttributeMode,
    /// Growth factor of the dense node and edge tables
    pub growth_factor: f64,
    pub initial_node_capacity: usize,
    pub initial_edge_capacity: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            strict_checking: true,
            auto_create: false,
            adjacency: AdjacencyKind::Multi,
            attribute_mode: AttributeMode::Map,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            initial_node_capacity: 128,
            initial_edge_capacity: 1024,
        }
    }
}

impl GraphConfig {
    /// Simple graph: at most one edge per direction between two nodes
    pub fn single() -> Self {
        Self::default().with_adjacency(AdjacencyKind::Single)
    }

    /// Multigraph
    pub fn multi() -> Self {
        Self::default().with_adjacency(AdjacencyKind::Multi)
    }

    pub fn with_strict_checking(mut self, strict: bool) -> Self {
        self.strict_checking = strict;
        self
    }

    pub fn with_auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }

    pub fn with_adjacency(mut self, adjacency: AdjacencyKind) -> Self {
        self.adjacency = adjacency;
        self
    }

    pub fn with_attribute_mode(mut self, mode: AttributeMode) -> Self {
        self.attribute_mode = mode;
        self
    }

    pub fn with_growth_factor(mut self, factor: f64) -> Self {
        self.growth_factor = factor;
        self
    }

    pub fn with_capacity(mut self, nodes: usize, edges: usize) -> Self {
        self.initial_node_capacity = nodes;
        self.initial_edge_capacity = edges;
        self
    }

    /// Whether a missing endpoint should be created rather than reported
    pub fn creates_missing_endpoints(&self) -> bool {
        self.auto_create && !self.strict_checking
    }
}
