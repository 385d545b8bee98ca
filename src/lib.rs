//! LiveGraph
//!
//! An embeddable, in-memory dynamic graph that reports every change it goes
//! through as an event, so graphs, filters and consumers can be chained into
//! pipelines that stay in sync.
//!
//! # Architecture
//!
//! - [`graph`]: the storage engine. Dense node/edge tables with O(1)
//!   swap-removal, per-node edge lists partitioned into entering, mutual and
//!   leaving zones, and a per-node neighbor index that either refuses
//!   parallel edges (simple graphs) or keeps them (multigraphs).
//! - [`stream`]: sources, sinks and pipes; attribute filtering; the
//!   per-source logical clocks that stop events from echoing around
//!   pipeline cycles; and [`Graph`], a shared handle that is both a source
//!   and a sink.
//!
//! ## Example Usage
//!
//! ```rust
//! use livegraph::{synchronize, EventLog, Graph, Source};
//! use std::sync::Arc;
//!
//! let g1 = Graph::new("g1");
//! let g2 = Graph::new("g2");
//! synchronize(&[g1.clone(), g2.clone()]);
//!
//! let log = Arc::new(EventLog::new());
//! g2.add_sink(log.clone());
//!
//! g1.add_node("a").unwrap();
//! g1.add_node("b").unwrap();
//! g1.add_edge("ab", "a", "b", true).unwrap();
//! g1.set_node_attribute("a", "ui.label", "A").unwrap();
//!
//! assert_eq!(g2.edge_count(), 1);
//! // each change reached the observer exactly once
//! assert_eq!(log.len(), 4);
//! # g1.clear_sinks();
//! # g2.clear_sinks();
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod graph;
pub mod stream;

// Re-export main types for convenience
pub use graph::{
    AdjacencyKind, AttributeMode, AttributeValue, Attributes, Edge, EdgeCursor, EdgeHandle,
    ElementKind, EventKind, GraphConfig, GraphError, GraphEvent, GraphResult, GraphStore, Node,
    NodeCursor, NodeHandle,
};

pub use stream::{
    replay, synchronize, AttributePipe, AttributePredicate, ChannelSink, EventLog, Graph,
    NullSink, Pipe, PipeBase, Sink, SinkTime, Source, SourceBase, StepCounter, Subscription,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "1.0.0");
    }
}
