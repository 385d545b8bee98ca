//! Shared, thread-safe graph handle
//!
//! [`Graph`] wraps a [`GraphStore`] behind a lock and is a [`Source`] of the
//! store's events as well as a [`Sink`] applying events from elsewhere.
//! Events are queued for delivery while the lock is held, which fixes their
//! order, and delivered after it is released, so a sink may call back into
//! the same graph (a pipeline cycle) without deadlocking.
//!
//! Handles are cheap to clone. Graphs subscribed to each other hold each
//! other alive; break such cycles with [`Source::remove_sink`] or
//! [`Source::clear_sinks`].

use super::replay::replay;
use super::sinks::ChannelSink;
use super::{Sink, Source, SourceBase};
use crate::graph::attribute::AttributeValue;
use crate::graph::config::GraphConfig;
use crate::graph::edge::Edge;
use crate::graph::event::GraphEvent;
use crate::graph::node::Node;
use crate::graph::store::{GraphResult, GraphStore};
use crate::graph::types::{EdgeHandle, NodeHandle};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

struct GraphInner {
    store: Mutex<GraphStore>,
    base: SourceBase,
    replays: AtomicU64,
}

#[derive(Clone)]
pub struct Graph {
    inner: Arc<GraphInner>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("store", &*self.inner.store.lock())
            .field("sinks", &self.inner.base.sink_count())
            .finish()
    }
}

impl Graph {
    pub fn new(id: impl Into<String>) -> Self {
        Self::from_store(GraphStore::new(id))
    }

    pub fn with_config(id: impl Into<String>, config: GraphConfig) -> Self {
        Self::from_store(GraphStore::with_config(id, config))
    }

    /// Take over an existing store. Events it has not handed out yet are
    /// discarded; use [`Graph::replay_into`] to bring sinks up to date.
    pub fn from_store(mut store: GraphStore) -> Self {
        store.take_events();
        info!(graph = store.id(), nodes = store.node_count(), edges = store.edge_count(), "graph handle created");
        Graph {
            inner: Arc::new(GraphInner {
                base: SourceBase::new(store.id()),
                store: Mutex::new(store),
                replays: AtomicU64::new(0),
            }),
        }
    }

    /// A graph whose events are also forwarded to a tokio channel
    pub fn with_event_channel(id: impl Into<String>) -> (Self, UnboundedReceiver<GraphEvent>) {
        let graph = Self::new(id);
        let (sink, receiver) = ChannelSink::new();
        graph.add_sink(Arc::new(sink));
        (graph, receiver)
    }

    pub fn id(&self) -> &str {
        self.inner.base.source_id()
    }

    /// This handle as a sink, ready to subscribe to another source
    pub fn as_sink(&self) -> Arc<dyn Sink> {
        Arc::new(self.clone())
    }

    /// Run a read-only closure against the store
    pub fn read<T>(&self, f: impl FnOnce(&GraphStore) -> T) -> T {
        f(&self.inner.store.lock())
    }

    /// Run a mutation and deliver the events it produced, also when it
    /// fails part way (auto-created endpoints stay created).
    pub fn mutate<T>(&self, f: impl FnOnce(&mut GraphStore) -> GraphResult<T>) -> GraphResult<T> {
        let result = {
            let mut store = self.inner.store.lock();
            let result = f(&mut store);
            self.inner.base.enqueue(store.take_events());
            result
        };
        self.inner.base.drain();
        result
    }

    /// Apply an event from another source; `Ok(false)` if it was stale
    pub fn apply(&self, event: &GraphEvent) -> GraphResult<bool> {
        self.mutate(|store| store.apply(event))
    }

    pub fn add_node(&self, id: &str) -> GraphResult<NodeHandle> {
        self.mutate(|store| store.add_node(id))
    }

    pub fn add_edge(&self, id: &str, from_id: &str, to_id: &str, directed: bool) -> GraphResult<EdgeHandle> {
        self.mutate(|store| store.add_edge(id, from_id, to_id, directed))
    }

    pub fn add_edge_between(&self, from_id: &str, to_id: &str, directed: bool) -> GraphResult<EdgeHandle> {
        self.mutate(|store| store.add_edge_between(from_id, to_id, directed))
    }

    pub fn remove_node(&self, id: &str) -> GraphResult<Node> {
        self.mutate(|store| store.remove_node(id))
    }

    pub fn remove_edge(&self, id: &str) -> GraphResult<Edge> {
        self.mutate(|store| store.remove_edge(id))
    }

    pub fn clear(&self) {
        // infallible
        let _ = self.mutate(|store| {
            store.clear();
            Ok(())
        });
    }

    pub fn step_begins(&self, step: f64) {
        let _ = self.mutate(|store| {
            store.step_begins(step);
            Ok(())
        });
    }

    pub fn set_graph_attribute(&self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        let _ = self.mutate(|store| {
            store.set_graph_attribute(key, value);
            Ok(())
        });
    }

    pub fn remove_graph_attribute(&self, key: &str) -> Option<AttributeValue> {
        self.mutate(|store| Ok(store.remove_graph_attribute(key)))
            .unwrap_or_default()
    }

    pub fn set_node_attribute(
        &self,
        node_id: &str,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> GraphResult<()> {
        self.mutate(|store| store.set_node_attribute(node_id, key, value))
    }

    pub fn remove_node_attribute(&self, node_id: &str, key: &str) -> GraphResult<Option<AttributeValue>> {
        self.mutate(|store| store.remove_node_attribute(node_id, key))
    }

    pub fn set_edge_attribute(
        &self,
        edge_id: &str,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> GraphResult<()> {
        self.mutate(|store| store.set_edge_attribute(edge_id, key, value))
    }

    pub fn remove_edge_attribute(&self, edge_id: &str, key: &str) -> GraphResult<Option<AttributeValue>> {
        self.mutate(|store| store.remove_edge_attribute(edge_id, key))
    }

    pub fn node_count(&self) -> usize {
        self.read(GraphStore::node_count)
    }

    pub fn edge_count(&self) -> usize {
        self.read(GraphStore::edge_count)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.read(|store| store.contains_node(id))
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.read(|store| store.contains_edge(id))
    }

    pub fn node_attribute(&self, node_id: &str, key: &str) -> Option<AttributeValue> {
        self.read(|store| store.node(node_id).and_then(|n| n.attribute(key).cloned()))
    }

    /// Feed `sink` the events that rebuild the current state.
    ///
    /// Each replay is its own origin (`"{id}#replay{n}"`), so a sink that
    /// saw an earlier replay does not refuse this one as stale.
    pub fn replay_into(&self, sink: &dyn Sink) {
        let n = self.inner.replays.fetch_add(1, Ordering::Relaxed) + 1;
        let source_id = format!("{}#replay{}", self.id(), n);
        let events = self.read(|store| replay(store, &source_id));
        for event in &events {
            sink.receive(event);
        }
    }
}

impl Source for Graph {
    fn source_base(&self) -> &SourceBase {
        &self.inner.base
    }
}

impl Sink for Graph {
    fn receive(&self, event: &GraphEvent) {
        if let Err(e) = self.apply(event) {
            warn!(
                graph = self.id(),
                source = %event.source_id,
                time = event.time_id,
                event = event.kind.name(),
                error = %e,
                "failed to apply received event"
            );
        }
    }
}

/// Subscribe every graph to every other one
pub fn synchronize(graphs: &[Graph]) {
    for (i, source) in graphs.iter().enumerate() {
        for (j, target) in graphs.iter().enumerate() {
            if i != j {
                source.add_sink(target.as_sink());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::event::EventKind;
    use crate::stream::sinks::EventLog;
    use std::panic::AssertUnwindSafe;

    #[test]
    fn test_mutations_reach_sinks() {
        let graph = Graph::new("g");
        let log = Arc::new(EventLog::new());
        graph.add_sink(log.clone());

        graph.add_node("a").unwrap();
        graph.add_node("b").unwrap();
        graph.add_edge("e", "a", "b", false).unwrap();
        graph.set_node_attribute("a", "x", 1i64).unwrap();

        assert_eq!(log.len(), 4);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.node_attribute("a", "x"), Some(AttributeValue::Integer(1)));
    }

    #[test]
    fn test_failed_mutation_sends_nothing() {
        let graph = Graph::new("g");
        let log = Arc::new(EventLog::new());
        graph.add_sink(log.clone());
        assert!(graph.remove_node("missing").is_err());
        assert!(log.is_empty());
    }

    #[test]
    fn test_mutually_piped_graphs_do_not_echo() {
        let g1 = Graph::new("g1");
        let g2 = Graph::new("g2");
        synchronize(&[g1.clone(), g2.clone()]);
        let observer = Arc::new(EventLog::new());
        g2.add_sink(observer.clone());

        g1.add_node("a").unwrap();

        assert!(g2.contains_node("a"));
        assert_eq!(observer.len(), 1);
        assert_eq!(observer.events()[0].source_id, "g1");

        g2.add_node("b").unwrap();
        assert!(g1.contains_node("b"));
        assert_eq!(observer.len(), 2);

        g1.clear_sinks();
        g2.clear_sinks();
    }

    #[test]
    fn test_receive_logs_and_continues_on_failure() {
        let graph = Graph::new("g");
        graph.receive(&GraphEvent::new("other", 1, EventKind::NodeRemoved { node_id: "x".into() }));
        graph.receive(&GraphEvent::new("other", 2, EventKind::NodeAdded { node_id: "x".into() }));
        assert!(graph.contains_node("x"));
    }

    #[test]
    fn test_replay_into_late_subscriber() {
        let graph = Graph::new("g");
        graph.add_node("a").unwrap();
        graph.add_node("b").unwrap();
        graph.add_edge("e", "a", "b", true).unwrap();

        let mirror = Graph::new("mirror");
        graph.replay_into(&mirror);
        graph.add_sink(mirror.as_sink());
        graph.add_node("c").unwrap();

        assert_eq!(mirror.node_count(), 3);
        assert_eq!(mirror.edge_count(), 1);
    }

    #[test]
    fn test_repeated_replay_resyncs_mirror() {
        let graph = Graph::new("g");
        graph.add_node("a").unwrap();
        let mirror = Graph::new("mirror");

        graph.replay_into(&mirror);
        assert_eq!(mirror.node_count(), 1);

        mirror.clear();
        graph.add_node("b").unwrap();
        graph.replay_into(&mirror);
        assert_eq!(mirror.node_count(), 2);
        assert!(mirror.contains_node("a"));
    }

    struct Exploding;

    impl Sink for Exploding {
        fn receive(&self, event: &GraphEvent) {
            if event.kind == (EventKind::NodeAdded { node_id: "boom".into() }) {
                panic!("sink failure");
            }
        }
    }

    #[test]
    fn test_graph_keeps_emitting_after_sink_panic() {
        let graph = Graph::new("g");
        let exploding: Arc<dyn Sink> = Arc::new(Exploding);
        graph.add_sink(exploding.clone());

        let result = std::panic::catch_unwind(AssertUnwindSafe(|| graph.add_node("boom")));
        assert!(result.is_err());
        assert!(graph.contains_node("boom"));

        graph.remove_sink(&exploding);
        let log = Arc::new(EventLog::new());
        graph.add_sink(log.clone());
        graph.add_node("later").unwrap();

        assert_eq!(log.len(), 1);
        assert_eq!(log.events()[0].kind, EventKind::NodeAdded { node_id: "later".into() });
    }

    #[test]
    fn test_event_channel() {
        let (graph, mut receiver) = Graph::with_event_channel("g");
        graph.add_node("a").unwrap();
        graph.step_begins(1.0);
        assert_eq!(
            receiver.try_recv().unwrap().kind,
            EventKind::NodeAdded { node_id: "a".into() }
        );
        assert_eq!(receiver.try_recv().unwrap().kind, EventKind::StepBegins { step: 1.0 });
    }
}
