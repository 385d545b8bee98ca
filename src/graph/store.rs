//! In-memory graph storage implementation
//!
//! Nodes and edges live in generational arenas addressed by handles. Next to
//! the arenas, each kind has an id map and a dense, gap-free table of handles
//! giving positional access; an element's `index` is always its slot in that
//! table. Removal swaps the last entry into the freed position.
//!
//! Every effective mutation hands exactly one event to the store's
//! [`Dispatcher`]; callers drain them with [`GraphStore::take_events`].

use super::attribute::{AttributeChange, AttributeValue, Attributes};
use super::config::{grown_capacity, GraphConfig};
use super::edge::{default_edge_factory, Edge, EdgeFactory};
use super::event::{EventKind, GraphEvent};
use super::node::{default_node_factory, Node, NodeContext, NodeFactory};
use super::types::{EdgeHandle, ElementKind, NodeHandle};
use crate::stream::sync::Dispatcher;
use rustc_hash::FxHashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use thiserror::Error;
use tracing::{debug, trace};

/// Errors that can occur during graph operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("{kind} \"{id}\" already exists")]
    DuplicateId { kind: ElementKind, id: String },

    #[error("{kind} \"{id}\" not found")]
    ElementNotFound { kind: ElementKind, id: String },

    #[error("{kind} index {index} out of range (count {count})")]
    IndexOutOfRange {
        kind: ElementKind,
        index: usize,
        count: usize,
    },

    #[error("cannot add edge \"{edge_id}\": \"{from_id}\" and \"{to_id}\" are already connected in that direction")]
    DuplicateEdge {
        edge_id: String,
        from_id: String,
        to_id: String,
    },

    #[error("invalid cursor state: {0}")]
    InvalidIteratorState(&'static str),
}

impl GraphError {
    /// Unknown id or out-of-range position
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GraphError::ElementNotFound { .. } | GraphError::IndexOutOfRange { .. }
        )
    }

    fn node_not_found(id: &str) -> Self {
        GraphError::ElementNotFound {
            kind: ElementKind::Node,
            id: id.to_string(),
        }
    }

    fn edge_not_found(id: &str) -> Self {
        GraphError::ElementNotFound {
            kind: ElementKind::Edge,
            id: id.to_string(),
        }
    }

    fn stale(kind: ElementKind, slot: usize) -> Self {
        GraphError::ElementNotFound {
            kind,
            id: format!("#{}", slot),
        }
    }
}

pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage with reuse; a slot's generation moves on each time it is
/// vacated.
#[derive(Debug, Clone)]
struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Arena<T> {
    fn new() -> Self {
        Arena {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// `(slot, generation)` the next insert will use
    fn vacant(&self) -> (u32, u32) {
        match self.free.last() {
            Some(&slot) => (slot, self.slots[slot as usize].generation),
            None => (self.slots.len() as u32, 0),
        }
    }

    fn insert(&mut self, value: T) -> (u32, u32) {
        match self.free.pop() {
            Some(slot) => {
                let entry = &mut self.slots[slot as usize];
                entry.value = Some(value);
                (slot, entry.generation)
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    value: Some(value),
                });
                (self.slots.len() as u32 - 1, 0)
            }
        }
    }

    fn get(&self, slot: u32, generation: u32) -> Option<&T> {
        self.slots
            .get(slot as usize)
            .filter(|s| s.generation == generation)
            .and_then(|s| s.value.as_ref())
    }

    fn get_mut(&mut self, slot: u32, generation: u32) -> Option<&mut T> {
        self.slots
            .get_mut(slot as usize)
            .filter(|s| s.generation == generation)
            .and_then(|s| s.value.as_mut())
    }

    fn remove(&mut self, slot: u32, generation: u32) -> Option<T> {
        let entry = self.slots.get_mut(slot as usize)?;
        if entry.generation != generation {
            return None;
        }
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(slot);
        Some(value)
    }

    /// Vacate every slot, keeping generations moving so old handles stay dead
    fn clear(&mut self) {
        for (i, entry) in self.slots.iter_mut().enumerate() {
            if entry.value.take().is_some() {
                entry.generation = entry.generation.wrapping_add(1);
                self.free.push(i as u32);
            }
        }
    }
}

/// Make room for one more entry, growing by the configured factor
fn ensure_room<T>(table: &mut Vec<T>, factor: f64) {
    if table.len() == table.capacity() {
        let target = grown_capacity(table.capacity(), factor);
        table.reserve_exact(target - table.len());
    }
}

fn graph_attribute_event(change: AttributeChange) -> EventKind {
    match change {
        AttributeChange::Added { key, value } => EventKind::GraphAttributeAdded { key, value },
        AttributeChange::Changed {
            key,
            old_value,
            new_value,
        } => EventKind::GraphAttributeChanged {
            key,
            old_value,
            new_value,
        },
        AttributeChange::Removed { key, .. } => EventKind::GraphAttributeRemoved { key },
    }
}

fn node_attribute_event(node_id: &str, change: AttributeChange) -> EventKind {
    let node_id = node_id.to_string();
    match change {
        AttributeChange::Added { key, value } => EventKind::NodeAttributeAdded {
            node_id,
            key,
            value,
        },
        AttributeChange::Changed {
            key,
            old_value,
            new_value,
        } => EventKind::NodeAttributeChanged {
            node_id,
            key,
            old_value,
            new_value,
        },
        AttributeChange::Removed { key, .. } => EventKind::NodeAttributeRemoved { node_id, key },
    }
}

fn edge_attribute_event(edge_id: &str, change: AttributeChange) -> EventKind {
    let edge_id = edge_id.to_string();
    match change {
        AttributeChange::Added { key, value } => EventKind::EdgeAttributeAdded {
            edge_id,
            key,
            value,
        },
        AttributeChange::Changed {
            key,
            old_value,
            new_value,
        } => EventKind::EdgeAttributeChanged {
            edge_id,
            key,
            old_value,
            new_value,
        },
        AttributeChange::Removed { key, .. } => EventKind::EdgeAttributeRemoved { edge_id, key },
    }
}

fn removed_value(change: Option<AttributeChange>) -> Option<AttributeValue> {
    match change {
        Some(AttributeChange::Removed { old_value, .. }) => Some(old_value),
        _ => None,
    }
}

/// In-memory graph storage
///
/// - nodes / edges: generational arenas holding the records
/// - node_table / edge_table: dense handle tables, `element.index` == position
/// - node_ids / edge_ids: id -> handle
pub struct GraphStore {
    id: String,
    config: GraphConfig,
    attributes: Attributes,
    step: f64,
    nodes: Arena<Node>,
    edges: Arena<Edge>,
    node_table: Vec<NodeHandle>,
    edge_table: Vec<EdgeHandle>,
    node_ids: FxHashMap<String, NodeHandle>,
    edge_ids: FxHashMap<String, EdgeHandle>,
    node_factory: NodeFactory,
    edge_factory: EdgeFactory,
    dispatcher: Dispatcher,
}

impl fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphStore")
            .field("id", &self.id)
            .field("node_count", &self.node_table.len())
            .field("edge_count", &self.edge_table.len())
            .field("strict_checking", &self.config.strict_checking)
            .field("auto_create", &self.config.auto_create)
            .finish()
    }
}

impl GraphStore {
    /// Create a new empty graph store with the default configuration
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_config(id, GraphConfig::default())
    }

    pub fn with_config(id: impl Into<String>, config: GraphConfig) -> Self {
        let id = id.into();
        GraphStore {
            dispatcher: Dispatcher::new(id.clone()),
            attributes: Attributes::with_mode(config.attribute_mode),
            step: 0.0,
            nodes: Arena::new(),
            edges: Arena::new(),
            node_table: Vec::with_capacity(config.initial_node_capacity),
            edge_table: Vec::with_capacity(config.initial_edge_capacity),
            node_ids: FxHashMap::default(),
            edge_ids: FxHashMap::default(),
            node_factory: default_node_factory(),
            edge_factory: default_edge_factory(),
            config,
            id,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn set_strict_checking(&mut self, strict: bool) {
        self.config.strict_checking = strict;
    }

    pub fn set_auto_create(&mut self, auto_create: bool) {
        self.config.auto_create = auto_create;
    }

    /// Factories must return an element carrying the requested id
    pub fn set_node_factory(&mut self, factory: NodeFactory) {
        self.node_factory = factory;
    }

    pub fn set_edge_factory(&mut self, factory: EdgeFactory) {
        self.edge_factory = factory;
    }

    // ---- events -------------------------------------------------------

    /// Drain the events produced since the last call
    pub fn take_events(&mut self) -> Vec<GraphEvent> {
        self.dispatcher.take_events()
    }

    pub fn pending_events(&self) -> &[GraphEvent] {
        self.dispatcher.pending()
    }

    /// Stop (or resume) queueing events. Logical time keeps advancing.
    pub fn set_event_recording(&mut self, recording: bool) {
        self.dispatcher.set_recording(recording);
    }

    pub fn is_recording_events(&self) -> bool {
        self.dispatcher.is_recording()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    // ---- structure ----------------------------------------------------

    /// Add a node. With strict checking an existing id is an error,
    /// otherwise the existing node is returned and nothing is emitted.
    pub fn add_node(&mut self, id: &str) -> GraphResult<NodeHandle> {
        if let Some(&handle) = self.node_ids.get(id) {
            if self.config.strict_checking {
                return Err(GraphError::DuplicateId {
                    kind: ElementKind::Node,
                    id: id.to_string(),
                });
            }
            return Ok(handle);
        }

        let ctx = NodeContext {
            graph_id: self.id.clone(),
            adjacency: self.config.adjacency,
            attribute_mode: self.config.attribute_mode,
        };
        let mut node = (self.node_factory)(id, &ctx);
        debug_assert_eq!(node.id(), id, "node factory changed the id");
        // factories that pre-populate attributes keep their own mode
        if node.attributes.is_empty() {
            node.attributes.set_mode(self.config.attribute_mode);
        }
        Ok(self.insert_node(id, node))
    }

    fn insert_node(&mut self, id: &str, mut node: Node) -> NodeHandle {
        ensure_room(&mut self.node_table, self.config.growth_factor);
        let index = self.node_table.len();
        let (slot, generation) = self.nodes.vacant();
        let handle = NodeHandle::new(slot, generation);
        node.attach(handle, index);

        let initial: Vec<(String, AttributeValue)> = node
            .attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();

        self.nodes.insert(node);
        self.node_table.push(handle);
        self.node_ids.insert(id.to_string(), handle);
        debug!(graph = %self.id, node = id, index, "node added");

        self.dispatcher.emit(EventKind::NodeAdded {
            node_id: id.to_string(),
        });
        for (key, value) in initial {
            self.dispatcher.emit(EventKind::NodeAttributeAdded {
                node_id: id.to_string(),
                key,
                value,
            });
        }
        handle
    }

    fn resolve_endpoint(&mut self, id: &str) -> GraphResult<NodeHandle> {
        if let Some(&handle) = self.node_ids.get(id) {
            return Ok(handle);
        }
        if self.config.creates_missing_endpoints() {
            trace!(graph = %self.id, node = id, "auto-creating endpoint");
            self.add_node(id)
        } else {
            Err(GraphError::node_not_found(id))
        }
    }

    /// Add an edge between two nodes.
    ///
    /// Missing endpoints are created when `auto_create` is set and strict
    /// checking is off. A simple-graph endpoint refusing a parallel edge
    /// rolls back the whole insertion.
    pub fn add_edge(
        &mut self,
        id: &str,
        from_id: &str,
        to_id: &str,
        directed: bool,
    ) -> GraphResult<EdgeHandle> {
        if let Some(&handle) = self.edge_ids.get(id) {
            if self.config.strict_checking {
                return Err(GraphError::DuplicateId {
                    kind: ElementKind::Edge,
                    id: id.to_string(),
                });
            }
            return Ok(handle);
        }

        let source = self.resolve_endpoint(from_id)?;
        let target = self.resolve_endpoint(to_id)?;

        let mut edge = {
            let source_node = self.node_entry(source)?;
            let target_node = self.node_entry(target)?;
            (self.edge_factory)(id, source_node, target_node, directed)
        };
        debug_assert_eq!(edge.id(), id, "edge factory changed the id");
        // same rule as for nodes
        if edge.attributes.is_empty() {
            edge.attributes.set_mode(self.config.attribute_mode);
        }

        let (slot, generation) = self.edges.vacant();
        let handle = EdgeHandle::new(slot, generation);
        edge.attach(handle, self.edge_table.len());
        let shape = edge.shape();

        let duplicate = || GraphError::DuplicateEdge {
            edge_id: id.to_string(),
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
        };
        if !self.node_entry_mut(source)?.adjacency.add_edge(&shape) {
            return Err(duplicate());
        }
        if !shape.is_loop() && !self.node_entry_mut(target)?.adjacency.add_edge(&shape) {
            self.node_entry_mut(source)?.adjacency.remove_edge(&shape);
            return Err(duplicate());
        }

        let initial: Vec<(String, AttributeValue)> = edge
            .attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();

        ensure_room(&mut self.edge_table, self.config.growth_factor);
        self.edges.insert(edge);
        self.edge_table.push(handle);
        self.edge_ids.insert(id.to_string(), handle);
        debug!(graph = %self.id, edge = id, from = from_id, to = to_id, directed, "edge added");

        self.dispatcher.emit(EventKind::EdgeAdded {
            edge_id: id.to_string(),
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            directed,
        });
        for (key, value) in initial {
            self.dispatcher.emit(EventKind::EdgeAttributeAdded {
                edge_id: id.to_string(),
                key,
                value,
            });
        }
        Ok(handle)
    }

    /// Add an edge under a generated id: `from->to` for directed edges,
    /// `from--to` otherwise, suffixed with `#n` when taken.
    pub fn add_edge_between(
        &mut self,
        from_id: &str,
        to_id: &str,
        directed: bool,
    ) -> GraphResult<EdgeHandle> {
        let id = self.generate_edge_id(from_id, to_id, directed);
        self.add_edge(&id, from_id, to_id, directed)
    }

    pub fn generate_edge_id(&self, from_id: &str, to_id: &str, directed: bool) -> String {
        let base = format!("{}{}{}", from_id, if directed { "->" } else { "--" }, to_id);
        if !self.edge_ids.contains_key(&base) {
            return base;
        }
        (1u64..)
            .map(|n| format!("{}#{}", base, n))
            .find(|candidate| !self.edge_ids.contains_key(candidate))
            .unwrap_or(base)
    }

    /// Delete a node and, first, every edge incident to it
    pub fn remove_node(&mut self, id: &str) -> GraphResult<Node> {
        let handle = *self
            .node_ids
            .get(id)
            .ok_or_else(|| GraphError::node_not_found(id))?;
        self.remove_node_by_handle(handle)
    }

    pub fn remove_node_by_handle(&mut self, handle: NodeHandle) -> GraphResult<Node> {
        loop {
            let last = self.node_entry(handle)?.adjacency.edges().last().copied();
            match last {
                Some(edge) => {
                    self.remove_edge_by_handle(edge)?;
                }
                None => break,
            }
        }

        let node = self
            .nodes
            .remove(handle.slot, handle.generation)
            .ok_or_else(|| GraphError::stale(ElementKind::Node, handle.slot()))?;
        let index = node.index;
        self.node_table.swap_remove(index);
        if let Some(&moved) = self.node_table.get(index) {
            if let Some(moved_node) = self.nodes.get_mut(moved.slot, moved.generation) {
                moved_node.index = index;
            }
        }
        self.node_ids.remove(node.id());
        debug!(graph = %self.id, node = node.id(), index, "node removed");

        self.dispatcher.emit(EventKind::NodeRemoved {
            node_id: node.id().to_string(),
        });
        Ok(node)
    }

    /// Delete an edge, detaching it from its endpoints
    pub fn remove_edge(&mut self, id: &str) -> GraphResult<Edge> {
        let handle = *self
            .edge_ids
            .get(id)
            .ok_or_else(|| GraphError::edge_not_found(id))?;
        self.remove_edge_by_handle(handle)
    }

    pub fn remove_edge_by_handle(&mut self, handle: EdgeHandle) -> GraphResult<Edge> {
        let shape = self.edge_entry(handle)?.shape();
        self.node_entry_mut(shape.source)?.adjacency.remove_edge(&shape);
        if !shape.is_loop() {
            self.node_entry_mut(shape.target)?.adjacency.remove_edge(&shape);
        }

        let edge = self
            .edges
            .remove(handle.slot, handle.generation)
            .ok_or_else(|| GraphError::stale(ElementKind::Edge, handle.slot()))?;
        let index = edge.index;
        self.edge_table.swap_remove(index);
        if let Some(&moved) = self.edge_table.get(index) {
            if let Some(moved_edge) = self.edges.get_mut(moved.slot, moved.generation) {
                moved_edge.index = index;
            }
        }
        self.edge_ids.remove(edge.id());
        debug!(graph = %self.id, edge = edge.id(), index, "edge removed");

        self.dispatcher.emit(EventKind::EdgeRemoved {
            edge_id: edge.id().to_string(),
        });
        Ok(edge)
    }

    /// Remove every node, edge and graph attribute; emits a single
    /// `GraphCleared`.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.node_table.clear();
        self.edge_table.clear();
        self.node_ids.clear();
        self.edge_ids.clear();
        self.attributes.clear();
        self.step = 0.0;
        debug!(graph = %self.id, "graph cleared");
        self.dispatcher.emit(EventKind::GraphCleared);
    }

    /// Mark the beginning of a new time step
    pub fn step_begins(&mut self, step: f64) {
        self.step = step;
        self.dispatcher.emit(EventKind::StepBegins { step });
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    // ---- access -------------------------------------------------------

    fn node_entry(&self, handle: NodeHandle) -> GraphResult<&Node> {
        self.nodes
            .get(handle.slot, handle.generation)
            .ok_or_else(|| GraphError::stale(ElementKind::Node, handle.slot()))
    }

    fn node_entry_mut(&mut self, handle: NodeHandle) -> GraphResult<&mut Node> {
        self.nodes
            .get_mut(handle.slot, handle.generation)
            .ok_or_else(|| GraphError::stale(ElementKind::Node, handle.slot()))
    }

    fn edge_entry(&self, handle: EdgeHandle) -> GraphResult<&Edge> {
        self.edges
            .get(handle.slot, handle.generation)
            .ok_or_else(|| GraphError::stale(ElementKind::Edge, handle.slot()))
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_ids
            .get(id)
            .and_then(|h| self.nodes.get(h.slot, h.generation))
    }

    /// Node at a position of the dense table
    pub fn node_at(&self, index: usize) -> GraphResult<&Node> {
        let handle = self.node_table.get(index).ok_or(GraphError::IndexOutOfRange {
            kind: ElementKind::Node,
            index,
            count: self.node_table.len(),
        })?;
        self.node_entry(*handle)
    }

    /// `None` once the node has been removed
    pub fn node_by_handle(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle.slot, handle.generation)
    }

    pub fn node_handle(&self, id: &str) -> Option<NodeHandle> {
        self.node_ids.get(id).copied()
    }

    pub(crate) fn node_handle_at(&self, index: usize) -> Option<NodeHandle> {
        self.node_table.get(index).copied()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_ids.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.node_table.len()
    }

    /// Nodes in dense-table order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.node_table
            .iter()
            .filter_map(move |h| self.nodes.get(h.slot, h.generation))
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes().map(Node::id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edge_ids
            .get(id)
            .and_then(|h| self.edges.get(h.slot, h.generation))
    }

    /// Edge at a position of the dense table
    pub fn edge_at(&self, index: usize) -> GraphResult<&Edge> {
        let handle = self.edge_table.get(index).ok_or(GraphError::IndexOutOfRange {
            kind: ElementKind::Edge,
            index,
            count: self.edge_table.len(),
        })?;
        self.edge_entry(*handle)
    }

    /// `None` once the edge has been removed
    pub fn edge_by_handle(&self, handle: EdgeHandle) -> Option<&Edge> {
        self.edges.get(handle.slot, handle.generation)
    }

    pub fn edge_handle(&self, id: &str) -> Option<EdgeHandle> {
        self.edge_ids.get(id).copied()
    }

    pub(crate) fn edge_handle_at(&self, index: usize) -> Option<EdgeHandle> {
        self.edge_table.get(index).copied()
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.edge_ids.contains_key(id)
    }

    pub fn edge_count(&self) -> usize {
        self.edge_table.len()
    }

    /// Edges in dense-table order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edge_table
            .iter()
            .filter_map(move |h| self.edges.get(h.slot, h.generation))
    }

    fn resolve_edges(&self, handles: &[EdgeHandle]) -> Vec<&Edge> {
        handles
            .iter()
            .filter_map(|h| self.edges.get(h.slot, h.generation))
            .collect()
    }

    fn node_pair(&self, node_id: &str, other_id: &str) -> Option<(&Node, NodeHandle)> {
        Some((self.node(node_id)?, self.node_handle(other_id)?))
    }

    /// Any edge connecting the two nodes
    pub fn edge_between(&self, node_id: &str, other_id: &str) -> Option<&Edge> {
        let (node, other) = self.node_pair(node_id, other_id)?;
        node.adjacency
            .edge_between(other)
            .and_then(|h| self.edge_by_handle(h))
    }

    /// An edge leading from `other_id` into `node_id`
    pub fn edge_from(&self, node_id: &str, other_id: &str) -> Option<&Edge> {
        let (node, other) = self.node_pair(node_id, other_id)?;
        node.adjacency
            .edge_from(other)
            .and_then(|h| self.edge_by_handle(h))
    }

    /// An edge leading from `node_id` to `other_id`
    pub fn edge_toward(&self, node_id: &str, other_id: &str) -> Option<&Edge> {
        let (node, other) = self.node_pair(node_id, other_id)?;
        node.adjacency
            .edge_toward(other)
            .and_then(|h| self.edge_by_handle(h))
    }

    /// Every edge connecting the two nodes, whatever the direction
    pub fn edges_between(&self, node_id: &str, other_id: &str) -> Vec<&Edge> {
        match self.node_pair(node_id, other_id) {
            Some((node, other)) => self.resolve_edges(&node.adjacency.edges_between(other)),
            None => Vec::new(),
        }
    }

    pub fn entering_edges(&self, node_id: &str) -> GraphResult<Vec<&Edge>> {
        let node = self.node(node_id).ok_or_else(|| GraphError::node_not_found(node_id))?;
        Ok(self.resolve_edges(node.entering_edges()))
    }

    pub fn leaving_edges(&self, node_id: &str) -> GraphResult<Vec<&Edge>> {
        let node = self.node(node_id).ok_or_else(|| GraphError::node_not_found(node_id))?;
        Ok(self.resolve_edges(node.leaving_edges()))
    }

    /// Distinct nodes sharing an edge with `node_id`
    pub fn neighbors(&self, node_id: &str) -> GraphResult<Vec<&Node>> {
        let node = self.node(node_id).ok_or_else(|| GraphError::node_not_found(node_id))?;
        Ok(node
            .adjacency
            .neighbors()
            .into_iter()
            .filter_map(|h| self.node_by_handle(h))
            .collect())
    }

    // ---- attributes ---------------------------------------------------

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn graph_attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn set_graph_attribute(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        for change in self.attributes.set(key, value.into()) {
            self.dispatcher.emit(graph_attribute_event(change));
        }
    }

    pub fn remove_graph_attribute(&mut self, key: &str) -> Option<AttributeValue> {
        let change = self.attributes.remove(key);
        if let Some(change) = &change {
            self.dispatcher.emit(graph_attribute_event(change.clone()));
        }
        removed_value(change)
    }

    pub fn set_node_attribute(
        &mut self,
        node_id: &str,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> GraphResult<()> {
        let handle = self
            .node_handle(node_id)
            .ok_or_else(|| GraphError::node_not_found(node_id))?;
        let changes = self.node_entry_mut(handle)?.attributes.set(key, value.into());
        for change in changes {
            self.dispatcher.emit(node_attribute_event(node_id, change));
        }
        Ok(())
    }

    /// Returns the removed value; removing an absent key emits nothing
    pub fn remove_node_attribute(&mut self, node_id: &str, key: &str) -> GraphResult<Option<AttributeValue>> {
        let handle = self
            .node_handle(node_id)
            .ok_or_else(|| GraphError::node_not_found(node_id))?;
        let change = self.node_entry_mut(handle)?.attributes.remove(key);
        if let Some(change) = &change {
            self.dispatcher.emit(node_attribute_event(node_id, change.clone()));
        }
        Ok(removed_value(change))
    }

    pub fn set_edge_attribute(
        &mut self,
        edge_id: &str,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> GraphResult<()> {
        let handle = self
            .edge_handle(edge_id)
            .ok_or_else(|| GraphError::edge_not_found(edge_id))?;
        let edge = self
            .edges
            .get_mut(handle.slot, handle.generation)
            .ok_or_else(|| GraphError::edge_not_found(edge_id))?;
        let changes = edge.attributes.set(key, value.into());
        for change in changes {
            self.dispatcher.emit(edge_attribute_event(edge_id, change));
        }
        Ok(())
    }

    pub fn remove_edge_attribute(&mut self, edge_id: &str, key: &str) -> GraphResult<Option<AttributeValue>> {
        let handle = self
            .edge_handle(edge_id)
            .ok_or_else(|| GraphError::edge_not_found(edge_id))?;
        let edge = self
            .edges
            .get_mut(handle.slot, handle.generation)
            .ok_or_else(|| GraphError::edge_not_found(edge_id))?;
        let change = edge.attributes.remove(key);
        if let Some(change) = &change {
            self.dispatcher.emit(edge_attribute_event(edge_id, change.clone()));
        }
        Ok(removed_value(change))
    }

    // ---- received events ----------------------------------------------

    /// Apply an event received from another source.
    ///
    /// Returns `Ok(false)` when the event is stale or an echo of something
    /// this store already saw. The change it drives is re-emitted under the
    /// event's own origin and time; anything else the mutation causes is
    /// emitted as a new local event.
    pub fn apply(&mut self, event: &GraphEvent) -> GraphResult<bool> {
        if !self.dispatcher.accept(&event.source_id, event.time_id) {
            trace!(
                graph = %self.id,
                source = %event.source_id,
                time = event.time_id,
                event = event.kind.name(),
                "dropping stale event"
            );
            return Ok(false);
        }
        let mut scope = ApplyScope::enter(self, event);
        scope.apply_kind(&event.kind)?;
        Ok(true)
    }

    fn apply_kind(&mut self, kind: &EventKind) -> GraphResult<()> {
        use EventKind::*;
        match kind {
            NodeAdded { node_id } => self.add_node(node_id).map(drop),
            NodeRemoved { node_id } => self.remove_node(node_id).map(drop),
            EdgeAdded {
                edge_id,
                from_id,
                to_id,
                directed,
            } => self.add_edge(edge_id, from_id, to_id, *directed).map(drop),
            EdgeRemoved { edge_id } => self.remove_edge(edge_id).map(drop),
            GraphCleared => {
                self.clear();
                Ok(())
            }
            StepBegins { step } => {
                self.step_begins(*step);
                Ok(())
            }
            GraphAttributeAdded { key, value }
            | GraphAttributeChanged {
                key,
                new_value: value,
                ..
            } => {
                self.set_graph_attribute(key.clone(), value.clone());
                Ok(())
            }
            GraphAttributeRemoved { key } => {
                self.remove_graph_attribute(key);
                Ok(())
            }
            NodeAttributeAdded {
                node_id,
                key,
                value,
            }
            | NodeAttributeChanged {
                node_id,
                key,
                new_value: value,
                ..
            } => self.set_node_attribute(node_id, key.clone(), value.clone()),
            NodeAttributeRemoved { node_id, key } => self.remove_node_attribute(node_id, key).map(drop),
            EdgeAttributeAdded {
                edge_id,
                key,
                value,
            }
            | EdgeAttributeChanged {
                edge_id,
                key,
                new_value: value,
                ..
            } => self.set_edge_attribute(edge_id, key.clone(), value.clone()),
            EdgeAttributeRemoved { edge_id, key } => self.remove_edge_attribute(edge_id, key).map(drop),
        }
    }
}

/// Marks a store as applying a received event for as long as it lives; the
/// mark is lifted on drop, whichever way the mutation ends.
struct ApplyScope<'a> {
    store: &'a mut GraphStore,
}

impl<'a> ApplyScope<'a> {
    fn enter(store: &'a mut GraphStore, event: &GraphEvent) -> Self {
        store.dispatcher.begin_apply(event);
        ApplyScope { store }
    }
}

impl Deref for ApplyScope<'_> {
    type Target = GraphStore;

    fn deref(&self) -> &GraphStore {
        self.store
    }
}

impl DerefMut for ApplyScope<'_> {
    fn deref_mut(&mut self) -> &mut GraphStore {
        self.store
    }
}

impl Drop for ApplyScope<'_> {
    fn drop(&mut self) {
        self.store.dispatcher.end_apply();
    }
}
