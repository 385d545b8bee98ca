//! Per-node adjacency: a zone-partitioned edge list plus a neighbor index
//!
//! A node's incident edges live in one array split into three contiguous
//! zones:
//!
//! ```text
//!   [0, io_start)          entering only   directed edges targeting this node
//!   [io_start, o_start)    mutual          undirected edges and loops
//!   [o_start, degree)      leaving only    directed edges leaving this node
//! ```
//!
//! so that entering edges are `[0, o_start)` and leaving edges are
//! `[io_start, degree)`. Insertion and removal keep the partition with at
//! most three element swaps, never rescanning the array. Each edge's
//! position is tracked, so removal starts from it directly.
//!
//! The neighbor index answers "edge between this node and X" in O(1) and is
//! either [`AdjacencyKind::Single`] (one edge per direction per neighbor,
//! parallel edges rejected) or [`AdjacencyKind::Multi`].

use super::config::grown_capacity;
use super::types::{AdjacencyKind, EdgeHandle, NodeHandle};
use rustc_hash::FxHashMap;

/// Zone an edge occupies in one endpoint's adjacency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    Entering,
    Mutual,
    Leaving,
}

impl Zone {
    /// True if the edge can be followed from the opposite node to this one
    pub fn is_entering(self) -> bool {
        matches!(self, Zone::Entering | Zone::Mutual)
    }

    /// True if the edge can be followed from this node to the opposite one
    pub fn is_leaving(self) -> bool {
        matches!(self, Zone::Leaving | Zone::Mutual)
    }
}

/// What adjacency needs to know about an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EdgeShape {
    pub handle: EdgeHandle,
    pub source: NodeHandle,
    pub target: NodeHandle,
    pub directed: bool,
}

impl EdgeShape {
    pub fn is_loop(&self) -> bool {
        self.source == self.target
    }

    pub fn zone_for(&self, node: NodeHandle) -> Zone {
        if !self.directed || self.is_loop() {
            Zone::Mutual
        } else if self.source == node {
            Zone::Leaving
        } else {
            Zone::Entering
        }
    }

    pub fn opposite(&self, node: NodeHandle) -> NodeHandle {
        if self.source == node {
            self.target
        } else {
            self.source
        }
    }
}

trait NeighborLookup {
    /// Register an edge toward `opposite`; false if it is refused
    fn insert(&mut self, opposite: NodeHandle, edge: EdgeHandle, zone: Zone) -> bool;
    fn remove(&mut self, opposite: NodeHandle, edge: EdgeHandle);
    fn between(&self, opposite: NodeHandle) -> Option<EdgeHandle>;
    fn from(&self, opposite: NodeHandle) -> Option<EdgeHandle>;
    fn toward(&self, opposite: NodeHandle) -> Option<EdgeHandle>;
    fn all_between(&self, opposite: NodeHandle) -> Vec<EdgeHandle>;
    fn neighbors(&self) -> Vec<NodeHandle>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct EdgePair {
    entering: Option<EdgeHandle>,
    leaving: Option<EdgeHandle>,
}

/// At most one entering and one leaving edge per neighbor
#[derive(Debug, Clone, Default)]
struct SingleEdgeIndex {
    pairs: FxHashMap<NodeHandle, EdgePair>,
}

impl NeighborLookup for SingleEdgeIndex {
    fn insert(&mut self, opposite: NodeHandle, edge: EdgeHandle, zone: Zone) -> bool {
        let pair = self.pairs.entry(opposite).or_default();
        let accepted = match zone {
            Zone::Entering if pair.entering.is_none() => {
                pair.entering = Some(edge);
                true
            }
            Zone::Leaving if pair.leaving.is_none() => {
                pair.leaving = Some(edge);
                true
            }
            Zone::Mutual if pair.entering.is_none() && pair.leaving.is_none() => {
                pair.entering = Some(edge);
                pair.leaving = Some(edge);
                true
            }
            _ => false,
        };
        if !accepted && *pair == EdgePair::default() {
            self.pairs.remove(&opposite);
        }
        accepted
    }

    fn remove(&mut self, opposite: NodeHandle, edge: EdgeHandle) {
        if let Some(pair) = self.pairs.get_mut(&opposite) {
            if pair.entering == Some(edge) {
                pair.entering = None;
            }
            if pair.leaving == Some(edge) {
                pair.leaving = None;
            }
            if *pair == EdgePair::default() {
                self.pairs.remove(&opposite);
            }
        }
    }

    fn between(&self, opposite: NodeHandle) -> Option<EdgeHandle> {
        self.pairs
            .get(&opposite)
            .and_then(|pair| pair.leaving.or(pair.entering))
    }

    fn from(&self, opposite: NodeHandle) -> Option<EdgeHandle> {
        self.pairs.get(&opposite).and_then(|pair| pair.entering)
    }

    fn toward(&self, opposite: NodeHandle) -> Option<EdgeHandle> {
        self.pairs.get(&opposite).and_then(|pair| pair.leaving)
    }

    fn all_between(&self, opposite: NodeHandle) -> Vec<EdgeHandle> {
        match self.pairs.get(&opposite) {
            Some(EdgePair {
                entering: Some(a),
                leaving: Some(b),
            }) if a != b => vec![*a, *b],
            Some(pair) => pair.entering.or(pair.leaving).into_iter().collect(),
            None => Vec::new(),
        }
    }

    fn neighbors(&self) -> Vec<NodeHandle> {
        self.pairs.keys().copied().collect()
    }
}

/// Every edge toward each neighbor, in insertion order
#[derive(Debug, Clone, Default)]
struct MultiEdgeIndex {
    lists: FxHashMap<NodeHandle, Vec<(EdgeHandle, Zone)>>,
}

impl NeighborLookup for MultiEdgeIndex {
    fn insert(&mut self, opposite: NodeHandle, edge: EdgeHandle, zone: Zone) -> bool {
        self.lists.entry(opposite).or_default().push((edge, zone));
        true
    }

    fn remove(&mut self, opposite: NodeHandle, edge: EdgeHandle) {
        if let Some(list) = self.lists.get_mut(&opposite) {
            list.retain(|(e, _)| *e != edge);
            if list.is_empty() {
                self.lists.remove(&opposite);
            }
        }
    }

    fn between(&self, opposite: NodeHandle) -> Option<EdgeHandle> {
        self.lists
            .get(&opposite)
            .and_then(|list| list.first())
            .map(|(e, _)| *e)
    }

    fn from(&self, opposite: NodeHandle) -> Option<EdgeHandle> {
        self.lists.get(&opposite).and_then(|list| {
            list.iter()
                .find(|(_, zone)| zone.is_entering())
                .map(|(e, _)| *e)
        })
    }

    fn toward(&self, opposite: NodeHandle) -> Option<EdgeHandle> {
        self.lists.get(&opposite).and_then(|list| {
            list.iter()
                .find(|(_, zone)| zone.is_leaving())
                .map(|(e, _)| *e)
        })
    }

    fn all_between(&self, opposite: NodeHandle) -> Vec<EdgeHandle> {
        self.lists
            .get(&opposite)
            .map(|list| list.iter().map(|(e, _)| *e).collect())
            .unwrap_or_default()
    }

    fn neighbors(&self) -> Vec<NodeHandle> {
        self.lists.keys().copied().collect()
    }
}

#[derive(Debug, Clone)]
enum NeighborIndex {
    Single(SingleEdgeIndex),
    Multi(MultiEdgeIndex),
}

impl NeighborIndex {
    fn new(kind: AdjacencyKind) -> Self {
        match kind {
            AdjacencyKind::Single => NeighborIndex::Single(SingleEdgeIndex::default()),
            AdjacencyKind::Multi => NeighborIndex::Multi(MultiEdgeIndex::default()),
        }
    }

    fn kind(&self) -> AdjacencyKind {
        match self {
            NeighborIndex::Single(_) => AdjacencyKind::Single,
            NeighborIndex::Multi(_) => AdjacencyKind::Multi,
        }
    }

    fn lookup(&self) -> &dyn NeighborLookup {
        match self {
            NeighborIndex::Single(index) => index,
            NeighborIndex::Multi(index) => index,
        }
    }

    fn lookup_mut(&mut self) -> &mut dyn NeighborLookup {
        match self {
            NeighborIndex::Single(index) => index,
            NeighborIndex::Multi(index) => index,
        }
    }
}

/// Incident edges of one node
#[derive(Debug, Clone)]
pub struct NodeAdjacency {
    owner: NodeHandle,
    edges: Vec<EdgeHandle>,
    positions: FxHashMap<EdgeHandle, usize>,
    io_start: usize,
    o_start: usize,
    index: NeighborIndex,
}

impl NodeAdjacency {
    pub(crate) fn new(owner: NodeHandle, kind: AdjacencyKind) -> Self {
        NodeAdjacency {
            owner,
            edges: Vec::new(),
            positions: FxHashMap::default(),
            io_start: 0,
            o_start: 0,
            index: NeighborIndex::new(kind),
        }
    }

    pub(crate) fn set_owner(&mut self, owner: NodeHandle) {
        self.owner = owner;
    }

    pub fn kind(&self) -> AdjacencyKind {
        self.index.kind()
    }

    pub fn degree(&self) -> usize {
        self.edges.len()
    }

    /// Entering-only plus mutual edges
    pub fn in_degree(&self) -> usize {
        self.o_start
    }

    /// Mutual plus leaving-only edges
    pub fn out_degree(&self) -> usize {
        self.edges.len() - self.io_start
    }

    /// `(io_start, o_start, degree)`
    pub fn boundaries(&self) -> (usize, usize, usize) {
        (self.io_start, self.o_start, self.edges.len())
    }

    pub fn capacity(&self) -> usize {
        self.edges.capacity()
    }

    pub fn edge_at(&self, i: usize) -> Option<EdgeHandle> {
        self.edges.get(i).copied()
    }

    pub fn entering_edge_at(&self, i: usize) -> Option<EdgeHandle> {
        if i < self.o_start {
            Some(self.edges[i])
        } else {
            None
        }
    }

    pub fn leaving_edge_at(&self, i: usize) -> Option<EdgeHandle> {
        self.edges.get(self.io_start + i).copied()
    }

    pub fn edges(&self) -> &[EdgeHandle] {
        &self.edges
    }

    pub fn entering_edges(&self) -> &[EdgeHandle] {
        &self.edges[..self.o_start]
    }

    pub fn leaving_edges(&self) -> &[EdgeHandle] {
        &self.edges[self.io_start..]
    }

    /// Zone of the edge stored at position `i`
    pub fn zone_at(&self, i: usize) -> Option<Zone> {
        if i >= self.edges.len() {
            None
        } else if i < self.io_start {
            Some(Zone::Entering)
        } else if i < self.o_start {
            Some(Zone::Mutual)
        } else {
            Some(Zone::Leaving)
        }
    }

    /// Any edge connecting this node and `opposite`
    pub fn edge_between(&self, opposite: NodeHandle) -> Option<EdgeHandle> {
        self.index.lookup().between(opposite)
    }

    /// An edge that can be followed from `opposite` to this node
    pub fn edge_from(&self, opposite: NodeHandle) -> Option<EdgeHandle> {
        self.index.lookup().from(opposite)
    }

    /// An edge that can be followed from this node to `opposite`
    pub fn edge_toward(&self, opposite: NodeHandle) -> Option<EdgeHandle> {
        self.index.lookup().toward(opposite)
    }

    pub fn edges_between(&self, opposite: NodeHandle) -> Vec<EdgeHandle> {
        self.index.lookup().all_between(opposite)
    }

    pub fn neighbors(&self) -> Vec<NodeHandle> {
        self.index.lookup().neighbors()
    }

    /// Register an incident edge. Returns false, leaving the adjacency
    /// untouched, when the neighbor index refuses it.
    pub(crate) fn add_edge(&mut self, shape: &EdgeShape) -> bool {
        let zone = shape.zone_for(self.owner);
        let opposite = shape.opposite(self.owner);
        if !self.index.lookup_mut().insert(opposite, shape.handle, zone) {
            return false;
        }

        // per-node lists always grow by the fixed default factor;
        // GraphConfig::growth_factor only drives the dense element tables
        if self.edges.len() == self.edges.capacity() {
            let target = grown_capacity(self.edges.capacity(), super::config::DEFAULT_GROWTH_FACTOR);
            self.edges.reserve_exact(target - self.edges.len());
        }

        self.edges.push(shape.handle);
        let last = self.edges.len() - 1;
        self.positions.insert(shape.handle, last);
        match zone {
            Zone::Leaving => {}
            Zone::Mutual => {
                self.swap(self.o_start, last);
                self.o_start += 1;
            }
            Zone::Entering => {
                self.swap(self.o_start, last);
                self.swap(self.io_start, self.o_start);
                self.io_start += 1;
                self.o_start += 1;
            }
        }
        true
    }

    /// Detach an incident edge. Returns false if it was not registered here.
    pub(crate) fn remove_edge(&mut self, shape: &EdgeShape) -> bool {
        let Some(&i) = self.positions.get(&shape.handle) else {
            return false;
        };
        debug_assert_eq!(self.zone_at(i), Some(shape.zone_for(self.owner)));
        self.remove_at(i);
        self.index
            .lookup_mut()
            .remove(shape.opposite(self.owner), shape.handle);
        true
    }

    fn remove_at(&mut self, mut i: usize) {
        if i < self.io_start {
            self.io_start -= 1;
            self.swap(i, self.io_start);
            i = self.io_start;
        }
        if i < self.o_start {
            self.o_start -= 1;
            self.swap(i, self.o_start);
            i = self.o_start;
        }
        let last = self.edges.len() - 1;
        self.swap(i, last);
        if let Some(removed) = self.edges.pop() {
            self.positions.remove(&removed);
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.edges.swap(a, b);
        self.positions.insert(self.edges[a], a);
        self.positions.insert(self.edges[b], b);
    }
}
