//! Generic directed graph
//!
//! A thin wrapper over petgraph that keys nodes by value, makes node and
//! edge insertion idempotent, and reports cycles from `topological_sort`.

use std::collections::HashMap;
use std::hash::Hash;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph as PetGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// No topological order exists; `node` lies on a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleDetected<N> {
    pub node: N,
}

/// Directed graph over copyable node identities
#[derive(Debug, Clone)]
pub struct DiGraph<N> {
    inner: PetGraph<N, ()>,
    index: HashMap<N, NodeIndex>,
}

impl<N: Copy + Eq + Hash> DiGraph<N> {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self {
            inner: PetGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Add a node; returns false if it was already present
    pub fn add_node(&mut self, node: N) -> bool {
        if self.index.contains_key(&node) {
            return false;
        }
        let idx = self.inner.add_node(node);
        self.index.insert(node, idx);
        true
    }

    /// Add an edge, inserting missing endpoints; parallel edges collapse
    pub fn add_edge(&mut self, from: N, to: N) {
        self.add_node(from);
        self.add_node(to);
        let (a, b) = (self.index[&from], self.index[&to]);
        self.inner.update_edge(a, b, ());
    }

    /// Whether the node is present
    pub fn contains_node(&self, node: N) -> bool {
        self.index.contains_key(&node)
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = N> + '_ {
        self.inner.node_indices().map(move |idx| self.inner[idx])
    }

    /// Edges as (source, target) pairs, in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (N, N)> + '_ {
        self.inner
            .edge_references()
            .map(move |e| (self.inner[e.source()], self.inner[e.target()]))
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Number of edges entering `node` (zero for unknown nodes)
    pub fn in_degree(&self, node: N) -> usize {
        self.neighbors(node, Direction::Incoming).len()
    }

    /// Nodes with an edge into `node`
    pub fn predecessors(&self, node: N) -> Vec<N> {
        self.neighbors(node, Direction::Incoming)
    }

    /// Nodes `node` has an edge into
    pub fn successors(&self, node: N) -> Vec<N> {
        self.neighbors(node, Direction::Outgoing)
    }

    /// Order nodes so that every edge points forward
    pub fn topological_sort(&self) -> Result<Vec<N>, CycleDetected<N>> {
        toposort(&self.inner, None)
            .map(|order| order.into_iter().map(|idx| self.inner[idx]).collect())
            .map_err(|cycle| CycleDetected {
                node: self.inner[cycle.node_id()],
            })
    }

    fn neighbors(&self, node: N, direction: Direction) -> Vec<N> {
        match self.index.get(&node) {
            Some(&idx) => self
                .inner
                .neighbors_directed(idx, direction)
                .map(|n| self.inner[n])
                .collect(),
            None => Vec::new(),
        }
    }
}

impl<N: Copy + Eq + Hash> Default for DiGraph<N> {
    fn default() -> Self {
        Self::new()
    }
}
