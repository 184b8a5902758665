//! Directed routing graph over the logical street table.
//!
//! # Data layout
//!
//! Outgoing links use **Compressed Sparse Row (CSR)** format.  Node indices
//! of a state are mapped to compact positions `0..n` in first-seen order;
//! the outgoing links of position `p` occupy
//!
//! ```text
//! link_to[ node_out_start[p] .. node_out_start[p+1] ]
//! ```
//!
//! Edges contribute a link in both directions, arcs only `from → to`.  Every
//! link remembers the `StreetId` it came from so routes can be reported as
//! street sequences.

use rustc_hash::FxHashMap;

use mcgrp_core::{GraphState, LinkKind, NodeIndex, StreetId};

// ── RoadGraph ────────────────────────────────────────────────────────────────

/// Do not construct directly; use [`RoadGraphBuilder`] or
/// [`RoadGraph::from_state`].
pub struct RoadGraph {
    /// Node index at each compact position.
    pub nodes: Vec<NodeIndex>,

    position: FxHashMap<NodeIndex, u32>,

    /// CSR row pointer, length `node_count + 1`.
    pub node_out_start: Vec<u32>,

    /// Source position of each link.
    pub link_from: Vec<u32>,

    /// Destination position of each link.
    pub link_to: Vec<u32>,

    /// Traversal cost in seconds.
    pub link_cost: Vec<u32>,

    pub link_street: Vec<StreetId>,
}

impl RoadGraph {
    /// Edges both ways and arcs one way, weighted by `traversal_cost`.
    /// Streets missing either endpoint are skipped.
    pub fn from_state(state: &GraphState) -> Self {
        let mut b = RoadGraphBuilder::with_capacity(state.nodes.len(), state.streets.len() * 2);
        for street in &state.streets {
            let (Some(from), Some(to)) = (street.from_node, street.to_node) else {
                continue;
            };
            match street.link_kind() {
                LinkKind::Edge => b.add_road(from, to, street.traversal_cost, street.id),
                LinkKind::Arc => b.add_directed(from, to, street.traversal_cost, street.id),
            }
        }
        b.build()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.link_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Compact position of `node`, if it has any link.
    #[inline]
    pub fn position(&self, node: NodeIndex) -> Option<usize> {
        self.position.get(&node).map(|&p| p as usize)
    }

    /// Link ids leaving the node at compact position `pos`.
    #[inline]
    pub fn out_links(&self, pos: usize) -> std::ops::Range<usize> {
        self.node_out_start[pos] as usize..self.node_out_start[pos + 1] as usize
    }

    pub fn out_degree(&self, node: NodeIndex) -> usize {
        self.position(node).map_or(0, |p| self.out_links(p).len())
    }
}

// ── RoadGraphBuilder ─────────────────────────────────────────────────────────

pub struct RoadGraphBuilder {
    nodes:     Vec<NodeIndex>,
    position:  FxHashMap<NodeIndex, u32>,
    raw_links: Vec<RawLink>,
}

struct RawLink {
    from:   u32,
    to:     u32,
    cost:   u32,
    street: StreetId,
}

impl RoadGraphBuilder {
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    pub fn with_capacity(nodes: usize, links: usize) -> Self {
        Self {
            nodes:     Vec::with_capacity(nodes),
            position:  FxHashMap::default(),
            raw_links: Vec::with_capacity(links),
        }
    }

    /// Register `node` (idempotent) and return its compact position.
    pub fn add_node(&mut self, node: NodeIndex) -> u32 {
        let next = self.nodes.len() as u32;
        let pos = *self.position.entry(node).or_insert(next);
        if pos == next {
            self.nodes.push(node);
        }
        pos
    }

    /// Add a one-way link `from → to`.
    pub fn add_directed(&mut self, from: NodeIndex, to: NodeIndex, cost: u32, street: StreetId) {
        let from = self.add_node(from);
        let to = self.add_node(to);
        self.raw_links.push(RawLink { from, to, cost, street });
    }

    /// Add links in both directions.
    pub fn add_road(&mut self, a: NodeIndex, b: NodeIndex, cost: u32, street: StreetId) {
        self.add_directed(a, b, cost, street);
        self.add_directed(b, a, cost, street);
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn link_count(&self) -> usize { self.raw_links.len() }

    pub fn build(self) -> RoadGraph {
        let node_count = self.nodes.len();

        // Stable sort keeps insertion order among links of one node.
        let mut raw = self.raw_links;
        raw.sort_by_key(|l| l.from);

        let link_from:   Vec<u32>      = raw.iter().map(|l| l.from).collect();
        let link_to:     Vec<u32>      = raw.iter().map(|l| l.to).collect();
        let link_cost:   Vec<u32>      = raw.iter().map(|l| l.cost).collect();
        let link_street: Vec<StreetId> = raw.iter().map(|l| l.street).collect();

        let mut node_out_start = vec![0u32; node_count + 1];
        for l in &raw {
            node_out_start[l.from as usize + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }
        debug_assert_eq!(node_out_start[node_count] as usize, raw.len());

        RoadGraph {
            nodes: self.nodes,
            position: self.position,
            node_out_start,
            link_from,
            link_to,
            link_cost,
            link_street,
        }
    }
}

impl Default for RoadGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
