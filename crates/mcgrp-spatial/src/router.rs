//! Routing trait and default Dijkstra implementation.
//!
//! Costs are summed as `u64` seconds.  The heap is keyed on
//! `(cost, node index)`, so among equally cheap frontier nodes the lowest
//! node index is settled first and results do not depend on hash order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use mcgrp_core::{NodeIndex, StreetId};

use crate::error::{SpatialError, SpatialResult};
use crate::graph::RoadGraph;

// ── Route ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Route {
    /// Streets in travel order.
    pub streets:    Vec<StreetId>,
    pub total_cost: u64,
}

impl Route {
    /// `true` if the source and destination are the same node.
    pub fn is_trivial(&self) -> bool {
        self.streets.is_empty()
    }
}

// ── Router trait ─────────────────────────────────────────────────────────────

/// Pluggable shortest-path engine.
///
/// `Send + Sync` so one router can serve the parallel exit searches.
pub trait Router: Send + Sync {
    /// Cheapest route `from → to`.  `from == to` is an empty route; an
    /// unreachable destination is [`SpatialError::NoRoute`].
    fn route(&self, graph: &RoadGraph, from: NodeIndex, to: NodeIndex) -> SpatialResult<Route>;
}

// ── DijkstraRouter ───────────────────────────────────────────────────────────

pub struct DijkstraRouter;

impl Router for DijkstraRouter {
    fn route(&self, graph: &RoadGraph, from: NodeIndex, to: NodeIndex) -> SpatialResult<Route> {
        dijkstra(graph, from, to)
    }
}

const NO_LINK: u32 = u32::MAX;

fn dijkstra(graph: &RoadGraph, from: NodeIndex, to: NodeIndex) -> SpatialResult<Route> {
    if from == to {
        return Ok(Route { streets: vec![], total_cost: 0 });
    }
    let source = graph.position(from).ok_or(SpatialError::UnknownNode(from))?;
    let target = graph.position(to).ok_or(SpatialError::UnknownNode(to))?;

    let n = graph.node_count();
    let mut dist = vec![u64::MAX; n];
    let mut prev_link = vec![NO_LINK; n];

    dist[source] = 0;

    let mut heap: BinaryHeap<Reverse<(u64, NodeIndex)>> = BinaryHeap::new();
    heap.push(Reverse((0, from)));

    while let Some(Reverse((cost, node))) = heap.pop() {
        let Some(pos) = graph.position(node) else { continue };
        if pos == target {
            return Ok(reconstruct(graph, &prev_link, target, cost));
        }

        // Stale heap entry.
        if cost > dist[pos] {
            continue;
        }

        for link in graph.out_links(pos) {
            let next = graph.link_to[link] as usize;
            let new_cost = cost.saturating_add(graph.link_cost[link] as u64);
            if new_cost < dist[next] {
                dist[next] = new_cost;
                prev_link[next] = link as u32;
                heap.push(Reverse((new_cost, graph.nodes[next])));
            }
        }
    }

    Err(SpatialError::NoRoute { from, to })
}

fn reconstruct(graph: &RoadGraph, prev_link: &[u32], target: usize, total_cost: u64) -> Route {
    let mut streets = Vec::new();
    let mut cur = target;
    loop {
        let link = prev_link[cur];
        if link == NO_LINK {
            break;
        }
        streets.push(graph.link_street[link as usize]);
        cur = graph.link_from[link as usize] as usize;
    }
    streets.reverse();
    Route { streets, total_cost }
}
