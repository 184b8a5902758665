//! Shortest-path relevance analysis and dead-end pruning.
//!
//! A neighborhood is *relevant* when it holds required work, holds the
//! depot, or lies on the cheapest route between the depot and one of the
//! exits of a required neighborhood.  An exit is an endpoint of a visual
//! street of the neighborhood that touches its boundary.
//!
//! [`reduce_to_relevant`] drops everything outside the relevant set and
//! then removes dead ends that carry no work.

use std::collections::BTreeSet;

use log::{debug, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use mcgrp_core::{GraphState, NeighborhoodId, NodeIndex, StreetId};

use crate::error::{SpatialError, SpatialResult};
use crate::graph::RoadGraph;
use crate::neighborhoods::NeighborhoodIndex;
use crate::router::{DijkstraRouter, Route, Router};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

// ── NeighborhoodAnalysis ─────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct NeighborhoodAnalysis {
    pub depot:              NodeIndex,
    pub depot_neighborhood: Option<NeighborhoodId>,
    /// Neighborhoods with a required street or a required non-depot node.
    pub required:           BTreeSet<NeighborhoodId>,
    pub kept:               BTreeSet<NeighborhoodId>,
}

/// Best route seen so far in one direction and the neighborhoods collected
/// from every improvement.
struct Connection {
    min_cost:  u64,
    neighbors: BTreeSet<NeighborhoodId>,
}

impl Connection {
    fn new(seed: impl IntoIterator<Item = NeighborhoodId>) -> Self {
        Self { min_cost: u64::MAX, neighbors: seed.into_iter().collect() }
    }

    fn offer(&mut self, route: Option<&Route>, street_hood: &FxHashMap<StreetId, NeighborhoodId>) {
        let Some(route) = route else { return };
        if route.is_trivial() || route.total_cost >= self.min_cost {
            return;
        }
        self.min_cost = route.total_cost;
        self.neighbors
            .extend(route.streets.iter().filter_map(|id| street_hood.get(id).copied()));
    }
}

// ── ShortestPathAnalyzer ─────────────────────────────────────────────────────

pub struct ShortestPathAnalyzer<'a, R: Router = DijkstraRouter> {
    state:  &'a GraphState,
    graph:  RoadGraph,
    index:  NeighborhoodIndex,
    router: R,
}

impl<'a> ShortestPathAnalyzer<'a, DijkstraRouter> {
    pub fn new(state: &'a GraphState) -> Self {
        Self::with_router(state, DijkstraRouter)
    }
}

impl<'a, R: Router> ShortestPathAnalyzer<'a, R> {
    pub fn with_router(state: &'a GraphState, router: R) -> Self {
        Self {
            state,
            graph: RoadGraph::from_state(state),
            index: NeighborhoodIndex::new(&state.neighborhoods),
            router,
        }
    }

    pub fn graph(&self) -> &RoadGraph {
        &self.graph
    }

    pub fn analyze(&self) -> SpatialResult<NeighborhoodAnalysis> {
        let depot_point = self.state.depot_point().ok_or(SpatialError::NoDepot)?;
        let depot = depot_point.node_index.ok_or(SpatialError::NoDepot)?;
        let depot_neighborhood = depot_point.neighborhood_id();
        info!("depot at {depot} (neighborhood {depot_neighborhood:?})");

        let required = self.required_neighborhoods();
        let street_hood: FxHashMap<StreetId, NeighborhoodId> = self
            .state
            .streets
            .iter()
            .filter_map(|s| s.neighborhood_id().map(|n| (s.id, n)))
            .collect();

        let mut kept = required.clone();
        kept.extend(depot_neighborhood);

        for &hood in &required {
            let exits = self.exits(hood);
            if exits.is_empty() {
                warn!("no boundary exit found for neighborhood {hood}");
                continue;
            }

            let mut outbound = Connection::new([hood]);
            let mut inbound = Connection::new(std::iter::once(hood).chain(depot_neighborhood));
            for (to_exit, from_exit) in self.exit_routes(depot, &exits) {
                outbound.offer(to_exit.as_ref(), &street_hood);
                inbound.offer(from_exit.as_ref(), &street_hood);
            }
            debug!(
                "neighborhood {hood}: {} exits, outbound via {:?}, inbound via {:?}",
                exits.len(),
                outbound.neighbors,
                inbound.neighbors
            );
            kept.extend(outbound.neighbors);
            kept.extend(inbound.neighbors);
        }

        info!("{} neighborhoods kept after analysis", kept.len());
        Ok(NeighborhoodAnalysis { depot, depot_neighborhood, required, kept })
    }

    fn required_neighborhoods(&self) -> BTreeSet<NeighborhoodId> {
        let from_points = self
            .state
            .points
            .iter()
            .filter(|p| p.service.is_serviced())
            .filter_map(|p| p.neighborhood_id());
        let from_streets = self
            .state
            .streets
            .iter()
            .filter(|s| s.required)
            .filter_map(|s| s.neighborhood_id());
        from_points.chain(from_streets).collect()
    }

    /// Endpoints of the neighborhood's visual streets that touch its
    /// boundary, ascending.
    pub fn exits(&self, hood: NeighborhoodId) -> Vec<NodeIndex> {
        let exits: BTreeSet<NodeIndex> = self
            .state
            .visual_streets
            .iter()
            .filter(|s| s.neighborhood_id() == Some(hood))
            .filter(|s| self.index.intersects_boundary(hood, &s.geometry))
            .flat_map(|s| [s.from_node, s.to_node])
            .flatten()
            .collect();
        exits.into_iter().collect()
    }

    /// `(depot → exit, exit → depot)` for every exit, in exit order.
    fn exit_routes(&self, depot: NodeIndex, exits: &[NodeIndex]) -> Vec<(Option<Route>, Option<Route>)> {
        let legs = |&exit: &NodeIndex| (self.try_route(depot, exit), self.try_route(exit, depot));

        #[cfg(feature = "parallel")]
        let routes = exits.par_iter().map(legs).collect();

        #[cfg(not(feature = "parallel"))]
        let routes = exits.iter().map(legs).collect();

        routes
    }

    fn try_route(&self, from: NodeIndex, to: NodeIndex) -> Option<Route> {
        match self.router.route(&self.graph, from, to) {
            Ok(route) => Some(route),
            Err(e) => {
                debug!("{e}");
                None
            }
        }
    }
}

// ── Dead-end pruning ─────────────────────────────────────────────────────────

/// Repeatedly remove non-required streets that end in a leaf node which is
/// neither required nor the depot.
///
/// Street ids are not renumbered; callers that need dense ids re-index
/// afterwards.
pub fn prune_dead_ends(mut state: GraphState) -> GraphState {
    let mut iteration = 0;
    loop {
        iteration += 1;

        let mut degree: FxHashMap<NodeIndex, u32> = FxHashMap::default();
        for s in &state.streets {
            for node in [s.from_node, s.to_node].into_iter().flatten() {
                *degree.entry(node).or_default() += 1;
            }
        }

        let removable: FxHashSet<NodeIndex> = degree
            .iter()
            .filter(|&(_, &d)| d == 1)
            .filter_map(|(&node, _)| state.node_service(node).map(|svc| (node, svc)))
            .filter(|(_, svc)| !svc.required && !svc.depot)
            .map(|(node, _)| node)
            .collect();
        if removable.is_empty() {
            break;
        }

        let doomed: FxHashSet<StreetId> = state
            .streets
            .iter()
            .filter(|s| !s.required)
            .filter(|s| {
                [s.from_node, s.to_node]
                    .into_iter()
                    .flatten()
                    .any(|n| removable.contains(&n))
            })
            .map(|s| s.id)
            .collect();
        if doomed.is_empty() {
            break;
        }

        state.remove_streets(&doomed);
        retain_live_nodes(&mut state);
        debug!("dead-end pass {iteration}: removed {} streets", doomed.len());
    }
    info!("dead-end pruning left {} streets", state.streets.len());
    state
}

/// Keep only the neighborhoods in `analysis.kept` and the streets, points,
/// nodes and polygons that belong to them, then prune dead ends.  An empty
/// kept set leaves the state unchanged.
pub fn reduce_to_relevant(state: GraphState) -> SpatialResult<GraphState> {
    let analysis = ShortestPathAnalyzer::new(&state).analyze()?;
    Ok(reduce_with(state, &analysis.kept))
}

/// [`reduce_to_relevant`] with a precomputed kept set.
pub fn reduce_with(mut state: GraphState, kept: &BTreeSet<NeighborhoodId>) -> GraphState {
    if kept.is_empty() {
        warn!("relevance analysis kept nothing; graph left unchanged");
        return state;
    }
    let in_kept = |hood: Option<NeighborhoodId>| hood.is_some_and(|h| kept.contains(&h));

    let before = state.streets.len();
    state.streets.retain(|s| in_kept(s.neighborhood_id()));
    let live: FxHashSet<StreetId> = state.streets.iter().map(|s| s.id).collect();
    state.visual_streets.retain(|s| live.contains(&s.id));
    state.drop_orphan_points();
    retain_live_nodes(&mut state);
    state.neighborhoods.retain(|n| kept.contains(&n.id));
    info!("relevance filter kept {} of {before} streets", state.streets.len());

    prune_dead_ends(state)
}

/// Drop nodes no point carries any more and street ids that are gone.
fn retain_live_nodes(state: &mut GraphState) {
    let live_nodes: FxHashSet<NodeIndex> = state.points.iter().filter_map(|p| p.node_index).collect();
    let live_streets: FxHashSet<StreetId> = state.streets.iter().map(|s| s.id).collect();
    state
        .nodes
        .retain(|n| n.node_index.is_some_and(|idx| live_nodes.contains(&idx)));
    for node in &mut state.nodes {
        node.street_ids.retain(|id| live_streets.contains(id));
    }
}
