//! Stage 8: dense node, edge and arc indices, endpoint links and costs.

use log::{debug, info};
use rustc_hash::{FxHashMap, FxHashSet};

use mcgrp_core::geodesy::{calculate_traversal_cost, service_cost};
use mcgrp_core::{
    ArcIndex, CoordKey, DenseId, EdgeIndex, GraphState, LinkIndex, LinkKind, NodeIndex, PipelineConfig,
    StreetId,
};

use crate::error::PipelineResult;

/// Index the graph.
///
/// 1. clear every index and cost;
/// 2. apply `config.valid_neighborhoods`, if set;
/// 3. drop streets without a vertex 0 and 1, and streets whose two ends
///    round to the same coordinate, with their points;
/// 4. number nodes by rounded coordinate in first-seen point order;
/// 5. number edges and arcs separately in street row order;
/// 6. link `from_node`/`to_node` to the nodes of vertices 0 and 1;
/// 7. compute traversal and service costs;
/// 8. rebuild the node table and check the result.
///
/// Running it again on an unchanged indexed state yields the same state.
pub fn assign_indices(mut state: GraphState, config: &PipelineConfig) -> PipelineResult<GraphState> {
    for street in state.streets.iter_mut().chain(state.visual_streets.iter_mut()) {
        street.reset_indexing();
    }
    for p in &mut state.points {
        p.node_index = None;
    }

    let mut renumber = false;
    if let Some(valid) = &config.valid_neighborhoods {
        let valid: FxHashSet<_> = valid.iter().copied().collect();
        let in_valid = |hood: Option<_>| hood.is_some_and(|h| valid.contains(&h));
        let before = state.streets.len();
        state.streets.retain(|s| in_valid(s.neighborhood_id()));
        state.points.retain(|p| in_valid(p.neighborhood_id()));
        let live: FxHashSet<StreetId> = state.streets.iter().map(|s| s.id).collect();
        state.visual_streets.retain(|s| live.contains(&s.id));
        state.drop_orphan_points();
        info!("allowlist kept {} of {before} streets", state.streets.len());
        renumber |= state.streets.len() != before;
    }

    let invalid = unlinkable_streets(&state);
    if !invalid.is_empty() {
        info!("removing {} streets that cannot be linked", invalid.len());
        state.remove_streets(&invalid);
        renumber = true;
    }
    if renumber {
        state.reindex_streets();
    }

    // Nodes.
    let mut node_of: FxHashMap<CoordKey, NodeIndex> = FxHashMap::default();
    for p in &mut state.points {
        let next = NodeIndex::from_ordinal(node_of.len() + 1);
        p.node_index = Some(*node_of.entry(CoordKey::of(p.coord)).or_insert(next));
    }

    // Edges and arcs.
    let mut next_edge = EdgeIndex(1);
    let mut next_arc = ArcIndex(1);
    for street in &mut state.streets {
        street.link = Some(match street.tags.link_kind() {
            LinkKind::Edge => {
                let e = next_edge;
                next_edge = next_edge.next();
                LinkIndex::Edge(e)
            }
            LinkKind::Arc => {
                let a = next_arc;
                next_arc = next_arc.next();
                LinkIndex::Arc(a)
            }
        });
    }

    // Endpoints and costs.
    let vertex_node: FxHashMap<(StreetId, u32), NodeIndex> = state
        .points
        .iter()
        .filter_map(|p| p.node_index.map(|n| ((p.street_id, p.vertex_index), n)))
        .collect();
    for street in &mut state.streets {
        street.from_node = vertex_node.get(&(street.id, 0)).copied();
        street.to_node = vertex_node.get(&(street.id, 1)).copied();
        street.traversal_cost = calculate_traversal_cost(Some(street.total_dist_km), street.tags.maxspeed.as_deref());
        street.service_cost = service_cost(street.traversal_cost);
    }
    copy_indexing_to_visual(&mut state);

    state.rebuild_nodes_with(&FxHashMap::default());
    state.check_integrity()?;

    info!(
        "indexed {} nodes, {} edges, {} arcs",
        node_of.len(),
        next_edge.0 - 1,
        next_arc.0 - 1
    );
    Ok(state)
}

/// Streets missing vertex 0 or 1, or whose vertices 0 and 1 share a
/// rounded coordinate.
fn unlinkable_streets(state: &GraphState) -> FxHashSet<StreetId> {
    let mut ends: FxHashMap<StreetId, [Option<CoordKey>; 2]> =
        state.streets.iter().map(|s| (s.id, [None, None])).collect();
    for p in &state.points {
        if let Some(slot) = ends.get_mut(&p.street_id) {
            if let Some(end) = slot.get_mut(p.vertex_index as usize) {
                *end = Some(CoordKey::of(p.coord));
            }
        }
    }
    ends.into_iter()
        .filter(|(id, ends)| match ends {
            [Some(a), Some(b)] if a != b => false,
            [Some(_), Some(_)] => {
                debug!("{id} is a self-loop");
                true
            }
            _ => {
                debug!("{id} is missing an endpoint");
                true
            }
        })
        .map(|(id, _)| id)
        .collect()
}

/// Mirror links, endpoints and costs onto the aligned visual streets.
fn copy_indexing_to_visual(state: &mut GraphState) {
    let logical: FxHashMap<StreetId, usize> = state.streets.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
    for visual in &mut state.visual_streets {
        if let Some(&row) = logical.get(&visual.id) {
            let s = &state.streets[row];
            visual.link = s.link;
            visual.from_node = s.from_node;
            visual.to_node = s.to_node;
            visual.traversal_cost = s.traversal_cost;
            visual.service_cost = s.service_cost;
            visual.total_dist_km = s.total_dist_km;
            visual.neighborhood = s.neighborhood.clone();
        }
    }
}
