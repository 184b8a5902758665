//! Stage 3: trim dangling endpoints that stop just short of (or on) a
//! neighborhood boundary.

use geo::{Coord, LineString};
use log::{debug, info};
use rustc_hash::{FxHashMap, FxHashSet};

use mcgrp_core::{GraphState, PipelineConfig, PointRecord, StreetId};
use mcgrp_spatial::NeighborhoodIndex;

/// Remove street endpoints that are not shared, lie within
/// `config.boundary_distance_m` of their neighborhood boundary and whose
/// adjoining leg is at most `config.protection_distance_km` long.
///
/// The start is checked before the end.  A street left with a single vertex
/// is deleted with its points; otherwise its geometry (logical and visual)
/// loses that vertex.  Street ids are re-sequenced afterwards.
pub fn remove_invalid_endpoints(
    mut state: GraphState,
    config: &PipelineConfig,
    hoods: &NeighborhoodIndex,
) -> GraphState {
    let by_street = state.points_by_street();
    let order: Vec<StreetId> = state.streets.iter().map(|s| s.id).collect();

    let removable = |p: &PointRecord, leg_km: f64| -> bool {
        if p.shared {
            return false;
        }
        let Some(hood) = p.neighborhood_id() else { return false };
        match hoods.distance_to_boundary_m(hood, p.coord) {
            Some(d) if d <= config.boundary_distance_m => leg_km <= config.protection_distance_km,
            _ => false,
        }
    };

    let mut dropped_points: FxHashSet<usize> = FxHashSet::default();
    let mut doomed: FxHashSet<StreetId> = FxHashSet::default();
    let mut reshaped: FxHashMap<StreetId, Vec<Coord>> = FxHashMap::default();

    for id in order {
        let Some(positions) = by_street.get(&id) else { continue };
        if positions.len() < 2 {
            continue;
        }
        let mut live: Vec<usize> = positions.clone();

        let start = &state.points[live[0]];
        if removable(start, state.points[live[1]].distance_km) {
            if live.len() == 2 {
                doomed.insert(id);
                continue;
            }
            dropped_points.insert(live.remove(0));
            for (i, &pos) in live.iter().enumerate() {
                let p = &mut state.points[pos];
                p.vertex_index = i as u32;
                p.vertex_to = i.saturating_sub(1) as u32;
            }
            let first = &mut state.points[live[0]];
            first.distance_km = 0.0;
            first.endpoint = true;
            debug!("{id}: start vertex trimmed");
        }

        let end_pos = live[live.len() - 1];
        let end = &state.points[end_pos];
        if removable(end, end.distance_km) {
            if live.len() == 2 {
                doomed.insert(id);
                continue;
            }
            dropped_points.insert(end_pos);
            live.pop();
            let new_end = &mut state.points[live[live.len() - 1]];
            new_end.endpoint = true;
            new_end.clear_angles();
            debug!("{id}: end vertex trimmed");
        }

        if live.len() != positions.len() {
            reshaped.insert(id, live.iter().map(|&pos| state.points[pos].coord).collect());
        }
    }

    info!(
        "endpoint pruning: {} vertices trimmed, {} streets removed",
        dropped_points.len(),
        doomed.len()
    );
    if dropped_points.is_empty() && doomed.is_empty() {
        return state;
    }

    let mut pos = 0;
    state.points.retain(|_| {
        let keep = !dropped_points.contains(&pos);
        pos += 1;
        keep
    });
    state.remove_streets(&doomed);

    for street in state.streets.iter_mut().chain(state.visual_streets.iter_mut()) {
        if let Some(coords) = reshaped.get(&street.id) {
            street.geometry = LineString::new(coords.clone());
        }
    }

    state.reindex_streets();
    state
}
