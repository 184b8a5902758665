//! Stage 1: tag normalisation and neighborhood-boundary cleanup.
//!
//! The same physical street is often cut into one segment per neighborhood
//! by the source data, with the cut vertices duplicated a few centimetres
//! apart.  [`process_neighborhood_boundaries`] removes those duplicates so
//! the segments share an exact vertex, then re-runs the dominance rule on
//! every segment it touched.

use std::collections::BTreeMap;

use geo::Coord;
use log::{debug, info};

use mcgrp_core::geodesy::haversine_distance;
use mcgrp_core::{GraphState, PipelineConfig};
use mcgrp_spatial::NeighborhoodIndex;

/// Fill missing names and neighborhood assignments.
///
/// A street without `name` takes its `alt_name`, then
/// `config.unknown_name`.  A street without a neighborhood gets the one
/// covering more than `config.dominance_share` of it, if any.  The visual
/// table is replaced by the normalised logical one.
pub fn filter_and_normalize(
    mut state: GraphState,
    config: &PipelineConfig,
    hoods: &NeighborhoodIndex,
) -> GraphState {
    let mut renamed = 0;
    let mut assigned = 0;
    for street in &mut state.streets {
        if street.tags.name.is_none() {
            street.tags.name = Some(
                street
                    .tags
                    .alt_name
                    .clone()
                    .unwrap_or_else(|| config.unknown_name.clone()),
            );
            renamed += 1;
        }
        if street.neighborhood.is_none() {
            street.neighborhood = hoods.dominant(&street.geometry, config.dominance_share);
            assigned += street.neighborhood.is_some() as usize;
        }
    }
    state.mirror_visual_streets();
    info!("normalised {} streets ({renamed} renamed, {assigned} assigned a neighborhood)", state.streets.len());
    state
}

/// Snap near-coincident endpoints of same-source segments that sit in
/// different neighborhoods, reassign the touched segments by dominance and
/// drop segments left with fewer than two vertices.
pub fn process_neighborhood_boundaries(
    mut state: GraphState,
    config: &PipelineConfig,
    hoods: &NeighborhoodIndex,
) -> GraphState {
    let mut by_source: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (row, street) in state.streets.iter().enumerate() {
        if let Some(osm_id) = &street.tags.osm_id {
            by_source.entry(osm_id.clone()).or_default().push(row);
        }
    }

    let close = |a: Coord, b: Coord| haversine_distance(a, b) < config.proximity_threshold_m;

    let mut modified: Vec<usize> = Vec::new();
    for rows in by_source.values().filter(|rows| rows.len() > 1) {
        for (k, &i) in rows.iter().enumerate() {
            for &j in &rows[k + 1..] {
                if adjust_pair(&mut state, i, j, close) {
                    modified.push(i);
                    modified.push(j);
                }
            }
        }
    }
    modified.sort_unstable();
    modified.dedup();

    let mut reassigned = 0;
    for &row in &modified {
        let street = &mut state.streets[row];
        if street.geometry.0.len() < 2 {
            continue;
        }
        if let Some(hood) = hoods.dominant(&street.geometry, config.dominance_share) {
            if street.neighborhood_id() != Some(hood.id) {
                debug!("{} moves to neighborhood {}", street.id, hood.id);
                street.neighborhood = Some(hood);
                reassigned += 1;
            }
        }
    }

    let before = state.streets.len();
    state.streets.retain(|s| s.geometry.0.len() >= 2);
    let dropped = before - state.streets.len();
    state.mirror_visual_streets();
    if dropped > 0 {
        state.reindex_streets();
    }

    info!(
        "boundary cleanup: {} segments adjusted, {reassigned} reassigned, {dropped} dropped",
        modified.len()
    );
    state
}

/// Trim the duplicated vertex between rows `i` and `j`.  Returns `true` if
/// either geometry changed.
fn adjust_pair(state: &mut GraphState, i: usize, j: usize, close: impl Fn(Coord, Coord) -> bool) -> bool {
    if state.streets[i].neighborhood_id() == state.streets[j].neighborhood_id() {
        return false;
    }
    let mut c1 = state.streets[i].geometry.0.clone();
    let mut c2 = state.streets[j].geometry.0.clone();
    if c1.len() <= 1 || c2.len() <= 1 {
        return false;
    }

    let (first1, last1) = (c1[0], c1[c1.len() - 1]);
    let (first2, last2) = (c2[0], c2[c2.len() - 1]);
    if close(first1, last2) {
        c1.remove(0);
        let n = c2.len();
        c2[n - 1] = c1[0];
    } else if close(last1, first2) {
        c2.remove(0);
        let n = c1.len();
        c1[n - 1] = c2[0];
    } else {
        return false;
    }

    state.streets[i].geometry.0 = c1;
    state.streets[j].geometry.0 = c2;
    true
}
