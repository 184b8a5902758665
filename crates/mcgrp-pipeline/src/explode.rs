//! Stage 2: expand street polylines into point records.

use log::info;
use rustc_hash::FxHashMap;

use mcgrp_core::geodesy::{haversine_distance, leg_angles, round6};
use mcgrp_core::{CoordKey, GraphState, PointRecord, StreetId};

/// Replace the point table with one record per street vertex and label it.
///
/// - `shared` marks points whose rounded coordinate appears more than once
///   anywhere in the table;
/// - vertex `i > 0` carries the distance from vertex `i - 1` in km and
///   `vertex_to = i - 1`;
/// - every vertex but the last carries the bearing to its successor;
/// - the first and last vertex are endpoints.
///
/// `total_dist_km` of each logical and visual street is set to the summed
/// leg lengths.
pub fn explode_and_label(mut state: GraphState) -> GraphState {
    let mut points: Vec<PointRecord> = Vec::new();
    let mut totals: FxHashMap<StreetId, f64> = FxHashMap::default();

    for street in &state.streets {
        let coords = street.coords();
        let last = coords.len().saturating_sub(1);
        let mut total_m = 0.0;

        for (i, &coord) in coords.iter().enumerate() {
            let mut p = PointRecord::new(coord, street.id, i as u32).inherit_from(street);
            if i > 0 {
                let leg_m = haversine_distance(coords[i - 1], coord);
                total_m += leg_m;
                p.distance_km = round6(leg_m / 1000.0);
                p.vertex_to = (i - 1) as u32;
            }
            if i < last {
                let (angle, inv) = leg_angles(coord, coords[i + 1]);
                p.angle = Some(angle);
                p.angle_inv = Some(inv);
            }
            p.endpoint = i == 0 || i == last;
            points.push(p);
        }
        totals.insert(street.id, round6(total_m / 1000.0));
    }

    let mut occurrences: FxHashMap<CoordKey, u32> = FxHashMap::default();
    for p in &points {
        *occurrences.entry(CoordKey::of(p.coord)).or_default() += 1;
    }
    for p in &mut points {
        p.shared = occurrences[&CoordKey::of(p.coord)] > 1;
    }

    for street in state.streets.iter_mut().chain(state.visual_streets.iter_mut()) {
        if let Some(&km) = totals.get(&street.id) {
            street.total_dist_km = km;
        }
    }

    let shared = points.iter().filter(|p| p.shared).count();
    info!("exploded {} streets into {} points ({shared} shared)", state.streets.len(), points.len());
    state.points = points;
    state
}
