//! Stages 4 and 6: cutting streets at vertices.
//!
//! Both passes rebuild the street and point tables from scratch.  Pieces get
//! temporary ids above the current maximum and the whole table is then
//! re-sequenced `1..=N` in row order, so a piece always lands where its
//! parent was.

use std::mem;

use geo::{Coord, LineString};
use log::info;
use rustc_hash::FxHashMap;

use mcgrp_core::geodesy::{haversine_distance, leg_angles, round6};
use mcgrp_core::{CoordKey, DenseId, GraphState, PointRecord, SplitCriteria, StreetId, StreetRecord};

// ── Special vertices ─────────────────────────────────────────────────────────

/// Cut every street at each interior vertex matching `criteria`.
///
/// Pieces recompute their geometry, per-point distances and bearings,
/// `vertex_to`, endpoint flags and `total_dist_km`.  The visual table is
/// replaced by a copy of the result.  An empty `criteria` is a no-op.
pub fn split_by_special_vertices(mut state: GraphState, criteria: SplitCriteria) -> GraphState {
    if criteria.is_empty() {
        info!("no split criteria; streets left as they are");
        return state;
    }

    let by_street = state.points_by_street();
    let mut next_id = state.next_street_id();
    let streets = mem::take(&mut state.streets);
    let before = streets.len();

    let mut out_streets: Vec<StreetRecord> = Vec::with_capacity(before);
    let mut out_points: Vec<PointRecord> = Vec::with_capacity(state.points.len());

    for street in streets {
        let Some(positions) = by_street.get(&street.id) else {
            out_streets.push(street);
            continue;
        };
        let pts: Vec<&PointRecord> = positions.iter().map(|&pos| &state.points[pos]).collect();
        let last = pts.len().saturating_sub(1);

        let cuts: Vec<usize> = (1..last).filter(|&k| criteria.matches(pts[k])).collect();
        if cuts.is_empty() {
            out_points.extend(pts.into_iter().cloned());
            out_streets.push(street);
            continue;
        }

        let bounds: Vec<usize> = std::iter::once(0).chain(cuts).chain(std::iter::once(last)).collect();
        for w in bounds.windows(2) {
            let (piece, piece_points) = cut_piece(&street, &pts[w[0]..=w[1]], next_id);
            next_id = next_id.next();
            out_streets.push(piece);
            out_points.extend(piece_points);
        }
    }

    state.streets = out_streets;
    state.points = out_points;
    state.reindex_streets();
    state.mirror_visual_streets();
    info!("special-vertex split: {before} streets became {}", state.streets.len());
    state
}

/// One piece of `parent` spanning `pts`, with all per-point attributes
/// recomputed along the piece.
fn cut_piece(parent: &StreetRecord, pts: &[&PointRecord], id: StreetId) -> (StreetRecord, Vec<PointRecord>) {
    let coords: Vec<Coord> = pts.iter().map(|p| p.coord).collect();
    let last = coords.len() - 1;
    let mut total_m = 0.0;

    let points = pts
        .iter()
        .enumerate()
        .map(|(i, &src)| {
            let mut p = src.clone();
            p.street_id = id;
            p.vertex_index = i as u32;
            if i == 0 {
                p.distance_km = 0.0;
                p.vertex_to = 0;
                p.endpoint = true;
            } else {
                let leg_m = haversine_distance(coords[i - 1], coords[i]);
                total_m += leg_m;
                p.distance_km = round6(leg_m / 1000.0);
                p.vertex_to = (i - 1) as u32;
            }
            if i < last {
                let (angle, inv) = leg_angles(coords[i], coords[i + 1]);
                p.angle = Some(angle);
                p.angle_inv = Some(inv);
                if i > 0 && !p.shared {
                    p.endpoint = false;
                }
            } else {
                p.clear_angles();
                p.endpoint = true;
            }
            p
        })
        .collect();

    let mut piece = parent.clone();
    piece.id = id;
    piece.geometry = LineString::new(coords);
    piece.total_dist_km = round6(total_m / 1000.0);
    (piece, points)
}

// ── Two-point segments ───────────────────────────────────────────────────────

/// Break every street with more than two points into consecutive two-point
/// streets.
///
/// Each piece inherits the parent's attributes, takes the second point's
/// distance as `total_dist_km` and keeps the curvature of the matching
/// stretch of the parent's visual polyline.  The first point of a piece
/// keeps its bearing; the second keeps its distance.  Streets without
/// points are dropped.
pub fn split_into_two_point_segments(mut state: GraphState) -> GraphState {
    let by_street = state.points_by_street();
    let mut next_id = state.next_street_id();
    let streets = mem::take(&mut state.streets);
    let mut visual: FxHashMap<StreetId, StreetRecord> =
        mem::take(&mut state.visual_streets).into_iter().map(|s| (s.id, s)).collect();
    let before = streets.len();

    let mut out_streets: Vec<StreetRecord> = Vec::with_capacity(before);
    let mut out_visual: Vec<StreetRecord> = Vec::with_capacity(before);
    let mut out_points: Vec<PointRecord> = Vec::with_capacity(state.points.len());

    for street in streets {
        let Some(positions) = by_street.get(&street.id) else { continue };
        let parent_visual = visual.remove(&street.id);

        if positions.len() <= 2 {
            out_points.extend(positions.iter().map(|&pos| state.points[pos].clone()));
            out_visual.push(parent_visual.unwrap_or_else(|| street.clone()));
            out_streets.push(street);
            continue;
        }

        let visual_coords: &[Coord] = parent_visual.as_ref().map(|v| v.coords()).unwrap_or_default();
        let mut cursor = 0;
        for w in positions.windows(2) {
            let (pt1, pt2) = (&state.points[w[0]], &state.points[w[1]]);
            let id = next_id;
            next_id = next_id.next();

            let mut piece = street.clone();
            piece.id = id;
            piece.geometry = LineString::new(vec![pt1.coord, pt2.coord]);
            piece.total_dist_km = pt2.distance_km;

            let mut piece_visual = parent_visual.clone().unwrap_or_else(|| street.clone());
            piece_visual.id = id;
            piece_visual.total_dist_km = pt2.distance_km;
            piece_visual.geometry = match visual_slice(visual_coords, &mut cursor, pt1.coord, pt2.coord) {
                Some(coords) => LineString::new(coords),
                None => piece.geometry.clone(),
            };

            let mut first = pt1.clone();
            first.street_id = id;
            first.vertex_index = 0;
            first.vertex_to = 0;
            first.distance_km = 0.0;
            first.endpoint = true;

            let mut second = pt2.clone();
            second.street_id = id;
            second.vertex_index = 1;
            second.vertex_to = 0;
            second.endpoint = true;

            out_streets.push(piece);
            out_visual.push(piece_visual);
            out_points.push(first);
            out_points.push(second);
        }
    }

    state.streets = out_streets;
    state.visual_streets = out_visual;
    state.points = out_points;
    state.reindex_streets();
    info!("two-point split: {before} streets became {}", state.streets.len());
    state
}

/// The stretch of `coords` from `from` to `to` (matched by rounded
/// coordinate), searching forward from `*cursor`.  On success the cursor
/// moves to the end of the stretch.
fn visual_slice(coords: &[Coord], cursor: &mut usize, from: Coord, to: Coord) -> Option<Vec<Coord>> {
    let (from_key, to_key) = (CoordKey::of(from), CoordKey::of(to));
    let start = (*cursor..coords.len()).find(|&i| CoordKey::of(coords[i]) == from_key)?;
    let end = (start + 1..coords.len()).find(|&i| CoordKey::of(coords[i]) == to_key)?;
    *cursor = end;
    Some(coords[start..=end].to_vec())
}
