//! Stages 5 and 7: dropping interior vertices and merging streets across
//! neighborhood boundaries.

use geo::{Coord, LineString};
use log::{debug, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use mcgrp_core::geodesy::{mean_angle_deg, round6};
use mcgrp_core::{CoordKey, DenseId, GraphState, PipelineConfig, PointRecord, StreetId, StreetRecord};
use mcgrp_spatial::NeighborhoodIndex;

// ── Interior collapse ────────────────────────────────────────────────────────

/// Keep only the special vertices (endpoints and shared vertices) of each
/// street.
///
/// For consecutive special vertices `i < j` the leg distances of
/// `i + 1 ..= j` are summed into `j`, `j` points back to `i`, and `i` takes
/// the circular mean of the bearings of `i ..= j`.  Streets with fewer than
/// two special vertices are left alone.  Vertex indices are then renumbered
/// `0..K` per street and the logical geometry follows the kept points; the
/// visual geometry keeps its curvature.
pub fn create_reduced_graph(mut state: GraphState) -> GraphState {
    let by_street = state.points_by_street();
    let mut keep = vec![false; state.points.len()];

    for positions in by_street.values() {
        let special: Vec<usize> = positions
            .iter()
            .enumerate()
            .filter(|&(_, &pos)| state.points[pos].endpoint || state.points[pos].shared)
            .map(|(k, _)| k)
            .collect();
        if special.len() < 2 {
            positions.iter().for_each(|&pos| keep[pos] = true);
            continue;
        }

        for w in special.windows(2) {
            let (i, j) = (w[0], w[1]);
            let span = &positions[i..=j];
            let dist: f64 = span[1..].iter().map(|&pos| state.points[pos].distance_km).sum();
            let angle = mean_angle_deg(span.iter().filter_map(|&pos| state.points[pos].angle));
            let angle_inv = mean_angle_deg(span.iter().filter_map(|&pos| state.points[pos].angle_inv));

            let from_vertex = state.points[positions[i]].vertex_index;
            let head = &mut state.points[positions[i]];
            if let Some(a) = angle {
                head.angle = Some(round6(a));
            }
            if let Some(a) = angle_inv {
                head.angle_inv = Some(round6(a));
            }

            let tail = &mut state.points[positions[j]];
            tail.vertex_to = from_vertex;
            tail.distance_km = round6(dist);

            keep[positions[i]] = true;
            keep[positions[j]] = true;
        }
    }

    let before = state.points.len();
    let mut flags = keep.into_iter();
    state.points.retain(|_| flags.next().unwrap_or(true));
    renumber_vertices(&mut state);

    info!("interior collapse: {before} points reduced to {}", state.points.len());
    state
}

/// Renumber `vertex_index` to `0..K` per street, remap `vertex_to` through
/// the same map (unknown targets become 0) and rebuild the logical geometry
/// from the points.
fn renumber_vertices(state: &mut GraphState) {
    let by_street = state.points_by_street();
    let mut geometry: FxHashMap<StreetId, Vec<Coord>> = FxHashMap::default();

    for (&id, positions) in &by_street {
        let mut old_to_new: FxHashMap<u32, u32> = positions
            .iter()
            .enumerate()
            .map(|(new, &pos)| (state.points[pos].vertex_index, new as u32))
            .collect();
        old_to_new.insert(0, 0);

        for (new, &pos) in positions.iter().enumerate() {
            let p = &mut state.points[pos];
            p.vertex_index = new as u32;
            p.vertex_to = old_to_new.get(&p.vertex_to).copied().unwrap_or(0);
        }
        geometry.insert(id, positions.iter().map(|&pos| state.points[pos].coord).collect());
    }

    for street in &mut state.streets {
        match geometry.remove(&street.id) {
            Some(coords) if coords.len() >= 2 => street.geometry = LineString::new(coords),
            _ => {}
        }
    }
}

// ── Boundary merge ───────────────────────────────────────────────────────────

/// Merge pairs of two-point streets that meet at a vertex shared by exactly
/// those two streets and sit in different neighborhoods.
///
/// The merged street runs between the two far endpoints, starting at the
/// one that was a street start.  Its distance is the sum, its bearings are
/// the circular mean of the four contributing points, its visual geometry
/// is the two visual polylines joined at the shared vertex, and its
/// neighborhood is re-derived from that geometry by the dominance rule
/// (falling back to the first street's).  The junction vertex disappears.
pub fn remove_boundary_vertices(
    mut state: GraphState,
    config: &PipelineConfig,
    hoods: &NeighborhoodIndex,
) -> GraphState {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut by_key: FxHashMap<CoordKey, usize> = FxHashMap::default();
    for (pos, p) in state.points.iter().enumerate() {
        let slot = *by_key.entry(CoordKey::of(p.coord)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(pos);
    }

    let pairs: Vec<(usize, usize)> = groups
        .iter()
        .filter(|g| g.len() == 2)
        .map(|g| (g[0], g[1]))
        .filter(|&(a, b)| {
            let (pa, pb) = (&state.points[a], &state.points[b]);
            pa.street_id != pb.street_id && pa.neighborhood_id() != pb.neighborhood_id()
        })
        .collect();
    if pairs.is_empty() {
        info!("boundary merge: nothing to merge");
        return state;
    }

    let by_street = state.points_by_street();
    let street_row: FxHashMap<StreetId, usize> = state.streets.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
    let visual_row: FxHashMap<StreetId, usize> =
        state.visual_streets.iter().enumerate().map(|(i, s)| (s.id, i)).collect();

    let mut next_id = state.next_street_id();
    let mut consumed: FxHashSet<StreetId> = FxHashSet::default();
    let mut merged_streets: Vec<StreetRecord> = Vec::new();
    let mut merged_visual: Vec<StreetRecord> = Vec::new();
    let mut merged_points: Vec<PointRecord> = Vec::new();

    for (j1, j2) in pairs {
        let (line1, line2) = (state.points[j1].street_id, state.points[j2].street_id);
        if consumed.contains(&line1) || consumed.contains(&line2) {
            continue;
        }
        let (Some(&row1), Some(&row2)) = (street_row.get(&line1), street_row.get(&line2)) else {
            continue;
        };
        let (Some(a), Some(c)) = (far_end(&by_street, line1, j1), far_end(&by_street, line2, j2)) else {
            warn!("boundary merge: {line1} / {line2} are not two-point streets meeting at one vertex, skipped");
            continue;
        };

        let (pa, pc) = (&state.points[a], &state.points[c]);
        let (pj1, pj2) = (&state.points[j1], &state.points[j2]);
        let s1 = &state.streets[row1];
        let s2 = &state.streets[row2];
        let v1 = visual_row.get(&line1).map_or(s1, |&r| &state.visual_streets[r]);
        let v2 = visual_row.get(&line2).map_or(s2, |&r| &state.visual_streets[r]);

        // Visual polylines oriented first → junction and junction → second.
        let (first, second, mut lead, mut trail) = if pa.vertex_index == 0 {
            (pa, pc, v1.coords().to_vec(), v2.coords().to_vec())
        } else {
            (pc, pa, v2.coords().to_vec(), v1.coords().to_vec())
        };
        let (lead_junction, trail_junction) = if pa.vertex_index == 0 { (pj1, pj2) } else { (pj2, pj1) };
        if lead_junction.vertex_index == 0 {
            lead.reverse();
        }
        if trail_junction.vertex_index != 0 {
            trail.reverse();
        }
        lead.extend(trail.into_iter().skip(1));
        let visual_line = LineString::new(lead);

        let id = next_id;
        next_id = next_id.next();
        let total = round6(s1.total_dist_km + s2.total_dist_km);
        let angle = mean_angle_deg([pa, pc, pj1, pj2].iter().filter_map(|p| p.angle)).map(round6);
        let angle_inv = mean_angle_deg([pa, pc, pj1, pj2].iter().filter_map(|p| p.angle_inv)).map(round6);
        let neighborhood = hoods
            .dominant(&visual_line, config.dominance_share)
            .or_else(|| s1.neighborhood.clone());

        let mut street = s1.clone();
        street.id = id;
        street.geometry = LineString::new(vec![first.coord, second.coord]);
        street.total_dist_km = total;
        street.neighborhood = neighborhood.clone();

        let mut visual = v1.clone();
        visual.id = id;
        visual.geometry = visual_line;
        visual.total_dist_km = total;
        visual.neighborhood = neighborhood;

        let mut start = first.clone();
        start.street_id = id;
        start.vertex_index = 0;
        start.vertex_to = 0;
        start.distance_km = 0.0;
        start.angle = angle;
        start.angle_inv = angle_inv;

        let mut end = second.clone();
        end.street_id = id;
        end.vertex_index = 1;
        end.vertex_to = 0;
        end.distance_km = total;
        end.clear_angles();

        debug!("merged {line1} and {line2} into temporary {id}");
        consumed.insert(line1);
        consumed.insert(line2);
        merged_streets.push(street);
        merged_visual.push(visual);
        merged_points.push(start);
        merged_points.push(end);
    }

    let merged = merged_streets.len();
    state.remove_streets(&consumed);
    state.streets.extend(merged_streets);
    state.visual_streets.extend(merged_visual);
    state.points.extend(merged_points);
    if merged > 0 {
        state.reindex_streets();
        state.drop_orphan_points();
    }
    info!("boundary merge: {merged} street pairs merged");
    state
}

/// The other point of a two-point street, given one of its points.
fn far_end(by_street: &FxHashMap<StreetId, Vec<usize>>, street: StreetId, junction: usize) -> Option<usize> {
    match by_street.get(&street)?.as_slice() {
        &[a, b] if a == junction => Some(b),
        &[a, b] if b == junction => Some(a),
        _ => None,
    }
}
