//! Structural edits of an indexed graph.
//!
//! Every operation borrows the prior state and returns a fresh one, so a
//! failed edit leaves the caller's state untouched.
//!
//! Street ids stay dense after each edit.  New streets take the next free
//! edge or arc index, which can leave gaps in those series until
//! [`finalize_reindexing`] re-sequences them.

use geo::{Closest, ClosestPoint, Coord, LineString, Point};
use log::{debug, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use mcgrp_core::geodesy::{
    azimuth_inverse, calculate_traversal_cost, mean_angle_deg, polyline_length_m, round6, segment_azimuths,
    service_cost,
};
use mcgrp_core::{
    reindex_sorted, ArcIndex, CoordKey, CoreError, DenseId, EdgeIndex, GraphState, LinkIndex, LinkKind, NodeIndex,
    NodeService, PointRecord, StreetId, StreetRecord,
};
use mcgrp_spatial::projection::segment_distance_2;

use crate::error::{EditError, EditResult};

/// A snapped point lies on a segment when it is closer than this, degrees.
const ON_SEGMENT_TOLERANCE: f64 = 1e-8;

// ── Types ────────────────────────────────────────────────────────────────────

/// What the node inserted by [`split_street`] becomes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewNode {
    pub depot:        bool,
    /// Ignored for a depot.
    pub service_cost: u32,
}

impl NewNode {
    pub fn required(service_cost: u32) -> Self {
        Self { depot: false, service_cost }
    }

    pub fn depot() -> Self {
        Self { depot: true, service_cost: 0 }
    }

    pub fn service(self) -> NodeService {
        if self.depot {
            NodeService::depot()
        } else {
            NodeService::required(self.service_cost)
        }
    }
}

/// Result of [`split_street`]: the new state and the index of the node
/// that was inserted.
#[derive(Clone, Debug)]
pub struct SplitOutcome {
    pub state: GraphState,
    pub node:  NodeIndex,
}

/// Length, bearings and costs of one half of a split or of a merged street.
struct Piece {
    visual:    Vec<Coord>,
    dist_km:   f64,
    angle:     Option<f64>,
    angle_inv: Option<f64>,
    traversal: u32,
}

impl Piece {
    fn measure(visual: Vec<Coord>, maxspeed: Option<&str>) -> Self {
        let dist_km = round6(polyline_length_m(&visual) / 1000.0);
        let angle = mean_angle_deg(segment_azimuths(&visual)).map(round6);
        Self {
            dist_km,
            angle,
            angle_inv: angle.map(|a| round6(azimuth_inverse(a))),
            traversal: calculate_traversal_cost(Some(dist_km), maxspeed),
            visual,
        }
    }
}

// ── Split ────────────────────────────────────────────────────────────────────

/// Insert a node where `click` projects onto the visual geometry of
/// `street_id`, replacing the street A–B by A–C and C–B.
///
/// Distances, bearings and costs of the halves come from the curved visual
/// geometry.  The halves keep every attribute of the original street,
/// including its requirement flag, and take the next free edge or arc
/// indices of its kind.  C is marked as inserted, shared and endpoint and
/// gets the service described by `new_node`.  An inserted depot takes over
/// from any previous depot, which loses its service; every other node keeps
/// its service.
pub fn split_street(
    state: &GraphState,
    street_id: StreetId,
    click: Coord,
    new_node: NewNode,
) -> EditResult<SplitOutcome> {
    let street = state.require_street(street_id)?;
    let visual = state.visual_street(street_id).unwrap_or(street);
    let (Some(node_a), Some(node_b)) = (street.from_node, street.to_node) else {
        return Err(EditError::Topology(format!("{street_id} has no endpoint nodes")));
    };
    let point_a = endpoint_point(state, street_id, node_a)?;
    let point_b = endpoint_point(state, street_id, node_b)?;

    let (split_at, snapped) = snap_to_line(&visual.geometry, click)
        .ok_or_else(|| EditError::Topology(format!("{street_id} has no geometry to split")))?;
    let key = CoordKey::of(snapped);
    if key == CoordKey::of(point_a.coord) || key == CoordKey::of(point_b.coord) {
        return Err(EditError::Topology(format!("the click snaps onto an end of {street_id}")));
    }

    let coords = visual.coords();
    let maxspeed = street.tags.maxspeed.as_deref();
    let mut head = coords[..split_at].to_vec();
    head.push(snapped);
    let rest = &coords[split_at..];
    let mut tail = vec![snapped];
    tail.extend_from_slice(if rest.first() == Some(&snapped) { &rest[1..] } else { rest });
    let ac = Piece::measure(head, maxspeed);
    let cb = Piece::measure(tail, maxspeed);

    let id_ac = state.next_street_id();
    let id_cb = id_ac.next();
    let (link_ac, link_cb) = match street.link {
        Some(LinkIndex::Edge(_)) => {
            let e = state.next_edge_index();
            (LinkIndex::Edge(e), LinkIndex::Edge(e.next()))
        }
        Some(LinkIndex::Arc(_)) => {
            let a = state.next_arc_index();
            (LinkIndex::Arc(a), LinkIndex::Arc(a.next()))
        }
        None => return Err(EditError::Topology(format!("{street_id} has no edge or arc index"))),
    };
    let node_c = state.next_node_index();
    debug!("splitting {street_id} into {id_ac} and {id_cb} at {node_c}");

    let halves = [
        (id_ac, link_ac, node_a, node_c, point_a.coord, snapped, &ac),
        (id_cb, link_cb, node_c, node_b, snapped, point_b.coord, &cb),
    ];
    let mut new_streets = Vec::with_capacity(2);
    let mut new_visual = Vec::with_capacity(2);
    for (id, link, from, to, start, end, piece) in halves {
        let mut logical = street.clone();
        logical.id = id;
        logical.geometry = LineString::new(vec![start, end]);
        logical.link = Some(link);
        logical.from_node = Some(from);
        logical.to_node = Some(to);
        logical.total_dist_km = piece.dist_km;
        logical.traversal_cost = piece.traversal;
        logical.service_cost = service_cost(piece.traversal);

        let mut curved = logical.clone();
        curved.tags = visual.tags.clone();
        curved.geometry = LineString::new(piece.visual.clone());
        new_streets.push(logical);
        new_visual.push(curved);
    }

    let mut a = point_a.clone();
    a.street_id = id_ac;
    a.vertex_index = 0;
    a.vertex_to = 0;
    a.distance_km = 0.0;
    a.angle = ac.angle;
    a.angle_inv = ac.angle_inv;

    let mut c_in = inserted_point(snapped, id_ac, 1, street, node_c, new_node.service());
    c_in.distance_km = ac.dist_km;

    let mut c_out = inserted_point(snapped, id_cb, 0, street, node_c, new_node.service());
    c_out.angle = cb.angle;
    c_out.angle_inv = cb.angle_inv;

    let mut b = point_b.clone();
    b.street_id = id_cb;
    b.vertex_index = 1;
    b.vertex_to = 0;
    b.distance_km = cb.dist_km;
    b.clear_angles();

    let mut next = state.clone();
    next.remove_streets(&FxHashSet::from_iter([street_id]));
    next.streets.extend(new_streets);
    next.visual_streets.extend(new_visual);
    next.points.extend([a, c_in, c_out, b]);
    if new_node.depot {
        if let Some(old) = state.depot_node() {
            debug!("{node_c} replaces {old} as the depot");
            next.set_node_service(old, NodeService::default());
        }
    }
    next.reindex_streets();
    next.rebuild_nodes();

    info!("split {street_id} at new {node_c}; {} streets now", next.streets.len());
    Ok(SplitOutcome { state: next, node: node_c })
}

/// Project `click` onto `line`.  Returns the coordinate position at which
/// the projected point has to be inserted, and the projected point.
fn snap_to_line(line: &LineString<f64>, click: Coord) -> Option<(usize, Coord)> {
    let snapped = match line.closest_point(&Point::from(click)) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => p.0,
        Closest::Indeterminate => return None,
    };
    let coords = &line.0;
    let at = coords
        .windows(2)
        .position(|w| segment_distance_2(snapped, w[0], w[1]).sqrt() < ON_SEGMENT_TOLERANCE)
        .map_or(coords.len(), |i| i + 1);
    Some((at, snapped))
}

fn inserted_point(
    coord: Coord,
    street_id: StreetId,
    vertex_index: u32,
    street: &StreetRecord,
    node: NodeIndex,
    service: NodeService,
) -> PointRecord {
    let mut p = PointRecord::new(coord, street_id, vertex_index).inherit_from(street);
    p.endpoint = true;
    p.shared = true;
    p.inserted = true;
    p.node_index = Some(node);
    p.service = service;
    p
}

/// The point of `street` carrying `node`.
fn endpoint_point(state: &GraphState, street: StreetId, node: NodeIndex) -> EditResult<&PointRecord> {
    state
        .points
        .iter()
        .find(|p| p.street_id == street && p.node_index == Some(node))
        .ok_or_else(|| EditError::Topology(format!("{street} has no point at {node}")))
}

/// Whether the last vertex of `head` lies on the segment joining the vertex
/// before it and the second vertex of `tail`.
fn junction_is_straight(head: &[Coord], tail: &[Coord]) -> bool {
    let prev = head.len().checked_sub(2).and_then(|i| head.get(i));
    match (prev, head.last(), tail.get(1)) {
        (Some(&prev), Some(&at), Some(&next)) => segment_distance_2(at, prev, next).sqrt() < ON_SEGMENT_TOLERANCE,
        _ => false,
    }
}

// ── Merge ────────────────────────────────────────────────────────────────────

/// Remove `node` and merge the street ending there (A–C) with the street
/// starting there (C–B) into A–B.
///
/// Fails with [`EditError::Topology`] unless exactly two streets touch the
/// node, one arriving and one leaving.  The merged street takes its
/// attributes from A–C, the summed distance and traversal cost, and is
/// required if either half was.  When the node was inserted by
/// [`split_street`], the junction vertex is dropped from the visual geometry
/// if it lies straight between its neighbours, which restores the polyline
/// as it was before the split.  A junction on a bend is kept.
pub fn remove_node_and_merge_streets(state: &GraphState, node: NodeIndex) -> EditResult<GraphState> {
    let incident: Vec<&StreetRecord> = state
        .streets
        .iter()
        .filter(|s| s.from_node == Some(node) || s.to_node == Some(node))
        .collect();
    if incident.len() != 2 {
        return Err(EditError::Topology(format!(
            "{node} touches {} streets, expected 2",
            incident.len()
        )));
    }
    let (Some(&ac), Some(&cb)) = (
        incident.iter().find(|s| s.to_node == Some(node)),
        incident.iter().find(|s| s.from_node == Some(node)),
    ) else {
        return Err(EditError::Topology(format!("{node} is not between an arriving and a leaving street")));
    };
    if ac.id == cb.id {
        return Err(EditError::Topology(format!("{} starts and ends at {node}", ac.id)));
    }
    let (Some(node_a), Some(node_b)) = (ac.from_node, cb.to_node) else {
        return Err(EditError::Topology(format!("{} or {} has no far endpoint", ac.id, cb.id)));
    };
    if node_a == node_b {
        return Err(EditError::Topology(format!("merging at {node} would close a loop on {node_a}")));
    }
    let point_a = endpoint_point(state, ac.id, node_a)?;
    let point_b = endpoint_point(state, cb.id, node_b)?;

    let visual_ac = state.visual_street(ac.id).unwrap_or(ac);
    let visual_cb = state.visual_street(cb.id).unwrap_or(cb);
    let (head, tail) = (visual_ac.coords(), visual_cb.coords());
    if head.last().map(|&c| CoordKey::of(c)) != tail.first().map(|&c| CoordKey::of(c)) {
        warn!("{} and {} do not meet at the same coordinate", ac.id, cb.id);
    }
    let inserted = state.node(node).is_some_and(|n| n.inserted)
        || state.points.iter().any(|p| p.node_index == Some(node) && p.inserted);
    let keep_head = if inserted && junction_is_straight(head, tail) {
        head.len() - 1
    } else {
        head.len()
    };
    let mut merged: Vec<Coord> = head[..keep_head].to_vec();
    merged.extend_from_slice(tail.get(1..).unwrap_or_default());
    if merged.len() < 2 {
        return Err(EditError::Topology(format!("merging {} and {} leaves no geometry", ac.id, cb.id)));
    }

    let id = state.next_street_id();
    let link = match ac.link_kind() {
        LinkKind::Edge => LinkIndex::Edge(state.next_edge_index()),
        LinkKind::Arc => LinkIndex::Arc(state.next_arc_index()),
    };
    let traversal = ac.traversal_cost + cb.traversal_cost;
    let total = round6(ac.total_dist_km + cb.total_dist_km);

    let mut street = ac.clone();
    street.id = id;
    street.geometry = LineString::new(vec![point_a.coord, point_b.coord]);
    street.link = Some(link);
    street.from_node = Some(node_a);
    street.to_node = Some(node_b);
    street.total_dist_km = total;
    street.traversal_cost = traversal;
    street.service_cost = service_cost(traversal);
    street.set_required(ac.required || cb.required);

    let mut visual = street.clone();
    visual.tags = visual_ac.tags.clone();
    visual.geometry = LineString::new(merged);

    let measured = Piece::measure(visual.geometry.0.clone(), None);
    let mut a = point_a.clone();
    a.street_id = id;
    a.vertex_index = 0;
    a.vertex_to = 0;
    a.distance_km = 0.0;
    a.angle = measured.angle;
    a.angle_inv = measured.angle_inv;

    let mut b = point_b.clone();
    b.street_id = id;
    b.vertex_index = 1;
    b.vertex_to = 0;
    b.distance_km = measured.dist_km;
    b.angle = Some(0.0);
    b.angle_inv = Some(0.0);

    let mut next = state.clone();
    next.remove_streets(&FxHashSet::from_iter([ac.id, cb.id]));
    next.streets.push(street);
    next.visual_streets.push(visual);
    next.points.extend([a, b]);
    next.reindex_streets();
    next.rebuild_nodes();

    info!("removed {node}, merging {} and {}", ac.id, cb.id);
    Ok(next)
}

// ── Final re-index ───────────────────────────────────────────────────────────

/// Renumber everything densely before an instance is saved or written.
///
/// Streets are sorted by id and renumbered `1..=N`; edge and arc indices
/// are re-sequenced in row order; node indices are mapped in ascending
/// order onto `1..=N` on points and street endpoints; the node table is
/// rebuilt with every node keeping its service.
pub fn finalize_reindexing(state: &GraphState) -> EditResult<GraphState> {
    let mut next = state.clone();
    next.streets.sort_by_key(|s| s.id);
    next.visual_streets.sort_by_key(|s| s.id);
    next.reindex_streets();

    let mut next_edge = EdgeIndex(1);
    let mut next_arc = ArcIndex(1);
    let mut links: FxHashMap<StreetId, LinkIndex> = FxHashMap::default();
    for street in &mut next.streets {
        let link = match street.link {
            Some(LinkIndex::Edge(_)) => {
                let e = next_edge;
                next_edge = next_edge.next();
                LinkIndex::Edge(e)
            }
            Some(LinkIndex::Arc(_)) => {
                let a = next_arc;
                next_arc = next_arc.next();
                LinkIndex::Arc(a)
            }
            None => return Err(CoreError::Integrity(format!("{} has no edge or arc index", street.id)).into()),
        };
        street.link = Some(link);
        links.insert(street.id, link);
    }

    let nodes = reindex_sorted(next.points.iter().filter_map(|p| p.node_index));
    let remap = |n: Option<NodeIndex>| n.and_then(|n| nodes.get(n));
    for p in &mut next.points {
        p.node_index = remap(p.node_index);
    }
    for street in next.streets.iter_mut().chain(next.visual_streets.iter_mut()) {
        street.from_node = remap(street.from_node);
        street.to_node = remap(street.to_node);
    }
    for visual in &mut next.visual_streets {
        visual.link = links.get(&visual.id).copied();
    }

    let restore: FxHashMap<NodeIndex, NodeService> = next
        .nodes
        .iter()
        .filter_map(|n| remap(n.node_index).map(|idx| (idx, n.service)))
        .collect();
    next.rebuild_nodes_with(&restore);
    next.check_integrity()?;

    info!(
        "final re-index: {} streets, {} edges, {} arcs, {} nodes",
        next.streets.len(),
        next_edge.get() - 1,
        next_arc.get() - 1,
        nodes.len()
    );
    Ok(next)
}
