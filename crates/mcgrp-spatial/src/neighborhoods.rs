//! Neighborhood overlay: dominance rule, boundary distance and boundary
//! crossings.
//!
//! Built once per stage from `GraphState::neighborhoods`.  Each entry keeps
//! the polygon projected to Web Mercator (for length shares and metric
//! distances) and the boundary rings in WGS-84 (for crossing tests against
//! street geometry, which stays geographic).

use geo::{BooleanOps, Coord, Intersects, LineString, MultiLineString, MultiPolygon};
use log::debug;

use mcgrp_core::{Neighborhood, NeighborhoodId, NeighborhoodRef};

use crate::projection::{planar_length, polyline_distance_2, project_line, project_multi_polygon, to_web_mercator};

struct Entry {
    membership:      NeighborhoodRef,
    projected:       MultiPolygon<f64>,
    rings:           Vec<LineString<f64>>,
    projected_rings: Vec<LineString<f64>>,
}

/// Query structure over a set of neighborhood polygons.
pub struct NeighborhoodIndex {
    entries: Vec<Entry>,
}

impl NeighborhoodIndex {
    pub fn new(neighborhoods: &[Neighborhood]) -> Self {
        let entries = neighborhoods
            .iter()
            .map(|n| {
                let rings = boundary_rings(&n.polygon);
                let projected_rings = rings.iter().map(project_line).collect();
                Entry {
                    membership: n.membership(),
                    projected: project_multi_polygon(&n.polygon),
                    rings,
                    projected_rings,
                }
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, id: NeighborhoodId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.membership.id == id)
    }

    /// Share of `line`'s projected length inside each neighborhood it
    /// touches, in neighborhood order.
    pub fn coverage(&self, line: &LineString<f64>) -> Vec<(NeighborhoodId, f64)> {
        let projected = project_line(line);
        let total = planar_length(&projected);
        if !(total > 0.0) {
            return Vec::new();
        }
        let lines = MultiLineString::new(vec![projected]);
        self.entries
            .iter()
            .filter_map(|e| {
                let inside: f64 = e.projected.clip(&lines, false).iter().map(planar_length).sum();
                (inside > 0.0).then_some((e.membership.id, inside / total))
            })
            .collect()
    }

    /// The neighborhood covering more than `share` of `line`'s projected
    /// length, if any.
    pub fn dominant(&self, line: &LineString<f64>, share: f64) -> Option<NeighborhoodRef> {
        let (best, pct) = self
            .coverage(line)
            .into_iter()
            .fold(None::<(NeighborhoodId, f64)>, |acc, (id, pct)| match acc {
                Some((_, best)) if best >= pct => acc,
                _ => Some((id, pct)),
            })?;
        if pct > share {
            self.entry(best).map(|e| e.membership.clone())
        } else {
            debug!("no neighborhood covers more than {share} of the line (best {best} at {pct:.3})");
            None
        }
    }

    /// Projected distance in metres from `coord` to the boundary of
    /// neighborhood `id`.  `None` for an unknown neighborhood.
    pub fn distance_to_boundary_m(&self, id: NeighborhoodId, coord: Coord) -> Option<f64> {
        let entry = self.entry(id)?;
        let p = to_web_mercator(coord);
        entry
            .projected_rings
            .iter()
            .map(|ring| polyline_distance_2(p, ring))
            .reduce(f64::min)
            .map(f64::sqrt)
    }

    /// `true` if `line` touches or crosses the boundary of neighborhood `id`.
    pub fn intersects_boundary(&self, id: NeighborhoodId, line: &LineString<f64>) -> bool {
        self.entry(id)
            .is_some_and(|e| e.rings.iter().any(|ring| ring.intersects(line)))
    }
}

/// Exterior and interior rings of every polygon.
fn boundary_rings(polygon: &MultiPolygon<f64>) -> Vec<LineString<f64>> {
    polygon
        .iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
        .cloned()
        .collect()
}
