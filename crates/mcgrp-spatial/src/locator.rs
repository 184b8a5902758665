//! R-tree lookup of visual streets by location.
//!
//! Used by the edit session to resolve a click to the nearest street after
//! street ids were renumbered, and to answer rectangle selections.
//! Distances are planar in degrees, which is enough to rank candidates
//! within a city.

use geo::{Coord, Intersects, LineString, Rect};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use mcgrp_core::{StreetId, StreetRecord};

use crate::projection::polyline_distance_2;

// ── R-tree entry ─────────────────────────────────────────────────────────────

struct StreetEntry {
    id:       StreetId,
    line:     LineString<f64>,
    envelope: AABB<[f64; 2]>,
}

impl StreetEntry {
    fn new(street: &StreetRecord) -> Option<Self> {
        let coords = street.coords();
        let first = coords.first()?;
        let (mut lo, mut hi) = ([first.x, first.y], [first.x, first.y]);
        for c in coords {
            lo = [lo[0].min(c.x), lo[1].min(c.y)];
            hi = [hi[0].max(c.x), hi[1].max(c.y)];
        }
        Some(Self {
            id:       street.id,
            line:     street.geometry.clone(),
            envelope: AABB::from_corners(lo, hi),
        })
    }
}

impl RTreeObject for StreetEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl PointDistance for StreetEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        polyline_distance_2(Coord { x: point[0], y: point[1] }, &self.line)
    }
}

// ── StreetLocator ────────────────────────────────────────────────────────────

pub struct StreetLocator {
    tree: RTree<StreetEntry>,
}

impl StreetLocator {
    /// Index the given streets (normally `GraphState::visual_streets`).
    pub fn new(streets: &[StreetRecord]) -> Self {
        let entries = streets.iter().filter_map(StreetEntry::new).collect();
        Self { tree: RTree::bulk_load(entries) }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// The street whose polyline passes closest to `coord`.
    pub fn nearest_street(&self, coord: Coord) -> Option<StreetId> {
        self.tree.nearest_neighbor(&[coord.x, coord.y]).map(|e| e.id)
    }

    /// Streets whose polyline intersects `rect`, sorted by id.
    pub fn box_select(&self, rect: Rect<f64>) -> Vec<StreetId> {
        let (min, max) = (rect.min(), rect.max());
        let query = AABB::from_corners([min.x, min.y], [max.x, max.y]);
        let mut ids: Vec<StreetId> = self
            .tree
            .locate_in_envelope_intersecting(&query)
            .filter(|e| rect.intersects(&e.line))
            .map(|e| e.id)
            .collect();
        ids.sort_unstable();
        ids
    }
}
