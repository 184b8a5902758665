//! The graph state threaded through every stage.
//!
//! # Tables
//!
//! | Field            | Rows                                                |
//! |------------------|-----------------------------------------------------|
//! | `streets`        | logical streets (straight, two points once indexed) |
//! | `points`         | vertices of the logical streets                     |
//! | `visual_streets` | curved streets, aligned 1:1 with `streets` by id    |
//! | `nodes`          | one visual point per distinct rounded coordinate    |
//! | `neighborhoods`  | neighborhood polygons                               |
//!
//! Side indexes (`by id`, `by street`, `by coordinate`) are built on demand
//! by the helpers below and never stored, so a table can be rewritten
//! wholesale without invalidating anything.

use std::collections::BTreeSet;
use std::collections::hash_map::Entry;

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{CoreError, CoreResult};
use crate::geodesy::CoordKey;
use crate::ids::{ArcIndex, DenseId, EdgeIndex, NeighborhoodId, NodeIndex, StreetId};
use crate::reindex::{reindex, IdMap};
use crate::schema::{Crs, LinkIndex, Neighborhood, NodeRecord, NodeService, PointRecord, StreetRecord};

#[derive(Clone, Debug, Default)]
pub struct GraphState {
    pub streets:        Vec<StreetRecord>,
    pub points:         Vec<PointRecord>,
    pub visual_streets: Vec<StreetRecord>,
    pub nodes:          Vec<NodeRecord>,
    pub neighborhoods:  Vec<Neighborhood>,
    pub crs:            Crs,
}

impl GraphState {
    pub fn new(crs: Crs, neighborhoods: Vec<Neighborhood>) -> Self {
        Self { crs, neighborhoods, ..Self::default() }
    }

    // ── Lookups ───────────────────────────────────────────────────────────

    pub fn street(&self, id: StreetId) -> Option<&StreetRecord> {
        self.streets.iter().find(|s| s.id == id)
    }

    pub fn street_mut(&mut self, id: StreetId) -> Option<&mut StreetRecord> {
        self.streets.iter_mut().find(|s| s.id == id)
    }

    pub fn visual_street(&self, id: StreetId) -> Option<&StreetRecord> {
        self.visual_streets.iter().find(|s| s.id == id)
    }

    pub fn visual_street_mut(&mut self, id: StreetId) -> Option<&mut StreetRecord> {
        self.visual_streets.iter_mut().find(|s| s.id == id)
    }

    /// Like [`street`](Self::street) but an error when missing.
    pub fn require_street(&self, id: StreetId) -> CoreResult<&StreetRecord> {
        self.street(id).ok_or(CoreError::StreetNotFound(id))
    }

    pub fn neighborhood(&self, id: NeighborhoodId) -> Option<&Neighborhood> {
        self.neighborhoods.iter().find(|n| n.id == id)
    }

    pub fn node(&self, node: NodeIndex) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.node_index == Some(node))
    }

    /// Positions in `points` of each street's points, sorted by vertex index.
    pub fn points_by_street(&self) -> FxHashMap<StreetId, Vec<usize>> {
        let mut by_street: FxHashMap<StreetId, Vec<usize>> = FxHashMap::default();
        for (i, p) in self.points.iter().enumerate() {
            by_street.entry(p.street_id).or_default().push(i);
        }
        for positions in by_street.values_mut() {
            positions.sort_by_key(|&i| self.points[i].vertex_index);
        }
        by_street
    }

    /// Points of one street, sorted by vertex index.
    pub fn street_points(&self, id: StreetId) -> Vec<&PointRecord> {
        let mut pts: Vec<&PointRecord> = self.points.iter().filter(|p| p.street_id == id).collect();
        pts.sort_by_key(|p| p.vertex_index);
        pts
    }

    /// The first point flagged as depot.
    pub fn depot_point(&self) -> Option<&PointRecord> {
        self.points.iter().find(|p| p.service.depot)
    }

    pub fn depot_node(&self) -> Option<NodeIndex> {
        self.depot_point().and_then(|p| p.node_index)
    }

    pub fn node_service(&self, node: NodeIndex) -> Option<NodeService> {
        self.points
            .iter()
            .find(|p| p.node_index == Some(node))
            .map(|p| p.service)
    }

    // ── Allocation ────────────────────────────────────────────────────────

    pub fn next_street_id(&self) -> StreetId {
        self.streets
            .iter()
            .map(|s| s.id)
            .max()
            .map_or(StreetId(1), DenseId::next)
    }

    pub fn next_edge_index(&self) -> EdgeIndex {
        self.streets
            .iter()
            .filter_map(StreetRecord::edge_index)
            .max()
            .map_or(EdgeIndex(1), DenseId::next)
    }

    pub fn next_arc_index(&self) -> ArcIndex {
        self.streets
            .iter()
            .filter_map(StreetRecord::arc_index)
            .max()
            .map_or(ArcIndex(1), DenseId::next)
    }

    pub fn next_node_index(&self) -> NodeIndex {
        self.points
            .iter()
            .filter_map(|p| p.node_index)
            .max()
            .map_or(NodeIndex(1), DenseId::next)
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Set the service state of `node` on its node record and on every point
    /// carrying it.  Returns `false` if no point has that node index.
    pub fn set_node_service(&mut self, node: NodeIndex, service: NodeService) -> bool {
        let mut found = false;
        for p in self.points.iter_mut().filter(|p| p.node_index == Some(node)) {
            p.service = service;
            found = true;
        }
        for n in self.nodes.iter_mut().filter(|n| n.node_index == Some(node)) {
            n.service = service;
        }
        found
    }

    /// Replace the visual table with a copy of the logical one.
    pub fn mirror_visual_streets(&mut self) {
        self.visual_streets = self.streets.clone();
    }

    /// Remove streets (logical and visual) and their points.
    pub fn remove_streets(&mut self, ids: &FxHashSet<StreetId>) {
        if ids.is_empty() {
            return;
        }
        self.streets.retain(|s| !ids.contains(&s.id));
        self.visual_streets.retain(|s| !ids.contains(&s.id));
        self.points.retain(|p| !ids.contains(&p.street_id));
    }

    /// Drop points whose street no longer exists.  Returns how many went.
    pub fn drop_orphan_points(&mut self) -> usize {
        let live: FxHashSet<StreetId> = self.streets.iter().map(|s| s.id).collect();
        let before = self.points.len();
        self.points.retain(|p| live.contains(&p.street_id));
        before - self.points.len()
    }

    /// Renumber streets `1..=N` in logical row order.
    ///
    /// The new ids are applied to the visual table (which is re-sorted to the
    /// logical order), to point `street_id`s and to node street lists; rows
    /// referencing a street that no longer exists are dropped.
    pub fn reindex_streets(&mut self) -> IdMap<StreetId> {
        let (new_ids, map) = reindex(self.streets.iter().map(|s| s.id));
        for (street, id) in self.streets.iter_mut().zip(new_ids) {
            street.id = id;
        }

        self.points.retain_mut(|p| match map.get(p.street_id) {
            Some(id) => {
                p.street_id = id;
                true
            }
            None => false,
        });

        self.visual_streets.retain_mut(|s| match map.get(s.id) {
            Some(id) => {
                s.id = id;
                true
            }
            None => false,
        });
        self.visual_streets.sort_by_key(|s| s.id);

        for node in &mut self.nodes {
            node.street_ids = node.street_ids.iter().filter_map(|&id| map.get(id)).collect();
        }

        debug!("reindexed {} streets", map.len());
        map
    }

    /// Rebuild the node table from the points, keeping the service state of
    /// the current nodes.
    pub fn rebuild_nodes(&mut self) {
        let restore: FxHashMap<NodeIndex, NodeService> = self
            .nodes
            .iter()
            .filter_map(|n| n.node_index.map(|idx| (idx, n.service)))
            .collect();
        self.rebuild_nodes_with(&restore);
    }

    /// Rebuild the node table from the points.
    ///
    /// Points are grouped by rounded coordinate in first-seen order.  A
    /// group takes its node index from its first point and its neighborhood
    /// from the first point that has one.  Service state comes from
    /// `restore` when the node index is listed there, otherwise from the
    /// first point (with demand if any point has demand), and is written back
    /// to every point of the node.
    pub fn rebuild_nodes_with(&mut self, restore: &FxHashMap<NodeIndex, NodeService>) {
        let mut nodes: Vec<NodeRecord> = Vec::new();
        let mut by_key: FxHashMap<CoordKey, usize> = FxHashMap::default();

        for p in &self.points {
            match by_key.entry(CoordKey::of(p.coord)) {
                Entry::Occupied(e) => {
                    let node = &mut nodes[*e.get()];
                    node.street_ids.push(p.street_id);
                    node.inserted |= p.inserted;
                    node.service.demand = node.service.demand.max(p.service.demand);
                    if node.neighborhood.is_none() {
                        node.neighborhood = p.neighborhood.clone();
                    }
                }
                Entry::Vacant(e) => {
                    e.insert(nodes.len());
                    nodes.push(NodeRecord::from_point(p));
                }
            }
        }

        for node in &mut nodes {
            if let Some(service) = node.node_index.and_then(|idx| restore.get(&idx)) {
                node.service = *service;
            }
        }

        let services: FxHashMap<NodeIndex, NodeService> = nodes
            .iter()
            .filter_map(|n| n.node_index.map(|idx| (idx, n.service)))
            .collect();
        for p in &mut self.points {
            if let Some(service) = p.node_index.and_then(|idx| services.get(&idx)) {
                p.service = *service;
            }
        }

        debug!("rebuilt {} nodes from {} points", nodes.len(), self.points.len());
        self.nodes = nodes;
    }

    // ── Integrity ─────────────────────────────────────────────────────────

    /// Check the invariants every indexed state must satisfy.
    ///
    /// - street ids are `1..=N` in row order, and the visual table has the
    ///   same ids in the same order;
    /// - every street has an edge or arc index, each series dense `1..=n`;
    /// - every `from_node`/`to_node` is carried by a point;
    /// - point node indices are dense `1..=n`;
    /// - at most one node is the depot.
    pub fn check_integrity(&self) -> CoreResult<()> {
        for (pos, street) in self.streets.iter().enumerate() {
            if street.id.0 as usize != pos + 1 {
                return Err(CoreError::Integrity(format!(
                    "street at row {pos} has id {}, expected {}",
                    street.id,
                    pos + 1
                )));
            }
        }

        if self.visual_streets.len() != self.streets.len()
            || self.visual_streets.iter().zip(&self.streets).any(|(v, s)| v.id != s.id)
        {
            return Err(CoreError::Integrity(format!(
                "visual streets ({}) are not aligned with logical streets ({})",
                self.visual_streets.len(),
                self.streets.len()
            )));
        }

        let mut edges = Vec::new();
        let mut arcs = Vec::new();
        for street in &self.streets {
            match street.link {
                Some(LinkIndex::Edge(e)) => edges.push(e.0),
                Some(LinkIndex::Arc(a)) => arcs.push(a.0),
                None => {
                    return Err(CoreError::Integrity(format!("{} has no edge or arc index", street.id)));
                }
            }
        }
        check_dense("edge_index", edges)?;
        check_dense("arc_index", arcs)?;

        let point_nodes: FxHashSet<NodeIndex> = self.points.iter().filter_map(|p| p.node_index).collect();
        for street in &self.streets {
            for endpoint in [street.from_node, street.to_node] {
                match endpoint {
                    Some(node) if point_nodes.contains(&node) => {}
                    Some(node) => {
                        return Err(CoreError::Integrity(format!(
                            "{} references {node} which no point carries",
                            street.id
                        )));
                    }
                    None => {
                        return Err(CoreError::Integrity(format!("{} is missing an endpoint node", street.id)));
                    }
                }
            }
        }
        if self.points.iter().any(|p| p.node_index.is_none()) {
            return Err(CoreError::Integrity("a point has no node index".into()));
        }
        check_dense("node_index", point_nodes.iter().map(|n| n.0).collect())?;

        let depots: BTreeSet<Option<NodeIndex>> = self
            .points
            .iter()
            .filter(|p| p.service.depot)
            .map(|p| p.node_index)
            .collect();
        if depots.len() > 1 {
            return Err(CoreError::Integrity(format!("{} nodes are flagged as depot", depots.len())));
        }
        Ok(())
    }
}

/// `values` (in any order) must be exactly `{1..=len}`.
fn check_dense(label: &str, mut values: Vec<u32>) -> CoreResult<()> {
    values.sort_unstable();
    for (pos, v) in values.iter().enumerate() {
        if *v as usize != pos + 1 {
            return Err(CoreError::Integrity(format!(
                "{label} values are not dense 1..={}: found {v} at rank {}",
                values.len(),
                pos + 1
            )));
        }
    }
    Ok(())
}
