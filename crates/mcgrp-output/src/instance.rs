//! Instance parameters and the table summary both file formats are built
//! from.

use std::collections::BTreeMap;

use mcgrp_core::{GraphState, LinkIndex, NodeIndex};

use crate::error::{OutputError, OutputResult};

// ── InstanceParams ───────────────────────────────────────────────────────────

/// Name and fleet settings of one instance.
///
/// `vehicles` and `capacity` fall back to the defaults of the format being
/// written when `None`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceParams {
    pub name:     String,
    pub vehicles: Option<u32>,
    pub capacity: Option<u32>,
}

impl InstanceParams {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), vehicles: None, capacity: None }
    }

    pub fn with_vehicles(mut self, vehicles: u32) -> Self {
        self.vehicles = Some(vehicles);
        self
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// The name is used as a file stem, so it must be non-empty and free of
    /// path separators.
    pub fn validate(&self) -> OutputResult<()> {
        let name = self.name.trim();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(OutputError::InvalidName(self.name.clone()));
        }
        Ok(())
    }
}

/// Fleet defaults of one file format.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FleetDefaults {
    pub vehicles: u32,
    pub capacity: u32,
}

impl FleetDefaults {
    pub fn resolve(self, params: &InstanceParams) -> (u32, u32) {
        (params.vehicles.unwrap_or(self.vehicles), params.capacity.unwrap_or(self.capacity))
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct NodeRow {
    pub index:        u32,
    pub demand:       u32,
    pub service_cost: u32,
    /// Required and not the depot.
    pub required:     bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct LinkRow {
    pub index:          u32,
    pub from:           u32,
    pub to:             u32,
    pub traversal_cost: u32,
    pub demand:         u32,
    pub service_cost:   u32,
    pub required:       bool,
}

/// Counts and rows of a re-indexed state.
///
/// Nodes are ordered by node index; edges and arcs by street id, which for
/// a re-indexed state is also their own index order.
#[derive(Clone, Debug, Default)]
pub(crate) struct InstanceSummary {
    /// 0 when no node is the depot.
    pub depot:    u32,
    pub max_node: u32,
    pub max_edge: u32,
    pub max_arc:  u32,
    pub nodes:    Vec<NodeRow>,
    pub edges:    Vec<LinkRow>,
    pub arcs:     Vec<LinkRow>,
}

impl InstanceSummary {
    pub fn collect(state: &GraphState) -> Self {
        let mut summary = Self::default();

        let mut nodes: BTreeMap<NodeIndex, NodeRow> = BTreeMap::new();
        for node in &state.nodes {
            let Some(idx) = node.node_index else { continue };
            if node.service.depot {
                summary.depot = idx.get();
            }
            nodes.entry(idx).or_insert(NodeRow {
                index:        idx.get(),
                demand:       node.service.demand,
                service_cost: node.service.service_cost,
                required:     node.service.is_serviced(),
            });
        }
        summary.max_node = nodes.keys().next_back().map_or(0, |n| n.get());
        summary.nodes = nodes.into_values().collect();

        let mut streets: Vec<_> = state.streets.iter().collect();
        streets.sort_by_key(|s| s.id);
        for street in streets {
            let Some(link) = street.link else { continue };
            let row = |index: u32| LinkRow {
                index,
                from:           street.from_node.map_or(0, |n| n.get()),
                to:             street.to_node.map_or(0, |n| n.get()),
                traversal_cost: street.traversal_cost,
                demand:         street.demand,
                service_cost:   street.service_cost,
                required:       street.required,
            };
            match link {
                LinkIndex::Edge(e) => {
                    summary.max_edge = summary.max_edge.max(e.get());
                    summary.edges.push(row(e.get()));
                }
                LinkIndex::Arc(a) => {
                    summary.max_arc = summary.max_arc.max(a.get());
                    summary.arcs.push(row(a.get()));
                }
            }
        }
        summary
    }

    pub fn required_nodes(&self) -> impl Iterator<Item = &NodeRow> {
        self.nodes.iter().filter(|n| n.required)
    }

    pub fn required_edges(&self) -> usize {
        self.edges.iter().filter(|e| e.required).count()
    }

    pub fn required_arcs(&self) -> usize {
        self.arcs.iter().filter(|a| a.required).count()
    }
}
