//! Request/response layer over the editor.
//!
//! An [`EditSession`] owns the live graph.  Each [`EditRequest`] either
//! succeeds, replacing the state and answering with an [`EditEvent`], or
//! leaves the state exactly as it was.

use geo::{Coord, Rect};
use log::{info, warn};

use mcgrp_core::{CoreError, GraphState, NodeIndex, NodeService, StreetId};
use mcgrp_spatial::{reduce_to_relevant, StreetLocator};

use crate::editor::{finalize_reindexing, remove_node_and_merge_streets, split_street, NewNode};
use crate::error::{EditError, EditResult};

/// Suffix appended to the name of a finalized run.
pub const REQUIRED_SUFFIX: &str = "_req";

// ── Requests and events ──────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EditRequest {
    /// Flip the requirement flag of a street.
    ToggleStreet(StreetId),

    /// Flip the requirement of a node.  `service_cost` applies when the node
    /// becomes required.  Un-requiring an inserted node removes it and
    /// merges its two streets.
    ToggleNode { node: NodeIndex, service_cost: u32 },

    /// Make `node` the depot.  Selecting the current depot clears it (and
    /// removes it if it was inserted).
    SetDepot(NodeIndex),

    /// Mark every street intersecting the rectangle as required.
    BoxSelectStreets(Rect<f64>),

    /// Insert a required node, or the depot, on a street at the click.
    AddNode {
        street:       StreetId,
        click:        Coord,
        depot:        bool,
        service_cost: u32,
    },

    /// Check the instance, re-index it and name the run.
    Finalize { run_name: String },

    /// Keep only the neighborhoods relevant to the depot and the required
    /// elements, then re-index.
    ReduceGraph,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EditEvent {
    StreetToggled { street: StreetId, required: bool },
    NodeToggled { node: NodeIndex, required: bool },
    DepotChanged { depot: Option<NodeIndex>, previous: Option<NodeIndex> },
    /// Streets that became required, sorted by id.
    StreetsSelected(Vec<StreetId>),
    /// Streets or nodes were added or removed; `node` is the inserted one.
    Restructured { node: Option<NodeIndex> },
    Finalized { run_name: String },
    Unchanged,
}

// ── EditSession ──────────────────────────────────────────────────────────────

pub struct EditSession {
    state: GraphState,
}

impl EditSession {
    pub fn new(state: GraphState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &GraphState {
        &self.state
    }

    pub fn into_state(self) -> GraphState {
        self.state
    }

    /// Apply one request.
    ///
    /// A topology failure is logged and answered with
    /// [`EditEvent::Unchanged`]; any other error is returned.  In both cases
    /// the state is the one from before the call.
    pub fn apply(&mut self, request: EditRequest) -> EditResult<EditEvent> {
        let outcome = match request {
            EditRequest::ToggleStreet(street) => self.toggle_street(street),
            EditRequest::ToggleNode { node, service_cost } => self.toggle_node(node, service_cost),
            EditRequest::SetDepot(node) => self.set_depot(node),
            EditRequest::BoxSelectStreets(rect) => Ok(self.box_select(rect)),
            EditRequest::AddNode { street, click, depot, service_cost } => {
                self.add_node(street, click, depot, service_cost)
            }
            EditRequest::Finalize { run_name } => self.finalize(&run_name),
            EditRequest::ReduceGraph => self.reduce(),
        };
        match outcome {
            Err(EditError::Topology(reason)) => {
                warn!("edit refused: {reason}");
                Ok(EditEvent::Unchanged)
            }
            other => other,
        }
    }

    // ── Handlers ──────────────────────────────────────────────────────────

    fn toggle_street(&mut self, id: StreetId) -> EditResult<EditEvent> {
        let street = self.state.street_mut(id).ok_or(CoreError::StreetNotFound(id))?;
        let required = !street.required;
        street.set_required(required);
        if let Some(visual) = self.state.visual_street_mut(id) {
            visual.set_required(required);
        }
        Ok(EditEvent::StreetToggled { street: id, required })
    }

    fn toggle_node(&mut self, node: NodeIndex, service_cost: u32) -> EditResult<EditEvent> {
        let service = self.service_of(node)?;
        if service.depot {
            return Err(EditError::Validation("the depot cannot be marked as required".into()));
        }
        if service.required && is_inserted(&self.state, node) {
            self.state = remove_node_and_merge_streets(&self.state, node)?;
            return Ok(EditEvent::Restructured { node: None });
        }

        let required = !service.required;
        let next = if required { NodeService::required(service_cost) } else { NodeService::default() };
        self.state.set_node_service(node, next);
        Ok(EditEvent::NodeToggled { node, required })
    }

    fn set_depot(&mut self, node: NodeIndex) -> EditResult<EditEvent> {
        let service = self.service_of(node)?;
        if service.required {
            return Err(EditError::Validation("a required node cannot be the depot".into()));
        }

        let previous = self.state.depot_node();
        let mut next = self.state.clone();
        if let Some(old) = previous {
            if is_inserted(&next, old) {
                next = remove_node_and_merge_streets(&next, old)?;
            } else {
                next.set_node_service(old, NodeService::default());
            }
        }

        let depot = if previous == Some(node) {
            None
        } else {
            if !next.set_node_service(node, NodeService::depot()) {
                return Err(CoreError::NodeNotFound(node).into());
            }
            Some(node)
        };
        self.state = next;
        Ok(EditEvent::DepotChanged { depot, previous })
    }

    fn box_select(&mut self, rect: Rect<f64>) -> EditEvent {
        let locator = StreetLocator::new(&self.state.visual_streets);
        let mut selected = Vec::new();
        for id in locator.box_select(rect) {
            if let Some(street) = self.state.street_mut(id).filter(|s| !s.required) {
                street.set_required(true);
                if let Some(visual) = self.state.visual_street_mut(id) {
                    visual.set_required(true);
                }
                selected.push(id);
            }
        }
        if selected.is_empty() {
            return EditEvent::Unchanged;
        }
        info!("box selection marked {} streets as required", selected.len());
        EditEvent::StreetsSelected(selected)
    }

    fn add_node(&mut self, street: StreetId, click: Coord, depot: bool, service_cost: u32) -> EditResult<EditEvent> {
        let mut working = self.state.clone();
        let mut street = street;

        if depot {
            if let Some(old) = working.depot_node() {
                if is_inserted(&working, old) {
                    working = remove_node_and_merge_streets(&working, old)?;
                    // Street ids were renumbered and the clicked street may
                    // be one of the merged halves.
                    street = StreetLocator::new(&working.visual_streets)
                        .nearest_street(click)
                        .ok_or_else(|| EditError::Topology("no street left near the click".into()))?;
                    info!("previous depot removed; splitting {street}");
                } else {
                    working.set_node_service(old, NodeService::default());
                }
            }
        }

        let new_node = if depot { NewNode::depot() } else { NewNode::required(service_cost) };
        let outcome = split_street(&working, street, click, new_node)?;
        self.state = outcome.state;
        Ok(EditEvent::Restructured { node: Some(outcome.node) })
    }

    fn finalize(&mut self, run_name: &str) -> EditResult<EditEvent> {
        validate_instance(&self.state)?;
        self.state = finalize_reindexing(&self.state)?;

        let run_name = if run_name.ends_with(REQUIRED_SUFFIX) {
            run_name.to_owned()
        } else {
            format!("{run_name}{REQUIRED_SUFFIX}")
        };
        info!("finalized run '{run_name}'");
        Ok(EditEvent::Finalized { run_name })
    }

    fn reduce(&mut self) -> EditResult<EditEvent> {
        let reduced = reduce_to_relevant(self.state.clone())?;
        self.state = finalize_reindexing(&reduced)?;
        Ok(EditEvent::Restructured { node: None })
    }

    fn service_of(&self, node: NodeIndex) -> EditResult<NodeService> {
        self.state
            .node_service(node)
            .ok_or_else(|| CoreError::NodeNotFound(node).into())
    }
}

/// A finalizable instance has a depot and at least one required node or
/// street.
pub fn validate_instance(state: &GraphState) -> EditResult<()> {
    if state.depot_node().is_none() {
        return Err(EditError::Validation("the instance needs a depot".into()));
    }
    let any_node = state.points.iter().any(|p| p.service.is_serviced());
    let any_street = state.streets.iter().any(|s| s.required);
    if !(any_node || any_street) {
        return Err(EditError::Validation(
            "the instance needs at least one required node or street".into(),
        ));
    }
    Ok(())
}

fn is_inserted(state: &GraphState, node: NodeIndex) -> bool {
    state.points.iter().any(|p| p.node_index == Some(node) && p.inserted)
}
