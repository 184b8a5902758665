//! Turn classification for the MCGRP-TP format.
//!
//! A turn is a move `i → j → k` over two consecutive links.  Its kind
//! comes from the difference between the bearing leaving `j` and the
//! bearing arriving at `j`:
//!
//! | `out − in` (mod 360) | Kind                   |
//! |----------------------|------------------------|
//! | 180                  | U-turn                 |
//! | ≥ 330 or ≤ 30        | forward                |
//! | (30, 135]            | right                  |
//! | (135, 180)           | hard right             |
//! | (180, 225)           | hard left              |
//! | [225, 330)           | left                   |
//!
//! Moves through the depot are free, moves back to the node just left are
//! U-turns, and moves with an unknown bearing count as forward.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use rustc_hash::FxHashMap;

use mcgrp_core::{GraphState, LinkKind, NodeIndex, StreetId};

// ── Penalties ────────────────────────────────────────────────────────────────

/// Turn penalties in seconds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurnPenalties {
    pub u_turn:    u32,
    pub straight:  u32,
    pub turn:      u32,
    pub hard_turn: u32,
}

impl Default for TurnPenalties {
    fn default() -> Self {
        Self {
            u_turn:    60,
            straight:  0,
            turn:      4,
            hard_turn: 8,
        }
    }
}

impl TurnPenalties {
    pub fn cost(&self, kind: TurnKind) -> u32 {
        match kind {
            TurnKind::Depot => 0,
            TurnKind::UTurn => self.u_turn,
            TurnKind::Forward => self.straight,
            TurnKind::Right | TurnKind::Left => self.turn,
            TurnKind::HardRight | TurnKind::HardLeft => self.hard_turn,
        }
    }
}

// ── Classification ───────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TurnKind {
    /// Through the depot.
    Depot,
    UTurn,
    Forward,
    Right,
    HardRight,
    HardLeft,
    Left,
}

impl TurnKind {
    /// The one-letter code written to the instance file.
    pub fn code(self) -> char {
        match self {
            TurnKind::Depot => 'O',
            TurnKind::UTurn => 'U',
            TurnKind::Forward => 'F',
            TurnKind::Right | TurnKind::HardRight => 'R',
            TurnKind::HardLeft | TurnKind::Left => 'L',
        }
    }
}

/// Classify the bearing change between arriving at a node with `angle_in`
/// and leaving it with `angle_out`, both in degrees `[0, 360)`.
pub fn classify_turn(angle_in: f64, angle_out: f64) -> TurnKind {
    let mut diff = angle_out - angle_in;
    if diff < 0.0 {
        diff += 360.0;
    }

    if diff == 180.0 {
        TurnKind::UTurn
    } else if diff >= 330.0 || diff <= 30.0 {
        TurnKind::Forward
    } else if diff <= 135.0 {
        TurnKind::Right
    } else if diff < 180.0 {
        TurnKind::HardRight
    } else if diff < 225.0 {
        TurnKind::HardLeft
    } else if diff < 330.0 {
        TurnKind::Left
    } else {
        // NaN
        TurnKind::Forward
    }
}

// ── Turn table ───────────────────────────────────────────────────────────────

/// One `i → j → k` move with its penalty.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub i:    NodeIndex,
    pub j:    NodeIndex,
    pub k:    NodeIndex,
    pub kind: TurnKind,
    pub cost: u32,
}

/// Every turn of an indexed state, sorted by `(i, j, k)`.
///
/// Edges can be traversed both ways, arcs only from `from_node` to
/// `to_node`.  The bearing of a traversal is the `angle` of the street's
/// first point when it follows the street, or its `angle_inv` when it runs
/// against an edge.  When two streets join the same pair of nodes the one
/// defined in the direction of travel wins, then the lower street id.
pub fn build_turns(state: &GraphState, penalties: &TurnPenalties) -> Vec<Turn> {
    let bearings = traversal_bearings(state);

    let mut adjacency: BTreeMap<NodeIndex, BTreeSet<NodeIndex>> = BTreeMap::new();
    for &(u, v) in bearings.keys() {
        adjacency.entry(u).or_default().insert(v);
    }

    let bearing = |from: NodeIndex, to: NodeIndex| bearings.get(&(from, to)).copied().flatten();
    let depot = state.depot_node();
    let mut turns = Vec::new();
    for (&i, out_of_i) in &adjacency {
        for &j in out_of_i {
            let Some(out_of_j) = adjacency.get(&j) else { continue };
            for &k in out_of_j {
                let kind = if Some(j) == depot {
                    TurnKind::Depot
                } else if i == k {
                    TurnKind::UTurn
                } else {
                    match (bearing(i, j), bearing(j, k)) {
                        (Some(angle_in), Some(angle_out)) => classify_turn(angle_in, angle_out),
                        _ => TurnKind::Forward,
                    }
                };
                turns.push(Turn { i, j, k, kind, cost: penalties.cost(kind) });
            }
        }
    }

    debug!("{} turns over {} traversable node pairs", turns.len(), bearings.len());
    turns
}

/// Bearing of every traversable `(from, to)` pair.
fn traversal_bearings(state: &GraphState) -> FxHashMap<(NodeIndex, NodeIndex), Option<f64>> {
    let mut first_points: FxHashMap<StreetId, (Option<f64>, Option<f64>)> = FxHashMap::default();
    for p in state.points.iter().filter(|p| p.vertex_index == 0) {
        first_points.entry(p.street_id).or_insert((p.angle, p.angle_inv));
    }

    let mut streets: Vec<_> = state.streets.iter().filter(|s| s.link.is_some()).collect();
    streets.sort_by_key(|s| s.id);

    let mut bearings = FxHashMap::default();
    for street in &streets {
        let (Some(u), Some(v)) = (street.from_node, street.to_node) else { continue };
        let (angle, _) = first_points.get(&street.id).copied().unwrap_or_default();
        bearings.entry((u, v)).or_insert(angle);
    }
    for street in streets.iter().filter(|s| s.link_kind() == LinkKind::Edge) {
        let (Some(u), Some(v)) = (street.from_node, street.to_node) else { continue };
        let (_, angle_inv) = first_points.get(&street.id).copied().unwrap_or_default();
        bearings.entry((v, u)).or_insert(angle_inv);
    }
    bearings
}
