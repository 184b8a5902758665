//! MCGRP-TP instance format (`<name>-TP.dat`), MCGRP with turn penalties.
//!
//! Lists every node, edge and arc (required or not) followed by the turn
//! table from [`build_turns`].

use std::path::{Path, PathBuf};

use log::info;

use mcgrp_core::GraphState;
use mcgrp_editor::finalize_reindexing;

use crate::instance::{FleetDefaults, InstanceParams, InstanceSummary, LinkRow};
use crate::turns::{build_turns, TurnPenalties};
use crate::writer::{write_lines, InstanceWriter};
use crate::OutputResult;

pub const MCGRP_TP_DEFAULTS: FleetDefaults = FleetDefaults { vehicles: 1, capacity: 1_000 };

const LINK_COLUMNS: &str = "INDEX-I\tINDEX-J\tQTY\tIS-REQUIRED\tTR-COST";

/// Render the MCGRP-TP instance of `state` (re-indexed on a copy first).
pub fn render_mcgrp_tp(state: &GraphState, params: &InstanceParams, penalties: &TurnPenalties) -> OutputResult<String> {
    Ok(mcgrp_tp_lines(state, params, penalties)?.join("\n"))
}

fn mcgrp_tp_lines(state: &GraphState, params: &InstanceParams, penalties: &TurnPenalties) -> OutputResult<Vec<String>> {
    let state = finalize_reindexing(state)?;
    let summary = InstanceSummary::collect(&state);
    let turns = build_turns(&state, penalties);
    let (vehicles, capacity) = MCGRP_TP_DEFAULTS.resolve(params);

    let mut lines = vec![
        format!("Name:\t\t\t{}", params.name),
        format!("#Vehicles:\t\t{vehicles}"),
        format!("Capacity:\t\t{capacity}"),
        format!("Depot:\t\t\t{}", summary.depot),
        format!("#Nodes:\t\t\t{}", summary.max_node),
        format!("#Edges:\t\t\t{}", summary.max_edge),
        format!("#Arcs:\t\t\t{}", summary.max_arc),
        format!("#Required-N:\t{}", summary.required_nodes().count()),
        format!("#Required-E:\t{}", summary.required_edges()),
        format!("#Required-A:\t{}", summary.required_arcs()),
        format!("#Nb-Turns:\t\t{}", turns.len()),
        String::new(),
    ];

    lines.push("----------NODES----------".to_owned());
    lines.push("INDEX\tQTY\tIS-REQUIRED\tX\tY".to_owned());
    for n in &summary.nodes {
        lines.push(format!("{}\t{}\t{}\t-1\t-1", n.index, n.service_cost, n.required as u8));
    }
    lines.push(String::new());

    link_section(&mut lines, "----------EDGES----------", &summary.edges);
    link_section(&mut lines, "-----------ARCS----------", &summary.arcs);

    lines.push("----------TURNS----------".to_owned());
    lines.push("INDEX-I\tINDEX-J\tINDEX-K\tCOST\tTYPE".to_owned());
    for t in &turns {
        lines.push(format!("{}\t{}\t{}\t{}\t{}", t.i.get(), t.j.get(), t.k.get(), t.cost, t.kind.code()));
    }

    Ok(lines)
}

fn link_section(lines: &mut Vec<String>, banner: &str, rows: &[LinkRow]) {
    lines.push(banner.to_owned());
    lines.push(LINK_COLUMNS.to_owned());
    for r in rows {
        lines.push(format!("{}\t{}\t{}\t{}\t{}", r.from, r.to, r.service_cost, r.required as u8, r.traversal_cost));
    }
    lines.push(String::new());
}

// ── Writer ───────────────────────────────────────────────────────────────────

/// Writes `<name>-TP.dat` files into a directory.
pub struct McgrpTpWriter {
    dir:       PathBuf,
    penalties: TurnPenalties,
    written:   usize,
    finished:  bool,
}

impl McgrpTpWriter {
    pub fn new(dir: &Path, penalties: TurnPenalties) -> Self {
        Self { dir: dir.to_path_buf(), penalties, written: 0, finished: false }
    }

    pub fn path_for(&self, params: &InstanceParams) -> PathBuf {
        self.dir.join(format!("{}-TP.dat", params.name))
    }
}

impl InstanceWriter for McgrpTpWriter {
    fn write_instance(&mut self, state: &GraphState, params: &InstanceParams) -> OutputResult<PathBuf> {
        params.validate()?;
        let path = self.path_for(params);
        write_lines(&path, &mcgrp_tp_lines(state, params, &self.penalties)?)?;
        self.written += 1;
        Ok(path)
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        info!("MCGRP-TP: {} instance(s) written to {}", self.written, self.dir.display());
        Ok(())
    }
}
