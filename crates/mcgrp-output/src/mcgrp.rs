//! MCGRP instance format (`<name>.dat`).
//!
//! A header with fleet settings and counts, then five sections: required
//! nodes, required edges, non-required edges, required arcs, non-required
//! arcs.  Rows in a section are sorted by their own index.

use std::path::{Path, PathBuf};

use log::info;

use mcgrp_core::GraphState;
use mcgrp_editor::finalize_reindexing;

use crate::instance::{FleetDefaults, InstanceParams, InstanceSummary, LinkRow};
use crate::writer::{write_lines, InstanceWriter};
use crate::OutputResult;

pub const MCGRP_DEFAULTS: FleetDefaults = FleetDefaults { vehicles: 1, capacity: 3_600 };

/// Render the MCGRP instance of `state`.
///
/// The state is re-indexed (on a copy) first, so the caller may pass the
/// live editing state.
pub fn render_mcgrp(state: &GraphState, params: &InstanceParams) -> OutputResult<String> {
    Ok(mcgrp_lines(state, params)?.join("\n"))
}

fn mcgrp_lines(state: &GraphState, params: &InstanceParams) -> OutputResult<Vec<String>> {
    let state = finalize_reindexing(state)?;
    let summary = InstanceSummary::collect(&state);
    let (vehicles, capacity) = MCGRP_DEFAULTS.resolve(params);
    let required_nodes: Vec<_> = summary.required_nodes().collect();

    let mut lines = vec![
        format!("Name:\t\t{}", params.name),
        "Optimal value:\t-1".to_owned(),
        format!("#Vehicles:\t{vehicles}"),
        format!("Capacity:\t{capacity}"),
        format!("Depot Node:\t{}", summary.depot),
        format!("#Nodes:\t\t{}", summary.max_node),
        format!("#Edges:\t\t{}", summary.max_edge),
        format!("#Arcs:\t\t{}", summary.max_arc),
        format!("#Required N:\t{}", required_nodes.len()),
        format!("#Required E:\t{}", summary.required_edges()),
        format!("#Required A:\t{}", summary.required_arcs()),
        String::new(),
    ];

    lines.push("ReN.\tDEMAND\tS. COST".to_owned());
    for n in &required_nodes {
        lines.push(format!("N{}\t{}\t{}", n.index, n.demand, n.service_cost));
    }
    lines.push(String::new());

    link_section(&mut lines, "ReE.", "E", &summary.edges, true);
    lines.push(String::new());
    link_section(&mut lines, "EDGE", "NrE", &summary.edges, false);
    lines.push(String::new());
    link_section(&mut lines, "ReA.", "A", &summary.arcs, true);
    lines.push(String::new());
    link_section(&mut lines, "ARC", "NrA", &summary.arcs, false);

    Ok(lines)
}

fn link_section(lines: &mut Vec<String>, title: &str, prefix: &str, rows: &[LinkRow], required: bool) {
    if required {
        lines.push(format!("{title}\tFROM N.\tTO N.\tT. COST\tDEMAND\tS. COST"));
    } else {
        lines.push(format!("{title}\tFROM N.\tTO N.\tT. COST"));
    }

    let mut rows: Vec<&LinkRow> = rows.iter().filter(|r| r.required == required).collect();
    rows.sort_by_key(|r| r.index);
    for r in rows {
        if required {
            lines.push(format!(
                "{prefix}{}\t{}\t{}\t{}\t{}\t{}",
                r.index, r.from, r.to, r.traversal_cost, r.demand, r.service_cost
            ));
        } else {
            lines.push(format!("{prefix}{}\t{}\t{}\t{}", r.index, r.from, r.to, r.traversal_cost));
        }
    }
}

// ── Writer ───────────────────────────────────────────────────────────────────

/// Writes `<name>.dat` files into a directory.
pub struct McgrpWriter {
    dir:      PathBuf,
    written:  usize,
    finished: bool,
}

impl McgrpWriter {
    pub fn new(dir: &Path) -> Self {
        Self { dir: dir.to_path_buf(), written: 0, finished: false }
    }

    pub fn path_for(&self, params: &InstanceParams) -> PathBuf {
        self.dir.join(format!("{}.dat", params.name))
    }
}

impl InstanceWriter for McgrpWriter {
    fn write_instance(&mut self, state: &GraphState, params: &InstanceParams) -> OutputResult<PathBuf> {
        params.validate()?;
        let path = self.path_for(params);
        write_lines(&path, &mcgrp_lines(state, params)?)?;
        self.written += 1;
        Ok(path)
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        info!("MCGRP: {} instance(s) written to {}", self.written, self.dir.display());
        Ok(())
    }
}
