//! grid — end-to-end run of the MCGRP graph builder on a synthetic grid.
//!
//! Builds the graph, places a depot and a required node, marks a block of
//! streets as required, finalizes the run and writes the MCGRP and
//! MCGRP-TP instances plus a CSV snapshot.
//!
//! ```text
//! RUST_LOG=info cargo run -p grid -- [config.json]
//! ```
//!
//! Every config field is optional; see [`DemoConfig`].

mod network;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use geo::{coord, Coord, Rect};
use log::info;
use serde::Deserialize;

use mcgrp_core::{CoordKey, GraphState, NodeIndex, PipelineConfig};
use mcgrp_editor::{EditEvent, EditRequest, EditSession};
use mcgrp_output::{street_label, write_instances, write_snapshot, InstanceParams};
use mcgrp_pipeline::{Pipeline, PipelineObserver, PipelineReport, Stage};
use mcgrp_spatial::StreetLocator;

use network::{build_layers, STEP};

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DemoConfig {
    pipeline:     PipelineConfig,
    run_name:     String,
    vehicles:     Option<u32>,
    capacity:     Option<u32>,
    output_dir:   PathBuf,
    service_cost: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            pipeline:     PipelineConfig::default(),
            run_name:     "grid".to_owned(),
            vehicles:     None,
            capacity:     None,
            output_dir:   PathBuf::from("output/grid"),
            service_cost: 30,
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<DemoConfig> {
    let Some(path) = path else {
        return Ok(DemoConfig::default());
    };
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parsing {}", path.display()))
}

// ── Progress ──────────────────────────────────────────────────────────────────

struct Progress {
    started: Instant,
}

impl PipelineObserver for Progress {
    fn on_stage_start(&mut self, step: usize, total: usize, stage: Stage) {
        println!("  [{step}/{total}] {}", stage.title());
    }

    fn on_stage_end(&mut self, stage: Stage, state: &GraphState) {
        info!("{stage}: {} streets, {} points", state.streets.len(), state.points.len());
    }

    fn on_complete(&mut self, report: &PipelineReport) {
        println!(
            "  done in {:.3} s: {} → {} streets, {} → {} points",
            self.started.elapsed().as_secs_f64(),
            report.streets_before,
            report.streets_after,
            report.points_before,
            report.points_after,
        );
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn node_at(state: &GraphState, at: Coord) -> Result<NodeIndex> {
    let key = CoordKey::of(at);
    state
        .nodes
        .iter()
        .find(|n| CoordKey::of(n.coord) == key)
        .and_then(|n| n.node_index)
        .with_context(|| format!("no node at ({}, {})", at.x, at.y))
}

fn apply(session: &mut EditSession, request: EditRequest) -> Result<EditEvent> {
    let label = format!("{request:?}");
    let event = session.apply(request).with_context(|| format!("applying {label}"))?;
    println!("  {label}\n    → {event:?}");
    Ok(event)
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path.as_deref())?;

    println!("=== grid — MCGRP graph builder ===");
    println!();

    // 1. Preprocess the raw layers.
    let layers = build_layers();
    println!("Input: {} streets, {} neighborhoods", layers.streets.len(), layers.neighborhoods.len());
    let pipeline = Pipeline::new(config.pipeline.clone());
    let (state, _report) = pipeline.run(layers, &mut Progress { started: Instant::now() })?;
    state.check_integrity()?;
    println!();

    // 2. Edit: depot at the south-west corner, a required node mid-block,
    //    and the streets of the north-east block.
    let mut session = EditSession::new(state);
    let depot = node_at(session.state(), coord! { x: 0.0, y: 0.0 })?;
    apply(&mut session, EditRequest::SetDepot(depot))?;

    let click = coord! { x: 2.5 * STEP, y: 3.0 * STEP };
    let Some(street) = StreetLocator::new(&session.state().visual_streets).nearest_street(click) else {
        bail!("no street near ({}, {})", click.x, click.y);
    };
    apply(&mut session, EditRequest::AddNode { street, click, depot: false, service_cost: config.service_cost })?;

    let block = Rect::new(coord! { x: 1.9 * STEP, y: 1.9 * STEP }, coord! { x: 3.1 * STEP, y: 3.1 * STEP });
    apply(&mut session, EditRequest::BoxSelectStreets(block))?;

    let EditEvent::Finalized { run_name } =
        apply(&mut session, EditRequest::Finalize { run_name: config.run_name.clone() })?
    else {
        bail!("finalize did not complete");
    };
    println!();

    // 3. Write the instances and a snapshot.
    let state = session.into_state();
    let params = InstanceParams { name: run_name, vehicles: config.vehicles, capacity: config.capacity };
    let files = write_instances(&state, &params, &config.output_dir)?;
    write_snapshot(&state, &params, &config.output_dir.join("snapshot"))?;

    println!("Instances:");
    println!("  {}", files.mcgrp.display());
    println!("  {}", files.mcgrp_tp.display());
    println!();

    println!("Required streets:");
    for street in state.streets.iter().filter(|s| s.required) {
        println!("  {}", street_label(street).replace('\n', " | "));
    }

    Ok(())
}
