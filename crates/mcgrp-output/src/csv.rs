//! CSV snapshot backend.
//!
//! Creates three files in the configured output directory:
//! - `streets.csv`
//! - `points.csv`
//! - `nodes.csv`
//!
//! Every row starts with the run name, so several states can share one set
//! of files.  Geometry is written as `lon lat` pairs joined by `;`, flags
//! as `0`/`1`, and missing values as empty fields.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::Writer;
use geo::Coord;
use log::info;

use mcgrp_core::{GraphState, LinkIndex, NodeService};

use crate::instance::InstanceParams;
use crate::writer::InstanceWriter;
use crate::OutputResult;

const STREET_HEADER: [&str; 16] = [
    "run", "id", "kind", "link_index", "from_node", "to_node", "name", "neighborhood_id",
    "neighborhood", "total_dist_km", "traversal_cost", "service_cost", "required", "demand",
    "geometry", "visual_geometry",
];

const POINT_HEADER: [&str; 18] = [
    "run", "street_id", "vertex_index", "vertex_to", "lon", "lat", "distance_km", "angle",
    "angle_inv", "shared", "endpoint", "inserted", "neighborhood_id", "node_index", "required",
    "depot", "demand", "service_cost",
];

const NODE_HEADER: [&str; 12] = [
    "run", "node_index", "lon", "lat", "shared", "inserted", "neighborhood_id", "required",
    "depot", "demand", "service_cost", "street_ids",
];

/// Writes graph-state snapshots to three CSV files.
pub struct CsvSnapshotWriter {
    dir:      PathBuf,
    streets:  Writer<File>,
    points:   Writer<File>,
    nodes:    Writer<File>,
    finished: bool,
}

impl CsvSnapshotWriter {
    /// Open (or create) the three CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut streets = Writer::from_path(dir.join("streets.csv"))?;
        streets.write_record(STREET_HEADER)?;

        let mut points = Writer::from_path(dir.join("points.csv"))?;
        points.write_record(POINT_HEADER)?;

        let mut nodes = Writer::from_path(dir.join("nodes.csv"))?;
        nodes.write_record(NODE_HEADER)?;

        Ok(Self {
            dir: dir.to_path_buf(),
            streets,
            points,
            nodes,
            finished: false,
        })
    }
}

impl InstanceWriter for CsvSnapshotWriter {
    /// Append the rows of `state`.  Returns the output directory.
    fn write_instance(&mut self, state: &GraphState, params: &InstanceParams) -> OutputResult<PathBuf> {
        let run = params.name.as_str();

        for street in &state.streets {
            let (kind, index) = match street.link {
                Some(LinkIndex::Edge(e)) => ("edge", Some(e.get())),
                Some(LinkIndex::Arc(a)) => ("arc", Some(a.get())),
                None => ("", None),
            };
            let visual = state.visual_street(street.id).map(|v| encode_geometry(v.coords()));
            self.streets.write_record(&[
                run.to_owned(),
                street.id.get().to_string(),
                kind.to_owned(),
                opt(index),
                opt(street.from_node.map(|n| n.get())),
                opt(street.to_node.map(|n| n.get())),
                street.tags.name.clone().unwrap_or_default(),
                opt(street.neighborhood_id().map(|n| n.get())),
                street.neighborhood.as_ref().and_then(|n| n.name.clone()).unwrap_or_default(),
                street.total_dist_km.to_string(),
                street.traversal_cost.to_string(),
                street.service_cost.to_string(),
                flag(street.required),
                street.demand.to_string(),
                encode_geometry(street.coords()),
                visual.unwrap_or_default(),
            ])?;
        }

        for p in &state.points {
            let mut row = vec![
                run.to_owned(),
                p.street_id.get().to_string(),
                p.vertex_index.to_string(),
                p.vertex_to.to_string(),
                p.coord.x.to_string(),
                p.coord.y.to_string(),
                p.distance_km.to_string(),
                opt(p.angle),
                opt(p.angle_inv),
                flag(p.shared),
                flag(p.endpoint),
                flag(p.inserted),
                opt(p.neighborhood_id().map(|n| n.get())),
                opt(p.node_index.map(|n| n.get())),
            ];
            row.extend(service_fields(&p.service));
            self.points.write_record(&row)?;
        }

        for n in &state.nodes {
            let mut row = vec![
                run.to_owned(),
                opt(n.node_index.map(|i| i.get())),
                n.coord.x.to_string(),
                n.coord.y.to_string(),
                flag(n.shared),
                flag(n.inserted),
                opt(n.neighborhood_id().map(|i| i.get())),
            ];
            row.extend(service_fields(&n.service));
            row.push(n.street_ids.iter().map(|s| s.get().to_string()).collect::<Vec<_>>().join(";"));
            self.nodes.write_record(&row)?;
        }

        info!(
            "snapshot '{run}': {} streets, {} points, {} nodes",
            state.streets.len(),
            state.points.len(),
            state.nodes.len()
        );
        Ok(self.dir.clone())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.streets.flush()?;
        self.points.flush()?;
        self.nodes.flush()?;
        Ok(())
    }
}

/// `"lon lat;lon lat;…"`.
pub fn encode_geometry(coords: &[Coord]) -> String {
    coords.iter().map(|c| format!("{} {}", c.x, c.y)).collect::<Vec<_>>().join(";")
}

fn service_fields(service: &NodeService) -> [String; 4] {
    [
        flag(service.required),
        flag(service.depot),
        service.demand.to_string(),
        service.service_cost.to_string(),
    ]
}

fn flag(value: bool) -> String {
    (value as u8).to_string()
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
