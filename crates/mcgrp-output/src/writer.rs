//! The `InstanceWriter` trait implemented by every output format.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use mcgrp_core::GraphState;

use crate::csv::CsvSnapshotWriter;
use crate::instance::InstanceParams;
use crate::mcgrp::McgrpWriter;
use crate::mcgrptp::McgrpTpWriter;
use crate::turns::TurnPenalties;
use crate::OutputResult;

/// Trait implemented by the MCGRP, MCGRP-TP and CSV snapshot writers.
pub trait InstanceWriter {
    /// Write one state under the name in `params`.  Returns the path the
    /// rows went to.
    fn write_instance(&mut self, state: &GraphState, params: &InstanceParams) -> OutputResult<PathBuf>;

    /// Flush and close all underlying file handles.
    ///
    /// Calling it again after the first time does nothing.
    fn finish(&mut self) -> OutputResult<()>;
}

/// Paths of the files written by [`write_instances`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceFiles {
    pub mcgrp:    PathBuf,
    pub mcgrp_tp: PathBuf,
}

/// Write `<name>.dat` and `<name>-TP.dat` into `dir`, creating it if
/// needed.  Default turn penalties apply.
pub fn write_instances(state: &GraphState, params: &InstanceParams, dir: &Path) -> OutputResult<InstanceFiles> {
    fs::create_dir_all(dir)?;

    let mut mcgrp = McgrpWriter::new(dir);
    let mut mcgrp_tp = McgrpTpWriter::new(dir, TurnPenalties::default());
    let files = InstanceFiles {
        mcgrp:    mcgrp.write_instance(state, params)?,
        mcgrp_tp: mcgrp_tp.write_instance(state, params)?,
    };
    mcgrp.finish()?;
    mcgrp_tp.finish()?;
    Ok(files)
}

/// Write a state snapshot (streets, points, nodes) as CSV into `dir`.
pub fn write_snapshot(state: &GraphState, params: &InstanceParams, dir: &Path) -> OutputResult<()> {
    fs::create_dir_all(dir)?;
    let mut writer = CsvSnapshotWriter::new(dir)?;
    writer.write_instance(state, params)?;
    writer.finish()
}

/// Join `lines` with `\n` (no trailing newline) and write them to `path`.
pub(crate) fn write_lines(path: &Path, lines: &[String]) -> OutputResult<()> {
    fs::write(path, lines.join("\n"))?;
    info!("wrote {} lines to {}", lines.len(), path.display());
    Ok(())
}
