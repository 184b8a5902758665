//! The eight-stage preprocessing run and its progress callbacks.

use std::fmt;

use log::info;

use mcgrp_core::{GraphState, PipelineConfig};
use mcgrp_spatial::NeighborhoodIndex;

use crate::error::PipelineResult;
use crate::input::RawLayers;
use crate::{explode, index, normalize, prune, reduce, split};

// ── Stage ────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stage {
    Normalize,
    Explode,
    PruneEndpoints,
    SplitSpecial,
    CollapseInterior,
    SplitTwoPoint,
    MergeBoundaries,
    Index,
}

impl Stage {
    /// Every stage in run order.
    pub const ALL: [Stage; 8] = [
        Stage::Normalize,
        Stage::Explode,
        Stage::PruneEndpoints,
        Stage::SplitSpecial,
        Stage::CollapseInterior,
        Stage::SplitTwoPoint,
        Stage::MergeBoundaries,
        Stage::Index,
    ];

    /// Progress text shown to the user.
    pub fn title(self) -> &'static str {
        match self {
            Stage::Normalize => "Filtering and normalising streets",
            Stage::Explode => "Exploding points",
            Stage::PruneEndpoints => "Removing endpoints near boundaries",
            Stage::SplitSpecial => "Splitting streets at intersections",
            Stage::CollapseInterior => "Removing interior vertices",
            Stage::SplitTwoPoint => "Ensuring two-point streets",
            Stage::MergeBoundaries => "Merging streets across boundaries",
            Stage::Index => "Indexing graph",
        }
    }

    /// 1-based position in [`Stage::ALL`].
    pub fn step(self) -> usize {
        self as usize + 1
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Normalize => "normalize",
            Stage::Explode => "explode",
            Stage::PruneEndpoints => "prune-endpoints",
            Stage::SplitSpecial => "split-special",
            Stage::CollapseInterior => "collapse-interior",
            Stage::SplitTwoPoint => "split-two-point",
            Stage::MergeBoundaries => "merge-boundaries",
            Stage::Index => "index",
        };
        f.write_str(name)
    }
}

// ── Observer ─────────────────────────────────────────────────────────────────

/// Callbacks invoked by [`Pipeline::run`] around each stage.
///
/// All methods have default no-op implementations.
///
/// ```rust,ignore
/// struct Progress;
///
/// impl PipelineObserver for Progress {
///     fn on_stage_start(&mut self, step: usize, total: usize, stage: Stage) {
///         println!("[{step}/{total}] {}", stage.title());
///     }
/// }
/// ```
pub trait PipelineObserver {
    fn on_stage_start(&mut self, _step: usize, _total: usize, _stage: Stage) {}

    /// `state` is the output of `stage`.
    fn on_stage_end(&mut self, _stage: Stage, _state: &GraphState) {}

    fn on_complete(&mut self, _report: &PipelineReport) {}
}

/// A [`PipelineObserver`] that does nothing.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

// ── Report ───────────────────────────────────────────────────────────────────

/// Before/after counts of a run.  `points_before` is the point count right
/// after explosion.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineReport {
    pub streets_before: usize,
    pub points_before:  usize,
    pub streets_after:  usize,
    pub points_after:   usize,
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validate `layers` and run every stage in order.
    ///
    /// Input errors are returned as they are; a failure inside a stage is
    /// wrapped in [`PipelineError::Stage`].  No partial state is returned.
    pub fn run<O: PipelineObserver>(
        &self,
        layers: RawLayers,
        observer: &mut O,
    ) -> PipelineResult<(GraphState, PipelineReport)> {
        self.config.validate()?;
        let mut state = layers.into_state()?;
        let hoods = NeighborhoodIndex::new(&state.neighborhoods);
        let config = &self.config;

        let mut report = PipelineReport { streets_before: state.streets.len(), ..Default::default() };
        let total = Stage::ALL.len();

        for stage in Stage::ALL {
            observer.on_stage_start(stage.step(), total, stage);
            info!("[{}/{total}] {}", stage.step(), stage.title());

            state = match stage {
                Stage::Normalize => {
                    let s = normalize::filter_and_normalize(state, config, &hoods);
                    normalize::process_neighborhood_boundaries(s, config, &hoods)
                }
                Stage::Explode => {
                    let s = explode::explode_and_label(state);
                    report.points_before = s.points.len();
                    s
                }
                Stage::PruneEndpoints => prune::remove_invalid_endpoints(state, config, &hoods),
                Stage::SplitSpecial => split::split_by_special_vertices(state, config.split),
                Stage::CollapseInterior => reduce::create_reduced_graph(state),
                Stage::SplitTwoPoint => split::split_into_two_point_segments(state),
                Stage::MergeBoundaries => reduce::remove_boundary_vertices(state, config, &hoods),
                Stage::Index => index::assign_indices(state, config).map_err(|e| e.at(stage))?,
            };
            observer.on_stage_end(stage, &state);
        }

        report.streets_after = state.streets.len();
        report.points_after = state.points.len();
        info!(
            "pipeline finished: {} → {} streets, {} → {} points",
            report.streets_before, report.streets_after, report.points_before, report.points_after
        );
        observer.on_complete(&report);
        Ok((state, report))
    }
}
