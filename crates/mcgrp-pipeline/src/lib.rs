//! `mcgrp-pipeline` — raw layers in, indexed routing graph out.
//!
//! # Stages
//!
//! | # | Module        | Function(s)                                                  |
//! |---|---------------|--------------------------------------------------------------|
//! | 1 | [`normalize`] | `filter_and_normalize`, `process_neighborhood_boundaries`    |
//! | 2 | [`explode`]   | `explode_and_label`                                          |
//! | 3 | [`prune`]     | `remove_invalid_endpoints`                                   |
//! | 4 | [`split`]     | `split_by_special_vertices`                                  |
//! | 5 | [`reduce`]    | `create_reduced_graph`                                       |
//! | 6 | [`split`]     | `split_into_two_point_segments`                              |
//! | 7 | [`reduce`]    | `remove_boundary_vertices`                                   |
//! | 8 | [`index`]     | `assign_indices`                                             |
//!
//! Every stage takes the [`GraphState`](mcgrp_core::GraphState) by value and
//! returns the next one.  [`Pipeline::run`] chains them, reporting progress
//! through a [`PipelineObserver`].
//!
//! # Quick start
//!
//! ```rust,ignore
//! let pipeline = Pipeline::new(PipelineConfig::default());
//! let (state, report) = pipeline.run(layers, &mut NoopObserver)?;
//! state.check_integrity()?;
//! ```

pub mod error;
pub mod explode;
pub mod index;
pub mod input;
pub mod normalize;
pub mod pipeline;
pub mod prune;
pub mod reduce;
pub mod split;

#[cfg(test)]
mod tests;

pub use error::{PipelineError, PipelineResult};
pub use input::{RawLayers, RawNeighborhood, RawStreet};
pub use pipeline::{NoopObserver, Pipeline, PipelineObserver, PipelineReport, Stage};
