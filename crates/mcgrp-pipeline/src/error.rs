//! Pipeline error type.

use thiserror::Error;

use mcgrp_core::CoreError;
use mcgrp_spatial::SpatialError;

use crate::pipeline::Stage;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("input layers carry no coordinate reference system")]
    MissingCrs,

    #[error("unsupported coordinate reference system {0:?}; only WGS-84 (EPSG:4326) is accepted, reproject the input first")]
    UnsupportedCrs(String),

    #[error("stage '{stage}' failed: {source}")]
    Stage {
        stage:  Stage,
        #[source]
        source: Box<PipelineError>,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Spatial(#[from] SpatialError),
}

impl PipelineError {
    /// Attach the failing stage to an error.
    pub fn at(self, stage: Stage) -> Self {
        match self {
            e @ PipelineError::Stage { .. } => e,
            other => PipelineError::Stage { stage, source: Box::new(other) },
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
