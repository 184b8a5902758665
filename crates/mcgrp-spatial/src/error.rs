//! Spatial-subsystem error type.

use thiserror::Error;

use mcgrp_core::{CoreError, NodeIndex};

/// Errors produced by `mcgrp-spatial`.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("no route from {from} to {to}")]
    NoRoute { from: NodeIndex, to: NodeIndex },

    #[error("node {0} is not part of the road graph")]
    UnknownNode(NodeIndex),

    #[error("no depot defined in the graph")]
    NoDepot,

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type SpatialResult<T> = Result<T, SpatialError>;
