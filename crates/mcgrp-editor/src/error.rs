//! Editor error type.

use thiserror::Error;

use mcgrp_core::CoreError;
use mcgrp_spatial::SpatialError;

#[derive(Debug, Error)]
pub enum EditError {
    /// The graph around the edited element does not have the shape the
    /// operation needs.  The session keeps the prior state.
    #[error("topology: {0}")]
    Topology(String),

    /// The request is refused as it stands; the message is meant for the user.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Spatial(#[from] SpatialError),
}

pub type EditResult<T> = Result<T, EditError>;
