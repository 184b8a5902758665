//! Core error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` as one
//! variant via `#[from]`.

use thiserror::Error;

use crate::{NodeIndex, StreetId};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("street {0} not found")]
    StreetNotFound(StreetId),

    #[error("node {0} not found")]
    NodeNotFound(NodeIndex),

    #[error("unsupported coordinate reference system {0:?}; only WGS-84 (EPSG:4326) is accepted, reproject the input first")]
    UnsupportedCrs(String),

    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Shorthand result type for `mcgrp-core`.
pub type CoreResult<T> = Result<T, CoreError>;
