//! `mcgrp-core` — foundational types for the MCGRP graph builder.
//!
//! Every other `mcgrp-*` crate depends on this one.  It has no `mcgrp-*`
//! dependencies and only a few external ones (`geo` for geometry types,
//! `rustc-hash`, `log`, `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module      | Contents                                                   |
//! |-------------|------------------------------------------------------------|
//! | [`ids`]     | `StreetId`, `NodeIndex`, `EdgeIndex`, `ArcIndex`, `NeighborhoodId` |
//! | [`geodesy`] | haversine, azimuth, circular mean, cost formulas, `CoordKey` |
//! | [`schema`]  | `StreetRecord`, `PointRecord`, `NodeRecord`, `Neighborhood` |
//! | [`state`]   | `GraphState` and its table helpers                         |
//! | [`reindex`] | dense `1..=N` renumbering, `IdMap`                         |
//! | [`config`]  | `PipelineConfig`, `SplitCriteria`                          |
//! | [`error`]   | `CoreError`, `CoreResult`                                  |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to records, ids and config. |

pub mod config;
pub mod error;
pub mod geodesy;
pub mod ids;
pub mod reindex;
pub mod schema;
pub mod state;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{PipelineConfig, SplitCriteria};
pub use error::{CoreError, CoreResult};
pub use geodesy::CoordKey;
pub use ids::{ArcIndex, DenseId, EdgeIndex, NeighborhoodId, NodeIndex, StreetId};
pub use reindex::{reindex, reindex_sorted, IdMap};
pub use schema::{
    Crs, LinkIndex, LinkKind, Neighborhood, NeighborhoodRef, NodeRecord, NodeService, PointRecord,
    StreetRecord, StreetTags,
};
pub use state::GraphState;
