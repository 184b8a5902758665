//! `mcgrp-spatial` — neighborhood overlay, street lookup, routing and
//! relevance analysis.
//!
//! # Crate layout
//!
//! | Module            | Contents                                                 |
//! |-------------------|----------------------------------------------------------|
//! | [`projection`]    | Web Mercator projection, planar lengths                  |
//! | [`neighborhoods`] | `NeighborhoodIndex`: dominance rule, boundary queries    |
//! | [`locator`]       | `StreetLocator` (R-tree): nearest street, box selection  |
//! | [`graph`]         | `RoadGraph` (CSR), `RoadGraphBuilder`                    |
//! | [`router`]        | `Router` trait, `Route`, `DijkstraRouter`                |
//! | [`analyzer`]      | `ShortestPathAnalyzer`, `prune_dead_ends`, `reduce_to_relevant` |
//! | [`error`]         | `SpatialError`, `SpatialResult<T>`                       |
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                    |
//! |------------|-----------------------------------------------------------|
//! | `parallel` | Per-exit Dijkstra searches run on Rayon.                  |
//! | `serde`    | Derives `Serialize`/`Deserialize` on public types.        |

pub mod analyzer;
pub mod error;
pub mod graph;
pub mod locator;
pub mod neighborhoods;
pub mod projection;
pub mod router;


pub use analyzer::{prune_dead_ends, reduce_to_relevant, reduce_with, NeighborhoodAnalysis, ShortestPathAnalyzer};
pub use error::{SpatialError, SpatialResult};
pub use graph::{RoadGraph, RoadGraphBuilder};
pub use locator::StreetLocator;
pub use neighborhoods::NeighborhoodIndex;
pub use router::{DijkstraRouter, Route, Router};
