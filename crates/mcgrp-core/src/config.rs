//! Pipeline configuration.
//!
//! The defaults reproduce the reference behaviour; applications normally
//! load a `PipelineConfig` from JSON (with the `serde` feature) and only
//! override the allowlist or split criteria.

use crate::error::{CoreError, CoreResult};
use crate::geodesy::PROXIMITY_THRESHOLD_M;
use crate::ids::NeighborhoodId;
use crate::schema::PointRecord;

// ── SplitCriteria ────────────────────────────────────────────────────────────

/// Which interior vertices cut a street in two.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SplitCriteria {
    /// Vertices shared with another street.
    pub shared:   bool,
    /// The depot vertex.
    pub depot:    bool,
    /// Required vertices.
    pub required: bool,
}

impl SplitCriteria {
    pub const NONE: SplitCriteria = SplitCriteria { shared: false, depot: false, required: false };

    pub fn is_empty(&self) -> bool {
        !(self.shared || self.depot || self.required)
    }

    pub fn matches(&self, p: &PointRecord) -> bool {
        (self.shared && p.shared)
            || (self.depot && p.service.depot)
            || (self.required && p.service.required)
    }
}

impl Default for SplitCriteria {
    fn default() -> Self {
        Self { shared: true, depot: false, required: false }
    }
}

// ── PipelineConfig ───────────────────────────────────────────────────────────

/// Tolerances and switches of the preprocessing pipeline.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Endpoints of same-source segments closer than this are snapped
    /// together, metres.
    pub proximity_threshold_m: f64,

    /// A point this close to its neighborhood boundary is "on" it, metres.
    pub boundary_distance_m: f64,

    /// Boundary endpoints whose adjoining segment is at most this long are
    /// pruned, kilometres.
    pub protection_distance_km: f64,

    /// Share of a street's projected length a neighborhood must cover to
    /// claim it.
    pub dominance_share: f64,

    /// Interior vertices that split streets.
    pub split: SplitCriteria,

    /// Restrict indexing to these neighborhoods.  `None` keeps everything.
    pub valid_neighborhoods: Option<Vec<NeighborhoodId>>,

    /// Name given to streets with neither `name` nor `alt_name`.
    pub unknown_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            proximity_threshold_m:  PROXIMITY_THRESHOLD_M,
            boundary_distance_m:    1.0,
            protection_distance_km: 0.05,
            dominance_share:        0.5,
            split:                  SplitCriteria::default(),
            valid_neighborhoods:    None,
            unknown_name:           "unknown".to_owned(),
        }
    }
}

impl PipelineConfig {
    /// Reject tolerances that would make the stages misbehave.
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.proximity_threshold_m > 0.0) {
            return Err(CoreError::Config("proximity_threshold_m must be positive".into()));
        }
        if !(self.boundary_distance_m >= 0.0) {
            return Err(CoreError::Config("boundary_distance_m must not be negative".into()));
        }
        if !(self.protection_distance_km >= 0.0) {
            return Err(CoreError::Config("protection_distance_km must not be negative".into()));
        }
        if !(self.dominance_share > 0.0 && self.dominance_share < 1.0) {
            return Err(CoreError::Config("dominance_share must be in (0, 1)".into()));
        }
        Ok(())
    }
}
