//! `mcgrp-output` — instance files and snapshots of a graph state.
//!
//! | Writer              | Format   | Files created                       |
//! |---------------------|----------|-------------------------------------|
//! | [`McgrpWriter`]     | MCGRP    | `<name>.dat`                        |
//! | [`McgrpTpWriter`]   | MCGRP-TP | `<name>-TP.dat`                     |
//! | [`CsvSnapshotWriter`] | CSV    | `streets.csv`, `points.csv`, `nodes.csv` |
//!
//! All writers implement [`InstanceWriter`].  The instance writers re-index
//! a copy of the state with `finalize_reindexing` before writing, so the
//! live editing state can be passed as is.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mcgrp_output::{write_instances, InstanceParams};
//!
//! let params = InstanceParams::new("centro_req").with_vehicles(2);
//! let files = write_instances(session.state(), &params, Path::new("./instances"))?;
//! ```

pub mod csv;
pub mod error;
pub mod instance;
pub mod labels;
pub mod mcgrp;
pub mod mcgrptp;
pub mod turns;
pub mod writer;


pub use csv::CsvSnapshotWriter;
pub use error::{OutputError, OutputResult};
pub use instance::{FleetDefaults, InstanceParams};
pub use labels::{format_distance, node_label, street_label};
pub use mcgrp::{render_mcgrp, McgrpWriter, MCGRP_DEFAULTS};
pub use mcgrptp::{render_mcgrp_tp, McgrpTpWriter, MCGRP_TP_DEFAULTS};
pub use turns::{build_turns, classify_turn, Turn, TurnKind, TurnPenalties};
pub use writer::{write_instances, write_snapshot, InstanceFiles, InstanceWriter};
