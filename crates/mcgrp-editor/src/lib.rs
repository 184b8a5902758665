//! `mcgrp-editor` — interactive edits of an indexed graph.
//!
//! | Module      | Contents                                                        |
//! |-------------|-----------------------------------------------------------------|
//! | [`editor`]  | `split_street`, `remove_node_and_merge_streets`, `finalize_reindexing` |
//! | [`session`] | `EditSession`, `EditRequest`, `EditEvent`                       |
//! | [`error`]   | `EditError`, `EditResult<T>`                                    |
//!
//! ```rust,ignore
//! let mut session = EditSession::new(state);
//! session.apply(EditRequest::SetDepot(NodeIndex(1)))?;
//! session.apply(EditRequest::ToggleStreet(StreetId(4)))?;
//! let event = session.apply(EditRequest::Finalize { run_name: "centro".into() })?;
//! ```

pub mod editor;
pub mod error;
pub mod session;


pub use editor::{finalize_reindexing, remove_node_and_merge_streets, split_street, NewNode, SplitOutcome};
pub use error::{EditError, EditResult};
pub use session::{validate_instance, EditEvent, EditRequest, EditSession, REQUIRED_SUFFIX};
