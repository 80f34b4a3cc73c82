//! File-backed implementation of the session ports.
//!
//! The snapshot is a JSON dump of a user's playlist container. Load
//! notifications are emulated so the export pipeline sees the same
//! "not yet loaded, then loaded" sequence a live session produces.

pub mod session;
pub mod types;

pub use session::{LoadMode, SnapshotSession};
