//! Cadence Storage
//!
//! File-backed persistence for the playlist resume state.
//!
//! The playlist controller only knows the [`ResumeStateStore`] trait. This
//! crate provides a JSON implementation that keeps one document on disk and
//! replaces it atomically on every save.
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_playlist::{ResumeState, ResumeStateStore};
//! use cadence_storage::JsonResumeStore;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = JsonResumeStore::new("/var/lib/cadence/resume.json");
//!
//! store.save(&ResumeState {
//!     track_ids: vec!["s1".into(), "s2".into()],
//!     current_index: Some(1),
//!     position_ms: 42_000,
//! })?;
//!
//! let restored = store.load()?;
//! assert_eq!(restored.map(|s| s.position_ms), Some(42_000));
//! # Ok(())
//! # }
//! ```
//!
//! [`ResumeStateStore`]: cadence_playlist::ResumeStateStore

mod error;
mod json_store;

pub use error::{Result, StorageError};
pub use json_store::{JsonResumeStore, FORMAT_VERSION};
