//! Cadence - Windowed Playlist Control
//!
//! Keeps a large logical playlist in sync with a playback engine that can
//! only hold a handful of items at once.
//!
//! This crate provides:
//! - Logical playlist with insert, append, remove and drag-reorder
//! - Playback window of the current song plus one neighbour each side
//! - Window expansion as playback advances, rebuild after edits
//! - Thread-safe listener fan-out of player events
//! - Shuffle (Random + Smart) and repeat modes (Off, All, One)
//! - Resume state save and restore
//!
//! # Architecture
//!
//! All mutations run on one control thread ([`PlaylistController`]). UI
//! commands and engine callbacks share its mailbox, so the playlist pointer
//! and the window bounds are only ever touched by a single writer. Listeners
//! run on a separate dispatch thread in emission order, so they may query or
//! command the controller from inside a callback. The synchronous core
//! ([`PlaylistSession`]) can also be driven directly; it notifies listeners
//! inline.
//!
//! The audio engine and the persistence backend are supplied through the
//! [`PlaybackEngine`] and [`ResumeStateStore`] traits.
//!
//! # Example: Controller
//!
//! ```rust
//! use cadence_playlist::{
//!     ControllerConfig, MemoryEngine, MemoryResumeStore, PlaylistController, Track,
//! };
//! use std::time::Duration;
//!
//! let engine = MemoryEngine::new();
//! let controller = PlaylistController::spawn(
//!     ControllerConfig::default(),
//!     Box::new(MemoryResumeStore::new()),
//!     |callbacks| engine.attach(callbacks),
//! )?;
//!
//! let tracks = (1..=5)
//!     .map(|i| {
//!         let id = format!("s{}", i);
//!         Track::new(id.clone(), format!("/music/{}.flac", id), id, "Artist", Duration::from_secs(180))
//!     })
//!     .collect();
//! controller.set_playlist(tracks, 2)?;
//! controller.wait_idle()?;
//!
//! let window = controller.window()?.unwrap();
//! assert_eq!((window.start, window.end), (1, 3));
//!
//! // The engine finishes S3 and moves on to S4
//! engine.finish_current();
//! controller.wait_idle()?;
//!
//! assert_eq!(controller.get_current_index()?, Some(3));
//! let window = controller.window()?.unwrap();
//! assert_eq!((window.start, window.end), (2, 4));
//! # Ok::<(), cadence_playlist::PlaylistError>(())
//! ```
//!
//! # Example: Listening for Events
//!
//! ```rust
//! use cadence_playlist::{ListenerRegistry, PlayerEvent};
//! use std::sync::Arc;
//!
//! let registry = ListenerRegistry::new();
//! registry.add(Arc::new(|event: &PlayerEvent| {
//!     if let PlayerEvent::SongChanged(track) = event {
//!         println!("Now playing {}", track.title);
//!     }
//! }));
//! registry.notify(&PlayerEvent::PlaylistEmpty);
//! ```

mod controller;
pub mod engine;
mod error;
pub mod events;
mod listeners;
mod playlist;
mod resume;
mod session;
mod shuffle;
pub mod types;
mod window;

// Public exports
pub use controller::{ControllerHandle, PlaylistCommand, PlaylistController};
pub use engine::{EngineCall, EngineCallbacks, MemoryEngine, PlaybackEngine};
pub use error::{PlaylistError, Result};
pub use events::{EngineEvent, PlayerEvent};
pub use listeners::{ChannelListener, ListenerHandle, ListenerRegistry, PlaybackListener};
pub use playlist::{LogicalPlaylist, Removal};
pub use resume::{
    MemoryResumeStore, RestoredPlaylist, ResumeState, ResumeStateStore, TrackResolver,
};
pub use session::PlaylistSession;
pub use shuffle::shuffle_tracks;
pub use types::{
    ControllerConfig, EngineState, RepeatMode, ShuffleMode, Track, TrackId, TransitionReason,
};
pub use window::{Rebuild, Resync, WindowBounds, WindowManager, WindowState};
