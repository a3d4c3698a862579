//! Playback Events
//!
//! Two event families cross the controller boundary:
//! - [`EngineEvent`]: callbacks from the playback engine, funneled into the
//!   control worker through [`EngineCallbacks`](crate::EngineCallbacks)
//! - [`PlayerEvent`]: notifications fanned out to listeners (UI screens)

use serde::{Deserialize, Serialize};

use crate::types::{EngineState, RepeatMode, ShuffleMode, Track, TransitionReason};

/// Callbacks fired by the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// The engine's active item changed
    Transition(TransitionReason),

    /// Periodic position update for the active item
    PositionTick {
        /// Playback position within the active item
        position_ms: u64,
        /// Duration of the active item
        duration_ms: u64,
    },

    /// Transport state changed
    StateChanged(EngineState),

    /// Decode or I/O failure on the active item
    Error(String),
}

impl EngineEvent {
    /// Position ticks are the only events that may be coalesced
    pub fn is_position_tick(&self) -> bool {
        matches!(self, EngineEvent::PositionTick { .. })
    }
}

/// Events delivered to registered listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerEvent {
    /// The current song changed
    SongChanged(Track),

    /// Playback stopped (nothing left to play)
    PlaybackStopped,

    /// Position update for the current song
    PositionChanged {
        /// Current playback position
        position_ms: u64,
        /// Current song duration
        duration_ms: u64,
    },

    /// First position report after a song change
    ProgressInitialized {
        /// Current song duration
        duration_ms: u64,
        /// Starting position
        position_ms: u64,
    },

    /// The logical playlist became empty
    PlaylistEmpty,

    /// Playlist membership or order changed
    QueueChanged {
        /// New playlist length
        length: usize,
    },

    /// Raw engine state, passed through
    StateChanged(EngineState),

    /// Raw engine transition, passed through
    Transition(TransitionReason),

    /// Engine or persistence error
    Error {
        /// Error message
        message: String,
    },

    /// Repeat mode changed
    RepeatModeChanged(RepeatMode),

    /// Shuffle mode changed
    ShuffleModeChanged(ShuffleMode),
}
