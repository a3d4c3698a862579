//! Core types for playlist control

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Stable track identifier from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Track information handed to the playback engine
///
/// Contains everything needed to build a playback request. The playlist
/// controller never edits these fields, it only changes list membership and
/// order. The same track may appear more than once in a playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Catalog identifier
    pub id: TrackId,

    /// File path or URI for audio decoding
    pub path: PathBuf,

    /// Track title
    pub title: String,

    /// Artist name (used by smart shuffle)
    pub artist: String,

    /// Track duration
    pub duration: Duration,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        path: impl Into<PathBuf>,
        title: impl Into<String>,
        artist: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            id: TrackId(id.into()),
            path: path.into(),
            title: title.into(),
            artist: artist.into(),
            duration,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}

/// Transport state reported by the playback engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// Nothing loaded
    Idle,

    /// Loading/buffering the active item
    Buffering,

    /// Currently playing
    Playing,

    /// Paused mid-item
    Paused,

    /// Reached the end of the last loaded item
    Ended,
}

/// Why the engine's active item changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionReason {
    /// Previous item finished and the engine advanced
    Auto,

    /// A seek to another item (next/previous buttons)
    Seek,

    /// The loaded item list was replaced or edited
    PlaylistChanged,

    /// The same item restarted
    Repeat,
}

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when the playlist ends
    #[default]
    Off,

    /// Loop the entire playlist
    All,

    /// Loop the current track only
    One,
}

/// Shuffle mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShuffleMode {
    /// Playlist order as the user arranged it
    #[default]
    Off,

    /// Pure random shuffle
    Random,

    /// Smart shuffle (spread artists apart)
    Smart,
}

/// Configuration for the playlist controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Start playback after `set_playlist` and `play_at` (default: true)
    pub autoplay: bool,

    /// Collapse runs of queued position ticks into the latest one (default: true)
    pub tick_coalescing: bool,

    /// Initial repeat mode (default: Off)
    pub repeat: RepeatMode,

    /// Initial shuffle mode (default: Off)
    pub shuffle: ShuffleMode,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            autoplay: true,
            tick_coalescing: true,
            repeat: RepeatMode::Off,
            shuffle: ShuffleMode::Off,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ControllerConfig::default();
        assert!(config.autoplay);
        assert!(config.tick_coalescing);
        assert_eq!(config.repeat, RepeatMode::Off);
        assert_eq!(config.shuffle, ShuffleMode::Off);
    }

    #[test]
    fn track_duration_in_millis() {
        let track = Track::new("t1", "/music/t1.flac", "Song", "Artist", Duration::from_secs(3));
        assert_eq!(track.duration_ms(), 3000);
        assert_eq!(track.id, TrackId::from("t1"));
    }
}
