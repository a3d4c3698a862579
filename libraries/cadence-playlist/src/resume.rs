//! Resume state
//!
//! What to put back on restart: the ordered track ids, the current index and
//! the last known position. Persistence itself lives behind
//! [`ResumeStateStore`]; the session saves after every structural edit and
//! every confirmed resync, and never loads. Loading happens once at startup
//! in the application shell, which feeds the result to `restore`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Result;
use crate::types::{Track, TrackId};

/// Persisted playlist position
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResumeState {
    /// Playlist order as catalog ids
    pub track_ids: Vec<TrackId>,

    /// Current logical index, `None` for an empty playlist
    pub current_index: Option<usize>,

    /// Last known position within the current track
    pub position_ms: u64,
}

/// A resume state resolved against the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredPlaylist {
    pub tracks: Vec<Track>,
    pub current_index: usize,
    pub position_ms: u64,
}

impl ResumeState {
    pub fn new(tracks: &[Track], current_index: Option<usize>, position_ms: u64) -> Self {
        Self {
            track_ids: tracks.iter().map(|t| t.id.clone()).collect(),
            current_index,
            position_ms,
        }
    }

    /// Look every id up in the catalog, skipping ids that no longer resolve
    ///
    /// The current index shifts left past skipped entries. If the current
    /// track itself is gone, its successor is selected (or the new last
    /// entry) and the position restarts at zero. Returns `None` when nothing
    /// resolves.
    pub fn resolve(&self, resolver: &dyn TrackResolver) -> Option<RestoredPlaylist> {
        let current = self
            .current_index
            .unwrap_or(0)
            .min(self.track_ids.len().saturating_sub(1));

        let mut tracks = Vec::with_capacity(self.track_ids.len());
        let mut skipped_before = 0;
        let mut current_missing = false;
        for (index, id) in self.track_ids.iter().enumerate() {
            match resolver.resolve(id) {
                Some(track) => tracks.push(track),
                None if index < current => skipped_before += 1,
                None => current_missing |= index == current,
            }
        }

        if tracks.is_empty() {
            return None;
        }

        let current_index = (current - skipped_before).min(tracks.len() - 1);
        Some(RestoredPlaylist {
            tracks,
            current_index,
            position_ms: if current_missing { 0 } else { self.position_ms },
        })
    }
}

/// Catalog lookup used during restore
pub trait TrackResolver {
    fn resolve(&self, id: &TrackId) -> Option<Track>;
}

impl TrackResolver for HashMap<TrackId, Track> {
    fn resolve(&self, id: &TrackId) -> Option<Track> {
        self.get(id).cloned()
    }
}

impl TrackResolver for Vec<Track> {
    fn resolve(&self, id: &TrackId) -> Option<Track> {
        self.iter().find(|t| &t.id == id).cloned()
    }
}

/// Persistence for [`ResumeState`]
pub trait ResumeStateStore: Send {
    fn save(&self, state: &ResumeState) -> Result<()>;

    fn load(&self) -> Result<Option<ResumeState>>;
}

impl<T: ResumeStateStore + Sync + ?Sized> ResumeStateStore for Arc<T> {
    fn save(&self, state: &ResumeState) -> Result<()> {
        (**self).save(state)
    }

    fn load(&self) -> Result<Option<ResumeState>> {
        (**self).load()
    }
}

/// Keeps the last saved state in memory
#[derive(Debug, Default)]
pub struct MemoryResumeStore {
    state: Mutex<Option<ResumeState>>,
    saves: Mutex<usize>,
}

impl MemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls so far
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResumeStateStore for MemoryResumeStore {
    fn save(&self, state: &ResumeState) -> Result<()> {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = Some(state.clone());
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }

    fn load(&self) -> Result<Option<ResumeState>> {
        Ok(self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}
