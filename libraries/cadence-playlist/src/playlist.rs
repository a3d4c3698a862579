//! Logical playlist
//!
//! The authoritative track order plus the "currently playing" pointer.
//! Every edit moves both together so the pointer keeps naming the same song
//! whenever that song survives the edit.
//!
//! Invariant: `current` is `Some(i)` with `i < items.len()` whenever the list
//! is non-empty, and `None` exactly when it is empty.

use std::collections::HashSet;

use crate::types::{Track, TrackId};

/// Outcome of a removal
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    /// Tracks taken out of the playlist, in their former order
    pub removed: Vec<Track>,

    /// Whether the current song was among them
    pub current_removed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LogicalPlaylist {
    items: Vec<Track>,
    current: Option<usize>,
}

impl LogicalPlaylist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard all prior state and start a new playlist
    ///
    /// `start_index` is clamped into range. An empty `tracks` leaves the
    /// playlist untouched and returns `false`.
    pub fn replace_all(&mut self, tracks: Vec<Track>, start_index: usize) -> bool {
        if tracks.is_empty() {
            return false;
        }
        let start = start_index.min(tracks.len() - 1);
        self.items = tracks;
        self.current = Some(start);
        true
    }

    /// Splice `tracks` in at `index` (`index == len` appends)
    ///
    /// If the insertion point is at or before the current song, the pointer
    /// shifts right by `tracks.len()`. Inserting into an empty playlist
    /// selects the first entry. Returns `false` for an out-of-range index or
    /// an empty `tracks`.
    pub fn insert_at(&mut self, index: usize, tracks: Vec<Track>) -> bool {
        if tracks.is_empty() || index > self.items.len() {
            return false;
        }
        let count = tracks.len();
        self.items.splice(index..index, tracks);
        self.current = match self.current {
            Some(current) if index <= current => Some(current + count),
            Some(current) => Some(current),
            None => Some(0),
        };
        true
    }

    /// Splice `tracks` in right after the current song
    ///
    /// The current song never changes.
    pub fn insert_after_current(&mut self, tracks: Vec<Track>) -> bool {
        let index = self.current.map_or(0, |current| current + 1);
        self.insert_at(index, tracks)
    }

    /// Append `tracks` at the end
    pub fn append(&mut self, tracks: Vec<Track>) -> bool {
        self.insert_at(self.items.len(), tracks)
    }

    /// Remove a single entry
    ///
    /// When the current song is removed the pointer stays on the same index
    /// (now the following song), or moves to the new last entry if the
    /// removed song was last. Returns `None` for an out-of-range index.
    pub fn remove_at(&mut self, index: usize) -> Option<Removal> {
        let current = self.current?;
        if index >= self.items.len() {
            return None;
        }

        let track = self.items.remove(index);
        let current_removed = index == current;

        self.current = if self.items.is_empty() {
            None
        } else if current_removed {
            Some(index.min(self.items.len() - 1))
        } else if index < current {
            Some(current - 1)
        } else {
            Some(current)
        };

        Some(Removal {
            removed: vec![track],
            current_removed,
        })
    }

    /// Remove every entry whose id is in `ids`
    ///
    /// Equivalent to repeated [`remove_at`](Self::remove_at) calls, but the
    /// pointer shift is computed once from the whole removed set. Whether the
    /// current song is removed is decided by its identity. Returns `None` if
    /// nothing matched.
    pub fn remove_many(&mut self, ids: &HashSet<TrackId>) -> Option<Removal> {
        let current = self.current?;
        let current_removed = ids.contains(&self.items[current].id);
        let removed_before = self.items[..current]
            .iter()
            .filter(|track| ids.contains(&track.id))
            .count();

        let (removed, kept): (Vec<Track>, Vec<Track>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|track| ids.contains(&track.id));
        self.items = kept;

        if removed.is_empty() {
            return None;
        }

        // Survivors before the old current position keep their relative
        // order, so the current song (or its successor) lands right after them.
        let shifted = current - removed_before;
        self.current = if self.items.is_empty() {
            None
        } else {
            Some(shifted.min(self.items.len() - 1))
        };

        Some(Removal {
            removed,
            current_removed,
        })
    }

    /// Drag-reorder: move the entry at `from` so it ends up at `to`
    ///
    /// Entries between the two positions shift one step toward the gap and
    /// the pointer follows the song it named. Returns `false` for
    /// out-of-range indices.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        let len = self.items.len();
        if from >= len || to >= len {
            return false;
        }
        if from == to {
            return true;
        }

        let track = self.items.remove(from);
        self.items.insert(to, track);

        self.current = self.current.map(|current| {
            if current == from {
                to
            } else if from < current && current <= to {
                current - 1
            } else if to <= current && current < from {
                current + 1
            } else {
                current
            }
        });
        true
    }

    /// Point at a different entry
    pub fn set_current(&mut self, index: usize) -> bool {
        if index >= self.items.len() {
            return false;
        }
        self.current = Some(index);
        true
    }

    /// Replace the order wholesale, keeping the same entries
    ///
    /// Used by shuffle. `current` must index into `items`.
    pub(crate) fn reorder_all(&mut self, items: Vec<Track>, current: usize) {
        debug_assert!(current < items.len());
        self.items = items;
        self.current = Some(current);
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.current = None;
    }

    pub fn items(&self) -> &[Track] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.items.get(index)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|current| self.items.get(current))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
