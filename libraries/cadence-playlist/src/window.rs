//! Window manager - the playback window state machine
//!
//! Mirrors a contiguous slice `[start, end]` of the logical playlist into the
//! playback engine's loaded items and translates between the two index
//! spaces: engine index `e` is logical index `start + e`.
//!
//! States:
//! ```text
//! Idle ──load──▶ WindowLoaded ──callback/edit──▶ Expanding ──▶ WindowLoaded
//!   ▲                  │
//!   └──────clear───────┘
//! ```
//!
//! Steady state keeps exactly one neighbour on each side of the current
//! song, clamped at the ends of the playlist. After a structural edit the
//! window is rebuilt from scratch around the current song: every loaded item
//! except the active one is unloaded and the neighbours are loaded again.
//! That single code path replaces per-case patching for inserts, removals
//! and moves before, inside or after the window.

use tracing::{debug, warn};

use crate::engine::PlaybackEngine;
use crate::error::Result;
use crate::playlist::LogicalPlaylist;
use crate::types::TrackId;

/// Neighbours kept loaded on each side of the current song
const NEIGHBOURS: usize = 1;

/// Inclusive logical bounds of the loaded window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub start: usize,
    pub end: usize,
}

impl WindowBounds {
    /// Target window around `current`, clamped to a playlist of `len` items
    pub fn around(current: usize, len: usize) -> Self {
        debug_assert!(current < len);
        Self {
            start: current.saturating_sub(NEIGHBOURS),
            end: (current + NEIGHBOURS).min(len - 1),
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index <= self.end
    }

    /// Number of loaded items the window spans
    pub fn item_count(&self) -> usize {
        self.end - self.start + 1
    }

    /// Engine-local index of a logical index inside the window
    pub fn engine_index(&self, logical: usize) -> Option<usize> {
        self.contains(logical).then(|| logical - self.start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// Nothing loaded
    Idle,
    /// Steady playback
    WindowLoaded,
    /// An expansion or rebuild is running
    Expanding,
}

/// Result of reading the engine cursor back into the logical playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resync {
    /// The pointer already matched the engine
    Unchanged,
    /// The pointer moved to this logical index
    Moved(usize),
    /// The engine has no active item
    NoCursor,
    /// The engine disagrees with the window bookkeeping
    Inconsistent,
}

/// How a rebuild updated the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rebuild {
    /// The active item survived and only neighbours were reloaded
    Patched,
    /// The active item changed, so the window was loaded from scratch
    Reloaded,
}

pub struct WindowManager<E> {
    engine: E,
    bounds: Option<WindowBounds>,
    state: WindowState,
    /// Ids of the items currently loaded in the engine, in engine order
    loaded: Vec<TrackId>,
}

impl<E: PlaybackEngine> WindowManager<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            bounds: None,
            state: WindowState::Idle,
            loaded: Vec::new(),
        }
    }

    pub fn bounds(&self) -> Option<WindowBounds> {
        self.bounds
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Materialize the window around `target` from scratch
    pub fn load(&mut self, playlist: &LogicalPlaylist, target: usize) -> Result<()> {
        if target >= playlist.len() {
            return self.clear();
        }

        let bounds = WindowBounds::around(target, playlist.len());
        let slice = playlist.items()[bounds.start..=bounds.end].to_vec();
        self.loaded = slice.iter().map(|t| t.id.clone()).collect();
        self.bounds = Some(bounds);
        self.state = WindowState::WindowLoaded;

        debug!(
            target,
            window_start = bounds.start,
            window_end = bounds.end,
            "Loading playback window"
        );
        self.engine.load_items(slice, target - bounds.start)
    }

    /// Stop the engine and forget the window
    pub fn clear(&mut self) -> Result<()> {
        self.bounds = None;
        self.loaded.clear();
        self.state = WindowState::Idle;
        self.engine.stop()
    }

    /// Make the current song the engine's active item at `position_ms`
    ///
    /// Seeks within the window when the song is already loaded, then slides
    /// the window around it. Anything else loads a fresh window.
    pub fn activate_current(&mut self, playlist: &LogicalPlaylist, position_ms: u64) -> Result<()> {
        let Some(current) = playlist.current_index() else {
            return self.clear();
        };

        let current_id = &playlist.items()[current].id;
        let loaded_at = self
            .bounds
            .and_then(|bounds| bounds.engine_index(current))
            .filter(|_| self.engine.item_count() == self.loaded.len())
            .filter(|&index| self.loaded.get(index) == Some(current_id));

        if let Some(index) = loaded_at {
            self.engine.seek_to(index, position_ms)?;
            return self.expand(playlist);
        }

        self.load(playlist, current)?;
        match self.bounds {
            Some(bounds) if position_ms > 0 => {
                self.engine.seek_to(current - bounds.start, position_ms)
            }
            _ => Ok(()),
        }
    }

    /// Recompute the current logical index from the engine's cursor
    ///
    /// This is the only place the pointer follows playback. A cursor that
    /// does not land on the expected track means the bookkeeping drifted.
    pub fn resync(&mut self, playlist: &mut LogicalPlaylist) -> Resync {
        let Some(bounds) = self.bounds else {
            return Resync::NoCursor;
        };
        let Some(cursor) = self.engine.cursor() else {
            return Resync::NoCursor;
        };
        if !self.is_consistent(playlist, bounds) {
            return Resync::Inconsistent;
        }

        let logical = bounds.start + cursor;
        if logical > bounds.end {
            return Resync::Inconsistent;
        }

        if playlist.current_index() == Some(logical) {
            Resync::Unchanged
        } else {
            playlist.set_current(logical);
            Resync::Moved(logical)
        }
    }

    /// Slide the window after playback moved
    ///
    /// Unloads items that drifted more than one step away from the current
    /// song and loads the missing neighbours. Runs to completion on the
    /// calling thread; engine callbacks it triggers wait in the controller
    /// mailbox, so two expansions never overlap.
    pub fn expand(&mut self, playlist: &LogicalPlaylist) -> Result<()> {
        let (Some(bounds), Some(current)) = (self.bounds, playlist.current_index()) else {
            return Ok(());
        };
        let Some(cursor) = self.engine.cursor() else {
            return Ok(());
        };
        if bounds.start + cursor != current {
            debug!(current, engine_cursor = cursor, "Cursor not confirmed yet, waiting for resync");
            return Ok(());
        }
        if bounds == WindowBounds::around(current, playlist.len()) {
            return Ok(());
        }

        self.state = WindowState::Expanding;
        let result = self.slide(playlist, bounds, cursor, current);
        self.state = WindowState::WindowLoaded;
        result
    }

    fn slide(
        &mut self,
        playlist: &LogicalPlaylist,
        mut bounds: WindowBounds,
        mut cursor: usize,
        current: usize,
    ) -> Result<()> {
        let target = WindowBounds::around(current, playlist.len());

        while bounds.start < target.start {
            self.engine.remove_item_at(0)?;
            self.loaded.remove(0);
            bounds.start += 1;
            cursor -= 1;
            self.bounds = Some(bounds);
        }
        while bounds.end > target.end {
            self.engine.remove_item_at(self.loaded.len() - 1)?;
            self.loaded.pop();
            bounds.end -= 1;
            self.bounds = Some(bounds);
        }
        while bounds.start > target.start {
            let track = playlist.items()[bounds.start - 1].clone();
            self.loaded.insert(0, track.id.clone());
            self.engine.prepend_item(track)?;
            bounds.start -= 1;
            cursor += 1;
            self.bounds = Some(bounds);
        }
        while bounds.end < target.end {
            let track = playlist.items()[bounds.end + 1].clone();
            self.loaded.push(track.id.clone());
            self.engine.append_item(track)?;
            bounds.end += 1;
            self.bounds = Some(bounds);
        }

        debug!(
            window_start = bounds.start,
            window_end = bounds.end,
            engine_cursor = cursor,
            "Playback window moved"
        );
        Ok(())
    }

    /// Rebuild the window around the current song after a structural edit
    ///
    /// Keeps the active engine item playing when it is still the current
    /// song; otherwise loads the window from scratch. Ids may repeat within
    /// a playlist, so a removed current entry is reloaded even when its
    /// successor has the same id.
    pub fn rebuild(&mut self, playlist: &LogicalPlaylist, current_removed: bool) -> Result<Rebuild> {
        let Some(current) = playlist.current_index() else {
            self.clear()?;
            return Ok(Rebuild::Reloaded);
        };

        let current_id = &playlist.items()[current].id;
        let active = self
            .engine
            .cursor()
            .filter(|_| !current_removed)
            .filter(|_| self.engine.item_count() == self.loaded.len())
            .filter(|&cursor| self.loaded.get(cursor) == Some(current_id));

        let Some(cursor) = active else {
            debug!(current, "Active item is gone, reloading window");
            self.load(playlist, current)?;
            return Ok(Rebuild::Reloaded);
        };

        self.state = WindowState::Expanding;
        let result = self.keep_active(playlist, cursor, current);
        self.state = WindowState::WindowLoaded;
        result.map(|()| Rebuild::Patched)
    }

    fn keep_active(
        &mut self,
        playlist: &LogicalPlaylist,
        cursor: usize,
        current: usize,
    ) -> Result<()> {
        // Pin the window to the active item before touching the engine so a
        // failure halfway leaves bounds that still contain the current song.
        self.bounds = Some(WindowBounds {
            start: current,
            end: current,
        });

        while self.loaded.len() > cursor + 1 {
            self.engine.remove_item_at(self.loaded.len() - 1)?;
            self.loaded.pop();
        }
        for _ in 0..cursor {
            self.engine.remove_item_at(0)?;
            self.loaded.remove(0);
        }

        let target = WindowBounds::around(current, playlist.len());
        for index in (target.start..current).rev() {
            let track = playlist.items()[index].clone();
            self.loaded.insert(0, track.id.clone());
            self.engine.prepend_item(track)?;
            self.bounds = Some(WindowBounds {
                start: index,
                end: current,
            });
        }
        for index in current + 1..=target.end {
            let track = playlist.items()[index].clone();
            self.loaded.push(track.id.clone());
            self.engine.append_item(track)?;
            self.bounds = Some(WindowBounds {
                start: target.start,
                end: index,
            });
        }

        debug!(
            current,
            window_start = target.start,
            window_end = target.end,
            "Playback window rebuilt"
        );
        Ok(())
    }

    /// Whether the engine and the bounds still describe the same slice
    fn is_consistent(&self, playlist: &LogicalPlaylist, bounds: WindowBounds) -> bool {
        let consistent = bounds.end < playlist.len()
            && bounds.item_count() == self.loaded.len()
            && self.engine.item_count() == self.loaded.len()
            && playlist.items()[bounds.start..=bounds.end]
                .iter()
                .zip(&self.loaded)
                .all(|(track, id)| &track.id == id);
        if !consistent {
            warn!(
                window_start = bounds.start,
                window_end = bounds.end,
                loaded = self.loaded.len(),
                engine_items = self.engine.item_count(),
                "Playback window out of sync with engine"
            );
        }
        consistent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryEngine;
    use crate::types::Track;
    use std::time::Duration;

    fn playlist(count: usize, current: usize) -> LogicalPlaylist {
        let tracks = (1..=count)
            .map(|i| {
                let id = format!("s{}", i);
                Track::new(id.clone(), format!("/music/{}.mp3", id), id, "Artist", Duration::from_secs(180))
            })
            .collect();
        let mut playlist = LogicalPlaylist::new();
        playlist.replace_all(tracks, current);
        playlist
    }

    fn loaded(window: &WindowManager<MemoryEngine>) -> Vec<String> {
        window
            .engine()
            .item_ids()
            .into_iter()
            .map(|id| id.0)
            .collect()
    }

    #[test]
    fn bounds_clamp_at_playlist_edges() {
        assert_eq!(WindowBounds::around(0, 5), WindowBounds { start: 0, end: 1 });
        assert_eq!(WindowBounds::around(4, 5), WindowBounds { start: 3, end: 4 });
        assert_eq!(WindowBounds::around(0, 1), WindowBounds { start: 0, end: 0 });
        assert_eq!(WindowBounds::around(2, 5).engine_index(3), Some(2));
        assert_eq!(WindowBounds::around(2, 5).engine_index(4), None);
    }

    #[test]
    fn load_materializes_neighbours() {
        let playlist = playlist(5, 2);
        let mut window = WindowManager::new(MemoryEngine::new());

        window.load(&playlist, 2).unwrap();

        assert_eq!(window.bounds(), Some(WindowBounds { start: 1, end: 3 }));
        assert_eq!(window.engine().cursor(), Some(1));
        assert_eq!(loaded(&window), ["s2", "s3", "s4"]);
        assert_eq!(window.state(), WindowState::WindowLoaded);
    }

    #[test]
    fn expand_slides_forward_after_advance() {
        let mut playlist = playlist(5, 2);
        let mut window = WindowManager::new(MemoryEngine::new());
        window.load(&playlist, 2).unwrap();

        window.engine().finish_current();
        assert_eq!(window.resync(&mut playlist), Resync::Moved(3));
        window.expand(&playlist).unwrap();

        assert_eq!(window.bounds(), Some(WindowBounds { start: 2, end: 4 }));
        assert_eq!(loaded(&window), ["s3", "s4", "s5"]);
        assert_eq!(window.engine().cursor(), Some(1));
    }

    #[test]
    fn expand_slides_backward_after_seek() {
        let mut playlist = playlist(5, 2);
        let mut window = WindowManager::new(MemoryEngine::new());
        window.load(&playlist, 2).unwrap();

        window.engine_mut().seek_to(0, 0).unwrap();
        assert_eq!(window.resync(&mut playlist), Resync::Moved(1));
        window.expand(&playlist).unwrap();

        assert_eq!(window.bounds(), Some(WindowBounds { start: 0, end: 2 }));
        assert_eq!(loaded(&window), ["s1", "s2", "s3"]);
        assert_eq!(window.engine().active_item().unwrap().id.as_str(), "s2");
    }

    #[test]
    fn activate_inside_window_seeks_and_slides() {
        let mut playlist = playlist(5, 2);
        let mut window = WindowManager::new(MemoryEngine::new());
        window.load(&playlist, 2).unwrap();
        window.engine().clear_calls();

        playlist.set_current(3);
        window.activate_current(&playlist, 0).unwrap();

        assert_eq!(
            window.engine().calls()[0],
            crate::engine::EngineCall::SeekTo {
                index: 2,
                position_ms: 0
            }
        );
        assert_eq!(window.bounds(), Some(WindowBounds { start: 2, end: 4 }));
        assert_eq!(loaded(&window), ["s3", "s4", "s5"]);
    }

    #[test]
    fn activate_outside_window_reloads_at_position() {
        let mut playlist = playlist(5, 0);
        let mut window = WindowManager::new(MemoryEngine::new());
        window.load(&playlist, 0).unwrap();

        playlist.set_current(4);
        window.activate_current(&playlist, 12_000).unwrap();

        assert_eq!(window.bounds(), Some(WindowBounds { start: 3, end: 4 }));
        assert_eq!(window.engine().active_item().unwrap().id.as_str(), "s5");
        assert_eq!(window.engine().position_ms(), 12_000);
    }

    #[test]
    fn rebuild_keeps_active_item_loaded() {
        let mut playlist = playlist(5, 2);
        let mut window = WindowManager::new(MemoryEngine::new());
        window.load(&playlist, 2).unwrap();
        window.engine().clear_calls();

        playlist.move_item(0, 4);
        let outcome = window.rebuild(&playlist, false).unwrap();

        assert_eq!(outcome, Rebuild::Patched);
        assert_eq!(loaded(&window), ["s2", "s3", "s4"]);
        assert!(window
            .engine()
            .calls()
            .iter()
            .all(|call| !matches!(call, crate::engine::EngineCall::LoadItems { .. })));
        assert_eq!(window.engine().active_item().unwrap().id.as_str(), "s3");
        assert_eq!(window.bounds(), Some(WindowBounds { start: 0, end: 2 }));
    }

    #[test]
    fn rebuild_reloads_when_current_was_removed() {
        let mut playlist = playlist(5, 2);
        let mut window = WindowManager::new(MemoryEngine::new());
        window.load(&playlist, 2).unwrap();

        let removal = playlist.remove_at(2).unwrap();
        let outcome = window.rebuild(&playlist, removal.current_removed).unwrap();

        assert_eq!(outcome, Rebuild::Reloaded);
        assert_eq!(loaded(&window), ["s2", "s4", "s5"]);
        assert_eq!(window.engine().active_item().unwrap().id.as_str(), "s4");
    }

    #[test]
    fn rebuild_reloads_removed_current_even_when_successor_shares_its_id() {
        let tracks = ["a", "a", "b"]
            .iter()
            .map(|id| Track::new(*id, format!("/music/{}.mp3", id), *id, "Artist", Duration::from_secs(180)))
            .collect();
        let mut playlist = LogicalPlaylist::new();
        playlist.replace_all(tracks, 0);
        let mut window = WindowManager::new(MemoryEngine::new());
        window.load(&playlist, 0).unwrap();
        window.engine_mut().seek_to(0, 90_000).unwrap();

        let removal = playlist.remove_at(0).unwrap();
        assert!(removal.current_removed);
        let outcome = window.rebuild(&playlist, removal.current_removed).unwrap();

        assert_eq!(outcome, Rebuild::Reloaded);
        assert_eq!(loaded(&window), ["a", "b"]);
        assert_eq!(window.engine().position_ms(), 0);
    }

    #[test]
    fn resync_flags_drifted_engine() {
        let mut playlist = playlist(5, 2);
        let mut window = WindowManager::new(MemoryEngine::new());
        window.load(&playlist, 2).unwrap();

        window.engine_mut().remove_item_at(0).unwrap();

        assert_eq!(window.resync(&mut playlist), Resync::Inconsistent);
        assert_eq!(playlist.current_index(), Some(2));
    }

    #[test]
    fn clear_returns_to_idle() {
        let playlist = playlist(3, 0);
        let mut window = WindowManager::new(MemoryEngine::new());
        window.load(&playlist, 0).unwrap();

        window.clear().unwrap();

        assert_eq!(window.state(), WindowState::Idle);
        assert_eq!(window.bounds(), None);
        assert_eq!(window.engine().item_count(), 0);
    }
}
