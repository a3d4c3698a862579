//! Playlist session - the single-writer core
//!
//! Owns the logical playlist and the window manager and applies every
//! control operation and engine callback to both. Nothing in here is
//! thread-safe on purpose: the controller confines a session to one worker
//! thread and feeds it one message at a time.
//!
//! Invalid arguments are dropped as no-ops. Engine failures are logged,
//! published as [`PlayerEvent::Error`] and otherwise leave the playlist and
//! window bookkeeping untouched so the user can skip past them.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    engine::PlaybackEngine,
    error::PlaylistError,
    events::{EngineEvent, PlayerEvent},
    listeners::ListenerRegistry,
    playlist::{LogicalPlaylist, Removal},
    resume::{RestoredPlaylist, ResumeState, ResumeStateStore, TrackResolver},
    shuffle::shuffle_tracks,
    types::{
        ControllerConfig, EngineState, RepeatMode, ShuffleMode, Track, TrackId, TransitionReason,
    },
    window::{Rebuild, Resync, WindowBounds, WindowManager, WindowState},
};

pub struct PlaylistSession<E> {
    playlist: LogicalPlaylist,
    window: WindowManager<E>,
    listeners: Arc<ListenerRegistry>,
    store: Box<dyn ResumeStateStore>,
    config: ControllerConfig,

    repeat: RepeatMode,
    shuffle: ShuffleMode,

    /// Playlist order before shuffling, kept only while shuffle is on
    original_order: Option<Vec<Track>>,

    /// Last reported engine state
    engine_state: EngineState,

    position_ms: u64,
    duration_ms: u64,

    /// Whether `ProgressInitialized` went out for the current song
    progress_initialized: bool,
}

impl<E: PlaybackEngine> PlaylistSession<E> {
    pub fn new(
        engine: E,
        listeners: Arc<ListenerRegistry>,
        store: Box<dyn ResumeStateStore>,
        config: ControllerConfig,
    ) -> Self {
        let mut window = WindowManager::new(engine);
        if config.repeat == RepeatMode::One {
            if let Err(e) = window.engine_mut().set_repeat_mode(RepeatMode::One) {
                warn!(error = %e, "Engine rejected initial repeat mode");
            }
        }

        Self {
            playlist: LogicalPlaylist::new(),
            window,
            listeners,
            store,
            repeat: config.repeat,
            shuffle: config.shuffle,
            config,
            original_order: None,
            engine_state: EngineState::Idle,
            position_ms: 0,
            duration_ms: 0,
            progress_initialized: false,
        }
    }

    // ===== Playlist Control =====

    /// Start a new playlist at `start_index`
    ///
    /// An empty `tracks` is ignored. The start index is clamped.
    pub fn set_playlist(&mut self, tracks: Vec<Track>, start_index: usize) {
        if !self.playlist.replace_all(tracks, start_index) {
            debug!("Ignoring empty playlist");
            return;
        }

        self.original_order = None;
        if self.shuffle != ShuffleMode::Off {
            self.original_order = Some(self.playlist.items().to_vec());
            self.shuffle_upcoming(self.shuffle);
        }

        info!(
            length = self.playlist.len(),
            current = self.playlist.current_index(),
            "New playlist"
        );

        if let Err(e) = self.window.load(&self.playlist, self.current_or_zero()) {
            self.report("Failed to load playback window", e);
        }
        self.song_changed();
        self.emit(PlayerEvent::QueueChanged {
            length: self.playlist.len(),
        });
        if self.config.autoplay {
            self.start_playback();
        }
        self.persist();
    }

    /// Jump to logical index `index`
    pub fn play_at(&mut self, index: usize) {
        if index >= self.playlist.len() {
            debug!(index, length = self.playlist.len(), "Ignoring play of out-of-range index");
            return;
        }
        self.follow_engine();

        self.playlist.set_current(index);
        if let Err(e) = self.window.activate_current(&self.playlist, 0) {
            self.report("Failed to activate track", e);
        }
        self.song_changed();
        if self.config.autoplay {
            self.start_playback();
        }
        self.persist();
    }

    /// Insert `tracks` right after the current song
    pub fn insert_next(&mut self, tracks: Vec<Track>) {
        self.follow_engine();

        let anchor = self.playlist.current_track().map(|t| t.id.clone());
        if !self.playlist.insert_after_current(tracks.clone()) {
            debug!("Nothing to insert");
            return;
        }

        if let Some(original) = &mut self.original_order {
            let at = anchor
                .and_then(|id| original.iter().position(|t| t.id == id))
                .map_or(original.len(), |i| i + 1);
            original.splice(at..at, tracks);
        }
        self.after_structural_edit(false);
    }

    /// Append `tracks` at the end
    pub fn append(&mut self, tracks: Vec<Track>) {
        self.follow_engine();

        if !self.playlist.append(tracks.clone()) {
            debug!("Nothing to append");
            return;
        }

        if let Some(original) = &mut self.original_order {
            original.extend(tracks);
        }
        self.after_structural_edit(false);
    }

    /// Remove the entry at logical index `index`
    pub fn remove_at(&mut self, index: usize) {
        self.follow_engine();

        match self.playlist.remove_at(index) {
            Some(removal) => self.after_removal(removal),
            None => debug!(index, length = self.playlist.len(), "Ignoring removal of out-of-range index"),
        }
    }

    /// Remove every entry whose id is in `ids`
    pub fn remove_by_ids(&mut self, ids: &[TrackId]) {
        self.follow_engine();

        let set: HashSet<TrackId> = ids.iter().cloned().collect();
        match self.playlist.remove_many(&set) {
            Some(removal) => self.after_removal(removal),
            None => debug!(requested = ids.len(), "No matching tracks to remove"),
        }
    }

    /// Drag an entry from `from` to `to`
    pub fn reorder(&mut self, from: usize, to: usize) {
        self.follow_engine();

        if !self.playlist.move_item(from, to) {
            debug!(from, to, length = self.playlist.len(), "Ignoring out-of-range reorder");
            return;
        }
        if from != to {
            self.after_structural_edit(false);
        }
    }

    /// Empty the playlist and stop playback
    pub fn clear(&mut self) {
        if self.playlist.is_empty() {
            return;
        }
        self.playlist.clear();
        self.after_structural_edit(false);
    }

    // ===== Transport =====

    pub fn play(&mut self) {
        if self.playlist.is_empty() {
            debug!("Nothing to play");
            return;
        }
        if self.window.state() == WindowState::Idle {
            if let Err(e) = self.window.activate_current(&self.playlist, self.position_ms) {
                self.report("Failed to load playback window", e);
            }
        }
        self.start_playback();
    }

    pub fn pause(&mut self) {
        if let Err(e) = self.window.engine_mut().pause() {
            self.report("Failed to pause", e);
        }
    }

    /// Skip to the next entry, wrapping to the first under repeat-all
    pub fn next(&mut self) {
        self.follow_engine();

        let Some(current) = self.playlist.current_index() else {
            return;
        };
        if current + 1 < self.playlist.len() {
            self.play_at(current + 1);
        } else if self.repeat == RepeatMode::All {
            self.play_at(0);
        } else {
            debug!("Already at the last entry");
        }
    }

    /// Go back one entry
    pub fn previous(&mut self) {
        self.follow_engine();

        match self.playlist.current_index() {
            Some(current) if current > 0 => self.play_at(current - 1),
            _ => debug!("Already at the first entry"),
        }
    }

    /// Seek within the current song
    pub fn seek(&mut self, position_ms: u64) {
        let engine_index = self
            .playlist
            .current_index()
            .zip(self.window.bounds())
            .and_then(|(current, bounds)| bounds.engine_index(current));
        let Some(engine_index) = engine_index else {
            debug!(position_ms, "No active track to seek in");
            return;
        };

        match self.window.engine_mut().seek_to(engine_index, position_ms) {
            Ok(()) => self.position_ms = position_ms,
            Err(e) => self.report("Failed to seek", e),
        }
    }

    pub fn set_repeat(&mut self, mode: RepeatMode) {
        if self.repeat == mode {
            return;
        }
        self.repeat = mode;

        // Windowed engines can only loop a single item natively; wrapping
        // the whole playlist is handled here on `Ended`.
        let engine_mode = match mode {
            RepeatMode::One => RepeatMode::One,
            RepeatMode::Off | RepeatMode::All => RepeatMode::Off,
        };
        if let Err(e) = self.window.engine_mut().set_repeat_mode(engine_mode) {
            self.report("Failed to set repeat mode", e);
        }
        self.emit(PlayerEvent::RepeatModeChanged(mode));
    }

    /// Shuffle everything after the current song, or restore the original order
    pub fn set_shuffle(&mut self, mode: ShuffleMode) {
        if self.shuffle == mode {
            return;
        }
        self.follow_engine();

        let previous = self.shuffle;
        self.shuffle = mode;
        self.emit(PlayerEvent::ShuffleModeChanged(mode));

        if self.playlist.is_empty() {
            return;
        }

        match mode {
            ShuffleMode::Off => self.restore_original_order(),
            ShuffleMode::Random | ShuffleMode::Smart => {
                if previous == ShuffleMode::Off || self.original_order.is_none() {
                    self.original_order = Some(self.playlist.items().to_vec());
                }
                self.shuffle_upcoming(mode);
            }
        }
        self.after_structural_edit(false);
    }

    // ===== Restore =====

    /// Rebuild the playlist from persisted state
    ///
    /// Ids the catalog no longer knows are skipped. The window is loaded
    /// and seeked to the saved position, but playback is not started and
    /// nothing is saved.
    pub fn restore(&mut self, state: &ResumeState, resolver: &dyn TrackResolver) {
        match state.resolve(resolver) {
            Some(restored) => self.apply_restored(restored),
            None => info!(saved = state.track_ids.len(), "Nothing to restore"),
        }
    }

    pub fn apply_restored(&mut self, restored: RestoredPlaylist) {
        let RestoredPlaylist {
            tracks,
            current_index,
            position_ms,
        } = restored;
        if !self.playlist.replace_all(tracks, current_index) {
            return;
        }
        self.original_order = None;

        info!(
            length = self.playlist.len(),
            current = current_index,
            position_ms,
            "Restored playlist"
        );

        if let Err(e) = self.window.activate_current(&self.playlist, position_ms) {
            self.report("Failed to load restored window", e);
        }
        self.song_changed();
        self.position_ms = position_ms;
        self.emit(PlayerEvent::QueueChanged {
            length: self.playlist.len(),
        });
    }

    // ===== Engine Callbacks =====

    /// Apply one callback reported by the engine
    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Transition(reason) => {
                self.emit(PlayerEvent::Transition(reason));
                if self.follow_engine() {
                    self.expand_window();
                } else if reason == TransitionReason::Repeat {
                    self.reset_progress();
                }
            }
            EngineEvent::PositionTick {
                position_ms,
                duration_ms,
            } => {
                self.position_ms = position_ms;
                self.duration_ms = duration_ms;
                if !self.progress_initialized {
                    self.progress_initialized = true;
                    self.emit(PlayerEvent::ProgressInitialized {
                        duration_ms,
                        position_ms,
                    });
                }
                self.emit(PlayerEvent::PositionChanged {
                    position_ms,
                    duration_ms,
                });
                self.expand_window();
            }
            EngineEvent::StateChanged(state) => {
                self.engine_state = state;
                self.emit(PlayerEvent::StateChanged(state));
                if state == EngineState::Ended {
                    self.handle_ended();
                }
            }
            EngineEvent::Error(cause) => {
                warn!(cause = %cause, current = self.playlist.current_index(), "Engine reported an error");
                self.emit(PlayerEvent::Error { message: cause });
            }
        }
    }

    /// The engine ran out of loaded items
    fn handle_ended(&mut self) {
        let Some(current) = self.playlist.current_index() else {
            return;
        };
        let last = current + 1 == self.playlist.len();

        match self.repeat {
            RepeatMode::One => {
                debug!(current, "Replaying current track");
                if let Err(e) = self.window.activate_current(&self.playlist, 0) {
                    self.report("Failed to replay track", e);
                }
                self.reset_progress();
                self.start_playback();
            }
            RepeatMode::All if last => {
                debug!("Wrapping to the first entry");
                self.play_at(0);
            }
            _ if last => {
                info!("Reached the end of the playlist");
                self.emit(PlayerEvent::PlaybackStopped);
            }
            _ => {
                // The window fell behind playback; catch up explicitly.
                debug!(current, "Engine ended before the playlist did");
                self.play_at(current + 1);
            }
        }
    }

    // ===== State Queries =====

    pub fn get_full_playlist(&self) -> &[Track] {
        self.playlist.items()
    }

    pub fn get_current_index(&self) -> Option<usize> {
        self.playlist.current_index()
    }

    pub fn get_current_track(&self) -> Option<&Track> {
        self.playlist.current_track()
    }

    pub fn get_repeat(&self) -> RepeatMode {
        self.repeat
    }

    pub fn get_shuffle(&self) -> ShuffleMode {
        self.shuffle
    }

    pub fn get_position_ms(&self) -> u64 {
        self.position_ms
    }

    pub fn window(&self) -> Option<WindowBounds> {
        self.window.bounds()
    }

    pub fn window_state(&self) -> WindowState {
        self.window.state()
    }

    pub fn engine(&self) -> &E {
        self.window.engine()
    }

    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    // ===== Internals =====

    /// Read the engine cursor back into the playlist
    ///
    /// Returns `true` when the current song moved.
    fn follow_engine(&mut self) -> bool {
        match self.window.resync(&mut self.playlist) {
            Resync::Moved(index) => {
                debug!(index, "Current track follows engine");
                self.song_changed();
                self.persist();
                true
            }
            Resync::Inconsistent => {
                self.heal_window();
                false
            }
            Resync::Unchanged | Resync::NoCursor => false,
        }
    }

    /// Reload the window around the current song after the engine drifted
    fn heal_window(&mut self) {
        let was_playing = self.engine_state == EngineState::Playing;
        if let Err(e) = self.window.activate_current(&self.playlist, self.position_ms) {
            self.report("Failed to reload drifted window", e);
            return;
        }
        if was_playing {
            self.start_playback();
        }
    }

    fn expand_window(&mut self) {
        if let Err(e) = self.window.expand(&self.playlist) {
            self.report("Failed to expand playback window", e);
        }
    }

    fn after_removal(&mut self, removal: Removal) {
        if let Some(original) = &mut self.original_order {
            for track in &removal.removed {
                if let Some(at) = original.iter().position(|t| t.id == track.id) {
                    original.remove(at);
                }
            }
        }
        debug!(
            removed = removal.removed.len(),
            current_removed = removal.current_removed,
            "Removed tracks"
        );
        self.after_structural_edit(removal.current_removed);
    }

    /// Rebuild the window, notify and persist after membership or order changed
    ///
    /// `current_removed` forces a reload even when the active engine item
    /// carries the same id as the new current entry.
    fn after_structural_edit(&mut self, current_removed: bool) {
        if self.playlist.is_empty() {
            self.original_order = None;
            if let Err(e) = self.window.clear() {
                self.report("Failed to stop engine", e);
            }
            self.position_ms = 0;
            self.duration_ms = 0;
            self.progress_initialized = false;
            info!("Playlist is empty");
            self.emit(PlayerEvent::PlaybackStopped);
            self.emit(PlayerEvent::PlaylistEmpty);
            self.emit(PlayerEvent::QueueChanged { length: 0 });
            self.persist();
            return;
        }

        let was_playing = self.engine_state == EngineState::Playing;
        match self.window.rebuild(&self.playlist, current_removed) {
            Ok(Rebuild::Patched) => {}
            Ok(Rebuild::Reloaded) => {
                self.song_changed();
                if was_playing {
                    self.start_playback();
                }
            }
            Err(e) => self.report("Failed to rebuild playback window", e),
        }

        self.emit(PlayerEvent::QueueChanged {
            length: self.playlist.len(),
        });
        self.persist();
    }

    fn shuffle_upcoming(&mut self, mode: ShuffleMode) {
        let current = self.current_or_zero();
        let mut items = self.playlist.items().to_vec();
        shuffle_tracks(&mut items[current + 1..], mode);
        self.playlist.reorder_all(items, current);
    }

    fn restore_original_order(&mut self) {
        let Some(original) = self.original_order.take() else {
            return;
        };
        if original.is_empty() {
            return;
        }

        let current = self
            .playlist
            .current_track()
            .and_then(|track| original.iter().position(|t| t.id == track.id))
            .unwrap_or_else(|| self.current_or_zero().min(original.len() - 1));
        self.playlist.reorder_all(original, current);
    }

    fn current_or_zero(&self) -> usize {
        self.playlist.current_index().unwrap_or(0)
    }

    fn start_playback(&mut self) {
        if let Err(e) = self.window.engine_mut().play() {
            self.report("Failed to start playback", e);
        }
    }

    fn song_changed(&mut self) {
        self.reset_progress();
        if let Some(track) = self.playlist.current_track().cloned() {
            self.emit(PlayerEvent::SongChanged(track));
        }
    }

    fn reset_progress(&mut self) {
        self.position_ms = 0;
        self.duration_ms = self.playlist.current_track().map_or(0, Track::duration_ms);
        self.progress_initialized = false;
    }

    fn persist(&self) {
        let state = ResumeState::new(
            self.playlist.items(),
            self.playlist.current_index(),
            self.position_ms,
        );
        if let Err(e) = self.store.save(&state) {
            self.report("Failed to save resume state", e);
        }
    }

    fn report(&self, context: &str, error: PlaylistError) {
        warn!(error = %error, "{}", context);
        self.emit(PlayerEvent::Error {
            message: format!("{}: {}", context, error),
        });
    }

    fn emit(&self, event: PlayerEvent) {
        self.listeners.notify(&event);
    }
}
