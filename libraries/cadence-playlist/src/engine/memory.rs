//! In-memory playback engine
//!
//! Keeps the loaded items, cursor and transport state in memory and fires
//! the same callbacks a real engine would. Clones share state, so a caller
//! can hand one clone to the controller and keep another to drive the
//! transport (`finish_current`, `tick`) and inspect what was loaded.
//!
//! Without callbacks attached, fired events are queued and can be collected
//! with [`MemoryEngine::take_events`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{EngineCallbacks, PlaybackEngine};
use crate::error::{PlaylistError, Result};
use crate::events::EngineEvent;
use crate::types::{EngineState, RepeatMode, Track, TrackId, TransitionReason};

/// A command the engine received
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    LoadItems { ids: Vec<TrackId>, start_index: usize },
    AppendItem(TrackId),
    PrependItem(TrackId),
    RemoveItemAt(usize),
    Play,
    Pause,
    Stop,
    SeekTo { index: usize, position_ms: u64 },
    SetRepeatMode(RepeatMode),
}

#[derive(Debug)]
struct Inner {
    items: Vec<Track>,
    cursor: Option<usize>,
    state: EngineState,
    position_ms: u64,
    repeat: RepeatMode,
    calls: Vec<EngineCall>,
    queued: Vec<EngineEvent>,
    fail_next: Option<String>,
    callbacks: Option<EngineCallbacks>,
}

impl Inner {
    fn emit(&mut self, event: EngineEvent) {
        if let Some(callbacks) = &self.callbacks {
            callbacks.notify(event);
        } else {
            self.queued.push(event);
        }
    }
}

#[derive(Clone)]
pub struct MemoryEngine {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    /// Engine whose events are queued for [`take_events`](Self::take_events)
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                items: Vec::new(),
                cursor: None,
                state: EngineState::Idle,
                position_ms: 0,
                repeat: RepeatMode::Off,
                calls: Vec::new(),
                queued: Vec::new(),
                fail_next: None,
                callbacks: None,
            })),
        }
    }

    /// Engine that reports straight into a controller
    pub fn with_callbacks(callbacks: EngineCallbacks) -> Self {
        let engine = Self::new();
        engine.lock().callbacks = Some(callbacks);
        engine
    }

    /// Route events from this engine and all its clones into `callbacks`
    ///
    /// Returns another handle on the same engine.
    pub fn attach(&self, callbacks: EngineCallbacks) -> Self {
        self.lock().callbacks = Some(callbacks);
        self.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, inner: &mut Inner, call: EngineCall) -> Result<()> {
        inner.calls.push(call);
        match inner.fail_next.take() {
            Some(message) => Err(PlaylistError::Engine(message)),
            None => Ok(()),
        }
    }

    /// Make the next command fail with `message`
    pub fn fail_next_command(&self, message: impl Into<String>) {
        self.lock().fail_next = Some(message.into());
    }

    /// The active item played to its end
    ///
    /// Restarts the item under repeat-one, otherwise advances to the next
    /// loaded item or reports `Ended` on the last one.
    pub fn finish_current(&self) {
        let mut inner = self.lock();
        let Some(cursor) = inner.cursor else {
            return;
        };
        inner.position_ms = 0;
        if inner.repeat == RepeatMode::One {
            inner.emit(EngineEvent::Transition(TransitionReason::Repeat));
        } else if cursor + 1 < inner.items.len() {
            inner.cursor = Some(cursor + 1);
            inner.emit(EngineEvent::Transition(TransitionReason::Auto));
        } else {
            inner.state = EngineState::Ended;
            inner.emit(EngineEvent::StateChanged(EngineState::Ended));
        }
    }

    /// Report playback progress within the active item
    pub fn tick(&self, position_ms: u64) {
        let mut inner = self.lock();
        let Some(duration_ms) = inner
            .cursor
            .and_then(|cursor| inner.items.get(cursor))
            .map(Track::duration_ms)
        else {
            return;
        };
        inner.position_ms = position_ms;
        inner.emit(EngineEvent::PositionTick {
            position_ms,
            duration_ms,
        });
    }

    /// Report a decode or I/O failure on the active item
    pub fn fail(&self, cause: impl Into<String>) {
        let mut inner = self.lock();
        inner.state = EngineState::Paused;
        inner.emit(EngineEvent::Error(cause.into()));
    }

    pub fn take_events(&self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.lock().queued)
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn item_ids(&self) -> Vec<TrackId> {
        self.lock().items.iter().map(|t| t.id.clone()).collect()
    }

    pub fn active_item(&self) -> Option<Track> {
        let inner = self.lock();
        inner.cursor.and_then(|cursor| inner.items.get(cursor).cloned())
    }

    pub fn state(&self) -> EngineState {
        self.lock().state
    }

    pub fn position_ms(&self) -> u64 {
        self.lock().position_ms
    }
}

impl PlaybackEngine for MemoryEngine {
    fn load_items(&mut self, items: Vec<Track>, start_index: usize) -> Result<()> {
        let mut inner = self.lock();
        let ids = items.iter().map(|t| t.id.clone()).collect();
        self.begin(&mut inner, EngineCall::LoadItems { ids, start_index })?;

        inner.cursor = if items.is_empty() {
            None
        } else {
            Some(start_index.min(items.len() - 1))
        };
        inner.items = items;
        inner.position_ms = 0;
        if inner.cursor.is_none() {
            inner.state = EngineState::Idle;
        } else if matches!(inner.state, EngineState::Idle | EngineState::Ended) {
            inner.state = EngineState::Paused;
        }
        inner.emit(EngineEvent::Transition(TransitionReason::PlaylistChanged));
        Ok(())
    }

    fn append_item(&mut self, item: Track) -> Result<()> {
        let mut inner = self.lock();
        self.begin(&mut inner, EngineCall::AppendItem(item.id.clone()))?;
        inner.items.push(item);
        if inner.cursor.is_none() {
            inner.cursor = Some(0);
            inner.emit(EngineEvent::Transition(TransitionReason::PlaylistChanged));
        }
        Ok(())
    }

    fn prepend_item(&mut self, item: Track) -> Result<()> {
        let mut inner = self.lock();
        self.begin(&mut inner, EngineCall::PrependItem(item.id.clone()))?;
        inner.items.insert(0, item);
        inner.cursor = Some(inner.cursor.map_or(0, |cursor| cursor + 1));
        Ok(())
    }

    fn remove_item_at(&mut self, index: usize) -> Result<()> {
        let mut inner = self.lock();
        self.begin(&mut inner, EngineCall::RemoveItemAt(index))?;
        if index >= inner.items.len() {
            return Err(PlaylistError::Engine(format!(
                "No loaded item at index {}",
                index
            )));
        }

        inner.items.remove(index);
        let Some(cursor) = inner.cursor else {
            return Ok(());
        };
        if index < cursor {
            inner.cursor = Some(cursor - 1);
        } else if index == cursor {
            if inner.items.is_empty() {
                inner.cursor = None;
                inner.state = EngineState::Idle;
            } else {
                inner.cursor = Some(cursor.min(inner.items.len() - 1));
            }
            inner.position_ms = 0;
            inner.emit(EngineEvent::Transition(TransitionReason::PlaylistChanged));
        }
        Ok(())
    }

    fn cursor(&self) -> Option<usize> {
        self.lock().cursor
    }

    fn item_count(&self) -> usize {
        self.lock().items.len()
    }

    fn play(&mut self) -> Result<()> {
        let mut inner = self.lock();
        self.begin(&mut inner, EngineCall::Play)?;
        if inner.cursor.is_some() && inner.state != EngineState::Playing {
            inner.state = EngineState::Playing;
            inner.emit(EngineEvent::StateChanged(EngineState::Playing));
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let mut inner = self.lock();
        self.begin(&mut inner, EngineCall::Pause)?;
        if inner.state == EngineState::Playing {
            inner.state = EngineState::Paused;
            inner.emit(EngineEvent::StateChanged(EngineState::Paused));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut inner = self.lock();
        self.begin(&mut inner, EngineCall::Stop)?;
        inner.items.clear();
        inner.cursor = None;
        inner.position_ms = 0;
        if inner.state != EngineState::Idle {
            inner.state = EngineState::Idle;
            inner.emit(EngineEvent::StateChanged(EngineState::Idle));
        }
        Ok(())
    }

    fn seek_to(&mut self, index: usize, position_ms: u64) -> Result<()> {
        let mut inner = self.lock();
        self.begin(&mut inner, EngineCall::SeekTo { index, position_ms })?;
        if index >= inner.items.len() {
            return Err(PlaylistError::Engine(format!(
                "Cannot seek to unloaded index {}",
                index
            )));
        }

        let moved = inner.cursor != Some(index);
        inner.cursor = Some(index);
        inner.position_ms = position_ms;
        if inner.state == EngineState::Ended {
            inner.state = EngineState::Paused;
        }
        if moved {
            inner.emit(EngineEvent::Transition(TransitionReason::Seek));
        }
        Ok(())
    }

    fn set_repeat_mode(&mut self, mode: RepeatMode) -> Result<()> {
        let mut inner = self.lock();
        self.begin(&mut inner, EngineCall::SetRepeatMode(mode))?;
        inner.repeat = mode;
        Ok(())
    }
}
