//! Playback engine boundary
//!
//! The engine owns actual audio output and holds only a handful of loaded
//! items. Commands are fire-and-forget; the engine reports what happened
//! through [`EngineCallbacks`], which funnel into the control worker's
//! mailbox so no callback thread ever touches playlist state directly.

mod memory;

pub use memory::{EngineCall, MemoryEngine};

use crossbeam_channel::Sender;

use crate::controller::ControlMessage;
use crate::error::Result;
use crate::events::EngineEvent;
use crate::types::{EngineState, RepeatMode, Track, TransitionReason};

/// Platform audio engine with a small ordered list of loaded items
///
/// Indices are engine-local: `0` is the first loaded item. Only the window
/// manager calls the mutating methods.
pub trait PlaybackEngine: Send {
    /// Replace every loaded item and make `start_index` active
    fn load_items(&mut self, items: Vec<Track>, start_index: usize) -> Result<()>;

    /// Load one more item after the last one
    fn append_item(&mut self, item: Track) -> Result<()>;

    /// Load one more item before the first one
    ///
    /// The active item keeps playing, so the cursor moves up by one.
    fn prepend_item(&mut self, item: Track) -> Result<()>;

    /// Unload the item at `index`
    fn remove_item_at(&mut self, index: usize) -> Result<()>;

    /// Index of the active item, `None` when nothing is loaded
    fn cursor(&self) -> Option<usize>;

    /// Number of loaded items
    fn item_count(&self) -> usize;

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    /// Stop playback and release every loaded item
    fn stop(&mut self) -> Result<()>;

    /// Make `index` active and start it at `position_ms`
    fn seek_to(&mut self, index: usize, position_ms: u64) -> Result<()>;

    /// Engines that loop natively can honour this; the default ignores it
    fn set_repeat_mode(&mut self, _mode: RepeatMode) -> Result<()> {
        Ok(())
    }
}

/// Sink for engine callbacks
///
/// Cloneable and safe to call from any engine-owned thread. Every event is
/// queued behind the commands already submitted to the controller.
#[derive(Clone, Debug)]
pub struct EngineCallbacks {
    tx: Sender<ControlMessage>,
}

impl EngineCallbacks {
    pub(crate) fn new(tx: Sender<ControlMessage>) -> Self {
        Self { tx }
    }

    /// Forward a raw engine event
    ///
    /// Returns `false` once the controller has shut down.
    pub fn notify(&self, event: EngineEvent) -> bool {
        self.tx.send(ControlMessage::Engine(event)).is_ok()
    }

    pub fn on_transition(&self, reason: TransitionReason) -> bool {
        self.notify(EngineEvent::Transition(reason))
    }

    pub fn on_position_tick(&self, position_ms: u64, duration_ms: u64) -> bool {
        self.notify(EngineEvent::PositionTick {
            position_ms,
            duration_ms,
        })
    }

    pub fn on_state_changed(&self, state: EngineState) -> bool {
        self.notify(EngineEvent::StateChanged(state))
    }

    pub fn on_error(&self, cause: impl Into<String>) -> bool {
        self.notify(EngineEvent::Error(cause.into()))
    }
}
