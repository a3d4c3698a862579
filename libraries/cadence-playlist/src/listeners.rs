//! Listener registry
//!
//! Thread-safe fan-out of [`PlayerEvent`]s to any number of subscribers.
//! Subscribers may register or unregister (including themselves) from inside
//! their own callback: dispatch iterates over a snapshot taken before the
//! first delivery. A panicking subscriber is isolated so the rest still
//! receive the event.

use crossbeam_channel::Sender;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

use crate::events::PlayerEvent;

/// Observer of playback and queue events
///
/// Subscribers match only the variants they care about.
pub trait PlaybackListener: Send + Sync {
    fn on_event(&self, event: &PlayerEvent);
}

impl<F> PlaybackListener for F
where
    F: Fn(&PlayerEvent) + Send + Sync,
{
    fn on_event(&self, event: &PlayerEvent) {
        self(event);
    }
}

/// Listener that forwards every event into a channel
///
/// Useful for UI threads that poll on their own loop.
pub struct ChannelListener {
    tx: Sender<PlayerEvent>,
}

impl ChannelListener {
    pub fn new(tx: Sender<PlayerEvent>) -> Self {
        Self { tx }
    }
}

impl PlaybackListener for ChannelListener {
    fn on_event(&self, event: &PlayerEvent) {
        // Receiver gone means the screen closed; nothing to do.
        self.tx.send(event.clone()).ok();
    }
}

/// Shared handle to a registered listener
pub type ListenerHandle = Arc<dyn PlaybackListener>;

/// Set of subscriber handles with no ordering guarantee
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Mutex<Vec<ListenerHandle>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    ///
    /// Returns `false` if this exact handle is already registered.
    pub fn add(&self, listener: ListenerHandle) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        if listeners.iter().any(|l| same_handle(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Unregister a listener
    ///
    /// Returns `false` if the handle was not registered.
    pub fn remove(&self, listener: &ListenerHandle) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|l| !same_handle(l, listener));
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an event to every listener registered at call time
    pub fn notify(&self, event: &PlayerEvent) {
        let snapshot: Vec<ListenerHandle> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for listener in snapshot {
            let result = panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(event)));
            if result.is_err() {
                warn!(?event, "Playback listener panicked during dispatch");
            }
        }
    }
}

// Compare data pointers only; vtable pointers for the same type may differ
// between codegen units.
fn same_handle(a: &ListenerHandle, b: &ListenerHandle) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a).cast::<()>(),
        Arc::as_ptr(b).cast::<()>(),
    )
}
