//! Playlist controller - the playlist-control actor
//!
//! Runs a [`PlaylistSession`] on a dedicated worker thread. UI commands and
//! engine callbacks share one unbounded mailbox, so every mutation is applied
//! in submission order by a single writer. Runs of queued position ticks may
//! be collapsed to the latest one; nothing else is ever reordered or dropped.
//!
//! Listeners are called on a second thread fed by the worker in emission
//! order. A listener can therefore query or command the controller from
//! inside its callback without waiting on the thread that is calling it.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::ops::{ControlFlow, Deref};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, info, trace};

use crate::{
    engine::{EngineCallbacks, PlaybackEngine},
    error::Result,
    events::{EngineEvent, PlayerEvent},
    listeners::{ListenerHandle, ListenerRegistry, PlaybackListener},
    resume::{ResumeState, ResumeStateStore, RestoredPlaylist, TrackResolver},
    session::PlaylistSession,
    types::{ControllerConfig, RepeatMode, ShuffleMode, Track, TrackId},
    window::{WindowBounds, WindowState},
};

/// Commands sent to the control thread
#[derive(Debug, Clone)]
pub enum PlaylistCommand {
    /// Replace the playlist and start at an index
    SetPlaylist {
        tracks: Vec<Track>,
        start_index: usize,
    },

    /// Jump to a logical index
    PlayAt(usize),

    /// Insert after the current song
    InsertNext(Vec<Track>),

    /// Add to the end of the playlist
    Append(Vec<Track>),

    /// Remove one entry
    RemoveAt(usize),

    /// Remove every entry with one of these ids
    RemoveByIds(Vec<TrackId>),

    /// Drag an entry to a new position
    Reorder { from: usize, to: usize },

    /// Start or resume playback
    Play,

    /// Pause playback
    Pause,

    /// Skip to the next entry
    Next,

    /// Go back one entry
    Previous,

    /// Seek within the current song (in milliseconds)
    Seek(u64),

    /// Empty the playlist
    Clear,

    /// Set repeat mode
    SetRepeat(RepeatMode),

    /// Set shuffle mode
    SetShuffle(ShuffleMode),

    /// Load a playlist resolved from resume state
    Restore(RestoredPlaylist),
}

/// Read-only questions answered by the control thread
pub(crate) enum Query {
    FullPlaylist(Sender<Vec<Track>>),
    CurrentIndex(Sender<Option<usize>>),
    CurrentTrack(Sender<Option<Track>>),
    Window(Sender<Option<WindowBounds>>),
    State(Sender<WindowState>),
    Position(Sender<u64>),
    /// Answered once the mailbox has drained; with `flush_events` only after
    /// listeners have seen every event emitted so far
    Idle {
        reply: Sender<()>,
        flush_events: bool,
    },
}

/// Everything the control thread receives
pub(crate) enum ControlMessage {
    Command(PlaylistCommand),
    Engine(EngineEvent),
    Query(Query),
    Shutdown,
}

impl ControlMessage {
    fn is_position_tick(&self) -> bool {
        matches!(self, ControlMessage::Engine(event) if event.is_position_tick())
    }
}

/// Messages for the listener thread
enum Dispatch {
    Event(PlayerEvent),
    Flush(Sender<()>),
}

/// Session-side listener that hands events to the listener thread
struct Forwarder {
    tx: Sender<Dispatch>,
}

impl PlaybackListener for Forwarder {
    fn on_event(&self, event: &PlayerEvent) {
        self.tx.send(Dispatch::Event(event.clone())).ok();
    }
}

fn dispatch_events(rx: Receiver<Dispatch>, listeners: Arc<ListenerRegistry>) {
    for message in rx {
        match message {
            Dispatch::Event(event) => listeners.notify(&event),
            Dispatch::Flush(reply) => {
                reply.send(()).ok();
            }
        }
    }
    debug!("Listener dispatch stopped");
}

/// Owner of the control thread
///
/// Dropping the controller stops the thread after the messages already
/// queued have been applied. Handles obtained from it keep working until
/// then and report [`PlaylistError::ControllerClosed`](crate::PlaylistError)
/// afterwards.
pub struct PlaylistController {
    handle: ControllerHandle,
    worker: Option<JoinHandle<()>>,
    dispatcher: Option<JoinHandle<()>>,
}

impl PlaylistController {
    /// Start the control thread
    ///
    /// `make_engine` receives the callback sink the engine must report into
    /// and runs on the calling thread.
    pub fn spawn<E, F>(
        config: ControllerConfig,
        store: Box<dyn ResumeStateStore>,
        make_engine: F,
    ) -> Result<Self>
    where
        E: PlaybackEngine + 'static,
        F: FnOnce(EngineCallbacks) -> E,
    {
        let (tx, rx) = unbounded();
        let (events_tx, events_rx) = unbounded();
        let listeners = Arc::new(ListenerRegistry::new());

        let dispatcher = {
            let listeners = Arc::clone(&listeners);
            thread::Builder::new()
                .name("playlist-events".into())
                .spawn(move || dispatch_events(events_rx, listeners))?
        };
        let dispatcher_thread = dispatcher.thread().id();

        let forward = Arc::new(ListenerRegistry::new());
        forward.add(Arc::new(Forwarder {
            tx: events_tx.clone(),
        }));

        let engine = make_engine(EngineCallbacks::new(tx.clone()));
        let coalesce_ticks = config.tick_coalescing;
        let session = PlaylistSession::new(engine, forward, store, config);

        let worker = thread::Builder::new()
            .name("playlist-control".into())
            .spawn(move || {
                Worker {
                    session,
                    rx,
                    events: events_tx,
                    pending: None,
                    coalesce_ticks,
                }
                .run()
            })?;

        info!("Playlist controller started");
        Ok(Self {
            handle: ControllerHandle {
                tx,
                listeners,
                dispatcher_thread,
            },
            worker: Some(worker),
            dispatcher: Some(dispatcher),
        })
    }

    pub fn handle(&self) -> ControllerHandle {
        self.handle.clone()
    }

    /// Stop the control thread and wait for it to finish
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.handle.tx.send(ControlMessage::Shutdown).ok();
        if worker.join().is_err() {
            tracing::error!("Playlist control thread panicked");
        }

        // The worker held the last event sender, so dispatch ends after the
        // events it already emitted.
        if let Some(dispatcher) = self.dispatcher.take() {
            if dispatcher.thread().id() == thread::current().id() {
                return;
            }
            if dispatcher.join().is_err() {
                tracing::error!("Listener dispatch thread panicked");
            }
        }
    }
}

impl Deref for PlaylistController {
    type Target = ControllerHandle;

    fn deref(&self) -> &ControllerHandle {
        &self.handle
    }
}

impl Drop for PlaylistController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Cloneable handle for submitting commands and queries from any thread
#[derive(Clone)]
pub struct ControllerHandle {
    tx: Sender<ControlMessage>,
    listeners: Arc<ListenerRegistry>,
    dispatcher_thread: ThreadId,
}

impl ControllerHandle {
    /// Queue a command behind everything already submitted
    pub fn send_command(&self, command: PlaylistCommand) -> Result<()> {
        self.tx.send(ControlMessage::Command(command))?;
        Ok(())
    }

    fn ask<T>(&self, query: impl FnOnce(Sender<T>) -> Query) -> Result<T> {
        let (reply_tx, reply_rx) = bounded(1);
        self.tx.send(ControlMessage::Query(query(reply_tx)))?;
        Ok(reply_rx.recv()?)
    }

    // ===== Playlist Control =====

    pub fn set_playlist(&self, tracks: Vec<Track>, start_index: usize) -> Result<()> {
        self.send_command(PlaylistCommand::SetPlaylist {
            tracks,
            start_index,
        })
    }

    pub fn play_at(&self, index: usize) -> Result<()> {
        self.send_command(PlaylistCommand::PlayAt(index))
    }

    pub fn insert_next(&self, tracks: Vec<Track>) -> Result<()> {
        self.send_command(PlaylistCommand::InsertNext(tracks))
    }

    pub fn append(&self, tracks: Vec<Track>) -> Result<()> {
        self.send_command(PlaylistCommand::Append(tracks))
    }

    pub fn remove_at(&self, index: usize) -> Result<()> {
        self.send_command(PlaylistCommand::RemoveAt(index))
    }

    pub fn remove_by_ids(&self, ids: Vec<TrackId>) -> Result<()> {
        self.send_command(PlaylistCommand::RemoveByIds(ids))
    }

    pub fn reorder(&self, from: usize, to: usize) -> Result<()> {
        self.send_command(PlaylistCommand::Reorder { from, to })
    }

    pub fn clear(&self) -> Result<()> {
        self.send_command(PlaylistCommand::Clear)
    }

    /// Resolve persisted state against the catalog and load it, paused
    ///
    /// Resolution runs on the calling thread.
    pub fn restore(&self, state: &ResumeState, resolver: &dyn TrackResolver) -> Result<()> {
        match state.resolve(resolver) {
            Some(restored) => self.send_command(PlaylistCommand::Restore(restored)),
            None => {
                debug!(saved = state.track_ids.len(), "No saved track resolved");
                Ok(())
            }
        }
    }

    // ===== Transport =====

    pub fn play(&self) -> Result<()> {
        self.send_command(PlaylistCommand::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.send_command(PlaylistCommand::Pause)
    }

    pub fn next(&self) -> Result<()> {
        self.send_command(PlaylistCommand::Next)
    }

    pub fn previous(&self) -> Result<()> {
        self.send_command(PlaylistCommand::Previous)
    }

    pub fn seek(&self, position_ms: u64) -> Result<()> {
        self.send_command(PlaylistCommand::Seek(position_ms))
    }

    pub fn set_repeat(&self, mode: RepeatMode) -> Result<()> {
        self.send_command(PlaylistCommand::SetRepeat(mode))
    }

    pub fn set_shuffle(&self, mode: ShuffleMode) -> Result<()> {
        self.send_command(PlaylistCommand::SetShuffle(mode))
    }

    // ===== Queries =====

    pub fn get_full_playlist(&self) -> Result<Vec<Track>> {
        self.ask(Query::FullPlaylist)
    }

    pub fn get_current_index(&self) -> Result<Option<usize>> {
        self.ask(Query::CurrentIndex)
    }

    pub fn get_current_track(&self) -> Result<Option<Track>> {
        self.ask(Query::CurrentTrack)
    }

    pub fn window(&self) -> Result<Option<WindowBounds>> {
        self.ask(Query::Window)
    }

    pub fn state(&self) -> Result<WindowState> {
        self.ask(Query::State)
    }

    pub fn get_position_ms(&self) -> Result<u64> {
        self.ask(Query::Position)
    }

    /// Block until every queued message, including engine callbacks those
    /// messages triggered, has been applied and its events delivered
    ///
    /// Called from inside a listener it only waits for the mailbox, since
    /// the listener itself is holding up event delivery.
    pub fn wait_idle(&self) -> Result<()> {
        let flush_events = thread::current().id() != self.dispatcher_thread;
        self.ask(|reply| Query::Idle {
            reply,
            flush_events,
        })
    }

    // ===== Listeners =====

    /// Register a listener; `false` if it was already registered
    pub fn add_listener(&self, listener: ListenerHandle) -> bool {
        self.listeners.add(listener)
    }

    /// Unregister a listener; `false` if it was not registered
    pub fn remove_listener(&self, listener: &ListenerHandle) -> bool {
        self.listeners.remove(listener)
    }
}

struct Worker<E> {
    session: PlaylistSession<E>,
    rx: Receiver<ControlMessage>,
    events: Sender<Dispatch>,
    /// A message read ahead while collapsing ticks
    pending: Option<ControlMessage>,
    coalesce_ticks: bool,
}

impl<E: PlaybackEngine> Worker<E> {
    fn run(mut self) {
        while let Some(message) = self.next_message(true) {
            if self.dispatch(message).is_break() {
                break;
            }
        }
        info!("Playlist controller stopped");
    }

    fn next_message(&mut self, block: bool) -> Option<ControlMessage> {
        let first = match self.pending.take() {
            Some(message) => message,
            None if block => self.rx.recv().ok()?,
            None => self.rx.try_recv().ok()?,
        };
        if !self.coalesce_ticks || !first.is_position_tick() {
            return Some(first);
        }

        let mut latest = first;
        let mut dropped = 0usize;
        while let Ok(message) = self.rx.try_recv() {
            if message.is_position_tick() {
                latest = message;
                dropped += 1;
            } else {
                self.pending = Some(message);
                break;
            }
        }
        if dropped > 0 {
            trace!(dropped, "Coalesced position ticks");
        }
        Some(latest)
    }

    fn dispatch(&mut self, message: ControlMessage) -> ControlFlow<()> {
        match message {
            ControlMessage::Command(command) => self.apply(command),
            ControlMessage::Engine(event) => self.session.handle_engine_event(event),
            ControlMessage::Query(Query::Idle {
                reply,
                flush_events,
            }) => {
                let flow = self.drain();
                if flush_events {
                    self.events.send(Dispatch::Flush(reply)).ok();
                } else {
                    reply.send(()).ok();
                }
                return flow;
            }
            ControlMessage::Query(query) => self.answer(query),
            ControlMessage::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn drain(&mut self) -> ControlFlow<()> {
        while let Some(message) = self.next_message(false) {
            self.dispatch(message)?;
        }
        ControlFlow::Continue(())
    }

    fn apply(&mut self, command: PlaylistCommand) {
        let session = &mut self.session;
        match command {
            PlaylistCommand::SetPlaylist {
                tracks,
                start_index,
            } => session.set_playlist(tracks, start_index),
            PlaylistCommand::PlayAt(index) => session.play_at(index),
            PlaylistCommand::InsertNext(tracks) => session.insert_next(tracks),
            PlaylistCommand::Append(tracks) => session.append(tracks),
            PlaylistCommand::RemoveAt(index) => session.remove_at(index),
            PlaylistCommand::RemoveByIds(ids) => session.remove_by_ids(&ids),
            PlaylistCommand::Reorder { from, to } => session.reorder(from, to),
            PlaylistCommand::Play => session.play(),
            PlaylistCommand::Pause => session.pause(),
            PlaylistCommand::Next => session.next(),
            PlaylistCommand::Previous => session.previous(),
            PlaylistCommand::Seek(position_ms) => session.seek(position_ms),
            PlaylistCommand::Clear => session.clear(),
            PlaylistCommand::SetRepeat(mode) => session.set_repeat(mode),
            PlaylistCommand::SetShuffle(mode) => session.set_shuffle(mode),
            PlaylistCommand::Restore(restored) => session.apply_restored(restored),
        }
    }

    fn answer(&self, query: Query) {
        // A dropped reply receiver means the caller gave up waiting.
        let session = &self.session;
        match query {
            Query::FullPlaylist(reply) => {
                reply.send(session.get_full_playlist().to_vec()).ok();
            }
            Query::CurrentIndex(reply) => {
                reply.send(session.get_current_index()).ok();
            }
            Query::CurrentTrack(reply) => {
                reply.send(session.get_current_track().cloned()).ok();
            }
            Query::Window(reply) => {
                reply.send(session.window()).ok();
            }
            Query::State(reply) => {
                reply.send(session.window_state()).ok();
            }
            Query::Position(reply) => {
                reply.send(session.get_position_ms()).ok();
            }
            Query::Idle { reply, .. } => {
                reply.send(()).ok();
            }
        }
    }
}
