//! Controller tests
//!
//! Exercise the control thread: ordering of submitted commands, engine
//! callbacks arriving from other threads, position tick coalescing, listener
//! management and resume state persistence through a mocked store.

use cadence_playlist::{
    ChannelListener, ControllerConfig, ListenerHandle, MemoryEngine, MemoryResumeStore,
    PlayerEvent, PlaylistController, PlaylistError, ResumeState, ResumeStateStore, Track,
    TrackId, WindowBounds, WindowState,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use mockall::mock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

mock! {
    pub Store {}

    impl ResumeStateStore for Store {
        fn save(&self, state: &ResumeState) -> cadence_playlist::Result<()>;
        fn load(&self) -> cadence_playlist::Result<Option<ResumeState>>;
    }
}

// ===== Helpers =====

fn track(id: &str) -> Track {
    Track::new(id, format!("/music/{}.flac", id), id, "Artist", Duration::from_secs(240))
}

fn numbered(prefix: &str, count: usize) -> Vec<Track> {
    (0..count).map(|i| track(&format!("{}{}", prefix, i))).collect()
}

fn five() -> Vec<Track> {
    ["s1", "s2", "s3", "s4", "s5"].iter().map(|id| track(id)).collect()
}

fn spawn_with(
    config: ControllerConfig,
    store: Box<dyn ResumeStateStore>,
) -> (PlaylistController, MemoryEngine, Receiver<PlayerEvent>) {
    let engine = MemoryEngine::new();
    let controller = PlaylistController::spawn(config, store, |callbacks| engine.attach(callbacks))
        .expect("controller should start");

    let (tx, rx) = unbounded();
    controller.add_listener(Arc::new(ChannelListener::new(tx)));
    (controller, engine, rx)
}

fn spawn() -> (PlaylistController, MemoryEngine, Receiver<PlayerEvent>) {
    spawn_with(
        ControllerConfig::default(),
        Box::new(MemoryResumeStore::new()),
    )
}

fn ids(tracks: &[Track]) -> Vec<String> {
    tracks.iter().map(|t| t.id.to_string()).collect()
}

/// Mock store that forwards every saved state into a channel
fn recording_store() -> (MockStore, Receiver<ResumeState>) {
    let (tx, rx): (Sender<ResumeState>, Receiver<ResumeState>) = unbounded();
    let mut store = MockStore::new();
    store.expect_save().returning(move |state| {
        tx.send(state.clone()).ok();
        Ok(())
    });
    store.expect_load().never();
    (store, rx)
}

// ===== Scenarios Through the Actor =====

#[test]
fn controller_runs_window_scenarios() {
    let (controller, engine, _events) = spawn();

    controller.set_playlist(five(), 2).unwrap();
    controller.wait_idle().unwrap();
    assert_eq!(controller.window().unwrap(), Some(WindowBounds { start: 1, end: 3 }));
    assert_eq!(controller.state().unwrap(), WindowState::WindowLoaded);

    engine.finish_current();
    controller.wait_idle().unwrap();
    assert_eq!(controller.get_current_index().unwrap(), Some(3));
    assert_eq!(controller.window().unwrap(), Some(WindowBounds { start: 2, end: 4 }));

    controller.insert_next(vec![track("x"), track("y")]).unwrap();
    controller.wait_idle().unwrap();
    assert_eq!(
        ids(&controller.get_full_playlist().unwrap()),
        ["s1", "s2", "s3", "s4", "x", "y", "s5"]
    );
    assert_eq!(
        controller.get_current_track().unwrap().map(|t| t.id),
        Some(TrackId::from("s4"))
    );
    let loaded: Vec<String> = engine.item_ids().into_iter().map(|id| id.0).collect();
    assert_eq!(loaded, ["s3", "s4", "x"]);
}

#[test]
fn song_changes_are_published_in_playback_order() {
    let (controller, engine, events) = spawn();

    controller.set_playlist(five(), 0).unwrap();
    controller.wait_idle().unwrap();
    for _ in 0..4 {
        engine.finish_current();
        controller.wait_idle().unwrap();
    }

    let songs: Vec<String> = events
        .try_iter()
        .filter_map(|event| match event {
            PlayerEvent::SongChanged(track) => Some(track.id.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(songs, ["s1", "s2", "s3", "s4", "s5"]);
}

// ===== Ordering =====

#[test]
fn reorders_apply_in_submission_order() {
    let (controller, _engine, _events) = spawn();
    let tracks = numbered("t", 8);
    controller.set_playlist(tracks.clone(), 0).unwrap();

    let moves = [(0, 7), (3, 1), (7, 0), (2, 5), (5, 2), (6, 3)];
    let mut expected = tracks;
    for &(from, to) in &moves {
        controller.reorder(from, to).unwrap();
        let moved = expected.remove(from);
        expected.insert(to, moved);
    }
    controller.wait_idle().unwrap();

    assert_eq!(ids(&controller.get_full_playlist().unwrap()), ids(&expected));
    assert_eq!(
        controller.get_current_track().unwrap().map(|t| t.id),
        Some(TrackId::from("t0"))
    );
}

#[test]
fn concurrent_submitters_never_lose_edits() {
    let (controller, engine, _events) = spawn();
    controller.set_playlist(numbered("base", 3), 1).unwrap();

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let handle = controller.handle();
            thread::spawn(move || {
                for i in 0..25 {
                    handle
                        .append(vec![track(&format!("w{}-{}", worker, i))])
                        .unwrap();
                }
            })
        })
        .collect();
    let ticker = {
        let engine = engine.clone();
        thread::spawn(move || {
            for position in 0..200 {
                engine.tick(position * 10);
            }
        })
    };
    for worker in workers {
        worker.join().unwrap();
    }
    ticker.join().unwrap();
    controller.wait_idle().unwrap();

    let playlist = controller.get_full_playlist().unwrap();
    assert_eq!(playlist.len(), 103);
    assert_eq!(controller.get_current_index().unwrap(), Some(1));
    assert_eq!(controller.window().unwrap(), Some(WindowBounds { start: 0, end: 2 }));

    // Each submitter's own appends keep their relative order
    for worker in 0..4 {
        let prefix = format!("w{}-", worker);
        let mine: Vec<String> = ids(&playlist)
            .into_iter()
            .filter(|id| id.starts_with(&prefix))
            .collect();
        let expected: Vec<String> = (0..25).map(|i| format!("{}{}", prefix, i)).collect();
        assert_eq!(mine, expected);
    }
}

// ===== Position Tick Coalescing =====

/// Store whose next save blocks the control thread until released
struct GatedStore {
    armed: AtomicBool,
    entered: Sender<()>,
    release: Receiver<()>,
}

impl ResumeStateStore for GatedStore {
    fn save(&self, _state: &ResumeState) -> cadence_playlist::Result<()> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.send(()).ok();
            self.release.recv().ok();
        }
        Ok(())
    }

    fn load(&self) -> cadence_playlist::Result<Option<ResumeState>> {
        Ok(None)
    }
}

/// Piles up ticks while the control thread is stuck in a save
fn burst_of_ticks(config: ControllerConfig) -> Vec<u64> {
    let (entered_tx, entered_rx) = unbounded();
    let (release_tx, release_rx) = unbounded();
    let store = Arc::new(GatedStore {
        armed: AtomicBool::new(false),
        entered: entered_tx,
        release: release_rx,
    });
    let (controller, engine, events) = spawn_with(config, Box::new(Arc::clone(&store)));
    controller.set_playlist(five(), 0).unwrap();
    controller.wait_idle().unwrap();
    events.try_iter().count();

    store.armed.store(true, Ordering::SeqCst);
    controller.append(vec![track("late")]).unwrap();
    entered_rx.recv().unwrap();
    for position in 1..=100 {
        engine.tick(position);
    }
    release_tx.send(()).unwrap();
    controller.wait_idle().unwrap();

    events
        .try_iter()
        .filter_map(|event| match event {
            PlayerEvent::PositionChanged { position_ms, .. } => Some(position_ms),
            _ => None,
        })
        .collect()
}

#[test]
fn queued_position_ticks_collapse_to_latest() {
    let seen = burst_of_ticks(ControllerConfig::default());
    assert_eq!(seen, [100]);
}

#[test]
fn tick_coalescing_can_be_disabled() {
    let config = ControllerConfig {
        tick_coalescing: false,
        ..ControllerConfig::default()
    };
    let seen = burst_of_ticks(config);
    assert_eq!(seen, (1..=100).collect::<Vec<u64>>());
}

#[test]
fn transitions_between_ticks_are_never_dropped() {
    let (controller, engine, events) = spawn();
    controller.set_playlist(five(), 0).unwrap();
    controller.wait_idle().unwrap();
    events.try_iter().count();

    engine.tick(100);
    engine.tick(200);
    engine.finish_current();
    engine.tick(300);
    engine.tick(400);
    controller.wait_idle().unwrap();

    let received: Vec<PlayerEvent> = events.try_iter().collect();
    assert!(received
        .iter()
        .any(|event| matches!(event, PlayerEvent::SongChanged(track) if track.id.as_str() == "s2")));
    assert_eq!(
        received.last(),
        Some(&PlayerEvent::PositionChanged {
            position_ms: 400,
            duration_ms: 240_000
        })
    );
    assert_eq!(controller.get_current_index().unwrap(), Some(1));
}

// ===== Listeners =====

#[test]
fn listener_registration_through_handle() {
    let (controller, _engine, _events) = spawn();
    let (tx, rx) = unbounded();
    let listener: ListenerHandle = Arc::new(ChannelListener::new(tx));

    assert!(controller.add_listener(Arc::clone(&listener)));
    assert!(!controller.add_listener(Arc::clone(&listener)));

    controller.set_playlist(five(), 0).unwrap();
    controller.wait_idle().unwrap();
    assert!(rx.try_iter().count() > 0);

    assert!(controller.remove_listener(&listener));
    assert!(!controller.remove_listener(&listener));

    controller.next().unwrap();
    controller.wait_idle().unwrap();
    assert_eq!(rx.try_iter().count(), 0);
}

#[test]
fn listener_can_query_the_controller_it_listens_to() {
    let (controller, _engine, _events) = spawn();
    let handle = controller.handle();
    let seen: Arc<Mutex<Vec<(Vec<String>, Option<usize>)>>> = Arc::default();

    let sink = Arc::clone(&seen);
    controller.add_listener(Arc::new(move |event: &PlayerEvent| {
        if matches!(event, PlayerEvent::SongChanged(_)) {
            let playlist = handle.get_full_playlist().unwrap();
            let current = handle.get_current_index().unwrap();
            handle.wait_idle().unwrap();
            sink.lock().unwrap().push((ids(&playlist), current));
        }
    }));

    controller.set_playlist(vec![track("a"), track("b")], 0).unwrap();
    controller.wait_idle().unwrap();
    controller.next().unwrap();
    controller.wait_idle().unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, ["a", "b"]);
    assert_eq!(seen[1].1, Some(1));

    // Queries from other threads still get answers
    assert_eq!(controller.get_current_index().unwrap(), Some(1));
    controller.shutdown();
}

#[test]
fn panicking_listener_does_not_stop_the_controller() {
    let (controller, _engine, events) = spawn();
    controller.add_listener(Arc::new(|event: &PlayerEvent| {
        if matches!(event, PlayerEvent::SongChanged(_)) {
            panic!("screen crashed");
        }
    }));

    controller.set_playlist(five(), 0).unwrap();
    controller.wait_idle().unwrap();

    assert_eq!(controller.get_current_index().unwrap(), Some(0));
    assert!(events
        .try_iter()
        .any(|event| matches!(event, PlayerEvent::SongChanged(_))));
}

// ===== Resume State =====

#[test]
fn structural_edits_and_resyncs_are_saved() {
    let (store, saved) = recording_store();
    let (controller, engine, _events) = spawn_with(ControllerConfig::default(), Box::new(store));

    controller.set_playlist(five(), 2).unwrap();
    controller.reorder(0, 4).unwrap();
    controller.wait_idle().unwrap();
    engine.tick(15_000);
    engine.finish_current();
    controller.wait_idle().unwrap();
    controller.shutdown();

    let states: Vec<ResumeState> = saved.try_iter().collect();
    assert_eq!(states.len(), 3);

    let ids: Vec<&str> = states[1].track_ids.iter().map(TrackId::as_str).collect();
    assert_eq!(ids, ["s2", "s3", "s4", "s5", "s1"]);
    assert_eq!(states[1].current_index, Some(1));
    assert_eq!(states[2].current_index, Some(2));
}

#[test]
fn invalid_edits_are_not_saved() {
    let (store, saved) = recording_store();
    let (controller, _engine, _events) = spawn_with(ControllerConfig::default(), Box::new(store));

    controller.set_playlist(five(), 0).unwrap();
    controller.remove_at(17).unwrap();
    controller.reorder(9, 0).unwrap();
    controller.play_at(5).unwrap();
    controller.set_playlist(Vec::new(), 0).unwrap();
    controller.wait_idle().unwrap();
    controller.shutdown();

    assert_eq!(saved.try_iter().count(), 1);
}

#[test]
fn failing_store_is_reported_to_listeners() {
    let mut store = MockStore::new();
    store
        .expect_save()
        .returning(|_| Err(PlaylistError::ResumeState("disk full".to_string())));
    let (controller, _engine, events) = spawn_with(ControllerConfig::default(), Box::new(store));

    controller.set_playlist(five(), 0).unwrap();
    controller.wait_idle().unwrap();

    assert_eq!(controller.get_full_playlist().unwrap().len(), 5);
    assert!(events.try_iter().any(
        |event| matches!(event, PlayerEvent::Error { message } if message.contains("disk full"))
    ));
}

#[test]
fn restore_resolves_on_caller_and_does_not_save() {
    let (store, saved) = recording_store();
    let (controller, engine, _events) = spawn_with(ControllerConfig::default(), Box::new(store));
    let catalog = five();
    let state = ResumeState {
        track_ids: ["s1", "s2", "missing", "s4"].iter().map(|id| TrackId::from(*id)).collect(),
        current_index: Some(3),
        position_ms: 61_000,
    };

    controller.restore(&state, &catalog).unwrap();
    controller.wait_idle().unwrap();

    assert_eq!(controller.get_current_index().unwrap(), Some(2));
    assert_eq!(controller.get_position_ms().unwrap(), 61_000);
    assert_eq!(engine.position_ms(), 61_000);
    controller.shutdown();
    assert_eq!(saved.try_iter().count(), 0);
}

// ===== Lifecycle =====

#[test]
fn handles_fail_after_shutdown() {
    let (controller, _engine, _events) = spawn();
    let handle = controller.handle();

    controller.shutdown();

    assert!(matches!(handle.play(), Err(PlaylistError::ControllerClosed)));
    assert!(matches!(
        handle.get_current_index(),
        Err(PlaylistError::ControllerClosed)
    ));
}
