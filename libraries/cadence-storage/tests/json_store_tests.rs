//! Integration tests for the JSON resume store
//!
//! Tests on-disk behavior including:
//! - Save/load roundtrip through the store trait
//! - Missing files and missing parent directories
//! - Corrupt and future-version documents
//! - Overwrites leaving no staging file behind

use cadence_playlist::{PlaylistError, ResumeState, ResumeStateStore};
use cadence_storage::{JsonResumeStore, StorageError};
use std::fs;
use tempfile::TempDir;

fn state(ids: &[&str], current: Option<usize>, position_ms: u64) -> ResumeState {
    ResumeState {
        track_ids: ids.iter().map(|id| (*id).into()).collect(),
        current_index: current,
        position_ms,
    }
}

// ============================================================================
// Roundtrip
// ============================================================================

#[test]
fn test_save_and_load_roundtrip() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = JsonResumeStore::new(dir.path().join("resume.json"));

    let saved = state(&["s1", "s2", "s3"], Some(2), 91_500);
    store.save(&saved).expect("Failed to save");

    let loaded = store.load().expect("Failed to load");
    assert_eq!(loaded, Some(saved));
}

#[test]
fn test_empty_playlist_roundtrip() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = JsonResumeStore::new(dir.path().join("resume.json"));

    store.save(&ResumeState::default()).expect("Failed to save");

    let loaded = store.load().expect("Failed to load").expect("State missing");
    assert!(loaded.track_ids.is_empty());
    assert_eq!(loaded.current_index, None);
}

#[test]
fn test_duplicate_ids_survive() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = JsonResumeStore::new(dir.path().join("resume.json"));

    let saved = state(&["s1", "s2", "s1"], Some(2), 0);
    store.save(&saved).expect("Failed to save");

    assert_eq!(store.load().expect("Failed to load"), Some(saved));
}

#[test]
fn test_later_save_replaces_earlier() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("resume.json");
    let store = JsonResumeStore::new(&path);

    store.save(&state(&["a", "b"], Some(0), 10)).expect("Failed to save");
    store.save(&state(&["c"], Some(0), 20)).expect("Failed to save");

    let loaded = store.load().expect("Failed to load").expect("State missing");
    assert_eq!(loaded.track_ids, vec!["c".into()]);
    assert_eq!(loaded.position_ms, 20);

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .expect("Failed to list dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("resume.json")]);
}

// ============================================================================
// Missing Data
// ============================================================================

#[test]
fn test_load_missing_file_is_none() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = JsonResumeStore::new(dir.path().join("never-written.json"));

    assert_eq!(store.load().expect("Failed to load"), None);
}

#[test]
fn test_save_creates_parent_directories() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("nested").join("deeper").join("resume.json");
    let store = JsonResumeStore::new(&path);

    store.save(&state(&["s1"], Some(0), 0)).expect("Failed to save");

    assert!(path.exists());
}

#[test]
fn test_delete_then_load() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = JsonResumeStore::new(dir.path().join("resume.json"));

    store.save(&state(&["s1"], Some(0), 0)).expect("Failed to save");
    store.delete().expect("Failed to delete");
    store.delete().expect("Deleting twice should be fine");

    assert_eq!(store.load().expect("Failed to load"), None);
}

// ============================================================================
// Error Paths
// ============================================================================

#[test]
fn test_corrupt_document_is_reported() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("resume.json");
    fs::write(&path, b"{ not json").expect("Failed to write");

    let store = JsonResumeStore::new(&path);

    match store.read() {
        Err(StorageError::Corrupt { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("Expected corrupt document error, got {:?}", other),
    }

    // Through the store trait the failure becomes a resume state error
    assert!(matches!(store.load(), Err(PlaylistError::ResumeState(_))));
}

#[test]
fn test_future_version_is_rejected() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("resume.json");
    fs::write(
        &path,
        br#"{"version": 99, "track_ids": [], "current_index": null, "position_ms": 0}"#,
    )
    .expect("Failed to write");

    let store = JsonResumeStore::new(&path);

    assert!(matches!(
        store.read(),
        Err(StorageError::UnsupportedVersion { found: 99, .. })
    ));
}

#[test]
fn test_save_into_file_path_fails() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"").expect("Failed to write");

    // The parent "directory" is a regular file
    let store = JsonResumeStore::new(blocker.join("resume.json"));

    assert!(matches!(
        store.save(&state(&["s1"], Some(0), 0)),
        Err(PlaylistError::ResumeState(_))
    ));
}
