//! Track catalog for the shell
//!
//! The catalog is the id to track lookup used when restoring a saved
//! playlist and when the shell adds tracks by id.

use anyhow::{Context, Result};
use cadence_playlist::{Track, TrackId, TrackResolver};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    id: String,
    path: PathBuf,
    title: String,
    artist: String,
    duration_secs: u64,
}

impl From<CatalogEntry> for Track {
    fn from(entry: CatalogEntry) -> Self {
        Track::new(
            entry.id,
            entry.path,
            entry.title,
            entry.artist,
            Duration::from_secs(entry.duration_secs),
        )
    }
}

/// Ordered track list with id lookup
#[derive(Debug, Clone)]
pub struct Catalog {
    tracks: Vec<Track>,
    by_id: HashMap<TrackId, Track>,
}

impl Catalog {
    pub fn new(tracks: Vec<Track>) -> Self {
        let by_id = tracks.iter().map(|t| (t.id.clone(), t.clone())).collect();
        Self { tracks, by_id }
    }

    /// Read a JSON array of `{id, path, title, artist, duration_secs}`
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        Self::from_json(&bytes).with_context(|| format!("Invalid catalog {}", path.display()))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let entries: Vec<CatalogEntry> = serde_json::from_slice(bytes)?;
        Ok(Self::new(entries.into_iter().map(Track::from).collect()))
    }

    /// A small built-in library spread over four artists
    pub fn demo() -> Self {
        let albums = [
            ("Low Tide", ["Harbour", "Salt Air", "Breakwater", "Undertow"]),
            ("Marrow", ["Kiln", "Soft Iron", "Ash Road", "Ember"]),
            ("The Vantage", ["Northbound", "Glass Hours", "Static", "Relay"]),
            ("Orla Finch", ["Paper Moon", "Lanterns", "Still Water", "Homeward"]),
        ];

        let tracks = albums
            .iter()
            .enumerate()
            .flat_map(|(a, (artist, titles))| {
                titles.iter().enumerate().map(move |(t, title)| {
                    let id = format!("{}{}", (b'a' + a as u8) as char, t + 1);
                    Track::new(
                        id.clone(),
                        format!("/music/{}/{}.flac", artist, title),
                        *title,
                        *artist,
                        Duration::from_secs(150 + 20 * t as u64),
                    )
                })
            })
            .collect();
        Self::new(tracks)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get(&self, id: &str) -> Option<&Track> {
        self.by_id.get(&TrackId::from(id))
    }
}

impl TrackResolver for Catalog {
    fn resolve(&self, id: &TrackId) -> Option<Track> {
        self.by_id.get(id).cloned()
    }
}
