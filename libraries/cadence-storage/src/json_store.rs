//! JSON file resume store
//!
//! One document per store. Saves go through a sibling temp file and a
//! rename so a crash mid-write never leaves a truncated document behind.

use crate::error::{Result, StorageError};
use cadence_playlist::{ResumeState, ResumeStateStore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current on-disk format version
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ResumeDocument {
    version: u32,
    #[serde(flatten)]
    state: ResumeState,
}

/// Resume state persisted as a JSON document
#[derive(Debug, Clone)]
pub struct JsonResumeStore {
    path: PathBuf,
}

impl JsonResumeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the state, replacing any previous document
    pub fn write(&self, state: &ResumeState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let document = ResumeDocument {
            version: FORMAT_VERSION,
            state: state.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&document)?;

        let staging = self.staging_path();
        {
            let mut file = fs::File::create(&staging)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&staging, &self.path)?;

        tracing::debug!(
            path = %self.path.display(),
            items = state.track_ids.len(),
            "Saved resume state"
        );
        Ok(())
    }

    /// Read the stored state, `None` when nothing was saved yet
    pub fn read(&self) -> Result<Option<ResumeState>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let document: ResumeDocument =
            serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        if document.version > FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: document.version,
                expected: FORMAT_VERSION,
            });
        }

        tracing::debug!(
            path = %self.path.display(),
            items = document.state.track_ids.len(),
            "Loaded resume state"
        );
        Ok(Some(document.state))
    }

    /// Remove the stored document if present
    pub fn delete(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "resume".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ResumeStateStore for JsonResumeStore {
    fn save(&self, state: &ResumeState) -> cadence_playlist::Result<()> {
        self.write(state).map_err(Into::into)
    }

    fn load(&self) -> cadence_playlist::Result<Option<ResumeState>> {
        self.read().map_err(Into::into)
    }
}
