//! Error types for playlist control

use thiserror::Error;

/// Playlist control errors
///
/// Invalid indices are not errors at the control surface: edits with
/// out-of-range arguments are dropped as no-ops. These variants cover the
/// engine boundary and the controller handle.
#[derive(Debug, Error)]
pub enum PlaylistError {
    /// The playback engine rejected a command
    #[error("Engine error: {0}")]
    Engine(String),

    /// Persisting or loading resume state failed
    #[error("Resume state error: {0}")]
    ResumeState(String),

    /// The control worker has shut down
    #[error("Playlist controller is closed")]
    ControllerClosed,

    /// The control worker thread could not be started
    #[error("Failed to start controller: {0}")]
    Spawn(#[from] std::io::Error),
}

impl<T> From<crossbeam_channel::SendError<T>> for PlaylistError {
    fn from(_: crossbeam_channel::SendError<T>) -> Self {
        PlaylistError::ControllerClosed
    }
}

impl From<crossbeam_channel::RecvError> for PlaylistError {
    fn from(_: crossbeam_channel::RecvError) -> Self {
        PlaylistError::ControllerClosed
    }
}

/// Result type for playlist operations
pub type Result<T> = std::result::Result<T, PlaylistError>;
