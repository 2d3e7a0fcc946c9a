//! Error types for session capture and replay

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by snapshot persistence and cookie replay.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No snapshot exists at the configured path; restore cannot proceed
    #[error("session snapshot not found at {path}")]
    SnapshotMissing { path: PathBuf },

    /// The snapshot file exists but cannot be decoded
    #[error("session snapshot at {path} is corrupt: {detail}")]
    SnapshotCorrupt { path: PathBuf, detail: String },

    /// Filesystem failure outside of the missing-file case
    #[error("snapshot i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// CDP communication error while reading or writing cookies
    #[error("CDP I/O error: {0}")]
    CdpIo(String),
}

impl From<chromiumoxide::error::CdpError> for SessionError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        SessionError::CdpIo(err.to_string())
    }
}
