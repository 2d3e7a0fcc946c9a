//! Error types for the browser bridge

use thiserror::Error;

/// Errors surfaced by browser lifecycle and page operations.
#[derive(Debug, Error, Clone)]
pub enum BridgeError {
    /// Browser configuration could not be assembled
    #[error("invalid browser config: {0}")]
    Config(String),

    /// Browser process failed to start or connect
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// CDP communication or protocol error
    #[error("CDP I/O error: {0}")]
    CdpIo(String),

    /// JavaScript evaluation failed or returned an unexpected shape
    #[error("evaluation failed: {0}")]
    Eval(String),

    /// The handle was already closed
    #[error("browser already closed")]
    Closed,
}

impl From<chromiumoxide::error::CdpError> for BridgeError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        BridgeError::CdpIo(err.to_string())
    }
}
