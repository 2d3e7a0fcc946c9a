//! Error types for element actuation

use thiserror::Error;

/// Failures below the [`crate::Actuator::act`] boundary. `act` itself folds
/// these into outcomes; they escape only from the lower-level helpers such
/// as [`crate::locator::locate`] and [`crate::typing::type_slowly`].
#[derive(Debug, Error, Clone)]
pub enum ActuationError {
    /// Element did not appear within the polling deadline
    #[error("element '{element_id}' not found after {waited_ms}ms")]
    NotFound { element_id: String, waited_ms: u64 },

    /// CDP communication or protocol error
    #[error("CDP I/O error: {0}")]
    CdpIo(String),

    /// JavaScript evaluation failed or returned an unexpected shape
    #[error("evaluation failed: {0}")]
    Eval(String),
}

impl From<chromiumoxide::error::CdpError> for ActuationError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        ActuationError::CdpIo(err.to_string())
    }
}

impl From<cdp_bridge::BridgeError> for ActuationError {
    fn from(err: cdp_bridge::BridgeError) -> Self {
        match err {
            cdp_bridge::BridgeError::Eval(detail) => ActuationError::Eval(detail),
            other => ActuationError::CdpIo(other.to_string()),
        }
    }
}
