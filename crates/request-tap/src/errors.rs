use thiserror::Error;

/// Failures in arming, running, or tearing down a request tap.
#[derive(Debug, Error)]
pub enum TapError {
    /// The tap already holds an armed watch; arming twice is a caller bug.
    #[error("request tap is already armed")]
    AlreadyArmed,

    /// A CDP command or event subscription failed.
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Socket-level failure in the proxy strategy.
    #[error("proxy I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The background watch task ended abnormally.
    #[error("watch task failed: {0}")]
    WatchTask(String),
}
