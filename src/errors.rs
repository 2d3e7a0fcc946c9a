//! Error types owned by the binary crate.
//!
//! Component-level failures live in their own crates; these cover the two
//! concerns the orchestration layer adds on top: configuration loading and
//! hard verification failures. Soft failures (a step that never landed, a
//! request that never showed) are not errors here; they surface as a verdict.

use std::path::PathBuf;

use request_tap::TapError;
use submit_flow::FlowError;
use thiserror::Error;

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for the expected shape.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures that keep a verification run from reaching any verdict.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The request tap could not be armed; running without it would make
    /// every verdict meaningless.
    #[error("failed to arm request tap: {0}")]
    Arm(#[source] TapError),

    /// The workflow definition itself is unusable.
    #[error(transparent)]
    Flow(#[from] FlowError),
}
