//! Error types for sequence execution

use thiserror::Error;

/// Structural problems with a workflow. Step-level interaction failures are
/// not errors; they land in the report as records and drive the outcome.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("workflow contains no steps")]
    EmptyWorkflow,

    #[error("invalid step at index {index}: {detail}")]
    InvalidStep { index: usize, detail: String },
}
