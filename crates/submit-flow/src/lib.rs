//! Ordered navigation sequences.
//!
//! A [`Workflow`] is a fixed list of [`NavigationStep`]s executed in order
//! by the [`SequenceRunner`]: a failing required step aborts the rest of the
//! sequence, a failing optional step is logged and skipped over. The run
//! always yields one [`FlowReport`] with per-step records.

pub mod errors;
pub mod runner;
pub mod types;

pub use errors::FlowError;
pub use runner::SequenceRunner;
pub use types::{FlowOutcome, FlowReport, NavigationStep, StepAction, StepRecord, StepStatus, Workflow};
