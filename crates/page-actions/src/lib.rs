//! Resilient element actuation.
//!
//! [`Actuator::act`] is the boundary the navigation layer drives: it locates
//! a target under a polling timeout, preempts on a visible error banner,
//! waits out late-binding widgets, dispatches the interaction
//! programmatically and reports a value, never an error. Protocol faults are
//! caught here and folded into a [`StepFailureReason`] so callers can make
//! control-flow decisions without unwinding.

pub mod actuator;
pub mod banner;
pub mod errors;
pub mod locator;
pub mod types;
pub mod typing;

pub use actuator::{Actuator, PageActuator};
pub use banner::BannerSpec;
pub use errors::ActuationError;
pub use types::{ActionKind, ActionOutcome, ActionRequest, ActuatorTuning, BannerProbe, StepFailureReason};
