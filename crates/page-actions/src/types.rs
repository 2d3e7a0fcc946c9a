//! Request and outcome types crossing the actuation boundary.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One interaction to perform against a DOM element, addressed by id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionRequest {
    pub element_id: String,
    pub kind: ActionKind,
}

impl ActionRequest {
    pub fn click(element_id: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
            kind: ActionKind::Click,
        }
    }

    pub fn fill_text(element_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
            kind: ActionKind::FillText(text.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionKind {
    /// Programmatic `el.click()`; robust against overlays that would defeat
    /// a synthesized pointer event.
    Click,
    /// Assign the value and fire `input`/`change` so framework bindings see
    /// the change.
    FillText(String),
    /// Real key events, one character at a time with a fixed delay.
    TypeSlowly(String),
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::FillText(_) => "fill_text",
            ActionKind::TypeSlowly(_) => "type_slowly",
        }
    }
}

/// Value-level result of one actuation. Failures carry the reason the
/// navigation layer keys its abort/continue decision on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    Failed(StepFailureReason),
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Completed)
    }

    pub fn failure(&self) -> Option<&StepFailureReason> {
        match self {
            ActionOutcome::Completed => None,
            ActionOutcome::Failed(reason) => Some(reason),
        }
    }
}

/// Why a step failed. A pending error banner invalidates everything that
/// would follow, so it is distinguished from an ordinary missing element.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum StepFailureReason {
    #[error("error banner visible: {text}")]
    BannerDetected { text: String },

    #[error("element '{element_id}' not found")]
    NotFound { element_id: String },

    #[error("dispatch failed: {detail}")]
    DispatchFailed { detail: String },
}

/// Result of one error-banner probe. `Unknown` means the probe itself
/// faulted; callers treat it as absent for control flow but keep the signal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BannerProbe {
    Present { text: String },
    Absent,
    Unknown { detail: String },
}

/// Timing knobs for the actuation pipeline.
#[derive(Clone, Copy, Debug)]
pub struct ActuatorTuning {
    /// Deadline for an element to appear in the DOM.
    pub locate_timeout: Duration,
    /// Interval between presence polls.
    pub poll_interval: Duration,
    /// Grace period between presence and interaction, for widgets that
    /// render before they are wired up.
    pub stabilize_delay: Duration,
    /// Inter-character delay for [`ActionKind::TypeSlowly`].
    pub per_char_delay: Duration,
}

impl Default for ActuatorTuning {
    fn default() -> Self {
        Self {
            locate_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
            stabilize_delay: Duration::from_secs(2),
            per_char_delay: Duration::from_millis(200),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_exposes_failure_reason() {
        let outcome = ActionOutcome::Failed(StepFailureReason::NotFound {
            element_id: "btnComposeMessage".to_string(),
        });
        assert!(!outcome.is_success());
        match outcome.failure() {
            Some(StepFailureReason::NotFound { element_id }) => {
                assert_eq!(element_id, "btnComposeMessage")
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn failure_reasons_render_for_logs() {
        let reason = StepFailureReason::BannerDetected {
            text: "Sorry, looks like something isn't working.".to_string(),
        };
        assert!(reason.to_string().contains("error banner visible"));
    }
}
