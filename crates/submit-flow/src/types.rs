//! Workflow definition and run-report types.

use chrono::{DateTime, Utc};
use page_actions::{ActionKind, ActionRequest, StepFailureReason};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The interaction a step performs against its target element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepAction {
    Click,
    FillText { text: String },
    TypeSlowly { text: String },
}

/// One element of the scripted form flow. `required` marks the hard
/// sequential dependencies: when such a step fails, nothing after it can
/// mean anything, so the sequence aborts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationStep {
    pub element_id: String,
    pub label: String,
    pub action: StepAction,
    pub required: bool,
}

impl NavigationStep {
    pub fn click(element_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
            label: label.into(),
            action: StepAction::Click,
            required: true,
        }
    }

    pub fn fill(
        element_id: impl Into<String>,
        label: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            element_id: element_id.into(),
            label: label.into(),
            action: StepAction::FillText { text: text.into() },
            required: true,
        }
    }

    /// Mark the step as tolerable: a failure is logged and skipped over.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn to_request(&self) -> ActionRequest {
        let kind = match &self.action {
            StepAction::Click => ActionKind::Click,
            StepAction::FillText { text } => ActionKind::FillText(text.clone()),
            StepAction::TypeSlowly { text } => ActionKind::TypeSlowly(text.clone()),
        };
        ActionRequest {
            element_id: self.element_id.clone(),
            kind,
        }
    }
}

/// A named, ordered list of steps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub steps: Vec<NavigationStep>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, steps: Vec<NavigationStep>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Succeeded,
    Failed,
}

/// What happened to one attempted step. Steps after an abort are never
/// attempted and have no record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub element_id: String,
    pub label: String,
    pub required: bool,
    pub status: StepStatus,
    pub reason: Option<StepFailureReason>,
    pub elapsed_ms: u64,
}

/// Terminal state of one sequence run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowOutcome {
    Completed,
    Aborted {
        element_id: String,
        reason: StepFailureReason,
    },
}

/// Full record of one run, one per invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowReport {
    pub run_id: Uuid,
    pub workflow: String,
    pub started_at: DateTime<Utc>,
    pub outcome: FlowOutcome,
    pub steps: Vec<StepRecord>,
}

impl FlowReport {
    pub fn completed(&self) -> bool {
        matches!(self.outcome, FlowOutcome::Completed)
    }

    /// True when the abort was caused by the site's error banner rather
    /// than a missing or broken element.
    pub fn aborted_by_banner(&self) -> bool {
        matches!(
            self.outcome,
            FlowOutcome::Aborted {
                reason: StepFailureReason::BannerDetected { .. },
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_builders_set_requiredness() {
        let hard = NavigationStep::click("btnSubmitMsg", "submit message");
        let soft = NavigationStep::fill("txtEmail", "contact email", "a@b.c").optional();
        assert!(hard.required);
        assert!(!soft.required);
    }

    #[test]
    fn step_converts_to_action_request() {
        let step = NavigationStep::fill("txtAddDetail", "detail text", "hello");
        let request = step.to_request();
        assert_eq!(request.element_id, "txtAddDetail");
        assert_eq!(request.kind, ActionKind::FillText("hello".to_string()));
    }

    #[test]
    fn banner_aborts_are_distinguishable() {
        let report = FlowReport {
            run_id: Uuid::new_v4(),
            workflow: "w".to_string(),
            started_at: Utc::now(),
            outcome: FlowOutcome::Aborted {
                element_id: "btnSubmitMsg".to_string(),
                reason: StepFailureReason::BannerDetected {
                    text: "Sorry, looks like something isn't working.".to_string(),
                },
            },
            steps: vec![],
        };
        assert!(report.aborted_by_banner());
        assert!(!report.completed());
    }
}
