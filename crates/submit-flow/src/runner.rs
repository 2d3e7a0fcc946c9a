//! Sequence runner.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use page_actions::{ActionOutcome, Actuator};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::FlowError;
use crate::types::{FlowOutcome, FlowReport, StepRecord, StepStatus, Workflow};

/// Drives a [`Workflow`] against an [`Actuator`], step by step in order.
pub struct SequenceRunner {
    actuator: Arc<dyn Actuator>,
}

impl SequenceRunner {
    pub fn new(actuator: Arc<dyn Actuator>) -> Self {
        Self { actuator }
    }

    /// Structural validation, before anything touches the page.
    pub fn validate(&self, workflow: &Workflow) -> Result<(), FlowError> {
        if workflow.steps.is_empty() {
            return Err(FlowError::EmptyWorkflow);
        }
        for (index, step) in workflow.steps.iter().enumerate() {
            if step.element_id.is_empty() {
                return Err(FlowError::InvalidStep {
                    index,
                    detail: "element id cannot be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Execute the workflow. Required-step failure aborts immediately;
    /// optional-step failure is recorded and skipped over. Exactly one
    /// report comes back per call.
    pub async fn run(&self, workflow: &Workflow) -> Result<FlowReport, FlowError> {
        self.validate(workflow)?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            workflow = %workflow.name,
            run_id = %run_id,
            steps = workflow.steps.len(),
            "running navigation sequence"
        );

        let total = workflow.steps.len();
        let mut records = Vec::with_capacity(total);
        let mut outcome = FlowOutcome::Completed;

        for (index, step) in workflow.steps.iter().enumerate() {
            debug!(step = %step.element_id, "executing step {}/{}", index + 1, total);
            let step_start = Instant::now();
            let result = self.actuator.act(&step.to_request()).await;
            let elapsed_ms = step_start.elapsed().as_millis() as u64;

            match result {
                ActionOutcome::Completed => {
                    records.push(StepRecord {
                        element_id: step.element_id.clone(),
                        label: step.label.clone(),
                        required: step.required,
                        status: StepStatus::Succeeded,
                        reason: None,
                        elapsed_ms,
                    });
                }
                ActionOutcome::Failed(reason) => {
                    records.push(StepRecord {
                        element_id: step.element_id.clone(),
                        label: step.label.clone(),
                        required: step.required,
                        status: StepStatus::Failed,
                        reason: Some(reason.clone()),
                        elapsed_ms,
                    });

                    if step.required {
                        warn!(
                            step = %step.element_id,
                            reason = %reason,
                            "required step failed, aborting sequence"
                        );
                        outcome = FlowOutcome::Aborted {
                            element_id: step.element_id.clone(),
                            reason,
                        };
                        break;
                    }

                    warn!(
                        step = %step.element_id,
                        reason = %reason,
                        "optional step failed, continuing"
                    );
                }
            }
        }

        match &outcome {
            FlowOutcome::Completed => {
                info!(workflow = %workflow.name, run_id = %run_id, "sequence completed")
            }
            FlowOutcome::Aborted { element_id, .. } => {
                warn!(workflow = %workflow.name, run_id = %run_id, step = %element_id, "sequence aborted")
            }
        }

        Ok(FlowReport {
            run_id,
            workflow: workflow.name.clone(),
            started_at,
            outcome,
            steps: records,
        })
    }
}
