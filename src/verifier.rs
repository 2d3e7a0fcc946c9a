//! One verification run, end to end.
//!
//! The verifier owns the three seams a run needs: an [`Actuator`] to drive
//! the page, a [`RequestTap`] watching for the submission request, and the
//! [`ContextHandle`] of the browser context everything lives in. It arms the
//! tap, runs the workflow, settles the capture and maps the combination to
//! exactly one [`VerificationVerdict`]. Disarm and context close happen on
//! every exit path, including hard failures.

use std::sync::Arc;
use std::time::Duration;

use cdp_bridge::ContextHandle;
use page_actions::Actuator;
use request_tap::{InterceptedRequest, RequestTap};
use serde::{Deserialize, Serialize};
use submit_flow::{FlowReport, SequenceRunner, Workflow};
use tracing::{info, warn};

use crate::errors::VerifyError;

/// Single-word answer of a verification run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationVerdict {
    /// Every required step landed and the submission request was observed
    /// (and blocked) on the wire.
    Submitted,
    /// A required step failed before the flow could finish.
    NavigationFailed,
    /// The flow finished but no matching request arrived within the wait
    /// bound.
    NoRequestObserved,
    /// The site's failure banner preempted the flow.
    ErrorBannerDetected,
}

/// The verdict plus the evidence behind it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationReport {
    pub verdict: VerificationVerdict,
    pub flow: FlowReport,
    pub capture: Option<InterceptedRequest>,
}

/// Drives one workflow against one page with an armed tap, then tears
/// everything down.
pub struct SubmissionVerifier {
    actuator: Arc<dyn Actuator>,
    tap: Box<dyn RequestTap>,
    context: Box<dyn ContextHandle>,
    workflow: Workflow,
    wait_bound: Duration,
}

impl SubmissionVerifier {
    pub fn new(
        actuator: Arc<dyn Actuator>,
        tap: Box<dyn RequestTap>,
        context: Box<dyn ContextHandle>,
        workflow: Workflow,
        wait_bound: Duration,
    ) -> Self {
        Self {
            actuator,
            tap,
            context,
            workflow,
            wait_bound,
        }
    }

    /// Runs the flow to a verdict. Consumes the verifier; whatever happened,
    /// the tap is disarmed and the context closed when this returns.
    pub async fn run(mut self) -> Result<VerificationReport, VerifyError> {
        let result = self.execute().await;

        if let Err(err) = self.tap.disarm().await {
            warn!("request tap disarm failed: {}", err);
        }
        if let Err(err) = self.context.close().await {
            warn!("browser context close failed: {}", err);
        }

        let (flow, capture) = result?;
        let verdict = verdict_for(&flow, capture.is_some());
        info!(verdict = ?verdict, run_id = %flow.run_id, "verification finished");
        Ok(VerificationReport {
            verdict,
            flow,
            capture,
        })
    }

    async fn execute(&mut self) -> Result<(FlowReport, Option<InterceptedRequest>), VerifyError> {
        // Armed strictly before the first step so an early submission cannot
        // slip past unobserved.
        self.tap.arm().await.map_err(VerifyError::Arm)?;

        let runner = SequenceRunner::new(Arc::clone(&self.actuator));
        let flow = runner.run(&self.workflow).await?;

        let capture = if flow.completed() {
            self.tap.wait_for_capture(self.wait_bound).await
        } else {
            // An aborted flow may still have fired the request before dying;
            // that must not count as a submission.
            if let Some(stray) = self.tap.try_take_capture() {
                warn!(url = %stray.url, "request captured during aborted run, ignoring");
            }
            None
        };

        Ok((flow, capture))
    }
}

/// Pure verdict mapping. Aborts always outrank a capture.
fn verdict_for(flow: &FlowReport, captured: bool) -> VerificationVerdict {
    if flow.aborted_by_banner() {
        VerificationVerdict::ErrorBannerDetected
    } else if !flow.completed() {
        VerificationVerdict::NavigationFailed
    } else if captured {
        VerificationVerdict::Submitted
    } else {
        VerificationVerdict::NoRequestObserved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use cdp_bridge::BridgeError;
    use chrono::Utc;
    use page_actions::{
        ActionOutcome, ActionRequest, ActuationError, BannerProbe, StepFailureReason,
    };
    use request_tap::TapError;
    use submit_flow::{FlowOutcome, NavigationStep};
    use uuid::Uuid;

    fn report_with(outcome: FlowOutcome) -> FlowReport {
        FlowReport {
            run_id: Uuid::new_v4(),
            workflow: "stub".to_string(),
            started_at: Utc::now(),
            outcome,
            steps: Vec::new(),
        }
    }

    #[test]
    fn verdicts_cover_the_four_terminal_states() {
        let completed = report_with(FlowOutcome::Completed);
        assert_eq!(verdict_for(&completed, true), VerificationVerdict::Submitted);
        assert_eq!(
            verdict_for(&completed, false),
            VerificationVerdict::NoRequestObserved
        );

        let broken = report_with(FlowOutcome::Aborted {
            element_id: "btnComposeMessage".to_string(),
            reason: StepFailureReason::NotFound {
                element_id: "btnComposeMessage".to_string(),
            },
        });
        assert_eq!(
            verdict_for(&broken, false),
            VerificationVerdict::NavigationFailed
        );
        // A capture never upgrades an aborted run.
        assert_eq!(
            verdict_for(&broken, true),
            VerificationVerdict::NavigationFailed
        );

        let banner = report_with(FlowOutcome::Aborted {
            element_id: "btnSubmitMsg".to_string(),
            reason: StepFailureReason::BannerDetected {
                text: "Sorry, looks like something isn't working.".to_string(),
            },
        });
        assert_eq!(
            verdict_for(&banner, false),
            VerificationVerdict::ErrorBannerDetected
        );
    }

    struct StubActuator {
        fail_on: Option<(String, StepFailureReason)>,
    }

    impl StubActuator {
        fn passing() -> Self {
            Self { fail_on: None }
        }

        fn failing_on(element_id: &str, reason: StepFailureReason) -> Self {
            Self {
                fail_on: Some((element_id.to_string(), reason)),
            }
        }
    }

    #[async_trait]
    impl Actuator for StubActuator {
        async fn act(&self, request: &ActionRequest) -> ActionOutcome {
            match &self.fail_on {
                Some((id, reason)) if *id == request.element_id => {
                    ActionOutcome::Failed(reason.clone())
                }
                _ => ActionOutcome::Completed,
            }
        }

        async fn detect_error_banner(&self, _timeout: Duration) -> BannerProbe {
            BannerProbe::Absent
        }

        async fn type_slowly(&self, _element_id: &str, _text: &str) -> Result<(), ActuationError> {
            Ok(())
        }
    }

    struct StubTap {
        arm_fails: bool,
        capture: Option<InterceptedRequest>,
        armed: Arc<AtomicUsize>,
        disarmed: Arc<AtomicUsize>,
    }

    impl StubTap {
        fn new(capture: Option<InterceptedRequest>) -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
            let armed = Arc::new(AtomicUsize::new(0));
            let disarmed = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    arm_fails: false,
                    capture,
                    armed: Arc::clone(&armed),
                    disarmed: Arc::clone(&disarmed),
                },
                armed,
                disarmed,
            )
        }
    }

    #[async_trait]
    impl RequestTap for StubTap {
        async fn arm(&mut self) -> Result<(), TapError> {
            self.armed.fetch_add(1, Ordering::SeqCst);
            if self.arm_fails {
                return Err(TapError::Cdp("target crashed".to_string()));
            }
            Ok(())
        }

        async fn wait_for_capture(&mut self, _bound: Duration) -> Option<InterceptedRequest> {
            self.capture.take()
        }

        fn try_take_capture(&mut self) -> Option<InterceptedRequest> {
            self.capture.take()
        }

        async fn disarm(&mut self) -> Result<(), TapError> {
            self.disarmed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct SpyContext {
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ContextHandle for SpyContext {
        async fn close(&mut self) -> Result<(), BridgeError> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn two_step_workflow() -> Workflow {
        Workflow::new(
            "stub-flow",
            vec![
                NavigationStep::click("open-inbox", "open inbox"),
                NavigationStep::click("send", "send"),
            ],
        )
    }

    fn sample_capture() -> InterceptedRequest {
        InterceptedRequest {
            url: "https://portal.example.com/svc/new-message".to_string(),
            method: "POST".to_string(),
            body: None,
            request_id: "req-9".to_string(),
        }
    }

    fn verifier_with(
        actuator: StubActuator,
        tap: StubTap,
        closed: Arc<AtomicUsize>,
    ) -> SubmissionVerifier {
        SubmissionVerifier::new(
            Arc::new(actuator),
            Box::new(tap),
            Box::new(SpyContext { closed }),
            two_step_workflow(),
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn completed_flow_with_capture_is_submitted() {
        let (tap, armed, disarmed) = StubTap::new(Some(sample_capture()));
        let closed = Arc::new(AtomicUsize::new(0));
        let verifier = verifier_with(StubActuator::passing(), tap, Arc::clone(&closed));

        let report = verifier.run().await.unwrap();
        assert_eq!(report.verdict, VerificationVerdict::Submitted);
        assert_eq!(report.capture.unwrap().method, "POST");
        assert_eq!(armed.load(Ordering::SeqCst), 1);
        assert_eq!(disarmed.load(Ordering::SeqCst), 1);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stray_capture_during_abort_is_discarded() {
        let (tap, _armed, disarmed) = StubTap::new(Some(sample_capture()));
        let closed = Arc::new(AtomicUsize::new(0));
        let actuator = StubActuator::failing_on(
            "send",
            StepFailureReason::NotFound {
                element_id: "send".to_string(),
            },
        );
        let verifier = verifier_with(actuator, tap, Arc::clone(&closed));

        let report = verifier.run().await.unwrap();
        assert_eq!(report.verdict, VerificationVerdict::NavigationFailed);
        assert!(report.capture.is_none());
        assert_eq!(disarmed.load(Ordering::SeqCst), 1);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn arm_failure_still_tears_down() {
        let (mut tap, armed, disarmed) = StubTap::new(None);
        tap.arm_fails = true;
        let closed = Arc::new(AtomicUsize::new(0));
        let verifier = verifier_with(StubActuator::passing(), tap, Arc::clone(&closed));

        let err = verifier.run().await.unwrap_err();
        assert!(matches!(err, VerifyError::Arm(_)));
        assert_eq!(armed.load(Ordering::SeqCst), 1);
        assert_eq!(disarmed.load(Ordering::SeqCst), 1);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}
