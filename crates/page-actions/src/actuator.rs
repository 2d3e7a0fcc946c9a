//! The actuation pipeline.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Element, Page};
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::banner::{self, BannerSpec};
use crate::errors::ActuationError;
use crate::locator;
use crate::types::{
    ActionKind, ActionOutcome, ActionRequest, ActuatorTuning, BannerProbe, StepFailureReason,
};
use crate::typing;

/// The seam the navigation layer drives. Mocked in flow and verifier tests.
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Perform one interaction. Never returns an error; every fault below
    /// this boundary is folded into the outcome.
    async fn act(&self, request: &ActionRequest) -> ActionOutcome;

    /// Bounded poll for the failure banner. Never raises.
    async fn detect_error_banner(&self, timeout: Duration) -> BannerProbe;

    /// Human-cadence typing into a field, for login-style forms.
    async fn type_slowly(&self, element_id: &str, text: &str) -> Result<(), ActuationError>;
}

/// Production actuator over a live page.
///
/// `act` runs the full pipeline:
/// 1. refuse if the error banner is already visible
/// 2. locate the target under the polling deadline
/// 3. wait out late-binding widgets
/// 4. dispatch programmatically and fold any fault into the outcome
pub struct PageActuator {
    page: Page,
    tuning: ActuatorTuning,
    banner: BannerSpec,
}

impl PageActuator {
    pub fn new(page: Page, tuning: ActuatorTuning, banner: BannerSpec) -> Self {
        Self {
            page,
            tuning,
            banner,
        }
    }

    fn click_script(element_id: &str) -> String {
        format!(
            r#"(function() {{
                const el = document.getElementById({id});
                if (!el) return false;
                el.click();
                return true;
            }})()"#,
            id = json!(element_id)
        )
    }

    fn fill_script(element_id: &str, text: &str) -> String {
        format!(
            r#"(function() {{
                const el = document.getElementById({id});
                if (!el) return false;
                el.value = {text};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()"#,
            id = json!(element_id),
            text = json!(text)
        )
    }

    async fn dispatch(
        &self,
        request: &ActionRequest,
        element: &Element,
    ) -> Result<bool, ActuationError> {
        match &request.kind {
            ActionKind::Click => {
                let script = Self::click_script(&request.element_id);
                Ok(cdp_bridge::eval_bool(&self.page, &script).await?)
            }
            ActionKind::FillText(text) => {
                let script = Self::fill_script(&request.element_id, text);
                Ok(cdp_bridge::eval_bool(&self.page, &script).await?)
            }
            ActionKind::TypeSlowly(text) => {
                typing::type_into(element, text, self.tuning.per_char_delay).await?;
                Ok(true)
            }
        }
    }
}

#[async_trait]
impl Actuator for PageActuator {
    async fn act(&self, request: &ActionRequest) -> ActionOutcome {
        info!(
            element = %request.element_id,
            kind = request.kind.name(),
            "actuating element"
        );

        // A pending error banner invalidates everything that would follow.
        match banner::probe_once(&self.page, &self.banner).await {
            BannerProbe::Present { text } => {
                warn!(element = %request.element_id, "error banner already visible, refusing to act");
                return ActionOutcome::Failed(StepFailureReason::BannerDetected { text });
            }
            BannerProbe::Unknown { detail } => {
                warn!(detail = %detail, "banner probe faulted, treating as absent");
            }
            BannerProbe::Absent => {}
        }

        let element = match locator::locate(
            &self.page,
            &request.element_id,
            self.tuning.locate_timeout,
            self.tuning.poll_interval,
        )
        .await
        {
            Ok(element) => element,
            Err(ActuationError::NotFound {
                element_id,
                waited_ms,
            }) => {
                warn!(element = %element_id, waited_ms, "element never appeared");
                return ActionOutcome::Failed(StepFailureReason::NotFound { element_id });
            }
            Err(other) => {
                warn!(element = %request.element_id, error = %other, "element lookup failed");
                return ActionOutcome::Failed(StepFailureReason::DispatchFailed {
                    detail: other.to_string(),
                });
            }
        };

        // Presence is not interactivity for late-binding widgets.
        sleep(self.tuning.stabilize_delay).await;

        match self.dispatch(request, &element).await {
            Ok(true) => {
                debug!(element = %request.element_id, "dispatch completed");
                ActionOutcome::Completed
            }
            Ok(false) => {
                warn!(element = %request.element_id, "element vanished between locate and dispatch");
                ActionOutcome::Failed(StepFailureReason::DispatchFailed {
                    detail: "element missing at dispatch".to_string(),
                })
            }
            Err(err) => {
                warn!(element = %request.element_id, error = %err, "dispatch failed");
                ActionOutcome::Failed(StepFailureReason::DispatchFailed {
                    detail: err.to_string(),
                })
            }
        }
    }

    async fn detect_error_banner(&self, timeout: Duration) -> BannerProbe {
        banner::watch(&self.page, &self.banner, timeout, self.tuning.poll_interval).await
    }

    async fn type_slowly(&self, element_id: &str, text: &str) -> Result<(), ActuationError> {
        typing::type_slowly(
            &self.page,
            element_id,
            text,
            self.tuning.locate_timeout,
            self.tuning.poll_interval,
            self.tuning.per_char_delay,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_script_targets_the_id() {
        let script = PageActuator::click_script("btnSubmitMsg");
        assert!(script.contains(r#"getElementById("btnSubmitMsg")"#));
        assert!(script.contains("el.click()"));
    }

    #[test]
    fn fill_script_fires_framework_events() {
        let script = PageActuator::fill_script("txtEmail", "user@example.com");
        assert!(script.contains(r#""user@example.com""#));
        assert!(script.contains("new Event('input'"));
        assert!(script.contains("new Event('change'"));
    }

    #[test]
    fn fill_script_escapes_quotes_in_payload() {
        let script = PageActuator::fill_script("txtAddDetail", r#"she said "hi""#);
        assert!(script.contains(r#""she said \"hi\"""#));
    }
}
