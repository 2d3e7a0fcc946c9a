//! Element location under a polling deadline.

use std::time::Duration;

use chromiumoxide::{Element, Page};
use serde_json::json;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::errors::ActuationError;

/// CSS attribute selector for a DOM id. Quoting through JSON keeps ids with
/// CSS metacharacters (dots, colons) intact.
pub fn id_selector(element_id: &str) -> String {
    format!("[id={}]", json!(element_id))
}

/// Poll for the element until it appears or the deadline elapses. Dynamic
/// widgets routinely attach well after document load, so a single lookup is
/// not a presence signal.
pub async fn locate(
    page: &Page,
    element_id: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Element, ActuationError> {
    let selector = id_selector(element_id);
    let deadline = Instant::now() + timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match page.find_element(&selector).await {
            Ok(element) => {
                debug!(element = %element_id, attempts, "element located");
                return Ok(element);
            }
            Err(_) if Instant::now() < deadline => {
                sleep(poll_interval).await;
            }
            Err(_) => {
                return Err(ActuationError::NotFound {
                    element_id: element_id.to_string(),
                    waited_ms: timeout.as_millis() as u64,
                });
            }
        }
    }
}
