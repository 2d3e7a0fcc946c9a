//! Human-cadence typing via real key events.

use std::time::Duration;

use chromiumoxide::{Element, Page};
use tokio::time::sleep;
use tracing::debug;

use crate::errors::ActuationError;
use crate::locator;

/// Send `text` into an already-located element one character at a time.
/// Ordering is strict left-to-right; nothing is batched, so input-rate
/// checks observe a plausible cadence.
pub async fn type_into(
    element: &Element,
    text: &str,
    per_char_delay: Duration,
) -> Result<(), ActuationError> {
    element.click().await?;
    for ch in text.chars() {
        element.type_str(&ch.to_string()).await?;
        sleep(per_char_delay).await;
    }
    Ok(())
}

/// Locate the field, then type into it with the configured cadence.
pub async fn type_slowly(
    page: &Page,
    element_id: &str,
    text: &str,
    locate_timeout: Duration,
    poll_interval: Duration,
    per_char_delay: Duration,
) -> Result<(), ActuationError> {
    let element = locator::locate(page, element_id, locate_timeout, poll_interval).await?;
    debug!(element = %element_id, chars = text.chars().count(), "typing slowly");
    type_into(&element, text, per_char_delay).await
}
