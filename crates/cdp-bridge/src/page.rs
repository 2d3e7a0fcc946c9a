//! Page-level helpers shared across the workspace.

use chromiumoxide::cdp::browser_protocol::page::ReloadParams;
use chromiumoxide::Page;
use tracing::debug;

use crate::errors::BridgeError;

/// Navigate and wait for the load to settle.
pub async fn navigate(page: &Page, url: &str) -> Result<(), BridgeError> {
    debug!(url = %url, "navigating");
    page.goto(url).await?;
    page.wait_for_navigation().await?;
    Ok(())
}

/// Reload the current page and wait for the load to settle. Used after a
/// cookie restore so the new session state takes effect.
pub async fn reload(page: &Page) -> Result<(), BridgeError> {
    debug!("reloading page");
    page.execute(ReloadParams::default()).await?;
    page.wait_for_navigation().await?;
    Ok(())
}

/// Evaluate a JavaScript expression expected to produce a boolean.
pub async fn eval_bool(page: &Page, expression: &str) -> Result<bool, BridgeError> {
    let result = page.evaluate(expression).await?;
    result
        .into_value::<bool>()
        .map_err(|err| BridgeError::Eval(err.to_string()))
}

/// Evaluate a JavaScript expression expected to produce a string, or null.
pub async fn eval_opt_string(page: &Page, expression: &str) -> Result<Option<String>, BridgeError> {
    let result = page.evaluate(expression).await?;
    result
        .into_value::<Option<String>>()
        .map_err(|err| BridgeError::Eval(err.to_string()))
}
