use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, DisableParams, EnableParams, EventRequestPaused, FailRequestParams,
    RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::ErrorReason;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::TapError;
use crate::pattern::UrlPattern;
use crate::tap::{ArmedTap, InterceptStrategy};
use crate::types::InterceptedRequest;

/// Captures via the CDP `Fetch` domain: requests matching the pattern are
/// paused inside the browser, recorded, and failed with `BlockedByClient`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CdpFetchStrategy;

impl CdpFetchStrategy {
    pub fn new() -> Self {
        Self
    }
}

fn enable_params(pattern: &UrlPattern) -> EnableParams {
    let mut scope = RequestPattern::default();
    scope.url_pattern = Some(pattern.as_glob().to_string());
    scope.request_stage = Some(RequestStage::Request);
    let mut params = EnableParams::default();
    params.patterns = Some(vec![scope]);
    params
}

#[async_trait]
impl InterceptStrategy for CdpFetchStrategy {
    async fn arm(&self, page: &Page, pattern: &UrlPattern) -> Result<ArmedTap, TapError> {
        // Subscribe before enabling so no paused event can slip past between
        // the two commands.
        let mut events = page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(|err| TapError::Cdp(err.to_string()))?;

        page.execute(enable_params(pattern))
            .await
            .map_err(|err| TapError::Cdp(err.to_string()))?;

        let (tx, rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let watch_cancel = cancel.clone();
        let watch_page = page.clone();
        let watch_pattern = pattern.clone();

        let task = tokio::spawn(async move {
            let mut slot = Some(tx);
            loop {
                let event = tokio::select! {
                    _ = watch_cancel.cancelled() => break,
                    next = events.next() => match next {
                        Some(event) => event,
                        None => break,
                    },
                };

                let url = event.request.url.clone();
                // The browser only pauses requests the enable pattern selected,
                // but re-checking keeps a wide pattern from capturing strays.
                if watch_pattern.matches(&url) {
                    let Some(tx) = slot.take() else { break };
                    let captured = InterceptedRequest {
                        url: url.clone(),
                        method: event.request.method.clone(),
                        body: event.request.post_data.clone(),
                        request_id: event.request_id.inner().to_string(),
                    };
                    let block =
                        FailRequestParams::new(event.request_id.clone(), ErrorReason::BlockedByClient);
                    if let Err(err) = watch_page.execute(block).await {
                        warn!(url = %url, "failed to block captured request: {}", err);
                    }
                    info!(url = %url, method = %captured.method, "captured matching request");
                    let _ = tx.send(captured);
                    break;
                }

                // Unrelated paused traffic must flow on untouched.
                let release = ContinueRequestParams::new(event.request_id.clone());
                if let Err(err) = watch_page.execute(release).await {
                    debug!(url = %url, "failed to release paused request: {}", err);
                }
            }

            // Interception must not outlive the watch, on any exit path.
            if let Err(err) = watch_page.execute(DisableParams::default()).await {
                debug!("disabling fetch interception failed: {}", err);
            }
        });

        info!(pattern = %pattern, "request tap armed via CDP fetch");
        Ok(ArmedTap::new(rx, cancel, task))
    }
}
