use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::errors::TapError;
use crate::pattern::UrlPattern;
use crate::types::InterceptedRequest;

/// How long a disarm waits for the watch task to wind down before aborting it.
const DISARM_GRACE: Duration = Duration::from_secs(5);

/// Mechanism that starts watching traffic and hands back the armed state.
///
/// Implementations subscribe to their event source, spawn the watch task, and
/// return immediately; capture happens in the background.
#[async_trait]
pub trait InterceptStrategy: Send + Sync {
    async fn arm(&self, page: &Page, pattern: &UrlPattern) -> Result<ArmedTap, TapError>;
}

/// Live watch over browser traffic, holding the capture slot.
///
/// The slot is a oneshot channel: the watch task can fill it at most once,
/// so a tap yields at most one [`InterceptedRequest`] no matter how many
/// matching requests the page produces.
pub struct ArmedTap {
    rx: Option<oneshot::Receiver<InterceptedRequest>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ArmedTap {
    pub(crate) fn new(
        rx: oneshot::Receiver<InterceptedRequest>,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            rx: Some(rx),
            cancel,
            task: Some(task),
        }
    }

    /// Waits up to `bound` for the watch task to record a request.
    ///
    /// Returns `None` when the bound elapses or the watch exited without a
    /// capture. The slot is consumed either way.
    pub async fn wait_for_capture(&mut self, bound: Duration) -> Option<InterceptedRequest> {
        let rx = self.rx.take()?;
        match timeout(bound, rx).await {
            Ok(Ok(captured)) => Some(captured),
            Ok(Err(_)) => None,
            Err(_) => None,
        }
    }

    /// Takes a capture if one is already sitting in the slot, without waiting.
    pub fn try_take_capture(&mut self) -> Option<InterceptedRequest> {
        let rx = self.rx.as_mut()?;
        match rx.try_recv() {
            Ok(captured) => {
                self.rx = None;
                Some(captured)
            }
            Err(_) => None,
        }
    }

    /// Stops the watch task and waits for it to release its event source.
    pub async fn disarm(mut self) -> Result<(), TapError> {
        self.cancel.cancel();
        let Some(mut task) = self.task.take() else {
            return Ok(());
        };
        match timeout(DISARM_GRACE, &mut task).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) if err.is_cancelled() => Ok(()),
            Ok(Err(err)) => Err(TapError::WatchTask(err.to_string())),
            Err(_) => {
                task.abort();
                Err(TapError::WatchTask(
                    "watch task did not stop within the disarm grace period".to_string(),
                ))
            }
        }
    }
}

impl Drop for ArmedTap {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Armable observer for one request pattern on one page.
///
/// Separated as a trait so orchestration can be exercised against stub taps.
#[async_trait]
pub trait RequestTap: Send {
    /// Starts watching. Must be called before the page activity that is
    /// expected to produce the request.
    async fn arm(&mut self) -> Result<(), TapError>;

    /// Blocks up to `bound` for a capture.
    async fn wait_for_capture(&mut self, bound: Duration) -> Option<InterceptedRequest>;

    /// Non-blocking check for a capture that already happened.
    fn try_take_capture(&mut self) -> Option<InterceptedRequest>;

    /// Stops watching and releases the event source. Safe to call when the
    /// tap was never armed.
    async fn disarm(&mut self) -> Result<(), TapError>;
}

/// [`RequestTap`] bound to a concrete page and capture strategy.
pub struct PageTap {
    page: Page,
    pattern: UrlPattern,
    strategy: Arc<dyn InterceptStrategy>,
    armed: Option<ArmedTap>,
}

impl PageTap {
    pub fn new(page: Page, pattern: UrlPattern, strategy: Arc<dyn InterceptStrategy>) -> Self {
        Self {
            page,
            pattern,
            strategy,
            armed: None,
        }
    }
}

#[async_trait]
impl RequestTap for PageTap {
    async fn arm(&mut self) -> Result<(), TapError> {
        if self.armed.is_some() {
            return Err(TapError::AlreadyArmed);
        }
        let armed = self.strategy.arm(&self.page, &self.pattern).await?;
        self.armed = Some(armed);
        Ok(())
    }

    async fn wait_for_capture(&mut self, bound: Duration) -> Option<InterceptedRequest> {
        match self.armed.as_mut() {
            Some(armed) => armed.wait_for_capture(bound).await,
            None => None,
        }
    }

    fn try_take_capture(&mut self) -> Option<InterceptedRequest> {
        self.armed.as_mut().and_then(ArmedTap::try_take_capture)
    }

    async fn disarm(&mut self) -> Result<(), TapError> {
        match self.armed.take() {
            Some(armed) => armed.disarm().await,
            None => Ok(()),
        }
    }
}
