//! Browser process ownership.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::BridgeConfig;
use crate::errors::BridgeError;

/// Owns the running browser and the task draining its event handler.
///
/// [`BrowserHandle::close`] is idempotent; dropping an unclosed handle aborts
/// the handler task so the process does not hang on a dangling stream.
pub struct BrowserHandle {
    inner: Option<Inner>,
}

struct Inner {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

/// Launch Chromium according to `config` and start draining its handler.
pub async fn launch(config: &BridgeConfig) -> Result<BrowserHandle, BridgeError> {
    let mut builder = BrowserConfig::builder();

    if !config.headless {
        builder = builder.with_head();
    }
    if config.no_sandbox {
        builder = builder.no_sandbox();
    }
    if let Some(executable) = &config.executable {
        builder = builder.chrome_executable(executable);
    }
    if let Some(dir) = &config.user_data_dir {
        builder = builder.user_data_dir(dir);
    }
    if let Some((width, height)) = config.window_size {
        builder = builder.window_size(width, height);
    }
    if let Some(proxy) = &config.proxy_server {
        builder = builder.arg(format!("--proxy-server={}", proxy));
    }

    let browser_config = builder.build().map_err(BridgeError::Config)?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .map_err(|err| BridgeError::Launch(err.to_string()))?;

    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(err) = event {
                error!("browser handler error: {}", err);
                break;
            }
        }
        debug!("browser handler task ended");
    });

    info!(headless = config.headless, "browser launched");

    Ok(BrowserHandle {
        inner: Some(Inner {
            browser,
            handler_task,
        }),
    })
}

impl BrowserHandle {
    /// Open a new page in the managed browser.
    pub async fn new_page(&self, url: &str) -> Result<Page, BridgeError> {
        let inner = self.inner.as_ref().ok_or(BridgeError::Closed)?;
        let page = inner.browser.new_page(url).await?;
        Ok(page)
    }

    /// Shut the browser down and join the handler task. Safe to call twice.
    pub async fn close(&mut self) -> Result<(), BridgeError> {
        let Some(mut inner) = self.inner.take() else {
            return Ok(());
        };

        inner
            .browser
            .close()
            .await
            .map_err(|err| BridgeError::CdpIo(err.to_string()))?;

        match inner.handler_task.await {
            Ok(()) => {}
            Err(err) if err.is_cancelled() => {}
            Err(err) => error!("browser handler task failed on close: {}", err),
        }

        info!("browser closed");
        Ok(())
    }
}

impl Drop for BrowserHandle {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.handler_task.abort();
        }
    }
}

/// Seam for callers that must guarantee context teardown without owning a
/// concrete browser, e.g. the verification orchestrator and its tests.
#[async_trait]
pub trait ContextHandle: Send {
    async fn close(&mut self) -> Result<(), BridgeError>;
}

#[async_trait]
impl ContextHandle for BrowserHandle {
    async fn close(&mut self) -> Result<(), BridgeError> {
        BrowserHandle::close(self).await
    }
}
