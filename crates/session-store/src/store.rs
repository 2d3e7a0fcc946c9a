//! Cookie capture and replay against a live page.

use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::Page;
use tracing::{debug, info, warn};

use crate::errors::SessionError;
use crate::model::{SessionSnapshot, StoredCookie};

/// Outcome of a restore: per-cookie failures are tolerated and counted
/// rather than aborting the whole replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    pub failed: usize,
}

/// Read all cookies from a live authenticated context. No filtering happens
/// here; the raw snapshot keeps full fidelity for inspection.
pub async fn capture(page: &Page) -> Result<SessionSnapshot, SessionError> {
    let cookies = page.get_cookies().await?;
    let snapshot = SessionSnapshot::new(cookies.iter().map(StoredCookie::from_cdp).collect());
    info!(cookies = snapshot.len(), "captured session snapshot");
    Ok(snapshot)
}

/// Replay an (already filtered) snapshot into the target context. Cookies
/// are applied one at a time so a single rejection, e.g. a domain mismatch,
/// cannot take the rest of the replay down with it.
pub async fn restore(page: &Page, snapshot: &SessionSnapshot) -> Result<RestoreReport, SessionError> {
    let mut report = RestoreReport::default();

    for cookie in &snapshot.cookies {
        match page.set_cookies(vec![to_cookie_param(cookie)]).await {
            Ok(_) => {
                debug!(name = %cookie.name, domain = %cookie.domain, "cookie restored");
                report.restored += 1;
            }
            Err(err) => {
                warn!(name = %cookie.name, error = %err, "cookie rejected during restore");
                report.failed += 1;
            }
        }
    }

    info!(
        restored = report.restored,
        failed = report.failed,
        "session restore finished"
    );
    Ok(report)
}

fn to_cookie_param(cookie: &StoredCookie) -> CookieParam {
    let mut param = CookieParam::new(cookie.name.clone(), cookie.value.clone());
    param.domain = Some(cookie.domain.clone());
    param.path = Some(cookie.path.clone());
    param.secure = Some(cookie.secure);
    param.http_only = Some(cookie.http_only);
    param
}
