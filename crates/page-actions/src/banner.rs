//! Error-banner detection.
//!
//! The probe never raises: protocol faults come back as
//! [`BannerProbe::Unknown`], which callers log and treat as absent.

use std::time::Duration;

use chromiumoxide::Page;
use serde_json::json;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::types::BannerProbe;

/// What counts as the site's failure banner: the container class plus the
/// phrase that must appear inside it. Class presence alone is not enough;
/// some flows reuse the container for dismissible notices.
#[derive(Clone, Debug)]
pub struct BannerSpec {
    pub container_class: String,
    pub phrase: String,
}

impl Default for BannerSpec {
    fn default() -> Self {
        Self {
            container_class: "ant-error-container".to_string(),
            phrase: "Sorry, looks like something isn't working.".to_string(),
        }
    }
}

impl BannerSpec {
    fn probe_script(&self) -> String {
        format!(
            r#"(function() {{
                const els = document.getElementsByClassName({class});
                if (els.length === 0) return null;
                return els[0].textContent || "";
            }})()"#,
            class = json!(self.container_class)
        )
    }

    /// Applies the phrase rule to the probed container text.
    pub fn classify(&self, container_text: Option<&str>) -> BannerProbe {
        match container_text {
            Some(text) if text.contains(&self.phrase) => BannerProbe::Present {
                text: self.phrase.clone(),
            },
            _ => BannerProbe::Absent,
        }
    }
}

/// Single instantaneous check, used to preempt actuation on a pending error.
pub async fn probe_once(page: &Page, spec: &BannerSpec) -> BannerProbe {
    match cdp_bridge::eval_opt_string(page, &spec.probe_script()).await {
        Ok(text) => spec.classify(text.as_deref()),
        Err(err) => BannerProbe::Unknown {
            detail: err.to_string(),
        },
    }
}

/// Poll for the banner until it shows up or the deadline passes. `Unknown`
/// is returned only when every probe in the window faulted.
pub async fn watch(page: &Page, spec: &BannerSpec, timeout: Duration, poll_interval: Duration) -> BannerProbe {
    let deadline = Instant::now() + timeout;
    let mut saw_clean_probe = false;
    let mut last_fault: Option<String> = None;

    loop {
        match probe_once(page, spec).await {
            BannerProbe::Present { text } => {
                debug!("error banner appeared during watch");
                return BannerProbe::Present { text };
            }
            BannerProbe::Absent => saw_clean_probe = true,
            BannerProbe::Unknown { detail } => last_fault = Some(detail),
        }

        if Instant::now() >= deadline {
            break;
        }
        sleep(poll_interval).await;
    }

    match (saw_clean_probe, last_fault) {
        (false, Some(detail)) => BannerProbe::Unknown { detail },
        _ => BannerProbe::Absent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_requires_both_container_and_phrase() {
        let spec = BannerSpec::default();

        assert_eq!(spec.classify(None), BannerProbe::Absent);
        assert_eq!(
            spec.classify(Some("Your message was sent.")),
            BannerProbe::Absent
        );
        match spec.classify(Some("Sorry, looks like something isn't working. Try again later.")) {
            BannerProbe::Present { text } => {
                assert_eq!(text, "Sorry, looks like something isn't working.")
            }
            other => panic!("expected Present, got {other:?}"),
        }
    }

    #[test]
    fn probe_script_quotes_the_class_name() {
        let spec = BannerSpec::default();
        assert!(spec.probe_script().contains(r#""ant-error-container""#));
    }
}
