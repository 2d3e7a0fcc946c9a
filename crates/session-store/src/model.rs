//! Snapshot data model and the trust filter.

use chromiumoxide::cdp::browser_protocol::network::Cookie;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One cookie as captured from the browser. Identity is the `name` field;
/// `expires` is deliberately not carried, so a replayed cookie lives as a
/// session cookie in the target context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<String>,
}

impl StoredCookie {
    pub fn from_cdp(cookie: &Cookie) -> Self {
        Self {
            name: cookie.name.clone(),
            value: cookie.value.clone(),
            domain: cookie.domain.clone(),
            path: cookie.path.clone(),
            secure: cookie.secure,
            http_only: cookie.http_only,
            same_site: cookie.same_site.as_ref().map(|s| format!("{s:?}")),
        }
    }

    /// Value with the middle masked, for operator-facing listings.
    pub fn redacted_value(&self) -> String {
        let chars: Vec<char> = self.value.chars().collect();
        if chars.len() <= 6 {
            return "***".to_string();
        }
        let head: String = chars[..2].iter().collect();
        let tail: String = chars[chars.len() - 2..].iter().collect();
        format!("{head}***{tail}")
    }
}

/// All cookies read from one authenticated context at one point in time.
/// Immutable once captured; persisted raw and filtered only on use.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub captured_at: DateTime<Utc>,
    pub cookies: Vec<StoredCookie>,
}

impl SessionSnapshot {
    pub fn new(cookies: Vec<StoredCookie>) -> Self {
        Self {
            captured_at: Utc::now(),
            cookies,
        }
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Keep only cookies whose name matches the allow-list. Pure; the result
    /// is always a subset of `self` and filtering a filtered snapshot is a
    /// no-op.
    pub fn filter(&self, allow: &CookieAllowList) -> SessionSnapshot {
        SessionSnapshot {
            captured_at: self.captured_at,
            cookies: self
                .cookies
                .iter()
                .filter(|cookie| allow.permits(&cookie.name))
                .cloned()
                .collect(),
        }
    }
}

/// Name prefixes marking trust-relevant cookies: the SiteMinder session, the
/// OpenID-Connect session and state markers, remember-me, the login session
/// id and the post-login target marker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CookieAllowList {
    prefixes: Vec<String>,
}

impl Default for CookieAllowList {
    fn default() -> Self {
        Self {
            prefixes: [
                "SMSESSION",
                "mod_auth_openidc_session",
                "mod_auth_openidc_state_",
                "pfrememberme",
                "lsid",
                "target",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

impl CookieAllowList {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    pub fn permits(&self, cookie_name: &str) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| cookie_name.starts_with(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(name: &str, value: &str) -> StoredCookie {
        StoredCookie {
            name: name.to_string(),
            value: value.to_string(),
            domain: ".example.com".to_string(),
            path: "/".to_string(),
            secure: true,
            http_only: true,
            same_site: Some("Lax".to_string()),
        }
    }

    #[test]
    fn filter_keeps_only_allow_listed_names() {
        let snapshot = SessionSnapshot::new(vec![
            cookie("SMSESSION", "abc"),
            cookie("trackingId", "xyz"),
            cookie("lsid", "123"),
        ]);

        let filtered = snapshot.filter(&CookieAllowList::default());

        let names: Vec<&str> = filtered.cookies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["SMSESSION", "lsid"]);
        assert_eq!(filtered.cookies[0].value, "abc");
        assert_eq!(filtered.cookies[1].value, "123");
    }

    #[test]
    fn filter_is_idempotent() {
        let snapshot = SessionSnapshot::new(vec![
            cookie("SMSESSION", "abc"),
            cookie("JSESSIONID", "drop-me"),
            cookie("mod_auth_openidc_state_4f2a", "s"),
        ]);
        let allow = CookieAllowList::default();

        let once = snapshot.filter(&allow);
        let twice = once.filter(&allow);

        assert_eq!(once, twice);
    }

    #[test]
    fn filter_result_is_subset_with_unchanged_values() {
        let snapshot = SessionSnapshot::new(vec![
            cookie("pfrememberme", "r1"),
            cookie("target", "t1"),
            cookie("analytics", "a1"),
        ]);

        let filtered = snapshot.filter(&CookieAllowList::default());

        assert!(filtered.len() <= snapshot.len());
        for kept in &filtered.cookies {
            assert!(snapshot.cookies.contains(kept));
        }
    }

    #[test]
    fn prefix_matching_covers_state_markers() {
        let allow = CookieAllowList::default();
        assert!(allow.permits("mod_auth_openidc_state_a1b2c3"));
        assert!(allow.permits("mod_auth_openidc_session"));
        assert!(!allow.permits("mod_auth_other"));
    }

    #[test]
    fn redaction_masks_the_middle() {
        assert_eq!(cookie("a", "0123456789").redacted_value(), "01***89");
        assert_eq!(cookie("a", "short").redacted_value(), "***");
    }
}
