//! Layered runtime configuration.
//!
//! Values resolve through three layers: built-in defaults, an optional JSON
//! config file, then `FORMPROOF_*` environment overrides. Every setting the
//! pipeline consults lives here; nothing reads the environment ad hoc.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cdp_bridge::BridgeConfig;
use page_actions::{ActuatorTuning, BannerSpec};
use request_tap::StrategyKind;
use serde::{Deserialize, Serialize};
use session_store::CookieAllowList;
use tracing::info;

use crate::errors::ConfigError;

/// Root configuration for the verification pipeline.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub portal: PortalConfig,
    pub session: SessionConfig,
    /// Optional scripted-login credentials. Absent means the capture flow
    /// waits for a human to log in.
    pub credentials: Option<Credentials>,
    pub submission: SubmissionConfig,
    pub timeouts: TimeoutConfig,
    pub intercept: InterceptConfig,
    pub browser: BrowserConfig,
    pub banner: BannerConfig,
    pub login: LoginConfig,
}

/// Portal entry points.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Interactive login page used by `capture`.
    pub login_url: String,
    /// Authenticated landing page `verify` starts from.
    pub start_url: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            login_url: "https://www.anthem.com/ca/login/".to_string(),
            start_url: "https://membersecure.anthem.com/member/find-care".to_string(),
        }
    }
}

/// Session snapshot location and filtering.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Where the captured snapshot lives.
    pub snapshot_path: PathBuf,
    /// Cookie-name prefixes replayed into the automated context. Empty
    /// means the built-in allow list.
    pub allow_prefixes: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("session.json"),
            allow_prefixes: Vec::new(),
        }
    }
}

impl SessionConfig {
    pub fn allow_list(&self) -> CookieAllowList {
        if self.allow_prefixes.is_empty() {
            CookieAllowList::default()
        } else {
            CookieAllowList::new(self.allow_prefixes.clone())
        }
    }
}

/// Login credentials for the scripted capture flow.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Payloads typed into the form's free-text fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    pub contact_email: String,
    pub detail_text: String,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            contact_email: "example@example.com".to_string(),
            detail_text: "This is additional information about my grievance or appeal."
                .to_string(),
        }
    }
}

/// Every timing knob in one place, in milliseconds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for an element to appear in the DOM.
    pub locate_ms: u64,
    /// Interval between presence polls.
    pub poll_ms: u64,
    /// Grace period between locating an element and interacting with it.
    pub stabilize_ms: u64,
    /// How long the pre-action banner probe may take.
    pub banner_probe_ms: u64,
    /// Inter-character delay for slow typing.
    pub per_char_delay_ms: u64,
    /// How long to wait for the submission request after the flow finishes.
    pub intercept_wait_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            locate_ms: 10_000,
            poll_ms: 250,
            stabilize_ms: 2_000,
            banner_probe_ms: 3_000,
            per_char_delay_ms: 200,
            intercept_wait_ms: 20_000,
        }
    }
}

impl TimeoutConfig {
    pub fn tuning(&self) -> ActuatorTuning {
        ActuatorTuning {
            locate_timeout: Duration::from_millis(self.locate_ms),
            poll_interval: Duration::from_millis(self.poll_ms),
            stabilize_delay: Duration::from_millis(self.stabilize_ms),
            per_char_delay: Duration::from_millis(self.per_char_delay_ms),
        }
    }

    pub fn banner_probe(&self) -> Duration {
        Duration::from_millis(self.banner_probe_ms)
    }

    pub fn intercept_wait(&self) -> Duration {
        Duration::from_millis(self.intercept_wait_ms)
    }
}

/// Request interception settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct InterceptConfig {
    /// Glob matched against outgoing request URLs.
    pub url_pattern: String,
    pub strategy: StrategyKind,
    /// Bind address for the proxy-capture strategy. Port 0 lets the OS pick.
    pub proxy_bind: String,
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            url_pattern: "*new-message*".to_string(),
            strategy: StrategyKind::CdpFetch,
            proxy_bind: "127.0.0.1:0".to_string(),
        }
    }
}

/// Browser launch settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub user_data_dir: Option<PathBuf>,
    pub no_sandbox: bool,
    /// Viewport size as (width, height).
    pub window: Option<(u32, u32)>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            user_data_dir: None,
            no_sandbox: false,
            window: None,
        }
    }
}

impl BrowserConfig {
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            headless: self.headless,
            executable: self.executable.clone(),
            user_data_dir: self.user_data_dir.clone(),
            no_sandbox: self.no_sandbox,
            window_size: self.window,
            proxy_server: None,
        }
    }
}

/// What counts as the site's failure banner.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BannerConfig {
    pub container_class: String,
    pub phrase: String,
}

impl Default for BannerConfig {
    fn default() -> Self {
        let spec = BannerSpec::default();
        Self {
            container_class: spec.container_class,
            phrase: spec.phrase,
        }
    }
}

impl BannerConfig {
    pub fn spec(&self) -> BannerSpec {
        BannerSpec {
            container_class: self.container_class.clone(),
            phrase: self.phrase.clone(),
        }
    }
}

/// Element ids on the portal's login page, for the scripted capture flow.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    pub username_field: String,
    pub password_field: String,
    pub submit_button: String,
    /// Element whose appearance signals a finished login.
    pub post_login_marker: String,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            username_field: "txtUsername".to_string(),
            password_field: "txtPassword".to_string(),
            submit_button: "btnLogin".to_string(),
            post_login_marker: "dashboardElement".to_string(),
        }
    }
}

impl AppConfig {
    /// Resolve the effective configuration: defaults, then the file, then
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let content =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                        path: path.to_path_buf(),
                        source,
                    })?;
                let config = serde_json::from_str(&content).map_err(|source| {
                    ConfigError::Parse {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                info!(path = %path.display(), "loaded config file");
                config
            }
            Some(path) => {
                info!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Environment overrides, the highest layer. The lookup is injected so
    /// tests stay off the process environment.
    fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(path) = get("FORMPROOF_SNAPSHOT") {
            self.session.snapshot_path = PathBuf::from(path);
        }
        if let Some(value) = get("FORMPROOF_HEADLESS") {
            if let Ok(headless) = value.parse() {
                self.browser.headless = headless;
            }
        }
        if let Some(pattern) = get("FORMPROOF_URL_PATTERN") {
            self.intercept.url_pattern = pattern;
        }
        if let (Some(username), Some(password)) =
            (get("FORMPROOF_USERNAME"), get("FORMPROOF_PASSWORD"))
        {
            self.credentials = Some(Credentials { username, password });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_target_the_member_portal() {
        let config = AppConfig::default();
        assert_eq!(config.portal.login_url, "https://www.anthem.com/ca/login/");
        assert_eq!(config.intercept.url_pattern, "*new-message*");
        assert_eq!(config.timeouts.locate_ms, 10_000);
        assert_eq!(config.timeouts.intercept_wait_ms, 20_000);
        assert!(config.browser.headless);
        assert!(config.credentials.is_none());
    }

    #[test]
    fn file_layer_overrides_only_what_it_names() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"browser": {{"headless": false}}, "intercept": {{"strategy": "proxy-capture"}}}}"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert!(!config.browser.headless);
        assert_eq!(config.intercept.strategy, StrategyKind::ProxyCapture);
        // Untouched sections keep their defaults.
        assert_eq!(config.intercept.url_pattern, "*new-message*");
        assert_eq!(config.timeouts.poll_ms, 250);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load(Some(Path::new("/nonexistent/formproof.json"))).unwrap();
        assert_eq!(config.session.snapshot_path, PathBuf::from("session.json"));
    }

    #[test]
    fn env_layer_wins() {
        let mut env = HashMap::new();
        env.insert("FORMPROOF_SNAPSHOT", "/tmp/alt.json");
        env.insert("FORMPROOF_USERNAME", "member01");
        env.insert("FORMPROOF_PASSWORD", "hunter2");

        let mut config = AppConfig::default();
        config.apply_env(|name| env.get(name).map(|value| value.to_string()));

        assert_eq!(config.session.snapshot_path, PathBuf::from("/tmp/alt.json"));
        let credentials = config.credentials.unwrap();
        assert_eq!(credentials.username, "member01");
        assert_eq!(credentials.password, "hunter2");
    }

    #[test]
    fn custom_prefixes_replace_the_allow_list() {
        let mut config = SessionConfig::default();
        assert!(config.allow_list().permits("SMSESSION"));

        config.allow_prefixes = vec!["custom_".to_string()];
        let list = config.allow_list();
        assert!(list.permits("custom_token"));
        assert!(!list.permits("SMSESSION"));
    }
}
