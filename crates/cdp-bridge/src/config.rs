//! Launch configuration for the managed Chromium instance.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings applied when launching the browser process.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Run without a visible window. Interactive capture flows turn this off.
    pub headless: bool,
    /// Explicit Chromium/Chrome binary. Falls back to auto-detection.
    pub executable: Option<PathBuf>,
    /// Profile directory. A fresh temporary profile is used when unset.
    pub user_data_dir: Option<PathBuf>,
    /// Often needed in docker/CI/restricted environments.
    pub no_sandbox: bool,
    /// Viewport size as (width, height).
    pub window_size: Option<(u32, u32)>,
    /// Route all traffic through this proxy (host:port), e.g. for the
    /// proxy-capture interception strategy.
    pub proxy_server: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            user_data_dir: None,
            no_sandbox: false,
            window_size: None,
            proxy_server: None,
        }
    }
}

impl BridgeConfig {
    pub fn headed(mut self) -> Self {
        self.headless = false;
        self
    }

    pub fn with_proxy(mut self, addr: impl Into<String>) -> Self {
        self.proxy_server = Some(addr.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_headless_without_proxy() {
        let config = BridgeConfig::default();
        assert!(config.headless);
        assert!(config.proxy_server.is_none());
    }

    #[test]
    fn builder_helpers_override_fields() {
        let config = BridgeConfig::default().headed().with_proxy("127.0.0.1:8888");
        assert!(!config.headless);
        assert_eq!(config.proxy_server.as_deref(), Some("127.0.0.1:8888"));
    }
}
