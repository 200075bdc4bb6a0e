use std::time::Duration;

use qtube_core::config::BrowserConnectConfig;

/// How to reach an already running Chrome with remote debugging enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserConfig {
    pub connect_host: String,
    /// DevTools port; used to discover the WebSocket URL via `/json/version`.
    pub connect_port: Option<u16>,
    /// Full browser WebSocket URL; takes precedence over the port.
    pub connect_ws: Option<String>,
    pub connect_attempts: u32,
    pub connect_attempt_timeout: Duration,
    /// How long to wait for a freshly opened page to finish loading.
    pub page_load_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            connect_host: "127.0.0.1".to_string(),
            connect_port: None,
            connect_ws: None,
            connect_attempts: 3,
            connect_attempt_timeout: Duration::from_secs(5),
            page_load_timeout: Duration::from_secs(20),
        }
    }
}

impl From<&BrowserConnectConfig> for BrowserConfig {
    fn from(config: &BrowserConnectConfig) -> Self {
        Self {
            connect_host: config.host.clone(),
            connect_port: config.port,
            connect_ws: config.ws.clone(),
            connect_attempts: config.attempts.max(1),
            connect_attempt_timeout: config.attempt_timeout,
            ..Self::default()
        }
    }
}
