use reqwest::Client;
use serde::Deserialize;
use tokio::time::Duration;
use tracing::debug;

use crate::BrowserError;
use crate::Result;

#[derive(Deserialize)]
pub(in super::super) struct JsonVersion {
    #[serde(rename = "webSocketDebuggerUrl")]
    pub(in super::super) web_socket_debugger_url: String,
}

/// Asks Chrome's DevTools HTTP endpoint for the browser WebSocket URL.
/// Proxy settings are ignored; the debug port is always local to the user.
pub(in super::super) async fn discover_ws_via_host_port(host: &str, port: u16) -> Result<String> {
    let url = format!("http://{host}:{port}/json/version");
    debug!("requesting Chrome version info from {url}");

    let client = Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| BrowserError::CdpError(format!("Failed to build HTTP client: {e}")))?;

    let resp = client.get(&url).send().await.map_err(|e| {
        BrowserError::CdpError(format!("Failed to connect to Chrome debug port: {e}"))
    })?;
    if !resp.status().is_success() {
        return Err(BrowserError::CdpError(format!(
            "Chrome /json/version returned {}",
            resp.status()
        )));
    }

    let body: JsonVersion = resp.json().await.map_err(|e| {
        BrowserError::CdpError(format!("Failed to parse Chrome debug response: {e}"))
    })?;
    Ok(body.web_socket_debugger_url)
}
