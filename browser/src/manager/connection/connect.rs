use chromiumoxide::Browser;
use futures::StreamExt;
use tokio::time::Duration;
use tokio::time::sleep;
use tracing::info;
use tracing::warn;

use super::super::BrowserManager;
use super::discover_ws_via_host_port;
use super::should_stop_handler;
use crate::BrowserError;
use crate::Result;

const ATTEMPT_BACKOFF: Duration = Duration::from_millis(200);
const DISCOVERY_WINDOW: Duration = Duration::from_secs(15);
const DISCOVERY_RETRY: Duration = Duration::from_millis(300);

impl BrowserManager {
    /// Attaches to the configured Chrome. A configured WebSocket URL wins over
    /// port discovery.
    pub async fn connect(&self) -> Result<()> {
        if self.browser.lock().await.is_some() {
            return Ok(());
        }

        let ws = match (&self.config.connect_ws, self.config.connect_port) {
            (Some(ws), _) => ws.clone(),
            (None, Some(port)) => self.discover_ws(port).await?,
            (None, None) => {
                return Err(BrowserError::CdpError(
                    "No CDP port or WebSocket configured for Chrome connection".to_string(),
                ));
            }
        };
        self.connect_ws(&ws).await
    }

    /// Polls `/json/version` so a Chrome that is still starting gets a chance
    /// to bring up its debug endpoint.
    async fn discover_ws(&self, port: u16) -> Result<String> {
        let host = self.config.connect_host.as_str();
        info!("discovering Chrome WebSocket URL via {host}:{port}");
        let deadline = tokio::time::Instant::now() + DISCOVERY_WINDOW;
        loop {
            match discover_ws_via_host_port(host, port).await {
                Ok(ws) => {
                    info!("discovered Chrome WebSocket {ws}");
                    return Ok(ws);
                }
                Err(err) if tokio::time::Instant::now() >= deadline => {
                    return Err(BrowserError::CdpError(format!(
                        "Failed to discover Chrome WebSocket on port {port} within {}s: {err}",
                        DISCOVERY_WINDOW.as_secs()
                    )));
                }
                Err(_) => sleep(DISCOVERY_RETRY).await,
            }
        }
    }

    async fn connect_ws(&self, ws: &str) -> Result<()> {
        let attempts = self.config.connect_attempts.max(1);
        let attempt_timeout = self.config.connect_attempt_timeout;
        let mut last_err: Option<String> = None;

        for attempt in 1..=attempts {
            info!(
                "CDP connect attempt {attempt}/{attempts} (timeout={}ms)",
                attempt_timeout.as_millis()
            );
            let ws_owned = ws.to_string();
            let handle = tokio::spawn(async move { Browser::connect(ws_owned).await });
            match tokio::time::timeout(attempt_timeout, handle).await {
                Ok(Ok(Ok((browser, mut handler)))) => {
                    let browser_slot = self.browser.clone();
                    let task = tokio::spawn(async move {
                        let mut consecutive_errors = 0u32;
                        while let Some(result) = handler.next().await {
                            if should_stop_handler(result, &mut consecutive_errors) {
                                break;
                            }
                        }
                        warn!("CDP event handler ended; clearing browser state");
                        *browser_slot.lock().await = None;
                    });
                    *self.event_task.lock().await = Some(task);
                    *self.browser.lock().await = Some(browser);
                    info!("connected to Chrome on attempt {attempt}");
                    return Ok(());
                }
                Ok(Ok(Err(e))) => {
                    let msg = format!("CDP WebSocket connect failed: {e}");
                    warn!("{msg}");
                    last_err = Some(msg);
                }
                Ok(Err(join_err)) => {
                    let msg = format!("Join error during connect attempt: {join_err}");
                    warn!("{msg}");
                    last_err = Some(msg);
                }
                Err(_) => {
                    warn!(
                        "CDP connect attempt {attempt} timed out after {}ms",
                        attempt_timeout.as_millis()
                    );
                }
            }
            if attempt < attempts {
                sleep(ATTEMPT_BACKOFF).await;
            }
        }

        let base = "CDP WebSocket connect failed after all attempts".to_string();
        Err(BrowserError::CdpError(match last_err {
            Some(e) => format!("{base}: {e}"),
            None => base,
        }))
    }
}
