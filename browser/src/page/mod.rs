use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use chromiumoxide::page::Page as CdpPage;
use qtube_core::PageMetadata;
use qtube_core::player_bridge::NativePlayer;
use qtube_core::player_bridge::PlayerError;
use qtube_core::player_bridge::PlayerProbe;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::Result;

mod scripts;

use scripts::PLAYER_PROBE_JS;
use scripts::PlayerCommand;
use scripts::VIDEO_TITLE_JS;

const READY_STATE_INTERVAL: Duration = Duration::from_millis(250);

/// A YouTube watch page opened over CDP. Player calls run in the page main
/// context, where the native player object lives.
pub struct WatchPage {
    cdp_page: Arc<CdpPage>,
    url: String,
}

impl WatchPage {
    pub fn new(cdp_page: CdpPage, url: String) -> Self {
        Self {
            cdp_page: Arc::new(cdp_page),
            url,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Polls `document.readyState` until the document is complete or
    /// `timeout` passes. Gives up quietly; the player bridge keeps polling.
    pub async fn wait_until_loaded(&self, timeout: Duration) {
        let start = Instant::now();
        loop {
            let state = self
                .cdp_page
                .evaluate("document.readyState")
                .await
                .ok()
                .and_then(|r| r.value().and_then(|v| v.as_str().map(str::to_string)));
            if state.as_deref() == Some("complete") {
                debug!("{} loaded", self.url);
                return;
            }
            if start.elapsed() >= timeout {
                warn!(
                    "{} still loading after {}ms (readyState={state:?})",
                    self.url,
                    timeout.as_millis()
                );
                return;
            }
            tokio::time::sleep(READY_STATE_INTERVAL).await;
        }
    }

    async fn evaluate(&self, script: String) -> Result<Option<Value>> {
        let result = self.cdp_page.evaluate(script).await?;
        Ok(result.value().cloned())
    }

    async fn run_command(&self, command: PlayerCommand) -> std::result::Result<(), PlayerError> {
        let value = self
            .evaluate(scripts::player_command_script(command))
            .await
            .map_err(|e| PlayerError::Call(e.to_string()))?;
        scripts::parse_command_outcome(value.as_ref())
    }
}

#[async_trait]
impl NativePlayer for WatchPage {
    async fn probe(&self) -> Option<PlayerProbe> {
        match self.evaluate(PLAYER_PROBE_JS.to_string()).await {
            Ok(value) => scripts::parse_probe(value.as_ref()),
            Err(e) => {
                debug!("player probe failed: {e}");
                None
            }
        }
    }

    async fn seek_to(&self, seconds: f64) -> std::result::Result<(), PlayerError> {
        self.run_command(PlayerCommand::Seek(seconds)).await
    }

    async fn play(&self) -> std::result::Result<(), PlayerError> {
        self.run_command(PlayerCommand::Play).await
    }
}

#[async_trait]
impl PageMetadata for WatchPage {
    async fn video_title(&self) -> Option<String> {
        match self.evaluate(VIDEO_TITLE_JS.to_string()).await {
            Ok(value) => scripts::parse_title(value.as_ref()),
            Err(e) => {
                warn!("reading video title failed: {e}");
                None
            }
        }
    }
}
