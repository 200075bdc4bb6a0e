use std::time::Duration;

use qtube_protocol::ExtensionMessage;
use qtube_protocol::ExtensionReply;
use qtube_protocol::TabId;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::SessionCoordinator;
use crate::error::QtubeErr;
use crate::error::Result;

impl SessionCoordinator {
    /// Sends `message` to the tab, retrying connection failures up to
    /// `max_retries` times with `backoff` between attempts.
    pub async fn send_with_retry(
        &self,
        tab: TabId,
        message: ExtensionMessage,
        max_retries: u32,
        backoff: Duration,
    ) -> Result<Option<ExtensionReply>> {
        let kind = message.kind();
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.inner.tabs.send_message(tab, message.clone()).await {
                Ok(reply) => {
                    if attempt > 1 {
                        info!(%tab, attempt, "{kind} delivered after retry");
                    }
                    return Ok(reply);
                }
                Err(err) if err.is_connection_error() => {
                    if attempt > max_retries {
                        warn!(%tab, attempt, "giving up on {kind}: {err}");
                        return Err(QtubeErr::DeliveryExhausted {
                            tab,
                            message: kind,
                            attempts: attempt,
                            last_error: err,
                        });
                    }
                    debug!(
                        %tab,
                        attempt,
                        "{kind} not delivered ({err}); retrying in {}ms",
                        backoff.as_millis()
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => {
                    return Err(QtubeErr::Delivery {
                        tab,
                        message: kind,
                        source: err,
                    });
                }
            }
        }
    }
}
