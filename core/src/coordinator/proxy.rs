use qtube_gemini::compose_grounding_prompt;
use qtube_protocol::ExtensionMessage;
use qtube_protocol::ExtensionReply;
use qtube_protocol::TabId;
use qtube_protocol::TranscriptReply;
use qtube_protocol::VideoData;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::SessionCoordinator;
use crate::channel::RuntimeEnvelope;
use crate::channel::respond;

pub(super) const INACTIVE_SENDER_ERROR: &str =
    "Transcript requests are only accepted from the active tab.";

impl SessionCoordinator {
    /// Handles one message addressed to the background runtime. `sender` is
    /// the originating tab, `None` for the popup.
    pub async fn handle_runtime_message(
        &self,
        sender: Option<TabId>,
        message: ExtensionMessage,
    ) -> Option<ExtensionReply> {
        match message {
            ExtensionMessage::ContentScriptReady => {
                match sender {
                    Some(tab) => self.resolve_ready(tab).await,
                    None => debug!("readiness announcement without a sender tab"),
                }
                None
            }
            ExtensionMessage::ProcessManualTranscript {
                question,
                video_data,
            } => Some(ExtensionReply::Transcript(
                self.process_manual_transcript(sender, &question, &video_data)
                    .await,
            )),
            other => {
                debug!(?sender, "ignoring runtime message {}", other.kind());
                None
            }
        }
    }

    async fn process_manual_transcript(
        &self,
        sender: Option<TabId>,
        question: &str,
        video: &VideoData,
    ) -> TranscriptReply {
        let active = self.inner.tabs.active_tab().await;
        let Some(tab) = sender.filter(|tab| active.as_ref().is_some_and(|info| info.id == *tab))
        else {
            warn!(?sender, "rejecting transcript request from inactive tab");
            return TranscriptReply::failed(INACTIVE_SENDER_ERROR);
        };

        info!(%tab, chars = video.video_transcript.len(), "analyzing transcript for content script");
        let prompt = compose_grounding_prompt(video, question);
        match self.inner.engine.ask(&prompt).await {
            Ok(parsed) => TranscriptReply::answered(parsed),
            Err(err) => {
                warn!(%tab, "transcript analysis failed: {err}");
                TranscriptReply::failed(err.to_string())
            }
        }
    }

    /// Serves the runtime channel. Each request runs on its own task so a slow
    /// analysis does not hold up readiness announcements.
    pub fn spawn_runtime_listener(&self, mut rx: mpsc::Receiver<RuntimeEnvelope>) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let this = this.clone();
                tokio::spawn(async move {
                    let RuntimeEnvelope {
                        sender,
                        message,
                        reply,
                    } = envelope;
                    let response = this.handle_runtime_message(sender, message).await;
                    respond(reply, response);
                });
            }
            debug!("runtime channel closed");
        })
    }
}
