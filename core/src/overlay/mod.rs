//! The per-tab content script: owns the overlay UI state, answers the
//! coordinator's commands, and turns timestamp clicks into page seek events.

mod state;

use std::sync::Arc;

use qtube_gemini::AnswerEngine;
use qtube_gemini::MANUAL_TRANSCRIPT_DESCRIPTION;
use qtube_gemini::UNKNOWN_VIDEO_TITLE;
use qtube_gemini::compose_grounding_prompt;
use qtube_protocol::ExtensionMessage;
use qtube_protocol::ExtensionReply;
use qtube_protocol::PageEvent;
use qtube_protocol::ParsedAnswer;
use qtube_protocol::ResponsePayload;
use qtube_protocol::SEEK_EVENT_NAME;
use qtube_protocol::SeekDetail;
use qtube_protocol::TabId;
use qtube_protocol::VideoData;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::info;
use tracing::warn;

pub use state::OverlayState;
pub use state::ResponsePanel;

use crate::channel::RuntimeSender;
use crate::channel::TabEnvelope;
use crate::channel::respond;
use crate::host::ContentScriptHandle;
use crate::host::ContentScriptLauncher;
use crate::page::PageContext;

pub const EMPTY_TRANSCRIPT_ALERT: &str = "Please paste the video transcript first.";
pub const ANALYZING_MESSAGE: &str = "Analyzing transcript...";

const COMMAND_CAPACITY: usize = 32;

/// Where the analyze button sends its request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisRoute {
    /// Call the answer engine from the content script.
    #[default]
    Direct,
    /// Ask the background coordinator to call it on our behalf.
    Coordinator,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlaySettings {
    pub analysis_route: AnalysisRoute,
}

/// User interactions reported by the rendered overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent {
    CloseClicked,
    ErrorCloseClicked,
    /// A click inside the backdrop. `target_is_root` is true only when the
    /// backdrop itself, not one of its children, was clicked.
    BackgroundClicked { target_is_root: bool },
    TranscriptInput(String),
    AnalyzeClicked,
    TimestampClicked { time: f64 },
}

/// Sender side of a surface's DOM events.
#[derive(Debug, Clone)]
pub struct OverlayEvents {
    tx: mpsc::UnboundedSender<OverlayEvent>,
}

impl OverlayEvents {
    /// Returns false once the content script is gone.
    pub fn emit(&self, event: OverlayEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Renders overlay state into whatever UI the host provides.
pub trait OverlaySurface: Send + Sync {
    fn render(&self, state: &OverlayState);

    fn remove(&self);

    /// Blocking notice, used for input the overlay refuses.
    fn alert(&self, message: &str);
}

pub trait OverlaySurfaceFactory: Send + Sync {
    fn create(&self, tab: TabId, events: OverlayEvents) -> Arc<dyn OverlaySurface>;
}

#[derive(Debug)]
enum Completion {
    Analysis {
        session: u64,
        outcome: Result<ParsedAnswer, String>,
    },
}

pub struct OverlayController {
    tab: TabId,
    page: Arc<PageContext>,
    surface: Arc<dyn OverlaySurface>,
    runtime: RuntimeSender,
    engine: Arc<dyn AnswerEngine>,
    settings: OverlaySettings,
    state: Option<OverlayState>,
    next_session: u64,
    completions: mpsc::UnboundedSender<Completion>,
}

impl OverlayController {
    pub fn spawn(
        tab: TabId,
        page: Arc<PageContext>,
        surfaces: &dyn OverlaySurfaceFactory,
        runtime: RuntimeSender,
        engine: Arc<dyn AnswerEngine>,
        settings: OverlaySettings,
    ) -> ContentScriptHandle {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let surface = surfaces.create(tab, OverlayEvents { tx: events_tx });
        let controller = Self {
            tab,
            page,
            surface,
            runtime,
            engine,
            settings,
            state: None,
            next_session: 0,
            completions: completions_tx,
        };
        let task = tokio::spawn(controller.run(commands_rx, events_rx, completions_rx));
        ContentScriptHandle::new(commands_tx, task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<TabEnvelope>,
        mut events: mpsc::UnboundedReceiver<OverlayEvent>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        self.announce_ready().await;
        loop {
            tokio::select! {
                biased;
                Some(completion) = completions.recv() => self.handle_completion(completion),
                Some(event) = events.recv() => self.handle_event(event).await,
                envelope = commands.recv() => match envelope {
                    Some(envelope) => self.handle_command(envelope).await,
                    None => break,
                },
            }
        }
        if self.state.take().is_some() {
            self.surface.remove();
        }
        debug!(tab = %self.tab, "content script stopped");
    }

    async fn announce_ready(&self) {
        if let Err(err) = self.runtime.notify(ExtensionMessage::ContentScriptReady).await {
            debug!(tab = %self.tab, "nobody listened for readiness announcement: {err}");
        }
    }

    async fn handle_command(&mut self, envelope: TabEnvelope) {
        let TabEnvelope { message, reply } = envelope;
        let kind = message.kind();
        let response = match message {
            ExtensionMessage::Ping => Some(ExtensionReply::pong()),
            ExtensionMessage::ShowOverlay { question } => {
                self.show(question).await;
                None
            }
            ExtensionMessage::HideOverlay => {
                self.hide();
                Some(ExtensionReply::ack())
            }
            ExtensionMessage::UpdateOverlay { response } => {
                self.update(response);
                Some(ExtensionReply::ack())
            }
            ExtensionMessage::ContentScriptReady
            | ExtensionMessage::ProcessManualTranscript { .. } => {
                debug!(tab = %self.tab, "ignoring {kind} sent to content script");
                None
            }
        };
        respond(reply, response);
    }

    async fn show(&mut self, question: String) {
        if self.state.take().is_some() {
            debug!(tab = %self.tab, "replacing existing overlay");
            self.surface.remove();
        }
        self.next_session += 1;
        let state = OverlayState::new(self.next_session, question);
        self.surface.render(&state);
        self.state = Some(state);
        info!(tab = %self.tab, session = self.next_session, "overlay shown");

        if self.page.inject_player_bridge().await {
            info!(tab = %self.tab, "player bridge injected");
        }
    }

    fn hide(&mut self) {
        match self.state.take() {
            Some(state) => {
                self.surface.remove();
                info!(tab = %self.tab, session = state.session(), "overlay hidden");
            }
            None => debug!(tab = %self.tab, "hide requested with no overlay present"),
        }
    }

    fn update(&mut self, response: ResponsePayload) {
        let Some(state) = self.state.as_mut() else {
            debug!(tab = %self.tab, "update requested with no overlay present");
            return;
        };
        state.panel = match response {
            ResponsePayload::Loading(loading) => ResponsePanel::Loading {
                message: loading.message,
            },
            ResponsePayload::Answered(answer) => ResponsePanel::Answered(ParsedAnswer {
                answer: answer.answer,
                timestamps: answer.timestamps,
            }),
            ResponsePayload::Failed(failure) => ResponsePanel::Errored(failure.error),
        };
        self.surface.render(state);
    }

    async fn handle_event(&mut self, event: OverlayEvent) {
        match event {
            OverlayEvent::CloseClicked | OverlayEvent::ErrorCloseClicked => self.hide(),
            OverlayEvent::BackgroundClicked { target_is_root } => {
                if target_is_root {
                    self.hide();
                }
            }
            OverlayEvent::TranscriptInput(text) => {
                if let Some(state) = self.state.as_mut() {
                    state.transcript = text;
                }
            }
            OverlayEvent::AnalyzeClicked => self.start_analysis(),
            OverlayEvent::TimestampClicked { time } => self.seek(time),
        }
    }

    fn start_analysis(&mut self) {
        let Some(state) = self.state.as_mut() else {
            debug!(tab = %self.tab, "analyze clicked with no overlay present");
            return;
        };
        if !state.analyze_enabled {
            debug!(tab = %self.tab, "analysis already running");
            return;
        }
        let transcript = state.transcript.trim().to_string();
        if transcript.is_empty() {
            self.surface.alert(EMPTY_TRANSCRIPT_ALERT);
            return;
        }

        state.analyze_enabled = false;
        state.transcript_visible = false;
        state.panel = ResponsePanel::Loading {
            message: Some(ANALYZING_MESSAGE.to_string()),
        };
        self.surface.render(state);

        let session = state.session();
        let question = state.question().to_string();
        let route = self.settings.analysis_route;
        let page = Arc::clone(&self.page);
        let engine = Arc::clone(&self.engine);
        let runtime = self.runtime.clone();
        let completions = self.completions.clone();
        let tab = self.tab;
        tokio::spawn(async move {
            let video = VideoData {
                video_title: page
                    .video_title()
                    .await
                    .unwrap_or_else(|| UNKNOWN_VIDEO_TITLE.to_string()),
                video_description: MANUAL_TRANSCRIPT_DESCRIPTION.to_string(),
                video_transcript: transcript,
            };
            debug!(%tab, session, ?route, "requesting transcript analysis");
            let outcome = match route {
                AnalysisRoute::Direct => {
                    let prompt = compose_grounding_prompt(&video, &question);
                    engine.ask(&prompt).await.map_err(|err| err.to_string())
                }
                AnalysisRoute::Coordinator => analyze_via_coordinator(&runtime, question, video).await,
            };
            let _ = completions.send(Completion::Analysis { session, outcome });
        });
    }

    fn handle_completion(&mut self, completion: Completion) {
        let Completion::Analysis { session, outcome } = completion;
        let Some(state) = self.state.as_mut().filter(|state| state.session() == session) else {
            debug!(tab = %self.tab, session, "overlay closed before analysis finished; dropping result");
            return;
        };
        state.panel = match outcome {
            Ok(parsed) => {
                info!(
                    tab = %self.tab,
                    session,
                    citations = parsed.timestamps.len(),
                    "analysis finished"
                );
                ResponsePanel::Answered(parsed)
            }
            Err(message) => {
                warn!(tab = %self.tab, session, "analysis failed: {message}");
                ResponsePanel::Errored(message)
            }
        };
        if !state.analyze_enabled {
            state.analyze_enabled = true;
        }
        self.surface.render(state);
    }

    fn seek(&self, time: f64) {
        let Some(detail) = SeekDetail::new(time) else {
            warn!(tab = %self.tab, "ignoring seek to invalid time {time}");
            return;
        };
        match self.page.dispatch(PageEvent::SeekVideo(detail)) {
            0 => warn!(tab = %self.tab, "no listener for {SEEK_EVENT_NAME}; seek to {time}s dropped"),
            listeners => debug!(tab = %self.tab, listeners, "dispatched {SEEK_EVENT_NAME} for {time}s"),
        }
    }
}

async fn analyze_via_coordinator(
    runtime: &RuntimeSender,
    question: String,
    video_data: VideoData,
) -> Result<ParsedAnswer, String> {
    let message = ExtensionMessage::ProcessManualTranscript {
        question,
        video_data,
    };
    match runtime.send(message).await {
        Ok(Some(ExtensionReply::Transcript(reply))) => reply.into_result(),
        Ok(other) => Err(format!("unexpected reply to transcript request: {other:?}")),
        Err(err) => Err(err.to_string()),
    }
}

/// Starts an [`OverlayController`] for each content script injection.
pub struct OverlayLauncher {
    surfaces: Arc<dyn OverlaySurfaceFactory>,
    engine: Arc<dyn AnswerEngine>,
    settings: OverlaySettings,
}

impl OverlayLauncher {
    pub fn new(
        surfaces: Arc<dyn OverlaySurfaceFactory>,
        engine: Arc<dyn AnswerEngine>,
        settings: OverlaySettings,
    ) -> Self {
        Self {
            surfaces,
            engine,
            settings,
        }
    }
}

impl ContentScriptLauncher for OverlayLauncher {
    fn launch(
        &self,
        tab: TabId,
        page: Arc<PageContext>,
        runtime: RuntimeSender,
    ) -> ContentScriptHandle {
        OverlayController::spawn(
            tab,
            page,
            self.surfaces.as_ref(),
            runtime,
            Arc::clone(&self.engine),
            self.settings.clone(),
        )
    }
}
