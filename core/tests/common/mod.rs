#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use qtube_core::PageContext;
use qtube_core::PageMetadata;
use qtube_core::coordinator::PopupSurface;
use qtube_core::coordinator::StatusKind;
use qtube_core::overlay::OverlayEvents;
use qtube_core::overlay::OverlayState;
use qtube_core::overlay::OverlaySurface;
use qtube_core::overlay::OverlaySurfaceFactory;
use qtube_core::player_bridge::NativePlayer;
use qtube_core::player_bridge::PlayerError;
use qtube_core::player_bridge::PlayerProbe;
use qtube_core::player_bridge::PlayerSettings;
use qtube_core::protocol::TabId;
use serde_json::Value;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path_regex;

pub const WATCH_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
pub const TITLE: &str = "Rust in Production";

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Seek(f64),
    Play,
}

#[derive(Default)]
pub struct FakePlayer {
    ready: AtomicBool,
    calls: Mutex<Vec<PlayerCall>>,
}

impl FakePlayer {
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl NativePlayer for FakePlayer {
    async fn probe(&self) -> Option<PlayerProbe> {
        let ready = self.ready.load(Ordering::SeqCst);
        Some(PlayerProbe {
            has_seek: true,
            has_play: true,
            has_get_state: true,
            loaded: true,
            state: if ready { 2 } else { 5 },
        })
    }

    async fn seek_to(&self, seconds: f64) -> Result<(), PlayerError> {
        self.calls.lock().expect("calls lock").push(PlayerCall::Seek(seconds));
        Ok(())
    }

    async fn play(&self) -> Result<(), PlayerError> {
        self.calls.lock().expect("calls lock").push(PlayerCall::Play);
        Ok(())
    }
}

pub struct Titled;

#[async_trait]
impl PageMetadata for Titled {
    async fn video_title(&self) -> Option<String> {
        Some(TITLE.to_string())
    }
}

pub fn watch_page(player: &Arc<FakePlayer>) -> Arc<PageContext> {
    PageContext::new(
        Arc::clone(player) as Arc<dyn NativePlayer>,
        Arc::new(Titled),
        PlayerSettings {
            poll_interval: Duration::from_millis(20),
        },
    )
}

#[derive(Default)]
pub struct RecordingPopup {
    statuses: Mutex<Vec<(StatusKind, String)>>,
    closed: AtomicUsize,
}

impl RecordingPopup {
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn statuses(&self) -> Vec<(StatusKind, String)> {
        self.statuses.lock().expect("statuses lock").clone()
    }
}

impl PopupSurface for RecordingPopup {
    fn show_status(&self, kind: StatusKind, message: &str) {
        self.statuses
            .lock()
            .expect("statuses lock")
            .push((kind, message.to_string()));
    }

    fn set_busy(&self, _busy: bool) {}

    fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Render(OverlayState),
    Remove,
    Alert(String),
}

struct TabSurface {
    calls: mpsc::UnboundedSender<SurfaceCall>,
}

impl OverlaySurface for TabSurface {
    fn render(&self, state: &OverlayState) {
        let _ = self.calls.send(SurfaceCall::Render(state.clone()));
    }

    fn remove(&self) {
        let _ = self.calls.send(SurfaceCall::Remove);
    }

    fn alert(&self, message: &str) {
        let _ = self.calls.send(SurfaceCall::Alert(message.to_string()));
    }
}

/// Hands out one recording surface per content script and keeps the DOM event
/// sender of the most recent one for each tab.
pub struct RecordingSurfaces {
    calls: mpsc::UnboundedSender<SurfaceCall>,
    events: Mutex<HashMap<TabId, OverlayEvents>>,
    created: AtomicUsize,
}

impl RecordingSurfaces {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<SurfaceCall>) {
        let (calls, rx) = mpsc::unbounded_channel();
        let surfaces = Arc::new(Self {
            calls,
            events: Mutex::new(HashMap::new()),
            created: AtomicUsize::new(0),
        });
        (surfaces, rx)
    }

    pub fn events(&self, tab: TabId) -> OverlayEvents {
        self.events
            .lock()
            .expect("events lock")
            .get(&tab)
            .cloned()
            .expect("surface created for tab")
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl OverlaySurfaceFactory for RecordingSurfaces {
    fn create(&self, tab: TabId, events: OverlayEvents) -> Arc<dyn OverlaySurface> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.events.lock().expect("events lock").insert(tab, events);
        Arc::new(TabSurface {
            calls: self.calls.clone(),
        })
    }
}

pub async fn next_render(calls: &mut mpsc::UnboundedReceiver<SurfaceCall>) -> OverlayState {
    match timeout(Duration::from_secs(5), calls.recv()).await {
        Ok(Some(SurfaceCall::Render(state))) => state,
        other => panic!("expected overlay render, got {other:?}"),
    }
}

pub fn gemini_envelope(text: &str) -> Value {
    json!({
        "candidates": [ { "content": { "parts": [ { "text": text } ] } } ]
    })
}

/// Starts a generateContent endpoint that always answers with `text`.
pub async fn start_gemini(text: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/models/[^/]+:generateContent$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope(text)))
        .mount(&server)
        .await;
    server
}
