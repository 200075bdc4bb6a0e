use std::sync::Arc;

use async_trait::async_trait;
use qtube_protocol::PageEvent;
use tokio::sync::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::player_bridge::NativePlayer;
use crate::player_bridge::PlayerBridge;
use crate::player_bridge::PlayerBridgeHandle;
use crate::player_bridge::PlayerSettings;

const PAGE_EVENT_CAPACITY: usize = 64;

/// Read-only page facts the overlay needs for its prompt.
#[async_trait]
pub trait PageMetadata: Send + Sync {
    /// The video title as shown on the page, if one can be found.
    async fn video_title(&self) -> Option<String>;
}

/// One loaded document: the page event bus shared by the isolated content
/// script and the page main context, plus the injected bridge marker.
pub struct PageContext {
    player: Arc<dyn NativePlayer>,
    metadata: Arc<dyn PageMetadata>,
    events: broadcast::Sender<PageEvent>,
    bridge: Mutex<Option<PlayerBridgeHandle>>,
    player_settings: PlayerSettings,
}

impl PageContext {
    pub fn new(
        player: Arc<dyn NativePlayer>,
        metadata: Arc<dyn PageMetadata>,
        player_settings: PlayerSettings,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(PAGE_EVENT_CAPACITY);
        Arc::new(Self {
            player,
            metadata,
            events,
            bridge: Mutex::new(None),
            player_settings,
        })
    }

    /// Fires `event` on the page and returns how many listeners saw it.
    pub fn dispatch(&self, event: PageEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.events.subscribe()
    }

    pub async fn video_title(&self) -> Option<String> {
        self.metadata.video_title().await
    }

    /// Starts the player bridge in the page main context. Returns false when a
    /// bridge is already installed on this page.
    pub async fn inject_player_bridge(&self) -> bool {
        let mut bridge = self.bridge.lock().await;
        if bridge.is_some() {
            debug!("player bridge already present on page");
            return false;
        }
        let handle = PlayerBridge::new(Arc::clone(&self.player))
            .spawn(self.events.subscribe(), &self.player_settings);
        *bridge = Some(handle);
        true
    }

    pub async fn has_player_bridge(&self) -> bool {
        self.bridge.lock().await.is_some()
    }

    /// Tears down page-scoped tasks, as a navigation away would.
    pub async fn unload(&self) {
        if let Some(handle) = self.bridge.lock().await.take() {
            handle.cancel();
        }
    }
}
