//! Page-side half of timestamp navigation: listens for seek events on the page
//! and drives the native player once it is ready.

mod gate;
mod player;

use std::sync::Arc;
use std::time::Duration;

use qtube_protocol::PageEvent;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

pub use gate::ReadinessGate;
pub use player::NativePlayer;
pub use player::PlayerError;
pub use player::PlayerProbe;
pub use player::PlayerState;
pub use player::is_player_ready;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSettings {
    pub poll_interval: Duration,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Running bridge task. Dropping the handle stops the task.
#[derive(Debug)]
pub struct PlayerBridgeHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PlayerBridgeHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PlayerBridgeHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub struct PlayerBridge {
    player: Arc<dyn NativePlayer>,
    gate: ReadinessGate,
}

impl PlayerBridge {
    pub fn new(player: Arc<dyn NativePlayer>) -> Self {
        Self {
            player,
            gate: ReadinessGate::new(),
        }
    }

    pub fn spawn(
        self,
        events: broadcast::Receiver<PageEvent>,
        settings: &PlayerSettings,
    ) -> PlayerBridgeHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(events, settings.poll_interval, cancel.clone()));
        PlayerBridgeHandle { cancel, task }
    }

    async fn run(
        mut self,
        mut events: broadcast::Receiver<PageEvent>,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.poll_readiness().await,
                event = events.recv() => match event {
                    Ok(event) => self.handle_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("player bridge lagged behind page events; {skipped} seek requests lost");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        debug!("player bridge stopped");
    }

    async fn poll_readiness(&mut self) {
        let probe = self.player.probe().await;
        let was_ready = self.gate.is_ready();
        let ready = is_player_ready(probe.as_ref());
        let drained = self.gate.observe(ready);
        if ready && !was_ready {
            info!("player ready; running {} queued seek requests", drained.len());
        }
        for time in drained {
            self.execute(time).await;
        }
    }

    async fn handle_event(&mut self, event: PageEvent) {
        match event {
            PageEvent::SeekVideo(detail) => match self.gate.submit(detail.time) {
                Some(time) => self.execute(time).await,
                None => debug!(
                    "player not ready; queued seek to {}s ({} pending)",
                    detail.time,
                    self.gate.pending()
                ),
            },
        }
    }

    async fn execute(&self, time: f64) {
        if let Err(err) = self.player.seek_to(time).await {
            warn!("seek to {time}s failed: {err}");
            return;
        }
        if let Err(err) = self.player.play().await {
            warn!("play after seek to {time}s failed: {err}");
        }
    }
}
