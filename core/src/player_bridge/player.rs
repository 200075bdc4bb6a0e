use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Numeric player states reported by the embedded video player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
    Other(i32),
}

impl From<i32> for PlayerState {
    fn from(value: i32) -> Self {
        match value {
            -1 => PlayerState::Unstarted,
            0 => PlayerState::Ended,
            1 => PlayerState::Playing,
            2 => PlayerState::Paused,
            3 => PlayerState::Buffering,
            5 => PlayerState::Cued,
            other => PlayerState::Other(other),
        }
    }
}

/// Snapshot of the player object as seen from the page main context.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProbe {
    pub has_seek: bool,
    pub has_play: bool,
    pub has_get_state: bool,
    pub loaded: bool,
    pub state: i32,
}

impl PlayerProbe {
    pub fn player_state(&self) -> PlayerState {
        PlayerState::from(self.state)
    }
}

/// True when the player exists, exposes the control surface, has loaded a
/// video, and is past the unstarted and cued states.
pub fn is_player_ready(probe: Option<&PlayerProbe>) -> bool {
    let Some(probe) = probe else {
        return false;
    };
    probe.has_seek
        && probe.has_play
        && probe.has_get_state
        && probe.loaded
        && !matches!(
            probe.player_state(),
            PlayerState::Unstarted | PlayerState::Cued
        )
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    #[error("player is not available")]
    Unavailable,

    #[error("player call failed: {0}")]
    Call(String),
}

/// The page's native player object.
#[async_trait]
pub trait NativePlayer: Send + Sync {
    /// `None` when no player object exists on the page.
    async fn probe(&self) -> Option<PlayerProbe>;

    async fn seek_to(&self, seconds: f64) -> Result<(), PlayerError>;

    async fn play(&self) -> Result<(), PlayerError>;
}
