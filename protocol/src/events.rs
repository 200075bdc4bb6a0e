use serde::Deserialize;
use serde::Serialize;

/// Name of the page-level custom event consumed by the player bridge.
pub const SEEK_EVENT_NAME: &str = "qtube_seek_video";

/// Detail carried by [`SEEK_EVENT_NAME`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeekDetail {
    /// Seek target in seconds.
    pub time: f64,
}

impl SeekDetail {
    /// Returns `None` for negative or non-finite times.
    pub fn new(time: f64) -> Option<Self> {
        (time.is_finite() && time >= 0.0).then_some(Self { time })
    }
}

/// Events dispatched on the page body. The isolated content script and the
/// page main context share nothing but this channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageEvent {
    SeekVideo(SeekDetail),
}

impl PageEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PageEvent::SeekVideo(_) => SEEK_EVENT_NAME,
        }
    }
}
