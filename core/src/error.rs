use std::time::Duration;

use qtube_protocol::TabId;
use thiserror::Error;

use crate::channel::MessageError;

pub type Result<T> = std::result::Result<T, QtubeErr>;

/// Rejections raised before anything is sent to a tab.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a question.")]
    Empty,

    #[error("Please enter a question.")]
    Placeholder,

    #[error("Question is too long ({len} characters, maximum {max}).")]
    TooLong { len: usize, max: usize },

    #[error("Open a YouTube video to ask about it.")]
    NotWatchPage { url: String },

    #[error("No active tab found.")]
    NoActiveTab,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    #[error("{tab} did not announce readiness within {}ms", timeout.as_millis())]
    Timeout { tab: TabId, timeout: Duration },

    #[error("failed to inject content script into {tab}: {message}")]
    Injection { tab: TabId, message: String },
}

#[derive(Debug, Error)]
pub enum QtubeErr {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    #[error("could not deliver {message} to {tab} after {attempts} attempts: {last_error}")]
    DeliveryExhausted {
        tab: TabId,
        message: &'static str,
        attempts: u32,
        last_error: MessageError,
    },

    #[error("failed to deliver {message} to {tab}: {source}")]
    Delivery {
        tab: TabId,
        message: &'static str,
        #[source]
        source: MessageError,
    },
}

impl QtubeErr {
    /// Text suitable for the popup status line.
    pub fn user_message(&self) -> String {
        match self {
            QtubeErr::Validation(err) => err.to_string(),
            QtubeErr::Handshake(HandshakeError::Timeout { .. }) => {
                "The video page did not respond in time. Reload the page and try again."
                    .to_string()
            }
            QtubeErr::Handshake(HandshakeError::Injection { .. }) => {
                "Could not attach to this page. Reload the page and try again.".to_string()
            }
            QtubeErr::DeliveryExhausted { .. } | QtubeErr::Delivery { .. } => {
                "Could not reach the video page. Please try again.".to_string()
            }
        }
    }
}
