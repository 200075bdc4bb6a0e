use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The endpoint answered with a non-success status.
    #[error("API request failed with status {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    /// The endpoint answered 2xx but without `candidates[0].content.parts[0].text`.
    #[error("malformed API response: {0}")]
    MalformedResponse(String),

    #[error("API request could not be sent: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::UnexpectedStatus { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status(),
            ApiError::MalformedResponse(_) => None,
        }
    }
}
