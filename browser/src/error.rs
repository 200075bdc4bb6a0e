use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("CDP error: {0}")]
    CdpError(String),

    #[error("browser is not connected")]
    NotConnected,

    #[error("page script failed: {0}")]
    ScriptError(String),

    #[error(transparent)]
    Chromium(#[from] chromiumoxide::error::CdpError),
}
