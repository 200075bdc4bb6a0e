//! Background/popup side of a session: validates the question, makes sure the
//! active tab has a listening content script, and delivers the overlay
//! command. Also answers transcript requests proxied by content scripts.

mod delivery;
mod handshake;
mod proxy;
mod validation;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;

use qtube_gemini::AnswerEngine;
use qtube_protocol::ExtensionMessage;
use qtube_protocol::TabId;
use tokio::sync::Mutex;
use tokio::sync::oneshot;
use tracing::info;
use tracing::warn;

pub use validation::is_watch_page_url;
pub use validation::validate_question;

use crate::error::Result;
use crate::error::ValidationError;
use crate::tabs::TabsApi;
use handshake::PendingSession;

pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_QUESTION_CHARS: usize = 200;
pub const DEFAULT_PLACEHOLDER: &str = "Ask anything about this video...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSettings {
    pub handshake_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub max_question_chars: usize,
    pub placeholder: String,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            max_question_chars: DEFAULT_MAX_QUESTION_CHARS,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

/// The popup window the user typed the question into.
pub trait PopupSurface: Send + Sync {
    fn show_status(&self, kind: StatusKind, message: &str);

    /// Disables the submit control while a submission is in flight.
    fn set_busy(&self, busy: bool);

    fn close(&self);
}

#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    tabs: Arc<dyn TabsApi>,
    popup: Arc<dyn PopupSurface>,
    engine: Arc<dyn AnswerEngine>,
    settings: CoordinatorSettings,
    sessions: Mutex<HashMap<TabId, PendingSession>>,
    ready_waiters: Mutex<HashMap<TabId, oneshot::Sender<()>>>,
    next_generation: AtomicU64,
}

impl SessionCoordinator {
    pub fn new(
        tabs: Arc<dyn TabsApi>,
        popup: Arc<dyn PopupSurface>,
        engine: Arc<dyn AnswerEngine>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                tabs,
                popup,
                engine,
                settings,
                sessions: Mutex::new(HashMap::new()),
                ready_waiters: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.inner.settings
    }

    /// Runs one popup submission end to end. Every outcome is also reported
    /// on the popup; the popup closes only on success.
    pub async fn submit_question(&self, raw: &str) -> Result<()> {
        let popup = &self.inner.popup;
        let (tab, question) = match self.target(raw).await {
            Ok(target) => target,
            Err(err) => {
                popup.show_status(StatusKind::Error, &err.to_string());
                return Err(err.into());
            }
        };

        popup.set_busy(true);
        popup.show_status(StatusKind::Info, "Opening overlay...");
        match self.open_overlay(tab, question).await {
            Ok(()) => {
                info!(%tab, "overlay opened");
                popup.close();
                Ok(())
            }
            Err(err) => {
                warn!(%tab, "question submission failed: {err}");
                popup.show_status(StatusKind::Error, &err.user_message());
                popup.set_busy(false);
                Err(err)
            }
        }
    }

    /// Checks the question and the active tab without touching the tab.
    async fn target(&self, raw: &str) -> std::result::Result<(TabId, String), ValidationError> {
        let settings = &self.inner.settings;
        let question = validate_question(raw, &settings.placeholder, settings.max_question_chars)?;
        let tab = self
            .inner
            .tabs
            .active_tab()
            .await
            .ok_or(ValidationError::NoActiveTab)?;
        if !is_watch_page_url(&tab.url) {
            return Err(ValidationError::NotWatchPage { url: tab.url });
        }
        Ok((tab.id, question))
    }

    async fn open_overlay(&self, tab: TabId, question: String) -> Result<()> {
        self.ensure_ready(tab).await?;
        let settings = &self.inner.settings;
        self.send_with_retry(
            tab,
            ExtensionMessage::ShowOverlay { question },
            settings.max_retries,
            settings.retry_backoff,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
