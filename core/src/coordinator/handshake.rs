use std::sync::atomic::Ordering;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::Shared;
use qtube_protocol::ExtensionMessage;
use qtube_protocol::TabId;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::SessionCoordinator;
use crate::error::HandshakeError;

type ReadyFuture = Shared<BoxFuture<'static, Result<(), HandshakeError>>>;

/// An in-flight readiness handshake for one tab.
pub(super) struct PendingSession {
    generation: u64,
    ready: ReadyFuture,
}

impl SessionCoordinator {
    /// Resolves once the tab's content script is listening. Concurrent callers
    /// for the same tab share a single handshake.
    pub async fn ensure_ready(&self, tab: TabId) -> Result<(), HandshakeError> {
        let (generation, ready) = {
            let mut sessions = self.inner.sessions.lock().await;
            match sessions.get(&tab) {
                Some(pending) => {
                    debug!(%tab, "joining pending readiness handshake");
                    (pending.generation, pending.ready.clone())
                }
                None => {
                    let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
                    let this = self.clone();
                    let ready = async move { this.run_handshake(tab).await }
                        .boxed()
                        .shared();
                    sessions.insert(
                        tab,
                        PendingSession {
                            generation,
                            ready: ready.clone(),
                        },
                    );
                    (generation, ready)
                }
            }
        };

        let result = ready.await;

        let mut sessions = self.inner.sessions.lock().await;
        if sessions
            .get(&tab)
            .is_some_and(|pending| pending.generation == generation)
        {
            sessions.remove(&tab);
        }
        result
    }

    /// Whether a handshake for `tab` is currently pending.
    pub async fn has_pending_session(&self, tab: TabId) -> bool {
        self.inner.sessions.lock().await.contains_key(&tab)
    }

    async fn run_handshake(&self, tab: TabId) -> Result<(), HandshakeError> {
        match self.inner.tabs.send_message(tab, ExtensionMessage::Ping).await {
            Ok(reply) => {
                debug!(%tab, ?reply, "content script answered ping");
                return Ok(());
            }
            Err(err) => debug!(%tab, "ping failed ({err}); injecting content script"),
        }

        // Registered before injecting so an immediate announcement is not lost.
        let announced = self.register_ready_waiter(tab).await;
        if let Err(err) = self.inner.tabs.inject_content_script(tab).await {
            self.inner.ready_waiters.lock().await.remove(&tab);
            warn!(%tab, "content script injection failed: {err}");
            return Err(HandshakeError::Injection {
                tab,
                message: err.to_string(),
            });
        }

        let timeout = self.inner.settings.handshake_timeout;
        match tokio::time::timeout(timeout, announced).await {
            Ok(Ok(())) => {
                info!(%tab, "content script announced readiness");
                Ok(())
            }
            Ok(Err(_)) | Err(_) => {
                self.inner.ready_waiters.lock().await.remove(&tab);
                warn!(%tab, "content script did not announce readiness within {}ms", timeout.as_millis());
                Err(HandshakeError::Timeout { tab, timeout })
            }
        }
    }

    async fn register_ready_waiter(&self, tab: TabId) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        if self.inner.ready_waiters.lock().await.insert(tab, tx).is_some() {
            debug!(%tab, "replaced stale readiness waiter");
        }
        rx
    }

    /// Wakes the handshake waiting on `tab`, if any.
    pub(super) async fn resolve_ready(&self, tab: TabId) {
        match self.inner.ready_waiters.lock().await.remove(&tab) {
            Some(waiter) => {
                let _ = waiter.send(());
            }
            None => debug!(%tab, "readiness announcement with no pending handshake"),
        }
    }
}
