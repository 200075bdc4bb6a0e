//! In-process stand-in for the browser's extension runtime: a set of tabs,
//! each with a loaded page and at most one content script, and the runtime
//! channel content scripts use to reach the background coordinator.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use qtube_protocol::ExtensionMessage;
use qtube_protocol::ExtensionReply;
use qtube_protocol::TabId;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;

use crate::channel::MessageError;
use crate::channel::RuntimeEnvelope;
use crate::channel::RuntimeSender;
use crate::channel::TabEnvelope;
use crate::page::PageContext;
use crate::tabs::TabInfo;
use crate::tabs::TabsApi;

const RUNTIME_CAPACITY: usize = 64;

/// A running content script. Dropping the handle unloads the script.
#[derive(Debug)]
pub struct ContentScriptHandle {
    commands: mpsc::Sender<TabEnvelope>,
    task: JoinHandle<()>,
}

impl ContentScriptHandle {
    pub fn new(commands: mpsc::Sender<TabEnvelope>, task: JoinHandle<()>) -> Self {
        Self { commands, task }
    }

    /// Sender for requests addressed to this content script.
    pub fn commands(&self) -> mpsc::Sender<TabEnvelope> {
        self.commands.clone()
    }

    fn is_listening(&self) -> bool {
        !self.commands.is_closed() && !self.task.is_finished()
    }
}

impl Drop for ContentScriptHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Loads a content script into a page.
pub trait ContentScriptLauncher: Send + Sync {
    fn launch(&self, tab: TabId, page: Arc<PageContext>, runtime: RuntimeSender)
    -> ContentScriptHandle;
}

struct TabSlot {
    url: String,
    page: Arc<PageContext>,
    content_script: Option<ContentScriptHandle>,
}

pub struct ExtensionHost {
    tabs: Mutex<HashMap<TabId, TabSlot>>,
    active: Mutex<Option<TabId>>,
    next_tab: AtomicU64,
    runtime_tx: mpsc::Sender<RuntimeEnvelope>,
    launcher: Arc<dyn ContentScriptLauncher>,
}

impl ExtensionHost {
    /// Returns the host and the receiving end of the background runtime
    /// channel.
    pub fn new(
        launcher: Arc<dyn ContentScriptLauncher>,
    ) -> (Arc<Self>, mpsc::Receiver<RuntimeEnvelope>) {
        let (runtime_tx, runtime_rx) = mpsc::channel(RUNTIME_CAPACITY);
        let host = Arc::new(Self {
            tabs: Mutex::new(HashMap::new()),
            active: Mutex::new(None),
            next_tab: AtomicU64::new(1),
            runtime_tx,
            launcher,
        });
        (host, runtime_rx)
    }

    /// Sender the popup uses to reach the background runtime.
    pub fn popup_runtime(&self) -> RuntimeSender {
        RuntimeSender::new(None, self.runtime_tx.clone())
    }

    /// Opens `url` in a new tab and focuses it.
    pub async fn open_tab(&self, url: impl Into<String>, page: Arc<PageContext>) -> TabId {
        let id = TabId(self.next_tab.fetch_add(1, Ordering::Relaxed));
        let url = url.into();
        info!(tab = %id, %url, "tab opened");
        self.tabs.lock().await.insert(
            id,
            TabSlot {
                url,
                page,
                content_script: None,
            },
        );
        *self.active.lock().await = Some(id);
        id
    }

    pub async fn activate(&self, tab: TabId) -> bool {
        if !self.tabs.lock().await.contains_key(&tab) {
            return false;
        }
        *self.active.lock().await = Some(tab);
        true
    }

    /// Loads a new document into `tab`. The previous page and its content
    /// script are discarded.
    pub async fn navigate(&self, tab: TabId, url: impl Into<String>, page: Arc<PageContext>) -> bool {
        let previous = {
            let mut tabs = self.tabs.lock().await;
            let Some(slot) = tabs.get_mut(&tab) else {
                return false;
            };
            slot.url = url.into();
            slot.content_script = None;
            std::mem::replace(&mut slot.page, page)
        };
        previous.unload().await;
        debug!(%tab, "tab navigated");
        true
    }

    pub async fn close_tab(&self, tab: TabId) {
        let removed = self.tabs.lock().await.remove(&tab);
        let mut active = self.active.lock().await;
        if *active == Some(tab) {
            *active = None;
        }
        drop(active);
        if let Some(slot) = removed {
            slot.page.unload().await;
            info!(%tab, "tab closed");
        }
    }

    pub async fn page(&self, tab: TabId) -> Option<Arc<PageContext>> {
        self.tabs
            .lock()
            .await
            .get(&tab)
            .map(|slot| Arc::clone(&slot.page))
    }

    pub async fn has_content_script(&self, tab: TabId) -> bool {
        self.tabs
            .lock()
            .await
            .get(&tab)
            .and_then(|slot| slot.content_script.as_ref())
            .is_some_and(ContentScriptHandle::is_listening)
    }
}

#[async_trait]
impl TabsApi for ExtensionHost {
    async fn active_tab(&self) -> Option<TabInfo> {
        let id = (*self.active.lock().await)?;
        self.tabs.lock().await.get(&id).map(|slot| TabInfo {
            id,
            url: slot.url.clone(),
        })
    }

    async fn send_message(
        &self,
        tab: TabId,
        message: ExtensionMessage,
    ) -> Result<Option<ExtensionReply>, MessageError> {
        let commands = {
            let tabs = self.tabs.lock().await;
            tabs.get(&tab)
                .and_then(|slot| slot.content_script.as_ref())
                .filter(|script| script.is_listening())
                .map(ContentScriptHandle::commands)
                .ok_or(MessageError::NoReceivingEnd)?
        };
        let (reply_tx, reply_rx) = oneshot::channel();
        commands
            .send(TabEnvelope {
                message,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| MessageError::NoReceivingEnd)?;
        Ok(reply_rx.await.unwrap_or(None))
    }

    async fn inject_content_script(&self, tab: TabId) -> Result<(), MessageError> {
        let mut tabs = self.tabs.lock().await;
        let slot = tabs
            .get_mut(&tab)
            .ok_or_else(|| MessageError::Rejected(format!("no tab with id {tab}")))?;
        let runtime = RuntimeSender::new(Some(tab), self.runtime_tx.clone());
        let script = self.launcher.launch(tab, Arc::clone(&slot.page), runtime);
        if slot.content_script.replace(script).is_some() {
            debug!(%tab, "replaced existing content script");
        }
        info!(%tab, "content script injected");
        Ok(())
    }
}
