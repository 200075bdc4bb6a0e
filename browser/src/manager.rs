use std::sync::Arc;

use chromiumoxide::Browser;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::Result;
use crate::config::BrowserConfig;
use crate::error::BrowserError;
use crate::page::WatchPage;

mod connection;

/// Connection to an external Chrome. The browser is never launched or closed
/// by us; `stop` only drops the DevTools connection.
pub struct BrowserManager {
    config: BrowserConfig,
    browser: Arc<Mutex<Option<Browser>>>,
    event_task: Mutex<Option<JoinHandle<()>>>,
}

impl BrowserManager {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            browser: Arc::new(Mutex::new(None)),
            event_task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub async fn is_connected(&self) -> bool {
        self.browser.lock().await.is_some()
    }

    /// Opens `url` in a new tab and waits for it to load.
    pub async fn open_watch_page(&self, url: &str) -> Result<Arc<WatchPage>> {
        self.connect().await?;
        let cdp_page = {
            let browser = self.browser.lock().await;
            let browser = browser.as_ref().ok_or(BrowserError::NotConnected)?;
            browser.new_page(url).await?
        };
        info!("opened {url}");
        let page = WatchPage::new(cdp_page, url.to_string());
        page.wait_until_loaded(self.config.page_load_timeout).await;
        Ok(Arc::new(page))
    }

    pub async fn stop(&self) {
        if let Some(task) = self.event_task.lock().await.take() {
            task.abort();
        }
        if self.browser.lock().await.take().is_some() {
            info!("disconnected from Chrome (left running)");
        }
    }
}
