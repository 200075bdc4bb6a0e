use async_trait::async_trait;
use qtube_protocol::ExtensionMessage;
use qtube_protocol::ExtensionReply;
use qtube_protocol::TabId;

use crate::channel::MessageError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
}

/// The slice of the browser's tab API the coordinator relies on.
#[async_trait]
pub trait TabsApi: Send + Sync {
    /// The focused tab of the current window, if any.
    async fn active_tab(&self) -> Option<TabInfo>;

    /// Delivers `message` to the tab's content script. Fails with
    /// [`MessageError::NoReceivingEnd`] when no content script is listening.
    async fn send_message(
        &self,
        tab: TabId,
        message: ExtensionMessage,
    ) -> Result<Option<ExtensionReply>, MessageError>;

    /// Loads the content script into the tab. Completion only means the script
    /// was scheduled; readiness is announced separately.
    async fn inject_content_script(&self, tab: TabId) -> Result<(), MessageError>;
}
