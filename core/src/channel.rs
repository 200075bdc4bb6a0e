use qtube_protocol::ExtensionMessage;
use qtube_protocol::ExtensionReply;
use qtube_protocol::TabId;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::oneshot;

/// Reply slot of a request. Dropping it without sending is the implicit
/// acknowledgement used by `showOverlay`.
pub type ReplySender = oneshot::Sender<Option<ExtensionReply>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("Could not establish connection. Receiving end does not exist.")]
    NoReceivingEnd,

    #[error("message channel closed")]
    ChannelClosed,

    #[error("{0}")]
    Rejected(String),
}

impl MessageError {
    /// Transient failures that mean "nobody is listening yet" and are worth
    /// retrying once a listener had a chance to attach.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, MessageError::NoReceivingEnd | MessageError::ChannelClosed)
    }
}

/// A message delivered to a tab's content script.
#[derive(Debug)]
pub struct TabEnvelope {
    pub message: ExtensionMessage,
    pub reply: Option<ReplySender>,
}

/// A message delivered to the background runtime. `sender` is the tab the
/// message originated from, `None` for the popup.
#[derive(Debug)]
pub struct RuntimeEnvelope {
    pub sender: Option<TabId>,
    pub message: ExtensionMessage,
    pub reply: Option<ReplySender>,
}

/// Handle a content script uses to reach the background runtime.
#[derive(Debug, Clone)]
pub struct RuntimeSender {
    tab: Option<TabId>,
    tx: mpsc::Sender<RuntimeEnvelope>,
}

impl RuntimeSender {
    pub fn new(tab: Option<TabId>, tx: mpsc::Sender<RuntimeEnvelope>) -> Self {
        Self { tab, tx }
    }

    pub fn tab(&self) -> Option<TabId> {
        self.tab
    }

    /// Sends a request and waits for the reply. A reply slot dropped without
    /// an answer yields `Ok(None)`.
    pub async fn send(
        &self,
        message: ExtensionMessage,
    ) -> Result<Option<ExtensionReply>, MessageError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RuntimeEnvelope {
                sender: self.tab,
                message,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| MessageError::NoReceivingEnd)?;
        Ok(reply_rx.await.unwrap_or(None))
    }

    /// Fire-and-forget delivery.
    pub async fn notify(&self, message: ExtensionMessage) -> Result<(), MessageError> {
        self.tx
            .send(RuntimeEnvelope {
                sender: self.tab,
                message,
                reply: None,
            })
            .await
            .map_err(|_| MessageError::NoReceivingEnd)
    }
}

/// Answers a request if the caller asked for a reply.
pub(crate) fn respond(reply: Option<ReplySender>, value: Option<ExtensionReply>) {
    if let Some(reply) = reply {
        // The requester may have given up waiting.
        let _ = reply.send(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_listener_failures_are_connection_errors() {
        assert!(MessageError::NoReceivingEnd.is_connection_error());
        assert!(MessageError::ChannelClosed.is_connection_error());
        assert!(!MessageError::Rejected("bad request".to_string()).is_connection_error());
    }

    #[tokio::test]
    async fn send_without_runtime_listener_has_no_receiving_end() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = RuntimeSender::new(Some(TabId(1)), tx);
        assert_eq!(
            sender.send(ExtensionMessage::Ping).await,
            Err(MessageError::NoReceivingEnd)
        );
    }

    #[tokio::test]
    async fn dropped_reply_slot_is_an_implicit_ack() {
        let (tx, mut rx) = mpsc::channel(1);
        let sender = RuntimeSender::new(Some(TabId(7)), tx);
        let listener = tokio::spawn(async move {
            let envelope = rx.recv().await.expect("envelope");
            assert_eq!(envelope.sender, Some(TabId(7)));
            drop(envelope);
        });
        assert_eq!(sender.send(ExtensionMessage::HideOverlay).await, Ok(None));
        listener.await.expect("listener");
    }
}
