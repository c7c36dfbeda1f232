//! Events delivered by the transport adapter.

use tokio::sync::mpsc;

/// One event from the BLE link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Payload of a single GATT notification.
    Notification(Vec<u8>),
    /// The peripheral disconnected; no further notifications follow.
    Disconnected,
}

/// Sending half handed to the transport adapter.
#[derive(Debug, Clone)]
pub struct LinkSender {
    tx: mpsc::Sender<LinkEvent>,
}

impl LinkSender {
    /// Forwards a notification. Returns `false` once the receiver is gone.
    pub async fn notify(&self, data: impl Into<Vec<u8>>) -> bool {
        self.tx
            .send(LinkEvent::Notification(data.into()))
            .await
            .is_ok()
    }

    /// Signals that the link dropped.
    pub async fn disconnect(&self) -> bool {
        self.tx.send(LinkEvent::Disconnected).await.is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Creates a bounded link channel.
pub fn link_channel(capacity: usize) -> (LinkSender, mpsc::Receiver<LinkEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (LinkSender { tx }, rx)
}
