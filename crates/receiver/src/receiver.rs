//! Receive loop (central side).
//!
//! Consumes link events in delivery order, drives the state machine, and
//! shuts down on disconnect, channel close or cancellation.

use std::sync::Arc;

use bledrop_protocol::{Phase, TransferEvent};
use bledrop_transfer::{CompletedFiles, PersistenceSink, TransferConfig, TransferStateMachine};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ReceiverError;
use crate::link::LinkEvent;

/// Counters for one link session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverSummary {
    /// Notifications consumed, including stray and empty ones.
    pub notifications: u64,
    /// Raw notification bytes consumed, framing included.
    pub bytes: u64,
    /// Transfers that were persisted and verified.
    pub completed: usize,
    /// Transfers that ended in failure, cancellation included.
    pub failed: usize,
}

/// Drives a [`TransferStateMachine`] from a stream of [`LinkEvent`]s.
pub struct TransferReceiver {
    machine: TransferStateMachine,
    cancel: CancellationToken,
}

impl TransferReceiver {
    /// Creates a receiver and the channel on which its lifecycle events arrive.
    pub fn new(
        sink: Arc<dyn PersistenceSink>,
        config: TransferConfig,
        cancel: CancellationToken,
    ) -> (Self, mpsc::Receiver<TransferEvent>) {
        let (machine, events) = TransferStateMachine::new(sink, config);
        (Self { machine, cancel }, events)
    }

    /// Handle to the completed-transfer list, readable while `run` is active.
    pub fn history(&self) -> CompletedFiles {
        self.machine.history()
    }

    /// Processes link events until the link ends.
    ///
    /// Returns the session counters on a clean disconnect. Any transfer in
    /// flight when the loop stops is failed with `Cancelled` and never
    /// persisted.
    pub async fn run(
        mut self,
        mut link: mpsc::Receiver<LinkEvent>,
    ) -> Result<ReceiverSummary, ReceiverError> {
        let mut summary = ReceiverSummary::default();
        info!("receiver listening for transfers");

        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(self.cancelled(&mut summary)),
                event = link.recv() => event,
            };

            match event {
                Some(LinkEvent::Notification(data)) => {
                    summary.notifications += 1;
                    summary.bytes += data.len() as u64;
                    let before = self.machine.phase();
                    // Persistence may stall; cancellation still wins.
                    let after = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => None,
                        after = self.machine.on_chunk(&data) => Some(after),
                    };
                    match after {
                        Some(after) => record(&mut summary, before, after),
                        None => return Err(self.cancelled(&mut summary)),
                    }
                }
                Some(LinkEvent::Disconnected) => {
                    self.abort(&mut summary);
                    info!(?summary, "link disconnected");
                    return Ok(summary);
                }
                None => {
                    self.abort(&mut summary);
                    warn!(?summary, "link channel closed without disconnect");
                    return Err(ReceiverError::LinkClosed);
                }
            }
        }
    }

    fn cancelled(&mut self, summary: &mut ReceiverSummary) -> ReceiverError {
        self.abort(summary);
        info!(?summary, "receiver cancelled");
        ReceiverError::Cancelled
    }

    fn abort(&mut self, summary: &mut ReceiverSummary) {
        let before = self.machine.phase();
        let after = self.machine.on_disconnect();
        record(summary, before, after);
        debug!(phase = ?after, "receive loop stopping");
    }
}

fn record(summary: &mut ReceiverSummary, before: Phase, after: Phase) {
    if before == after {
        return;
    }
    match after {
        Phase::Completed => summary.completed += 1,
        Phase::Failed => summary.failed += 1,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use bledrop_protocol::{FailureKind, FileHandle};
    use bledrop_transfer::{DigestScope, FileSink, MemorySink, SinkFuture, seal_body};

    use crate::link::link_channel;

    /// Sink whose writes never complete.
    struct StalledSink;

    impl PersistenceSink for StalledSink {
        fn write<'a>(&'a self, _content: &'a [u8]) -> SinkFuture<'a, FileHandle> {
            Box::pin(std::future::pending())
        }

        fn discard<'a>(&'a self, _handle: &'a FileHandle) -> SinkFuture<'a, ()> {
            Box::pin(async { Ok(()) })
        }
    }

    fn body_config() -> TransferConfig {
        TransferConfig {
            digest_scope: DigestScope::Body,
            ..TransferConfig::default()
        }
    }

    async fn collect(mut rx: mpsc::Receiver<TransferEvent>) -> Vec<TransferEvent> {
        let mut out = Vec::new();
        while let Some(ev) = rx.recv().await {
            out.push(ev);
        }
        out
    }

    #[tokio::test]
    async fn receives_transfer_then_disconnects() {
        let sink = Arc::new(MemorySink::new());
        let (receiver, events) =
            TransferReceiver::new(sink.clone(), body_config(), CancellationToken::new());
        let history = receiver.history();
        let (link, link_rx) = link_channel(16);

        let task = tokio::spawn(receiver.run(link_rx));

        let content = seal_body(b"sensor log");
        link.notify(vec![0x02]).await;
        for part in content.chunks(20) {
            link.notify(part).await;
        }
        link.notify(vec![0x03]).await;
        link.disconnect().await;

        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.notifications, 2 + content.chunks(20).count() as u64);

        let events = collect(events).await;
        assert_eq!(events.first(), Some(&TransferEvent::Started));
        assert!(matches!(
            events.last(),
            Some(TransferEvent::Completed { size, .. }) if *size == content.len()
        ));

        let file = history.latest().unwrap();
        assert_eq!(file.body(), b"sensor log");
        assert_eq!(sink.get(&file.handle).unwrap(), content);
    }

    #[tokio::test]
    async fn disconnect_mid_transfer_fails_with_cancelled() {
        let sink = Arc::new(MemorySink::new());
        let (receiver, events) =
            TransferReceiver::new(sink.clone(), body_config(), CancellationToken::new());
        let (link, link_rx) = link_channel(16);
        let task = tokio::spawn(receiver.run(link_rx));

        link.notify(vec![0x02]).await;
        link.notify(&b"half a fi"[..]).await;
        link.disconnect().await;

        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.failed, 1);
        assert_eq!(sink.writes(), 0);

        let events = collect(events).await;
        assert_eq!(
            events.last(),
            Some(&TransferEvent::Failed {
                kind: FailureKind::Cancelled
            })
        );
    }

    #[tokio::test]
    async fn cancellation_stops_loop() {
        let cancel = CancellationToken::new();
        let (receiver, mut events) =
            TransferReceiver::new(Arc::new(MemorySink::new()), body_config(), cancel.clone());
        let (link, link_rx) = link_channel(16);
        let task = tokio::spawn(receiver.run(link_rx));

        link.notify(vec![0x02]).await;
        link.notify(&b"data"[..]).await;
        // Wait until both notifications were consumed before cancelling.
        assert_eq!(events.recv().await, Some(TransferEvent::Started));
        assert_eq!(
            events.recv().await,
            Some(TransferEvent::Progress { bytes_received: 4 })
        );
        cancel.cancel();

        let result = task.await.unwrap();
        assert_eq!(result, Err(ReceiverError::Cancelled));
        let events = collect(events).await;
        assert_eq!(
            events.last(),
            Some(&TransferEvent::Failed {
                kind: FailureKind::Cancelled
            })
        );
    }

    #[tokio::test]
    async fn cancellation_wins_over_backed_up_events() {
        let cancel = CancellationToken::new();
        let config = TransferConfig {
            event_capacity: 2,
            strict: true,
            ..body_config()
        };
        let (receiver, _events) =
            TransferReceiver::new(Arc::new(MemorySink::new()), config, cancel.clone());
        let (link, link_rx) = link_channel(16);
        let task = tokio::spawn(receiver.run(link_rx));

        for _ in 0..4 {
            link.notify(vec![0x41]).await;
        }
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("receiver did not stop after cancel")
            .unwrap();
        assert_eq!(result, Err(ReceiverError::Cancelled));
    }

    #[tokio::test]
    async fn cancellation_interrupts_stalled_persistence() {
        let cancel = CancellationToken::new();
        let (receiver, mut events) =
            TransferReceiver::new(Arc::new(StalledSink), body_config(), cancel.clone());
        let (link, link_rx) = link_channel(16);
        let task = tokio::spawn(receiver.run(link_rx));

        link.notify(vec![0x02]).await;
        link.notify(seal_body(b"never stored")).await;
        link.notify(vec![0x03]).await;
        assert_eq!(events.recv().await, Some(TransferEvent::Started));
        assert!(matches!(
            events.recv().await,
            Some(TransferEvent::Progress { .. })
        ));
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("receiver did not stop after cancel")
            .unwrap();
        assert_eq!(result, Err(ReceiverError::Cancelled));
        assert_eq!(
            collect(events).await.last(),
            Some(&TransferEvent::Failed {
                kind: FailureKind::Cancelled
            })
        );
    }

    #[tokio::test]
    async fn closed_link_channel_is_reported() {
        let (receiver, _events) = TransferReceiver::new(
            Arc::new(MemorySink::new()),
            body_config(),
            CancellationToken::new(),
        );
        let (link, link_rx) = link_channel(4);
        drop(link);

        let result = receiver.run(link_rx).await;
        assert_eq!(result, Err(ReceiverError::LinkClosed));
    }

    #[tokio::test]
    async fn back_to_back_transfers_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(FileSink::new(dir.path(), "transfer").unwrap());
        let (receiver, _events) =
            TransferReceiver::new(sink, body_config(), CancellationToken::new());
        let history = receiver.history();
        let (link, link_rx) = link_channel(64);
        let task = tokio::spawn(receiver.run(link_rx));

        for body in [&b"first"[..], b"second"] {
            link.notify(vec![0x02]).await;
            link.notify(seal_body(body)).await;
            link.notify(vec![0x03]).await;
        }
        // A corrupted third transfer leaves nothing on disk.
        link.notify(vec![0x02]).await;
        let mut bad = seal_body(b"third");
        bad[0] ^= 0xff;
        link.notify(bad).await;
        link.notify(vec![0x03]).await;
        link.disconnect().await;

        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.failed, 1);

        let stored = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(stored, 2);
        let bodies: Vec<Vec<u8>> = history
            .snapshot()
            .iter()
            .map(|f| std::fs::read(f.handle.as_str()).unwrap())
            .map(|content| content[..content.len() - 64].to_vec())
            .collect();
        assert_eq!(bodies, vec![b"first".to_vec(), b"second".to_vec()]);
    }
}
