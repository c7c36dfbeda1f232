//! Transfer state machine.
//!
//! One [`TransferSession`] is active at a time. Chunks are fed in delivery
//! order through [`TransferStateMachine::on_chunk`]; because the machine is
//! driven through `&mut self`, chunk n+1 cannot touch the buffer until
//! chunk n (including any persistence it triggered) has been handled.

use std::sync::Arc;

use bledrop_protocol::{
    Classification, END_MARKER, FailureKind, Phase, TAG_LEN, TransferEvent, classify,
};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::buffer::TransferBuffer;
use crate::config::TransferConfig;
use crate::history::{CompletedFile, CompletedFiles};
use crate::integrity::IntegrityVerifier;
use crate::progress::ThroughputMeter;
use crate::sink::PersistenceSink;

/// State of the transfer currently being reassembled.
#[derive(Debug, Default)]
pub struct TransferSession {
    phase: Phase,
    buffer: TransferBuffer,
}

impl TransferSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Payload bytes accumulated so far. Only used for progress reporting.
    pub fn bytes_received(&self) -> usize {
        self.buffer.len()
    }

    pub fn buffer(&self) -> &TransferBuffer {
        &self.buffer
    }

    fn is_receiving(&self) -> bool {
        self.phase == Phase::Receiving
    }
}

/// Drives a [`TransferSession`] from raw chunks to lifecycle events.
pub struct TransferStateMachine {
    session: TransferSession,
    sink: Arc<dyn PersistenceSink>,
    verifier: IntegrityVerifier,
    config: TransferConfig,
    events: mpsc::Sender<TransferEvent>,
    history: CompletedFiles,
    meter: ThroughputMeter,
}

impl TransferStateMachine {
    /// Creates a machine and the receiver for its lifecycle events.
    pub fn new(
        sink: Arc<dyn PersistenceSink>,
        config: TransferConfig,
    ) -> (Self, mpsc::Receiver<TransferEvent>) {
        let (events_tx, events_rx) = mpsc::channel(config.event_capacity.max(1));
        let machine = Self {
            session: TransferSession::new(),
            sink,
            verifier: IntegrityVerifier::new(config.digest_scope),
            config,
            events: events_tx,
            history: CompletedFiles::new(),
            meter: ThroughputMeter::default(),
        };
        (machine, events_rx)
    }

    pub fn session(&self) -> &TransferSession {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    /// Handle to the list of completed transfers.
    pub fn history(&self) -> CompletedFiles {
        self.history.clone()
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Feeds one notification into the machine and returns the resulting phase.
    pub async fn on_chunk(&mut self, chunk: &[u8]) -> Phase {
        if chunk.is_empty() {
            debug!("empty notification ignored");
            return self.session.phase;
        }

        let receiving = self.session.is_receiving();
        match classify(chunk, receiving) {
            Classification::Start => self.begin(),
            Classification::End => self.finalize().await,
            Classification::Payload if receiving => self.accept(chunk),
            Classification::Payload => self.stray(chunk),
        }
        self.session.phase
    }

    /// Aborts an in-flight transfer after the link dropped or the caller
    /// gave up. Nothing is persisted.
    ///
    /// Also recovers a session whose `on_chunk` future was dropped while
    /// finalizing, so the phase never stays stuck in `Finalizing`.
    pub fn on_disconnect(&mut self) -> Phase {
        if matches!(self.session.phase, Phase::Receiving | Phase::Finalizing) {
            let dropped = self.session.buffer.len();
            warn!(bytes = dropped, phase = ?self.session.phase, "link lost mid-transfer, discarding");
            self.fail(FailureKind::Cancelled);
        } else {
            debug!(phase = ?self.session.phase, "disconnect with no transfer in flight");
        }
        self.session.phase
    }

    /// Returns a finished session to `Idle`. An in-flight transfer is left alone.
    pub fn reset(&mut self) {
        if self.session.phase.is_terminal() {
            self.session.buffer.clear();
            self.session.phase = Phase::Idle;
        }
    }

    fn begin(&mut self) {
        if self.session.phase.is_terminal() {
            debug!(previous = ?self.session.phase, "resetting finished session");
            self.reset();
        }
        self.session.buffer.clear();
        self.session.phase = Phase::Receiving;
        self.meter.reset();
        info!("transfer started");
        self.emit(TransferEvent::Started);
    }

    fn accept(&mut self, chunk: &[u8]) {
        let total = self.session.buffer.len() + chunk.len();
        if let Some(max) = self.config.max_transfer_size.filter(|max| total > *max) {
            warn!(total, max, "transfer exceeds size cap");
            self.fail(FailureKind::TooLarge);
            return;
        }

        self.session.buffer.append(chunk);
        self.meter.add_sample(chunk.len());
        debug!(
            chunk = chunk.len(),
            total,
            rate = self.meter.bytes_per_second(),
            "payload received"
        );

        // Progress is advisory; drop it rather than stall the link.
        let _ = self.events.try_send(TransferEvent::Progress {
            bytes_received: total,
        });
    }

    fn stray(&mut self, chunk: &[u8]) {
        let end_marker = chunk.last() == Some(&END_MARKER);
        if self.config.strict {
            warn!(
                phase = ?self.session.phase,
                len = chunk.len(),
                end_marker,
                "chunk outside transfer rejected"
            );
            self.emit(TransferEvent::Rejected {
                kind: FailureKind::ProtocolViolation,
            });
        } else {
            debug!(
                phase = ?self.session.phase,
                len = chunk.len(),
                end_marker,
                "chunk outside transfer ignored"
            );
        }
    }

    async fn finalize(&mut self) {
        self.session.phase = Phase::Finalizing;
        let content = self.session.buffer.take();
        debug!(size = content.len(), "end marker received, finalizing");

        match self.complete(content).await {
            Ok(file) => {
                info!(
                    handle = %file.handle,
                    size = file.size(),
                    rate = self.meter.bytes_per_second(),
                    "transfer completed"
                );
                let event = TransferEvent::Completed {
                    handle: file.handle.clone(),
                    size: file.size(),
                };
                self.history.push(file);
                self.session.phase = Phase::Completed;
                self.emit(event);
            }
            Err(kind) => self.fail(kind),
        }
    }

    /// Persists then verifies `content`. Every failure is mapped to a
    /// [`FailureKind`]; an artifact that fails verification is discarded.
    async fn complete(&self, content: Vec<u8>) -> Result<CompletedFile, FailureKind> {
        if content.len() < TAG_LEN {
            warn!(size = content.len(), "transfer too short for trailer");
            return Err(FailureKind::MalformedTrailer);
        }

        let handle = self.sink.write(&content).await.map_err(|e| {
            warn!(error = %e, "failed to persist transfer");
            FailureKind::Io
        })?;

        match self.verifier.verify(&content) {
            Ok(tag) => Ok(CompletedFile {
                handle,
                content: content.into(),
                tag,
                completed_at: Utc::now(),
            }),
            Err(e) => {
                warn!(handle = %handle, error = %e, "integrity check failed");
                if let Err(de) = self.sink.discard(&handle).await {
                    warn!(handle = %handle, error = %de, "failed to discard unverified transfer");
                }
                Err(FailureKind::from(&e))
            }
        }
    }

    fn fail(&mut self, kind: FailureKind) {
        self.session.buffer.clear();
        self.session.phase = Phase::Failed;
        self.meter.reset();
        warn!(?kind, "transfer failed");
        self.emit(TransferEvent::Failed { kind });
    }

    /// Lifecycle events never block the engine. A full channel drops the
    /// event; a dropped receiver means nobody is watching.
    fn emit(&self, event: TransferEvent) {
        match self.events.try_send(event) {
            Ok(()) | Err(mpsc::error::TrySendError::Closed(_)) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(?event, "event channel full, lifecycle event dropped");
            }
        }
    }
}
