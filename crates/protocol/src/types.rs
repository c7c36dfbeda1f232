use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle phase of the transfer session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Receiving,
    Finalizing,
    Completed,
    Failed,
}

impl Phase {
    /// Returns `true` once the session has finished, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

/// Identifier returned by a persistence sink for a stored transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileHandle(String);

impl FileHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reason a transfer ended in [`Phase::Failed`] or was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Reassembled content is shorter than the 64-byte trailer.
    MalformedTrailer,
    /// Reassembled content is empty.
    EmptyContent,
    /// Computed digest disagrees with the embedded trailer.
    IntegrityMismatch,
    /// The persistence sink failed.
    Io,
    /// Out-of-phase input, reported only in strict mode.
    ProtocolViolation,
    /// The link dropped or the caller aborted mid-transfer.
    Cancelled,
    /// The transfer exceeded the configured size cap.
    TooLarge,
}

impl FailureKind {
    /// Short status line suitable for a progress UI.
    pub fn status_message(self) -> &'static str {
        match self {
            FailureKind::MalformedTrailer => "Transfer incomplete: checksum missing",
            FailureKind::EmptyContent => "Transfer incomplete: no data received",
            FailureKind::IntegrityMismatch => "Checksum mismatch: file corrupted",
            FailureKind::Io => "Could not save file",
            FailureKind::ProtocolViolation => "Unexpected data from device",
            FailureKind::Cancelled => "Transfer cancelled: device disconnected",
            FailureKind::TooLarge => "Transfer too large",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status_message())
    }
}

/// Lifecycle event surfaced to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransferEvent {
    /// A start marker opened a new transfer.
    Started,
    /// Payload bytes accumulated so far.
    Progress { bytes_received: usize },
    /// The transfer was persisted and verified.
    Completed { handle: FileHandle, size: usize },
    /// The transfer was discarded. Always accompanies a move to
    /// [`Phase::Failed`].
    Failed { kind: FailureKind },
    /// A chunk outside any transfer was refused. The phase is unchanged.
    Rejected { kind: FailureKind },
}
