//! Integrity error types.

use bledrop_protocol::FailureKind;

/// Errors produced while checking a reassembled transfer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    #[error("content is empty")]
    EmptyContent,

    #[error("content too short for trailer: {len} bytes")]
    MalformedTrailer { len: usize },

    #[error("checksum mismatch: expected {expected}, computed {computed}")]
    IntegrityMismatch { expected: String, computed: String },
}

impl From<&IntegrityError> for FailureKind {
    fn from(err: &IntegrityError) -> Self {
        match err {
            IntegrityError::EmptyContent => FailureKind::EmptyContent,
            IntegrityError::MalformedTrailer { .. } => FailureKind::MalformedTrailer,
            IntegrityError::IntegrityMismatch { .. } => FailureKind::IntegrityMismatch,
        }
    }
}

/// Errors produced when configuring a persistence sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid file prefix: {0}")]
    InvalidPrefix(String),
}
