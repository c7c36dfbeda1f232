//! Error types for the receiver.

/// Reasons a receive loop stops abnormally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReceiverError {
    #[error("cancelled")]
    Cancelled,

    #[error("link channel closed without a disconnect")]
    LinkClosed,
}
