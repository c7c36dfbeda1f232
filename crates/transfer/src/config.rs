use serde::{Deserialize, Serialize};

use crate::DEFAULT_EVENT_CAPACITY;

/// Which bytes the trailer digest is computed over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestScope {
    /// SHA-256 over the whole reassembled content, trailer included.
    ///
    /// This is what deployed senders are checked against. A trailer
    /// computed over the body alone never matches under this scope.
    #[default]
    FullContent,
    /// SHA-256 over the content minus the 64-byte trailer.
    Body,
}

/// Policy knobs for the reassembly engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Bytes the trailer digest covers.
    pub digest_scope: DigestScope,

    /// Upper bound on payload bytes per transfer. `None` means unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_transfer_size: Option<usize>,

    /// Report stray chunks outside a transfer as protocol violations
    /// instead of dropping them silently.
    pub strict: bool,

    /// Capacity of the lifecycle event channel.
    pub event_capacity: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            digest_scope: DigestScope::default(),
            max_transfer_size: None,
            strict: false,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}
