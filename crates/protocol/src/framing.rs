use serde::{Deserialize, Serialize};

use crate::{END_MARKER, START_MARKER};

/// How a single notification is interpreted by the transfer state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Opens a new transfer. The chunk's bytes are not payload.
    Start,
    /// Closes the active transfer. The chunk's bytes are not payload.
    End,
    /// Payload bytes, or a stray chunk when no transfer is active.
    Payload,
}

/// Classifies a chunk against the current receive state.
///
/// - `Start` iff the first byte is [`START_MARKER`] and no transfer is active.
/// - `End` iff the last byte is [`END_MARKER`] and a transfer is active.
/// - `Payload` otherwise, including empty chunks.
///
/// The framing has no escaping, so a payload chunk whose last byte happens
/// to be `0x03` terminates the active transfer early. Senders must avoid
/// that byte at chunk boundaries.
pub fn classify(chunk: &[u8], receiving: bool) -> Classification {
    if !receiving && chunk.first() == Some(&START_MARKER) {
        return Classification::Start;
    }
    if receiving && chunk.last() == Some(&END_MARKER) {
        return Classification::End;
    }
    Classification::Payload
}
