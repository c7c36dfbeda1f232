//! Framing and event types shared by the bledrop reassembly engine and
//! its presentation layers.
//!
//! A transfer arrives as a run of GATT notifications. The first chunk
//! starts with [`START_MARKER`], the last one ends with [`END_MARKER`], and
//! the 64-byte hex SHA-256 trailer rides as ordinary payload just before
//! the end marker.

pub mod framing;
pub mod types;

pub use framing::{Classification, classify};
pub use types::{FailureKind, FileHandle, Phase, TransferEvent};

/// First byte of the chunk that opens a transfer.
pub const START_MARKER: u8 = 0x02;

/// Last byte of the chunk that closes a transfer.
pub const END_MARKER: u8 = 0x03;

/// Length of the hex-encoded SHA-256 trailer.
pub const TAG_LEN: usize = 64;
