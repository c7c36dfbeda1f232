//! Reassembly and integrity verification for files received as a stream
//! of BLE notifications.
//!
//! [`TransferStateMachine`] consumes raw chunks one at a time, accumulates
//! payload into a [`TransferBuffer`], hands the finished content to a
//! [`PersistenceSink`] and checks it with an [`IntegrityVerifier`].

mod buffer;
mod config;
mod error;
mod history;
mod integrity;
mod progress;
mod session;
mod sink;
mod validation;

pub use buffer::TransferBuffer;
pub use config::{DigestScope, TransferConfig};
pub use error::{IntegrityError, SinkError};
pub use history::{CompletedFile, CompletedFiles};
pub use integrity::{IntegrityTag, IntegrityVerifier, checksum_bytes, seal_body};
pub use progress::ThroughputMeter;
pub use session::{TransferSession, TransferStateMachine};
pub use sink::{FileSink, MemorySink, PersistenceSink, SinkFuture};
pub use validation::validate_file_prefix;

/// Default capacity of the lifecycle event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;
