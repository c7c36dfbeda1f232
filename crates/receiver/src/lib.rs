//! Notification receiver for bledrop transfers.
//!
//! The BLE transport (scan, connect, subscribe) lives outside this crate.
//! An adapter forwards every GATT notification as a [`LinkEvent`] on an
//! mpsc channel; [`TransferReceiver`] feeds them one at a time into the
//! reassembly engine and stops when the link reports a disconnect, the
//! channel closes, or the caller cancels.

pub mod error;
pub mod link;
pub mod receiver;

pub use error::ReceiverError;
pub use link::{LinkEvent, LinkSender, link_channel};
pub use receiver::{ReceiverSummary, TransferReceiver};

/// Default capacity of the notification channel.
///
/// A BLE link delivers at most a few hundred notifications per second, so
/// this absorbs a full second of backlog while a transfer is persisted.
pub const DEFAULT_LINK_CAPACITY: usize = 512;
