//! Transport layer for RENAC device communication.
//!
//! The physical link (BLE GATT write characteristic plus a notify
//! characteristic) is provided by the embedding application; this module
//! only defines the seam the session talks through, and an in-memory
//! implementation for testing.

pub mod mock;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::Result;

/// Trait for transport implementations.
///
/// Inbound notifications are delivered through the channel handed out by
/// [`Transport::take_notifications`]; the session drains it from a
/// background task.
pub trait Transport: Send + Sync {
    /// Connects to the device and starts notification delivery.
    fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Disconnects from the device.
    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Sends a request frame to the device.
    fn send(&mut self, data: Bytes) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Returns true if connected.
    fn is_connected(&self) -> bool;

    /// Takes the notification stream for use in a background task.
    ///
    /// Can only be taken once per connection.
    fn take_notifications(&mut self) -> Option<mpsc::Receiver<Bytes>>;
}

pub use mock::MockTransport;
