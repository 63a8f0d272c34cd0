//! In-memory transport for tests and embedders without a radio stack.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{Mutex, mpsc};

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Channel capacity for injected notifications.
const NOTIFY_CAPACITY: usize = 64;

/// A loopback transport.
///
/// Outbound frames are recorded in an outbox the test can inspect; inbound
/// notifications are injected through the sender returned by
/// [`MockTransport::notifier`].
pub struct MockTransport {
    connected: bool,
    outbox: Arc<Mutex<Vec<Bytes>>>,
    notify_tx: mpsc::Sender<Bytes>,
    notify_rx: Option<mpsc::Receiver<Bytes>>,
}

impl MockTransport {
    /// Creates a new disconnected mock transport.
    #[must_use]
    pub fn new() -> Self {
        let (notify_tx, notify_rx) = mpsc::channel(NOTIFY_CAPACITY);
        Self {
            connected: false,
            outbox: Arc::new(Mutex::new(Vec::new())),
            notify_tx,
            notify_rx: Some(notify_rx),
        }
    }

    /// Returns a sender for injecting device notifications.
    #[must_use]
    pub fn notifier(&self) -> mpsc::Sender<Bytes> {
        self.notify_tx.clone()
    }

    /// Returns a handle to the recorded outbound frames.
    #[must_use]
    pub fn outbox(&self) -> Arc<Mutex<Vec<Bytes>>> {
        Arc::clone(&self.outbox)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.connected = true;
            Ok(())
        })
    }

    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.connected = false;
            Ok(())
        })
    }

    fn send(&mut self, data: Bytes) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let outbox = Arc::clone(&self.outbox);
        let connected = self.connected;
        Box::pin(async move {
            if !connected {
                return Err(Error::NotConnected);
            }
            outbox.lock().await.push(data);
            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn take_notifications(&mut self) -> Option<mpsc::Receiver<Bytes>> {
        self.notify_rx.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_requires_connection() {
        let mut transport = MockTransport::new();
        assert!(matches!(
            transport.send(Bytes::from_static(b"x")).await,
            Err(Error::NotConnected)
        ));

        transport.connect().await.unwrap();
        transport.send(Bytes::from_static(b"x")).await.unwrap();
        assert_eq!(transport.outbox().lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_notifications_taken_once() {
        let mut transport = MockTransport::new();
        assert!(transport.take_notifications().is_some());
        assert!(transport.take_notifications().is_none());
    }
}
