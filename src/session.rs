//! Device session: request/response correlation over a notification link.
//!
//! The link is push-based: a request is written to the device and the reply
//! later arrives as a notification, indistinguishable on the wire from
//! unsolicited telemetry. [`DeviceSession`] makes this look synchronous by
//! allowing exactly one outstanding request at a time and treating the first
//! notification that arrives while a request is pending as its reply.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::protocol::{Value, build_read_request, build_write_request, decode_block, decode_register};
use crate::registers::{Register, RegisterBlock};
use crate::transport::Transport;

/// Default timeout for register read/write operations.
pub const REGISTER_TIMEOUT: Duration = Duration::from_secs(15);

/// Read replies carry 3 header bytes before the register payload.
const READ_REPLY_HEADER: usize = 3;

/// Write replies carry 4 header bytes before the echoed value.
///
/// The extra byte relative to read replies matches observed device
/// behavior and is treated as a fixed contract.
const WRITE_REPLY_HEADER: usize = 4;

/// Trailing CRC bytes on every reply.
const CRC_LEN: usize = 2;

/// Device-specific classification of inbound notifications.
///
/// The session applies [`accept`](NotificationClassifier::accept) to every
/// notification before correlation; rejected frames are dropped silently.
/// Accepted frames that no request is waiting for are handed to
/// [`on_unsolicited`](NotificationClassifier::on_unsolicited).
pub trait NotificationClassifier: Send + Sync {
    /// Pre-filter applied before correlation.
    fn accept(&self, data: &[u8]) -> bool {
        let _ = data;
        true
    }

    /// Handles a frame not matched to any outstanding request.
    fn on_unsolicited(&self, data: Bytes);
}

/// Classifier that drops unsolicited frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardUnsolicited;

impl NotificationClassifier for DiscardUnsolicited {
    fn on_unsolicited(&self, data: Bytes) {
        tracing::debug!("dropping unsolicited frame: {}", hex::encode(&data));
    }
}

/// Single-slot reply cell. Occupied means a request is awaiting its reply.
type ReplySlot = Arc<Mutex<Option<oneshot::Sender<Bytes>>>>;

/// Session for communicating with a single RENAC device.
///
/// Composes the frame codec, the request/response correlator and the
/// register decoder into named read/write operations.
pub struct DeviceSession<T> {
    transport: Arc<Mutex<T>>,
    classifier: Arc<dyn NotificationClassifier>,
    reply_slot: ReplySlot,
    // Serializes clear-send-wait so a second caller cannot overwrite an
    // in-flight capture.
    request_gate: Mutex<()>,
    timeout: Duration,
    notify_task: Option<JoinHandle<()>>,
}

impl<T: Transport + 'static> DeviceSession<T> {
    /// Creates a new session with the given transport and classifier.
    #[must_use]
    pub fn new(transport: T, classifier: Arc<dyn NotificationClassifier>) -> Self {
        Self {
            transport: Arc::new(Mutex::new(transport)),
            classifier,
            reply_slot: Arc::new(Mutex::new(None)),
            request_gate: Mutex::new(()),
            timeout: REGISTER_TIMEOUT,
            notify_task: None,
        }
    }

    /// Sets the reply timeout for subsequent requests.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Connects the transport and starts the notification dispatch task.
    pub async fn connect(&mut self) -> Result<()> {
        let notifications = {
            let mut transport = self.transport.lock().await;
            transport.connect().await?;
            transport.take_notifications()
        };
        let Some(rx) = notifications else {
            return Err(Error::ChannelClosed);
        };
        self.notify_task = Some(self.spawn_dispatch(rx));
        Ok(())
    }

    /// Disconnects the transport and stops notification dispatch.
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(task) = self.notify_task.take() {
            task.abort();
        }
        let mut transport = self.transport.lock().await;
        transport.disconnect().await
    }

    /// Returns true if the transport is connected.
    pub async fn is_connected(&self) -> bool {
        self.transport.lock().await.is_connected()
    }

    fn spawn_dispatch(&self, mut rx: mpsc::Receiver<Bytes>) -> JoinHandle<()> {
        let classifier = Arc::clone(&self.classifier);
        let reply_slot = Arc::clone(&self.reply_slot);

        tokio::spawn(async move {
            while let Some(data) = rx.recv().await {
                tracing::trace!("notification: {}", hex::encode(&data));
                if !classifier.accept(&data) {
                    continue;
                }

                let mut slot = reply_slot.lock().await;
                if let Some(tx) = slot.take() {
                    drop(slot);
                    // First notification while a request is awaiting wins.
                    // A send can only fail if the waiter gave up in the
                    // meantime; the frame is then late, not solicited.
                    if let Err(data) = tx.send(data) {
                        tracing::debug!("reply arrived after the waiter gave up");
                        classifier.on_unsolicited(data);
                    }
                } else {
                    drop(slot);
                    classifier.on_unsolicited(data);
                }
            }
            tracing::debug!("notification channel closed");
        })
    }

    /// Sends a raw request frame and waits for the next notification.
    ///
    /// Returns `Ok(None)` if no reply arrives within the timeout. The
    /// session is back in the idle state when this returns, whatever the
    /// outcome; a reply that shows up after the timeout is treated as
    /// unsolicited.
    pub async fn request(&self, frame: Bytes) -> Result<Option<Bytes>> {
        let _gate = self.request_gate.lock().await;

        // Arm the reply slot; this discards any stale capture.
        let (tx, rx) = oneshot::channel();
        *self.reply_slot.lock().await = Some(tx);

        let sent = {
            let mut transport = self.transport.lock().await;
            transport.send(frame).await
        };
        if let Err(e) = sent {
            *self.reply_slot.lock().await = None;
            return Err(e);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(data)) => Ok(Some(data)),
            Ok(Err(_)) => {
                *self.reply_slot.lock().await = None;
                Err(Error::ChannelClosed)
            }
            Err(_) => {
                tracing::warn!("timed out waiting for reply after {:?}", self.timeout);
                *self.reply_slot.lock().await = None;
                Ok(None)
            }
        }
    }

    /// Reads and decodes a single register.
    ///
    /// Returns `Ok(None)` on timeout or if the reply cannot be decoded.
    pub async fn read_register(&self, register: &Register) -> Result<Option<Value>> {
        let frame = build_read_request(register.address, register.count);
        let Some(reply) = self.request(frame).await? else {
            return Ok(None);
        };
        if reply.len() < READ_REPLY_HEADER + CRC_LEN {
            tracing::warn!("read reply too short: {} bytes", reply.len());
            return Ok(None);
        }
        let payload = &reply[READ_REPLY_HEADER..reply.len() - CRC_LEN];
        match decode_register(payload, register.format, register.count, register.scale) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(
                    "failed to decode reply for register {}: {e}",
                    register.address
                );
                Ok(None)
            }
        }
    }

    /// Writes a value to a register and confirms the echoed reply.
    ///
    /// The value is divided by the register's scale and truncated to 16
    /// bits before sending; out-of-range values are the caller's
    /// responsibility. Returns `Ok(None)` on timeout, otherwise whether the
    /// device echoed the requested value back.
    #[allow(clippy::float_cmp, clippy::cast_precision_loss)]
    pub async fn write_register(&self, register: &Register, value: f64) -> Result<Option<bool>> {
        let raw = (value / register.scale) as i64 as u16;
        let frame = build_write_request(register.address, raw);
        let Some(reply) = self.request(frame).await? else {
            return Ok(None);
        };
        if reply.len() < WRITE_REPLY_HEADER + CRC_LEN {
            tracing::warn!("write reply too short: {} bytes", reply.len());
            return Ok(None);
        }
        let payload = &reply[WRITE_REPLY_HEADER..reply.len() - CRC_LEN];
        let echoed = decode_register(payload, register.format, register.count, register.scale)
            .map_err(Error::Decode)?;
        Ok(Some(
            echoed.as_i64().is_some_and(|echo| echo as f64 == value),
        ))
    }

    /// Reads a register block and decodes its named fields.
    ///
    /// Returns `Ok(None)` on timeout or if the reply cannot be decoded.
    pub async fn read_block(
        &self,
        block: &RegisterBlock,
    ) -> Result<Option<HashMap<&'static str, Value>>> {
        let frame = build_read_request(block.address, block.count);
        let Some(reply) = self.request(frame).await? else {
            return Ok(None);
        };
        if reply.len() < READ_REPLY_HEADER + CRC_LEN {
            tracing::warn!("block reply too short: {} bytes", reply.len());
            return Ok(None);
        }
        let payload = &reply[READ_REPLY_HEADER..reply.len() - CRC_LEN];
        match decode_block(payload, block) {
            Ok(fields) => Ok(Some(fields)),
            Err(e) => {
                tracing::warn!("failed to decode reply for block {}: {e}", block.address);
                Ok(None)
            }
        }
    }
}

impl<T> Drop for DeviceSession<T> {
    fn drop(&mut self) {
        if let Some(task) = self.notify_task.take() {
            task.abort();
        }
    }
}
