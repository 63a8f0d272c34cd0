//! Error types for the renac-ble library.

use thiserror::Error;

/// The main error type for renac-ble operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value or frame decoding error.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Transport-level error from the underlying link.
    ///
    /// Not raised by this crate itself; reserved for embedder
    /// [`Transport`](crate::transport::Transport) implementations to report
    /// link failures (GATT write errors, lost connections).
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Connection is not established.
    #[error("not connected")]
    NotConnected,

    /// Notification channel closed.
    #[error("notification channel closed")]
    ChannelClosed,
}

/// Errors raised while decoding register values or push payloads.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Register format tag is not one of the known formats.
    #[error("unsupported register format: {0}")]
    UnsupportedFormat(String),

    /// Payload is shorter than the decode requires.
    #[error("insufficient data: need {expected} bytes, got {got}")]
    InsufficientData { expected: usize, got: usize },

    /// Trailing CRC does not match the frame contents.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// Push payload fails the device-specific shape check.
    #[error("malformed push frame: {reason}")]
    MalformedPush { reason: String },
}

/// Result type alias for renac-ble operations.
pub type Result<T> = std::result::Result<T, Error>;
