//! # renac-ble
//!
//! A Rust client library for RENAC energy hardware: hybrid inverters and
//! wallbox EV chargers reachable over a BLE notification link.
//!
//! The devices speak a Modbus-like protocol on top of an asynchronous
//! push-notification channel: a request frame is written to the device and
//! the reply arrives later as a notification. This library builds the
//! frames, correlates each request with its reply, validates checksums and
//! decodes raw register spans into typed, scaled values driven by a
//! declarative register catalog.
//!
//! ## Quick Start
//!
//! ```no_run
//! use renac_ble::{Inverter, registers::inverter::BATTERY_SOC, transport::MockTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), renac_ble::Error> {
//!     // A real deployment supplies a BLE-backed `Transport` implementation
//!     let mut inverter = Inverter::new(MockTransport::new());
//!     inverter.connect().await?;
//!
//!     if let Some(soc) = inverter.session().read_register(&BATTERY_SOC).await? {
//!         println!("battery SoC: {soc:?}");
//!     }
//!
//!     inverter.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`protocol`] - Frame construction, CRC validation and value decoding
//! - [`registers`] - Register catalog types and the inverter catalog
//! - [`transport`] - Transport seam the BLE link plugs into
//! - [`session`] - Request/response correlation over the notification channel
//! - [`devices`] - High-level [`Inverter`] and [`Wallbox`] clients

pub mod devices;
pub mod error;
pub mod protocol;
pub mod registers;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use devices::{ChargerState, Inverter, Wallbox, WallboxStatus};
pub use error::{DecodeError, Error, Result};
pub use protocol::{Format, Value};
pub use registers::{Register, RegisterBlock, RegisterField};
pub use session::{DeviceSession, NotificationClassifier, REGISTER_TIMEOUT};
pub use transport::{MockTransport, Transport};
