//! Client for RENAC hybrid inverters.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;
use crate::protocol::{Value, validate_checksum};
use crate::registers::Register;
use crate::registers::inverter::{
    BATTERY_POWER, BATTERY_SOC, EPS_POWER_BLOCK, EXPORT_LIMIT, INVERTER_BASIC_INFO, LOAD_POWER,
    MAXIMUM_CHARGE_CURRENT, MAXIMUM_DISCHARGE_CURRENT, MIN_SOC, MIN_SOC_ON_GRID, POWER_LIMIT_PERCENT,
    PV1_POWER, TOTAL_ENERGY_BLOCK,
};
use crate::session::{DeviceSession, NotificationClassifier};
use crate::transport::Transport;

/// Single registers folded into the power/energy overview.
const OVERVIEW_REGISTERS: &[(&str, Register)] = &[
    ("load_power", LOAD_POWER),
    ("pv_power", PV1_POWER),
    ("battery_power", BATTERY_POWER),
    ("battery_soc", BATTERY_SOC),
];

/// EPS phase fields summed into the overview's `eps_power`.
const EPS_PHASE_FIELDS: &[&str] = &["eps_r_power", "eps_s_power", "eps_t_power"];

/// Notification classifier for inverters.
///
/// Inverter replies are CRC-framed, so the full checksum is validated
/// before correlation: a mismatch drops the frame silently, it is never
/// treated as a reply nor forwarded as unsolicited data.
pub struct InverterClassifier {
    callback: Option<Arc<dyn Fn(Bytes) + Send + Sync>>,
}

impl InverterClassifier {
    /// Creates a classifier that drops unsolicited frames.
    #[must_use]
    pub const fn new() -> Self {
        Self { callback: None }
    }

    /// Creates a classifier forwarding unsolicited frames to `callback`.
    #[must_use]
    pub fn with_callback(callback: Arc<dyn Fn(Bytes) + Send + Sync>) -> Self {
        Self {
            callback: Some(callback),
        }
    }
}

impl Default for InverterClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationClassifier for InverterClassifier {
    fn accept(&self, data: &[u8]) -> bool {
        if validate_checksum(data) {
            true
        } else {
            tracing::warn!("CRC check failed on inverter frame: {}", hex::encode(data));
            false
        }
    }

    fn on_unsolicited(&self, data: Bytes) {
        if let Some(callback) = &self.callback {
            callback(data);
        } else {
            tracing::debug!("dropping unsolicited inverter frame: {}", hex::encode(&data));
        }
    }
}

/// Client for interacting with a RENAC hybrid inverter.
pub struct Inverter<T> {
    session: DeviceSession<T>,
}

impl<T: Transport + 'static> Inverter<T> {
    /// Creates a new inverter client (not yet connected).
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            session: DeviceSession::new(transport, Arc::new(InverterClassifier::new())),
        }
    }

    /// Creates a client that forwards unsolicited frames to `callback`.
    #[must_use]
    pub fn with_unsolicited_callback(
        transport: T,
        callback: impl Fn(Bytes) + Send + Sync + 'static,
    ) -> Self {
        let classifier = InverterClassifier::with_callback(Arc::new(callback));
        Self {
            session: DeviceSession::new(transport, Arc::new(classifier)),
        }
    }

    /// Connects to the inverter.
    pub async fn connect(&mut self) -> Result<()> {
        self.session.connect().await
    }

    /// Disconnects from the inverter.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.session.disconnect().await
    }

    /// Returns true if connected.
    pub async fn is_connected(&self) -> bool {
        self.session.is_connected().await
    }

    /// Returns the underlying session for direct register access.
    #[must_use]
    pub const fn session(&self) -> &DeviceSession<T> {
        &self.session
    }

    /// Returns the underlying session mutably, e.g. to adjust the timeout.
    pub fn session_mut(&mut self) -> &mut DeviceSession<T> {
        &mut self.session
    }

    /// Reads model, serial number and firmware versions.
    pub async fn info(&self) -> Result<Option<HashMap<&'static str, Value>>> {
        self.session.read_block(&INVERTER_BASIC_INFO).await
    }

    /// Collects an overview of current power and energy values.
    ///
    /// Combines the total-energy block with the overview registers and the
    /// summed EPS phase powers. Registers that do not reply in time are
    /// left out of the result.
    pub async fn power_and_energy_overview(
        &self,
    ) -> Result<Option<HashMap<&'static str, Value>>> {
        let Some(mut result) = self.session.read_block(&TOTAL_ENERGY_BLOCK).await? else {
            return Ok(None);
        };

        for &(name, register) in OVERVIEW_REGISTERS {
            match self.session.read_register(&register).await? {
                Some(value) => {
                    result.insert(name, value);
                }
                None => tracing::warn!("no reply for overview register {name}"),
            }
        }

        if let Some(eps) = self.session.read_block(&EPS_POWER_BLOCK).await? {
            let total: i64 = EPS_PHASE_FIELDS
                .iter()
                .filter_map(|name| eps.get(name).and_then(Value::as_i64))
                .sum();
            result.insert("eps_power", Value::Integer(total));
        }

        Ok(Some(result))
    }

    /// Reads the maximum battery charge current limit, in amperes.
    pub async fn max_charge_current(&self) -> Result<Option<Value>> {
        self.session.read_register(&MAXIMUM_CHARGE_CURRENT).await
    }

    /// Sets the maximum battery charge current limit, in amperes.
    pub async fn set_max_charge_current(&self, value: f64) -> Result<Option<bool>> {
        self.session.write_register(&MAXIMUM_CHARGE_CURRENT, value).await
    }

    /// Reads the maximum battery discharge current limit, in amperes.
    pub async fn max_discharge_current(&self) -> Result<Option<Value>> {
        self.session.read_register(&MAXIMUM_DISCHARGE_CURRENT).await
    }

    /// Sets the maximum battery discharge current limit, in amperes.
    pub async fn set_max_discharge_current(&self, value: f64) -> Result<Option<bool>> {
        self.session
            .write_register(&MAXIMUM_DISCHARGE_CURRENT, value)
            .await
    }

    /// Reads the minimum battery state of charge, in percent.
    pub async fn min_soc(&self) -> Result<Option<Value>> {
        self.session.read_register(&MIN_SOC).await
    }

    /// Sets the minimum battery state of charge, in percent.
    pub async fn set_min_soc(&self, value: f64) -> Result<Option<bool>> {
        self.session.write_register(&MIN_SOC, value).await
    }

    /// Reads the on-grid minimum battery state of charge, in percent.
    pub async fn min_soc_on_grid(&self) -> Result<Option<Value>> {
        self.session.read_register(&MIN_SOC_ON_GRID).await
    }

    /// Sets the on-grid minimum battery state of charge, in percent.
    pub async fn set_min_soc_on_grid(&self, value: f64) -> Result<Option<bool>> {
        self.session.write_register(&MIN_SOC_ON_GRID, value).await
    }

    /// Reads the grid export power limit, in watts.
    pub async fn export_limit(&self) -> Result<Option<Value>> {
        self.session.read_register(&EXPORT_LIMIT).await
    }

    /// Sets the grid export power limit, in watts.
    pub async fn set_export_limit(&self, value: f64) -> Result<Option<bool>> {
        self.session.write_register(&EXPORT_LIMIT, value).await
    }

    /// Reads the output power limit, in percent of nominal power.
    pub async fn power_limit_percent(&self) -> Result<Option<Value>> {
        self.session.read_register(&POWER_LIMIT_PERCENT).await
    }

    /// Sets the output power limit, in percent of nominal power.
    pub async fn set_power_limit_percent(&self, value: f64) -> Result<Option<bool>> {
        self.session.write_register(&POWER_LIMIT_PERCENT, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Format, append_checksum, build_read_request};
    use crate::registers::{RegisterBlock, RegisterField};
    use crate::transport::MockTransport;

    #[test]
    fn test_classifier_rejects_bad_crc() {
        let classifier = InverterClassifier::new();
        let mut frame = append_checksum(&[0x01, 0x03, 0x02, 0x00, 0x32]).to_vec();
        assert!(classifier.accept(&frame));
        frame[3] ^= 0xFF;
        assert!(!classifier.accept(&frame));
    }

    const MODEL_BLOCK: RegisterBlock = RegisterBlock {
        address: 10000,
        count: 8,
        fields: &[RegisterField {
            name: "model",
            offset: 0,
            length: 8,
            format: Format::Ascii,
            scale: 1.0,
            unit: "",
        }],
    };

    #[tokio::test]
    async fn test_block_read_end_to_end() {
        let transport = MockTransport::new();
        let notifier = transport.notifier();
        let outbox = transport.outbox();
        let mut inverter = Inverter::new(transport);
        inverter.connect().await.unwrap();
        let inverter = Arc::new(inverter);

        let handle = {
            let inverter = Arc::clone(&inverter);
            tokio::spawn(async move { inverter.session().read_block(&MODEL_BLOCK).await })
        };

        while outbox.lock().await.is_empty() {
            tokio::task::yield_now().await;
        }
        assert_eq!(outbox.lock().await[0], build_read_request(10000, 8));

        let mut reply = vec![0x01, 0x03, 0x10];
        reply.extend_from_slice(b"INV-1000\0\0\0\0\0\0\0\0");
        notifier.send(append_checksum(&reply)).await.unwrap();

        let fields = handle.await.unwrap().unwrap().unwrap();
        assert_eq!(fields["model"], Value::Text("INV-1000".to_owned()));
    }
}
