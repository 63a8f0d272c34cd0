//! Client for RENAC wallbox chargers.
//!
//! The wallbox pushes telemetry unprompted in a frame of its own: a 7-byte
//! ASCII marker followed by a fixed-offset binary payload. Classification is
//! by payload shape rather than request/response matching, and decoding is
//! fail-soft: a truncated frame still yields the fields that could be read,
//! annotated with an error description.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Local};

use crate::error::{DecodeError, Result};
use crate::session::{DeviceSession, NotificationClassifier};
use crate::transport::Transport;

/// ASCII marker framing every wallbox push notification.
pub const WALLBOX_MARKER: &[u8] = b"#SOCKA#";

/// Minimum total notification length.
const MIN_NOTIFICATION_LEN: usize = 10;

/// Charging state reported by the wallbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChargerState {
    /// No vehicle connected or session pending.
    Idle,
    /// Charging session scheduled.
    Scheduled,
    /// Charging paused.
    Paused,
    /// Actively charging.
    Charging,
    /// Charging session completed.
    Completed,
    /// Charger fault.
    Error,
}

impl ChargerState {
    /// Maps a wire state code to a charger state.
    #[must_use]
    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Idle),
            1 => Some(Self::Scheduled),
            2 => Some(Self::Paused),
            3 => Some(Self::Charging),
            4 => Some(Self::Completed),
            5 => Some(Self::Error),
            _ => None,
        }
    }

    /// Returns the lowercase state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scheduled => "scheduled",
            Self::Paused => "paused",
            Self::Charging => "charging",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ChargerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded wallbox telemetry.
///
/// Fields are `None` when the frame ended before they could be decoded; in
/// that case [`error`](WallboxStatus::error) describes the failure.
#[derive(Debug, Clone, PartialEq)]
pub struct WallboxStatus {
    /// Charger model.
    pub model: Option<String>,
    /// Serial number.
    pub sn: Option<String>,
    /// Manufacturer name.
    pub manufacturer: Option<String>,
    /// Firmware version, formatted as `V1.23`.
    pub version: Option<String>,
    /// Charging state; `None` for unknown state codes.
    pub state: Option<ChargerState>,
    /// Phase A voltage in volts.
    pub phase_a_voltage: Option<f64>,
    /// Phase A current in amperes.
    pub phase_a_current: Option<f64>,
    /// Phase B voltage in volts.
    pub phase_b_voltage: Option<f64>,
    /// Phase B current in amperes.
    pub phase_b_current: Option<f64>,
    /// Phase C voltage in volts.
    pub phase_c_voltage: Option<f64>,
    /// Phase C current in amperes.
    pub phase_c_current: Option<f64>,
    /// Instantaneous charging power in watts.
    pub power: Option<u16>,
    /// Charger temperature in degrees Celsius.
    pub temperature: Option<f64>,
    /// Energy delivered in the current session, in kWh.
    pub current_charging_amount: Option<f64>,
    /// Duration of the current session, in minutes.
    pub current_charging_time: Option<f64>,
    /// Cumulative energy delivered over the charger's lifetime, in kWh.
    pub total_charge: Option<f64>,
    /// Local time the notification was decoded.
    pub updated_at: DateTime<Local>,
    /// Description of the decode failure, if any.
    pub error: Option<String>,
}

impl WallboxStatus {
    fn empty() -> Self {
        Self {
            model: None,
            sn: None,
            manufacturer: None,
            version: None,
            state: None,
            phase_a_voltage: None,
            phase_a_current: None,
            phase_b_voltage: None,
            phase_b_current: None,
            phase_c_voltage: None,
            phase_c_current: None,
            power: None,
            temperature: None,
            current_charging_amount: None,
            current_charging_time: None,
            total_charge: None,
            updated_at: Local::now(),
            error: None,
        }
    }
}

/// Returns true if `data` looks like a wallbox push notification.
///
/// Requires the `#SOCKA#` marker, a minimum length of 10 bytes and the
/// function/sub-type bytes `03 8E` in the marker-stripped payload.
#[must_use]
pub fn is_wallbox_notification(data: &[u8]) -> bool {
    if !data.starts_with(WALLBOX_MARKER) || data.len() < MIN_NOTIFICATION_LEN {
        return false;
    }
    let payload = &data[WALLBOX_MARKER.len()..];
    payload.len() >= 3 && payload[1] == 0x03 && payload[2] == 0x8E
}

fn span(payload: &[u8], start: usize, end: usize) -> std::result::Result<&[u8], DecodeError> {
    payload.get(start..end).ok_or(DecodeError::InsufficientData {
        expected: end,
        got: payload.len(),
    })
}

fn ascii_field(payload: &[u8], start: usize, end: usize) -> std::result::Result<String, DecodeError> {
    let text: String = span(payload, start, end)?
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| b as char)
        .collect();
    Ok(text.trim_matches(['\0', ' ']).to_owned())
}

fn u16_field(payload: &[u8], start: usize) -> std::result::Result<u16, DecodeError> {
    let span = span(payload, start, start + 2)?;
    Ok(u16::from_be_bytes([span[0], span[1]]))
}

fn u32_field(payload: &[u8], start: usize) -> std::result::Result<u32, DecodeError> {
    let span = span(payload, start, start + 4)?;
    Ok(u32::from_be_bytes([span[0], span[1], span[2], span[3]]))
}

fn decimal(raw: u16) -> f64 {
    f64::from(raw) / 10.0
}

/// Extracts telemetry fields at their fixed offsets.
///
/// Offsets are relative to the marker-stripped payload. Returning early on
/// the first failure leaves the fields decoded so far in place.
fn extract_fields(payload: &[u8], status: &mut WallboxStatus) -> std::result::Result<(), DecodeError> {
    status.model = Some(ascii_field(payload, 3, 35)?);
    status.sn = Some(ascii_field(payload, 35, 67)?);
    status.manufacturer = Some(ascii_field(payload, 67, 99)?);

    status.version = Some(format!("V{:.2}", f64::from(u16_field(payload, 99)?) / 100.0));
    status.state = ChargerState::from_code(u16_field(payload, 101)?);
    status.phase_a_voltage = Some(decimal(u16_field(payload, 103)?));
    status.phase_a_current = Some(decimal(u16_field(payload, 105)?));
    status.phase_b_voltage = Some(decimal(u16_field(payload, 107)?));
    status.phase_b_current = Some(decimal(u16_field(payload, 109)?));
    status.phase_c_voltage = Some(decimal(u16_field(payload, 111)?));
    status.phase_c_current = Some(decimal(u16_field(payload, 113)?));
    status.power = Some(u16_field(payload, 115)?);
    status.temperature = Some(decimal(u16_field(payload, 117)?));
    status.current_charging_amount = Some(decimal(u16_field(payload, 119)?));
    status.current_charging_time = Some(decimal(u16_field(payload, 121)?));
    status.total_charge = Some(f64::from(u32_field(payload, 127)?) / 10.0);
    Ok(())
}

/// Parses a wallbox push notification.
///
/// Decoding is fail-soft: a frame that ends mid-field still yields the
/// fields decoded so far, with [`WallboxStatus::error`] set. Only a missing
/// marker is a hard error.
///
/// # Errors
///
/// Returns [`DecodeError::MalformedPush`] if the marker is missing.
pub fn parse_wallbox_notification(data: &[u8]) -> std::result::Result<WallboxStatus, DecodeError> {
    let Some(payload) = data.strip_prefix(WALLBOX_MARKER) else {
        return Err(DecodeError::MalformedPush {
            reason: "missing #SOCKA# marker".to_owned(),
        });
    };

    let mut status = WallboxStatus::empty();
    if let Err(e) = extract_fields(payload, &mut status) {
        tracing::warn!("wallbox notification truncated: {e}");
        status.error = Some(e.to_string());
    }
    Ok(status)
}

/// Notification classifier for wallbox chargers.
///
/// The charger pushes telemetry unprompted; frames matching the wallbox
/// shape are decoded and handed to the status callback, everything else is
/// dropped.
pub struct WallboxClassifier {
    callback: Arc<dyn Fn(WallboxStatus) + Send + Sync>,
}

impl WallboxClassifier {
    /// Creates a classifier delivering decoded telemetry to `callback`.
    #[must_use]
    pub fn new(callback: Arc<dyn Fn(WallboxStatus) + Send + Sync>) -> Self {
        Self { callback }
    }
}

impl NotificationClassifier for WallboxClassifier {
    fn on_unsolicited(&self, data: Bytes) {
        if !is_wallbox_notification(&data) {
            tracing::debug!("ignoring non-wallbox frame: {}", hex::encode(&data));
            return;
        }
        match parse_wallbox_notification(&data) {
            Ok(status) => (self.callback)(status),
            Err(e) => tracing::warn!("malformed wallbox frame: {e}"),
        }
    }
}

/// Client for interacting with a RENAC wallbox charger.
pub struct Wallbox<T> {
    session: DeviceSession<T>,
}

impl<T: Transport + 'static> Wallbox<T> {
    /// Creates a new wallbox client delivering telemetry to `on_status`.
    #[must_use]
    pub fn new(transport: T, on_status: impl Fn(WallboxStatus) + Send + Sync + 'static) -> Self {
        let classifier = WallboxClassifier::new(Arc::new(on_status));
        Self {
            session: DeviceSession::new(transport, Arc::new(classifier)),
        }
    }

    /// Connects to the wallbox.
    pub async fn connect(&mut self) -> Result<()> {
        self.session.connect().await
    }

    /// Disconnects from the wallbox.
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
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_u16(payload: &mut [u8], offset: usize, value: u16) {
        payload[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
    }

    fn sample_notification() -> Vec<u8> {
        let mut payload = vec![0u8; 131];
        payload[1] = 0x03;
        payload[2] = 0x8E;
        payload[3..8].copy_from_slice(b"AX7KW");
        payload[35..41].copy_from_slice(b"SN1234");
        payload[67..72].copy_from_slice(b"RENAC");
        put_u16(&mut payload, 99, 123);
        put_u16(&mut payload, 101, 3);
        put_u16(&mut payload, 103, 2305);
        put_u16(&mut payload, 105, 160);
        put_u16(&mut payload, 107, 2310);
        put_u16(&mut payload, 109, 0);
        put_u16(&mut payload, 111, 2298);
        put_u16(&mut payload, 113, 0);
        put_u16(&mut payload, 115, 11000);
        put_u16(&mut payload, 117, 345);
        put_u16(&mut payload, 119, 125);
        put_u16(&mut payload, 121, 450);
        payload[127..131].copy_from_slice(&123_456_u32.to_be_bytes());

        let mut data = WALLBOX_MARKER.to_vec();
        data.extend_from_slice(&payload);
        data
    }

    #[test]
    fn test_is_wallbox_notification() {
        assert!(is_wallbox_notification(&sample_notification()));

        // Wrong marker
        assert!(!is_wallbox_notification(b"#SOCKB#\x00\x03\x8E"));
        // Too short
        assert!(!is_wallbox_notification(b"#SOCKA#\x00\x03"));
        // Wrong function/sub-type bytes
        assert!(!is_wallbox_notification(b"#SOCKA#\x00\x03\x8F\x00\x00"));
        assert!(!is_wallbox_notification(b"#SOCKA#\x00\x04\x8E\x00\x00"));
    }

    #[test]
    fn test_parse_full_notification() {
        let status = parse_wallbox_notification(&sample_notification()).unwrap();
        assert_eq!(status.model.as_deref(), Some("AX7KW"));
        assert_eq!(status.sn.as_deref(), Some("SN1234"));
        assert_eq!(status.manufacturer.as_deref(), Some("RENAC"));
        assert_eq!(status.version.as_deref(), Some("V1.23"));
        assert_eq!(status.state, Some(ChargerState::Charging));
        assert_eq!(status.phase_a_voltage, Some(230.5));
        assert_eq!(status.phase_a_current, Some(16.0));
        assert_eq!(status.phase_b_voltage, Some(231.0));
        assert_eq!(status.phase_b_current, Some(0.0));
        assert_eq!(status.phase_c_voltage, Some(229.8));
        assert_eq!(status.phase_c_current, Some(0.0));
        assert_eq!(status.power, Some(11000));
        assert_eq!(status.temperature, Some(34.5));
        assert_eq!(status.current_charging_amount, Some(12.5));
        assert_eq!(status.current_charging_time, Some(45.0));
        assert_eq!(status.total_charge, Some(12345.6));
        assert_eq!(status.error, None);
    }

    #[test]
    fn test_parse_truncated_notification_is_fail_soft() {
        let mut data = sample_notification();
        // Cut mid-way through the phase A current field
        data.truncate(WALLBOX_MARKER.len() + 106);

        let status = parse_wallbox_notification(&data).unwrap();
        assert_eq!(status.model.as_deref(), Some("AX7KW"));
        assert_eq!(status.version.as_deref(), Some("V1.23"));
        assert_eq!(status.state, Some(ChargerState::Charging));
        assert_eq!(status.phase_a_voltage, Some(230.5));
        // Extraction stops at the first failure
        assert_eq!(status.phase_a_current, None);
        assert_eq!(status.total_charge, None);
        assert!(status.error.is_some());
    }

    #[test]
    fn test_parse_requires_marker() {
        assert!(matches!(
            parse_wallbox_notification(b"bogus"),
            Err(DecodeError::MalformedPush { .. })
        ));
    }

    #[test]
    fn test_unknown_state_code_maps_to_none() {
        let mut data = sample_notification();
        put_u16(&mut data[WALLBOX_MARKER.len()..], 101, 9);
        let status = parse_wallbox_notification(&data).unwrap();
        assert_eq!(status.state, None);
        assert_eq!(status.error, None);
    }

    #[test]
    fn test_charger_state_display() {
        assert_eq!(ChargerState::from_code(0), Some(ChargerState::Idle));
        assert_eq!(ChargerState::Charging.to_string(), "charging");
    }

    #[test]
    fn test_classifier_delivers_decoded_status() {
        let received = Arc::new(std::sync::Mutex::new(Vec::new()));
        let classifier = WallboxClassifier::new({
            let received = Arc::clone(&received);
            Arc::new(move |status: WallboxStatus| {
                received.lock().unwrap().push(status);
            })
        });

        classifier.on_unsolicited(Bytes::from(sample_notification()));
        classifier.on_unsolicited(Bytes::from_static(b"noise"));

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].state, Some(ChargerState::Charging));
    }
}
