//! Modbus-like frame construction and validation for RENAC devices.
//!
//! Requests are fixed 8-byte frames:
//! ```text
//! ┌──────────┬──────────┬─────────────┬─────────────┬───────────────┐
//! │ unit id  │ function │ address BE  │ count/value │  CRC16 LE     │
//! │  0x01    │ 03 / 06  │   2 bytes   │  2 bytes BE │   2 bytes     │
//! └──────────┴──────────┴─────────────┴─────────────┴───────────────┘
//! ```
//! The CRC covers every preceding byte and is appended little-endian.

use bytes::{BufMut, Bytes, BytesMut};

/// Fixed unit/slave id used by all RENAC devices.
pub const UNIT_ID: u8 = 0x01;

/// Function code for reading holding registers.
pub const FUNC_READ_REGISTERS: u8 = 0x03;

/// Function code for writing a single register.
pub const FUNC_WRITE_REGISTER: u8 = 0x06;

/// Computes the Modbus CRC16 (polynomial 0xA001, initial value 0xFFFF).
#[must_use]
pub fn checksum(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Returns `data` with its CRC16 appended little-endian.
#[must_use]
pub fn append_checksum(data: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(data.len() + 2);
    buf.put_slice(data);
    buf.put_u16_le(checksum(data));
    buf.freeze()
}

/// Validates the trailing CRC16 of a frame.
///
/// Returns `false` for frames shorter than 3 bytes.
#[must_use]
pub fn validate_checksum(data: &[u8]) -> bool {
    if data.len() < 3 {
        return false;
    }
    let (payload, trailer) = data.split_at(data.len() - 2);
    checksum(payload).to_le_bytes() == [trailer[0], trailer[1]]
}

/// Constructs a read request for `count` registers starting at `address`.
#[must_use]
pub fn build_read_request(address: u16, count: u16) -> Bytes {
    build_request(FUNC_READ_REGISTERS, address, count)
}

/// Constructs a write request for a single register.
#[must_use]
pub fn build_write_request(address: u16, value: u16) -> Bytes {
    build_request(FUNC_WRITE_REGISTER, address, value)
}

fn build_request(function: u8, address: u16, word: u16) -> Bytes {
    let mut buf = BytesMut::with_capacity(8);
    buf.put_u8(UNIT_ID);
    buf.put_u8(function);
    buf.put_u16(address);
    buf.put_u16(word);
    let crc = checksum(&buf);
    buf.put_u16_le(crc);
    buf.freeze()
}

/// Validates a write-acknowledgement frame against the requested pair.
///
/// The device echoes the write request; the frame must carry the write
/// function code and the same address/value that were sent.
#[must_use]
pub fn validate_write_ack(data: &[u8], expected_address: u16, expected_value: u16) -> bool {
    if data.len() < 6 {
        tracing::warn!("write ack too short: {} bytes", data.len());
        return false;
    }
    if data[1] != FUNC_WRITE_REGISTER {
        tracing::warn!("unexpected function code in write ack: 0x{:02x}", data[1]);
        return false;
    }
    let address = u16::from_be_bytes([data[2], data[3]]);
    let value = u16::from_be_bytes([data[4], data[5]]);
    address == expected_address && value == expected_value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_known_vector() {
        // Reference value for the Modbus CRC16 of "123456789"
        assert_eq!(checksum(b"123456789"), 0x4B37);
    }

    #[test]
    fn test_append_and_validate_roundtrip() {
        for data in [&b""[..], &b"\x01"[..], &b"\x01\x03\x27\x10\x00\x26"[..]] {
            let framed = append_checksum(data);
            assert_eq!(framed.len(), data.len() + 2);
            assert!(validate_checksum(&framed));
        }
    }

    #[test]
    fn test_checksum_deterministic() {
        let data = b"\x01\x03\x2b\x68\x00\x01";
        assert_eq!(checksum(data), checksum(data));
    }

    #[test]
    fn test_validate_checksum_rejects_short_frames() {
        assert!(!validate_checksum(&[]));
        assert!(!validate_checksum(&[0x01]));
        assert!(!validate_checksum(&[0x01, 0x03]));
    }

    #[test]
    fn test_validate_checksum_rejects_corruption() {
        let mut framed = append_checksum(b"\x01\x03\x00\x04").to_vec();
        framed[2] ^= 0xFF;
        assert!(!validate_checksum(&framed));
    }

    #[test]
    fn test_build_read_request_layout() {
        let frame = build_read_request(10000, 38);
        assert_eq!(frame.len(), 8);
        assert_eq!(frame[0], UNIT_ID);
        assert_eq!(frame[1], FUNC_READ_REGISTERS);
        assert_eq!(u16::from_be_bytes([frame[2], frame[3]]), 10000);
        assert_eq!(u16::from_be_bytes([frame[4], frame[5]]), 38);
        assert!(validate_checksum(&frame));
    }

    #[test]
    fn test_build_write_request_layout() {
        let frame = build_write_request(21016, 250);
        assert_eq!(frame.len(), 8);
        assert_eq!(frame[1], FUNC_WRITE_REGISTER);
        assert_eq!(u16::from_be_bytes([frame[2], frame[3]]), 21016);
        assert_eq!(u16::from_be_bytes([frame[4], frame[5]]), 250);
        assert!(validate_checksum(&frame));
    }

    #[test]
    fn test_validate_write_ack() {
        let ack = build_write_request(21018, 20);
        assert!(validate_write_ack(&ack, 21018, 20));
        // Mismatched pair fails even though the CRC is valid
        assert!(!validate_write_ack(&ack, 21018, 21));
        assert!(!validate_write_ack(&ack, 21019, 20));
    }

    #[test]
    fn test_validate_write_ack_rejects_short_or_wrong_function() {
        assert!(!validate_write_ack(&[0x01, 0x06, 0x00, 0x01, 0x00], 1, 0));
        let read = build_read_request(21018, 1);
        assert!(!validate_write_ack(&read, 21018, 1));
    }
}
