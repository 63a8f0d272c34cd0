//! Typed decoding of register payloads.
//!
//! Raw register spans are big-endian. Numeric formats are scaled by the
//! register's scale factor and truncated to an integer, matching the device
//! documentation (a register with scale 0.1 reporting 503 decodes to 50).

use std::collections::HashMap;
use std::str::FromStr;

use bytes::Bytes;

use crate::error::DecodeError;
use crate::registers::RegisterBlock;

/// Register value encodings supported by RENAC devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// ASCII text, NUL/space padded.
    Ascii,
    /// Unsigned 16-bit big-endian.
    UInt16,
    /// Signed 16-bit big-endian.
    Int16,
    /// Unsigned 32-bit big-endian.
    UInt32,
    /// Signed 32-bit big-endian.
    Int32,
    /// Raw bytes, left for caller-side handling.
    Custom,
}

impl Format {
    /// Returns the lowercase tag used in register documentation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::UInt16 => "uint16",
            Self::Int16 => "int16",
            Self::UInt32 => "uint32",
            Self::Int32 => "int32",
            Self::Custom => "custom",
        }
    }
}

impl FromStr for Format {
    type Err = DecodeError;

    /// Parses a format tag, rejecting unknown tags at construction time.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ascii" => Ok(Self::Ascii),
            "uint16" => Ok(Self::UInt16),
            "int16" => Ok(Self::Int16),
            "uint32" => Ok(Self::UInt32),
            "int32" => Ok(Self::Int32),
            "custom" => Ok(Self::Custom),
            other => Err(DecodeError::UnsupportedFormat(other.to_owned())),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded register value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Decoded ASCII text, trimmed of NUL and space padding.
    Text(String),
    /// Scaled integer value.
    Integer(i64),
    /// Raw bytes from a `custom` format register.
    Raw(Bytes),
}

impl Value {
    /// Returns the integer value if this is a numeric register.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text value if this is an ASCII register.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

fn be_unsigned(span: &[u8]) -> u64 {
    span.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

fn be_signed(span: &[u8]) -> i64 {
    let raw = be_unsigned(span);
    let bits = span.len() * 8;
    if bits == 0 || bits >= 64 {
        raw as i64
    } else if (raw >> (bits - 1)) & 1 == 1 {
        // Sign-extend the two's-complement value
        (raw | (u64::MAX << bits)) as i64
    } else {
        raw as i64
    }
}

fn scaled(value: f64, scale: f64) -> i64 {
    (value * scale) as i64
}

/// Decodes a byte span according to `format` and `scale`.
///
/// ASCII decoding drops non-ASCII bytes and trims NUL/space padding from
/// both ends. Numeric decoding truncates the scaled value to an integer.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn decode_value(span: &[u8], format: Format, scale: f64) -> Value {
    match format {
        Format::Ascii => {
            let text: String = span
                .iter()
                .filter(|b| b.is_ascii())
                .map(|&b| b as char)
                .collect();
            Value::Text(text.trim_matches(['\0', ' ']).to_owned())
        }
        Format::UInt16 | Format::UInt32 => {
            Value::Integer(scaled(be_unsigned(span) as f64, scale))
        }
        Format::Int16 | Format::Int32 => Value::Integer(scaled(be_signed(span) as f64, scale)),
        Format::Custom => Value::Raw(Bytes::copy_from_slice(span)),
    }
}

/// Decodes a single-register response payload.
///
/// `count` is in register units (2 bytes each); only the first `count * 2`
/// bytes of `span` are decoded.
///
/// # Errors
///
/// Returns [`DecodeError::InsufficientData`] if `span` is shorter than the
/// register width.
pub fn decode_register(
    span: &[u8],
    format: Format,
    count: u16,
    scale: f64,
) -> Result<Value, DecodeError> {
    let expected = usize::from(count) * 2;
    if span.len() < expected {
        return Err(DecodeError::InsufficientData {
            expected,
            got: span.len(),
        });
    }
    Ok(decode_value(&span[..expected], format, scale))
}

/// Decodes a block response payload into named field values.
///
/// Decoding is fail-hard: the first field that cannot be decoded aborts the
/// whole block, so a malformed reply never yields a partial mapping.
///
/// # Errors
///
/// Returns [`DecodeError::InsufficientData`] if any field lies beyond the
/// end of the payload.
pub fn decode_block(
    payload: &[u8],
    block: &RegisterBlock,
) -> Result<HashMap<&'static str, Value>, DecodeError> {
    let mut result = HashMap::with_capacity(block.fields.len());
    for field in block.fields {
        let end = field.offset + field.length;
        if payload.len() < end {
            return Err(DecodeError::InsufficientData {
                expected: end,
                got: payload.len(),
            });
        }
        let value = decode_value(&payload[field.offset..end], field.format, field.scale);
        result.insert(field.name, value);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::RegisterField;

    #[test]
    fn test_format_from_str() {
        assert_eq!("uint16".parse::<Format>(), Ok(Format::UInt16));
        assert_eq!("ascii".parse::<Format>(), Ok(Format::Ascii));
        assert_eq!(
            "float64".parse::<Format>(),
            Err(DecodeError::UnsupportedFormat("float64".to_owned()))
        );
    }

    #[test]
    fn test_decode_uint16() {
        assert_eq!(
            decode_value(&[0x00, 0x32], Format::UInt16, 1.0),
            Value::Integer(50)
        );
    }

    #[test]
    fn test_decode_int16_negative_scaled() {
        // 0xFFCE is -50; scaled by 0.1 and truncated to -5
        assert_eq!(
            decode_value(&[0xFF, 0xCE], Format::Int16, 0.1),
            Value::Integer(-5)
        );
    }

    #[test]
    fn test_decode_uint32_scaled() {
        assert_eq!(
            decode_value(&[0x00, 0x01, 0x86, 0xA0], Format::UInt32, 0.1),
            Value::Integer(10000)
        );
    }

    #[test]
    fn test_decode_int32_negative() {
        assert_eq!(
            decode_value(&[0xFF, 0xFF, 0xFF, 0x9C], Format::Int32, 1.0),
            Value::Integer(-100)
        );
    }

    #[test]
    fn test_decode_ascii_trims_padding() {
        assert_eq!(
            decode_value(b"INV-1000\0\0  ", Format::Ascii, 1.0),
            Value::Text("INV-1000".to_owned())
        );
    }

    #[test]
    fn test_decode_ascii_ignores_non_ascii() {
        assert_eq!(
            decode_value(&[0xFF, b'O', b'K', 0x80], Format::Ascii, 1.0),
            Value::Text("OK".to_owned())
        );
    }

    #[test]
    fn test_decode_custom_returns_raw_span() {
        let span = [0xDE, 0xAD, 0xBE, 0xEF];
        assert_eq!(
            decode_value(&span, Format::Custom, 1.0),
            Value::Raw(Bytes::copy_from_slice(&span))
        );
    }

    #[test]
    fn test_decode_register_requires_full_width() {
        let err = decode_register(&[0x00], Format::UInt16, 1, 1.0).unwrap_err();
        assert_eq!(err, DecodeError::InsufficientData { expected: 2, got: 1 });

        // Extra trailing bytes are ignored
        assert_eq!(
            decode_register(&[0x00, 0x32, 0xAA], Format::UInt16, 1, 1.0),
            Ok(Value::Integer(50))
        );
    }

    const TWO_FIELD_BLOCK: RegisterBlock = RegisterBlock {
        address: 11000,
        count: 3,
        fields: &[
            RegisterField {
                name: "voltage",
                offset: 0,
                length: 2,
                format: Format::Int16,
                scale: 0.1,
                unit: "V",
            },
            RegisterField {
                name: "current",
                offset: 2,
                length: 2,
                format: Format::Int16,
                scale: 0.1,
                unit: "A",
            },
        ],
    };

    #[test]
    fn test_decode_block_two_fields() {
        // 2305 * 0.1 = 230, 52 * 0.1 = 5
        let payload = [0x09, 0x01, 0x00, 0x34, 0x00, 0x00];
        let result = decode_block(&payload, &TWO_FIELD_BLOCK).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result["voltage"], Value::Integer(230));
        assert_eq!(result["current"], Value::Integer(5));
    }

    #[test]
    fn test_decode_block_field_past_end_fails() {
        let err = decode_block(&[0x09, 0x01], &TWO_FIELD_BLOCK).unwrap_err();
        assert_eq!(err, DecodeError::InsufficientData { expected: 4, got: 2 });
    }
}
