//! Protocol definitions for RENAC device communication.
//!
//! This module contains the low-level protocol pieces:
//! - Modbus-like frame construction and CRC validation
//! - Typed register value decoding

pub mod frame;
pub mod value;

pub use frame::{
    FUNC_READ_REGISTERS, FUNC_WRITE_REGISTER, UNIT_ID, append_checksum, build_read_request,
    build_write_request, checksum, validate_checksum, validate_write_ack,
};
pub use value::{Format, Value, decode_block, decode_register, decode_value};
