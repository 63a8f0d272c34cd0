//! Register catalog types for RENAC devices.
//!
//! Registers are declarative configuration: each names a device memory
//! location together with the information needed to decode it. The catalogs
//! themselves (see [`inverter`]) are plain `const` data.

pub mod inverter;

use crate::protocol::Format;

/// A single named, typed, scaled device register.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Register {
    /// Register address.
    pub address: u16,
    /// Width in register units (2 bytes each).
    pub count: u16,
    /// Value encoding.
    pub format: Format,
    /// Scale factor applied after decoding.
    pub scale: f64,
    /// Physical unit, for display purposes.
    pub unit: &'static str,
}

impl Register {
    /// Width of the register payload in bytes.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.count as usize * 2
    }
}

/// A named field within a block read payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisterField {
    /// Field name, used as the key in decoded block mappings.
    pub name: &'static str,
    /// Byte offset within the block payload.
    pub offset: usize,
    /// Field length in bytes.
    pub length: usize,
    /// Value encoding.
    pub format: Format,
    /// Scale factor applied after decoding.
    pub scale: f64,
    /// Physical unit, for display purposes.
    pub unit: &'static str,
}

/// A single read covering multiple named fields at known byte offsets.
///
/// Every field must lie within `count * 2` bytes. Fields need not be
/// contiguous or exhaustive; gaps are allowed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisterBlock {
    /// Starting register address.
    pub address: u16,
    /// Number of registers covered by the read.
    pub count: u16,
    /// Field descriptors, in payload order.
    pub fields: &'static [RegisterField],
}

impl RegisterBlock {
    /// Width of the block payload in bytes.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.count as usize * 2
    }
}
