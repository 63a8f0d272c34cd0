//! Register catalog for RENAC hybrid inverters.
//!
//! Addresses and scaling follow the RENAC Modbus register documentation.

use crate::protocol::Format;
use crate::registers::{Register, RegisterBlock, RegisterField};

const fn field(
    name: &'static str,
    offset: usize,
    length: usize,
    format: Format,
    scale: f64,
    unit: &'static str,
) -> RegisterField {
    RegisterField {
        name,
        offset,
        length,
        format,
        scale,
        unit,
    }
}

/// Model, serial number and firmware versions.
///
/// The read spans 40 registers so the firmware version fields at byte
/// offsets 76 and 78 fall inside the reply payload.
pub const INVERTER_BASIC_INFO: RegisterBlock = RegisterBlock {
    address: 10000,
    count: 40,
    fields: &[
        field("model", 0, 32, Format::Ascii, 1.0, ""),
        field("sn", 32, 32, Format::Ascii, 1.0, ""),
        field("hmi_version", 70, 2, Format::UInt16, 0.01, ""),
        field("invm_version", 76, 2, Format::UInt16, 0.01, ""),
        field("invs_version", 78, 2, Format::UInt16, 0.01, ""),
    ],
};

/// Per-string PV input measurements.
pub const PV_INPUT_BLOCK: RegisterBlock = RegisterBlock {
    address: 11000,
    count: 6,
    fields: &[
        field("pv1_voltage", 0, 2, Format::Int16, 0.1, "V"),
        field("pv1_current", 2, 2, Format::Int16, 0.1, "A"),
        field("pv1_power", 4, 2, Format::Int16, 1.0, "W"),
        field("pv2_voltage", 6, 2, Format::Int16, 0.1, "V"),
        field("pv2_current", 8, 2, Format::Int16, 0.1, "A"),
        field("pv2_power", 10, 2, Format::Int16, 1.0, "W"),
    ],
};

/// Lifetime and daily energy counters.
pub const TOTAL_ENERGY_BLOCK: RegisterBlock = RegisterBlock {
    address: 14000,
    count: 27,
    fields: &[
        field("pv_total_energy", 0, 4, Format::UInt32, 0.1, "kWh"),
        field("pv_today_energy", 4, 2, Format::UInt16, 0.1, "kWh"),
        field("battery_total_charge_energy", 6, 4, Format::UInt32, 0.1, "kWh"),
        field("battery_today_charge_energy", 10, 2, Format::UInt16, 0.1, "kWh"),
        field("battery_total_discharge_energy", 12, 4, Format::UInt32, 0.1, "kWh"),
        field("battery_today_discharge_energy", 16, 2, Format::UInt16, 0.1, "kWh"),
        field("feedin_total_energy", 18, 4, Format::UInt32, 0.1, "kWh"),
        field("feedin_today_energy", 22, 2, Format::UInt16, 0.1, "kWh"),
        field("consumption_total_energy", 24, 4, Format::UInt32, 0.1, "kWh"),
        field("consumption_today_energy", 28, 2, Format::UInt16, 0.1, "kWh"),
        field("output_total_energy", 30, 4, Format::UInt32, 0.1, "kWh"),
        field("output_today_energy", 34, 2, Format::UInt16, 0.1, "kWh"),
        field("load_total_energy", 36, 4, Format::UInt32, 0.1, "kWh"),
        field("load_today_energy", 40, 2, Format::UInt16, 0.1, "kWh"),
        field("input_total_energy", 42, 4, Format::UInt32, 0.1, "kWh"),
        field("input_today_energy", 46, 2, Format::UInt16, 0.1, "kWh"),
        field("eps_total_energy", 48, 4, Format::UInt32, 0.1, "kWh"),
        field("eps_today_energy", 52, 2, Format::UInt16, 0.1, "kWh"),
    ],
};

/// Off-grid (EPS) output power per phase.
pub const EPS_POWER_BLOCK: RegisterBlock = RegisterBlock {
    address: 11094,
    count: 3,
    fields: &[
        field("eps_r_power", 0, 2, Format::Int16, 1.0, "W"),
        field("eps_s_power", 2, 2, Format::Int16, 1.0, "W"),
        field("eps_t_power", 4, 2, Format::Int16, 1.0, "W"),
    ],
};

/// Grid meter power per phase plus total.
pub const METER1_POWER_BLOCK: RegisterBlock = RegisterBlock {
    address: 11098,
    count: 4,
    fields: &[
        field("meter1_r_power", 0, 2, Format::Int16, 1.0, "W"),
        field("meter1_s_power", 2, 2, Format::Int16, 1.0, "W"),
        field("meter1_t_power", 4, 2, Format::Int16, 1.0, "W"),
        field("meter1_total_power", 6, 2, Format::Int16, 1.0, "W"),
    ],
};

/// Grid voltage per phase.
pub const GRID_VOLTAGE_BLOCK: RegisterBlock = RegisterBlock {
    address: 11076,
    count: 3,
    fields: &[
        field("grid_voltage_r", 0, 2, Format::UInt16, 0.1, "V"),
        field("grid_voltage_s", 2, 2, Format::UInt16, 0.1, "V"),
        field("grid_voltage_t", 4, 2, Format::UInt16, 0.1, "V"),
    ],
};

/// Current household load power.
pub const LOAD_POWER: Register = Register {
    address: 11113,
    count: 1,
    format: Format::Int16,
    scale: 1.0,
    unit: "W",
};

/// Lifetime household load energy.
pub const LOAD_TOTAL_ENERGY: Register = Register {
    address: 14012,
    count: 2,
    format: Format::UInt32,
    scale: 0.1,
    unit: "kWh",
};

/// Current PV string 1 power.
pub const PV1_POWER: Register = Register {
    address: 11002,
    count: 1,
    format: Format::Int16,
    scale: 1.0,
    unit: "W",
};

/// Lifetime PV string 1 energy.
pub const PV1_TOTAL_ENERGY: Register = Register {
    address: 14000,
    count: 2,
    format: Format::UInt32,
    scale: 0.1,
    unit: "kWh",
};

/// Current battery power (positive charging, negative discharging).
pub const BATTERY_POWER: Register = Register {
    address: 11022,
    count: 1,
    format: Format::Int16,
    scale: 1.0,
    unit: "W",
};

/// Battery state of charge.
pub const BATTERY_SOC: Register = Register {
    address: 11026,
    count: 1,
    format: Format::UInt16,
    scale: 1.0,
    unit: "%",
};

/// Lifetime battery charge energy.
pub const BATTERY_TOTAL_CHARGE_ENERGY: Register = Register {
    address: 14003,
    count: 2,
    format: Format::UInt32,
    scale: 0.1,
    unit: "kWh",
};

/// Lifetime battery discharge energy.
pub const BATTERY_TOTAL_DISCHARGE_ENERGY: Register = Register {
    address: 14006,
    count: 2,
    format: Format::UInt32,
    scale: 0.1,
    unit: "kWh",
};

/// Operating mode: 0 self use, 1 force-time use, 2 back up, 3 feed-in first.
pub const WORK_MODE: Register = Register {
    address: 21000,
    count: 1,
    format: Format::UInt16,
    scale: 1.0,
    unit: "",
};

/// Maximum battery charge current limit.
pub const MAXIMUM_CHARGE_CURRENT: Register = Register {
    address: 21016,
    count: 1,
    format: Format::UInt16,
    scale: 0.1,
    unit: "A",
};

/// Maximum battery discharge current limit.
pub const MAXIMUM_DISCHARGE_CURRENT: Register = Register {
    address: 21017,
    count: 1,
    format: Format::UInt16,
    scale: 0.1,
    unit: "A",
};

/// Minimum battery state of charge (off-grid).
pub const MIN_SOC: Register = Register {
    address: 21018,
    count: 1,
    format: Format::UInt16,
    scale: 1.0,
    unit: "%",
};

/// Minimum battery state of charge while on grid.
pub const MIN_SOC_ON_GRID: Register = Register {
    address: 21019,
    count: 1,
    format: Format::UInt16,
    scale: 1.0,
    unit: "%",
};

/// Grid export power limit.
pub const EXPORT_LIMIT: Register = Register {
    address: 21020,
    count: 1,
    format: Format::UInt16,
    scale: 10.0,
    unit: "W",
};

/// Output power limit as a percentage of nominal power.
pub const POWER_LIMIT_PERCENT: Register = Register {
    address: 21021,
    count: 1,
    format: Format::Int16,
    scale: 1.0,
    unit: "Pn/100",
};

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCKS: &[&RegisterBlock] = &[
        &INVERTER_BASIC_INFO,
        &PV_INPUT_BLOCK,
        &TOTAL_ENERGY_BLOCK,
        &EPS_POWER_BLOCK,
        &METER1_POWER_BLOCK,
        &GRID_VOLTAGE_BLOCK,
    ];

    #[test]
    fn test_block_fields_fit_within_payload() {
        for block in BLOCKS {
            for f in block.fields {
                assert!(
                    f.offset + f.length <= block.width(),
                    "field {} of block at {} overruns the payload",
                    f.name,
                    block.address
                );
                assert!(f.length > 0, "field {} has zero length", f.name);
            }
        }
    }
}
