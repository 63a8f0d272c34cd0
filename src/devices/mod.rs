//! High-level clients for RENAC device families.

pub mod inverter;
pub mod wallbox;

pub use inverter::{Inverter, InverterClassifier};
pub use wallbox::{
    ChargerState, Wallbox, WallboxClassifier, WallboxStatus, is_wallbox_notification,
    parse_wallbox_notification,
};
