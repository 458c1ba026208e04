//! Fixed-point scale divisors for the charger telemetry fields.
//!
//! Every multi-byte field on the wire is an unsigned integer in a fixed-point
//! unit; the divisor per field family is protocol-defined, not a display
//! choice - downstream consumers and file exports depend on the same physical
//! units. The cycle-log data frames changed scaling between firmware
//! revisions, so the divisor set is part of the protocol configuration.

/// Divisors for converting raw field values to physical units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleSet {
    /// Charger voltage/current/AC value and every temperature field. Raw in
    /// centi-units.
    pub charger_divisor: u32,
    /// Brick cell voltages. Raw in millivolts.
    pub cell_divisor: u32,
    /// Cycle-log charge voltage/current and C-rate setpoints. This is the
    /// divisor the firmware revisions disagree on.
    pub data_frame_divisor: u32,
}

impl ScaleSet {
    /// Current firmware: cycle-log values in centi-units.
    pub const V1: ScaleSet = ScaleSet {
        charger_divisor: 100,
        cell_divisor: 1000,
        data_frame_divisor: 100,
    };

    /// Legacy firmware: cycle-log values in milli-units.
    pub const V2: ScaleSet = ScaleSet {
        charger_divisor: 100,
        cell_divisor: 1000,
        data_frame_divisor: 1000,
    };

    /// Convert a raw charger-family value (voltage, current, temperature,
    /// AC value) to its physical unit.
    #[inline]
    pub fn raw_to_charger(&self, raw: u16) -> f64 {
        raw as f64 / self.charger_divisor as f64
    }

    /// Convert a raw cell voltage to volts.
    #[inline]
    pub fn raw_to_cell_v(&self, raw: u16) -> f64 {
        raw as f64 / self.cell_divisor as f64
    }

    /// Convert a raw cycle-log value (charge voltage/current, C-rate) to its
    /// physical unit.
    #[inline]
    pub fn raw_to_data_frame(&self, raw: u16) -> f64 {
        raw as f64 / self.data_frame_divisor as f64
    }
}
