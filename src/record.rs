//! Typed decoding of classified frames.

use std::time::SystemTime;

use modular_bitfield::prelude::*;

use crate::frame::Frame;
use crate::protocol::{MessageKind, ProtocolConfig};

/// "Error flags" word carried in every cycle-log row.
#[bitfield(bits = 16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeFaults {
    pub over_voltage: bool,
    pub under_voltage: bool,
    pub over_current: bool,
    pub over_temperature: bool,
    pub cell_imbalance: bool,
    pub charge_timeout: bool,
    #[skip]
    __: B10,
}

impl ChargeFaults {
    pub fn from_raw(raw: u16) -> Self {
        Self::from_bytes(raw.to_le_bytes())
    }

    pub fn raw(&self) -> u16 {
        u16::from_le_bytes(self.into_bytes())
    }
}

/// A decoded telemetry message, one variant per known [`MessageKind`].
///
/// Field layouts and scale divisors are fixed per kind; decoding is total
/// over any frame whose length was already validated by the frame reader.
#[derive(Debug, Clone, PartialEq)]
pub enum Telemetry {
    /// Charger output voltage (V), current (A), temperature (degC) and AC
    /// input value.
    ChargerVit {
        voltage: f64,
        current: f64,
        temperature: f64,
        ac_value: f64,
    },
    ChargerInternalTemp {
        volta_max_temp: f64,
        volta_avg_temp: f64,
        ambient_temp: f64,
    },
    /// Cell voltages 1-4, in volts.
    BrickA { cells: [f64; 4] },
    /// Cell voltages 5-8, in volts.
    BrickB { cells: [f64; 4] },
    ChargerInfo {
        hardware_version: u8,
        product_id: u8,
        /// Four consecutive bytes assembled big-endian.
        serial_number: u32,
        firmware_major: u8,
        firmware_minor: u8,
    },
    DebugMessage1 {
        cell_count: u8,
        charger_on: u8,
        current_count: u16,
        voltage_count: u16,
        cell_balance: u16,
    },
    DebugMessage2 {
        safety_off: u8,
        /// Note the odd one-byte offset: this field straddles offsets 5..6.
        battery_voltage: f64,
        charger_state: u8,
        output_on: u8,
        heartbeat: u8,
        error_flag: u8,
    },
    RecentData { battery_id: u16 },
    CycleCountData { battery_id: u16, cycle_count: u16 },
    DataFrame1 {
        charge_voltage: f64,
        charge_current: f64,
        rel_time: u16,
        faults: ChargeFaults,
    },
    DataFrame2 {
        set_c_rate1: f64,
        set_c_rate2: f64,
        max_volta_temp: f64,
        avg_volta_temp: f64,
    },
}

impl Telemetry {
    /// Decode the fixed field layout for `kind`. Returns `None` exactly for
    /// [`MessageKind::Unknown`]; callers must not forward that to the sink.
    pub fn decode(kind: MessageKind, frame: &Frame, config: &ProtocolConfig) -> Option<Telemetry> {
        let scale = &config.scale;
        let telemetry = match kind {
            MessageKind::ChargerVit => Telemetry::ChargerVit {
                voltage: scale.raw_to_charger(frame.u16_le_at(4)),
                current: scale.raw_to_charger(frame.u16_le_at(6)),
                temperature: scale.raw_to_charger(frame.u16_le_at(8)),
                ac_value: scale.raw_to_charger(frame.u16_le_at(10)),
            },
            MessageKind::ChargerInternalTemp => Telemetry::ChargerInternalTemp {
                volta_max_temp: scale.raw_to_charger(frame.u16_le_at(4)),
                volta_avg_temp: scale.raw_to_charger(frame.u16_le_at(6)),
                ambient_temp: scale.raw_to_charger(frame.u16_le_at(8)),
            },
            MessageKind::BrickA => Telemetry::BrickA {
                cells: [
                    scale.raw_to_cell_v(frame.u16_le_at(4)),
                    scale.raw_to_cell_v(frame.u16_le_at(6)),
                    scale.raw_to_cell_v(frame.u16_le_at(8)),
                    scale.raw_to_cell_v(frame.u16_le_at(10)),
                ],
            },
            MessageKind::BrickB => Telemetry::BrickB {
                cells: [
                    scale.raw_to_cell_v(frame.u16_le_at(4)),
                    scale.raw_to_cell_v(frame.u16_le_at(6)),
                    scale.raw_to_cell_v(frame.u16_le_at(8)),
                    scale.raw_to_cell_v(frame.u16_le_at(10)),
                ],
            },
            MessageKind::ChargerInfo => Telemetry::ChargerInfo {
                hardware_version: frame.byte_at(4),
                product_id: frame.byte_at(5),
                serial_number: frame.u32_be_at(6),
                firmware_major: frame.byte_at(10),
                firmware_minor: frame.byte_at(11),
            },
            MessageKind::DebugMessage1 => Telemetry::DebugMessage1 {
                cell_count: frame.byte_at(4),
                charger_on: frame.byte_at(5),
                current_count: frame.u16_le_at(6),
                voltage_count: frame.u16_le_at(8),
                cell_balance: frame.u16_le_at(10),
            },
            MessageKind::DebugMessage2 => Telemetry::DebugMessage2 {
                safety_off: frame.byte_at(4),
                battery_voltage: scale.raw_to_charger(frame.u16_le_at(5)),
                charger_state: frame.byte_at(7),
                output_on: frame.byte_at(8),
                heartbeat: frame.byte_at(9),
                error_flag: frame.byte_at(10),
            },
            MessageKind::RecentData => Telemetry::RecentData {
                battery_id: frame.u16_le_at(4),
            },
            MessageKind::CycleCountData => Telemetry::CycleCountData {
                battery_id: frame.u16_le_at(4),
                // Decoded raw. The legacy GUI added 2 for display; that is a
                // sink-side adjustment, not wire semantics.
                cycle_count: frame.u16_le_at(6),
            },
            MessageKind::DataFrame1 => Telemetry::DataFrame1 {
                charge_voltage: scale.raw_to_data_frame(frame.u16_le_at(4)),
                charge_current: scale.raw_to_data_frame(frame.u16_le_at(6)),
                rel_time: frame.u16_le_at(8),
                faults: ChargeFaults::from_raw(frame.u16_le_at(10)),
            },
            MessageKind::DataFrame2 => Telemetry::DataFrame2 {
                set_c_rate1: scale.raw_to_data_frame(frame.u16_le_at(4)),
                set_c_rate2: scale.raw_to_data_frame(frame.u16_le_at(6)),
                max_volta_temp: scale.raw_to_charger(frame.u16_le_at(8)),
                avg_volta_temp: scale.raw_to_charger(frame.u16_le_at(10)),
            },
            MessageKind::Unknown => return None,
        };
        Some(telemetry)
    }

    /// Name/value pairs for generic sinks and exporters. Names match the
    /// columns the legacy tooling produced.
    pub fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        use FieldValue as FV;
        match *self {
            Telemetry::ChargerVit {
                voltage,
                current,
                temperature,
                ac_value,
            } => vec![
                ("Charger Voltage", FV::Float(voltage)),
                ("Charger Current", FV::Float(current)),
                ("Charger Temp", FV::Float(temperature)),
                ("Charger AC Value", FV::Float(ac_value)),
            ],
            Telemetry::ChargerInternalTemp {
                volta_max_temp,
                volta_avg_temp,
                ambient_temp,
            } => vec![
                ("Volta Max Temp", FV::Float(volta_max_temp)),
                ("Volta Avg Temp", FV::Float(volta_avg_temp)),
                ("Ambient Temp", FV::Float(ambient_temp)),
            ],
            Telemetry::BrickA { cells } => vec![
                ("Cell 1", FV::Float(cells[0])),
                ("Cell 2", FV::Float(cells[1])),
                ("Cell 3", FV::Float(cells[2])),
                ("Cell 4", FV::Float(cells[3])),
            ],
            Telemetry::BrickB { cells } => vec![
                ("Cell 5", FV::Float(cells[0])),
                ("Cell 6", FV::Float(cells[1])),
                ("Cell 7", FV::Float(cells[2])),
                ("Cell 8", FV::Float(cells[3])),
            ],
            Telemetry::ChargerInfo {
                hardware_version,
                product_id,
                serial_number,
                firmware_major,
                firmware_minor,
            } => vec![
                ("HW Version", FV::Int(hardware_version as u64)),
                ("Product ID", FV::Int(product_id as u64)),
                ("Serial Number", FV::Int(serial_number as u64)),
                ("Firmware Version Major", FV::Int(firmware_major as u64)),
                ("Firmware Version Minor", FV::Int(firmware_minor as u64)),
            ],
            Telemetry::DebugMessage1 {
                cell_count,
                charger_on,
                current_count,
                voltage_count,
                cell_balance,
            } => vec![
                ("Cell Count", FV::Int(cell_count as u64)),
                ("Charger On Status", FV::Int(charger_on as u64)),
                ("Current Count", FV::Int(current_count as u64)),
                ("Voltage Count", FV::Int(voltage_count as u64)),
                ("Cell Balance Status", FV::Int(cell_balance as u64)),
            ],
            Telemetry::DebugMessage2 {
                safety_off,
                battery_voltage,
                charger_state,
                output_on,
                heartbeat,
                error_flag,
            } => vec![
                ("Charger Safety Off", FV::Int(safety_off as u64)),
                ("Battery Vtg read value", FV::Float(battery_voltage)),
                ("Charger state", FV::Int(charger_state as u64)),
                ("Charger O/P On", FV::Int(output_on as u64)),
                ("Volta Heartbeat", FV::Int(heartbeat as u64)),
                ("Charger Error Flag", FV::Int(error_flag as u64)),
            ],
            Telemetry::RecentData { battery_id } => {
                vec![("Battery ID", FV::Int(battery_id as u64))]
            }
            Telemetry::CycleCountData {
                battery_id,
                cycle_count,
            } => vec![
                ("Battery ID", FV::Int(battery_id as u64)),
                ("Cycle Count", FV::Int(cycle_count as u64)),
            ],
            Telemetry::DataFrame1 {
                charge_voltage,
                charge_current,
                rel_time,
                faults,
            } => vec![
                ("charge_voltage", FV::Float(charge_voltage)),
                ("charge_current", FV::Float(charge_current)),
                ("rel_time", FV::Int(rel_time as u64)),
                ("error_flags", FV::Int(faults.raw() as u64)),
            ],
            Telemetry::DataFrame2 {
                set_c_rate1,
                set_c_rate2,
                max_volta_temp,
                avg_volta_temp,
            } => vec![
                ("set_c_rate1", FV::Float(set_c_rate1)),
                ("set_c_rate2", FV::Float(set_c_rate2)),
                ("max_volta_temp", FV::Float(max_volta_temp)),
                ("avg_volta_temp", FV::Float(avg_volta_temp)),
            ],
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Telemetry::ChargerVit { .. } => MessageKind::ChargerVit,
            Telemetry::ChargerInternalTemp { .. } => MessageKind::ChargerInternalTemp,
            Telemetry::BrickA { .. } => MessageKind::BrickA,
            Telemetry::BrickB { .. } => MessageKind::BrickB,
            Telemetry::ChargerInfo { .. } => MessageKind::ChargerInfo,
            Telemetry::DebugMessage1 { .. } => MessageKind::DebugMessage1,
            Telemetry::DebugMessage2 { .. } => MessageKind::DebugMessage2,
            Telemetry::RecentData { .. } => MessageKind::RecentData,
            Telemetry::CycleCountData { .. } => MessageKind::CycleCountData,
            Telemetry::DataFrame1 { .. } => MessageKind::DataFrame1,
            Telemetry::DataFrame2 { .. } => MessageKind::DataFrame2,
        }
    }
}

/// One value of a decoded field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Int(u64),
}

impl core::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Int(v) => write!(f, "{v}"),
        }
    }
}

/// A decoded message together with its classification and capture time.
///
/// Created by the decoder and forwarded straight to the sink; the core keeps
/// no history beyond the query sequencer's download buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub kind: MessageKind,
    pub timestamp: SystemTime,
    pub telemetry: Telemetry,
}

impl Record {
    pub fn new(telemetry: Telemetry) -> Self {
        Self {
            kind: telemetry.kind(),
            timestamp: SystemTime::now(),
            telemetry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{END_MARKER, FrameReader, START_MARKER};
    use crate::protocol::{ProtocolVersion, classify};

    fn v1_frame(bytes: [u8; 15]) -> Frame {
        FrameReader::new(ProtocolVersion::V1)
            .feed(&bytes)
            .pop()
            .unwrap()
    }

    fn frame_with_payload(hi: u8, lo: u8, payload: &[u8]) -> Frame {
        let mut bytes = [0u8; 15];
        bytes[0] = START_MARKER;
        bytes[2] = hi;
        bytes[3] = lo;
        bytes[4..4 + payload.len()].copy_from_slice(payload);
        bytes[14] = END_MARKER;
        v1_frame(bytes)
    }

    #[test]
    fn decodes_charger_vit_scenario() {
        // 0x0064 / 100 = 1.00 V, 0x00C8 / 100 = 2.00 A.
        let frame = v1_frame([
            0x01, 0x00, 0x01, 0xA1, 0x64, 0x00, 0xC8, 0x00, 0xF4, 0x01, 0x2C, 0x00, 0x00, 0x00,
            0x02,
        ]);
        let kind = classify(ProtocolVersion::V1, &frame);
        assert_eq!(kind, MessageKind::ChargerVit);

        let config = ProtocolVersion::V1.config();
        let telemetry = Telemetry::decode(kind, &frame, &config).unwrap();
        match telemetry {
            Telemetry::ChargerVit {
                voltage,
                current,
                temperature,
                ac_value,
            } => {
                assert!((voltage - 1.00).abs() < 1e-9);
                assert!((current - 2.00).abs() < 1e-9);
                assert!((temperature - 5.00).abs() < 1e-9); // 0x01F4
                assert!((ac_value - 0.44).abs() < 1e-9); // 0x002C
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn decodes_brick_cells_in_millivolts() {
        // Cells 1-4 at 3.712 V, 3.700 V, 3.698 V, 3.705 V.
        let frame = frame_with_payload(
            0x01,
            0xB0,
            &[0x80, 0x0E, 0x74, 0x0E, 0x72, 0x0E, 0x79, 0x0E],
        );
        let config = ProtocolVersion::V1.config();
        let telemetry = Telemetry::decode(MessageKind::BrickA, &frame, &config).unwrap();
        match telemetry {
            Telemetry::BrickA { cells } => {
                assert!((cells[0] - 3.712).abs() < 1e-9);
                assert!((cells[1] - 3.700).abs() < 1e-9);
                assert!((cells[2] - 3.698).abs() < 1e-9);
                assert!((cells[3] - 3.705).abs() < 1e-9);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn decodes_charger_info_serial_big_endian() {
        let frame = frame_with_payload(
            0x07,
            0xE0,
            &[0x02, 0x07, 0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x04],
        );
        let config = ProtocolVersion::V1.config();
        let telemetry = Telemetry::decode(MessageKind::ChargerInfo, &frame, &config).unwrap();
        assert_eq!(
            telemetry,
            Telemetry::ChargerInfo {
                hardware_version: 2,
                product_id: 7,
                serial_number: 0xDEADBEEF,
                firmware_major: 1,
                firmware_minor: 4,
            }
        );
    }

    #[test]
    fn decodes_debug_message_2_straddled_field() {
        // battery_voltage sits at offsets 5..6 (low byte first): 0x04B0 = 12.00 V.
        let frame = frame_with_payload(0xB2, 0xDE, &[0x01, 0xB0, 0x04, 0x03, 0x01, 0x7F, 0x00]);
        let config = ProtocolVersion::V1.config();
        let telemetry = Telemetry::decode(MessageKind::DebugMessage2, &frame, &config).unwrap();
        match telemetry {
            Telemetry::DebugMessage2 {
                safety_off,
                battery_voltage,
                charger_state,
                output_on,
                heartbeat,
                error_flag,
            } => {
                assert_eq!(safety_off, 1);
                assert!((battery_voltage - 12.00).abs() < 1e-9);
                assert_eq!(charger_state, 3);
                assert_eq!(output_on, 1);
                assert_eq!(heartbeat, 0x7F);
                assert_eq!(error_flag, 0);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn cycle_count_is_decoded_raw() {
        let frame = frame_with_payload(0x04, 0xE0, &[0x05, 0x00, 0x0A, 0x00]);
        let config = ProtocolVersion::V1.config();
        let telemetry = Telemetry::decode(MessageKind::CycleCountData, &frame, &config).unwrap();
        assert_eq!(
            telemetry,
            Telemetry::CycleCountData {
                battery_id: 5,
                cycle_count: 10,
            }
        );
    }

    #[test]
    fn data_frame_scaling_follows_protocol_version() {
        let payload = [0xD2, 0x04, 0x64, 0x00, 0x0A, 0x00, 0x03, 0x00]; // 1234, 100, 10, 3
        let frame = frame_with_payload(0x01, 0x5D, &payload);

        let v1 = ProtocolVersion::V1.config();
        match Telemetry::decode(MessageKind::DataFrame1, &frame, &v1).unwrap() {
            Telemetry::DataFrame1 {
                charge_voltage,
                charge_current,
                rel_time,
                faults,
            } => {
                assert!((charge_voltage - 12.34).abs() < 1e-9);
                assert!((charge_current - 1.00).abs() < 1e-9);
                assert_eq!(rel_time, 10);
                assert_eq!(faults.raw(), 3);
                assert!(faults.over_voltage());
                assert!(faults.under_voltage());
                assert!(!faults.over_current());
            }
            other => panic!("wrong variant: {other:?}"),
        }

        let v2 = ProtocolVersion::V2.config();
        // Same raw bytes under the legacy scaling land a decade lower. The
        // frame length differs in practice; the layout offsets do not.
        match Telemetry::decode(MessageKind::DataFrame1, &frame, &v2).unwrap() {
            Telemetry::DataFrame1 { charge_voltage, .. } => {
                assert!((charge_voltage - 1.234).abs() < 1e-9);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_decodes_to_none() {
        let frame = frame_with_payload(0xDE, 0xAD, &[]);
        let config = ProtocolVersion::V1.config();
        assert_eq!(Telemetry::decode(MessageKind::Unknown, &frame, &config), None);
    }

    #[test]
    fn fields_expose_legacy_column_names() {
        let telemetry = Telemetry::ChargerVit {
            voltage: 1.0,
            current: 2.0,
            temperature: 3.0,
            ac_value: 4.0,
        };
        let fields = telemetry.fields();
        assert_eq!(fields[0], ("Charger Voltage", FieldValue::Float(1.0)));
        assert_eq!(fields[1], ("Charger Current", FieldValue::Float(2.0)));
    }

    #[test]
    fn record_tags_kind_from_telemetry() {
        let record = Record::new(Telemetry::RecentData { battery_id: 9 });
        assert_eq!(record.kind, MessageKind::RecentData);
    }
}
