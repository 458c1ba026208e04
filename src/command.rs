//! Outbound command frames.

use strum_macros::Display;

use crate::error::EncodeError;

/// Fixed length of every outbound command frame.
pub const COMMAND_FRAME_LEN: usize = 10;
/// Constant second byte of every command frame.
const COMMAND_MARKER: u8 = 0xAA;

/// Commands accepted by the charger.
///
/// Every command encodes to the same 10-byte layout:
/// `[device_address, 0xAA, 0x00, opcode, payload(6)]`. Only
/// [`Command::QueryCycle`] carries a payload; the rest zero-fill it.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start passive telemetry streaming.
    ReceptionOn,
    /// Stop passive telemetry streaming.
    ReceptionOff,
    /// Emit one round of telemetry frames.
    ReceptionOnce,
    /// Ask for the battery ids present on the SD card.
    RecentData,
    /// Ask for the cycle counts per battery.
    CycleCountData,
    /// Download the log of one charge cycle. Both values must fit in 16 bits;
    /// larger inputs are a caller error, never truncated.
    QueryCycle { battery_id: u32, cycle_number: u32 },
}

impl Command {
    pub const fn opcode(&self) -> u8 {
        match self {
            Command::ReceptionOn => 0xA1,
            Command::ReceptionOff => 0xA0,
            Command::ReceptionOnce => 0xAE,
            Command::RecentData => 0xB1,
            Command::CycleCountData => 0xB2,
            Command::QueryCycle { .. } => 0xB3,
        }
    }

    /// Build the 10-byte wire frame for this command.
    ///
    /// Pure and total apart from the range check; a failed encode leaves no
    /// state behind.
    pub fn encode(&self, device_address: u8) -> Result<[u8; COMMAND_FRAME_LEN], EncodeError> {
        let mut frame = [0u8; COMMAND_FRAME_LEN];
        frame[0] = device_address;
        frame[1] = COMMAND_MARKER;
        frame[2] = 0x00;
        frame[3] = self.opcode();

        if let Command::QueryCycle {
            battery_id,
            cycle_number,
        } = *self
        {
            let battery_id = u16::try_from(battery_id).map_err(|_| {
                EncodeError::ValueOutOfRange {
                    field: "battery_id",
                    value: battery_id,
                }
            })?;
            let cycle_number = u16::try_from(cycle_number).map_err(|_| {
                EncodeError::ValueOutOfRange {
                    field: "cycle_number",
                    value: cycle_number,
                }
            })?;
            // Big-endian on the wire, unlike the little-endian telemetry fields.
            frame[4..6].copy_from_slice(&battery_id.to_be_bytes());
            frame[6..8].copy_from_slice(&cycle_number.to_be_bytes());
        }

        Ok(frame)
    }
}
