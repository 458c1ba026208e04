//! Protocol revisions and message classification.
//!
//! The charger firmware has shipped with two incompatible wire layouts. They
//! differ in frame length, device address, a couple of identifier assignments
//! and the fixed-point scaling of the cycle-log data frames. A revision is
//! picked once at connection setup and never mixed; nothing on the wire
//! identifies it.

use strum_macros::{Display, EnumIter};

use crate::frame::Frame;
use crate::scaling::ScaleSet;

/// Supported protocol revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// Current firmware: 15-byte frames, device address `0x01`.
    V1,
    /// Legacy firmware: 23-byte frames, device address `0x30`, superseded
    /// identifier assignments for the SD-card query responses.
    V2,
}

/// Everything revision-dependent, resolved once from a [`ProtocolVersion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolConfig {
    pub version: ProtocolVersion,
    /// Fixed frame length. There is no length field in the wire format, so
    /// this is configuration, never inferred from data.
    pub frame_len: usize,
    /// Address byte used in outbound command frames.
    pub device_address: u8,
    /// Fixed-point divisors for this revision.
    pub scale: ScaleSet,
}

impl ProtocolVersion {
    pub const fn config(self) -> ProtocolConfig {
        match self {
            ProtocolVersion::V1 => ProtocolConfig {
                version: self,
                frame_len: 15,
                device_address: 0x01,
                scale: ScaleSet::V1,
            },
            ProtocolVersion::V2 => ProtocolConfig {
                version: self,
                frame_len: 23,
                device_address: 0x30,
                scale: ScaleSet::V2,
            },
        }
    }
}

/// Semantic classification of a frame via its 2-byte type identifier.
#[derive(Debug, Display, EnumIter, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Charger voltage / current / temperature / AC value.
    ChargerVit,
    /// Internal temperature report.
    ChargerInternalTemp,
    /// Cell voltages 1-4.
    BrickA,
    /// Cell voltages 5-8.
    BrickB,
    /// Hardware/firmware identification.
    ChargerInfo,
    DebugMessage1,
    DebugMessage2,
    /// SD-card query response: a battery id present on the card.
    RecentData,
    /// SD-card query response: cycle count for one battery.
    CycleCountData,
    /// First half of one cycle-log row.
    DataFrame1,
    /// Second half of one cycle-log row.
    DataFrame2,
    /// Identifier pair not in the table. Expected and frequent - the device
    /// emits frame types this crate does not yet model. Never an error.
    Unknown,
}

impl MessageKind {
    /// Look up the identifier pair `(high, low)` in the revision's static
    /// table. Total: unknown pairs map to [`MessageKind::Unknown`].
    pub fn from_type_id(version: ProtocolVersion, id: (u8, u8)) -> Self {
        use MessageKind as MK;
        match id {
            (0x01, 0xA1) => MK::ChargerVit,
            (0x03, 0xC1) => MK::ChargerInternalTemp,
            (0x01, 0xB0) => MK::BrickA,
            (0x02, 0xB0) => MK::BrickB,
            (0x07, 0xE0) => MK::ChargerInfo,
            (0xB1, 0xDE) => MK::DebugMessage1,
            (0xB2, 0xDE) => MK::DebugMessage2,
            (0x03, 0xE0) if version == ProtocolVersion::V1 => MK::RecentData,
            (0x04, 0xE0) if version == ProtocolVersion::V1 => MK::CycleCountData,
            (0x10, 0x5D) if version == ProtocolVersion::V2 => MK::RecentData,
            (0x06, 0x5D) if version == ProtocolVersion::V2 => MK::CycleCountData,
            (0x01, 0x5D) => MK::DataFrame1,
            (0x02, 0x5D) => MK::DataFrame2,
            _ => MK::Unknown,
        }
    }
}

/// Classify one extracted frame.
pub fn classify(version: ProtocolVersion, frame: &Frame) -> MessageKind {
    MessageKind::from_type_id(version, frame.type_id())
}
