//! This crate provides the serial protocol layer for the Volta 6S battery charger:
//! framing, message classification, field decoding and the cycle-log download
//! protocol, independent of any GUI on top of it.
//!
//! The charger streams fixed-length, marker-delimited binary frames
//! (`0x01 .. 0x02`) and accepts 10-byte command frames. Two protocol revisions
//! are in the field and must be selected explicitly at connection time:
//! * [`ProtocolVersion::V1`](protocol::ProtocolVersion) - 15-byte frames, device address `0x01`.
//! * [`ProtocolVersion::V2`](protocol::ProtocolVersion) - 23-byte frames, device address `0x30`.
//!
//! The serial port used for charger comms should be configured like so:
//! * Default baud rate: 115200
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None
//!
//! Anything that implements [`Transport`](transport::Transport) can carry the
//! link; enable the `serialport` feature for a ready-made binding over a real
//! serial port.

pub mod command;
pub mod connection;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod query;
pub mod record;
pub mod scaling;
pub mod sink;
pub mod transport;

#[cfg(test)]
mod mock_serial;
