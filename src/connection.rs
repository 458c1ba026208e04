//! The per-session connection object.
//!
//! One [`Charger`] is constructed per serial session and is the single owner
//! of the transport handle, the frame reader and the connection state - there
//! are no process-wide singletons. The GUI-facing layer drives [`Charger::poll`]
//! from a fixed-interval timer (100ms in the legacy tooling) and receives
//! decoded records through the [`Sink`] it passes in.

use crate::command::Command;
use crate::error::Error;
use crate::frame::FrameReader;
use crate::protocol::{MessageKind, ProtocolConfig, ProtocolVersion, classify};
use crate::record::{Record, Telemetry};
use crate::sink::Sink;
use crate::transport::Transport;

/// Lifecycle of one serial session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

/// A live connection to a Volta charger over some [`Transport`].
pub struct Charger<T: Transport> {
    transport: Option<T>,
    reader: FrameReader,
    config: ProtocolConfig,
    state: ConnectionState,
}

impl<T: Transport> Charger<T> {
    /// Take ownership of an open transport and start a session speaking the
    /// given protocol revision.
    ///
    /// The session starts in [`ConnectionState::Connected`]: the transport
    /// handle is expected to be open already. `Connecting` is for callers
    /// that track their own port-opening step before constructing the
    /// session.
    pub fn open(transport: T, version: ProtocolVersion) -> Self {
        let config = version.config();
        tracing::debug!(?version, frame_len = config.frame_len, "charger session opened");
        Self {
            transport: Some(transport),
            reader: FrameReader::new(version),
            config,
            state: ConnectionState::Connected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Encode and write one command frame.
    pub fn send(&mut self, command: Command, sink: &mut dyn Sink) -> Result<(), Error<T::Error>> {
        let frame = command.encode(self.config.device_address)?;
        if self.state != ConnectionState::Connected {
            return Err(Error::NotConnected);
        }
        tracing::debug!(%command, opcode = frame[3], "sending command");
        let result = match self.transport.as_mut() {
            Some(transport) => transport.write(&frame),
            None => return Err(Error::NotConnected),
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                self.handle_disconnect(sink, "device disconnected while sending command");
                Err(Error::Transport(e))
            }
        }
    }

    /// Ask the device to start streaming telemetry.
    pub fn start_streaming(&mut self, sink: &mut dyn Sink) -> Result<(), Error<T::Error>> {
        self.send(Command::ReceptionOn, sink)
    }

    /// Ask the device to stop streaming telemetry.
    pub fn stop_streaming(&mut self, sink: &mut dyn Sink) -> Result<(), Error<T::Error>> {
        self.send(Command::ReceptionOff, sink)
    }

    /// Ask the device for a single round of telemetry frames.
    pub fn stream_once(&mut self, sink: &mut dyn Sink) -> Result<(), Error<T::Error>> {
        self.send(Command::ReceptionOnce, sink)
    }

    /// Ask for the battery ids present on the SD card. Answers arrive as
    /// `RecentData` records through the sink.
    pub fn request_recent_data(&mut self, sink: &mut dyn Sink) -> Result<(), Error<T::Error>> {
        self.send(Command::RecentData, sink)
    }

    /// Ask for per-battery cycle counts. Answers arrive as `CycleCountData`
    /// records through the sink.
    pub fn request_cycle_counts(&mut self, sink: &mut dyn Sink) -> Result<(), Error<T::Error>> {
        self.send(Command::CycleCountData, sink)
    }

    /// Drain whatever the device has sent since the last call, extract
    /// frames and forward one decoded [`Record`] per non-Unknown frame to the
    /// sink. Returns how many records were forwarded.
    ///
    /// Never blocks; call on a fixed interval with however little has
    /// accumulated.
    pub fn poll(&mut self, sink: &mut dyn Sink) -> Result<usize, Error<T::Error>> {
        let frames = self.read_frames(sink)?;
        let mut forwarded = 0;
        for frame in frames {
            let kind = classify(self.config.version, &frame);
            if let Some(telemetry) = Telemetry::decode(kind, &frame, &self.config) {
                sink.on_record(&Record::new(telemetry));
                forwarded += 1;
            }
        }
        Ok(forwarded)
    }

    /// Read pending bytes and run frame extraction. Shared by the passive
    /// poll and the cycle-query sequencer.
    pub(crate) fn read_frames(
        &mut self,
        sink: &mut dyn Sink,
    ) -> Result<Vec<crate::frame::Frame>, Error<T::Error>> {
        if self.state != ConnectionState::Connected {
            return Err(Error::NotConnected);
        }
        if !self.transport.as_ref().is_some_and(|t| t.is_open()) {
            self.handle_disconnect(sink, "device disconnected unexpectedly");
            return Err(Error::Aborted);
        }
        let mut chunk = Vec::new();
        let result = match self.transport.as_mut() {
            Some(transport) => transport.read_available(&mut chunk),
            None => return Err(Error::NotConnected),
        };
        match result {
            Ok(_) => Ok(self.reader.feed(&chunk)),
            Err(e) => {
                self.handle_disconnect(sink, "device disconnected unexpectedly");
                Err(Error::Transport(e))
            }
        }
    }

    /// Classification shortcut used by the query sequencer.
    pub(crate) fn classify(&self, frame: &crate::frame::Frame) -> MessageKind {
        classify(self.config.version, frame)
    }

    /// Tear the session down after an I/O failure.
    ///
    /// Idempotent: once Disconnected, further calls are no-ops, so the sink
    /// sees exactly one notification per disconnect however many reads fail
    /// afterwards.
    pub(crate) fn handle_disconnect(&mut self, sink: &mut dyn Sink, reason: &str) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        tracing::warn!(reason, "connection lost");
        self.state = ConnectionState::Disconnected;
        self.transport = None;
        self.reader.clear();
        sink.on_disconnected(reason);
    }

    /// Gracefully end the session: best-effort stop-streaming command, then
    /// release the transport handle regardless of whether that write
    /// succeeded.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.state = ConnectionState::Disconnecting;
        if let Some(transport) = self.transport.as_mut() {
            if transport.is_open() {
                if let Ok(frame) = Command::ReceptionOff.encode(self.config.device_address) {
                    let _ = transport.write(&frame);
                }
            }
        }
        self.transport = None;
        self.reader.clear();
        self.state = ConnectionState::Disconnected;
        tracing::debug!("charger session closed");
    }
}
