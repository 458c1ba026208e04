//! The transport seam between the protocol core and a physical serial port.

/// Capability interface required from anything carrying the charger link.
///
/// The contract is deliberately small so that a real serial port, a pipe or a
/// test double can all sit behind it. Reads are non-blocking: the connection
/// layer polls on a fixed interval and must never be stalled by the port.
pub trait Transport {
    type Error: core::fmt::Debug;

    /// Append whatever bytes are currently pending to `out` and return how
    /// many were added. Returns `Ok(0)` when nothing is waiting.
    fn read_available(&mut self, out: &mut Vec<u8>) -> Result<usize, Self::Error>;

    /// Write the full buffer to the device.
    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Whether the underlying handle is still usable.
    fn is_open(&self) -> bool;
}

#[cfg(feature = "serialport")]
pub use serial::{SerialTransport, available_ports};

#[cfg(feature = "serialport")]
mod serial {
    use super::Transport;
    use std::io::Read;
    use std::time::Duration;

    /// Charger default baud rate.
    pub const BAUD_RATE: u32 = 115_200;
    // Reads are drained via `bytes_to_read`, so the port timeout only bounds
    // the rare blocking call and can stay short.
    const SERIAL_TIMEOUT_MS: u64 = 100;

    /// [`Transport`] implementation over a real serial port.
    pub struct SerialTransport {
        port: Box<dyn serialport::SerialPort>,
        open: bool,
    }

    impl SerialTransport {
        /// Open `port_name` with the charger's fixed serial settings
        /// (115200 8N1).
        pub fn open(port_name: &str) -> Result<Self, serialport::Error> {
            let port = serialport::new(port_name, BAUD_RATE)
                .timeout(Duration::from_millis(SERIAL_TIMEOUT_MS))
                .open()?;
            Ok(Self { port, open: true })
        }

        /// Wrap an already-open port.
        pub fn from_port(port: Box<dyn serialport::SerialPort>) -> Self {
            Self { port, open: true }
        }
    }

    impl Transport for SerialTransport {
        type Error = std::io::Error;

        fn read_available(&mut self, out: &mut Vec<u8>) -> Result<usize, Self::Error> {
            let pending = self.port.bytes_to_read().map_err(|e| {
                self.open = false;
                std::io::Error::from(e)
            })? as usize;
            if pending == 0 {
                return Ok(0);
            }
            let start = out.len();
            out.resize(start + pending, 0);
            match self.port.read(&mut out[start..]) {
                Ok(n) => {
                    out.truncate(start + n);
                    Ok(n)
                }
                Err(e) => {
                    out.truncate(start);
                    self.open = false;
                    Err(e)
                }
            }
        }

        fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
            std::io::Write::write_all(&mut self.port, bytes).inspect_err(|_| self.open = false)
        }

        fn is_open(&self) -> bool {
            self.open
        }
    }

    /// List the serial port names currently present on the system.
    pub fn available_ports() -> Result<Vec<String>, serialport::Error> {
        let ports = serialport::available_ports()?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }
}
