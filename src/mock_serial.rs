//! We use this mocking module in unit tests to emulate a serial port.

use std::sync::{Arc, Mutex};

use crate::transport::Transport;

/// Our mock type used to emulate a serial port behind the [`Transport`] trait.
pub struct MockTransport {
    /// Data written to the mock port, shared so tests can inspect it after
    /// the transport has been moved into a connection.
    write_log: Arc<Mutex<Vec<u8>>>,
    /// Pre-configured response data to be read
    read_buffer: Vec<u8>,
    /// Current position in the read buffer
    read_position: usize,
    /// How many bytes one `read_available` call releases; emulates a slow
    /// device fragmenting its output.
    chunk_size: usize,
    /// Flag to simulate write errors
    should_error_on_write: bool,
    /// Flag to simulate read errors
    should_error_on_read: bool,
    /// Start failing reads once the scripted data has been consumed.
    error_after_read: bool,
    /// Whether `is_open` reports the port as usable.
    open: bool,
}

#[derive(Debug)]
pub enum MockTransportError {
    /// Generic simulated error for testing
    SimulatedError,
}

impl MockTransport {
    /// Create a new MockTransport with no scripted data.
    pub fn new() -> Self {
        Self {
            write_log: Arc::new(Mutex::new(Vec::new())),
            read_buffer: Vec::new(),
            read_position: 0,
            chunk_size: usize::MAX,
            should_error_on_write: false,
            should_error_on_read: false,
            error_after_read: false,
            open: true,
        }
    }

    /// Set the data that will be returned when `read_available` is called.
    pub fn set_read_data(&mut self, data: &[u8]) {
        self.read_buffer.clear();
        self.read_buffer.extend_from_slice(data);
        self.read_position = 0;
    }

    /// Limit how many bytes each `read_available` call releases.
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size.max(1);
    }

    /// Handle to the write log, valid even after the mock has been moved
    /// into a connection.
    pub fn shared_write_log(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.write_log)
    }

    /// Configure whether write operations should fail with an error
    pub fn set_write_error(&mut self, should_error: bool) {
        self.should_error_on_write = should_error;
    }

    /// Configure whether read operations should fail with an error
    pub fn set_read_error(&mut self, should_error: bool) {
        self.should_error_on_read = should_error;
    }

    /// Fail reads only after the scripted data has been fully consumed,
    /// emulating a port that dies mid-session.
    pub fn set_error_after_read(&mut self, should_error: bool) {
        self.error_after_read = should_error;
    }

    /// Configure what `is_open` reports.
    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }
}

/// Sink that records every callback for assertions.
#[derive(Default)]
pub struct RecordingSink {
    pub records: Vec<crate::record::Record>,
    pub downloads: Vec<crate::query::CycleDownload>,
    pub disconnect_reasons: Vec<String>,
}

impl crate::sink::Sink for RecordingSink {
    fn on_record(&mut self, record: &crate::record::Record) {
        self.records.push(record.clone());
    }

    fn on_cycle_download_complete(&mut self, download: &crate::query::CycleDownload) {
        self.downloads.push(download.clone());
    }

    fn on_disconnected(&mut self, reason: &str) {
        self.disconnect_reasons.push(reason.to_owned());
    }
}

impl Transport for MockTransport {
    type Error = MockTransportError;

    fn read_available(&mut self, out: &mut Vec<u8>) -> Result<usize, Self::Error> {
        if self.should_error_on_read {
            return Err(MockTransportError::SimulatedError);
        }
        if self.read_position >= self.read_buffer.len() {
            if self.error_after_read {
                return Err(MockTransportError::SimulatedError);
            }
            return Ok(0);
        }

        let available = self.read_buffer.len() - self.read_position;
        let to_read = available.min(self.chunk_size);
        out.extend_from_slice(&self.read_buffer[self.read_position..self.read_position + to_read]);
        self.read_position += to_read;
        Ok(to_read)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.should_error_on_write {
            return Err(MockTransportError::SimulatedError);
        }
        self.write_log.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_mock_transport() {
        let mock = MockTransport::new();
        assert!(mock.is_open());
        assert!(mock.write_log.lock().unwrap().is_empty());
        assert_eq!(mock.read_position, 0);
    }

    #[test]
    fn test_write_is_captured() {
        let mut mock = MockTransport::new();
        let log = mock.shared_write_log();
        mock.write(b"hello ").unwrap();
        mock.write(b"world").unwrap();
        assert_eq!(log.lock().unwrap().as_slice(), b"hello world");
    }

    #[test]
    fn test_read_returns_scripted_data() {
        let mut mock = MockTransport::new();
        mock.set_read_data(b"response");

        let mut out = Vec::new();
        let n = mock.read_available(&mut out).unwrap();
        assert_eq!(n, 8);
        assert_eq!(out, b"response");

        // Exhausted: further reads report nothing pending.
        let n = mock.read_available(&mut out).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_chunked_reads() {
        let mut mock = MockTransport::new();
        mock.set_read_data(b"abcdef");
        mock.set_chunk_size(4);

        let mut out = Vec::new();
        assert_eq!(mock.read_available(&mut out).unwrap(), 4);
        assert_eq!(mock.read_available(&mut out).unwrap(), 2);
        assert_eq!(out, b"abcdef");
    }

    #[test]
    fn test_read_error_simulation() {
        let mut mock = MockTransport::new();
        mock.set_read_data(b"data");
        mock.set_read_error(true);

        let mut out = Vec::new();
        assert!(mock.read_available(&mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_error_after_read() {
        let mut mock = MockTransport::new();
        mock.set_read_data(b"ok");
        mock.set_error_after_read(true);

        let mut out = Vec::new();
        assert_eq!(mock.read_available(&mut out).unwrap(), 2);
        // Scripted data gone: the next read fails.
        assert!(mock.read_available(&mut out).is_err());
    }

    #[test]
    fn test_write_error_simulation() {
        let mut mock = MockTransport::new();
        mock.set_write_error(true);
        assert!(mock.write(b"test").is_err());
        assert!(mock.write_log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_set_read_data_resets_position() {
        let mut mock = MockTransport::new();
        mock.set_read_data(b"first");
        let mut out = Vec::new();
        mock.read_available(&mut out).unwrap();

        mock.set_read_data(b"second");
        let mut out = Vec::new();
        assert_eq!(mock.read_available(&mut out).unwrap(), 6);
        assert_eq!(out, b"second");
    }
}
