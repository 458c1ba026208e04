//! Frame extraction from the raw serial byte stream.

use crate::protocol::ProtocolVersion;

/// First byte of every frame on the wire.
pub const START_MARKER: u8 = 0x01;
/// Last byte of every frame on the wire.
pub const END_MARKER: u8 = 0x02;

/// One complete, marker-delimited frame as received from the device.
///
/// Immutable once extracted. Length is fixed by the protocol revision; the
/// accessors index into the full frame, matching the wire-format offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Box<[u8]>,
}

impl Frame {
    /// The two type-identifier bytes at offsets 2 and 3, in (high, low) order.
    pub fn type_id(&self) -> (u8, u8) {
        (self.bytes[2], self.bytes[3])
    }

    /// Single byte at `offset`.
    pub fn byte_at(&self, offset: usize) -> u8 {
        self.bytes[offset]
    }

    /// 16-bit little-endian field at `offset` (low byte first).
    pub fn u16_le_at(&self, offset: usize) -> u16 {
        self.bytes[offset] as u16 | (self.bytes[offset + 1] as u16) << 8
    }

    /// 32-bit big-endian field at `offset`, used for the serial number.
    pub fn u32_be_at(&self, offset: usize) -> u32 {
        (self.bytes[offset] as u32) << 24
            | (self.bytes[offset + 1] as u32) << 16
            | (self.bytes[offset + 2] as u32) << 8
            | self.bytes[offset + 3] as u32
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Accumulates raw serial input and extracts complete frames.
///
/// Owns the rolling byte buffer for one connection session. [`Self::feed`] is
/// a pure transformation over that buffer: it never blocks and never fails,
/// so it is safe to drive from a fixed-interval poll with arbitrarily small
/// (or empty) chunks.
pub struct FrameReader {
    buffer: Vec<u8>,
    frame_len: usize,
}

impl FrameReader {
    pub fn new(version: ProtocolVersion) -> Self {
        Self {
            buffer: Vec::new(),
            frame_len: version.config().frame_len,
        }
    }

    /// Append freshly read bytes and extract every complete frame now in the
    /// buffer.
    ///
    /// While at least one frame length of data is buffered: a window whose
    /// first byte is the start marker and whose last byte is the end marker is
    /// emitted and consumed whole; otherwise exactly one leading byte is
    /// dropped and the scan retries. The single-byte step is intentional -
    /// skipping further could jump over a legitimate frame start inside
    /// garbage.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        let mut discarded = 0usize;
        while self.buffer.len() >= self.frame_len {
            if self.buffer[0] == START_MARKER && self.buffer[self.frame_len - 1] == END_MARKER {
                let rest = self.buffer.split_off(self.frame_len);
                let frame = Frame {
                    bytes: core::mem::replace(&mut self.buffer, rest).into_boxed_slice(),
                };
                frames.push(frame);
            } else {
                self.buffer.remove(0);
                discarded += 1;
            }
        }
        if discarded > 0 {
            tracing::trace!(discarded, "dropped bytes while resynchronizing");
        }
        frames
    }

    /// Number of bytes currently held back waiting for a full frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial data, e.g. when a session ends.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
