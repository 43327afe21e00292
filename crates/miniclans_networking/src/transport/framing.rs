//! Newline framing over a byte stream.
//!
//! ```text
//! read():  [{"action":"re][ady_to_attack"}\n{"act][ion":...}\n]
//!              │                                   │
//!              v                                   v
//! frames:  {"action":"ready_to_attack"}      {"action":...}
//! ```
//!
//! A peer that never sends a delimiter would grow the buffer forever, so
//! anything past `max_frame_len` is thrown away up to the next delimiter.

use miniclans_shared::constants::FRAME_DELIMITER;

/// Accumulates stream bytes and yields complete frames.
#[derive(Debug)]
pub struct LineFramer {
    buffer: Vec<u8>,
    max_frame_len: usize,
    /// Inside an oversized frame; drop bytes until the next delimiter.
    skipping: bool,
    discarded: u64,
}

impl LineFramer {
    /// Creates a framer that refuses frames longer than `max_frame_len`.
    #[must_use]
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            max_frame_len,
            skipping: false,
            discarded: 0,
        }
    }

    /// Appends freshly read bytes.
    pub fn push(&mut self, mut bytes: &[u8]) {
        if self.skipping {
            match bytes.iter().position(|&b| b == FRAME_DELIMITER) {
                Some(end) => {
                    bytes = &bytes[end + 1..];
                    self.skipping = false;
                }
                None => return,
            }
        }
        self.buffer.extend_from_slice(bytes);
    }

    /// Removes and returns the next complete frame without its delimiter.
    ///
    /// Blank lines are skipped. Returns `None` once no complete frame is
    /// buffered.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            let Some(end) = self.buffer.iter().position(|&b| b == FRAME_DELIMITER) else {
                if self.buffer.len() > self.max_frame_len {
                    self.discard(self.buffer.len());
                    self.buffer.clear();
                    self.skipping = true;
                }
                return None;
            };

            let mut frame: Vec<u8> = self.buffer.drain(..=end).collect();
            frame.pop();
            if frame.last() == Some(&b'\r') {
                frame.pop();
            }

            if frame.len() > self.max_frame_len {
                self.discard(frame.len());
                continue;
            }
            if frame.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Some(frame);
        }
    }

    /// Oversized frames thrown away so far.
    #[must_use]
    pub const fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Bytes waiting for a delimiter.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn discard(&mut self, len: usize) {
        self.discarded += 1;
        tracing::warn!(len, limit = self.max_frame_len, "discarding oversized frame");
    }
}
