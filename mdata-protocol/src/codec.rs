//! Line reassembly for newline-terminated protocol messages.

use crate::error::ProtocolError;
use crate::MAX_LINE_LENGTH;
use bytes::{Buf, Bytes, BytesMut};

/// Accumulates raw transport reads and yields complete lines.
///
/// Bytes after the first newline stay buffered for the next call, so a
/// decoder must live as long as the connection it reads from. An oversized
/// line is reported once and then dropped up to its newline, so the lines
/// after it remain readable.
#[derive(Debug)]
pub struct LineDecoder {
    buffer: BytesMut,
    max_line: usize,
    /// Set while the tail of an oversized line is still arriving.
    discarding: bool,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::with_max_line(MAX_LINE_LENGTH)
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            max_line,
            discarding: false,
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to take the next line, including its trailing newline.
    ///
    /// Returns `Ok(None)` if no complete line is buffered yet.
    pub fn decode_line(&mut self) -> Result<Option<Bytes>, ProtocolError> {
        if self.discarding {
            match self.find_newline() {
                Some(pos) => {
                    self.buffer.advance(pos + 1);
                    self.discarding = false;
                }
                None => {
                    self.clear();
                    return Ok(None);
                }
            }
        }

        match self.find_newline() {
            Some(pos) if pos + 1 > self.max_line => {
                self.buffer.advance(pos + 1);
                Err(ProtocolError::LineTooLong {
                    size: pos + 1,
                    max: self.max_line,
                })
            }
            Some(pos) => Ok(Some(self.buffer.split_to(pos + 1).freeze())),
            None if self.buffer.len() > self.max_line => {
                let size = self.buffer.len();
                self.clear();
                self.discarding = true;
                Err(ProtocolError::LineTooLong {
                    size,
                    max: self.max_line,
                })
            }
            None => Ok(None),
        }
    }

    fn find_newline(&self) -> Option<usize> {
        self.buffer.iter().position(|&b| b == b'\n')
    }

    /// Takes whatever partial line is buffered, e.g. after the peer hung up.
    ///
    /// The tail of an oversized line is never returned.
    pub fn take_remaining(&mut self) -> Option<Bytes> {
        if self.discarding {
            self.clear();
            self.discarding = false;
            return None;
        }
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.split().freeze())
        }
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}
