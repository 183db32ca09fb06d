//! Line-based codec for tokio.
//!
//! Reads and writes newline-terminated lines over the transport. Incoming
//! lines arrive with CRLF framing stripped, ready for [`Event::decode`];
//! outgoing lines get `\r\n` appended.
//!
//! [`Event::decode`]: crate::Event::decode

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{DecodeError, WireError};

/// Maximum line length in bytes (512 per RFC 2812, framing included).
pub const MAX_LINE_LEN: usize = 512;

/// Newline-terminated line codec with a length cap.
pub struct LineCodec {
    /// Index of next byte to check for newline.
    next_index: usize,
    max_len: usize,
}

impl LineCodec {
    /// Create a codec with the RFC 2812 line limit.
    pub fn new() -> Self {
        Self {
            next_index: 0,
            max_len: MAX_LINE_LEN,
        }
    }

    /// Create a codec with a custom maximum line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, WireError> {
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(DecodeError::LineTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                }
                .into());
            }

            let text = std::str::from_utf8(&line)
                .map_err(|e| DecodeError::InvalidUtf8(e.valid_up_to()))?;
            Ok(Some(text.trim_end_matches(&['\r', '\n'][..]).to_owned()))
        } else {
            // No complete line yet - remember where we stopped.
            self.next_index = src.len();

            if src.len() > self.max_len {
                return Err(DecodeError::LineTooLong {
                    actual: src.len(),
                    limit: self.max_len,
                }
                .into());
            }

            Ok(None)
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = WireError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), WireError> {
        dst.reserve(line.len() + 2);
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}
