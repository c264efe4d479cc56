//! Line-based codec for tokio.
//!
//! One encoded frame travels as one newline-terminated line. The codec is
//! binary-safe: it yields the raw line bytes and leaves frame decoding to
//! the caller, so a malformed frame can be dropped without disturbing the
//! transport. The first line of a connection is a bare username, which is
//! another reason the decoder does not parse frames itself.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};
use crate::frame::Frame;

/// Default maximum line length in bytes, terminator included.
pub const DEFAULT_MAX_FRAME_LEN: usize = 8192;

/// Codec that reads and writes newline-terminated byte lines.
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    /// Maximum line length
    max_len: usize,
}

impl LineCodec {
    /// Create a codec with the default maximum line length.
    pub fn new() -> Self {
        Self {
            next_index: 0,
            max_len: DEFAULT_MAX_FRAME_LEN,
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
    type Item = Bytes;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<Bytes>> {
        // Look for newline starting from where we left off
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(ProtocolError::FrameTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            // Strip the terminator and an optional carriage return
            let mut end = line.len() - 1;
            if end > 0 && line[end - 1] == b'\r' {
                end -= 1;
            }
            Ok(Some(line.freeze().slice(..end)))
        } else {
            // No complete line yet - remember where we stopped
            self.next_index = src.len();

            if src.len() > self.max_len {
                return Err(ProtocolError::FrameTooLong {
                    actual: src.len(),
                    limit: self.max_len,
                });
            }

            Ok(None)
        }
    }
}

impl Encoder<Bytes> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> error::Result<()> {
        if item.contains(&b'\n') {
            return Err(ProtocolError::EmbeddedNewline);
        }
        dst.reserve(item.len() + 1);
        dst.put_slice(&item);
        dst.put_u8(b'\n');
        Ok(())
    }
}

impl Encoder<Frame> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> error::Result<()> {
        let bytes = frame.encode()?;
        <Self as Encoder<Bytes>>::encode(self, bytes, dst)
    }
}
