//! Error types for the relay wire protocol.
//!
//! Frame-level failures ([`DecodeError`], [`EncodeError`]) are kept separate
//! from transport-level failures ([`ProtocolError`]) so that callers can
//! apply different policies: a bad frame is dropped, a bad transport is torn
//! down.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Errors produced while decoding a single frame from its raw bytes.
///
/// Every variant is recoverable: the offending frame is dropped and the
/// connection stays open. Decoding never panics and never reads past the
/// end of the input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// Input ended before a field could be read in full.
    #[error("truncated frame: needed {needed} more bytes at offset {offset}")]
    Truncated {
        /// Bytes still required by the field being read.
        needed: usize,
        /// Offset at which the shortfall was detected.
        offset: usize,
    },

    /// A field boundary did not carry the expected separator byte.
    #[error("bad separator at offset {offset}: found {found:#04x}")]
    BadSeparator {
        /// Offset of the unexpected byte.
        offset: usize,
        /// The byte actually found.
        found: u8,
    },

    /// A declared string length was negative or exceeded the remaining input.
    #[error("invalid length {declared} at offset {offset} ({remaining} bytes remain)")]
    InvalidLength {
        /// The declared length, as a signed value to surface negative lengths.
        declared: i64,
        /// Offset of the length field.
        offset: usize,
        /// Bytes remaining after the length field.
        remaining: usize,
    },

    /// A string field was not valid UTF-8.
    #[error("invalid UTF-8 in string field at offset {offset}")]
    InvalidUtf8 {
        /// Offset of the start of the string payload.
        offset: usize,
    },

    /// The 4-byte kind tag did not name a known frame kind.
    #[error("unknown frame kind tag: {0}")]
    UnknownKind(u32),

    /// Bytes were left over after the final field of the frame.
    #[error("{remaining} trailing bytes after frame")]
    TrailingBytes {
        /// Number of unconsumed bytes.
        remaining: usize,
    },
}

/// Errors produced while encoding a frame.
///
/// Encoding only fails on inputs the wire format cannot carry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EncodeError {
    /// A string field contained the line terminator used by the outer framing.
    #[error("{field} contains a newline byte")]
    EmbeddedNewline {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A string field exceeded the maximum length the 4-byte prefix can carry.
    #[error("{field} is {actual} bytes (limit: {limit})")]
    FieldTooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Actual byte length.
        actual: usize,
        /// Maximum representable length.
        limit: usize,
    },
}

/// Transport-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line exceeded the maximum allowed frame length.
    #[error("frame too long: {actual} bytes (limit: {limit})")]
    FrameTooLong {
        /// Actual line length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// An outbound payload could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// An outbound payload contained the line terminator.
    #[error("outbound frame contains a newline byte")]
    EmbeddedNewline,
}
