//! # relay-proto
//!
//! Wire protocol for the relayd chat relay.
//!
//! A frame is a typed message (connect, broadcast, direct, roster query,
//! insult, and their responses) encoded as a 4-byte big-endian kind tag
//! followed by separator-delimited, length-prefixed fields. One encoded
//! frame travels as one newline-terminated line on the transport.
//!
//! ## Quick Start
//!
//! ```rust
//! use relay_proto::Frame;
//!
//! let frame = Frame::Broadcast {
//!     sender: "alice".into(),
//!     message: "hello".into(),
//! };
//!
//! let bytes = frame.encode().expect("no embedded newline");
//! assert_eq!(Frame::decode(&bytes).expect("valid frame"), frame);
//! ```
//!
//! The `tokio` feature (default) adds [`LineCodec`], a tokio-util codec for
//! the newline-delimited outer framing.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod frame;
#[cfg(feature = "tokio")]
pub mod line;

pub use self::error::{DecodeError, EncodeError, ProtocolError, Result};
pub use self::frame::{tag, Frame, SEPARATOR};
#[cfg(feature = "tokio")]
pub use self::line::{LineCodec, DEFAULT_MAX_FRAME_LEN};
