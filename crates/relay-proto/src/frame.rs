//! Frame model and binary codec.
//!
//! A frame is a 4-byte big-endian kind tag followed by its parameters.
//! Each string parameter is encoded as: separator byte, 4-byte big-endian
//! byte length, separator byte, then the raw UTF-8 payload. Fixed-width
//! parameters (the `ConnectResponse` boolean, the `QueryUsersResponse`
//! count) are preceded by a separator byte. Every field boundary is marked
//! by exactly one separator.
//!
//! Decoding consumes exactly the declared lengths and reports a typed
//! [`DecodeError`] on any malformed input; it never reads out of bounds.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{DecodeError, EncodeError};

/// The single-byte field separator used by the wire format.
pub const SEPARATOR: u8 = b' ';

/// Largest byte length a string field's signed 4-byte prefix can carry.
const MAX_FIELD_LEN: usize = i32::MAX as usize;

/// Wire tag values for each frame kind. Tag 26 is unassigned.
pub mod tag {
    /// Client connection announcement.
    pub const CONNECT: u32 = 19;
    /// Server response to a connection or disconnection request.
    pub const CONNECT_RESPONSE: u32 = 20;
    /// Client disconnection request.
    pub const DISCONNECT: u32 = 21;
    /// Request for the roster of connected users.
    pub const QUERY_USERS: u32 = 22;
    /// Roster response.
    pub const QUERY_USERS_RESPONSE: u32 = 23;
    /// Message to all connected users.
    pub const BROADCAST: u32 = 24;
    /// Message to one named user.
    pub const DIRECT: u32 = 25;
    /// Request to insult a named user.
    pub const SEND_INSULT: u32 = 27;
}

/// One protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Announces a newly connected user.
    Connect {
        /// Username of the connecting client.
        sender: String,
    },
    /// Server response to `Connect` or `Disconnect`.
    ConnectResponse {
        /// Whether the request succeeded.
        success: bool,
        /// Human-readable status text.
        message: String,
    },
    /// Requests disconnection of the sender.
    Disconnect {
        /// Username of the departing client.
        sender: String,
    },
    /// Requests the roster of connected users.
    QueryUsers {
        /// Username of the requester.
        sender: String,
    },
    /// Roster of connected users.
    QueryUsersResponse {
        /// Usernames of all live sessions.
        users: Vec<String>,
    },
    /// Message delivered to every connected user except the sender.
    Broadcast {
        /// Originating username.
        sender: String,
        /// Message text.
        message: String,
    },
    /// Message delivered to exactly one named user.
    Direct {
        /// Originating username.
        sender: String,
        /// Target username.
        recipient: String,
        /// Message text.
        message: String,
    },
    /// Requests an insult be sent to a named user.
    Insult {
        /// Originating username.
        sender: String,
        /// Target username.
        recipient: String,
    },
}

impl Frame {
    /// The wire tag for this frame's kind.
    pub fn tag(&self) -> u32 {
        match self {
            Frame::Connect { .. } => tag::CONNECT,
            Frame::ConnectResponse { .. } => tag::CONNECT_RESPONSE,
            Frame::Disconnect { .. } => tag::DISCONNECT,
            Frame::QueryUsers { .. } => tag::QUERY_USERS,
            Frame::QueryUsersResponse { .. } => tag::QUERY_USERS_RESPONSE,
            Frame::Broadcast { .. } => tag::BROADCAST,
            Frame::Direct { .. } => tag::DIRECT,
            Frame::Insult { .. } => tag::SEND_INSULT,
        }
    }

    /// The username in this frame's sender field, if its kind carries one.
    pub fn sender(&self) -> Option<&str> {
        match self {
            Frame::Connect { sender }
            | Frame::Disconnect { sender }
            | Frame::QueryUsers { sender }
            | Frame::Broadcast { sender, .. }
            | Frame::Direct { sender, .. }
            | Frame::Insult { sender, .. } => Some(sender),
            Frame::ConnectResponse { .. } | Frame::QueryUsersResponse { .. } => None,
        }
    }

    /// Encode this frame to its wire bytes (without the trailing newline).
    ///
    /// Fails only when a string field contains the line terminator byte or
    /// exceeds the length the 4-byte prefix can represent.
    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut dst = BytesMut::with_capacity(16);
        dst.put_u32(self.tag());

        match self {
            Frame::Connect { sender }
            | Frame::Disconnect { sender }
            | Frame::QueryUsers { sender } => {
                put_str(&mut dst, "sender", sender)?;
            }
            Frame::ConnectResponse { success, message } => {
                dst.put_u8(SEPARATOR);
                dst.put_u8(u8::from(*success));
                put_str(&mut dst, "message", message)?;
            }
            Frame::QueryUsersResponse { users } => {
                dst.put_u8(SEPARATOR);
                dst.put_u32(users.len() as u32);
                for user in users {
                    put_str(&mut dst, "user", user)?;
                }
            }
            Frame::Broadcast { sender, message } => {
                put_str(&mut dst, "sender", sender)?;
                put_str(&mut dst, "message", message)?;
            }
            Frame::Direct {
                sender,
                recipient,
                message,
            } => {
                put_str(&mut dst, "sender", sender)?;
                put_str(&mut dst, "recipient", recipient)?;
                put_str(&mut dst, "message", message)?;
            }
            Frame::Insult { sender, recipient } => {
                put_str(&mut dst, "sender", sender)?;
                put_str(&mut dst, "recipient", recipient)?;
            }
        }

        Ok(dst.freeze())
    }

    /// Decode one frame from its raw line bytes.
    pub fn decode(input: &[u8]) -> Result<Frame, DecodeError> {
        let mut cur = Cursor::new(input);
        let tag = cur.take_u32()?;

        let frame = match tag {
            tag::CONNECT => Frame::Connect {
                sender: cur.take_str()?,
            },
            tag::CONNECT_RESPONSE => {
                cur.expect_sep()?;
                // Any nonzero byte reads as true, as the original decoder did.
                let success = cur.take_u8()? != 0;
                Frame::ConnectResponse {
                    success,
                    message: cur.take_str()?,
                }
            }
            tag::DISCONNECT => Frame::Disconnect {
                sender: cur.take_str()?,
            },
            tag::QUERY_USERS => Frame::QueryUsers {
                sender: cur.take_str()?,
            },
            tag::QUERY_USERS_RESPONSE => {
                cur.expect_sep()?;
                let offset = cur.pos;
                let count = cur.take_u32()?;
                if (count as i32) < 0 {
                    return Err(DecodeError::InvalidLength {
                        declared: i64::from(count as i32),
                        offset,
                        remaining: cur.remaining(),
                    });
                }
                let mut users = Vec::new();
                for _ in 0..count {
                    users.push(cur.take_str()?);
                }
                Frame::QueryUsersResponse { users }
            }
            tag::BROADCAST => Frame::Broadcast {
                sender: cur.take_str()?,
                message: cur.take_str()?,
            },
            tag::DIRECT => Frame::Direct {
                sender: cur.take_str()?,
                recipient: cur.take_str()?,
                message: cur.take_str()?,
            },
            tag::SEND_INSULT => Frame::Insult {
                sender: cur.take_str()?,
                recipient: cur.take_str()?,
            },
            other => return Err(DecodeError::UnknownKind(other)),
        };

        cur.finish()?;
        Ok(frame)
    }
}

/// Append one string parameter: separator, length, separator, payload.
fn put_str(dst: &mut BytesMut, field: &'static str, value: &str) -> Result<(), EncodeError> {
    if value.as_bytes().contains(&b'\n') {
        return Err(EncodeError::EmbeddedNewline { field });
    }
    if value.len() > MAX_FIELD_LEN {
        return Err(EncodeError::FieldTooLong {
            field,
            actual: value.len(),
            limit: MAX_FIELD_LEN,
        });
    }
    dst.put_u8(SEPARATOR);
    dst.put_u32(value.len() as u32);
    dst.put_u8(SEPARATOR);
    dst.put_slice(value.as_bytes());
    Ok(())
}

/// Bounds-checked reader over the raw frame bytes.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take_u8(&mut self) -> Result<u8, DecodeError> {
        if self.remaining() < 1 {
            return Err(DecodeError::Truncated {
                needed: 1,
                offset: self.pos,
            });
        }
        let b = self.buf[self.pos];
        self.pos += 1;
        Ok(b)
    }

    fn take_u32(&mut self) -> Result<u32, DecodeError> {
        if self.remaining() < 4 {
            return Err(DecodeError::Truncated {
                needed: 4 - self.remaining(),
                offset: self.pos,
            });
        }
        let bytes: [u8; 4] = self.buf[self.pos..self.pos + 4].try_into().expect("4 bytes");
        self.pos += 4;
        Ok(u32::from_be_bytes(bytes))
    }

    fn expect_sep(&mut self) -> Result<(), DecodeError> {
        let offset = self.pos;
        let b = self.take_u8()?;
        if b != SEPARATOR {
            return Err(DecodeError::BadSeparator { offset, found: b });
        }
        Ok(())
    }

    /// Read one string parameter, consuming exactly its declared length.
    fn take_str(&mut self) -> Result<String, DecodeError> {
        self.expect_sep()?;
        let len_offset = self.pos;
        let declared = self.take_u32()?;
        self.expect_sep()?;

        // The prefix is a signed 32-bit value on the wire.
        if (declared as i32) < 0 || declared as usize > self.remaining() {
            return Err(DecodeError::InvalidLength {
                declared: i64::from(declared as i32),
                offset: len_offset,
                remaining: self.remaining(),
            });
        }

        let start = self.pos;
        let end = start + declared as usize;
        let s = std::str::from_utf8(&self.buf[start..end])
            .map_err(|_| DecodeError::InvalidUtf8 { offset: start })?;
        self.pos = end;
        Ok(s.to_owned())
    }

    fn finish(self) -> Result<(), DecodeError> {
        if self.remaining() > 0 {
            return Err(DecodeError::TrailingBytes {
                remaining: self.remaining(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frames() -> Vec<Frame> {
        vec![
            Frame::Connect {
                sender: "alice".into(),
            },
            Frame::ConnectResponse {
                success: true,
                message: "Connection established with Server. There are 3 connected users."
                    .into(),
            },
            Frame::ConnectResponse {
                success: false,
                message: "Connection refused. Maximum clients reached.".into(),
            },
            Frame::Disconnect {
                sender: "alice".into(),
            },
            Frame::QueryUsers {
                sender: "alice".into(),
            },
            Frame::QueryUsersResponse { users: vec![] },
            Frame::QueryUsersResponse {
                users: vec!["alice".into(), "bob".into(), "carol".into()],
            },
            Frame::Broadcast {
                sender: "alice".into(),
                message: "hello everyone".into(),
            },
            Frame::Direct {
                sender: "alice".into(),
                recipient: "bob".into(),
                message: "psst".into(),
            },
            Frame::Insult {
                sender: "alice".into(),
                recipient: "bob".into(),
            },
        ]
    }

    #[test]
    fn test_round_trip_all_kinds() {
        for frame in sample_frames() {
            let bytes = frame.encode().unwrap();
            let decoded = Frame::decode(&bytes).unwrap();
            assert_eq!(decoded, frame);
        }
    }

    #[test]
    fn test_connect_wire_layout() {
        let frame = Frame::Connect {
            sender: "bob".into(),
        };
        let bytes = frame.encode().unwrap();
        assert_eq!(
            &bytes[..],
            [0, 0, 0, 19, b' ', 0, 0, 0, 3, b' ', b'b', b'o', b'b']
        );
    }

    #[test]
    fn test_connect_response_wire_layout() {
        let frame = Frame::ConnectResponse {
            success: true,
            message: "ok".into(),
        };
        let bytes = frame.encode().unwrap();
        // tag, separator, boolean, then the message string parameter
        assert_eq!(
            &bytes[..],
            [0, 0, 0, 20, b' ', 1, b' ', 0, 0, 0, 2, b' ', b'o', b'k']
        );
    }

    #[test]
    fn test_query_response_carries_count() {
        let frame = Frame::QueryUsersResponse {
            users: vec!["a".into(), "b".into()],
        };
        let bytes = frame.encode().unwrap();
        assert_eq!(&bytes[..4], [0, 0, 0, 23]);
        assert_eq!(bytes[4], b' ');
        assert_eq!(&bytes[5..9], [0, 0, 0, 2]);
    }

    #[test]
    fn test_every_prefix_fails_cleanly() {
        for frame in sample_frames() {
            let bytes = frame.encode().unwrap();
            for cut in 0..bytes.len() {
                let result = Frame::decode(&bytes[..cut]);
                assert!(
                    result.is_err(),
                    "prefix of length {cut} of {frame:?} decoded to {result:?}"
                );
            }
        }
    }

    #[test]
    fn test_unknown_kind() {
        let bytes = 26u32.to_be_bytes();
        assert_eq!(Frame::decode(&bytes), Err(DecodeError::UnknownKind(26)));
    }

    #[test]
    fn test_bad_separator() {
        let frame = Frame::Connect {
            sender: "bob".into(),
        };
        let mut bytes = frame.encode().unwrap().to_vec();
        bytes[4] = b'x';
        assert!(matches!(
            Frame::decode(&bytes),
            Err(DecodeError::BadSeparator { offset: 4, found: b'x' })
        ));
    }

    #[test]
    fn test_negative_length_rejected() {
        let mut bytes = vec![0, 0, 0, 19, b' '];
        bytes.extend_from_slice(&(-1i32).to_be_bytes());
        bytes.push(b' ');
        assert!(matches!(
            Frame::decode(&bytes),
            Err(DecodeError::InvalidLength { declared: -1, .. })
        ));
    }

    #[test]
    fn test_length_exceeding_input_rejected() {
        let mut bytes = vec![0, 0, 0, 19, b' '];
        bytes.extend_from_slice(&100u32.to_be_bytes());
        bytes.push(b' ');
        bytes.extend_from_slice(b"short");
        assert!(matches!(
            Frame::decode(&bytes),
            Err(DecodeError::InvalidLength {
                declared: 100,
                remaining: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut bytes = vec![0, 0, 0, 19, b' ', 0, 0, 0, 2, b' '];
        bytes.extend_from_slice(&[0xff, 0xfe]);
        assert!(matches!(
            Frame::decode(&bytes),
            Err(DecodeError::InvalidUtf8 { offset: 10 })
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let frame = Frame::Connect {
            sender: "bob".into(),
        };
        let mut bytes = frame.encode().unwrap().to_vec();
        bytes.push(b'!');
        assert_eq!(
            Frame::decode(&bytes),
            Err(DecodeError::TrailingBytes { remaining: 1 })
        );
    }

    #[test]
    fn test_embedded_newline_rejected_at_encode() {
        let frame = Frame::Broadcast {
            sender: "alice".into(),
            message: "line one\nline two".into(),
        };
        assert_eq!(
            frame.encode(),
            Err(EncodeError::EmbeddedNewline { field: "message" })
        );
    }

    #[test]
    fn test_nonzero_boolean_reads_true() {
        let mut bytes = vec![0, 0, 0, 20, b' ', 7];
        bytes.extend_from_slice(&[b' ', 0, 0, 0, 0, b' ']);
        let decoded = Frame::decode(&bytes).unwrap();
        assert_eq!(
            decoded,
            Frame::ConnectResponse {
                success: true,
                message: String::new()
            }
        );
    }

    #[test]
    fn test_sender_field_accessor() {
        let frame = Frame::Broadcast {
            sender: "alice".into(),
            message: "hi".into(),
        };
        assert_eq!(frame.sender(), Some("alice"));

        let frame = Frame::QueryUsersResponse { users: vec![] };
        assert_eq!(frame.sender(), None);
    }

    #[test]
    fn test_empty_strings_round_trip() {
        let frame = Frame::Direct {
            sender: String::new(),
            recipient: String::new(),
            message: String::new(),
        };
        let bytes = frame.encode().unwrap();
        assert_eq!(Frame::decode(&bytes).unwrap(), frame);
    }
}
