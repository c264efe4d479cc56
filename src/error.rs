//! Error handling for the relay server.
//!
//! Router-level outcomes that a connection task must act on. Everything
//! else (decode failures, unresolved recipients) is recovered where it
//! happens and never crosses the router as an error.

use thiserror::Error;

/// Errors that can occur while dispatching a frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// The session's own outgoing queue is gone; only teardown is left.
    #[error("session outgoing queue closed")]
    SessionClosed,

    /// The client asked to disconnect; the acknowledgement is queued and
    /// the connection loop should drain and tear down.
    #[error("client requested disconnect")]
    Quit,
}

/// Result type for frame dispatch.
pub type HandlerResult = Result<(), HandlerError>;
