//! Per-client session state.

use parking_lot::Mutex;
use relay_proto::Frame;
use tokio::sync::mpsc;
use tracing::warn;

/// Lifecycle state of a session.
///
/// `Connecting -> Active -> Closed`, with no transition skipping `Active`
/// except a registration that never completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Username received, welcome not yet sent.
    Connecting,
    /// Fully admitted and reachable by the router.
    Active,
    /// Torn down; the outgoing queue may already be gone.
    Closed,
}

/// One connected, named client.
///
/// All outbound traffic for the client goes through `outgoing`, a queue
/// drained by the connection task's writer. That single consumer is what
/// totally orders writes to the client's transport.
pub struct Session {
    username: String,
    outgoing: mpsc::Sender<Frame>,
    liveness: Mutex<Liveness>,
}

impl Session {
    /// Create a session in the `Connecting` state.
    pub fn new(username: String, outgoing: mpsc::Sender<Frame>) -> Self {
        Self {
            username,
            outgoing,
            liveness: Mutex::new(Liveness::Connecting),
        }
    }

    /// The session's unique username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Current lifecycle state.
    pub fn liveness(&self) -> Liveness {
        *self.liveness.lock()
    }

    /// Promote `Connecting` to `Active`. No effect in any other state.
    pub fn activate(&self) {
        let mut liveness = self.liveness.lock();
        if *liveness == Liveness::Connecting {
            *liveness = Liveness::Active;
        }
    }

    /// Transition to `Closed`. Returns `true` only for the caller that
    /// performed the transition, so teardown side effects run exactly once.
    pub fn close(&self) -> bool {
        let mut liveness = self.liveness.lock();
        if *liveness == Liveness::Closed {
            return false;
        }
        *liveness = Liveness::Closed;
        true
    }

    /// Queue a frame for delivery to this client.
    ///
    /// Non-blocking by design: a session task must never wait on another
    /// session's transport. Returns `false` when the frame was not queued,
    /// either because the session is gone or its queue is full.
    pub fn push(&self, frame: Frame) -> bool {
        match self.outgoing.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(username = %self.username, "Outgoing queue full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}
