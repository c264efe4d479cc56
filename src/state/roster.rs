//! The session roster: the authoritative set of live sessions.
//!
//! All registry operations and the admission pool live here so every
//! connection task goes through one shared-state discipline. The dashmap
//! serializes map access; per-session write ordering is the session
//! queue's job.

use std::sync::Arc;

use dashmap::DashMap;
use relay_proto::Frame;
use tracing::{debug, info};

use super::{Admission, Session, SERVER_NAME};

/// Errors surfaced by session registration.
#[derive(Debug, PartialEq, Eq)]
pub enum RegisterError {
    /// Another live session already owns this username.
    NameTaken,
}

/// Live-session table plus the capacity gate.
pub struct Roster {
    sessions: DashMap<String, Arc<Session>>,
    admission: Admission,
}

impl Roster {
    /// Create an empty roster with the given session capacity.
    pub fn new(max_clients: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            admission: Admission::new(max_clients),
        }
    }

    /// The admission gate consulted before any session is constructed.
    pub fn admission(&self) -> &Admission {
        &self.admission
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether any session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Add a session to the live set. Usernames are unique keys: a second
    /// session with a live name is rejected and the existing one untouched.
    pub fn register(&self, session: Arc<Session>) -> Result<(), RegisterError> {
        match self.sessions.entry(session.username().to_owned()) {
            dashmap::Entry::Occupied(_) => Err(RegisterError::NameTaken),
            dashmap::Entry::Vacant(entry) => {
                entry.insert(session);
                Ok(())
            }
        }
    }

    /// Scoped teardown, entered from every exit path.
    ///
    /// Idempotent: the caller that wins the `Closed` transition releases
    /// the capacity token and, if the session had been registered, emits
    /// the leave broadcast. Later callers are no-ops.
    pub fn unregister(&self, session: &Arc<Session>) {
        if !session.close() {
            return;
        }

        // Remove only our own entry; a name-collision loser must not evict
        // the session that owns the key.
        let was_registered = self
            .sessions
            .remove_if(session.username(), |_, live| Arc::ptr_eq(live, session))
            .is_some();

        self.admission.release();

        if was_registered {
            info!(username = %session.username(), "Session unregistered");
            self.broadcast(
                &Frame::Broadcast {
                    sender: SERVER_NAME.to_string(),
                    message: format!("[Server] : {} has left the chat", session.username()),
                },
                Some(session.username()),
            );
        }
    }

    /// Exact-match, case-sensitive lookup.
    pub fn resolve(&self, username: &str) -> Option<Arc<Session>> {
        self.sessions.get(username).map(|s| Arc::clone(s.value()))
    }

    /// Deliver a frame to every live session except `excluding`.
    ///
    /// Iterates the snapshot of sessions present at call time; concurrent
    /// joins and leaves may or may not be covered.
    pub fn broadcast(&self, frame: &Frame, excluding: Option<&str>) {
        for entry in self.sessions.iter() {
            if excluding == Some(entry.key().as_str()) {
                continue;
            }
            if !entry.value().push(frame.clone()) {
                debug!(username = %entry.key(), "Broadcast not delivered");
            }
        }
    }

    /// Deliver a frame to the named session. Returns `false` when the name
    /// does not resolve; the caller owes the requester a notice.
    pub fn direct(&self, target: &str, frame: Frame) -> bool {
        match self.resolve(target) {
            Some(session) => {
                if !session.push(frame) {
                    debug!(username = %target, "Direct delivery not queued");
                }
                true
            }
            None => false,
        }
    }

    /// Snapshot of all live usernames.
    pub fn usernames(&self) -> Vec<String> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }
}
