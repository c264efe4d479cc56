//! Message router: maps decoded frames onto roster operations.
//!
//! One exhaustive match per frame kind. The sender identity is always the
//! registered session username; sender fields inside inbound frames are
//! carried for wire compatibility but not trusted.

use std::sync::Arc;

use relay_proto::Frame;
use tracing::{debug, info};

use crate::error::{HandlerError, HandlerResult};
use crate::insult::InsultGenerator;
use crate::state::{Roster, Session, SERVER_NAME};

/// Dispatches inbound frames for all sessions.
pub struct Router {
    roster: Arc<Roster>,
    insults: InsultGenerator,
}

impl Router {
    /// Create a router over the shared roster.
    pub fn new(roster: Arc<Roster>) -> Self {
        Self {
            roster,
            insults: InsultGenerator,
        }
    }

    /// Handle one inbound frame from `session`.
    ///
    /// `Err(Quit)` tells the connection loop to drain its queue and tear
    /// down; `Err(SessionClosed)` means the client is already unreachable.
    pub fn dispatch(&self, session: &Arc<Session>, frame: Frame) -> HandlerResult {
        match frame {
            Frame::Connect { .. } => self.handle_connect(session),
            Frame::Broadcast { message, .. } => self.handle_broadcast(session, &message),
            Frame::Direct {
                recipient, message, ..
            } => self.handle_direct(session, &recipient, &message),
            Frame::Disconnect { .. } => self.handle_disconnect(session),
            Frame::QueryUsers { .. } => self.handle_query_users(session),
            Frame::Insult { recipient, .. } => self.handle_insult(session, &recipient),
            // Server-to-client kinds; a client sending these is out of
            // protocol and the frame is dropped.
            Frame::ConnectResponse { .. } | Frame::QueryUsersResponse { .. } => {
                debug!(
                    username = %session.username(),
                    tag = frame.tag(),
                    "Dropping server-to-client frame from client"
                );
                Ok(())
            }
        }
    }

    fn handle_connect(&self, session: &Arc<Session>) -> HandlerResult {
        let count = self.roster.len();
        let welcome = format!(
            "Connection established with Server. There are {} connected users.",
            count
        );
        self.push_to(
            session,
            Frame::ConnectResponse {
                success: true,
                message: welcome,
            },
        )?;
        session.activate();
        info!(username = %session.username(), connected = count, "Session active");

        self.roster.broadcast(
            &server_notice(format!(
                "[Server] : {} has entered the chat.",
                session.username()
            )),
            Some(session.username()),
        );
        Ok(())
    }

    fn handle_broadcast(&self, session: &Arc<Session>, message: &str) -> HandlerResult {
        let formatted = format!("[{}] : {}", session.username(), message);
        self.roster.broadcast(
            &Frame::Broadcast {
                sender: session.username().to_string(),
                message: formatted,
            },
            Some(session.username()),
        );
        Ok(())
    }

    fn handle_direct(
        &self,
        session: &Arc<Session>,
        recipient: &str,
        message: &str,
    ) -> HandlerResult {
        let formatted = format!("[{}] : {}", session.username(), message);
        let delivered = self.roster.direct(
            recipient,
            Frame::Direct {
                sender: session.username().to_string(),
                recipient: recipient.to_string(),
                message: formatted,
            },
        );
        if !delivered {
            self.notify_not_found(session, recipient)?;
        }
        Ok(())
    }

    fn handle_disconnect(&self, session: &Arc<Session>) -> HandlerResult {
        info!(username = %session.username(), "Disconnect requested");
        self.push_to(
            session,
            Frame::ConnectResponse {
                success: true,
                message: "You are no longer connected.".to_string(),
            },
        )?;
        Err(HandlerError::Quit)
    }

    fn handle_query_users(&self, session: &Arc<Session>) -> HandlerResult {
        self.push_to(
            session,
            Frame::QueryUsersResponse {
                users: self.roster.usernames(),
            },
        )
    }

    fn handle_insult(&self, session: &Arc<Session>, recipient: &str) -> HandlerResult {
        let insult = self.insults.next_insult();

        // The requester gets a plain copy of what was sent on their behalf.
        self.push_to(
            session,
            Frame::Direct {
                sender: SERVER_NAME.to_string(),
                recipient: session.username().to_string(),
                message: insult.clone(),
            },
        )?;

        let delivered = self.roster.direct(
            recipient,
            Frame::Direct {
                sender: session.username().to_string(),
                recipient: recipient.to_string(),
                message: format!("[{}] : {}", session.username(), insult),
            },
        );
        if !delivered {
            self.notify_not_found(session, recipient)?;
        }
        Ok(())
    }

    /// Single not-found policy for every unresolved target.
    fn notify_not_found(&self, session: &Arc<Session>, target: &str) -> HandlerResult {
        self.push_to(
            session,
            Frame::Direct {
                sender: SERVER_NAME.to_string(),
                recipient: session.username().to_string(),
                message: format!("[Server] : User '{}' not found.", target),
            },
        )
    }

    fn push_to(&self, session: &Arc<Session>, frame: Frame) -> HandlerResult {
        if session.push(frame) {
            Ok(())
        } else {
            Err(HandlerError::SessionClosed)
        }
    }
}

/// A broadcast frame originated by the server itself.
fn server_notice(message: String) -> Frame {
    Frame::Broadcast {
        sender: SERVER_NAME.to_string(),
        message,
    }
}
