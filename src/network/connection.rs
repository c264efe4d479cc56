//! Connection - handles an individual client.
//!
//! Each connection runs in its own task, in two phases:
//!
//! 1. Handshake: the first line on the socket is the bare username.
//! 2. Unified loop: `tokio::select!` between inbound lines and the
//!    session's outgoing queue. The queue is the only writer path, so
//!    writes to this client are totally ordered.
//!
//! Decode failures drop the offending frame and keep the session; I/O
//! failures are fatal to this session only. Every exit path funnels
//! through the same teardown: drain the queue, then
//! [`Roster::unregister`], which releases the capacity permit exactly
//! once.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use relay_proto::{Frame, LineCodec, ProtocolError};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, instrument, warn};

use crate::error::HandlerError;
use crate::router::Router;
use crate::state::{Roster, Session, SERVER_NAME};

/// Depth of the per-session outgoing queue.
const OUTGOING_QUEUE_DEPTH: usize = 64;

/// A client connection handler. Owns the admission permit its acceptor
/// acquired; `run` releases it on every path.
pub struct Connection {
    stream: TcpStream,
    addr: SocketAddr,
    roster: Arc<Roster>,
    router: Arc<Router>,
    max_frame_len: usize,
}

impl Connection {
    /// Create a new connection handler.
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        roster: Arc<Roster>,
        router: Arc<Router>,
        max_frame_len: usize,
    ) -> Self {
        Self {
            stream,
            addr,
            roster,
            router,
            max_frame_len,
        }
    }

    /// Run the connection to completion.
    #[instrument(skip(self), fields(addr = %self.addr), name = "connection")]
    pub async fn run(self) -> anyhow::Result<()> {
        let (read_half, write_half) = self.stream.into_split();
        let mut reader = FramedRead::new(read_half, LineCodec::with_max_len(self.max_frame_len));
        let mut writer = FramedWrite::new(write_half, LineCodec::with_max_len(self.max_frame_len));

        // Phase 1: the username line. Accepted as-is, no validation.
        let username = match reader.next().await {
            Some(Ok(line)) => match String::from_utf8(line.to_vec()) {
                Ok(name) => name,
                Err(_) => {
                    warn!("Username line is not valid UTF-8");
                    self.roster.admission().release();
                    return Ok(());
                }
            },
            Some(Err(e)) => {
                warn!(error = %e, "Read error before username");
                self.roster.admission().release();
                return Ok(());
            }
            None => {
                info!("Client closed before sending a username");
                self.roster.admission().release();
                return Ok(());
            }
        };

        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Frame>(OUTGOING_QUEUE_DEPTH);
        let session = Arc::new(Session::new(username, outgoing_tx));

        // The roster owns the permit from here: unregister releases it.
        if self.roster.register(Arc::clone(&session)).is_err() {
            warn!(username = %session.username(), "Username already taken");
            let notice = Frame::ConnectResponse {
                success: false,
                message: format!("Username '{}' is already taken.", session.username()),
            };
            let _ = writer.send(notice).await;
            self.roster.unregister(&session);
            return Ok(());
        }

        info!(username = %session.username(), "Session registered");

        // Phase 2: unified loop.
        loop {
            tokio::select! {
                result = reader.next() => {
                    match result {
                        Some(Ok(line)) => {
                            let frame = match Frame::decode(&line) {
                                Ok(frame) => frame,
                                Err(e) => {
                                    // Non-fatal by policy: drop the frame,
                                    // keep the session.
                                    debug!(error = %e, "Dropping undecodable frame");
                                    continue;
                                }
                            };

                            match self.router.dispatch(&session, frame) {
                                Ok(()) => {}
                                Err(HandlerError::Quit) => break,
                                Err(HandlerError::SessionClosed) => {
                                    warn!(username = %session.username(), "Outgoing queue closed");
                                    break;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "Read error");
                            break;
                        }
                        None => {
                            info!(username = %session.username(), "Client disconnected");
                            break;
                        }
                    }
                }

                Some(frame) = outgoing_rx.recv() => {
                    let bytes = match frame.encode() {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            debug!(error = %e, "Dropping unencodable frame");
                            continue;
                        }
                    };
                    if bytes.contains(&b'\n') {
                        // Length bytes can collide with the line
                        // terminator; drop the frame rather than emit
                        // it split across two lines, and tell the
                        // originating user their message went nowhere.
                        debug!(
                            username = %session.username(),
                            "Dropping frame whose length bytes collide with the terminator"
                        );
                        if let Some(origin) = frame.sender().filter(|s| *s != SERVER_NAME) {
                            self.roster.direct(
                                origin,
                                Frame::Direct {
                                    sender: SERVER_NAME.to_string(),
                                    recipient: origin.to_string(),
                                    message: format!(
                                        "[Server] : Your message to '{}' could not be delivered.",
                                        session.username()
                                    ),
                                },
                            );
                        }
                        continue;
                    }
                    if let Err(e) = writer.send(bytes).await {
                        warn!(error = %e, "Write error");
                        break;
                    }
                }
            }
        }

        // Flush whatever the router queued before the loop ended, the
        // disconnect acknowledgement in particular.
        while let Ok(frame) = outgoing_rx.try_recv() {
            if matches!(writer.send(frame).await, Err(ProtocolError::Io(_))) {
                break;
            }
        }

        self.roster.unregister(&session);
        Ok(())
    }
}
