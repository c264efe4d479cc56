//! Gateway - TCP listener that accepts incoming connections.
//!
//! The gateway consults the admission gate before a session exists: a
//! refused connection is told so in a frame and closed, never silently
//! dropped. Accepted sockets get their own connection task.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::SinkExt;
use relay_proto::{Frame, LineCodec};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::FramedWrite;
use tracing::{debug, error, info, instrument, warn};

use crate::network::Connection;
use crate::router::Router;
use crate::state::Roster;

/// Accepts incoming TCP connections and spawns connection tasks.
pub struct Gateway {
    listener: TcpListener,
    roster: Arc<Roster>,
    router: Arc<Router>,
    max_frame_len: usize,
}

impl Gateway {
    /// Bind the gateway to the specified address.
    pub async fn bind(
        addr: SocketAddr,
        roster: Arc<Roster>,
        router: Arc<Router>,
        max_frame_len: usize,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "Listener bound");
        Ok(Self {
            listener,
            roster,
            router,
            max_frame_len,
        })
    }

    /// Run the gateway, accepting connections forever.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    // Capacity is checked strictly before any session state
                    // is created; the permit belongs to the connection task
                    // from here on.
                    if !self.roster.admission().try_admit() {
                        warn!(%addr, "Connection refused, maximum clients reached");
                        let max_frame_len = self.max_frame_len;
                        tokio::spawn(async move {
                            reject_over_capacity(stream, addr, max_frame_len).await;
                        });
                        continue;
                    }

                    info!(%addr, "Connection accepted");

                    let roster = Arc::clone(&self.roster);
                    let router = Arc::clone(&self.router);
                    let max_frame_len = self.max_frame_len;

                    tokio::spawn(async move {
                        let connection =
                            Connection::new(stream, addr, roster, router, max_frame_len);
                        if let Err(e) = connection.run().await {
                            error!(%addr, error = %e, "Connection error");
                        }
                        info!(%addr, "Connection closed");
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

/// Tell a refused client why, then close. No permit is held here.
async fn reject_over_capacity(stream: TcpStream, addr: SocketAddr, max_frame_len: usize) {
    let mut writer = FramedWrite::new(stream, LineCodec::with_max_len(max_frame_len));
    let notice = Frame::ConnectResponse {
        success: false,
        message: "Connection refused. Maximum clients reached.".to_string(),
    };
    if let Err(e) = writer.send(notice).await {
        debug!(%addr, error = %e, "Rejection notice not delivered");
    }
}
