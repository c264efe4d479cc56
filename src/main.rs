//! relayd - a framed TCP chat relay.
//!
//! Frames travel one per newline-terminated line; the server fans them
//! out to the roster according to each frame's kind.

mod config;
mod error;
mod insult;
mod network;
mod router;
mod state;

use crate::config::Config;
use crate::network::Gateway;
use crate::router::Router;
use crate::state::Roster;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let mut args = std::env::args().skip(1);

    let port: u16 = match args.next().map(|p| p.parse()) {
        Some(Ok(port)) => port,
        Some(Err(_)) | None => {
            eprintln!("Usage: relayd <port> [config.toml]");
            std::process::exit(1);
        }
    };

    let config = match args.next() {
        Some(path) => Config::load(&path).map_err(|e| {
            error!(path = %path, error = %e, "Failed to load config");
            e
        })?,
        None => Config::default(),
    };

    info!(
        port,
        max_clients = config.limits.max_clients,
        "Starting relayd"
    );

    let roster = Arc::new(Roster::new(config.limits.max_clients));
    let router = Arc::new(Router::new(Arc::clone(&roster)));

    let addr: SocketAddr = format!("{}:{}", config.server.bind_host, port).parse()?;
    let gateway = Gateway::bind(addr, roster, router, config.limits.max_frame_len).await?;
    gateway.run().await
}
