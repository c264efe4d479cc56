//! Test server management.
//!
//! Spawns and manages relayd instances for integration testing.

use std::path::PathBuf;
use std::process::{Child, Command};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// A test server instance.
pub struct TestServer {
    child: Child,
    port: u16,
    // Holds the config file for the lifetime of the server.
    _data_dir: TempDir,
}

impl TestServer {
    /// Spawn a new test server on `port` with the given session capacity.
    pub async fn spawn(port: u16, max_clients: usize) -> anyhow::Result<Self> {
        let data_dir = TempDir::new()?;

        let config_path = data_dir.path().join("config.toml");
        let config_content = format!(
            r#"
[server]
bind_host = "127.0.0.1"

[limits]
max_clients = {max_clients}
"#
        );
        std::fs::write(&config_path, config_content)?;

        // Binary lives in the workspace target dir
        let binary_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("target/debug/relayd");

        let child = Command::new(&binary_path)
            .arg(port.to_string())
            .arg(&config_path)
            .spawn()?;

        let server = Self {
            child,
            port,
            _data_dir: data_dir,
        };

        server.wait_until_ready().await?;

        Ok(server)
    }

    /// Wait until the server is accepting connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        for _ in 0..30 {
            if let Ok(mut stream) = tokio::net::TcpStream::connect(("127.0.0.1", self.port)).await {
                // The probe occupies an admission slot until the server
                // tears it down. Close our side and wait for the server
                // to close (it releases the slot first), so the probe
                // never races the test's own connections.
                let _ = stream.shutdown().await;
                let mut buf = [0u8; 64];
                while matches!(stream.read(&mut buf).await, Ok(n) if n > 0) {}
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Server failed to start within 3 seconds")
    }

    /// Get the server address.
    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Create a new test client connected to this server.
    pub async fn connect(&self, username: &str) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.address(), username).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
