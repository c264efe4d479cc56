//! Test relay client.
//!
//! Speaks the framed line protocol directly over a split TCP stream so
//! tests can send frames and assert on what comes back.

use relay_proto::Frame;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// A test relay client.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    username: String,
}

impl TestClient {
    /// Connect a raw socket; nothing is sent until [`join`](Self::join).
    pub async fn connect(address: &str, username: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            username: username.to_string(),
        })
    }

    /// Send the username line, then a connect frame, and wait for the
    /// server's response. Returns the welcome text; bails on refusal.
    pub async fn join(&mut self) -> anyhow::Result<String> {
        self.writer
            .write_all(format!("{}\n", self.username).as_bytes())
            .await?;
        self.writer.flush().await?;

        self.send(Frame::Connect {
            sender: self.username.clone(),
        })
        .await?;

        match self.recv().await? {
            Frame::ConnectResponse {
                success: true,
                message,
            } => Ok(message),
            Frame::ConnectResponse {
                success: false,
                message,
            } => anyhow::bail!("Join refused: {message}"),
            other => anyhow::bail!("Expected a connect response, got {other:?}"),
        }
    }

    /// Send one frame, newline-terminated.
    pub async fn send(&mut self, frame: Frame) -> anyhow::Result<()> {
        let bytes = frame.encode()?;
        self.writer.write_all(&bytes).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Send arbitrary bytes as one line, for malformed-input tests.
    #[allow(dead_code)]
    pub async fn send_raw_line(&mut self, line: &[u8]) -> anyhow::Result<()> {
        self.writer.write_all(line).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive a single frame from the server.
    pub async fn recv(&mut self) -> anyhow::Result<Frame> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a frame with a timeout.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Frame> {
        let mut line = Vec::new();
        let n = timeout(dur, self.reader.read_until(b'\n', &mut line)).await??;
        if n == 0 {
            anyhow::bail!("Connection closed");
        }
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        Frame::decode(&line).map_err(|e| anyhow::anyhow!("Decode error: {e}"))
    }

    /// Discard everything already in flight (join announcements mostly).
    pub async fn drain(&mut self) {
        while self
            .recv_timeout(Duration::from_millis(150))
            .await
            .is_ok()
        {}
    }

    /// The username this client joined with.
    #[allow(dead_code)]
    pub fn username(&self) -> &str {
        &self.username
    }
}
