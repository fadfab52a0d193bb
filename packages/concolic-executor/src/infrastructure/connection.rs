//! Newline-delimited JSON over TCP
//!
//! Each send and each receive is bounded by the communication timeout. A
//! timeout, a closed peer or an undecodable line all read as "no message";
//! callers decide whether that means a lost worker.
//!
//! Bytes of a line that is still arriving when a read times out stay
//! buffered, so the next read continues the same line.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

/// What one read produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Line(String),
    /// Peer closed the stream
    Closed,
    TimedOut,
}

pub struct JsonConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    /// Unterminated prefix of the next line
    pending: Vec<u8>,
    peer: Option<SocketAddr>,
    timeout: Duration,
}

impl JsonConnection {
    pub fn new(stream: TcpStream, communication_timeout: Duration) -> Self {
        let peer = stream.peer_addr().ok();
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
            pending: Vec::new(),
            peer,
            timeout: communication_timeout,
        }
    }

    /// `None` when the peer is unreachable within `connection_timeout`
    pub async fn connect(
        host: &str,
        port: u16,
        connection_timeout: Duration,
        communication_timeout: Duration,
    ) -> Option<Self> {
        match timeout(connection_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => Some(Self::new(stream, communication_timeout)),
            Ok(Err(e)) => {
                debug!(host, port, error = %e, "connect failed");
                None
            }
            Err(_) => {
                debug!(host, port, "connect timed out");
                None
            }
        }
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub async fn send_line(&mut self, line: &str) -> bool {
        let writer = &mut self.writer;
        let write = async move {
            writer.write_all(line.trim_end().as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        };
        match timeout(self.timeout, write).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!(peer = ?self.peer, error = %e, "send failed");
                false
            }
            Err(_) => {
                debug!(peer = ?self.peer, "send timed out");
                false
            }
        }
    }

    pub async fn read(&mut self) -> Incoming {
        // `read_until` appends to `pending` as bytes arrive, so a timeout
        // loses nothing
        let read = self.reader.read_until(b'\n', &mut self.pending);
        match timeout(self.timeout, read).await {
            // an unterminated last line still counts once the peer closes
            Ok(Ok(_)) if self.pending.is_empty() => Incoming::Closed,
            Ok(Ok(_)) => {
                let bytes = std::mem::take(&mut self.pending);
                Incoming::Line(String::from_utf8_lossy(&bytes).trim_end().to_string())
            }
            Ok(Err(e)) => {
                debug!(peer = ?self.peer, error = %e, "receive failed");
                Incoming::Closed
            }
            Err(_) => Incoming::TimedOut,
        }
    }

    pub async fn receive_line(&mut self) -> Option<String> {
        match self.read().await {
            Incoming::Line(line) => Some(line),
            Incoming::Closed | Incoming::TimedOut => None,
        }
    }

    pub async fn send<T: Serialize>(&mut self, message: &T) -> bool {
        match serde_json::to_string(message) {
            Ok(json) => self.send_line(&json).await,
            Err(e) => {
                warn!(error = %e, "cannot encode message");
                false
            }
        }
    }

    pub async fn receive<T: DeserializeOwned>(&mut self) -> Option<T> {
        let line = self.receive_line().await?;
        match serde_json::from_str(&line) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(peer = ?self.peer, error = %e, "undecodable message");
                None
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.writer.shutdown().await;
    }
}
