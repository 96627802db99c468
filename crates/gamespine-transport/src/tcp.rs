//! TCP transport with NUL-terminated framing.
//!
//! A frame is the bytes up to the next `\0`. The terminator is stripped on
//! read and appended on write. Bytes that aren't valid UTF-8 are replaced
//! lossily rather than faulting the connection — a garbled frame becomes a
//! garbled line the protocol layer will drop.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// A TCP [`Transport`] that listens for incoming connections.
pub struct TcpTransport {
    listener: TcpListener,
    /// Counter for connection ids. Lives on the transport instance, not in
    /// a process-wide static.
    next_id: AtomicU64,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self {
            listener,
            next_id: AtomicU64::new(1),
        })
    }

    /// Returns the local address the listener is bound to.
    ///
    /// Mostly useful in tests, which bind to port 0.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let id =
            ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %addr, "accepted TCP connection");

        let (read_half, write_half) = stream.into_split();
        Ok(TcpConnection {
            id,
            reader: Mutex::new(BufReader::new(read_half)),
            writer: Mutex::new(write_half),
        })
    }
}

/// A single accepted TCP connection.
///
/// The halves live behind separate mutexes so a reader task and a writer
/// task can share one `Arc<TcpConnection>` without blocking each other.
pub struct TcpConnection {
    id: ConnectionId,
    reader: Mutex<BufReader<OwnedReadHalf>>,
    writer: Mutex<OwnedWriteHalf>,
}

impl Connection for TcpConnection {
    type Error = TransportError;

    async fn send(&self, text: &str) -> Result<(), Self::Error> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(text.as_bytes())
            .await
            .map_err(TransportError::SendFailed)?;
        writer
            .write_all(b"\0")
            .await
            .map_err(TransportError::SendFailed)?;
        writer.flush().await.map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<String>, Self::Error> {
        let mut reader = self.reader.lock().await;
        let mut buf = Vec::new();
        let n = reader
            .read_until(0, &mut buf)
            .await
            .map_err(TransportError::ReceiveFailed)?;

        if n == 0 {
            // Clean end of stream.
            return Ok(None);
        }
        if buf.last() == Some(&0) {
            buf.pop();
        } else {
            // EOF in the middle of a frame; the partial line is useless.
            tracing::debug!(id = %self.id, "dropping partial frame at EOF");
            return Ok(None);
        }

        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
