//! Transport layer for Gamespine.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract the
//! network away from the broker, plus the one production implementation:
//! plain TCP carrying NUL-terminated UTF-8 text frames ([`TcpTransport`]).
//!
//! The framing is deliberately primitive — a frame is every byte up to the
//! next `\0`. There are no timeouts and no retries at this layer: any I/O
//! error is surfaced once and the connection is done.

#![allow(async_fn_in_trait)]

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{TcpConnection, TcpTransport};

use std::fmt;

/// Opaque identifier for an accepted connection.
///
/// Used only for logging and socket bookkeeping; the broker addresses
/// sessions by its own `SessionId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection exchanging text frames.
///
/// Methods take `&self` so one task can read while another writes; both
/// directions are internally serialized, so two concurrent `send`s on the
/// same connection never interleave their bytes.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame (the terminator is appended here).
    async fn send(&self, text: &str) -> Result<(), Self::Error>;

    /// Receives the next frame.
    ///
    /// Returns `Ok(None)` when the peer closed the connection.
    async fn recv(&self) -> Result<Option<String>, Self::Error>;

    /// Closes the connection. Any in-flight `recv` on the peer side will
    /// observe end-of-stream.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
