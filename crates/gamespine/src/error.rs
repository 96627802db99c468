//! Unified error type for the Gamespine server.

use gamespine_protocol::ProtocolError;
use gamespine_transport::TransportError;

/// Top-level error that wraps the crate-specific errors.
///
/// Embedders of the `gamespine` meta-crate deal with this single type;
/// the `#[from]` attributes let `?` convert sub-crate errors on the way
/// up. Note that most protocol problems never reach this level — the
/// broker drops malformed lines instead of failing the connection.
#[derive(Debug, thiserror::Error)]
pub enum GamespineError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error surfaced to an embedder.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
