//! Error types for the protocol layer.
//!
//! Each crate in Gamespine defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is a malformed line — not
//! networking, not registry state.
//!
//! Note that the broker treats every variant here the same way: the
//! offending line is dropped silently (with a debug log) and the
//! connection stays open. Parsing errors are diagnostics, never faults.

/// Errors that can occur while parsing a client line.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The first token is not a command this server knows.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The command word was recognized but its arguments don't fit the
    /// grammar — missing fields, a provider registration that isn't a
    /// multiple of four tokens, and so on.
    #[error("malformed {command} command: {detail}")]
    Malformed {
        /// The command word as received.
        command: String,
        /// Human-readable description of what's wrong.
        detail: String,
    },

    /// A numeric field (player count, AI flag) failed to parse.
    #[error("invalid number in {field}: {value}")]
    InvalidNumber {
        /// Which field was being parsed.
        field: &'static str,
        /// The offending token.
        value: String,
    },
}
