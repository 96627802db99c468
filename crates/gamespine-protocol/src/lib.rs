//! Wire protocol for Gamespine.
//!
//! This crate defines the "language" that clients and the backbone server
//! speak over TCP:
//!
//! - **Types** ([`SessionId`], [`GameId`], [`GameDefinition`]) — the
//!   identifiers and descriptors that appear on the wire and in the
//!   broker's registry.
//! - **Commands** ([`Command`]) — the client→server lines, parsed from
//!   space-delimited text.
//! - **Messages** ([`ServerMessage`]) — the server→client lines, formatted
//!   back into the same text grammar through `Display`.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while parsing.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw NUL-terminated frames)
//! and session (connection identity). It doesn't know about sockets or
//! games — it only knows how to read and write lines.
//!
//! ```text
//! Transport (frames) → Protocol (Command / ServerMessage) → Broker (registry)
//! ```
//!
//! The grammar is command-first and space-delimited. Everything after the
//! command word and its fixed arguments is opaque payload and is never
//! re-tokenized here.

mod command;
mod error;
mod message;
mod types;

pub use command::{Command, MESSAGE_CLOSE, MESSAGE_INIT};
pub use error::ProtocolError;
pub use message::ServerMessage;
pub use types::{GameDefinition, GameId, SessionId};
