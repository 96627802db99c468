//! The Gamespine broker: registry, matchmaking and relay in one place.
//!
//! Everything the server *decides* lives in this crate. The transport
//! layer reads frames and the session layer runs the handshake; once a
//! line belongs to a connected client it lands in [`Broker::on_message`],
//! which parses it, updates the registry and answers with outbound lines.
//!
//! # Design
//!
//! - **Single owner.** The [`Broker`] owns every [`Session`] and every
//!   [`GameSession`]. Connection tasks hold only a [`SessionId`] and an
//!   outbound channel; the server wraps the broker in one async mutex and
//!   every frame is processed under it, so command handling is serialized
//!   and the registry never needs interior locking.
//! - **Deliveries, not I/O.** Game sessions compute who should receive
//!   what as `(SessionId, String)` pairs; the broker resolves the ids and
//!   pushes the text into per-session channels. Nothing in this crate
//!   touches a socket.
//! - **Refusals are replies.** A request that cannot be satisfied is not
//!   a Rust error — the client gets a `GAME_REFUSED` / `GAME_JOIN_REFUSED`
//!   line with one of the fixed [reason strings](crate::reason) and the
//!   connection carries on.
//!
//! [`Session`]: gamespine_session::Session

mod broker;
mod game;

pub mod reason;

pub use broker::{Broker, Flow};
pub use game::{Delivery, GameSession};
