//! Connection lifecycle for Gamespine.
//!
//! This crate handles what happens on a connection *before* the broker
//! cares about it, and tracks its identity afterwards:
//!
//! 1. **Handshake state machine** — INIT → WAITING_FOR_LOGIN → CONNECTED,
//!    advancing only, never regressing ([`Session`], [`SessionEvent`]).
//! 2. **Login validation** — pluggable via the [`LoginValidator`] trait,
//!    with the reference [`MirrorValidator`] (login must equal password).
//! 3. **Provider load** — how many games this session currently hosts,
//!    maintained by the broker through [`Session::inc_load`] /
//!    [`Session::dec_load`].
//!
//! # How it fits in the stack
//!
//! ```text
//! Broker (above)   ← owns every Session, drives handle_line per frame
//!     ↕
//! Session Layer (this crate)  ← identity + handshake state
//!     ↕
//! Protocol Layer (below)      ← SessionId, line constants
//! ```

mod session;
mod validator;

pub use session::{Session, SessionEvent, SessionState};
pub use validator::{LoginValidator, MirrorValidator};
