//! Server→client lines.
//!
//! [`ServerMessage`] is the typed counterpart of [`Command`](crate::Command)
//! for the other direction. Its `Display` impl produces the exact wire
//! line; the broker builds one of these, formats it, and pushes the text
//! into the session's outbound channel.
//!
//! Relayed game traffic never becomes a `ServerMessage` — the broker
//! forwards the original `GAME_MESSAGE` line verbatim so payloads cross
//! untouched.

use std::fmt;

use crate::GameId;

/// A broker-generated line to one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Reply to `INIT`: the server wants credentials.
    LoginAsked,

    /// The `login:password` pair was accepted; the session is connected.
    LoginAccepted,

    /// The pair was refused; the connection closes right after this line.
    LoginRefused,

    /// To the chosen provider: host this newly created game.
    GameCreated { id: GameId, kind: String },

    /// To a requester or joiner: you are a consumer of this game.
    GameAccepted { id: GameId, kind: String },

    /// A game request could not be satisfied. `key` is the kind that was
    /// asked for — no game id exists at refusal time.
    GameRefused { key: String, reason: String },

    /// A join was refused (unknown id or no seat left).
    JoinRefused { id: GameId, reason: String },

    /// One game is over; sent to the provider and each remaining consumer.
    GameClosed { id: GameId, reason: String },

    /// A connection dropped and took several games with it. Broadcast to
    /// every connected session, ids joined with `|`.
    GamesClosed { ids: Vec<GameId>, reason: String },

    /// Reply to `SYSTEM_REQUEST_GAME_LIST`: joinable game ids of the kind.
    GameList { ids: Vec<GameId> },

    /// To the provider: a consumer entered its game.
    PlayerJoined { id: GameId, login: String },

    /// To the provider: a consumer left its game.
    PlayerLeft { id: GameId, login: String },
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoginAsked => f.write_str("SYSTEM_LOGIN_ASKED"),
            Self::LoginAccepted => f.write_str("SYSTEM_LOGIN_ACCEPTED"),
            Self::LoginRefused => f.write_str("SYSTEM_LOGIN_REFUSED"),
            Self::GameCreated { id, kind } => {
                write!(f, "GAME_MESSAGE {id} GAME_CREATED {kind}")
            }
            Self::GameAccepted { id, kind } => {
                write!(f, "GAME_MESSAGE {id} GAME_ACCEPTED {kind}")
            }
            Self::GameRefused { key, reason } => {
                write!(f, "GAME_MESSAGE {key} GAME_REFUSED {reason}")
            }
            Self::JoinRefused { id, reason } => {
                write!(f, "GAME_MESSAGE {id} GAME_JOIN_REFUSED {reason}")
            }
            Self::GameClosed { id, reason } => {
                write!(f, "GAME_MESSAGE {id} CLOSE {reason}")
            }
            Self::GamesClosed { ids, reason } => {
                write!(f, "GAME_MESSAGE CLOSE ")?;
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    write!(f, "{id}")?;
                }
                write!(f, " {reason}")
            }
            Self::GameList { ids } => {
                f.write_str("SYSTEM_REQUEST_GAME_LIST_RESULT")?;
                for id in ids {
                    write!(f, " {id}")?;
                }
                Ok(())
            }
            Self::PlayerJoined { id, login } => {
                write!(f, "GAME_MESSAGE {id} PLAYER_JOIN {login}")
            }
            Self::PlayerLeft { id, login } => {
                write!(f, "GAME_MESSAGE {id} PLAYER_LEAVE {login}")
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
