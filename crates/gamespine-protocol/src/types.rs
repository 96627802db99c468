//! Identifiers and descriptors shared by every layer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a connected session.
///
/// This is a newtype wrapper around `u64`. Sessions are addressed
/// *everywhere* by this opaque id — game sessions and registry indices
/// store `SessionId`s and resolve them through the broker's table, never
/// references into a collection that might reallocate underneath them.
///
/// `#[serde(transparent)]` keeps the serialized form a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// A unique identifier for a game session.
///
/// Game ids travel on the wire as text (`chess_0`, `maze_17`), so unlike
/// [`SessionId`] this wraps a `String`. The broker mints them from a kind
/// plus a per-broker monotonic counter; clients echo them back verbatim.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    /// Mints the id for the `seq`-th game of `kind`.
    pub fn new(kind: &str, seq: u64) -> Self {
        Self(format!("{kind}_{seq}"))
    }

    /// Wraps an id received on the wire, without validation.
    ///
    /// Unknown ids are legal input — the broker existence-checks every
    /// lookup and degrades to a refusal or a silent drop.
    pub fn from_wire(raw: &str) -> Self {
        Self(raw.to_string())
    }

    /// The id exactly as it appears on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// GameDefinition
// ---------------------------------------------------------------------------

/// Immutable per-kind game descriptor.
///
/// A provider registers one of these per kind it can host:
/// `<kind> <minPlayers> <maxPlayers> <iaFlag>`. The first registration for
/// a kind wins; later registrations never overwrite it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDefinition {
    /// The kind string, unique key into the definitions table.
    pub kind: String,

    /// Minimum players for a meaningful game. Stored and reported but not
    /// enforced at matchmaking time — the final protocol revision dropped
    /// the waiting-consumer gate.
    pub min_players: usize,

    /// Maximum concurrent consumers. `None` means unbounded, written as
    /// `-1` on the wire.
    pub max_players: Option<usize>,

    /// Whether the provider can supply an AI stand-in player.
    pub ia_available: bool,
}

impl GameDefinition {
    /// Parses the four registration tokens for one kind.
    pub fn from_tokens(
        kind: &str,
        min_players: &str,
        max_players: &str,
        ia_flag: &str,
    ) -> Result<Self, ProtocolError> {
        let min = min_players.parse::<usize>().map_err(|_| {
            ProtocolError::InvalidNumber {
                field: "minPlayers",
                value: min_players.to_string(),
            }
        })?;

        // -1 is the wire spelling for "unbounded".
        let max = match max_players {
            "-1" => None,
            other => Some(other.parse::<usize>().map_err(|_| {
                ProtocolError::InvalidNumber {
                    field: "maxPlayers",
                    value: other.to_string(),
                }
            })?),
        };

        let ia = match ia_flag.parse::<i64>() {
            Ok(n) => n != 0,
            Err(_) => {
                return Err(ProtocolError::InvalidNumber {
                    field: "iaFlag",
                    value: ia_flag.to_string(),
                });
            }
        };

        Ok(Self {
            kind: kind.to_string(),
            min_players: min,
            max_players: max,
            ia_available: ia,
        })
    }

    /// Returns `true` if a game of this kind can still seat a consumer
    /// given `consumer_count` current members.
    pub fn has_capacity(&self, consumer_count: usize) -> bool {
        match self.max_players {
            None => true,
            Some(max) => consumer_count < max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_id_new_formats_kind_and_seq() {
        let id = GameId::new("chess", 0);
        assert_eq!(id.as_str(), "chess_0");
        assert_eq!(id.to_string(), "chess_0");
    }

    #[test]
    fn test_game_id_from_wire_round_trips() {
        let id = GameId::from_wire("maze_42");
        assert_eq!(id, GameId::new("maze", 42));
    }

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId(7).to_string(), "S-7");
    }

    #[test]
    fn test_definition_from_tokens_bounded() {
        let def =
            GameDefinition::from_tokens("chess", "2", "2", "0").unwrap();
        assert_eq!(def.kind, "chess");
        assert_eq!(def.min_players, 2);
        assert_eq!(def.max_players, Some(2));
        assert!(!def.ia_available);
    }

    #[test]
    fn test_definition_from_tokens_unbounded_and_ia() {
        let def =
            GameDefinition::from_tokens("maze", "1", "-1", "1").unwrap();
        assert_eq!(def.max_players, None);
        assert!(def.ia_available);
    }

    #[test]
    fn test_definition_from_tokens_bad_number_rejected() {
        let result = GameDefinition::from_tokens("chess", "two", "2", "0");
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidNumber {
                field: "minPlayers",
                ..
            })
        ));
    }

    #[test]
    fn test_has_capacity_bounded() {
        let def =
            GameDefinition::from_tokens("chess", "2", "2", "0").unwrap();
        assert!(def.has_capacity(0));
        assert!(def.has_capacity(1));
        assert!(!def.has_capacity(2));
        assert!(!def.has_capacity(3));
    }

    #[test]
    fn test_has_capacity_unbounded_always_true() {
        let def =
            GameDefinition::from_tokens("maze", "1", "-1", "0").unwrap();
        assert!(def.has_capacity(usize::MAX - 1));
    }
}
