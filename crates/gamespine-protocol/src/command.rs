//! Parsing of client→server lines.
//!
//! Every frame the transport hands us is one line of text. The first
//! space-delimited token names the command; the rest are its arguments.
//! Only `GAME_MESSAGE` and `SYSTEM_GAME_CREATION_REFUSED` carry free-form
//! trailing text — for those the line is split at most three ways so the
//! payload survives verbatim, embedded spaces and all.

use crate::{GameDefinition, GameId, ProtocolError};

/// The handshake opener. Sent by a client in the INIT state; anything else
/// in that state is ignored.
pub const MESSAGE_INIT: &str = "INIT";

/// The polite close token. A connected client sends this to request its
/// own teardown instead of just dropping the socket.
pub const MESSAGE_CLOSE: &str = "SYSTEM_CLOSE_CONNECTION";

/// A parsed post-login client command.
///
/// This is the broker's entire input surface: every connected-state line
/// either parses into one of these or is dropped. The handshake lines
/// (`INIT`, `login:password`) never reach this parser — the session state
/// machine consumes them first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `SYSTEM_REGISTER CONSUMER <kind>+`
    RegisterConsumer { kinds: Vec<String> },

    /// `SYSTEM_REGISTER PROVIDER (<kind> <min> <max> <ia>)+`
    RegisterProvider { definitions: Vec<GameDefinition> },

    /// `SYSTEM_REQUEST_GAME <kind>`
    RequestGame { kind: String },

    /// `SYSTEM_REQUEST_GAME_LIST <kind>`
    RequestGameList { kind: String },

    /// `SYSTEM_JOIN_OR_REQUEST_GAME <kind>`
    JoinOrRequestGame { kind: String },

    /// `SYSTEM_JOIN_GAME <gameId>`
    JoinGame { game_id: GameId },

    /// `SYSTEM_LEAVE_GAME <gameId>`
    LeaveGame { game_id: GameId },

    /// `SYSTEM_GAME_CREATION_REFUSED <gameId> <reason...>`
    GameCreationRefused { game_id: GameId, reason: String },

    /// `GAME_MESSAGE <gameId> <payload...>` — the relay envelope. The
    /// payload is opaque; the broker forwards the whole original line.
    GameMessage { game_id: GameId, payload: String },
}

impl Command {
    /// Parses one connected-state line.
    ///
    /// # Errors
    /// [`ProtocolError::UnknownCommand`] for an unrecognized first token,
    /// [`ProtocolError::Malformed`] / [`ProtocolError::InvalidNumber`] for
    /// recognized commands with broken arguments. Callers drop either
    /// outcome silently — a malformed line must never fault the broker.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let (word, rest) = match line.split_once(' ') {
            Some((w, r)) => (w, r),
            None => (line, ""),
        };

        match word {
            "SYSTEM_REGISTER" => parse_register(rest),
            "SYSTEM_REQUEST_GAME" => Ok(Command::RequestGame {
                kind: single_token(word, rest)?,
            }),
            "SYSTEM_REQUEST_GAME_LIST" => Ok(Command::RequestGameList {
                kind: single_token(word, rest)?,
            }),
            "SYSTEM_JOIN_OR_REQUEST_GAME" => {
                Ok(Command::JoinOrRequestGame {
                    kind: single_token(word, rest)?,
                })
            }
            "SYSTEM_JOIN_GAME" => Ok(Command::JoinGame {
                game_id: GameId::from_wire(&single_token(word, rest)?),
            }),
            "SYSTEM_LEAVE_GAME" => Ok(Command::LeaveGame {
                game_id: GameId::from_wire(&single_token(word, rest)?),
            }),
            "SYSTEM_GAME_CREATION_REFUSED" => {
                let (id, reason) = id_and_trailing(word, rest)?;
                Ok(Command::GameCreationRefused {
                    game_id: id,
                    reason,
                })
            }
            "GAME_MESSAGE" => {
                let (id, payload) = id_and_trailing(word, rest)?;
                Ok(Command::GameMessage {
                    game_id: id,
                    payload,
                })
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

/// Extracts exactly one argument token.
fn single_token(
    command: &str,
    rest: &str,
) -> Result<String, ProtocolError> {
    let mut tokens = rest.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(tok), None) => Ok(tok.to_string()),
        (None, _) => Err(ProtocolError::Malformed {
            command: command.to_string(),
            detail: "missing argument".to_string(),
        }),
        (Some(_), Some(_)) => Err(ProtocolError::Malformed {
            command: command.to_string(),
            detail: "too many arguments".to_string(),
        }),
    }
}

/// Extracts a game id followed by free-form trailing text (may be empty).
fn id_and_trailing(
    command: &str,
    rest: &str,
) -> Result<(GameId, String), ProtocolError> {
    if rest.is_empty() {
        return Err(ProtocolError::Malformed {
            command: command.to_string(),
            detail: "missing game id".to_string(),
        });
    }
    match rest.split_once(' ') {
        Some((id, trailing)) => {
            Ok((GameId::from_wire(id), trailing.to_string()))
        }
        None => Ok((GameId::from_wire(rest), String::new())),
    }
}

/// Parses the two `SYSTEM_REGISTER` shapes.
fn parse_register(rest: &str) -> Result<Command, ProtocolError> {
    let mut tokens = rest.split_whitespace();
    let part = tokens.next().ok_or_else(|| ProtocolError::Malformed {
        command: "SYSTEM_REGISTER".to_string(),
        detail: "missing CONSUMER/PROVIDER discriminant".to_string(),
    })?;
    let args: Vec<&str> = tokens.collect();

    match part {
        "CONSUMER" => {
            if args.is_empty() {
                return Err(ProtocolError::Malformed {
                    command: "SYSTEM_REGISTER CONSUMER".to_string(),
                    detail: "expected at least one kind".to_string(),
                });
            }
            Ok(Command::RegisterConsumer {
                kinds: args.iter().map(|k| k.to_string()).collect(),
            })
        }
        "PROVIDER" => {
            // Provider registrations come in groups of four tokens:
            // kind, minPlayers, maxPlayers, iaFlag.
            if args.is_empty() || args.len() % 4 != 0 {
                return Err(ProtocolError::Malformed {
                    command: "SYSTEM_REGISTER PROVIDER".to_string(),
                    detail: format!(
                        "expected groups of 4 tokens, got {}",
                        args.len()
                    ),
                });
            }
            let mut definitions = Vec::with_capacity(args.len() / 4);
            for group in args.chunks_exact(4) {
                definitions.push(GameDefinition::from_tokens(
                    group[0], group[1], group[2], group[3],
                )?);
            }
            Ok(Command::RegisterProvider { definitions })
        }
        other => Err(ProtocolError::Malformed {
            command: "SYSTEM_REGISTER".to_string(),
            detail: format!("unknown part {other}"),
        }),
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_register_consumer_single_kind() {
        let cmd = Command::parse("SYSTEM_REGISTER CONSUMER chess").unwrap();
        assert_eq!(
            cmd,
            Command::RegisterConsumer {
                kinds: vec!["chess".to_string()]
            }
        );
    }

    #[test]
    fn test_parse_register_consumer_multiple_kinds() {
        let cmd =
            Command::parse("SYSTEM_REGISTER CONSUMER chess maze").unwrap();
        assert_eq!(
            cmd,
            Command::RegisterConsumer {
                kinds: vec!["chess".to_string(), "maze".to_string()]
            }
        );
    }

    #[test]
    fn test_parse_register_consumer_no_kind_rejected() {
        let result = Command::parse("SYSTEM_REGISTER CONSUMER");
        assert!(matches!(result, Err(ProtocolError::Malformed { .. })));
    }

    #[test]
    fn test_parse_register_provider_one_definition() {
        let cmd =
            Command::parse("SYSTEM_REGISTER PROVIDER chess 2 2 0").unwrap();
        match cmd {
            Command::RegisterProvider { definitions } => {
                assert_eq!(definitions.len(), 1);
                assert_eq!(definitions[0].kind, "chess");
                assert_eq!(definitions[0].max_players, Some(2));
            }
            other => panic!("expected RegisterProvider, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_register_provider_two_definitions() {
        let cmd = Command::parse(
            "SYSTEM_REGISTER PROVIDER chess 2 2 0 maze 1 -1 1",
        )
        .unwrap();
        match cmd {
            Command::RegisterProvider { definitions } => {
                assert_eq!(definitions.len(), 2);
                assert_eq!(definitions[1].kind, "maze");
                assert_eq!(definitions[1].max_players, None);
                assert!(definitions[1].ia_available);
            }
            other => panic!("expected RegisterProvider, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_register_provider_ragged_group_rejected() {
        let result = Command::parse("SYSTEM_REGISTER PROVIDER chess 2 2");
        assert!(matches!(result, Err(ProtocolError::Malformed { .. })));
    }

    #[test]
    fn test_parse_request_game() {
        let cmd = Command::parse("SYSTEM_REQUEST_GAME chess").unwrap();
        assert_eq!(
            cmd,
            Command::RequestGame {
                kind: "chess".to_string()
            }
        );
    }

    #[test]
    fn test_parse_request_game_missing_kind_rejected() {
        assert!(Command::parse("SYSTEM_REQUEST_GAME").is_err());
        assert!(Command::parse("SYSTEM_REQUEST_GAME ").is_err());
    }

    #[test]
    fn test_parse_join_game() {
        let cmd = Command::parse("SYSTEM_JOIN_GAME chess_0").unwrap();
        assert_eq!(
            cmd,
            Command::JoinGame {
                game_id: GameId::from_wire("chess_0")
            }
        );
    }

    #[test]
    fn test_parse_game_message_preserves_payload_spaces() {
        let cmd =
            Command::parse("GAME_MESSAGE chess_0 MOVE e2 e4").unwrap();
        assert_eq!(
            cmd,
            Command::GameMessage {
                game_id: GameId::from_wire("chess_0"),
                payload: "MOVE e2 e4".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_game_message_empty_payload_allowed() {
        let cmd = Command::parse("GAME_MESSAGE chess_0").unwrap();
        assert_eq!(
            cmd,
            Command::GameMessage {
                game_id: GameId::from_wire("chess_0"),
                payload: String::new(),
            }
        );
    }

    #[test]
    fn test_parse_game_creation_refused_keeps_reason() {
        let cmd = Command::parse(
            "SYSTEM_GAME_CREATION_REFUSED maze_3 No more slot available",
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::GameCreationRefused {
                game_id: GameId::from_wire("maze_3"),
                reason: "No more slot available".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_unknown_command_rejected() {
        let result = Command::parse("SYSTEM_DANCE chess");
        assert!(matches!(
            result,
            Err(ProtocolError::UnknownCommand(w)) if w == "SYSTEM_DANCE"
        ));
    }

    #[test]
    fn test_parse_empty_line_rejected() {
        assert!(Command::parse("").is_err());
    }
}
