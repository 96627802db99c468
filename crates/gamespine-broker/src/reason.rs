//! Fixed human-readable reason strings.
//!
//! These travel on the wire inside refusal and close lines. Clients are
//! known to match on them verbatim, so they are frozen — typos included,
//! see [`CLIENT_CLOSED`].

/// No provider is registered for the requested kind.
pub const NO_SERVER: &str = "No server found";

/// The game id in a join does not exist.
pub const UNKNOWN_GAME: &str = "Unknown game";

/// The game exists but every seat is taken.
pub const GAME_FULL: &str = "The game is full";

/// The provider left an active game; it cannot continue.
pub const PROVIDER_LEFT: &str = "Provider left the game";

/// The last consumer left; the game is pointless.
pub const NO_PLAYERS: &str = "No more players";

/// A connection dropped and its games were torn down. The broken grammar
/// is part of the wire contract.
pub const CLIENT_CLOSED: &str =
    "Client close its connection and end the game";
