//! The per-connection protocol state machine.

use gamespine_protocol::{SessionId, MESSAGE_CLOSE, MESSAGE_INIT};

use crate::LoginValidator;

/// The handshake state of a connection.
///
/// ```text
/// Init ──(INIT)──→ WaitingForLogin ──(valid login:password)──→ Connected
/// ```
///
/// There is no backwards edge: a failed login doesn't reset the machine,
/// it ends the connection. A fresh socket gets a fresh `Session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Socket accepted, nothing meaningful received yet.
    Init,

    /// We asked for credentials and are waiting for `login:password`.
    WaitingForLogin,

    /// Logged in; every further line is a broker command.
    Connected,
}

/// What a received line means, given the session's current state.
///
/// `handle_line` mutates the state machine and reports the outcome; the
/// broker turns the outcome into replies, dispatch, or teardown. Keeping
/// the decision here and the I/O there makes the machine trivially
/// testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The line doesn't fit the current state. Dropped without a reply.
    Ignored,

    /// `INIT` arrived in the Init state; ask for credentials.
    LoginAsked,

    /// Credentials accepted; the session is now connected.
    LoginAccepted,

    /// Credentials refused; reply then tear the session down.
    LoginRefused,

    /// A connected-state line to dispatch as a broker command.
    Command,

    /// The client sent the close token; tear the session down.
    CloseRequested,
}

/// One connected client, as the broker sees it.
///
/// Owns the handshake state, the login (once accepted), and the provider
/// load counter. The transport handle lives elsewhere — a session is pure
/// state, addressed by its [`SessionId`].
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    login: Option<String>,
    state: SessionState,
    /// How many games this session currently provides. Only meaningful
    /// for sessions registered as providers; stays 0 otherwise.
    load: usize,
}

impl Session {
    /// Creates a session in the Init state.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            login: None,
            state: SessionState::Init,
            load: 0,
        }
    }

    /// The broker-assigned id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The accepted login, if the handshake completed.
    pub fn login(&self) -> Option<&str> {
        self.login.as_deref()
    }

    /// Current handshake state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current provider load.
    pub fn load(&self) -> usize {
        self.load
    }

    /// Records one more hosted game.
    pub fn inc_load(&mut self) {
        self.load += 1;
    }

    /// Records one less hosted game, floored at zero.
    pub fn dec_load(&mut self) {
        self.load = self.load.saturating_sub(1);
    }

    /// Advances the state machine with one received line.
    pub fn handle_line(
        &mut self,
        line: &str,
        validator: &dyn LoginValidator,
    ) -> SessionEvent {
        match self.state {
            SessionState::Init => {
                if line == MESSAGE_INIT {
                    self.state = SessionState::WaitingForLogin;
                    SessionEvent::LoginAsked
                } else {
                    tracing::debug!(
                        id = %self.id,
                        "non-INIT line before handshake, ignoring"
                    );
                    SessionEvent::Ignored
                }
            }

            SessionState::WaitingForLogin => {
                // `login:password`; a line without a colon counts as an
                // empty password.
                let (login, password) =
                    line.split_once(':').unwrap_or((line, ""));

                if validator.is_valid(login, password) {
                    self.login = Some(login.to_string());
                    self.state = SessionState::Connected;
                    tracing::info!(id = %self.id, login, "login accepted");
                    SessionEvent::LoginAccepted
                } else {
                    tracing::info!(id = %self.id, login, "login refused");
                    SessionEvent::LoginRefused
                }
            }

            SessionState::Connected => {
                if line == MESSAGE_CLOSE {
                    SessionEvent::CloseRequested
                } else {
                    SessionEvent::Command
                }
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use crate::MirrorValidator;

    use super::*;

    fn session() -> Session {
        Session::new(SessionId(1))
    }

    #[test]
    fn test_handle_line_init_asks_for_login() {
        let mut s = session();

        let event = s.handle_line("INIT", &MirrorValidator);

        assert_eq!(event, SessionEvent::LoginAsked);
        assert_eq!(s.state(), SessionState::WaitingForLogin);
    }

    #[test]
    fn test_handle_line_non_init_line_ignored() {
        let mut s = session();

        let event = s.handle_line("SYSTEM_REQUEST_GAME chess", &MirrorValidator);

        assert_eq!(event, SessionEvent::Ignored);
        assert_eq!(s.state(), SessionState::Init);
    }

    #[test]
    fn test_handle_line_matching_credentials_accepted() {
        let mut s = session();
        s.handle_line("INIT", &MirrorValidator);

        let event = s.handle_line("alice:alice", &MirrorValidator);

        assert_eq!(event, SessionEvent::LoginAccepted);
        assert_eq!(s.state(), SessionState::Connected);
        assert_eq!(s.login(), Some("alice"));
    }

    #[test]
    fn test_handle_line_mismatched_credentials_refused() {
        let mut s = session();
        s.handle_line("INIT", &MirrorValidator);

        let event = s.handle_line("alice:bob", &MirrorValidator);

        assert_eq!(event, SessionEvent::LoginRefused);
        // Refusal doesn't regress the machine; the connection dies instead.
        assert_eq!(s.state(), SessionState::WaitingForLogin);
        assert_eq!(s.login(), None);
    }

    #[test]
    fn test_handle_line_login_without_colon_gets_empty_password() {
        let mut s = session();
        s.handle_line("INIT", &MirrorValidator);

        // "alice" → login "alice", password "" → mirror policy refuses.
        let event = s.handle_line("alice", &MirrorValidator);

        assert_eq!(event, SessionEvent::LoginRefused);
    }

    #[test]
    fn test_handle_line_connected_forwards_commands() {
        let mut s = session();
        s.handle_line("INIT", &MirrorValidator);
        s.handle_line("bob:bob", &MirrorValidator);

        let event =
            s.handle_line("SYSTEM_REQUEST_GAME chess", &MirrorValidator);

        assert_eq!(event, SessionEvent::Command);
    }

    #[test]
    fn test_handle_line_connected_close_token_requests_teardown() {
        let mut s = session();
        s.handle_line("INIT", &MirrorValidator);
        s.handle_line("bob:bob", &MirrorValidator);

        let event =
            s.handle_line("SYSTEM_CLOSE_CONNECTION", &MirrorValidator);

        assert_eq!(event, SessionEvent::CloseRequested);
    }

    #[test]
    fn test_handle_line_init_after_connect_is_a_command() {
        // The state machine never regresses: a stray INIT after login is
        // just another line for the broker (which will drop it).
        let mut s = session();
        s.handle_line("INIT", &MirrorValidator);
        s.handle_line("bob:bob", &MirrorValidator);

        let event = s.handle_line("INIT", &MirrorValidator);

        assert_eq!(event, SessionEvent::Command);
        assert_eq!(s.state(), SessionState::Connected);
    }

    #[test]
    fn test_load_counter_floors_at_zero() {
        let mut s = session();
        s.inc_load();
        s.inc_load();
        assert_eq!(s.load(), 2);

        s.dec_load();
        s.dec_load();
        s.dec_load();
        assert_eq!(s.load(), 0);
    }
}
