//! The registry and command dispatcher.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use gamespine_protocol::{
    Command, GameDefinition, GameId, ServerMessage, SessionId,
};
use gamespine_session::{
    LoginValidator, MirrorValidator, Session, SessionEvent, SessionState,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::game::{Delivery, GameSession};
use crate::reason;

/// What the connection task should do after a frame was processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading frames.
    Continue,

    /// Stop reading and tear the connection down. The task must follow
    /// up with [`Broker::close_session`].
    Close,
}

/// One registry slot: the session state plus the way back to its socket.
#[derive(Debug)]
struct SessionEntry {
    session: Session,
    outbound: UnboundedSender<String>,
}

/// The whole server state behind one lock.
///
/// Sessions, registrations, definitions and games all live here, keyed by
/// id. The server wraps the broker in a `tokio::sync::Mutex`; a frame is
/// processed start to finish under it, which is what makes the two-phase
/// teardown in [`close_session`](Self::close_session) safe without any
/// further coordination.
pub struct Broker {
    validator: Box<dyn LoginValidator>,

    sessions: HashMap<SessionId, SessionEntry>,
    next_session_id: u64,

    /// Sessions that completed a `SYSTEM_REGISTER`, either role.
    registered: HashSet<SessionId>,

    /// kind → consumer sessions interested in it, in registration order.
    consumers_by_kind: HashMap<String, Vec<SessionId>>,

    /// kind → provider sessions able to host it, in registration order.
    /// Order matters: matchmaking ties break toward the earlier entry.
    providers_by_kind: HashMap<String, Vec<SessionId>>,

    /// kind → descriptor. First registration wins, later ones are kept
    /// only as provider index entries.
    definitions: HashMap<String, GameDefinition>,

    games: HashMap<GameId, GameSession>,
    next_game_seq: u64,
}

impl Broker {
    pub fn new(validator: impl LoginValidator + 'static) -> Self {
        Self {
            validator: Box::new(validator),
            sessions: HashMap::new(),
            next_session_id: 0,
            registered: HashSet::new(),
            consumers_by_kind: HashMap::new(),
            providers_by_kind: HashMap::new(),
            definitions: HashMap::new(),
            games: HashMap::new(),
            next_game_seq: 0,
        }
    }

    // ---------------------------------------------------------------------
    // Connection lifecycle
    // ---------------------------------------------------------------------

    /// Admits a freshly accepted connection and returns its id.
    ///
    /// `outbound` is the sending half of the connection's writer channel;
    /// everything the broker wants this client to see goes through it.
    pub fn register_session(
        &mut self,
        outbound: UnboundedSender<String>,
    ) -> SessionId {
        let id = SessionId(self.next_session_id);
        self.next_session_id += 1;

        self.sessions.insert(
            id,
            SessionEntry {
                session: Session::new(id),
                outbound,
            },
        );
        tracing::debug!(%id, "session admitted");
        id
    }

    /// Processes one received frame for `id`.
    ///
    /// Runs the handshake machine first; once the session is connected the
    /// line is parsed as a command and dispatched. Returns [`Flow::Close`]
    /// when the connection should not read any further frame.
    pub fn on_message(&mut self, id: SessionId, line: &str) -> Flow {
        let Some(entry) = self.sessions.get_mut(&id) else {
            tracing::debug!(%id, "frame for unknown session");
            return Flow::Close;
        };
        let event = entry.session.handle_line(line, &*self.validator);

        match event {
            SessionEvent::Ignored => Flow::Continue,
            SessionEvent::LoginAsked => {
                self.send_to(id, &ServerMessage::LoginAsked.to_string());
                Flow::Continue
            }
            SessionEvent::LoginAccepted => {
                self.send_to(id, &ServerMessage::LoginAccepted.to_string());
                Flow::Continue
            }
            SessionEvent::LoginRefused => {
                self.send_to(id, &ServerMessage::LoginRefused.to_string());
                Flow::Close
            }
            SessionEvent::CloseRequested => Flow::Close,
            SessionEvent::Command => {
                self.dispatch(id, line);
                Flow::Continue
            }
        }
    }

    /// Removes a session and everything that depended on it.
    ///
    /// Two phases. First every game the session belonged to is updated in
    /// place: games it hosted, and games where it was the last consumer,
    /// are marked doomed; the others get a `PLAYER_LEAVE` notice. Then the
    /// doomed games are destroyed together and one aggregate close line is
    /// broadcast to every remaining session. Finally the registration
    /// indices are purged. Idempotent: closing an unknown id is a no-op.
    pub fn close_session(&mut self, id: SessionId) {
        let Some(entry) = self.sessions.remove(&id) else {
            return;
        };
        let login = entry.session.login().unwrap_or("").to_string();
        tracing::info!(%id, login, "session closed");

        let mut doomed: Vec<GameId> = Vec::new();
        let mut notices: Vec<Delivery> = Vec::new();
        for (game_id, game) in self.games.iter_mut() {
            if !game.contains(id) {
                continue;
            }
            let (was_provider, leave_notices) = game.remove(id, &login);
            if was_provider || game.consumer_count() == 0 {
                doomed.push(game_id.clone());
            } else {
                notices.extend(leave_notices);
            }
        }
        doomed.sort();
        self.deliver(notices);

        if !doomed.is_empty() {
            for game_id in &doomed {
                if let Some(game) = self.games.remove(game_id) {
                    if let Some(provider) = game.provider() {
                        self.dec_load(provider);
                    }
                }
            }

            let broadcast = ServerMessage::GamesClosed {
                ids: doomed,
                reason: reason::CLIENT_CLOSED.to_string(),
            }
            .to_string();
            // Everyone past login hears about it; sockets still in the
            // handshake have no business seeing game traffic.
            for entry in self.sessions.values() {
                if entry.session.state() == SessionState::Connected {
                    let _ = entry.outbound.send(broadcast.clone());
                }
            }
        }

        self.registered.remove(&id);
        self.consumers_by_kind.retain(|_, ids| {
            ids.retain(|&s| s != id);
            !ids.is_empty()
        });
        self.providers_by_kind.retain(|_, ids| {
            ids.retain(|&s| s != id);
            !ids.is_empty()
        });
    }

    // ---------------------------------------------------------------------
    // Command dispatch
    // ---------------------------------------------------------------------

    fn dispatch(&mut self, id: SessionId, line: &str) {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(error) => {
                tracing::debug!(%id, %error, "dropping unparseable line");
                return;
            }
        };

        match command {
            Command::RegisterConsumer { kinds } => {
                self.register_consumer(id, kinds);
            }
            Command::RegisterProvider { definitions } => {
                self.register_provider(id, definitions);
            }
            Command::RequestGame { kind } => self.request_game(id, &kind),
            Command::RequestGameList { kind } => {
                self.request_game_list(id, &kind);
            }
            Command::JoinOrRequestGame { kind } => {
                self.join_or_request_game(id, &kind);
            }
            Command::JoinGame { game_id } => self.join_game(id, &game_id),
            Command::LeaveGame { game_id } => self.leave_game(id, &game_id),
            Command::GameCreationRefused { game_id, reason } => {
                self.game_creation_refused(id, &game_id, &reason);
            }
            Command::GameMessage { game_id, .. } => {
                self.relay(id, &game_id, line);
            }
        }
    }

    fn register_consumer(&mut self, id: SessionId, kinds: Vec<String>) {
        if self.registered.contains(&id) {
            tracing::debug!(%id, "already registered, ignoring");
            return;
        }

        for kind in kinds {
            let consumers = self.consumers_by_kind.entry(kind).or_default();
            if !consumers.contains(&id) {
                consumers.push(id);
            }
        }
        self.registered.insert(id);
        tracing::info!(%id, "consumer registered");
    }

    fn register_provider(
        &mut self,
        id: SessionId,
        definitions: Vec<GameDefinition>,
    ) {
        for definition in definitions {
            let kind = definition.kind.clone();

            match self.definitions.entry(kind.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(definition);
                }
                Entry::Occupied(_) => {
                    tracing::debug!(
                        kind,
                        "definition already known, keeping the first"
                    );
                }
            }

            let providers = self.providers_by_kind.entry(kind).or_default();
            if !providers.contains(&id) {
                providers.push(id);
            }
        }
        self.registered.insert(id);
        tracing::info!(%id, "provider registered");
    }

    /// `SYSTEM_REQUEST_GAME`: create a game on the least-loaded provider
    /// and seat the requester as its first consumer.
    fn request_game(&mut self, requester: SessionId, kind: &str) {
        let Some(provider) = self.least_loaded_provider(kind) else {
            self.send_to(
                requester,
                &ServerMessage::GameRefused {
                    key: kind.to_string(),
                    reason: reason::NO_SERVER.to_string(),
                }
                .to_string(),
            );
            return;
        };

        // A provider index entry without a definition cannot happen
        // through the protocol; if it does, refuse rather than panic.
        let Some(definition) = self.definitions.get(kind).cloned() else {
            tracing::warn!(kind, "provider indexed without a definition");
            self.send_to(
                requester,
                &ServerMessage::GameRefused {
                    key: kind.to_string(),
                    reason: reason::NO_SERVER.to_string(),
                }
                .to_string(),
            );
            return;
        };

        // The requester takes the first seat, so a definition that seats
        // nobody can never satisfy a request.
        if !definition.has_capacity(0) {
            self.send_to(
                requester,
                &ServerMessage::GameRefused {
                    key: kind.to_string(),
                    reason: reason::GAME_FULL.to_string(),
                }
                .to_string(),
            );
            return;
        }

        let game_id = GameId::new(kind, self.next_game_seq);
        self.next_game_seq += 1;

        let mut game =
            GameSession::new(game_id.clone(), definition, provider);
        if let Some(entry) = self.sessions.get_mut(&provider) {
            entry.session.inc_load();
        }

        self.send_to(
            provider,
            &ServerMessage::GameCreated {
                id: game_id.clone(),
                kind: kind.to_string(),
            }
            .to_string(),
        );

        let login = self.login_of(requester);
        let notices = game.add_consumer(requester, &login);
        self.games.insert(game_id.clone(), game);
        tracing::info!(game = %game_id, %provider, %requester, "game created");

        self.send_to(
            requester,
            &ServerMessage::GameAccepted {
                id: game_id,
                kind: kind.to_string(),
            }
            .to_string(),
        );
        self.deliver(notices);
    }

    fn request_game_list(&mut self, requester: SessionId, kind: &str) {
        let mut ids: Vec<GameId> = self
            .games
            .values()
            .filter(|game| game.kind() == kind && game.place_available())
            .map(|game| game.id().clone())
            .collect();
        ids.sort();

        self.send_to(
            requester,
            &ServerMessage::GameList { ids }.to_string(),
        );
    }

    /// `SYSTEM_JOIN_OR_REQUEST_GAME`: join the lowest-id joinable game of
    /// the kind, or fall back to creating a fresh one.
    fn join_or_request_game(&mut self, requester: SessionId, kind: &str) {
        let target = self
            .games
            .values()
            .filter(|game| game.kind() == kind && game.place_available())
            .map(|game| game.id().clone())
            .min();

        match target {
            Some(game_id) => self.join_game(requester, &game_id),
            None => self.request_game(requester, kind),
        }
    }

    fn join_game(&mut self, requester: SessionId, game_id: &GameId) {
        let login = self.login_of(requester);

        let outcome = match self.games.get_mut(game_id) {
            None => Err(reason::UNKNOWN_GAME),
            Some(game)
                if !game.place_available()
                    && !game.contains(requester) =>
            {
                Err(reason::GAME_FULL)
            }
            Some(game) => {
                let kind = game.kind().to_string();
                let notices = game.add_consumer(requester, &login);
                Ok((kind, notices))
            }
        };

        match outcome {
            Err(refusal) => {
                self.send_to(
                    requester,
                    &ServerMessage::JoinRefused {
                        id: game_id.clone(),
                        reason: refusal.to_string(),
                    }
                    .to_string(),
                );
            }
            Ok((kind, notices)) => {
                self.send_to(
                    requester,
                    &ServerMessage::GameAccepted {
                        id: game_id.clone(),
                        kind,
                    }
                    .to_string(),
                );
                self.deliver(notices);
            }
        }
    }

    fn leave_game(&mut self, leaver: SessionId, game_id: &GameId) {
        let login = self.login_of(leaver);

        let Some(game) = self.games.get_mut(game_id) else {
            tracing::debug!(%leaver, game = %game_id, "leave for unknown game");
            return;
        };
        if !game.contains(leaver) {
            return;
        }

        let (was_provider, notices) = game.remove(leaver, &login);
        let close_reason = if was_provider {
            Some(reason::PROVIDER_LEFT)
        } else if game.consumer_count() == 0 {
            Some(reason::NO_PLAYERS)
        } else {
            None
        };

        self.deliver(notices);
        if was_provider {
            self.dec_load(leaver);
        }
        if let Some(why) = close_reason {
            self.destroy_game(game_id, why);
        }
    }

    /// `SYSTEM_GAME_CREATION_REFUSED`: the hosting provider aborts a game
    /// it was just asked to create.
    fn game_creation_refused(
        &mut self,
        from: SessionId,
        game_id: &GameId,
        why: &str,
    ) {
        let is_host = self
            .games
            .get(game_id)
            .is_some_and(|game| game.provider() == Some(from));
        if !is_host {
            tracing::debug!(%from, game = %game_id, "spurious creation refusal");
            return;
        }
        self.destroy_game(game_id, why);
    }

    fn relay(&mut self, from: SessionId, game_id: &GameId, line: &str) {
        let deliveries = match self.games.get(game_id) {
            Some(game) => game.handle_message(from, line),
            None => {
                tracing::debug!(%from, game = %game_id, "relay to unknown game");
                return;
            }
        };
        self.deliver(deliveries);
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    /// Linear scan over the kind's providers; ties keep the earlier entry.
    fn least_loaded_provider(&self, kind: &str) -> Option<SessionId> {
        let candidates = self.providers_by_kind.get(kind)?;

        let mut best: Option<(SessionId, usize)> = None;
        for &candidate in candidates {
            let Some(entry) = self.sessions.get(&candidate) else {
                continue;
            };
            let load = entry.session.load();
            match best {
                Some((_, best_load)) if load >= best_load => {}
                _ => best = Some((candidate, load)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// Drops a game, notifies its remaining members, releases the
    /// provider's load slot.
    fn destroy_game(&mut self, game_id: &GameId, why: &str) {
        let Some(game) = self.games.remove(game_id) else {
            return;
        };
        if let Some(provider) = game.provider() {
            self.dec_load(provider);
        }
        self.deliver(game.close(why));
        tracing::info!(game = %game_id, why, "game closed");
    }

    fn dec_load(&mut self, id: SessionId) {
        if let Some(entry) = self.sessions.get_mut(&id) {
            entry.session.dec_load();
        }
    }

    fn login_of(&self, id: SessionId) -> String {
        self.sessions
            .get(&id)
            .and_then(|entry| entry.session.login())
            .unwrap_or("")
            .to_string()
    }

    fn deliver(&self, deliveries: Vec<Delivery>) {
        for (target, line) in deliveries {
            self.send_to(target, &line);
        }
    }

    fn send_to(&self, id: SessionId, line: &str) {
        if let Some(entry) = self.sessions.get(&id) {
            // A closed receiver means the writer task is gone; teardown
            // reaps the session shortly after.
            let _ = entry.outbound.send(line.to_string());
        }
    }

    // ---------------------------------------------------------------------
    // Observability
    // ---------------------------------------------------------------------

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn contains_session(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Whether the session completed a `SYSTEM_REGISTER`.
    pub fn is_registered(&self, id: SessionId) -> bool {
        self.registered.contains(&id)
    }

    /// The provider load of a connected session.
    pub fn load_of(&self, id: SessionId) -> Option<usize> {
        self.sessions.get(&id).map(|entry| entry.session.load())
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    pub fn game(&self, id: &GameId) -> Option<&GameSession> {
        self.games.get(id)
    }

    /// Every live game id, sorted.
    pub fn game_ids(&self) -> Vec<GameId> {
        let mut ids: Vec<GameId> = self.games.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn providers_of(&self, kind: &str) -> Vec<SessionId> {
        self.providers_by_kind
            .get(kind)
            .cloned()
            .unwrap_or_default()
    }

    pub fn consumers_of(&self, kind: &str) -> Vec<SessionId> {
        self.consumers_by_kind
            .get(kind)
            .cloned()
            .unwrap_or_default()
    }

    pub fn definition(&self, kind: &str) -> Option<&GameDefinition> {
        self.definitions.get(kind)
    }
}

impl Default for Broker {
    /// A broker with the mirror login policy.
    fn default() -> Self {
        Self::new(MirrorValidator)
    }
}

// =========================================================================
// Tests
// =========================================================================
