//! One live game and its membership.

use gamespine_protocol::{GameDefinition, GameId, ServerMessage, SessionId};

/// One outbound line addressed to one session.
///
/// Game logic computes *who gets what* and hands the pairs back; the
/// broker resolves the ids against its registry and does the pushing.
/// A stale id in a delivery is harmless — resolution just finds nothing.
pub type Delivery = (SessionId, String);

/// A running game: one provider hosting, any number of consumers playing.
///
/// The struct stores only [`SessionId`]s, never session handles. When the
/// provider slot is empty (the provider left but teardown is still in
/// flight) relayed traffic is dropped rather than misdelivered.
#[derive(Debug)]
pub struct GameSession {
    id: GameId,
    definition: GameDefinition,
    provider: Option<SessionId>,
    consumers: Vec<SessionId>,
}

impl GameSession {
    /// Creates a game hosted by `provider`, with no consumers yet.
    pub fn new(
        id: GameId,
        definition: GameDefinition,
        provider: SessionId,
    ) -> Self {
        Self {
            id,
            definition,
            provider: Some(provider),
            consumers: Vec::new(),
        }
    }

    pub fn id(&self) -> &GameId {
        &self.id
    }

    /// The kind this game was created for.
    pub fn kind(&self) -> &str {
        &self.definition.kind
    }

    pub fn definition(&self) -> &GameDefinition {
        &self.definition
    }

    /// The hosting session, if the slot is still occupied.
    pub fn provider(&self) -> Option<SessionId> {
        self.provider
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Whether `session` is the provider or one of the consumers.
    pub fn contains(&self, session: SessionId) -> bool {
        self.provider == Some(session) || self.consumers.contains(&session)
    }

    /// Whether another consumer can still be seated.
    pub fn place_available(&self) -> bool {
        self.definition.has_capacity(self.consumers.len())
    }

    /// Seats `session` as a consumer and tells the provider.
    ///
    /// Idempotent: seating a session twice leaves one membership and
    /// produces no second notice. Capacity is the caller's concern — the
    /// broker checks [`place_available`](Self::place_available) first so
    /// it can refuse with the right reason.
    pub fn add_consumer(
        &mut self,
        session: SessionId,
        login: &str,
    ) -> Vec<Delivery> {
        if self.consumers.contains(&session) {
            return Vec::new();
        }
        self.consumers.push(session);

        let mut deliveries = Vec::new();
        if let Some(provider) = self.provider {
            deliveries.push((
                provider,
                ServerMessage::PlayerJoined {
                    id: self.id.clone(),
                    login: login.to_string(),
                }
                .to_string(),
            ));
        }
        deliveries
    }

    /// Routes one relayed line.
    ///
    /// The provider's traffic fans out to every consumer; a consumer's
    /// traffic goes to the provider alone. `line` is the full original
    /// `GAME_MESSAGE ...` line and is forwarded untouched. A sender that
    /// is not a member produces nothing.
    pub fn handle_message(
        &self,
        from: SessionId,
        line: &str,
    ) -> Vec<Delivery> {
        if self.provider == Some(from) {
            return self
                .consumers
                .iter()
                .map(|&consumer| (consumer, line.to_string()))
                .collect();
        }

        if self.consumers.contains(&from) {
            if let Some(provider) = self.provider {
                return vec![(provider, line.to_string())];
            }
        }

        Vec::new()
    }

    /// Removes `session` from the game.
    ///
    /// Returns `true` if the departing session was the provider — the
    /// caller must then close the game. A departing consumer yields a
    /// `PLAYER_LEAVE` notice for the provider; a session that was never
    /// a member yields `(false, [])`.
    pub fn remove(
        &mut self,
        session: SessionId,
        login: &str,
    ) -> (bool, Vec<Delivery>) {
        if self.provider == Some(session) {
            self.provider = None;
            return (true, Vec::new());
        }

        let before = self.consumers.len();
        self.consumers.retain(|&c| c != session);
        if self.consumers.len() == before {
            return (false, Vec::new());
        }

        let mut deliveries = Vec::new();
        if let Some(provider) = self.provider {
            deliveries.push((
                provider,
                ServerMessage::PlayerLeft {
                    id: self.id.clone(),
                    login: login.to_string(),
                }
                .to_string(),
            ));
        }
        (false, deliveries)
    }

    /// Produces the close notice for every remaining member.
    ///
    /// The game itself is dropped by the broker right after; this only
    /// computes the goodbyes.
    pub fn close(&self, reason: &str) -> Vec<Delivery> {
        let line = ServerMessage::GameClosed {
            id: self.id.clone(),
            reason: reason.to_string(),
        }
        .to_string();

        self.provider
            .iter()
            .chain(self.consumers.iter())
            .map(|&member| (member, line.clone()))
            .collect()
    }
}

// =========================================================================
// Tests
// =========================================================================
