//! The session manager: who is connected, what they watch, which seats
//! they can take back.
//!
//! # Concurrency note
//!
//! `SessionManager` is not thread-safe by itself; it uses plain
//! `HashMap`s. The server keeps one behind a mutex and never holds that
//! lock across an `.await`.

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use lcr_protocol::{ConnectionId, RoomCode, SeatIndex};
use rand::Rng;

use crate::{ClaimState, SeatClaim, Session, SessionConfig, SessionError};

/// Tracks live connections and outstanding seat claims.
///
/// ## Lifecycle
///
/// ```text
/// connect() ──→ subscribe() ──→ bind_seat() ──→ disconnect() ──→ reclaim()
///                                    │               │               │
///                                    ▼               ▼               ▼
///                               [Connected]     [Detached]      [Connected]
///                                                    │
///                                                    ▼ (after grace period)
///                                                [Expired] ──→ cleanup_expired()
/// ```
pub struct SessionManager {
    /// Live connections, keyed by their handle.
    sessions: HashMap<ConnectionId, Session>,

    /// Outstanding seat claims, keyed by the secret.
    claims: HashMap<String, SeatClaim>,

    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            claims: HashMap::new(),
            config,
        }
    }

    fn grace(&self) -> Duration {
        self.config.reconnect_grace
    }

    /// Registers a freshly accepted connection.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if `conn` is already registered.
    pub fn connect(&mut self, conn: ConnectionId) -> Result<(), SessionError> {
        if self.sessions.contains_key(&conn) {
            return Err(SessionError::AlreadyConnected(conn));
        }
        self.sessions.insert(
            conn,
            Session {
                connection: conn,
                rooms: BTreeSet::new(),
            },
        );
        tracing::debug!(%conn, "session opened");
        Ok(())
    }

    /// Records that `conn` receives `room`'s broadcasts.
    ///
    /// Returns `false` if it already did.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if `conn` is not registered.
    pub fn subscribe(
        &mut self,
        conn: ConnectionId,
        room: &RoomCode,
    ) -> Result<bool, SessionError> {
        let session = self
            .sessions
            .get_mut(&conn)
            .ok_or(SessionError::NotFound(conn))?;
        Ok(session.rooms.insert(room.clone()))
    }

    /// Records that `conn` now holds `seat` in `room` under `claim`.
    ///
    /// The secret comes from [`generate_claim`]; the room is told it first
    /// so both sides agree on it.
    pub fn bind_seat(
        &mut self,
        conn: ConnectionId,
        room: &RoomCode,
        seat: SeatIndex,
        claim: String,
    ) {
        tracing::debug!(%conn, %room, seat, "seat claim issued");
        self.claims.insert(
            claim,
            SeatClaim {
                room: room.clone(),
                seat,
                state: ClaimState::Connected { conn },
            },
        );
    }

    /// Drops the claim `conn` holds in `room`, after the player left.
    ///
    /// Returns whether a claim was removed.
    pub fn release_seat(&mut self, conn: ConnectionId, room: &RoomCode) -> bool {
        let before = self.claims.len();
        self.claims.retain(|_, claim| {
            !(claim.room == *room && claim.state == ClaimState::Connected { conn })
        });
        before != self.claims.len()
    }

    /// Forgets a claim outright, e.g. once the room has refused it.
    pub fn forget_claim(&mut self, claim: &str) {
        self.claims.remove(claim);
    }

    /// Forgets everything about a room that has been shut down.
    pub fn forget_room(&mut self, room: &RoomCode) {
        self.claims.retain(|_, claim| claim.room != *room);
        for session in self.sessions.values_mut() {
            session.rooms.remove(room);
        }
    }

    /// Removes `conn` and starts the grace period on every seat it held.
    ///
    /// Returns the rooms the connection was subscribed to, so the caller
    /// can tell each of them.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if `conn` is not registered.
    pub fn disconnect(
        &mut self,
        conn: ConnectionId,
    ) -> Result<Vec<RoomCode>, SessionError> {
        let session = self
            .sessions
            .remove(&conn)
            .ok_or(SessionError::NotFound(conn))?;

        let now = Instant::now();
        for claim in self.claims.values_mut() {
            if claim.state == (ClaimState::Connected { conn }) {
                claim.state = ClaimState::Detached { since: now };
                tracing::info!(%conn, room = %claim.room, seat = claim.seat, "seat detached, grace period started");
            }
        }

        tracing::debug!(%conn, rooms = session.rooms.len(), "session closed");
        Ok(session.rooms.into_iter().collect())
    }

    /// Hands the seat behind `claim` to `conn`.
    ///
    /// Any detached claim the sweep has not expired yet is handed over.
    /// The room keeps its own grace timer and is the one that decides: the
    /// caller still has to get the room to accept the reattach, and if it
    /// refuses, call [`forget_claim`](Self::forget_claim).
    ///
    /// # Errors
    /// - [`SessionError::InvalidClaim`]: the secret is unknown
    /// - [`SessionError::ClaimInUse`]: the seat's holder has not dropped
    ///   (yet); the claim stays valid
    /// - [`SessionError::ClaimExpired`]: the sweep already expired it
    pub fn reclaim(
        &mut self,
        claim: &str,
        conn: ConnectionId,
    ) -> Result<SeatClaim, SessionError> {
        let entry = self
            .claims
            .get_mut(claim)
            .ok_or(SessionError::InvalidClaim)?;

        match entry.state {
            ClaimState::Detached { .. } => {
                entry.state = ClaimState::Connected { conn };
                tracing::info!(%conn, room = %entry.room, seat = entry.seat, "seat claim accepted");
                Ok(entry.clone())
            }
            ClaimState::Expired => Err(SessionError::ClaimExpired),
            ClaimState::Connected { .. } => Err(SessionError::ClaimInUse {
                room: entry.room.clone(),
                seat: entry.seat,
            }),
        }
    }

    /// Expires every detached claim whose grace period has elapsed.
    ///
    /// Returns the `(room, seat)` of each claim that expired.
    pub fn expire_stale(&mut self) -> Vec<(RoomCode, SeatIndex)> {
        let grace = self.grace();
        let mut expired = Vec::new();

        for claim in self.claims.values_mut() {
            if let ClaimState::Detached { since } = claim.state {
                if since.elapsed() >= grace {
                    claim.state = ClaimState::Expired;
                    expired.push((claim.room.clone(), claim.seat));
                    tracing::debug!(room = %claim.room, seat = claim.seat, "seat claim expired");
                }
            }
        }

        expired
    }

    /// Removes expired claims. Separate from
    /// [`expire_stale`](Self::expire_stale) so callers can react to the
    /// expirations first.
    pub fn cleanup_expired(&mut self) {
        self.claims
            .retain(|_, claim| claim.state != ClaimState::Expired);
    }

    pub fn get(&self, conn: ConnectionId) -> Option<&Session> {
        self.sessions.get(&conn)
    }

    pub fn get_claim(&self, claim: &str) -> Option<&SeatClaim> {
        self.claims.get(claim)
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of outstanding claims, in any state.
    pub fn claim_count(&self) -> usize {
        self.claims.len()
    }
}

/// Generates a seat claim secret: 16 random bytes as 32 lowercase hex
/// characters.
pub fn generate_claim() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================
