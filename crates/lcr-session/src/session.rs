//! Session types: the records kept per connection and per seat claim.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use lcr_protocol::{ConnectionId, RoomCode, SeatIndex};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a dropped player's claim is kept before the sweep expires
    /// it. Should match the rooms' grace period; the room holding the seat
    /// has the final word on a reclaim.
    ///
    /// Default: 30 seconds.
    pub reconnect_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One live connection and the rooms it is subscribed to.
///
/// Created when the socket is accepted, dropped when it closes. Watching a
/// room and sitting in it both count as a subscription.
#[derive(Debug, Clone)]
pub struct Session {
    pub connection: ConnectionId,
    pub rooms: BTreeSet<RoomCode>,
}

// ---------------------------------------------------------------------------
// SeatClaim
// ---------------------------------------------------------------------------

/// The state of a seat claim.
///
/// ```text
///   Connected ──(socket drops)──→ Detached ──(grace elapses)──→ Expired
///       ↑                             │
///       └─────────(reclaim)───────────┘
/// ```
///
/// `Instant` is the monotonic clock, so a wall-clock change can't cut a
/// grace period short or stretch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimState {
    /// The seat is held by this connection.
    Connected { conn: ConnectionId },

    /// The holder dropped at the given instant.
    Detached { since: Instant },

    /// The grace period passed; the claim will be cleaned up.
    Expired,
}

/// What a claim secret grants: one seat in one room.
///
/// The secret itself is the key it is stored under and is handed to the
/// player in `joinedRoom`. It is a 32-character hex string (128 bits of
/// randomness).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatClaim {
    pub room: RoomCode,
    pub seat: SeatIndex,
    pub state: ClaimState,
}
