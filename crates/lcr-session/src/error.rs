//! Error types for the session layer.

use lcr_protocol::{ConnectionId, ErrorCode, RoomCode, SeatIndex};

/// Errors that can occur while tracking connections and seat claims.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    /// The connection was registered twice.
    #[error("connection {0} is already registered")]
    AlreadyConnected(ConnectionId),

    /// No session exists for the connection. It was never registered or
    /// has already gone away.
    #[error("no session for connection {0}")]
    NotFound(ConnectionId),

    /// The claim secret doesn't match anything the server issued. Could be
    /// a stale client, a typo, or a guess.
    #[error("unknown seat claim")]
    InvalidClaim,

    /// The seat's reconnect grace period elapsed before the claim came in.
    #[error("seat claim expired")]
    ClaimExpired,

    /// The seat is still held by a live connection.
    #[error("seat {seat} in room {room} is still connected")]
    ClaimInUse { room: RoomCode, seat: SeatIndex },
}

impl SessionError {
    /// The wire code reported to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidClaim | Self::ClaimExpired | Self::ClaimInUse { .. } => {
                ErrorCode::ClaimRejected
            }
            Self::AlreadyConnected(_) | Self::NotFound(_) => ErrorCode::IllegalState,
        }
    }
}
