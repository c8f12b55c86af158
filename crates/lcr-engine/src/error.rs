use lcr_protocol::{ConnectionId, ErrorCode, SeatIndex};

/// Why the engine refused a command. A refused command changes nothing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("every seat is taken")]
    RoomFull,

    #[error("{0} already holds seat {1}")]
    AlreadySeated(ConnectionId, SeatIndex),

    #[error("{0} is not seated in this room")]
    NotSeated(ConnectionId),

    #[error("not allowed right now: {0}")]
    IllegalState(&'static str),

    #[error("claim does not match seat {0}")]
    ClaimRejected(SeatIndex),
}

impl EngineError {
    /// The wire code reported to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::RoomFull => ErrorCode::RoomFull,
            Self::AlreadySeated(..) => ErrorCode::AlreadySeated,
            Self::NotSeated(_) => ErrorCode::NotSeated,
            Self::IllegalState(_) => ErrorCode::IllegalState,
            Self::ClaimRejected(_) => ErrorCode::ClaimRejected,
        }
    }
}
