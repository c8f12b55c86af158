//! Error types for the room layer.

use lcr_engine::EngineError;
use lcr_protocol::{ErrorCode, RoomCode};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoomError {
    /// No live room has this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The room's actor has stopped or its channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),

    /// The game refused the command; nothing changed.
    #[error(transparent)]
    Rejected(#[from] EngineError),
}

impl RoomError {
    /// The wire code reported to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) | Self::Unavailable(_) => ErrorCode::RoomNotFound,
            Self::Rejected(err) => err.code(),
        }
    }

    /// Turn-protocol violations (rolling out of turn, resolving a roll
    /// that isn't pending) are dropped quietly rather than reported.
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Self::Rejected(EngineError::IllegalState(_)))
    }
}
