//! Unified error type for the LCR server.

use lcr_protocol::{ErrorCode, ProtocolError};
use lcr_room::RoomError;
use lcr_session::SessionError;
use lcr_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum LcrError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame that could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Connection bookkeeping or a seat claim went wrong.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room was missing or refused the command.
    #[error(transparent)]
    Room(#[from] RoomError),
}

impl LcrError {
    /// The wire code reported to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Transport(_) => ErrorCode::IllegalState,
            Self::Protocol(_) => ErrorCode::InvalidMessage,
            Self::Session(err) => err.code(),
            Self::Room(err) => err.code(),
        }
    }

    /// Whether the client should hear about it. Turn-protocol violations
    /// are logged and dropped.
    pub fn is_reported(&self) -> bool {
        !matches!(self, Self::Room(err) if err.is_illegal_state())
    }
}
