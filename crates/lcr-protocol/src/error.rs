//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the bytes or fields on the wire were
//! wrong. Nothing in here knows about rooms or seats.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown `event` tag,
    /// missing fields, or a field that failed its own validation (such as
    /// a room code of the wrong shape).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A room code that is not six base-36 characters.
    #[error("invalid room code {0:?}")]
    InvalidRoomCode(String),
}
