//! Wire protocol for the LCR game server.
//!
//! This crate defines the "language" that browser clients and the server
//! speak:
//!
//! - **Types** ([`ClientCommand`], [`ServerEvent`], [`StateSnapshot`], …):
//!   every command a client may send and every event the server emits.
//! - **Game vocabulary** ([`Face`], [`Phase`], [`WildAction`], …):
//!   values those messages carry, shared with the game engine.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Transport (frames) → Protocol (ClientCommand / ServerEvent) → Room actor → Engine
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ChipHolder, ClientCommand, ErrorCode, Face, Phase, Recipient, RoomCode,
    SeatIndex, ServerEvent, StateSnapshot, TripleWildChoice, WildAction,
    ROOM_CODE_ALPHABET, ROOM_CODE_LEN, SEAT_COUNT,
};

/// Connection handles are defined by the transport; re-exported so callers
/// that only speak protocol don't need a direct transport dependency.
pub use lcr_transport::ConnectionId;
