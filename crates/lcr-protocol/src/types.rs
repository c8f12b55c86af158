//! Core protocol types for the LCR wire format.
//!
//! Every message is a JSON object with an `event` name and an optional
//! `data` payload:
//!
//! ```text
//! { "event": "resolveWilds", "data": { "code": "K3Z9QA", "actions": [ ... ] } }
//! ```
//!
//! Event names and field names are camelCase because the clients are
//! written in JavaScript. Values that only the server interprets (room
//! codes, faces, phases) are validated while decoding so a handler never
//! sees a malformed one.

use std::fmt;

use lcr_transport::ConnectionId;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Seats
// ---------------------------------------------------------------------------

/// Number of seats at every table. Fixed by the game.
pub const SEAT_COUNT: usize = 4;

/// Index of a seat, `0..SEAT_COUNT`, clockwise.
pub type SeatIndex = usize;

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// Length of a room code.
pub const ROOM_CODE_LEN: usize = 6;

/// Characters a room code is drawn from (upper-case base-36).
pub const ROOM_CODE_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// The short code players type to find a room, e.g. `K3Z9QA`.
///
/// A newtype rather than a bare `String` so a code can only exist once it
/// has been validated. Deserialization goes through [`RoomCode::parse`]
/// (`#[serde(try_from = "String")]`), which accepts lower-case input and
/// normalizes it, so `"k3z9qa"` and `"K3Z9QA"` name the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Validates and normalizes a code typed by a player.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidRoomCode`] unless the input is exactly
    /// [`ROOM_CODE_LEN`] ASCII letters or digits.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let code = raw.trim().to_ascii_uppercase();
        let well_formed = code.len() == ROOM_CODE_LEN
            && code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b));
        if !well_formed {
            return Err(ProtocolError::InvalidRoomCode(raw.to_string()));
        }
        Ok(Self(code))
    }

    /// The normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Game vocabulary
// ---------------------------------------------------------------------------

/// One face of a die.
///
/// Serialized with the variant name as-is (`"Dot"`, `"Left"`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Face {
    /// Keep the chip; grants a chip while the roller holds fewer than three.
    Dot,
    /// Pass a chip to the next active seat clockwise.
    Left,
    /// Pass a chip to the next active seat counter-clockwise.
    Right,
    /// Put a chip in the center pot.
    Hub,
    /// Defer to a player decision (cancel a face or steal a chip).
    Wild,
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dot => "Dot",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Hub => "Hub",
            Self::Wild => "Wild",
        };
        f.write_str(name)
    }
}

/// Lifecycle of a table.
///
/// ```text
/// Waiting ──(4th seat filled)──→ Playing ──(one holder left)──→ Finished
///    ↑                                                              │
///    └──────────────────────────(resetGame)─────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    /// Seats are filling up; no turns yet.
    #[default]
    Waiting,
    /// Turns are being played.
    Playing,
    /// Someone won (or nobody could); waiting for a reset.
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Waiting => "Waiting",
            Self::Playing => "Playing",
            Self::Finished => "Finished",
        };
        f.write_str(name)
    }
}

/// What a player does with one Wild face of their pending roll.
///
/// Internally tagged by `kind`:
///
/// ```text
/// { "kind": "cancel", "targetFace": "Hub" }
/// { "kind": "steal",  "fromSeat": 2 }
/// ```
///
/// Older clients send `target` instead of `targetFace`; both are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WildAction {
    /// Cancel the first not-yet-canceled outcome showing this face.
    Cancel {
        #[serde(alias = "target")]
        target_face: Face,
    },
    /// Take one chip from another seat.
    Steal { from_seat: SeatIndex },
}

/// The decision after rolling three Wilds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TripleWildChoice {
    /// Take everything in the center pot.
    TakePot,
    /// Take one chip from each other seat, up to three.
    Steal3,
}

/// One end of a chip transfer.
///
/// ```text
/// { "seat": 2 }   or   "pot"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChipHolder {
    Seat(SeatIndex),
    Pot,
}

/// Machine-readable reason carried by [`ServerEvent::ErrorMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The frame could not be decoded or a field was malformed.
    InvalidMessage,
    /// No live room has that code.
    RoomNotFound,
    /// Every seat is taken.
    RoomFull,
    /// This connection already holds a seat in the room.
    AlreadySeated,
    /// The connection is not seated in the room it addressed.
    NotSeated,
    /// The command is not legal in the room's current state.
    IllegalState,
    /// A reconnect claim was unknown, expired, or no longer matches a seat.
    ClaimRejected,
}

// ---------------------------------------------------------------------------
// StateSnapshot
// ---------------------------------------------------------------------------

/// The canonical, full picture of a table that every client renders from.
///
/// Per-seat arrays are always [`SEAT_COUNT`] long; an empty seat shows
/// `null` for its name, avatar and color, `0` chips and `false` flags.
/// `currentSeat` is only set while the phase is `Playing`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub players: [Option<String>; SEAT_COUNT],
    pub chips: [u32; SEAT_COUNT],
    pub avatars: [Option<String>; SEAT_COUNT],
    pub colors: [Option<String>; SEAT_COUNT],
    pub eliminated: [bool; SEAT_COUNT],
    pub danger: [bool; SEAT_COUNT],
    /// `false` for empty seats and for seats whose connection dropped and
    /// are waiting out the reconnect grace period.
    pub connected: [bool; SEAT_COUNT],
    pub center_pot: u32,
    pub current_seat: Option<SeatIndex>,
    pub phase: Phase,
    pub game_started: bool,
}

// ---------------------------------------------------------------------------
// ClientCommand
// ---------------------------------------------------------------------------

/// Everything a client can ask of the server.
///
/// `#[serde(tag = "event", content = "data")]` produces adjacently tagged
/// JSON; commands without a payload omit `data` entirely:
///
/// ```text
/// { "event": "createRoom" }
/// { "event": "rollDice", "data": { "code": "K3Z9QA" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientCommand {
    /// Open a fresh room.
    CreateRoom,
    /// Watch a room: receive its broadcasts without taking a seat.
    JoinRoom { code: RoomCode },
    /// Sit down at the lowest free seat.
    JoinSeat {
        code: RoomCode,
        name: String,
        #[serde(default)]
        avatar: String,
        #[serde(default)]
        color: String,
    },
    /// Stand up and give the seat back.
    LeaveSeat { code: RoomCode },
    /// Take back a seat after a dropped connection.
    ReclaimSeat { claim: String },
    /// Roll for the current turn.
    RollDice { code: RoomCode },
    /// Decide what the Wild faces of the pending roll do.
    ResolveWilds {
        code: RoomCode,
        #[serde(default)]
        actions: Vec<WildAction>,
    },
    /// Decide what a triple-Wild roll does.
    TripleWildChoice { code: RoomCode, choice: TripleWildChoice },
    /// Start over with everyone at three chips.
    ResetGame { code: RoomCode },
    /// Keep-alive.
    Ping,
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// Everything the server can tell a client.
///
/// Same adjacently tagged shape as [`ClientCommand`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// A room was opened for the requester.
    RoomCreated { code: RoomCode },

    /// The requester now receives this room's broadcasts.
    RoomJoined {
        code: RoomCode,
        players: [Option<String>; SEAT_COUNT],
        seated_count: usize,
    },

    /// The requester holds `seat`. `claim` is the secret that lets them
    /// take it back after a dropped connection.
    JoinedRoom {
        code: RoomCode,
        seat: SeatIndex,
        claim: String,
    },

    /// Canonical state after any observable change.
    StateUpdate(StateSnapshot),

    /// Faces rolled by `seat`, in roll order.
    RollResult {
        seat: SeatIndex,
        roll_id: u64,
        outcomes: Vec<Face>,
    },

    /// Dot faces added chips to `seat`.
    ChipsGained { seat: SeatIndex, amount: u32 },

    /// Chips moved between two holders.
    ChipTransfer {
        from: ChipHolder,
        to: ChipHolder,
        amount: u32,
    },

    /// Human-readable line for the table log.
    HistoryEntry { text: String },

    /// Sent only to the roller: their roll is waiting for wild decisions.
    RequestWildChoice {
        seat: SeatIndex,
        roll_id: u64,
        outcomes: Vec<Face>,
        wilds: usize,
    },

    /// Sent only to the roller: three Wilds, take the pot or steal three.
    RequestTripleWildChoice { seat: SeatIndex, roll_id: u64 },

    /// The game ended. `winner_seat` is `None` only when nobody held chips.
    GameOver {
        winner_seat: Option<SeatIndex>,
        winner_name: Option<String>,
        pot: u32,
    },

    /// The table was reset; a fresh `stateUpdate` follows.
    ResetGame,

    /// A command failed.
    ErrorMessage { code: ErrorCode, message: String },

    /// Keep-alive reply.
    Pong,
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Where a [`ServerEvent`] goes.
///
/// The engine tags every event it produces with a `Recipient`; the room
/// actor turns that into a multicast over the room's subscribers or a
/// unicast to one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every connection subscribed to the room.
    Room,
    /// One specific connection.
    Connection(ConnectionId),
}

// =========================================================================
// Tests
// =========================================================================
