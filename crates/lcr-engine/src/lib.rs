//! The game session engine.
//!
//! A [`Room`] is plain data plus the rules that mutate it. Every operation
//! checks all of its preconditions before touching anything and then runs
//! to completion, returning the events the change produced as an
//! [`Outbox`]. Nothing here blocks, sleeps or does I/O: a roll that needs a
//! player's decision is parked in [`Room::pending_roll`] and resumed by
//! [`Room::resolve_wilds`] or [`Room::triple_wild_choice`].
//!
//! # Key types
//!
//! - [`Room`]: seats, turn, pot, phase and the pending roll
//! - [`Player`]: one occupied seat
//! - [`FaceSource`]: where dice faces come from ([`RandomFaces`], [`ScriptedFaces`])
//! - [`EngineError`]: why a command was refused (nothing changed)

mod dice;
mod elimination;
mod error;
mod roll;
mod room;
mod seat;
mod snapshot;
mod turn;
mod wild;

pub use dice::{FACE_TABLE, FaceSource, RandomFaces, ScriptedFaces};
pub use error::EngineError;
pub use room::{DOT_CAP, MAX_DICE, PendingRoll, Room, STARTING_CHIPS};
pub use seat::{DEFAULT_MAX_NAME_LEN, Player, SeatProfile};
pub use turn::{next_seat, previous_seat};

use lcr_protocol::{Recipient, ServerEvent};

/// Events produced by one engine operation, in emission order.
pub type Outbox = Vec<(Recipient, ServerEvent)>;
