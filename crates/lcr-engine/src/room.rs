//! The table: seats, turn, pot and phase.

use lcr_protocol::{
    ConnectionId, Face, Phase, Recipient, RoomCode, SEAT_COUNT, SeatIndex,
    ServerEvent,
};

use crate::Outbox;
use crate::seat::{DEFAULT_MAX_NAME_LEN, Player};

/// Chips every player starts a game with.
pub const STARTING_CHIPS: u32 = 3;

/// Most dice a player ever rolls.
pub const MAX_DICE: u32 = 3;

/// Dot faces only top a player up to this many chips.
pub const DOT_CAP: u32 = 3;

/// A roll that is waiting for the roller's wild decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRoll {
    pub id: u64,
    pub seat: SeatIndex,
    pub outcomes: Vec<Face>,
}

impl PendingRoll {
    /// Number of Wild faces in the roll.
    pub fn wilds(&self) -> usize {
        self.outcomes.iter().filter(|f| **f == Face::Wild).count()
    }

    /// Three dice, all Wild.
    pub fn is_triple_wild(&self) -> bool {
        self.outcomes.len() == MAX_DICE as usize && self.wilds() == self.outcomes.len()
    }
}

/// One game table.
///
/// Chips are conserved by every roll and decision: the sum of all seats'
/// chips plus the center pot only changes when a player sits down, stands
/// up, or the table is reset.
#[derive(Debug, Clone)]
pub struct Room {
    pub(crate) code: RoomCode,
    pub(crate) seats: [Option<Player>; SEAT_COUNT],
    pub(crate) current_seat: Option<SeatIndex>,
    pub(crate) center_pot: u32,
    pub(crate) phase: Phase,
    pub(crate) pending_roll: Option<PendingRoll>,
    pub(crate) next_roll_id: u64,
    pub(crate) max_name_len: usize,
}

impl Room {
    pub fn new(code: RoomCode) -> Self {
        Self {
            code,
            seats: Default::default(),
            current_seat: None,
            center_pot: 0,
            phase: Phase::Waiting,
            pending_roll: None,
            next_roll_id: 1,
            max_name_len: DEFAULT_MAX_NAME_LEN,
        }
    }

    /// Caps display names at `max` characters.
    pub fn with_max_name_len(mut self, max: usize) -> Self {
        self.max_name_len = max.max(1);
        self
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn center_pot(&self) -> u32 {
        self.center_pot
    }

    /// Whose turn it is. Only `Some` while playing.
    pub fn current_seat(&self) -> Option<SeatIndex> {
        self.current_seat
    }

    pub fn pending_roll(&self) -> Option<&PendingRoll> {
        self.pending_roll.as_ref()
    }

    /// The player in `seat`, if any. Out-of-range seats are simply empty.
    pub fn seat(&self, seat: SeatIndex) -> Option<&Player> {
        self.seats.get(seat).and_then(Option::as_ref)
    }

    /// Occupied seats in seat order.
    pub fn players(&self) -> impl Iterator<Item = (SeatIndex, &Player)> {
        self.seats
            .iter()
            .enumerate()
            .filter_map(|(seat, p)| p.as_ref().map(|p| (seat, p)))
    }

    pub fn seated_count(&self) -> usize {
        self.seats.iter().flatten().count()
    }

    /// The seat held by `conn`, if it holds one.
    pub fn seat_of(&self, conn: ConnectionId) -> Option<SeatIndex> {
        self.players()
            .find(|(_, p)| p.connection == Some(conn))
            .map(|(seat, _)| seat)
    }

    /// Seats whose player has dropped and not yet come back.
    pub fn detached_seats(&self) -> impl Iterator<Item = SeatIndex> + '_ {
        self.players()
            .filter(|(_, p)| p.connection.is_none())
            .map(|(seat, _)| seat)
    }

    /// Chips on the table, including the pot.
    pub fn total_chips(&self) -> u32 {
        self.players().map(|(_, p)| p.chips).sum::<u32>() + self.center_pot
    }

    /// Starts over: every seated player gets [`STARTING_CHIPS`] and clean
    /// flags, the pot empties and any pending roll is dropped.
    ///
    /// A full table goes straight to `Playing` with seat 0 to move;
    /// otherwise the table waits for the remaining seats.
    pub fn reset_game(&mut self) -> Outbox {
        for player in self.seats.iter_mut().flatten() {
            player.chips = STARTING_CHIPS;
            player.eliminated = false;
            player.danger = false;
        }
        self.center_pot = 0;
        self.pending_roll = None;

        if self.seated_count() == SEAT_COUNT {
            self.phase = Phase::Playing;
            self.current_seat = Some(0);
        } else {
            self.phase = Phase::Waiting;
            self.current_seat = None;
        }
        tracing::info!(room = %self.code, phase = %self.phase, "game reset");

        let mut out = vec![(Recipient::Room, ServerEvent::ResetGame)];
        self.broadcast_state(&mut out);
        out
    }

    pub(crate) fn name_of(&self, seat: SeatIndex) -> String {
        self.seat(seat)
            .map_or_else(|| format!("Seat {}", seat + 1), |p| p.name.clone())
    }

    pub(crate) fn chips_of(&self, seat: SeatIndex) -> u32 {
        self.seat(seat).map_or(0, |p| p.chips)
    }

    /// Back to an empty lobby once the last player is gone.
    pub(crate) fn return_to_lobby(&mut self) {
        self.phase = Phase::Waiting;
        self.current_seat = None;
        self.center_pot = 0;
        self.pending_roll = None;
        tracing::debug!(room = %self.code, "table empty, back to waiting");
    }
}
