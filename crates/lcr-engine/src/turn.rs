//! Seat order.
//!
//! Seats run clockwise `0 → 1 → 2 → 3 → 0`. "Active" means occupied and
//! not eliminated. Both scans look at most [`SEAT_COUNT`] seats and fall
//! back to the starting seat when no other seat is active.

use lcr_protocol::{SEAT_COUNT, SeatIndex};

use crate::Player;

fn is_active(seats: &[Option<Player>; SEAT_COUNT], seat: SeatIndex) -> bool {
    seats[seat].as_ref().is_some_and(|p| !p.eliminated)
}

/// The nearest active seat clockwise from `from`, or `from` itself.
pub fn next_seat(seats: &[Option<Player>; SEAT_COUNT], from: SeatIndex) -> SeatIndex {
    (1..=SEAT_COUNT)
        .map(|step| (from + step) % SEAT_COUNT)
        .find(|&seat| is_active(seats, seat))
        .unwrap_or(from)
}

/// The nearest active seat counter-clockwise from `from`, or `from` itself.
pub fn previous_seat(seats: &[Option<Player>; SEAT_COUNT], from: SeatIndex) -> SeatIndex {
    (1..=SEAT_COUNT)
        .map(|step| (from + SEAT_COUNT - step % SEAT_COUNT) % SEAT_COUNT)
        .find(|&seat| is_active(seats, seat))
        .unwrap_or(from)
}
