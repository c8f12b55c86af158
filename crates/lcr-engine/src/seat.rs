//! Sitting down, standing up, and dropping out temporarily.
//!
//! A seat is bound to the connection that currently speaks for it. When
//! that connection drops the seat is *detached*: the player keeps their
//! chips and turn position while the claim secret handed out in
//! `joinedRoom` can bring a new connection back in. Expiring a detached
//! seat vacates it exactly like leaving.

use lcr_protocol::{ConnectionId, Phase, Recipient, SEAT_COUNT, SeatIndex, ServerEvent};

use crate::room::{Room, STARTING_CHIPS};
use crate::turn::next_seat;
use crate::{EngineError, Outbox};

/// Default cap on display names, in characters.
pub const DEFAULT_MAX_NAME_LEN: usize = 16;

/// Cosmetic strings (avatar, color) are cut to this many characters.
const MAX_COSMETIC_LEN: usize = 64;

/// What a player asks to be shown as.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeatProfile {
    pub name: String,
    pub avatar: String,
    pub color: String,
}

/// An occupied seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub avatar: String,
    pub color: String,
    /// `None` while detached.
    pub connection: Option<ConnectionId>,
    /// Secret that lets a new connection take this seat back.
    pub claim: String,
    pub chips: u32,
    pub eliminated: bool,
    /// Ended their last turn with zero chips; one more and they are out.
    pub danger: bool,
}

impl Room {
    /// Seats `conn` at the lowest free seat.
    ///
    /// Filling the fourth seat of a waiting table starts the game with
    /// seat 0 to move. Joining a table that is already playing or finished
    /// takes the seat with [`STARTING_CHIPS`] and leaves the phase alone.
    ///
    /// # Errors
    /// [`EngineError::AlreadySeated`] if `conn` already holds a seat here,
    /// [`EngineError::RoomFull`] if no seat is free.
    pub fn join_seat(
        &mut self,
        profile: SeatProfile,
        conn: ConnectionId,
        claim: String,
    ) -> Result<(SeatIndex, Outbox), EngineError> {
        if let Some(seat) = self.seat_of(conn) {
            return Err(EngineError::AlreadySeated(conn, seat));
        }
        let seat = self
            .seats
            .iter()
            .position(Option::is_none)
            .ok_or(EngineError::RoomFull)?;

        let name = match truncate(&profile.name, self.max_name_len) {
            name if name.is_empty() => format!("Player {}", seat + 1),
            name => name,
        };
        tracing::info!(room = %self.code, seat, %conn, %name, "seat taken");

        self.seats[seat] = Some(Player {
            name,
            avatar: truncate(&profile.avatar, MAX_COSMETIC_LEN),
            color: truncate(&profile.color, MAX_COSMETIC_LEN),
            connection: Some(conn),
            claim: claim.clone(),
            chips: STARTING_CHIPS,
            eliminated: false,
            danger: false,
        });

        let mut out = vec![(
            Recipient::Connection(conn),
            ServerEvent::JoinedRoom {
                code: self.code.clone(),
                seat,
                claim,
            },
        )];

        if self.phase == Phase::Waiting && self.seated_count() == SEAT_COUNT {
            self.phase = Phase::Playing;
            self.current_seat = Some(0);
            tracing::info!(room = %self.code, "table full, game started");
        }
        self.broadcast_state(&mut out);
        Ok((seat, out))
    }

    /// Gives up the seat held by `conn`.
    ///
    /// # Errors
    /// [`EngineError::NotSeated`] if `conn` holds no seat here.
    pub fn leave_seat(&mut self, conn: ConnectionId) -> Result<Outbox, EngineError> {
        let seat = self.seat_of(conn).ok_or(EngineError::NotSeated(conn))?;
        Ok(self.vacate(seat))
    }

    /// Marks the seat held by `conn` as detached.
    ///
    /// Returns `None` when `conn` was only watching.
    pub fn detach(&mut self, conn: ConnectionId) -> Option<(SeatIndex, Outbox)> {
        let seat = self.seat_of(conn)?;
        if let Some(player) = self.seats[seat].as_mut() {
            player.connection = None;
        }
        tracing::info!(room = %self.code, seat, %conn, "seat detached");

        let mut out = Outbox::new();
        self.broadcast_state(&mut out);
        Some((seat, out))
    }

    /// Binds `conn` to a detached seat whose claim matches.
    ///
    /// The reattached player gets `joinedRoom` again and, if their roll was
    /// waiting on a decision, the decision request again.
    ///
    /// # Errors
    /// [`EngineError::AlreadySeated`] if `conn` already holds a seat here;
    /// [`EngineError::ClaimRejected`] if the seat is empty, still attached,
    /// or was claimed with a different secret.
    pub fn reattach(
        &mut self,
        seat: SeatIndex,
        claim: &str,
        conn: ConnectionId,
    ) -> Result<Outbox, EngineError> {
        if let Some(held) = self.seat_of(conn) {
            return Err(EngineError::AlreadySeated(conn, held));
        }
        let player = self
            .seats
            .get_mut(seat)
            .and_then(Option::as_mut)
            .filter(|p| p.connection.is_none() && p.claim == claim)
            .ok_or(EngineError::ClaimRejected(seat))?;
        player.connection = Some(conn);
        let claim = player.claim.clone();
        tracing::info!(room = %self.code, seat, %conn, "seat reclaimed");

        let mut out = vec![(
            Recipient::Connection(conn),
            ServerEvent::JoinedRoom {
                code: self.code.clone(),
                seat,
                claim,
            },
        )];
        if let Some(request) = self.decision_request(seat) {
            out.push((Recipient::Connection(conn), request));
        }
        self.broadcast_state(&mut out);
        Ok(out)
    }

    /// Vacates `seat` if it is still detached.
    ///
    /// Returns `None` if the player came back (or left) in the meantime.
    pub fn expire_detached(&mut self, seat: SeatIndex) -> Option<Outbox> {
        let detached = self.seat(seat).is_some_and(|p| p.connection.is_none());
        if !detached {
            return None;
        }
        tracing::info!(room = %self.code, seat, "reconnect grace expired");
        Some(self.vacate(seat))
    }

    /// Empties `seat`. The player's chips leave the table with them.
    ///
    /// Mid-game this drops their pending roll, ends the game if at most one
    /// chip holder remains, and passes the turn on if it was theirs.
    fn vacate(&mut self, seat: SeatIndex) -> Outbox {
        let mut out = Outbox::new();
        let Some(player) = self.seats[seat].take() else {
            return out;
        };
        tracing::info!(room = %self.code, seat, name = %player.name, chips = player.chips, "seat vacated");

        if self.pending_roll.as_ref().is_some_and(|r| r.seat == seat) {
            self.pending_roll = None;
        }

        if self.seated_count() == 0 {
            self.return_to_lobby();
        } else if self.phase == Phase::Playing
            && !self.check_for_winner(&mut out)
            && self.current_seat == Some(seat)
        {
            let next = next_seat(&self.seats, seat);
            self.current_seat = self.seats[next].is_some().then_some(next);
        }

        self.broadcast_state(&mut out);
        out
    }
}

fn truncate(raw: &str, max: usize) -> String {
    raw.trim().chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{conn, events, full_room, profile, set_chips};
    use crate::PendingRoll;
    use lcr_protocol::{Face, RoomCode};

    fn empty_room() -> Room {
        Room::new(RoomCode::parse("SEATS1").unwrap())
    }

    #[test]
    fn test_join_seat_takes_lowest_free_seat() {
        let mut room = full_room();
        room.seats[1] = None;

        let (seat, _) = room
            .join_seat(profile("Eve"), ConnectionId::new(99), "c".into())
            .unwrap();

        assert_eq!(seat, 1);
        assert_eq!(room.seat(1).unwrap().chips, STARTING_CHIPS);
    }

    #[test]
    fn test_join_seat_sends_claim_only_to_joiner() {
        let mut room = empty_room();
        let (seat, out) = room
            .join_seat(profile("Ada"), conn(0), "secret".into())
            .unwrap();

        assert_eq!(seat, 0);
        assert_eq!(
            out[0],
            (
                Recipient::Connection(conn(0)),
                ServerEvent::JoinedRoom {
                    code: room.code().clone(),
                    seat: 0,
                    claim: "secret".into(),
                }
            )
        );
        assert_eq!(out[1].0, Recipient::Room);
        assert!(matches!(out[1].1, ServerEvent::StateUpdate(_)));
    }

    #[test]
    fn test_join_seat_fourth_player_starts_game() {
        let mut room = empty_room();
        for seat in 0..3 {
            room.join_seat(profile("p"), conn(seat), String::new()).unwrap();
            assert_eq!(room.phase(), Phase::Waiting);
        }
        room.join_seat(profile("p"), conn(3), String::new()).unwrap();

        assert_eq!(room.phase(), Phase::Playing);
        assert_eq!(room.current_seat(), Some(0));
        assert_eq!(room.total_chips(), 12);
    }

    #[test]
    fn test_join_seat_full_room_returns_room_full() {
        let mut room = full_room();
        let err = room
            .join_seat(profile("Eve"), ConnectionId::new(99), String::new())
            .unwrap_err();
        assert_eq!(err, EngineError::RoomFull);
    }

    #[test]
    fn test_join_seat_twice_returns_already_seated() {
        let mut room = empty_room();
        room.join_seat(profile("Ada"), conn(0), String::new()).unwrap();
        let err = room
            .join_seat(profile("Ada"), conn(0), String::new())
            .unwrap_err();
        assert_eq!(err, EngineError::AlreadySeated(conn(0), 0));
        assert_eq!(room.seated_count(), 1);
    }

    #[test]
    fn test_join_seat_truncates_and_defaults_names() {
        let mut room = empty_room();
        room.join_seat(profile("Bartholomew the Magnificent"), conn(0), String::new())
            .unwrap();
        room.join_seat(profile("   "), conn(1), String::new()).unwrap();

        assert_eq!(room.seat(0).unwrap().name, "Bartholomew the ");
        assert_eq!(room.seat(1).unwrap().name, "Player 2");
    }

    #[test]
    fn test_join_seat_mid_game_keeps_phase() {
        let mut room = full_room();
        room.seats[2] = None;

        room.join_seat(profile("Eve"), ConnectionId::new(99), String::new())
            .unwrap();

        assert_eq!(room.phase(), Phase::Playing);
        assert_eq!(room.current_seat(), Some(0));
    }

    #[test]
    fn test_leave_seat_not_seated_errors() {
        let mut room = empty_room();
        let err = room.leave_seat(conn(0)).unwrap_err();
        assert_eq!(err, EngineError::NotSeated(conn(0)));
    }

    #[test]
    fn test_leave_seat_on_turn_passes_turn() {
        let mut room = full_room();
        room.leave_seat(conn(0)).unwrap();

        assert!(room.seat(0).is_none());
        assert_eq!(room.phase(), Phase::Playing);
        assert_eq!(room.current_seat(), Some(1));
    }

    #[test]
    fn test_leave_seat_drops_leavers_pending_roll() {
        let mut room = full_room();
        room.pending_roll = Some(PendingRoll {
            id: 1,
            seat: 0,
            outcomes: vec![Face::Wild],
        });
        room.leave_seat(conn(0)).unwrap();
        assert!(room.pending_roll().is_none());
    }

    #[test]
    fn test_leave_seat_last_holder_wins() {
        let mut room = full_room();
        set_chips(&mut room, [2, 3, 0, 0]);
        room.center_pot = 7;

        let out = room.leave_seat(conn(1)).unwrap();

        assert_eq!(room.phase(), Phase::Finished);
        assert_eq!(room.current_seat(), None);
        assert_eq!(room.seat(0).unwrap().chips, 9);
        assert!(events(&out).contains(&&ServerEvent::GameOver {
            winner_seat: Some(0),
            winner_name: Some("Ada".into()),
            pot: 7,
        }));
    }

    #[test]
    fn test_leave_seat_last_player_resets_to_lobby() {
        let mut room = empty_room();
        room.join_seat(profile("Ada"), conn(0), String::new()).unwrap();
        room.center_pot = 2;

        room.leave_seat(conn(0)).unwrap();

        assert_eq!(room.seated_count(), 0);
        assert_eq!(room.phase(), Phase::Waiting);
        assert_eq!(room.center_pot(), 0);
    }

    #[test]
    fn test_detach_keeps_seat_and_chips() {
        let mut room = full_room();
        let (seat, out) = room.detach(conn(2)).unwrap();

        assert_eq!(seat, 2);
        let player = room.seat(2).unwrap();
        assert_eq!(player.connection, None);
        assert_eq!(player.chips, STARTING_CHIPS);
        let ServerEvent::StateUpdate(snapshot) = &out[0].1 else {
            panic!("expected a state update");
        };
        assert!(!snapshot.connected[2]);
        assert!(snapshot.connected[0]);
    }

    #[test]
    fn test_detach_watcher_is_noop() {
        let mut room = full_room();
        assert!(room.detach(ConnectionId::new(99)).is_none());
    }

    #[test]
    fn test_reattach_with_matching_claim_restores_seat() {
        let mut room = full_room();
        room.detach(conn(1));
        let new_conn = ConnectionId::new(50);

        let out = room.reattach(1, "claim-1", new_conn).unwrap();

        assert_eq!(room.seat_of(new_conn), Some(1));
        assert_eq!(out[0].0, Recipient::Connection(new_conn));
        assert!(matches!(out[0].1, ServerEvent::JoinedRoom { seat: 1, .. }));
    }

    #[test]
    fn test_reattach_resends_pending_wild_request() {
        let mut room = full_room();
        room.pending_roll = Some(PendingRoll {
            id: 4,
            seat: 0,
            outcomes: vec![Face::Wild, Face::Hub],
        });
        room.detach(conn(0));
        let new_conn = ConnectionId::new(50);

        let out = room.reattach(0, "claim-0", new_conn).unwrap();

        assert!(out.contains(&(
            Recipient::Connection(new_conn),
            ServerEvent::RequestWildChoice {
                seat: 0,
                roll_id: 4,
                outcomes: vec![Face::Wild, Face::Hub],
                wilds: 1,
            }
        )));
    }

    #[test]
    fn test_reattach_rejects_wrong_claim_or_attached_seat() {
        let mut room = full_room();
        // still attached
        assert_eq!(
            room.reattach(1, "claim-1", ConnectionId::new(50)),
            Err(EngineError::ClaimRejected(1))
        );
        room.detach(conn(1));
        assert_eq!(
            room.reattach(1, "claim-2", ConnectionId::new(50)),
            Err(EngineError::ClaimRejected(1))
        );
        assert_eq!(
            room.reattach(9, "claim-1", ConnectionId::new(50)),
            Err(EngineError::ClaimRejected(9))
        );
        assert_eq!(room.seat(1).unwrap().connection, None);
    }

    #[test]
    fn test_expire_detached_vacates_seat() {
        let mut room = full_room();
        room.detach(conn(3));

        let out = room.expire_detached(3).unwrap();

        assert!(room.seat(3).is_none());
        assert!(!out.is_empty());
    }

    #[test]
    fn test_expire_detached_after_reattach_is_noop() {
        let mut room = full_room();
        room.detach(conn(3));
        room.reattach(3, "claim-3", ConnectionId::new(70)).unwrap();

        assert!(room.expire_detached(3).is_none());
        assert!(room.seat(3).is_some());
    }
}
