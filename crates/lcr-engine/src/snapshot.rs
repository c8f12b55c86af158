//! What clients get to see.

use lcr_protocol::{Phase, Recipient, ServerEvent, StateSnapshot};

use crate::{Outbox, Room};

impl Room {
    /// The full public state of the table. Claims are never included.
    pub fn snapshot(&self) -> StateSnapshot {
        let mut snap = StateSnapshot {
            center_pot: self.center_pot,
            current_seat: self.current_seat.filter(|_| self.phase == Phase::Playing),
            phase: self.phase,
            game_started: self.phase != Phase::Waiting,
            ..StateSnapshot::default()
        };
        for (seat, player) in self.players() {
            snap.players[seat] = Some(player.name.clone());
            snap.avatars[seat] = Some(player.avatar.clone());
            snap.colors[seat] = Some(player.color.clone());
            snap.chips[seat] = player.chips;
            snap.eliminated[seat] = player.eliminated;
            snap.danger[seat] = player.danger;
            snap.connected[seat] = player.connection.is_some();
        }
        snap
    }

    /// The lobby view sent to a connection that starts watching.
    pub fn lobby_view(&self) -> ServerEvent {
        ServerEvent::RoomJoined {
            code: self.code.clone(),
            players: std::array::from_fn(|seat| self.seat(seat).map(|p| p.name.clone())),
            seated_count: self.seated_count(),
        }
    }

    pub(crate) fn broadcast_state(&self, out: &mut Outbox) {
        out.push((Recipient::Room, ServerEvent::StateUpdate(self.snapshot())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{full_room, set_chips};
    use lcr_protocol::{RoomCode, SEAT_COUNT};

    #[test]
    fn test_snapshot_empty_room_has_nulls() {
        let room = Room::new(RoomCode::parse("EMPTY0").unwrap());
        let snap = room.snapshot();
        assert_eq!(snap.players, [None, None, None, None]);
        assert_eq!(snap.chips, [0; SEAT_COUNT]);
        assert!(!snap.game_started);
        assert_eq!(snap.current_seat, None);
    }

    #[test]
    fn test_snapshot_reflects_table() {
        let mut room = full_room();
        set_chips(&mut room, [1, 2, 3, 4]);
        room.center_pot = 2;

        let snap = room.snapshot();

        assert_eq!(snap.players[1].as_deref(), Some("Bo"));
        assert_eq!(snap.avatars[1].as_deref(), Some("Bo.png"));
        assert_eq!(snap.chips, [1, 2, 3, 4]);
        assert_eq!(snap.center_pot, 2);
        assert_eq!(snap.current_seat, Some(0));
        assert_eq!(snap.phase, Phase::Playing);
        assert!(snap.game_started);
        assert_eq!(snap.connected, [true; SEAT_COUNT]);
    }

    #[test]
    fn test_snapshot_hides_current_seat_when_finished() {
        let mut room = full_room();
        room.phase = Phase::Finished;
        assert_eq!(room.snapshot().current_seat, None);
    }

    #[test]
    fn test_lobby_view_lists_names() {
        let mut room = full_room();
        room.seats[3] = None;
        let ServerEvent::RoomJoined {
            players,
            seated_count,
            ..
        } = room.lobby_view()
        else {
            panic!("expected roomJoined");
        };
        assert_eq!(seated_count, 3);
        assert_eq!(players[0].as_deref(), Some("Ada"));
        assert_eq!(players[3], None);
    }
}
