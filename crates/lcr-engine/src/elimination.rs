//! End of turn: danger, elimination and the win check.
//!
//! A player who ends a turn with no chips is put in danger. Ending the
//! next turn of theirs still empty-handed eliminates them; holding chips
//! again clears the danger. The game ends as soon as at most one seated
//! player holds chips.

use lcr_protocol::{ChipHolder, Phase, Recipient, SeatIndex, ServerEvent};

use crate::turn::next_seat;
use crate::{Outbox, Room};

impl Room {
    /// Closes `seat`'s turn and hands it to the next active seat, unless
    /// the game just ended.
    pub(crate) fn finalize_turn(&mut self, seat: SeatIndex, out: &mut Outbox) {
        let mut note = None;
        if let Some(player) = self.seats[seat].as_mut() {
            if player.chips > 0 {
                player.danger = false;
            } else if player.danger {
                player.danger = false;
                player.eliminated = true;
                note = Some(format!("{} is out of the game", player.name));
            } else {
                player.danger = true;
                note = Some(format!("{} has no chips left, last chance", player.name));
            }
        }
        if let Some(text) = note {
            tracing::debug!(room = %self.code, seat, "{text}");
            out.push((Recipient::Room, ServerEvent::HistoryEntry { text }));
        }

        if !self.check_for_winner(out) {
            self.current_seat = Some(next_seat(&self.seats, seat));
        }
        self.broadcast_state(out);
    }

    /// Ends the game if at most one seated player holds chips.
    ///
    /// A lone holder wins and collects the pot. If nobody holds chips the
    /// game ends without a winner and the pot stays where it is until the
    /// table is reset. Returns whether the game ended.
    pub(crate) fn check_for_winner(&mut self, out: &mut Outbox) -> bool {
        let holders: Vec<SeatIndex> = self
            .players()
            .filter(|(_, p)| p.chips > 0)
            .map(|(seat, _)| seat)
            .collect();
        let winner = match holders.as_slice() {
            [seat] => Some(*seat),
            [] => None,
            _ => return false,
        };

        self.phase = Phase::Finished;
        self.current_seat = None;
        self.pending_roll = None;

        let event = match winner {
            Some(seat) => {
                let pot = self.center_pot;
                if pot > 0 {
                    self.transfer(ChipHolder::Pot, ChipHolder::Seat(seat), pot, out);
                }
                let name = self.name_of(seat);
                tracing::info!(room = %self.code, seat, %name, pot, "game over");
                ServerEvent::GameOver {
                    winner_seat: Some(seat),
                    winner_name: Some(name),
                    pot,
                }
            }
            None => {
                tracing::info!(room = %self.code, pot = self.center_pot, "game over, nobody holds chips");
                ServerEvent::GameOver {
                    winner_seat: None,
                    winner_name: None,
                    pot: self.center_pot,
                }
            }
        };
        out.push((Recipient::Room, event));
        true
    }
}
