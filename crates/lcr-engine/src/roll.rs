//! Rolling the dice and applying plain faces.
//!
//! A roll happens in two halves. [`Room::roll_dice`] draws the faces,
//! credits Dots and parks the roll as pending. If the roll holds no Wild
//! it is resolved straight away; otherwise it waits for the roller's
//! decisions (see the `wild` module). Resolution applies the non-canceled
//! Left/Right/Hub faces in roll order and then ends the turn.

use lcr_protocol::{ChipHolder, Face, Phase, Recipient, SeatIndex, ServerEvent};

use crate::room::{DOT_CAP, MAX_DICE, PendingRoll};
use crate::turn::{next_seat, previous_seat};
use crate::{EngineError, FaceSource, Outbox, Room};

impl Room {
    /// Rolls for `seat`, which must be the seat to move.
    ///
    /// A player with no chips rolls nothing and the turn ends at once,
    /// which is how the danger/elimination check runs for them.
    ///
    /// # Errors
    /// [`EngineError::IllegalState`] if the game is not in progress, it is
    /// not `seat`'s turn, or an earlier roll still awaits a decision.
    pub fn roll_dice(
        &mut self,
        seat: SeatIndex,
        dice: &mut dyn FaceSource,
    ) -> Result<Outbox, EngineError> {
        if self.phase != Phase::Playing {
            return Err(EngineError::IllegalState("the game is not in progress"));
        }
        if self.current_seat != Some(seat) {
            return Err(EngineError::IllegalState("it is not this seat's turn"));
        }
        if self.pending_roll.is_some() {
            return Err(EngineError::IllegalState("the last roll still awaits a decision"));
        }
        let chips = match self.seat(seat) {
            Some(p) if !p.eliminated => p.chips,
            _ => return Err(EngineError::IllegalState("seat cannot roll")),
        };

        let mut out = Outbox::new();
        let num_dice = chips.min(MAX_DICE);
        if num_dice == 0 {
            tracing::debug!(room = %self.code, seat, "no chips, turn passes without a roll");
            self.finalize_turn(seat, &mut out);
            return Ok(out);
        }

        let outcomes: Vec<Face> = (0..num_dice).map(|_| dice.draw()).collect();
        let id = self.next_roll_id;
        self.next_roll_id += 1;
        tracing::debug!(room = %self.code, seat, roll_id = id, ?outcomes, "dice rolled");
        out.push((
            Recipient::Room,
            ServerEvent::RollResult {
                seat,
                roll_id: id,
                outcomes: outcomes.clone(),
            },
        ));

        let dots = outcomes.iter().filter(|f| **f == Face::Dot).count() as u32;
        let gained = dots.min(DOT_CAP.saturating_sub(chips));
        if gained > 0 {
            if let Some(player) = self.seats[seat].as_mut() {
                player.chips += gained;
            }
            out.push((
                Recipient::Room,
                ServerEvent::ChipsGained {
                    seat,
                    amount: gained,
                },
            ));
        }

        let roll = PendingRoll { id, seat, outcomes };
        let needs_decision = roll.wilds() > 0;
        self.pending_roll = Some(roll);

        if needs_decision {
            if let Some((recipient, request)) = self.decision_request_for_roller(seat) {
                out.push((recipient, request));
            }
            self.broadcast_state(&mut out);
        } else {
            self.resolve_pending(seat, &[], &mut out);
        }
        Ok(out)
    }

    /// Applies one non-canceled face for the roller.
    ///
    /// Left, Right and Hub each move one chip and are skipped when the
    /// roller has none left. Left/Right with no other active seat keep the
    /// chip where it is.
    pub(crate) fn apply_face(
        &mut self,
        seat: SeatIndex,
        face: Face,
        notes: &mut Vec<String>,
        out: &mut Outbox,
    ) {
        let to = match face {
            Face::Dot | Face::Wild => return,
            Face::Left => ChipHolder::Seat(next_seat(&self.seats, seat)),
            Face::Right => ChipHolder::Seat(previous_seat(&self.seats, seat)),
            Face::Hub => ChipHolder::Pot,
        };
        if self.chips_of(seat) == 0 {
            notes.push(format!("{face} skipped, no chips left"));
            return;
        }
        match to {
            ChipHolder::Seat(target) if target == seat => {
                notes.push(format!("{face} kept, nobody to pass to"));
            }
            ChipHolder::Seat(target) => {
                notes.push(format!("passed a chip to {}", self.name_of(target)));
                self.transfer(ChipHolder::Seat(seat), to, 1, out);
            }
            ChipHolder::Pot => {
                notes.push("put a chip in the pot".to_string());
                self.transfer(ChipHolder::Seat(seat), to, 1, out);
            }
        }
    }

    /// Moves `amount` chips. The caller has checked `from` holds them.
    pub(crate) fn transfer(
        &mut self,
        from: ChipHolder,
        to: ChipHolder,
        amount: u32,
        out: &mut Outbox,
    ) {
        for (holder, credit) in [(from, false), (to, true)] {
            let balance = match holder {
                ChipHolder::Pot => Some(&mut self.center_pot),
                ChipHolder::Seat(seat) => {
                    self.seats[seat].as_mut().map(|p| &mut p.chips)
                }
            };
            if let Some(balance) = balance {
                if credit {
                    *balance += amount;
                } else {
                    *balance = balance.saturating_sub(amount);
                }
            }
        }
        out.push((Recipient::Room, ServerEvent::ChipTransfer { from, to, amount }));
    }
}

pub(crate) fn describe(outcomes: &[Face]) -> String {
    outcomes
        .iter()
        .map(Face::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
