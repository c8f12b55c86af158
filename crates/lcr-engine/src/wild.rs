//! Wild decisions.
//!
//! Each Wild in a pending roll buys one [`WildAction`]: cancel a face or
//! steal a chip. Actions run in the order given, before any of the roll's
//! plain faces are applied. An action that cannot take effect is a wasted
//! wild, not an error. Three Wilds out of three dice instead ask for a
//! [`TripleWildChoice`].

use lcr_protocol::{
    ChipHolder, Face, Recipient, SEAT_COUNT, SeatIndex, ServerEvent, TripleWildChoice,
    WildAction,
};

use crate::roll::describe;
use crate::{EngineError, Outbox, Room};

/// Chips a triple-Wild steal takes at most, one per other seat.
const TRIPLE_STEAL: u32 = 3;

impl Room {
    /// Resolves `seat`'s pending roll with the given wild actions.
    ///
    /// Actions beyond the number of Wilds are ignored; Wilds without an
    /// action do nothing.
    ///
    /// # Errors
    /// [`EngineError::IllegalState`] if `seat` has no pending roll waiting
    /// for wild actions.
    pub fn resolve_wilds(
        &mut self,
        seat: SeatIndex,
        actions: &[WildAction],
    ) -> Result<Outbox, EngineError> {
        match &self.pending_roll {
            Some(roll) if roll.seat == seat && roll.wilds() > 0 && !roll.is_triple_wild() => {}
            _ => return Err(EngineError::IllegalState("no roll is waiting for wild actions")),
        }
        let mut out = Outbox::new();
        self.resolve_pending(seat, actions, &mut out);
        Ok(out)
    }

    /// Resolves `seat`'s pending triple-Wild roll.
    ///
    /// # Errors
    /// [`EngineError::IllegalState`] unless `seat`'s pending roll is three
    /// Wilds.
    pub fn triple_wild_choice(
        &mut self,
        seat: SeatIndex,
        choice: TripleWildChoice,
    ) -> Result<Outbox, EngineError> {
        match &self.pending_roll {
            Some(roll) if roll.seat == seat && roll.is_triple_wild() => {}
            _ => return Err(EngineError::IllegalState("no triple-wild roll is pending")),
        }
        self.pending_roll = None;
        let mut out = Outbox::new();

        match choice {
            TripleWildChoice::TakePot => {
                let pot = self.center_pot;
                if pot > 0 {
                    self.transfer(ChipHolder::Pot, ChipHolder::Seat(seat), pot, &mut out);
                }
                tracing::debug!(room = %self.code, seat, pot, "triple wild takes the pot");
            }
            TripleWildChoice::Steal3 => {
                let mut taken = 0;
                for step in 1..SEAT_COUNT {
                    if taken == TRIPLE_STEAL {
                        break;
                    }
                    if self.steal_chip((seat + step) % SEAT_COUNT, seat, &mut out) {
                        taken += 1;
                    }
                }
                tracing::debug!(room = %self.code, seat, taken, "triple wild steals");
            }
        }

        self.finalize_turn(seat, &mut out);
        Ok(out)
    }

    /// Applies wild actions, then the surviving faces, then ends the turn.
    pub(crate) fn resolve_pending(
        &mut self,
        seat: SeatIndex,
        actions: &[WildAction],
        out: &mut Outbox,
    ) {
        let Some(roll) = self.pending_roll.take() else {
            return;
        };
        let mut canceled = vec![false; roll.outcomes.len()];
        let mut notes = Vec::new();

        for action in actions.iter().take(roll.wilds()) {
            match *action {
                WildAction::Cancel { target_face } => {
                    let hit = (0..roll.outcomes.len()).find(|&i| {
                        target_face != Face::Wild
                            && roll.outcomes[i] == target_face
                            && !canceled[i]
                    });
                    match hit {
                        Some(i) => {
                            canceled[i] = true;
                            notes.push(format!("canceled {target_face}"));
                        }
                        None => notes.push(format!("wild wasted, no {target_face} to cancel")),
                    }
                }
                WildAction::Steal { from_seat } => {
                    if self.steal_chip(from_seat, seat, out) {
                        notes.push(format!("stole a chip from {}", self.name_of(from_seat)));
                    } else {
                        notes.push("wild wasted, nothing to steal".to_string());
                    }
                }
            }
        }

        for (face, _) in roll
            .outcomes
            .iter()
            .zip(&canceled)
            .filter(|(_, canceled)| !**canceled)
        {
            self.apply_face(seat, *face, &mut notes, out);
        }

        let mut text = format!("{} rolled {}", self.name_of(seat), describe(&roll.outcomes));
        if !notes.is_empty() {
            text.push_str(": ");
            text.push_str(&notes.join("; "));
        }
        out.push((Recipient::Room, ServerEvent::HistoryEntry { text }));

        self.finalize_turn(seat, out);
    }

    /// Takes one chip from `from` for `to`. Returns whether it happened.
    ///
    /// Stealing from yourself, from an empty or out-of-range seat, or from
    /// a seat with no chips does nothing.
    pub(crate) fn steal_chip(&mut self, from: SeatIndex, to: SeatIndex, out: &mut Outbox) -> bool {
        if from == to || self.seat(to).is_none() || self.chips_of(from) == 0 {
            return false;
        }
        self.transfer(ChipHolder::Seat(from), ChipHolder::Seat(to), 1, out);
        true
    }

    /// The decision request for `seat`'s pending roll, if it has one.
    pub(crate) fn decision_request(&self, seat: SeatIndex) -> Option<ServerEvent> {
        let roll = self.pending_roll.as_ref().filter(|r| r.seat == seat)?;
        Some(if roll.is_triple_wild() {
            ServerEvent::RequestTripleWildChoice {
                seat,
                roll_id: roll.id,
            }
        } else {
            ServerEvent::RequestWildChoice {
                seat,
                roll_id: roll.id,
                outcomes: roll.outcomes.clone(),
                wilds: roll.wilds(),
            }
        })
    }

    /// The decision request addressed to the roller's connection. `None`
    /// while the roller is detached; they get it again on reattach.
    pub(crate) fn decision_request_for_roller(
        &self,
        seat: SeatIndex,
    ) -> Option<(Recipient, ServerEvent)> {
        let conn = self.seat(seat)?.connection?;
        Some((Recipient::Connection(conn), self.decision_request(seat)?))
    }
}
