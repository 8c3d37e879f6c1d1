//! The per-deal betting state machine: blind collection, turn order,
//! action legality, pot bookkeeping, and settlement.
//!
//! Showdown across multiple surviving seats is not modeled; a deal ends
//! the instant a single active seat remains.

use super::entities::{Chips, DealPhase, PlayerAction, Role, Room, SeatNumber};
use super::errors::GameError;
use super::seats::SeatRegistry;

/// What applying one legal action did to the deal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ActionOutcome {
    /// Turn passed to the next active seat.
    Continued,
    /// Every active seat matched the bet; a fresh street began.
    StreetComplete,
    /// One active seat remains and was awarded the pot.
    DealOver { winner: SeatNumber, amount: Chips },
}

/// Legality flags for the seat whose turn it is, broadcast with every
/// snapshot so clients can enable exactly the buttons that will succeed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize)]
pub struct ActionOptions {
    pub can_fold: bool,
    pub can_call: bool,
    pub can_check: bool,
    pub can_raise: bool,
}

/// Post both blinds and open the first betting round.
///
/// Requires roles to be assigned. Heads-up the Dealer seat pays the
/// small-blind amount (`big_blind / 2`); with 3+ seats the SmallBlind
/// seat pays it and the Dealer pays nothing. The BigBlind seat pays the
/// full big blind. Both amounts move from stack into the pot and become
/// the payer's committed bet. A missing blind role is a caller bug and
/// surfaces as a fatal `InvariantViolation`.
pub fn collect_blinds(room: &mut Room, seats: &mut SeatRegistry) -> Result<(), GameError> {
    if room.phase == DealPhase::Betting {
        return Err(GameError::DealInProgress);
    }
    if seats.active_count() < 2 {
        return Err(GameError::NotEnoughPlayers);
    }

    let big_blind_seat = seats
        .seat_with_role(Role::BigBlind)
        .map(|s| s.seat_number)
        .ok_or_else(|| GameError::InvariantViolation("no big blind assigned".into()))?;

    let small_payer_role = if seats.len() == 2 { Role::Dealer } else { Role::SmallBlind };
    let small_blind_seat = seats
        .seat_with_role(small_payer_role)
        .map(|s| s.seat_number)
        .ok_or_else(|| {
            GameError::InvariantViolation(format!("no {small_payer_role} assigned"))
        })?;

    let small_amount = room.big_blind / 2;

    // Validate both stacks before moving a single chip.
    for (seat_number, amount) in [(small_blind_seat, small_amount), (big_blind_seat, room.big_blind)] {
        let seat = seats
            .get(seat_number)
            .ok_or_else(|| GameError::InvariantViolation("blind seat vanished".into()))?;
        if seat.stack < amount {
            return Err(GameError::InsufficientFunds {
                required: amount - seat.stack,
            });
        }
    }

    post_blind(room, seats, small_blind_seat, small_amount)?;
    post_blind(room, seats, big_blind_seat, room.big_blind)?;

    room.current_bet = room.big_blind;
    room.phase = DealPhase::Betting;
    room.street = 0;
    room.current_player_seat = seats.next_active_after(big_blind_seat);

    log::debug!(
        "room {}: blinds posted, pot {}, first to act {:?}",
        room.id,
        room.pot,
        room.current_player_seat
    );
    Ok(())
}

fn post_blind(
    room: &mut Room,
    seats: &mut SeatRegistry,
    seat_number: SeatNumber,
    amount: Chips,
) -> Result<(), GameError> {
    let seat = seats
        .get_mut(seat_number)
        .ok_or_else(|| GameError::InvariantViolation("blind seat vanished".into()))?;
    seat.stack -= amount;
    seat.committed_bet = amount;
    room.pot += amount;
    Ok(())
}

/// Apply one player decision for the seat whose turn it is.
///
/// All legality is checked before any mutation, so a rejected action
/// leaves the room and every seat untouched.
pub fn apply_action(
    room: &mut Room,
    seats: &mut SeatRegistry,
    seat_number: SeatNumber,
    action: PlayerAction,
) -> Result<ActionOutcome, GameError> {
    if room.phase != DealPhase::Betting {
        return Err(GameError::NoDealInProgress);
    }
    if room.current_player_seat != Some(seat_number) {
        return Err(GameError::OutOfTurn);
    }

    let seat = seats.get(seat_number).ok_or(GameError::NotSeated)?;
    debug_assert!(seat.is_active_in_hand, "folded seat held the turn");

    match action {
        PlayerAction::Fold => {
            // Always legal; the pot never changes on a fold.
            if let Some(seat) = seats.get_mut(seat_number) {
                seat.is_active_in_hand = false;
            }
        }
        PlayerAction::Check => {
            if seat.committed_bet != room.current_bet {
                return Err(GameError::IllegalCheck {
                    current_bet: room.current_bet,
                });
            }
        }
        PlayerAction::Call => {
            let shortfall = room.current_bet - seat.committed_bet;
            if seat.stack < shortfall {
                return Err(GameError::InsufficientFunds {
                    required: shortfall - seat.stack,
                });
            }
            let current_bet = room.current_bet;
            if let Some(seat) = seats.get_mut(seat_number) {
                seat.stack -= shortfall;
                seat.committed_bet = current_bet;
            }
            room.pot += shortfall;
        }
        PlayerAction::Raise(amount) => {
            let min = 2 * room.current_bet;
            if amount < min {
                return Err(GameError::IllegalRaise { min });
            }
            let delta = amount - seat.committed_bet;
            if delta > seat.stack {
                return Err(GameError::InsufficientFunds {
                    required: delta - seat.stack,
                });
            }
            if let Some(seat) = seats.get_mut(seat_number) {
                seat.stack -= delta;
                seat.committed_bet = amount;
            }
            room.pot += delta;
            room.current_bet = amount;
        }
    }

    log::debug!("room {}: seat {seat_number} {action}", room.id);
    advance(room, seats, seat_number)
}

/// Decide what the deal does after a legal action: settle, open a new
/// street, or pass the turn.
fn advance(
    room: &mut Room,
    seats: &mut SeatRegistry,
    actor: SeatNumber,
) -> Result<ActionOutcome, GameError> {
    if let Some(winner) = seats.sole_active_seat() {
        return Ok(settle(room, seats, winner));
    }

    let round_complete = seats
        .iter()
        .filter(|s| s.is_active_in_hand)
        .all(|s| s.committed_bet == room.current_bet);

    if round_complete {
        begin_street(room, seats)?;
        return Ok(ActionOutcome::StreetComplete);
    }

    room.current_player_seat = seats.next_active_after(actor);
    Ok(ActionOutcome::Continued)
}

/// Award the whole pot to the last active seat and close the deal.
fn settle(room: &mut Room, seats: &mut SeatRegistry, winner: SeatNumber) -> ActionOutcome {
    let amount = room.pot;
    if let Some(seat) = seats.get_mut(winner) {
        seat.stack += amount;
    }
    room.pot = 0;
    room.current_bet = 0;
    room.current_player_seat = None;
    room.phase = DealPhase::DealOver;
    for seat in seats.iter_mut() {
        seat.committed_bet = 0;
    }
    log::debug!("room {}: deal over, seat {winner} takes {amount}", room.id);
    ActionOutcome::DealOver { winner, amount }
}

/// Open a fresh betting round: bets reset to zero and the first actor is
/// the first active seat strictly after the big blind, wrapping.
fn begin_street(room: &mut Room, seats: &mut SeatRegistry) -> Result<(), GameError> {
    let big_blind_seat = seats
        .seat_with_role(Role::BigBlind)
        .map(|s| s.seat_number)
        .ok_or_else(|| GameError::InvariantViolation("no big blind assigned".into()))?;

    room.street += 1;
    room.current_bet = 0;
    for seat in seats.iter_mut() {
        seat.committed_bet = 0;
    }
    room.current_player_seat = seats.next_active_after(big_blind_seat);
    log::debug!("room {}: street {} begins", room.id, room.street);
    Ok(())
}

/// Legality flags for `seat_number` under the current room state. All
/// false when it isn't that seat's turn or no betting round is running.
pub fn action_options(room: &Room, seats: &SeatRegistry, seat_number: SeatNumber) -> ActionOptions {
    if room.phase != DealPhase::Betting || room.current_player_seat != Some(seat_number) {
        return ActionOptions::default();
    }
    let Some(seat) = seats.get(seat_number) else {
        return ActionOptions::default();
    };

    let shortfall = room.current_bet - seat.committed_bet;
    ActionOptions {
        can_fold: true,
        can_call: seat.stack >= shortfall,
        can_check: seat.committed_bet == room.current_bet,
        can_raise: seat.stack > 0 && seat.stack + seat.committed_bet >= 2 * room.current_bet,
    }
}
