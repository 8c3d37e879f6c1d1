//! Dealer/Small-Blind/Big-Blind assignment.

use rand::Rng;

use super::entities::{Role, Room, SeatNumber};
use super::errors::GameError;
use super::seats::SeatRegistry;

/// Assign roles to the seated players before a deal starts.
///
/// The dealer seat is drawn uniformly from the occupied seats; small and
/// big blind follow clockwise (ascending seat number, wrapping). Heads-up
/// the dealer doubles as the small-blind contributor, so the partition is
/// exactly {Dealer, BigBlind}. The random source is injected so the draw
/// is replayable under test.
///
/// Refuses to run while a deal is in progress, and resets every role to
/// `Player` before reporting `NotEnoughPlayers` for fewer than 2 seats.
///
/// Returns the dealer's seat number.
pub fn assign_roles<R: Rng>(
    room: &Room,
    seats: &mut SeatRegistry,
    rng: &mut R,
) -> Result<SeatNumber, GameError> {
    if room.started {
        return Err(GameError::DealInProgress);
    }

    seats.reset_roles();

    let numbers: Vec<SeatNumber> = seats.iter().map(|s| s.seat_number).collect();
    if numbers.len() < 2 {
        return Err(GameError::NotEnoughPlayers);
    }

    let dealer_idx = rng.random_range(0..numbers.len());
    let dealer = numbers[dealer_idx];

    if numbers.len() == 2 {
        let big_blind = numbers[(dealer_idx + 1) % 2];
        set_role(seats, dealer, Role::Dealer)?;
        set_role(seats, big_blind, Role::BigBlind)?;
    } else {
        let small_blind = numbers[(dealer_idx + 1) % numbers.len()];
        let big_blind = numbers[(dealer_idx + 2) % numbers.len()];
        set_role(seats, dealer, Role::Dealer)?;
        set_role(seats, small_blind, Role::SmallBlind)?;
        set_role(seats, big_blind, Role::BigBlind)?;
    }

    log::debug!("room {}: dealer drawn at seat {dealer}", room.id);
    Ok(dealer)
}

fn set_role(seats: &mut SeatRegistry, number: SeatNumber, role: Role) -> Result<(), GameError> {
    match seats.get_mut(number) {
        Some(seat) => {
            seat.role = role;
            Ok(())
        }
        None => Err(GameError::InvariantViolation(format!(
            "role target seat {number} vanished during assignment"
        ))),
    }
}
