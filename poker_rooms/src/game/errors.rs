use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::Chips;

/// Errors produced by the room game engine.
///
/// Every variant except `InvariantViolation` is recoverable: the action
/// is rejected before any mutation and reported only to the requesting
/// connection. An invariant violation means a caller broke an engine
/// precondition; the room must be halted pending external remediation.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("seat is already taken")]
    SeatTaken,
    #[error("already seated at this table")]
    AlreadySeated,
    #[error("seat number is out of range")]
    InvalidSeat,
    #[error("room is full")]
    RoomFull,
    #[error("no seat for this player")]
    NotSeated,
    #[error("need 2+ players")]
    NotEnoughPlayers,
    #[error("deal already in progress")]
    DealInProgress,
    #[error("no deal in progress")]
    NoDealInProgress,
    #[error("not your turn")]
    OutOfTurn,
    #[error("can't check a bet of {current_bet}")]
    IllegalCheck { current_bet: Chips },
    #[error("raise must be at least {min}")]
    IllegalRaise { min: Chips },
    #[error("need {required} more chips")]
    InsufficientFunds { required: Chips },
    #[error("invalid room state: {0}")]
    InvariantViolation(String),
}

impl GameError {
    /// Fatal errors abort the automated sequence for the whole room;
    /// everything else is rejected per-request without mutating state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}
