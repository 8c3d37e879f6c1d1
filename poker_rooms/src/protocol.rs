//! JSON wire protocol spoken between the transport gateway and clients.
//!
//! Inbound messages are decoded and schema-validated exactly once at the
//! boundary into a closed tagged union; the room engine only ever sees
//! typed actions. Outbound messages carry the canonical room snapshot
//! broadcast after every state-mutating operation.

use serde::{Deserialize, Serialize};

use crate::game::ActionOptions;
use crate::game::entities::{Chips, PlayerAction, Role, Seat, SeatNumber, Username};

/// One inbound player message.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Take a seat with a starting stack.
    Sit { seat: SeatNumber, stack: Chips },
    Fold,
    Check,
    Call,
    Raise { amount: Chips },
    /// Vacate the seat entirely (voluntary exit after settlement).
    Leave,
}

impl ClientMessage {
    /// The betting action this message carries, if it is one.
    pub fn as_player_action(&self) -> Option<PlayerAction> {
        match self {
            Self::Fold => Some(PlayerAction::Fold),
            Self::Check => Some(PlayerAction::Check),
            Self::Call => Some(PlayerAction::Call),
            Self::Raise { amount } => Some(PlayerAction::Raise(*amount)),
            Self::Sit { .. } | Self::Leave => None,
        }
    }
}

/// One seat in an outbound snapshot.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub username: Username,
    pub seat: SeatNumber,
    pub stack: Chips,
    pub committed_bet: Chips,
    pub role: Role,
    pub is_active_in_hand: bool,
    pub is_connected: bool,
}

impl From<&Seat> for PlayerSnapshot {
    fn from(seat: &Seat) -> Self {
        Self {
            username: seat.username.clone(),
            seat: seat.seat_number,
            stack: seat.stack,
            committed_bet: seat.committed_bet,
            role: seat.role,
            is_active_in_hand: seat.is_active_in_hand,
            is_connected: seat.is_connected,
        }
    }
}

/// Outbound broadcast/unicast messages.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Current players, sent to a connection when it first observes a room.
    LoadPlayers { players: Vec<PlayerSnapshot> },
    /// A player took a seat.
    PlayerJoin {
        username: Username,
        seat: SeatNumber,
        stack: Chips,
        role: Role,
    },
    /// Canonical room snapshot after every state-mutating operation.
    UpdateGame {
        pot: Chips,
        current_bet: Chips,
        players: Vec<PlayerSnapshot>,
        current_player: Option<SeatNumber>,
        #[serde(rename = "canFold")]
        can_fold: bool,
        #[serde(rename = "canCall")]
        can_call: bool,
        #[serde(rename = "canCheck")]
        can_check: bool,
        #[serde(rename = "canRaise")]
        can_raise: bool,
    },
    /// Rejected request, reported only to the requesting connection.
    /// A fatal room error goes to every observer instead.
    Error { message: String },
    /// A deal began.
    GameStart { message: String },
}

impl ServerMessage {
    pub fn update_game(
        pot: Chips,
        current_bet: Chips,
        players: Vec<PlayerSnapshot>,
        current_player: Option<SeatNumber>,
        options: ActionOptions,
    ) -> Self {
        Self::UpdateGame {
            pot,
            current_bet,
            players,
            current_player,
            can_fold: options.can_fold,
            can_call: options.can_call,
            can_check: options.can_check,
            can_raise: options.can_raise,
        }
    }
}
