//! Room actor message types.

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::game::entities::{Chips, PlayerAction, RoomId, SeatNumber, Username};
use crate::protocol::{PlayerSnapshot, ServerMessage};

/// Identifies one live connection to a room. Unique per process, so a
/// user connected twice counts as two observers.
pub type ConnectionId = u64;

/// Messages a room actor accepts through its mailbox.
#[derive(Debug)]
pub enum RoomMessage {
    /// Register a connection for broadcasts. An identified connection
    /// also reclaims its seat if it has one.
    Subscribe {
        conn_id: ConnectionId,
        identity: Option<Username>,
        sender: mpsc::Sender<ServerMessage>,
    },

    /// Deregister a connection; the identity's seat survives.
    Unsubscribe { conn_id: ConnectionId },

    /// Take a seat with a starting stack.
    Sit {
        identity: Username,
        seat: SeatNumber,
        stack: Chips,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Apply a betting action for the identity's seat.
    TakeAction {
        identity: Username,
        action: PlayerAction,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Vacate the identity's seat entirely.
    Leave {
        identity: Username,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Snapshot of the room for discovery APIs.
    GetState {
        response: oneshot::Sender<RoomSnapshot>,
    },
}

/// Response from room operations.
#[derive(Clone, Debug, PartialEq)]
pub enum RoomResponse {
    Success,
    Error(String),
}

impl RoomResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, RoomResponse::Success)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            RoomResponse::Error(msg) => Some(msg),
            RoomResponse::Success => None,
        }
    }
}

/// Point-in-time view of a room, served over the HTTP API.
#[derive(Clone, Debug, Serialize)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub name: String,
    pub max_seats: SeatNumber,
    pub big_blind: Chips,
    pub pot: Chips,
    pub current_bet: Chips,
    pub current_player: Option<SeatNumber>,
    pub started: bool,
    pub player_count: usize,
    pub players: Vec<PlayerSnapshot>,
}
