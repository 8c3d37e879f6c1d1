//! Persistence behind the [`RoomStore`] trait.
//!
//! The engine only depends on the access pattern: fetch a room and its
//! seats, atomically create a seat (enforcing both uniqueness
//! invariants), and update or delete single records. Every write is
//! atomic at the granularity of one seat or room record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::entities::{Chips, Role, Room, RoomId, Seat, SeatNumber, Username};

pub mod config;
pub mod memory;
pub mod postgres;

pub use config::{Database, DatabaseConfig};
pub use memory::MemoryStore;
pub use postgres::PgRoomStore;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("seat is already taken")]
    SeatTaken,
    #[error("identity already holds a seat in this room")]
    AlreadySeated,
    #[error("room not found")]
    RoomNotFound,
    #[error("seat not found")]
    SeatNotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persisted form of one room.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoomRecord {
    pub id: RoomId,
    pub name: String,
    pub max_seats: SeatNumber,
    pub big_blind: Chips,
    pub pot: Chips,
    pub current_bet: Chips,
    pub current_player_seat: Option<SeatNumber>,
    pub started: bool,
}

impl RoomRecord {
    pub fn from_room(room: &Room) -> Self {
        Self {
            id: room.id,
            name: room.name.clone(),
            max_seats: room.max_seats,
            big_blind: room.big_blind,
            pot: room.pot,
            current_bet: room.current_bet,
            current_player_seat: room.current_player_seat,
            started: room.started,
        }
    }

    pub fn into_room(self) -> Room {
        let mut room = Room::new(self.id, self.name, self.max_seats, self.big_blind);
        room.pot = self.pot;
        room.current_bet = self.current_bet;
        room.current_player_seat = self.current_player_seat;
        room.started = self.started;
        room
    }
}

/// Persisted form of one seat.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SeatRecord {
    pub room_id: RoomId,
    pub seat_number: SeatNumber,
    pub username: Username,
    pub stack: Chips,
    pub committed_bet: Chips,
    pub role: Role,
    pub is_active_in_hand: bool,
    pub is_connected: bool,
    pub joined_at: DateTime<Utc>,
}

impl SeatRecord {
    pub fn from_seat(room_id: RoomId, seat: &Seat) -> Self {
        Self {
            room_id,
            seat_number: seat.seat_number,
            username: seat.username.clone(),
            stack: seat.stack,
            committed_bet: seat.committed_bet,
            role: seat.role,
            is_active_in_hand: seat.is_active_in_hand,
            is_connected: seat.is_connected,
            joined_at: seat.joined_at,
        }
    }

    pub fn into_seat(self) -> Seat {
        Seat {
            seat_number: self.seat_number,
            username: self.username,
            stack: self.stack,
            committed_bet: self.committed_bet,
            role: self.role,
            is_active_in_hand: self.is_active_in_hand,
            is_connected: self.is_connected,
            joined_at: self.joined_at,
        }
    }
}

/// Repository contract consumed by the room layer.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Fetch a room by id.
    async fn get_room(&self, room_id: RoomId) -> StoreResult<Option<RoomRecord>>;

    /// Fetch all seats of a room, ordered by seat number.
    async fn get_seats(&self, room_id: RoomId) -> StoreResult<Vec<SeatRecord>>;

    /// All known rooms.
    async fn list_rooms(&self) -> StoreResult<Vec<RoomRecord>>;

    /// Create a room record.
    async fn create_room(&self, room: &RoomRecord) -> StoreResult<()>;

    /// Persist updated room state.
    async fn update_room(&self, room: &RoomRecord) -> StoreResult<()>;

    /// Atomically create a seat, failing with `SeatTaken` if the seat
    /// number is occupied or `AlreadySeated` if the identity already
    /// holds a seat in this room.
    async fn create_seat_if_absent(&self, seat: &SeatRecord) -> StoreResult<()>;

    /// Persist updated seat state.
    async fn update_seat(&self, seat: &SeatRecord) -> StoreResult<()>;

    /// Remove the identity's seat from the room.
    async fn delete_seat(&self, room_id: RoomId, username: &Username) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_room_record_round_trip() {
        let mut room = Room::new(Uuid::new_v4(), "Test", 10, 50);
        room.pot = 75;
        room.current_bet = 50;
        room.current_player_seat = Some(3);
        room.started = true;

        let record = RoomRecord::from_room(&room);
        let restored = record.into_room();
        assert_eq!(restored.pot, 75);
        assert_eq!(restored.current_player_seat, Some(3));
        assert!(restored.started);
    }

    #[test]
    fn test_seat_record_round_trip() {
        let room_id = Uuid::new_v4();
        let mut seat = Seat::new(2, Username::new("alice"), 950);
        seat.role = Role::BigBlind;
        seat.committed_bet = 50;

        let record = SeatRecord::from_seat(room_id, &seat);
        assert_eq!(record.room_id, room_id);
        let restored = record.into_seat();
        assert_eq!(restored.role, Role::BigBlind);
        assert_eq!(restored.committed_bet, 50);
        assert_eq!(restored.username, Username::new("alice"));
    }
}
