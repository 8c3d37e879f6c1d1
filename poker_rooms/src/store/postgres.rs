//! PostgreSQL implementation of the room store.
//!
//! Schema lives in the server crate's `migrations/` directory. Seat
//! uniqueness is enforced by the `unique_seat_in_room` and
//! `unique_user_in_room` constraints, so `create_seat_if_absent` is
//! atomic without an explicit transaction.

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::{RoomRecord, RoomStore, SeatRecord, StoreError, StoreResult};
use crate::game::entities::{Role, RoomId, SeatNumber, Username};

pub struct PgRoomStore {
    pool: PgPool,
}

impl PgRoomStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn room_from_row(row: &PgRow) -> RoomRecord {
    RoomRecord {
        id: row.get("id"),
        name: row.get("name"),
        max_seats: row.get::<i16, _>("max_seats") as SeatNumber,
        big_blind: row.get("big_blind"),
        pot: row.get("pot"),
        current_bet: row.get("current_bet"),
        current_player_seat: row
            .get::<Option<i16>, _>("current_player_seat")
            .map(|n| n as SeatNumber),
        started: row.get("started"),
    }
}

fn seat_from_row(room_id: RoomId, row: &PgRow) -> SeatRecord {
    SeatRecord {
        room_id,
        seat_number: row.get::<i16, _>("seat_number") as SeatNumber,
        username: Username::new(row.get("username")),
        stack: row.get("stack"),
        committed_bet: row.get("committed_bet"),
        role: Role::from_str(row.get("role")),
        is_active_in_hand: row.get("is_active_in_hand"),
        is_connected: row.get("is_connected"),
        joined_at: row.get("joined_at"),
    }
}

#[async_trait]
impl RoomStore for PgRoomStore {
    async fn get_room(&self, room_id: RoomId) -> StoreResult<Option<RoomRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, max_seats, big_blind, pot, current_bet,
                   current_player_seat, started
            FROM rooms
            WHERE id = $1
            "#,
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(room_from_row))
    }

    async fn get_seats(&self, room_id: RoomId) -> StoreResult<Vec<SeatRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT seat_number, username, stack, committed_bet, role,
                   is_active_in_hand, is_connected, joined_at
            FROM room_seats
            WHERE room_id = $1
            ORDER BY seat_number ASC
            "#,
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| seat_from_row(room_id, row)).collect())
    }

    async fn list_rooms(&self) -> StoreResult<Vec<RoomRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, max_seats, big_blind, pot, current_bet,
                   current_player_seat, started
            FROM rooms
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(room_from_row).collect())
    }

    async fn create_room(&self, room: &RoomRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rooms (
                id, name, max_seats, big_blind, pot, current_bet,
                current_player_seat, started
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(room.id)
        .bind(&room.name)
        .bind(room.max_seats as i16)
        .bind(room.big_blind)
        .bind(room.pot)
        .bind(room.current_bet)
        .bind(room.current_player_seat.map(|n| n as i16))
        .bind(room.started)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_room(&self, room: &RoomRecord) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE rooms
            SET pot = $2, current_bet = $3, current_player_seat = $4, started = $5
            WHERE id = $1
            "#,
        )
        .bind(room.id)
        .bind(room.pot)
        .bind(room.current_bet)
        .bind(room.current_player_seat.map(|n| n as i16))
        .bind(room.started)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RoomNotFound);
        }
        Ok(())
    }

    async fn create_seat_if_absent(&self, seat: &SeatRecord) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO room_seats (
                room_id, seat_number, username, stack, committed_bet, role,
                is_active_in_hand, is_connected, joined_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(seat.room_id)
        .bind(seat.seat_number as i16)
        .bind(seat.username.as_str())
        .bind(seat.stack)
        .bind(seat.committed_bet)
        .bind(seat.role.as_str())
        .bind(seat.is_active_in_hand)
        .bind(seat.is_connected)
        .bind(seat.joined_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) => match err.constraint() {
                Some("unique_seat_in_room") => Err(StoreError::SeatTaken),
                Some("unique_user_in_room") => Err(StoreError::AlreadySeated),
                _ => Err(StoreError::Database(sqlx::Error::Database(err))),
            },
            Err(err) => Err(StoreError::Database(err)),
        }
    }

    async fn update_seat(&self, seat: &SeatRecord) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE room_seats
            SET stack = $3, committed_bet = $4, role = $5,
                is_active_in_hand = $6, is_connected = $7
            WHERE room_id = $1 AND seat_number = $2
            "#,
        )
        .bind(seat.room_id)
        .bind(seat.seat_number as i16)
        .bind(seat.stack)
        .bind(seat.committed_bet)
        .bind(seat.role.as_str())
        .bind(seat.is_active_in_hand)
        .bind(seat.is_connected)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::SeatNotFound);
        }
        Ok(())
    }

    async fn delete_seat(&self, room_id: RoomId, username: &Username) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM room_seats
            WHERE room_id = $1 AND username = $2
            "#,
        )
        .bind(room_id)
        .bind(username.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::SeatNotFound);
        }
        Ok(())
    }
}
