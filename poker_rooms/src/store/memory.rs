//! In-memory store used by tests and single-process deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{RoomRecord, RoomStore, SeatRecord, StoreError, StoreResult};
use crate::game::entities::{RoomId, Username};

#[derive(Default)]
struct Inner {
    rooms: HashMap<RoomId, RoomRecord>,
    seats: HashMap<RoomId, Vec<SeatRecord>>,
}

/// A `RoomStore` backed by process memory. A single mutex over both maps
/// keeps the seat-uniqueness check and the insert atomic, matching what
/// the SQL implementation gets from its constraints.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn get_room(&self, room_id: RoomId) -> StoreResult<Option<RoomRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner.rooms.get(&room_id).cloned())
    }

    async fn get_seats(&self, room_id: RoomId) -> StoreResult<Vec<SeatRecord>> {
        let inner = self.inner.lock().await;
        let mut seats = inner.seats.get(&room_id).cloned().unwrap_or_default();
        seats.sort_by_key(|s| s.seat_number);
        Ok(seats)
    }

    async fn list_rooms(&self) -> StoreResult<Vec<RoomRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner.rooms.values().cloned().collect())
    }

    async fn create_room(&self, room: &RoomRecord) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.rooms.insert(room.id, room.clone());
        inner.seats.entry(room.id).or_default();
        Ok(())
    }

    async fn update_room(&self, room: &RoomRecord) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        match inner.rooms.get_mut(&room.id) {
            Some(existing) => {
                *existing = room.clone();
                Ok(())
            }
            None => Err(StoreError::RoomNotFound),
        }
    }

    async fn create_seat_if_absent(&self, seat: &SeatRecord) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let seats = inner.seats.entry(seat.room_id).or_default();
        if seats.iter().any(|s| s.seat_number == seat.seat_number) {
            return Err(StoreError::SeatTaken);
        }
        if seats.iter().any(|s| s.username == seat.username) {
            return Err(StoreError::AlreadySeated);
        }
        seats.push(seat.clone());
        Ok(())
    }

    async fn update_seat(&self, seat: &SeatRecord) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let seats = inner
            .seats
            .get_mut(&seat.room_id)
            .ok_or(StoreError::RoomNotFound)?;
        match seats.iter_mut().find(|s| s.seat_number == seat.seat_number) {
            Some(existing) => {
                *existing = seat.clone();
                Ok(())
            }
            None => Err(StoreError::SeatNotFound),
        }
    }

    async fn delete_seat(&self, room_id: RoomId, username: &Username) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let seats = inner.seats.get_mut(&room_id).ok_or(StoreError::RoomNotFound)?;
        let before = seats.len();
        seats.retain(|s| &s.username != username);
        if seats.len() == before {
            return Err(StoreError::SeatNotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Room, Seat};
    use uuid::Uuid;

    fn seat_record(room_id: RoomId, number: u8, name: &str) -> SeatRecord {
        SeatRecord::from_seat(room_id, &Seat::new(number, Username::new(name), 1000))
    }

    #[tokio::test]
    async fn test_create_seat_enforces_seat_uniqueness() {
        let store = MemoryStore::new();
        let room_id = Uuid::new_v4();
        store
            .create_seat_if_absent(&seat_record(room_id, 1, "alice"))
            .await
            .unwrap();
        let err = store
            .create_seat_if_absent(&seat_record(room_id, 1, "bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SeatTaken));
    }

    #[tokio::test]
    async fn test_create_seat_enforces_identity_uniqueness() {
        let store = MemoryStore::new();
        let room_id = Uuid::new_v4();
        store
            .create_seat_if_absent(&seat_record(room_id, 1, "alice"))
            .await
            .unwrap();
        let err = store
            .create_seat_if_absent(&seat_record(room_id, 2, "alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadySeated));
    }

    #[tokio::test]
    async fn test_same_identity_in_different_rooms() {
        let store = MemoryStore::new();
        store
            .create_seat_if_absent(&seat_record(Uuid::new_v4(), 1, "alice"))
            .await
            .unwrap();
        store
            .create_seat_if_absent(&seat_record(Uuid::new_v4(), 1, "alice"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_room_round_trip_and_seat_ordering() {
        let store = MemoryStore::new();
        let room = Room::new(Uuid::new_v4(), "Test", 10, 50);
        let record = RoomRecord::from_room(&room);
        store.create_room(&record).await.unwrap();

        store.create_seat_if_absent(&seat_record(room.id, 5, "bob")).await.unwrap();
        store.create_seat_if_absent(&seat_record(room.id, 2, "alice")).await.unwrap();

        let seats = store.get_seats(room.id).await.unwrap();
        assert_eq!(seats.len(), 2);
        assert_eq!(seats[0].seat_number, 2);

        assert_eq!(store.get_room(room.id).await.unwrap(), Some(record));
        assert_eq!(store.list_rooms().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_seat() {
        let store = MemoryStore::new();
        let room_id = Uuid::new_v4();
        store.create_seat_if_absent(&seat_record(room_id, 1, "alice")).await.unwrap();
        store.delete_seat(room_id, &Username::new("alice")).await.unwrap();
        let err = store.delete_seat(room_id, &Username::new("alice")).await.unwrap_err();
        assert!(matches!(err, StoreError::SeatNotFound));
    }
}
