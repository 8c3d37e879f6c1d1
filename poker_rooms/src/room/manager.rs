//! Room manager for spawning and managing multiple room actors.

use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    actor::{RoomActor, RoomHandle},
    config::RoomConfig,
};
use crate::game::{
    DealPhase, SeatRegistry,
    entities::{Chips, RoomId, SeatNumber},
};
use crate::store::{RoomRecord, RoomStore};

/// Room metadata for discovery.
#[derive(Clone, Debug, Serialize)]
pub struct RoomMetadata {
    pub id: RoomId,
    pub name: String,
    pub player_count: usize,
    pub max_seats: SeatNumber,
    pub big_blind: Chips,
    pub started: bool,
}

/// Spawns room actors and hands out their mailbox handles.
pub struct RoomManager {
    store: Arc<dyn RoomStore>,
    rooms: Arc<RwLock<HashMap<RoomId, RoomHandle>>>,
    defaults: RoomConfig,
}

impl RoomManager {
    pub fn new(store: Arc<dyn RoomStore>, defaults: RoomConfig) -> Self {
        Self {
            store,
            rooms: Arc::new(RwLock::new(HashMap::new())),
            defaults,
        }
    }

    pub fn default_config(&self) -> &RoomConfig {
        &self.defaults
    }

    /// Create, persist, and spawn a new room.
    pub async fn create_room(&self, config: RoomConfig) -> Result<RoomId, String> {
        config.validate()?;

        let room = crate::game::entities::Room::new(
            Uuid::new_v4(),
            config.name.clone(),
            config.max_seats,
            config.big_blind,
        );
        let room_id = room.id;

        self.store
            .create_room(&RoomRecord::from_room(&room))
            .await
            .map_err(|e| format!("Database error: {e}"))?;

        let seats = SeatRegistry::new(room.max_seats, room.big_blind);
        self.spawn(room, seats, config).await;

        log::info!("Created and spawned room {room_id}");
        Ok(room_id)
    }

    /// Load persisted rooms and spawn an actor for each.
    ///
    /// A room that was mid-deal comes back suspended: the deal resumes
    /// once enough of its participants reconnect.
    pub async fn load_existing_rooms(&self) -> Result<usize, String> {
        let records = self
            .store
            .list_rooms()
            .await
            .map_err(|e| format!("Failed to load rooms: {e}"))?;

        let mut loaded = 0;
        for record in records {
            let seat_records = self
                .store
                .get_seats(record.id)
                .await
                .map_err(|e| format!("Failed to load seats: {e}"))?;

            let mut room = record.into_room();
            if room.current_player_seat.is_some() {
                room.phase = DealPhase::Betting;
                room.started = false;
            }

            let seats = SeatRegistry::from_seats(
                room.max_seats,
                room.big_blind,
                seat_records
                    .into_iter()
                    .map(|r| {
                        let mut seat = r.into_seat();
                        // Nobody is connected yet after a respawn.
                        seat.is_connected = false;
                        seat
                    })
                    .collect(),
            );

            let config = RoomConfig {
                name: room.name.clone(),
                max_seats: room.max_seats,
                big_blind: room.big_blind,
                ..self.defaults.clone()
            };

            let room_id = room.id;
            self.spawn(room, seats, config).await;
            log::info!("Loaded and spawned existing room {room_id}");
            loaded += 1;
        }

        Ok(loaded)
    }

    async fn spawn(
        &self,
        room: crate::game::entities::Room,
        seats: SeatRegistry,
        config: RoomConfig,
    ) {
        let room_id = room.id;
        let (actor, handle) = RoomActor::new(room, seats, config, self.store.clone());

        let mut rooms = self.rooms.write().await;
        rooms.insert(room_id, handle);
        drop(rooms);

        tokio::spawn(async move {
            actor.run().await;
        });
    }

    /// Get a room handle.
    pub async fn get_room(&self, room_id: RoomId) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        rooms.get(&room_id).cloned()
    }

    /// List all rooms with their occupancy.
    pub async fn list_rooms(&self) -> Result<Vec<RoomMetadata>, String> {
        let records = self
            .store
            .list_rooms()
            .await
            .map_err(|e| format!("Database error: {e}"))?;

        let mut metadata = Vec::with_capacity(records.len());
        for record in records {
            let player_count = self
                .store
                .get_seats(record.id)
                .await
                .map(|seats| seats.len())
                .unwrap_or(0);
            metadata.push(RoomMetadata {
                id: record.id,
                name: record.name,
                player_count,
                max_seats: record.max_seats,
                big_blind: record.big_blind,
                started: record.started,
            });
        }
        Ok(metadata)
    }

    /// Number of live room actors.
    pub async fn room_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.len()
    }
}
