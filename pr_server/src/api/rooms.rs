//! Room discovery and creation endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use poker_rooms::game::entities::{Chips, SeatNumber};
use poker_rooms::room::RoomConfig;

use super::AppState;

/// `GET /api/rooms` - list all rooms with their occupancy.
pub async fn list_rooms(State(state): State<AppState>) -> impl IntoResponse {
    match state.room_manager.list_rooms().await {
        Ok(rooms) => (StatusCode::OK, Json(json!({ "rooms": rooms }))),
        Err(e) => {
            log::error!("Failed to list rooms: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to list rooms" })),
            )
        }
    }
}

/// Request body for room creation. Omitted fields fall back to the
/// server's configured defaults.
#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: Option<String>,
    pub max_seats: Option<SeatNumber>,
    pub big_blind: Option<Chips>,
}

/// `POST /api/rooms` - create and spawn a room.
pub async fn create_room(
    State(state): State<AppState>,
    Json(request): Json<CreateRoomRequest>,
) -> impl IntoResponse {
    let defaults = state.room_manager.default_config().clone();
    let config = RoomConfig {
        name: request.name.unwrap_or(defaults.name),
        max_seats: request.max_seats.unwrap_or(defaults.max_seats),
        big_blind: request.big_blind.unwrap_or(defaults.big_blind),
        ..defaults
    };

    match state.room_manager.create_room(config).await {
        Ok(room_id) => (StatusCode::CREATED, Json(json!({ "id": room_id }))),
        Err(e) => {
            log::warn!("Room creation rejected: {e}");
            (StatusCode::BAD_REQUEST, Json(json!({ "error": e })))
        }
    }
}

/// `GET /api/rooms/{room_id}` - point-in-time room snapshot.
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> impl IntoResponse {
    let Some(handle) = state.room_manager.get_room(room_id).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Room not found" })),
        );
    };

    match handle.state().await {
        Ok(snapshot) => (StatusCode::OK, Json(json!(snapshot))),
        Err(e) => {
            log::error!("Room {room_id} state query failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Room is unavailable" })),
            )
        }
    }
}
