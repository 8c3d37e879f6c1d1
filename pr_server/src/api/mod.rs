//! HTTP/WebSocket API for the room server.
//!
//! # Endpoints
//!
//! - `GET  /health` - Server health status (public)
//! - `GET  /api/rooms` - List all rooms (public)
//! - `POST /api/rooms` - Create a room (public)
//! - `GET  /api/rooms/{room_id}` - Room snapshot (public)
//! - `GET  /ws/{room_id}?token=<jwt>` - WebSocket session; the token is
//!   optional, connections without one observe as spectators
//!
//! The WebSocket is the only mutating surface: seats and actions are
//! taken over the live session, never over plain HTTP.

pub mod rooms;
pub mod websocket;

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Json},
    routing::get,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use poker_rooms::auth::IdentityProvider;
use poker_rooms::room::RoomManager;

/// Application state shared across all HTTP handlers and WebSocket
/// connections. Cloned per request; everything inside is an Arc.
#[derive(Clone)]
pub struct AppState {
    pub room_manager: Arc<RoomManager>,
    pub identity: Arc<dyn IdentityProvider>,
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/rooms", get(rooms::list_rooms).post(rooms::create_room))
        .route("/api/rooms/{room_id}", get(rooms::get_room))
        // WebSocket route handles its own auth via query parameter.
        .route("/ws/{room_id}", get(websocket::websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let room_count = state.room_manager.room_count().await;

    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "rooms": { "active_count": room_count },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
