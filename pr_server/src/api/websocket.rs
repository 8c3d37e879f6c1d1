//! WebSocket handler for live room sessions.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/{room_id}?token=<jwt>`. The token is
//!    optional: without one the connection observes as a spectator and
//!    any mutating message is rejected.
//! 2. The connection subscribes to the room actor and immediately
//!    receives the current player list.
//! 3. A send task pumps room broadcasts to the socket while the receive
//!    loop decodes client messages and forwards them to the actor.
//! 4. On disconnect the connection unsubscribes; a player's seat
//!    survives for reconnection, it is never vacated automatically.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:6969/ws/<room-uuid>?token=eyJhbGc...');
//! ws.send(JSON.stringify({ action: "sit", seat: 3, stack: 1000 }));
//! ws.send(JSON.stringify({ action: "raise", amount: 100 }));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use poker_rooms::game::entities::Username;
use poker_rooms::protocol::{ClientMessage, ServerMessage};
use poker_rooms::room::{ConnectionId, RoomHandle};

use super::AppState;

/// Process-wide connection counter; ids are never reused.
static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// Upgrade an HTTP connection to a WebSocket room session.
///
/// A present-but-invalid token is rejected with `401 Unauthorized`; an
/// absent token produces an anonymous spectator connection.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<Uuid>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let identity = match query.token.as_deref() {
        Some(token) => match state.identity.resolve(token) {
            Ok(username) => Some(username),
            Err(err) => {
                warn!("WebSocket auth failed for room {room_id}: {err}");
                return (StatusCode::UNAUTHORIZED, "Invalid token").into_response();
            }
        },
        None => None,
    };

    let Some(handle) = state.room_manager.get_room(room_id).await else {
        return (StatusCode::NOT_FOUND, "Room not found").into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, handle, identity))
}

/// Handle an established WebSocket connection until it closes.
async fn handle_socket(socket: WebSocket, room: RoomHandle, identity: Option<Username>) {
    let conn_id: ConnectionId = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
    let room_id = room.room_id();

    info!(
        "WebSocket connected: room={room_id}, conn={conn_id}, identity={:?}",
        identity.as_ref().map(Username::as_str)
    );

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerMessage>(64);

    if room
        .subscribe(conn_id, identity.clone(), outbound_tx.clone())
        .await
        .is_err()
    {
        warn!("Room {room_id} is closed, dropping connection {conn_id}");
        return;
    }

    let (mut sender, mut receiver) = socket.split();

    // Pump room broadcasts out to the socket.
    let send_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(err) => {
                    warn!("Failed to serialize outbound message: {err}");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Decode and dispatch inbound client messages.
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let reply = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => {
                        handle_client_message(message, &room, identity.as_ref()).await
                    }
                    Err(err) => {
                        debug!("Invalid message from conn {conn_id}: {err}");
                        Some("Invalid message format".to_string())
                    }
                };
                if let Some(message) = reply {
                    // Rejections go only to the offending connection.
                    let _ = outbound_tx.send(ServerMessage::Error { message }).await;
                }
            }
            Ok(Message::Close(_)) => {
                debug!("WebSocket closed: room={room_id}, conn={conn_id}");
                break;
            }
            Err(err) => {
                debug!("WebSocket error on conn {conn_id}: {err}");
                break;
            }
            _ => {}
        }
    }

    send_task.abort();

    // The seat, if any, survives; only the subscription is dropped.
    let _ = room.unsubscribe(conn_id).await;

    info!("WebSocket disconnected: room={room_id}, conn={conn_id}");
}

/// Forward one client message to the room, returning an error string to
/// unicast back when the request is rejected.
async fn handle_client_message(
    message: ClientMessage,
    room: &RoomHandle,
    identity: Option<&Username>,
) -> Option<String> {
    let Some(identity) = identity else {
        return Some("Authentication required".to_string());
    };

    let result = match message {
        ClientMessage::Sit { seat, stack } => room.sit(identity.clone(), seat, stack).await,
        ClientMessage::Leave => room.leave(identity.clone()).await,
        other => match other.as_player_action() {
            Some(action) => room.take_action(identity.clone(), action).await,
            None => return Some("Unsupported message".to_string()),
        },
    };

    match result {
        Ok(response) => response.error_message().map(str::to_string),
        Err(err) => Some(err),
    }
}
