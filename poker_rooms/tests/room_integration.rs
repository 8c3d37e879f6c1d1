//! End-to-end room actor flows against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use poker_rooms::game::entities::{PlayerAction, Room, Username};
use poker_rooms::game::SeatRegistry;
use poker_rooms::protocol::ServerMessage;
use poker_rooms::room::{RoomActor, RoomConfig, RoomHandle, RoomSnapshot};
use poker_rooms::store::{MemoryStore, RoomStore};
use uuid::Uuid;

fn test_config() -> RoomConfig {
    RoomConfig {
        name: "Test Room".to_string(),
        max_seats: 10,
        big_blind: 50,
        auto_start: true,
        action_timeout_secs: 30,
    }
}

async fn spawn_room(config: RoomConfig) -> (RoomHandle, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let room = Room::new(Uuid::new_v4(), &config.name, config.max_seats, config.big_blind);
    let seats = SeatRegistry::new(room.max_seats, room.big_blind);
    store
        .create_room(&poker_rooms::store::RoomRecord::from_room(&room))
        .await
        .unwrap();
    let (actor, handle) = RoomActor::new(room, seats, config, store.clone());
    tokio::spawn(actor.run());
    (handle, store)
}

/// Subscribe a named connection, returning its message stream.
async fn connect(
    handle: &RoomHandle,
    conn_id: u64,
    name: Option<&str>,
) -> mpsc::Receiver<ServerMessage> {
    let (tx, rx) = mpsc::channel(64);
    handle
        .subscribe(conn_id, name.map(Username::new), tx)
        .await
        .unwrap();
    rx
}

async fn recv(rx: &mut mpsc::Receiver<ServerMessage>) -> ServerMessage {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for message")
        .expect("room closed the channel")
}

/// Drain broadcasts until a settlement snapshot (empty pot) arrives.
async fn wait_for_settlement(rx: &mut mpsc::Receiver<ServerMessage>) {
    for _ in 0..100 {
        if let ServerMessage::UpdateGame { pot: 0, .. } = recv(rx).await {
            return;
        }
    }
    panic!("deal never settled");
}

/// Wait for the room to report a state matching `predicate`.
async fn wait_for_state<F>(handle: &RoomHandle, predicate: F) -> RoomSnapshot
where
    F: Fn(&RoomSnapshot) -> bool,
{
    for _ in 0..50 {
        let snapshot = handle.state().await.unwrap();
        if predicate(&snapshot) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("room never reached expected state");
}

#[tokio::test]
async fn test_two_sits_start_a_deal() {
    let (handle, _store) = spawn_room(test_config()).await;
    let mut alice_rx = connect(&handle, 1, Some("alice")).await;
    let _bob_rx = connect(&handle, 2, Some("bob")).await;

    // First message on subscribe is always the current player list.
    assert!(matches!(
        recv(&mut alice_rx).await,
        ServerMessage::LoadPlayers { players } if players.is_empty()
    ));

    assert!(handle
        .sit(Username::new("alice"), 1, 1000)
        .await
        .unwrap()
        .is_success());
    assert!(handle
        .sit(Username::new("bob"), 2, 1000)
        .await
        .unwrap()
        .is_success());

    // Both joins, then the deal start, then the first snapshot.
    assert!(matches!(recv(&mut alice_rx).await, ServerMessage::PlayerJoin { .. }));
    assert!(matches!(recv(&mut alice_rx).await, ServerMessage::PlayerJoin { .. }));
    assert!(matches!(recv(&mut alice_rx).await, ServerMessage::GameStart { .. }));
    match recv(&mut alice_rx).await {
        ServerMessage::UpdateGame { pot, current_bet, current_player, .. } => {
            assert_eq!(pot, 75);
            assert_eq!(current_bet, 50);
            assert!(current_player.is_some());
        }
        other => panic!("expected update_game, got {other:?}"),
    }

    let state = handle.state().await.unwrap();
    assert!(state.started);
    assert_eq!(state.pot, 75);
    assert_eq!(state.player_count, 2);
}

#[tokio::test]
async fn test_seat_conflicts_rejected() {
    let (handle, _store) = spawn_room(test_config()).await;

    assert!(handle
        .sit(Username::new("alice"), 3, 1000)
        .await
        .unwrap()
        .is_success());

    let taken = handle.sit(Username::new("bob"), 3, 1000).await.unwrap();
    assert_eq!(taken.error_message(), Some("seat is already taken"));

    let double = handle.sit(Username::new("alice"), 4, 1000).await.unwrap();
    assert_eq!(double.error_message(), Some("already seated at this table"));

    let broke = handle.sit(Username::new("carol"), 5, 10).await.unwrap();
    assert_eq!(broke.error_message(), Some("need 40 more chips"));
}

#[tokio::test]
async fn test_out_of_turn_and_unseated_actions_rejected() {
    let (handle, _store) = spawn_room(test_config()).await;
    handle.sit(Username::new("alice"), 1, 1000).await.unwrap();
    handle.sit(Username::new("bob"), 2, 1000).await.unwrap();

    let state = wait_for_state(&handle, |s| s.started).await;
    let current = state.current_player.unwrap();
    let waiting = if current == 1 { "bob" } else { "alice" };

    let response = handle
        .take_action(Username::new(waiting), PlayerAction::Call)
        .await
        .unwrap();
    assert_eq!(response.error_message(), Some("not your turn"));

    let response = handle
        .take_action(Username::new("mallory"), PlayerAction::Fold)
        .await
        .unwrap();
    assert_eq!(response.error_message(), Some("no seat for this player"));
}

#[tokio::test]
async fn test_fold_settles_and_next_deal_begins() {
    let (handle, _store) = spawn_room(test_config()).await;
    let mut alice_rx = connect(&handle, 1, Some("alice")).await;
    let _bob_rx = connect(&handle, 2, Some("bob")).await;
    handle.sit(Username::new("alice"), 1, 1000).await.unwrap();
    handle.sit(Username::new("bob"), 2, 1000).await.unwrap();

    let state = wait_for_state(&handle, |s| s.started).await;
    let current = state.current_player.unwrap();
    let actor = if current == 1 { "alice" } else { "bob" };

    let response = handle
        .take_action(Username::new(actor), PlayerAction::Fold)
        .await
        .unwrap();
    assert!(response.is_success());
    wait_for_settlement(&mut alice_rx).await;

    // Settlement triggers the next auto-started deal immediately, and
    // no chips leak across deals.
    let state = wait_for_state(&handle, |s| s.started).await;
    assert_eq!(state.pot, 75);
    let total: i64 = state.players.iter().map(|p| p.stack).sum::<i64>() + state.pot;
    assert_eq!(total, 2000);
}

#[tokio::test]
async fn test_turn_timeout_folds_current_player() {
    let config = RoomConfig {
        action_timeout_secs: 1,
        ..test_config()
    };
    let (handle, _store) = spawn_room(config).await;
    let mut alice_rx = connect(&handle, 1, Some("alice")).await;
    let _bob_rx = connect(&handle, 2, Some("bob")).await;
    handle.sit(Username::new("alice"), 1, 1000).await.unwrap();
    handle.sit(Username::new("bob"), 2, 1000).await.unwrap();

    wait_for_state(&handle, |s| s.started).await;

    // Nobody acts; the timeout folds the current player, which settles
    // the heads-up deal.
    wait_for_settlement(&mut alice_rx).await;

    let state = handle.state().await.unwrap();
    let total: i64 = state.players.iter().map(|p| p.stack).sum::<i64>() + state.pot;
    assert_eq!(total, 2000);
}

#[tokio::test]
async fn test_disconnect_suspends_and_reconnect_resumes() {
    let (handle, _store) = spawn_room(test_config()).await;
    let _alice_rx = connect(&handle, 1, Some("alice")).await;
    let bob_rx = connect(&handle, 2, Some("bob")).await;
    handle.sit(Username::new("alice"), 1, 1000).await.unwrap();
    handle.sit(Username::new("bob"), 2, 1000).await.unwrap();

    wait_for_state(&handle, |s| s.started).await;

    // Bob drops. His seat survives but the deal is suspended.
    drop(bob_rx);
    handle.unsubscribe(2).await.unwrap();
    let state = wait_for_state(&handle, |s| !s.started).await;
    assert_eq!(state.player_count, 2);
    assert!(state.current_player.is_some());

    // Bob reconnects; the same deal resumes where it stopped.
    let _bob_rx = connect(&handle, 3, Some("bob")).await;
    let state = wait_for_state(&handle, |s| s.started).await;
    assert_eq!(state.pot, 75);
}

#[tokio::test]
async fn test_leave_rejected_mid_deal_but_allowed_when_idle() {
    let (handle, _store) = spawn_room(test_config()).await;
    handle.sit(Username::new("alice"), 1, 1000).await.unwrap();
    handle.sit(Username::new("bob"), 2, 1000).await.unwrap();

    wait_for_state(&handle, |s| s.started).await;

    // Still active in the running deal, so the seat is locked in.
    let response = handle.leave(Username::new("alice")).await.unwrap();
    assert_eq!(response.error_message(), Some("deal already in progress"));

    let (handle, _store) = spawn_room(RoomConfig {
        auto_start: false,
        ..test_config()
    })
    .await;
    handle.sit(Username::new("alice"), 1, 1000).await.unwrap();

    // No deal is running, so leaving is immediate.
    let response = handle.leave(Username::new("alice")).await.unwrap();
    assert!(response.is_success());
    let state = handle.state().await.unwrap();
    assert_eq!(state.player_count, 0);

    let response = handle.leave(Username::new("alice")).await.unwrap();
    assert_eq!(response.error_message(), Some("no seat for this player"));
}

#[tokio::test]
async fn test_folded_seat_cannot_leave_until_settlement() {
    let (handle, _store) = spawn_room(test_config()).await;
    let mut alice_rx = connect(&handle, 1, Some("alice")).await;
    let _bob_rx = connect(&handle, 2, Some("bob")).await;
    let _carol_rx = connect(&handle, 3, Some("carol")).await;
    handle.sit(Username::new("alice"), 1, 1000).await.unwrap();
    handle.sit(Username::new("bob"), 2, 1000).await.unwrap();
    handle.sit(Username::new("carol"), 3, 1000).await.unwrap();

    fn player_at(state: &RoomSnapshot, seat: u8) -> Username {
        state
            .players
            .iter()
            .find(|p| p.seat == seat)
            .expect("seat is occupied")
            .username
            .clone()
    }

    let state = wait_for_state(&handle, |s| s.started).await;
    let folder = player_at(&state, state.current_player.unwrap());
    assert!(handle
        .take_action(folder.clone(), PlayerAction::Fold)
        .await
        .unwrap()
        .is_success());

    // Folded but still seated; the seat stays locked until settlement.
    let response = handle.leave(folder).await.unwrap();
    assert_eq!(response.error_message(), Some("deal already in progress"));

    // The deal is unharmed: the remaining players settle it normally.
    let state = handle.state().await.unwrap();
    let next = player_at(&state, state.current_player.unwrap());
    assert!(handle
        .take_action(next, PlayerAction::Fold)
        .await
        .unwrap()
        .is_success());
    wait_for_settlement(&mut alice_rx).await;

    let state = handle.state().await.unwrap();
    let total: i64 = state.players.iter().map(|p| p.stack).sum::<i64>() + state.pot;
    assert_eq!(total, 3000);
}

#[tokio::test]
async fn test_auto_start_disabled_keeps_room_idle() {
    let config = RoomConfig {
        auto_start: false,
        ..test_config()
    };
    let (handle, _store) = spawn_room(config).await;
    handle.sit(Username::new("alice"), 1, 1000).await.unwrap();
    handle.sit(Username::new("bob"), 2, 1000).await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    let state = handle.state().await.unwrap();
    assert!(!state.started);
    assert_eq!(state.pot, 0);
}

#[tokio::test]
async fn test_sit_persists_seat_to_store() {
    let (handle, store) = spawn_room(test_config()).await;
    handle.sit(Username::new("alice"), 4, 800).await.unwrap();

    let room_id = handle.room_id();
    let seats = store.get_seats(room_id).await.unwrap();
    assert_eq!(seats.len(), 1);
    assert_eq!(seats[0].seat_number, 4);
    assert_eq!(seats[0].stack, 800);
    assert_eq!(seats[0].username, Username::new("alice"));
}
