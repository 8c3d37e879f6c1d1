//! Room actor implementation with async message handling.
//!
//! One actor owns one room. Mutating operations arrive through the
//! mailbox and are applied strictly in arrival order; every successful
//! mutation is persisted and then broadcast to all subscribed
//! connections. A periodic tick enforces the action timeout by folding
//! the seat that let its turn expire.

use std::collections::HashMap;
use std::sync::Arc;

use rand::{SeedableRng, rngs::StdRng};
use tokio::{
    sync::mpsc,
    time::{Duration, Instant, interval},
};

use super::{
    config::RoomConfig,
    messages::{ConnectionId, RoomMessage, RoomResponse, RoomSnapshot},
};
use crate::game::{
    ActionOutcome, DealPhase, GameError, SeatRegistry, betting,
    entities::{Chips, PlayerAction, Role, Room, Seat, SeatNumber, Username},
    roles::assign_roles,
};
use crate::protocol::{PlayerSnapshot, ServerMessage};
use crate::store::{RoomRecord, RoomStore, SeatRecord, StoreError};

/// Room actor handle for sending messages.
#[derive(Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomMessage>,
    room_id: crate::game::entities::RoomId,
}

impl RoomHandle {
    pub fn new(sender: mpsc::Sender<RoomMessage>, room_id: crate::game::entities::RoomId) -> Self {
        Self { sender, room_id }
    }

    pub fn room_id(&self) -> crate::game::entities::RoomId {
        self.room_id
    }

    /// Send a message to the room.
    pub async fn send(&self, message: RoomMessage) -> Result<(), String> {
        self.sender
            .send(message)
            .await
            .map_err(|_| "Room is closed".to_string())
    }

    pub async fn subscribe(
        &self,
        conn_id: ConnectionId,
        identity: Option<Username>,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<(), String> {
        self.send(RoomMessage::Subscribe {
            conn_id,
            identity,
            sender,
        })
        .await
    }

    pub async fn unsubscribe(&self, conn_id: ConnectionId) -> Result<(), String> {
        self.send(RoomMessage::Unsubscribe { conn_id }).await
    }

    pub async fn sit(
        &self,
        identity: Username,
        seat: SeatNumber,
        stack: Chips,
    ) -> Result<RoomResponse, String> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.send(RoomMessage::Sit {
            identity,
            seat,
            stack,
            response: tx,
        })
        .await?;
        rx.await.map_err(|_| "Room did not respond".to_string())
    }

    pub async fn take_action(
        &self,
        identity: Username,
        action: PlayerAction,
    ) -> Result<RoomResponse, String> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.send(RoomMessage::TakeAction {
            identity,
            action,
            response: tx,
        })
        .await?;
        rx.await.map_err(|_| "Room did not respond".to_string())
    }

    pub async fn leave(&self, identity: Username) -> Result<RoomResponse, String> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.send(RoomMessage::Leave {
            identity,
            response: tx,
        })
        .await?;
        rx.await.map_err(|_| "Room did not respond".to_string())
    }

    pub async fn state(&self) -> Result<RoomSnapshot, String> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.send(RoomMessage::GetState { response: tx }).await?;
        rx.await.map_err(|_| "Room did not respond".to_string())
    }
}

struct Subscriber {
    identity: Option<Username>,
    sender: mpsc::Sender<ServerMessage>,
}

/// Room actor managing a single room.
pub struct RoomActor {
    room: Room,
    seats: SeatRegistry,
    config: RoomConfig,
    store: Arc<dyn RoomStore>,
    inbox: mpsc::Receiver<RoomMessage>,
    subscribers: HashMap<ConnectionId, Subscriber>,
    rng: StdRng,

    /// When the current player's turn expires, if a deal is running.
    turn_deadline: Option<Instant>,

    /// Set when a state invariant broke; the room refuses all further
    /// mutations until respawned.
    faulted: bool,
}

impl RoomActor {
    pub fn new(
        room: Room,
        seats: SeatRegistry,
        config: RoomConfig,
        store: Arc<dyn RoomStore>,
    ) -> (Self, RoomHandle) {
        Self::with_rng(room, seats, config, store, StdRng::from_os_rng())
    }

    /// Like [`RoomActor::new`] but with a caller-supplied RNG, so tests
    /// can make the dealer draw deterministic.
    pub fn with_rng(
        room: Room,
        seats: SeatRegistry,
        config: RoomConfig,
        store: Arc<dyn RoomStore>,
        rng: StdRng,
    ) -> (Self, RoomHandle) {
        let (sender, inbox) = mpsc::channel(100);
        let handle = RoomHandle::new(sender, room.id);
        let actor = Self {
            room,
            seats,
            config,
            store,
            inbox,
            subscribers: HashMap::new(),
            rng,
            turn_deadline: None,
            faulted: false,
        };
        (actor, handle)
    }

    /// Run the room actor event loop.
    pub async fn run(mut self) {
        log::info!("Room {} '{}' starting", self.room.id, self.room.name);

        let mut tick_interval = interval(Duration::from_secs(1));

        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    match message {
                        Some(message) => self.handle_message(message).await,
                        None => break,
                    }
                }

                _ = tick_interval.tick() => {
                    self.tick().await;
                }
            }
        }

        log::info!("Room {} '{}' closed", self.room.id, self.room.name);
    }

    async fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::Subscribe {
                conn_id,
                identity,
                sender,
            } => {
                self.handle_subscribe(conn_id, identity, sender).await;
            }

            RoomMessage::Unsubscribe { conn_id } => {
                self.handle_unsubscribe(conn_id).await;
            }

            RoomMessage::Sit {
                identity,
                seat,
                stack,
                response,
            } => {
                let result = self.handle_sit(identity, seat, stack).await;
                let _ = response.send(result);
            }

            RoomMessage::TakeAction {
                identity,
                action,
                response,
            } => {
                let result = self.handle_take_action(identity, action).await;
                let _ = response.send(result);
            }

            RoomMessage::Leave { identity, response } => {
                let result = self.handle_leave(identity).await;
                let _ = response.send(result);
            }

            RoomMessage::GetState { response } => {
                let _ = response.send(self.snapshot());
            }
        }
    }

    async fn handle_subscribe(
        &mut self,
        conn_id: ConnectionId,
        identity: Option<Username>,
        sender: mpsc::Sender<ServerMessage>,
    ) {
        log::debug!("Room {}: connection {conn_id} subscribed", self.room.id);
        self.subscribers.insert(
            conn_id,
            Subscriber {
                identity: identity.clone(),
                sender,
            },
        );

        if let Some(identity) = identity
            && self.seats.mark_reconnected(&identity)
        {
            log::info!("Room {}: {identity} reconnected", self.room.id);
            self.persist_seat_of(&identity).await;
        }

        self.unicast(
            conn_id,
            ServerMessage::LoadPlayers {
                players: self.players(),
            },
        );

        self.maybe_start_deal().await;
    }

    async fn handle_unsubscribe(&mut self, conn_id: ConnectionId) {
        let Some(subscriber) = self.subscribers.remove(&conn_id) else {
            return;
        };
        log::debug!("Room {}: connection {conn_id} unsubscribed", self.room.id);

        let Some(identity) = subscriber.identity else {
            return;
        };

        // The same identity may hold other live connections.
        let still_connected = self
            .subscribers
            .values()
            .any(|s| s.identity.as_ref() == Some(&identity));
        if still_connected || !self.seats.mark_disconnected(&identity) {
            return;
        }

        log::info!("Room {}: {identity} disconnected, seat retained", self.room.id);
        self.persist_seat_of(&identity).await;

        // With fewer than two participants reachable the deal is no
        // longer live; the turn timer keeps running so the remaining
        // player is not held hostage by an absent opponent.
        if self.room.started && self.seats.active_connected_count() < 2 {
            self.room.started = false;
            log::info!("Room {}: deal suspended", self.room.id);
            self.persist_room().await;
        }
    }

    async fn handle_sit(
        &mut self,
        identity: Username,
        seat_number: SeatNumber,
        stack: Chips,
    ) -> RoomResponse {
        if self.faulted {
            return RoomResponse::Error("Room is out of service".to_string());
        }
        if let Err(err) = self.seats.check_sit(&identity, seat_number, stack) {
            return RoomResponse::Error(err.to_string());
        }

        let mut seat = Seat::new(seat_number, identity.clone(), stack);
        // A seat taken mid-deal sits out until the next deal.
        if self.room.phase == DealPhase::Betting {
            seat.is_active_in_hand = false;
        }

        // The store write goes first: its constraints arbitrate races
        // between rooms sharing a database.
        let record = SeatRecord::from_seat(self.room.id, &seat);
        match self.store.create_seat_if_absent(&record).await {
            Ok(()) => {}
            Err(StoreError::SeatTaken) => {
                return RoomResponse::Error(GameError::SeatTaken.to_string());
            }
            Err(StoreError::AlreadySeated) => {
                return RoomResponse::Error(GameError::AlreadySeated.to_string());
            }
            Err(err) => {
                log::error!("Room {}: seat create failed: {err}", self.room.id);
                return RoomResponse::Error("Storage failure".to_string());
            }
        }

        if let Err(err) = self.seats.sit(identity.clone(), seat_number, stack) {
            // check_sit passed and the actor is single-threaded, so the
            // registry and the store have diverged.
            let err = GameError::InvariantViolation(err.to_string());
            self.fault_room(&err).await;
            return RoomResponse::Error(err.to_string());
        }
        if !seat.is_active_in_hand
            && let Some(seated) = self.seats.get_mut(seat_number)
        {
            seated.is_active_in_hand = false;
        }

        log::info!(
            "Room {}: {identity} sat at seat {seat_number} with {stack} chips",
            self.room.id
        );
        self.broadcast(ServerMessage::PlayerJoin {
            username: identity,
            seat: seat_number,
            stack,
            role: Role::Player,
        });

        self.maybe_start_deal().await;
        RoomResponse::Success
    }

    async fn handle_take_action(
        &mut self,
        identity: Username,
        action: PlayerAction,
    ) -> RoomResponse {
        if self.faulted {
            return RoomResponse::Error("Room is out of service".to_string());
        }
        let seat_number = match self.seats.seat_of(&identity) {
            Some(seat) => seat.seat_number,
            None => return RoomResponse::Error(GameError::NotSeated.to_string()),
        };
        self.apply_and_publish(seat_number, action).await
    }

    async fn handle_leave(&mut self, identity: Username) -> RoomResponse {
        if self.faulted {
            return RoomResponse::Error("Room is out of service".to_string());
        }
        // Seats are locked until settlement: even a folded seat still
        // anchors the blind roles that street starts resolve against.
        if self.room.phase == DealPhase::Betting && self.seats.seat_of(&identity).is_some() {
            return RoomResponse::Error(GameError::DealInProgress.to_string());
        }

        match self.seats.leave(&identity) {
            Ok(seat) => {
                if let Err(err) = self.store.delete_seat(self.room.id, &identity).await {
                    log::error!("Room {}: seat delete failed: {err}", self.room.id);
                }
                log::info!(
                    "Room {}: {identity} left seat {} with {} chips",
                    self.room.id,
                    seat.seat_number,
                    seat.stack
                );
                self.broadcast(ServerMessage::LoadPlayers {
                    players: self.players(),
                });
                RoomResponse::Success
            }
            Err(err) => RoomResponse::Error(err.to_string()),
        }
    }

    /// Apply one action for `seat_number`, persist, broadcast, and kick
    /// off the next deal if this one settled.
    async fn apply_and_publish(
        &mut self,
        seat_number: SeatNumber,
        action: PlayerAction,
    ) -> RoomResponse {
        match betting::apply_action(&mut self.room, &mut self.seats, seat_number, action) {
            Ok(ActionOutcome::DealOver { winner, amount }) => {
                log::info!(
                    "Room {}: deal over, seat {winner} wins {amount}",
                    self.room.id
                );
                self.turn_deadline = None;
                self.room.started = false;
                self.room.phase = DealPhase::Idle;
                self.seats.reset_for_new_deal();
                self.persist_state().await;
                self.broadcast_update();
                self.maybe_start_deal().await;
                RoomResponse::Success
            }
            Ok(_) => {
                self.arm_turn_timer();
                self.persist_state().await;
                self.broadcast_update();
                RoomResponse::Success
            }
            Err(err) if err.is_fatal() => {
                self.fault_room(&err).await;
                RoomResponse::Error(err.to_string())
            }
            Err(err) => RoomResponse::Error(err.to_string()),
        }
    }

    /// Start (or resume) a deal if the room allows it.
    async fn maybe_start_deal(&mut self) {
        if self.faulted || !self.config.auto_start {
            return;
        }

        if self.room.phase == DealPhase::Betting {
            // A suspended deal resumes once two participants are back.
            if !self.room.started && self.seats.active_connected_count() >= 2 {
                self.room.started = true;
                self.arm_turn_timer();
                self.persist_room().await;
                log::info!("Room {}: deal resumed", self.room.id);
                self.broadcast_update();
            }
            return;
        }

        if self.room.started || self.seats.connected_count() < 2 {
            return;
        }

        self.seats.reset_for_new_deal();
        let dealer = match assign_roles(&self.room, &mut self.seats, &mut self.rng) {
            Ok(dealer) => dealer,
            Err(GameError::NotEnoughPlayers) => return,
            Err(err) => {
                self.fault_room(&err).await;
                return;
            }
        };

        if let Err(err) = betting::collect_blinds(&mut self.room, &mut self.seats) {
            if err.is_fatal() {
                self.fault_room(&err).await;
            } else {
                log::warn!("Room {}: cannot start deal: {err}", self.room.id);
                self.seats.reset_roles();
            }
            return;
        }

        self.room.started = true;
        self.arm_turn_timer();
        self.persist_state().await;
        log::info!("Room {}: deal started, seat {dealer} deals", self.room.id);
        self.broadcast(ServerMessage::GameStart {
            message: format!("Deal started, seat {dealer} is the dealer"),
        });
        self.broadcast_update();
    }

    /// Fold the current player once their turn expires.
    async fn tick(&mut self) {
        if self.faulted {
            return;
        }
        let Some(deadline) = self.turn_deadline else {
            return;
        };
        if Instant::now() < deadline {
            return;
        }
        if self.room.phase != DealPhase::Betting {
            self.turn_deadline = None;
            return;
        }
        let Some(seat_number) = self.room.current_player_seat else {
            self.turn_deadline = None;
            return;
        };

        log::info!(
            "Room {}: seat {seat_number} timed out, folding",
            self.room.id
        );
        self.apply_and_publish(seat_number, PlayerAction::Fold)
            .await;
    }

    fn arm_turn_timer(&mut self) {
        self.turn_deadline = if self.room.phase == DealPhase::Betting
            && self.room.current_player_seat.is_some()
        {
            Some(Instant::now() + Duration::from_secs(self.config.action_timeout_secs))
        } else {
            None
        };
    }

    /// A broken invariant poisons the room: every observer is told and
    /// all further mutations are refused.
    async fn fault_room(&mut self, err: &GameError) {
        log::error!("Room {}: fatal error: {err}", self.room.id);
        self.faulted = true;
        self.broadcast(ServerMessage::Error {
            message: format!("Room is out of service: {err}"),
        });
    }

    /// Broadcast a message to all subscribed connections, pruning the
    /// dead ones.
    fn broadcast(&mut self, message: ServerMessage) {
        self.subscribers.retain(|conn_id, subscriber| {
            match subscriber.sender.try_send(message.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!("Subscriber {conn_id} channel full, dropping message");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::debug!("Subscriber {conn_id} disconnected, removing");
                    false
                }
            }
        });
    }

    fn unicast(&mut self, conn_id: ConnectionId, message: ServerMessage) {
        if let Some(subscriber) = self.subscribers.get(&conn_id)
            && subscriber.sender.try_send(message).is_err()
        {
            self.subscribers.remove(&conn_id);
        }
    }

    fn broadcast_update(&mut self) {
        let options = self
            .room
            .current_player_seat
            .map(|seat| betting::action_options(&self.room, &self.seats, seat))
            .unwrap_or_default();
        let message = ServerMessage::update_game(
            self.room.pot,
            self.room.current_bet,
            self.players(),
            self.room.current_player_seat,
            options,
        );
        self.broadcast(message);
    }

    fn players(&self) -> Vec<PlayerSnapshot> {
        self.seats.iter().map(PlayerSnapshot::from).collect()
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            id: self.room.id,
            name: self.room.name.clone(),
            max_seats: self.room.max_seats,
            big_blind: self.room.big_blind,
            pot: self.room.pot,
            current_bet: self.room.current_bet,
            current_player: self.room.current_player_seat,
            started: self.room.started,
            player_count: self.seats.len(),
            players: self.players(),
        }
    }

    async fn persist_room(&self) {
        let record = RoomRecord::from_room(&self.room);
        if let Err(err) = self.store.update_room(&record).await {
            log::error!("Room {}: room update failed: {err}", self.room.id);
        }
    }

    async fn persist_seat_of(&self, identity: &Username) {
        let Some(seat) = self.seats.seat_of(identity) else {
            return;
        };
        let record = SeatRecord::from_seat(self.room.id, seat);
        if let Err(err) = self.store.update_seat(&record).await {
            log::error!("Room {}: seat update failed: {err}", self.room.id);
        }
    }

    async fn persist_state(&self) {
        self.persist_room().await;
        for seat in self.seats.iter() {
            let record = SeatRecord::from_seat(self.room.id, seat);
            if let Err(err) = self.store.update_seat(&record).await {
                log::error!(
                    "Room {}: seat {} update failed: {err}",
                    self.room.id,
                    seat.seat_number
                );
            }
        }
    }
}
