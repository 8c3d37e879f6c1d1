//! # Poker Rooms
//!
//! A multi-room betting-round engine for turn-based table games.
//!
//! Each room seats players, collects blinds, runs a serialized betting
//! round, and settles the pot to the last active seat. Rooms run as
//! independent actors, so many rooms proceed concurrently while all
//! mutating actions within one room are applied strictly in arrival
//! order. Players connect over long-lived duplex sessions and may
//! reconnect to an existing seat without corrupting state.
//!
//! ## Core Modules
//!
//! - [`game`]: seat registry, role assignment, and the betting engine
//! - [`room`]: room actor, mailbox messages, and the room registry
//! - [`protocol`]: the JSON wire protocol spoken over the transport
//! - [`store`]: persistence behind the [`store::RoomStore`] trait
//! - [`auth`]: token-to-identity resolution at the connection boundary
//!
//! ## Example
//!
//! ```
//! use poker_rooms::game::{Room, SeatRegistry, entities::Username};
//!
//! let room = Room::new(uuid::Uuid::new_v4(), "High Stakes", 10, 50);
//! let mut seats = SeatRegistry::new(room.max_seats, room.big_blind);
//! seats.sit(Username::new("alice"), 1, 1000).unwrap();
//! ```

/// Core game logic: seats, roles, and the betting state machine.
pub mod game;
pub use game::{
    GameError,
    entities::{self, Chips, PlayerAction, Role, Room, RoomId, Seat, SeatNumber, Username},
    seats::SeatRegistry,
};

/// Room actors and the registry that spawns them.
pub mod room;
pub use room::{RoomConfig, RoomHandle, RoomManager};

/// Wire protocol shared by the server and its clients.
pub mod protocol;

/// Persistence layer.
pub mod store;

/// Connection identity resolution.
pub mod auth;
