//! Room game engine: seat management, role assignment, and the
//! betting-round state machine.
//!
//! The engine is split along the seams the room actor composes:
//! - [`seats`]: seat occupancy and identity-to-seat binding
//! - [`roles`]: Dealer/Small-Blind/Big-Blind assignment
//! - [`betting`]: blind collection, turn order, action legality, pot math
//!
//! All engine functions validate before they mutate: a rejected action
//! leaves the room and every seat exactly as they were.

pub mod betting;
pub mod entities;
pub mod errors;
pub mod roles;
pub mod seats;

pub use betting::{ActionOptions, ActionOutcome};
pub use entities::{Chips, DealPhase, PlayerAction, Role, Room, Seat};
pub use errors::GameError;
pub use seats::SeatRegistry;
