//! Room actors: one task per room, serializing every mutating action
//! through a mailbox so concurrent connections can never interleave
//! inside a state transition.

pub mod actor;
pub mod config;
pub mod manager;
pub mod messages;

pub use actor::{RoomActor, RoomHandle};
pub use config::RoomConfig;
pub use manager::{RoomManager, RoomMetadata};
pub use messages::{ConnectionId, RoomMessage, RoomResponse, RoomSnapshot};
