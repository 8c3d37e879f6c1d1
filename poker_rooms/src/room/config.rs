//! Per-room configuration.

use crate::game::entities::{Chips, SeatNumber};

/// Settings applied when a room is created.
#[derive(Clone, Debug)]
pub struct RoomConfig {
    /// Display name.
    pub name: String,

    /// Maximum number of seats.
    pub max_seats: SeatNumber,

    /// Big blind amount; the small blind is always half of it.
    pub big_blind: Chips,

    /// Start a deal automatically once two connected players are seated.
    pub auto_start: bool,

    /// Seconds the current player has to act before being auto-folded.
    pub action_timeout_secs: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            name: "New Room".to_string(),
            max_seats: 10,
            big_blind: 50,
            auto_start: true,
            action_timeout_secs: 30,
        }
    }
}

impl RoomConfig {
    /// Validate configuration before spawning a room.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Room name cannot be empty".to_string());
        }
        if self.max_seats < 2 {
            return Err("Room must have at least 2 seats".to_string());
        }
        if self.max_seats > 23 {
            return Err("Room cannot have more than 23 seats".to_string());
        }
        if self.big_blind < 2 {
            return Err("Big blind must be at least 2".to_string());
        }
        if self.big_blind % 2 != 0 {
            // The small blind is big_blind / 2; an odd big blind would
            // leak a chip on every deal.
            return Err("Big blind must be even".to_string());
        }
        if self.action_timeout_secs == 0 {
            return Err("Action timeout must be at least 1 second".to_string());
        }
        Ok(())
    }
}
