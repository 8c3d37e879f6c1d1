use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Type alias for whole chips. All bets, stacks, and pots are whole chips;
/// amounts are validated non-negative before every mutation.
pub type Chips = i64;

/// Seat positions at a room, `1..=max_seats`.
pub type SeatNumber = u8;

/// Stable unique room identifier.
pub type RoomId = Uuid;

/// Usernames longer than this are truncated on construction.
pub const MAX_USERNAME_LENGTH: usize = 32;

#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct Username(String);

impl Username {
    pub fn new(s: &str) -> Self {
        let mut username: String = s
            .chars()
            .map(|c| if c.is_ascii_whitespace() { '_' } else { c })
            .collect();
        username.truncate(MAX_USERNAME_LENGTH);
        Self(username)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<String> for Username {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<&str> for Username {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Blind obligations for the current deal. Roles partition the seated
/// players: heads-up is exactly {Dealer, BigBlind}; 3+ seats are exactly
/// {Dealer, SmallBlind, BigBlind} plus Player for the rest.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Role {
    Dealer,
    #[serde(rename = "Small Blind")]
    SmallBlind,
    #[serde(rename = "Big Blind")]
    BigBlind,
    Player,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dealer => "Dealer",
            Self::SmallBlind => "Small Blind",
            Self::BigBlind => "Big Blind",
            Self::Player => "Player",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Dealer" => Self::Dealer,
            "Small Blind" => Self::SmallBlind,
            "Big Blind" => Self::BigBlind,
            _ => Self::Player,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A player decision within a betting round.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PlayerAction {
    Fold,
    Check,
    Call,
    Raise(Chips),
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fold => write!(f, "fold"),
            Self::Check => write!(f, "check"),
            Self::Call => write!(f, "call"),
            Self::Raise(amount) => write!(f, "raise {amount}"),
        }
    }
}

/// Where a room is within one deal.
///
/// `CollectingBlinds` is transient: the engine posts both blinds in a
/// single call, so an observable room is always `Idle`, `Betting`, or
/// `DealOver`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum DealPhase {
    /// No deal running; roles may be (re)assigned.
    Idle,
    /// A betting round is in progress; roles are frozen.
    Betting,
    /// The deal settled; awaiting reset for the next one.
    DealOver,
}

/// Mutable state of one room.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub max_seats: SeatNumber,
    /// Forced big-blind contribution; the small blind is half of it.
    pub big_blind: Chips,
    /// Chips moved out of stacks since the deal began.
    pub pot: Chips,
    /// The amount a seat must have committed to stay in this street.
    /// Monotonically non-decreasing within a street, 0 at street start.
    pub current_bet: Chips,
    pub current_player_seat: Option<SeatNumber>,
    pub started: bool,
    pub phase: DealPhase,
    /// Betting rounds completed within this deal.
    pub street: u32,
}

impl Room {
    pub fn new(id: RoomId, name: impl Into<String>, max_seats: SeatNumber, big_blind: Chips) -> Self {
        Self {
            id,
            name: name.into(),
            max_seats,
            big_blind,
            pot: 0,
            current_bet: 0,
            current_player_seat: None,
            started: false,
            phase: DealPhase::Idle,
            street: 0,
        }
    }
}

/// One occupied seat at a room, bound to exactly one identity.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Seat {
    pub seat_number: SeatNumber,
    pub username: Username,
    pub stack: Chips,
    /// Chips placed this street; resets at each street start.
    pub committed_bet: Chips,
    pub role: Role,
    /// False once the seat folds; back to true at the next deal.
    pub is_active_in_hand: bool,
    pub is_connected: bool,
    pub joined_at: DateTime<Utc>,
}

impl Seat {
    pub fn new(seat_number: SeatNumber, username: Username, stack: Chips) -> Self {
        Self {
            seat_number,
            username,
            stack,
            committed_bet: 0,
            role: Role::Player,
            is_active_in_hand: true,
            is_connected: true,
            joined_at: Utc::now(),
        }
    }
}
