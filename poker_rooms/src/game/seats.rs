//! Seat occupancy and identity-to-seat binding for one room.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use super::entities::{Chips, Role, Seat, SeatNumber, Username};
use super::errors::GameError;

/// Owns the seats of a single room.
///
/// Seats are keyed by seat number in a `BTreeMap`, so iteration is always
/// ascending and turn order falls out of a wrapped scan. Both uniqueness
/// invariants (one identity per seat, one seat per identity) are checked
/// before any insert.
#[derive(Debug)]
pub struct SeatRegistry {
    max_seats: SeatNumber,
    /// Minimum stack to sit down; a seat that can't post the big blind
    /// can't play the next deal.
    min_stack: Chips,
    seats: BTreeMap<SeatNumber, Seat>,
    by_user: HashMap<Username, SeatNumber>,
}

impl SeatRegistry {
    pub fn new(max_seats: SeatNumber, min_stack: Chips) -> Self {
        Self {
            max_seats,
            min_stack,
            seats: BTreeMap::new(),
            by_user: HashMap::new(),
        }
    }

    /// Rebuild a registry from persisted seats, e.g. when a room actor is
    /// respawned. Seats violating uniqueness are dropped with a warning
    /// rather than corrupting the registry.
    pub fn from_seats(max_seats: SeatNumber, min_stack: Chips, seats: Vec<Seat>) -> Self {
        let mut registry = Self::new(max_seats, min_stack);
        for seat in seats {
            let number = seat.seat_number;
            if registry.seats.contains_key(&number)
                || registry.by_user.contains_key(&seat.username)
            {
                log::warn!("dropping duplicate persisted seat {number}");
                continue;
            }
            registry.by_user.insert(seat.username.clone(), number);
            registry.seats.insert(number, seat);
        }
        registry
    }

    /// Validate a sit request without applying it. Used by callers that
    /// need to interleave an atomic store write between the check and the
    /// in-memory insert.
    pub fn check_sit(
        &self,
        username: &Username,
        seat_number: SeatNumber,
        stack: Chips,
    ) -> Result<(), GameError> {
        if seat_number == 0 || seat_number > self.max_seats {
            return Err(GameError::InvalidSeat);
        }
        if self.by_user.contains_key(username) {
            return Err(GameError::AlreadySeated);
        }
        if self.seats.contains_key(&seat_number) {
            return Err(GameError::SeatTaken);
        }
        if self.seats.len() >= self.max_seats as usize {
            return Err(GameError::RoomFull);
        }
        if stack < self.min_stack {
            return Err(GameError::InsufficientFunds {
                required: self.min_stack - stack,
            });
        }
        Ok(())
    }

    /// Seat an identity. On success the seat is occupied and connected.
    pub fn sit(
        &mut self,
        username: Username,
        seat_number: SeatNumber,
        stack: Chips,
    ) -> Result<&Seat, GameError> {
        self.check_sit(&username, seat_number, stack)?;
        self.by_user.insert(username.clone(), seat_number);
        self.seats
            .insert(seat_number, Seat::new(seat_number, username, stack));
        Ok(&self.seats[&seat_number])
    }

    /// Mark the identity's seat disconnected without vacating it; stack
    /// and role persist so the player can reconnect. Returns whether a
    /// seat was affected.
    pub fn mark_disconnected(&mut self, username: &Username) -> bool {
        match self.seat_mut_of(username) {
            Some(seat) => {
                seat.is_connected = false;
                true
            }
            None => false,
        }
    }

    /// Restore the identity's existing seat to connected. Idempotent.
    pub fn mark_reconnected(&mut self, username: &Username) -> bool {
        match self.seat_mut_of(username) {
            Some(seat) => {
                seat.is_connected = true;
                true
            }
            None => false,
        }
    }

    /// Remove the identity's seat entirely.
    pub fn leave(&mut self, username: &Username) -> Result<Seat, GameError> {
        let seat_number = self.by_user.remove(username).ok_or(GameError::NotSeated)?;
        // by_user and seats are kept in lockstep, so the seat must exist.
        self.seats
            .remove(&seat_number)
            .ok_or_else(|| GameError::InvariantViolation("seat map out of sync".into()))
    }

    pub fn get(&self, seat_number: SeatNumber) -> Option<&Seat> {
        self.seats.get(&seat_number)
    }

    pub fn get_mut(&mut self, seat_number: SeatNumber) -> Option<&mut Seat> {
        self.seats.get_mut(&seat_number)
    }

    pub fn seat_of(&self, username: &Username) -> Option<&Seat> {
        self.by_user.get(username).and_then(|n| self.seats.get(n))
    }

    fn seat_mut_of(&mut self, username: &Username) -> Option<&mut Seat> {
        let number = *self.by_user.get(username)?;
        self.seats.get_mut(&number)
    }

    /// Seats in ascending seat-number order.
    pub fn iter(&self) -> impl Iterator<Item = &Seat> {
        self.seats.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Seat> {
        self.seats.values_mut()
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// Occupied seats still in the current deal.
    pub fn active_count(&self) -> usize {
        self.seats.values().filter(|s| s.is_active_in_hand).count()
    }

    /// Occupied seats with a live connection.
    pub fn connected_count(&self) -> usize {
        self.seats.values().filter(|s| s.is_connected).count()
    }

    /// Connected seats still in the current deal.
    pub fn active_connected_count(&self) -> usize {
        self.seats
            .values()
            .filter(|s| s.is_active_in_hand && s.is_connected)
            .count()
    }

    /// The sole seat still in the deal, if exactly one remains.
    pub fn sole_active_seat(&self) -> Option<SeatNumber> {
        let mut active = self.seats.values().filter(|s| s.is_active_in_hand);
        match (active.next(), active.next()) {
            (Some(seat), None) => Some(seat.seat_number),
            _ => None,
        }
    }

    /// Next occupied seat in the deal strictly after `seat_number`,
    /// wrapping to the lowest. An exclusive bound keeps the scan safe at
    /// the top of the `u8` seat range.
    pub fn next_active_after(&self, seat_number: SeatNumber) -> Option<SeatNumber> {
        self.seats
            .range((Bound::Excluded(seat_number), Bound::Unbounded))
            .chain(self.seats.range(..=seat_number))
            .find(|(_, seat)| seat.is_active_in_hand)
            .map(|(&n, _)| n)
    }

    /// Reset per-deal seat state for the next deal. Stacks persist.
    pub fn reset_for_new_deal(&mut self) {
        for seat in self.seats.values_mut() {
            seat.committed_bet = 0;
            seat.is_active_in_hand = true;
        }
    }

    /// Clear all role assignments back to `Player`.
    pub fn reset_roles(&mut self) {
        for seat in self.seats.values_mut() {
            seat.role = Role::Player;
        }
    }

    /// Seat currently holding `role`, if any.
    pub fn seat_with_role(&self, role: Role) -> Option<&Seat> {
        self.seats.values().find(|s| s.role == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SeatRegistry {
        SeatRegistry::new(10, 50)
    }

    #[test]
    fn test_sit_occupies_seat_connected() {
        let mut seats = registry();
        let seat = seats.sit(Username::new("alice"), 3, 1000).unwrap();
        assert_eq!(seat.seat_number, 3);
        assert_eq!(seat.stack, 1000);
        assert!(seat.is_connected);
        assert!(seat.is_active_in_hand);
        assert_eq!(seat.role, Role::Player);
    }

    #[test]
    fn test_sit_rejects_taken_seat() {
        let mut seats = registry();
        seats.sit(Username::new("alice"), 3, 1000).unwrap();
        let err = seats.sit(Username::new("bob"), 3, 1000).unwrap_err();
        assert_eq!(err, GameError::SeatTaken);
        assert_eq!(seats.len(), 1);
    }

    #[test]
    fn test_sit_rejects_double_seating() {
        let mut seats = registry();
        seats.sit(Username::new("alice"), 3, 1000).unwrap();
        let err = seats.sit(Username::new("alice"), 4, 1000).unwrap_err();
        assert_eq!(err, GameError::AlreadySeated);
    }

    #[test]
    fn test_sit_rejects_out_of_range_seat() {
        let mut seats = registry();
        assert_eq!(
            seats.sit(Username::new("alice"), 0, 1000).unwrap_err(),
            GameError::InvalidSeat
        );
        assert_eq!(
            seats.sit(Username::new("alice"), 11, 1000).unwrap_err(),
            GameError::InvalidSeat
        );
    }

    #[test]
    fn test_sit_rejects_stack_below_big_blind() {
        let mut seats = registry();
        let err = seats.sit(Username::new("alice"), 1, 40).unwrap_err();
        assert_eq!(err, GameError::InsufficientFunds { required: 10 });
    }

    #[test]
    fn test_sit_rejects_when_full() {
        let mut seats = SeatRegistry::new(2, 50);
        seats.sit(Username::new("alice"), 1, 1000).unwrap();
        seats.sit(Username::new("bob"), 2, 1000).unwrap();
        let err = seats.sit(Username::new("carol"), 2, 1000).unwrap_err();
        // Seat collision is reported before capacity.
        assert_eq!(err, GameError::SeatTaken);
    }

    #[test]
    fn test_disconnect_keeps_seat() {
        let mut seats = registry();
        let alice = Username::new("alice");
        seats.sit(alice.clone(), 1, 1000).unwrap();
        assert!(seats.mark_disconnected(&alice));
        let seat = seats.seat_of(&alice).unwrap();
        assert!(!seat.is_connected);
        assert_eq!(seat.stack, 1000);
    }

    #[test]
    fn test_reconnect_is_idempotent() {
        let mut seats = registry();
        let alice = Username::new("alice");
        seats.sit(alice.clone(), 1, 1000).unwrap();
        seats.mark_disconnected(&alice);
        assert!(seats.mark_reconnected(&alice));
        assert!(seats.mark_reconnected(&alice));
        assert!(seats.seat_of(&alice).unwrap().is_connected);
        assert!(!seats.mark_reconnected(&Username::new("nobody")));
    }

    #[test]
    fn test_leave_vacates_seat() {
        let mut seats = registry();
        let alice = Username::new("alice");
        seats.sit(alice.clone(), 1, 1000).unwrap();
        let removed = seats.leave(&alice).unwrap();
        assert_eq!(removed.seat_number, 1);
        assert!(seats.is_empty());
        assert_eq!(seats.leave(&alice).unwrap_err(), GameError::NotSeated);
    }

    #[test]
    fn test_next_active_after_wraps_and_skips_folded() {
        let mut seats = registry();
        seats.sit(Username::new("alice"), 2, 1000).unwrap();
        seats.sit(Username::new("bob"), 5, 1000).unwrap();
        seats.sit(Username::new("carol"), 8, 1000).unwrap();
        assert_eq!(seats.next_active_after(2), Some(5));
        assert_eq!(seats.next_active_after(8), Some(2));
        seats.get_mut(5).unwrap().is_active_in_hand = false;
        assert_eq!(seats.next_active_after(2), Some(8));
    }

    #[test]
    fn test_next_active_after_wraps_from_the_top_of_the_seat_range() {
        let mut seats = SeatRegistry::new(255, 50);
        seats.sit(Username::new("alice"), 3, 1000).unwrap();
        seats.sit(Username::new("bob"), 255, 1000).unwrap();
        assert_eq!(seats.next_active_after(255), Some(3));
        assert_eq!(seats.next_active_after(3), Some(255));
    }

    #[test]
    fn test_sole_active_seat() {
        let mut seats = registry();
        seats.sit(Username::new("alice"), 1, 1000).unwrap();
        seats.sit(Username::new("bob"), 2, 1000).unwrap();
        assert_eq!(seats.sole_active_seat(), None);
        seats.get_mut(1).unwrap().is_active_in_hand = false;
        assert_eq!(seats.sole_active_seat(), Some(2));
    }

    #[test]
    fn test_from_seats_drops_duplicates() {
        let mut a = Seat::new(1, Username::new("alice"), 1000);
        a.role = Role::Dealer;
        let b = Seat::new(1, Username::new("bob"), 500);
        let seats = SeatRegistry::from_seats(10, 50, vec![a, b]);
        assert_eq!(seats.len(), 1);
        assert_eq!(seats.get(1).unwrap().username, Username::new("alice"));
    }
}
