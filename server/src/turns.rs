use tracing::debug;
use uuid::Uuid;

use turnsweeper_common::models::MAX_PLAYERS;

/// Tracks which connections hold player slots and whose turn it is.
///
/// Slots are numbered densely from 1: a join takes the lowest free number,
/// and a leave renumbers everyone behind the departing player so the range
/// stays 1..=N. `current_turn` always names an occupied slot while any
/// player is connected.
#[derive(Debug, Default)]
pub struct TurnCoordinator {
    // Join order; the slot number of a connection is its index + 1.
    slots: Vec<Uuid>,
    current_turn: u8,
}

impl TurnCoordinator {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            current_turn: 1,
        }
    }

    pub fn player_count(&self) -> u8 {
        self.slots.len() as u8
    }

    pub fn current_turn(&self) -> u8 {
        self.current_turn
    }

    pub fn slot_of(&self, conn: &Uuid) -> Option<u8> {
        self.slots
            .iter()
            .position(|id| id == conn)
            .map(|idx| idx as u8 + 1)
    }

    pub fn is_turn(&self, conn: &Uuid) -> bool {
        self.slot_of(conn) == Some(self.current_turn)
    }

    /// Assigns the lowest free slot number, or `None` when all slots are
    /// taken (the connection stays a spectator).
    pub fn join(&mut self, conn: Uuid) -> Option<u8> {
        if self.player_count() >= MAX_PLAYERS {
            return None;
        }

        self.slots.push(conn);
        let slot = self.player_count();
        debug!("assigned player slot {}", slot);
        Some(slot)
    }

    /// Frees the departing connection's slot and renumbers the remaining
    /// players to keep 1..=N dense. Returns the connections whose slot
    /// number changed, with their new numbers, so the caller can notify
    /// them. Repairs `current_turn` if it pointed at the departing player
    /// or past the shrunken range.
    pub fn leave(&mut self, conn: &Uuid) -> Vec<(Uuid, u8)> {
        let Some(idx) = self.slots.iter().position(|id| id == conn) else {
            return Vec::new();
        };

        let freed_slot = idx as u8 + 1;
        self.slots.remove(idx);

        if freed_slot < self.current_turn {
            // The current player shifted down by one; keep pointing at them.
            self.current_turn -= 1;
        }
        if self.current_turn > self.player_count() {
            self.current_turn = 1;
        }

        self.slots
            .iter()
            .enumerate()
            .skip(idx)
            .map(|(i, id)| (*id, i as u8 + 1))
            .collect()
    }

    /// Cycles to the next occupied slot. Only called after a successful
    /// reveal that neither ended the game nor merely triggered mine
    /// placement.
    pub fn advance(&mut self) {
        if self.player_count() == 0 {
            return;
        }
        self.current_turn = self.current_turn % self.player_count() + 1;
    }

    /// New board, new rotation: slot 1 starts.
    pub fn reset(&mut self) {
        self.current_turn = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator_with(n: usize) -> (TurnCoordinator, Vec<Uuid>) {
        let mut turns = TurnCoordinator::new();
        let conns: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
        for conn in &conns {
            turns.join(*conn);
        }
        (turns, conns)
    }

    #[test]
    fn joins_take_lowest_free_numbers() {
        let mut turns = TurnCoordinator::new();
        assert_eq!(turns.join(Uuid::new_v4()), Some(1));
        assert_eq!(turns.join(Uuid::new_v4()), Some(2));
        assert_eq!(turns.join(Uuid::new_v4()), Some(3));
        assert_eq!(turns.join(Uuid::new_v4()), Some(4));
        assert_eq!(turns.join(Uuid::new_v4()), None);
        assert_eq!(turns.player_count(), 4);
    }

    #[test]
    fn rotation_cycles_through_occupied_slots() {
        let (mut turns, _) = coordinator_with(3);

        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(turns.current_turn());
            turns.advance();
        }
        assert_eq!(seen, vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn leave_renumbers_remaining_players() {
        let (mut turns, conns) = coordinator_with(4);

        let reassigned = turns.leave(&conns[1]);
        assert_eq!(reassigned, vec![(conns[2], 2), (conns[3], 3)]);
        assert_eq!(turns.slot_of(&conns[0]), Some(1));
        assert_eq!(turns.slot_of(&conns[3]), Some(3));
        assert_eq!(turns.slot_of(&conns[1]), None);

        // The freed number is handed to the next join.
        let newcomer = Uuid::new_v4();
        assert_eq!(turns.join(newcomer), Some(4));
    }

    #[test]
    fn current_turn_reassigned_when_holder_leaves() {
        let (mut turns, conns) = coordinator_with(2);
        turns.advance();
        assert_eq!(turns.current_turn(), 2);

        turns.leave(&conns[1]);
        assert_eq!(turns.current_turn(), 1);
        assert_eq!(turns.slot_of(&conns[0]), Some(1));
    }

    #[test]
    fn current_turn_follows_player_shifted_down() {
        let (mut turns, conns) = coordinator_with(3);
        turns.advance();
        turns.advance();
        assert_eq!(turns.current_turn(), 3);

        // Slot 1 leaves; the player who held slot 3 is now slot 2 and it is
        // still their turn.
        turns.leave(&conns[0]);
        assert_eq!(turns.current_turn(), 2);
        assert_eq!(turns.slot_of(&conns[2]), Some(2));
        assert!(turns.is_turn(&conns[2]));
    }

    #[test]
    fn rotation_never_selects_a_freed_slot() {
        let (mut turns, conns) = coordinator_with(4);
        turns.leave(&conns[3]);

        let mut seen = Vec::new();
        for _ in 0..6 {
            turns.advance();
            seen.push(turns.current_turn());
        }
        assert_eq!(seen, vec![2, 3, 1, 2, 3, 1]);
    }

    #[test]
    fn unknown_connection_leave_is_a_no_op() {
        let (mut turns, _) = coordinator_with(2);
        assert!(turns.leave(&Uuid::new_v4()).is_empty());
        assert_eq!(turns.player_count(), 2);
    }
}
