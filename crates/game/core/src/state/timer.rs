//! Per-creature action point bookkeeping.
//!
//! The scheduler consults the timer before stepping or attacking in
//! turn-based mode and tells it when turns end, but never inspects the
//! numbers directly.

/// Action points and per-turn flags for one creature.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionTimer {
    /// Points available for the rest of the current turn.
    pub action_points: u32,
    /// Points restored at the end of every turn.
    pub max_action_points: u32,
    /// Reactive attacks still available this round.
    pub reactions_left: u32,
    /// Reactive attacks granted per round.
    pub reactions_per_round: u32,
    waited: bool,
}

impl ActionTimer {
    pub fn new(max_action_points: u32) -> Self {
        Self {
            action_points: max_action_points,
            max_action_points,
            reactions_left: 1,
            reactions_per_round: 1,
            waited: false,
        }
    }

    #[must_use]
    pub fn with_reactions(mut self, per_round: u32) -> Self {
        self.reactions_per_round = per_round;
        self.reactions_left = per_round;
        self
    }

    pub fn can_perform_action(&self, cost: u32) -> bool {
        self.action_points >= cost
    }

    /// Pays the cost of entering a cell. Returns false and leaves the
    /// timer untouched if the creature cannot afford it.
    pub fn spend_move(&mut self, cost: u32) -> bool {
        self.spend(cost)
    }

    pub fn spend(&mut self, cost: u32) -> bool {
        if !self.can_perform_action(cost) {
            return false;
        }
        self.action_points -= cost;
        true
    }

    /// Closes the creature's turn: points are refilled for its next turn
    /// and the wait flag is cleared.
    pub fn end_turn(&mut self) {
        self.action_points = self.max_action_points;
        self.waited = false;
    }

    /// Full reset used when combat starts or ends.
    pub fn reset(&mut self) {
        self.action_points = self.max_action_points;
        self.reactions_left = self.reactions_per_round;
        self.waited = false;
    }

    pub fn wait_turn(&mut self) {
        self.waited = true;
    }

    pub fn is_waited_once(&self) -> bool {
        self.waited
    }

    pub fn has_reaction(&self) -> bool {
        self.reactions_left > 0
    }

    pub fn consume_reaction(&mut self) -> bool {
        if self.reactions_left == 0 {
            return false;
        }
        self.reactions_left -= 1;
        true
    }

    pub fn refresh_reactions(&mut self) {
        self.reactions_left = self.reactions_per_round;
    }
}

impl Default for ActionTimer {
    fn default() -> Self {
        Self::new(6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spend_rejects_when_short() {
        let mut timer = ActionTimer::new(3);
        assert!(timer.spend_move(2));
        assert!(!timer.spend_move(2));
        assert_eq!(timer.action_points, 1);
    }

    #[test]
    fn end_turn_refills_and_clears_wait() {
        let mut timer = ActionTimer::new(4);
        timer.spend(4);
        timer.wait_turn();
        assert!(timer.is_waited_once());

        timer.end_turn();
        assert_eq!(timer.action_points, 4);
        assert!(!timer.is_waited_once());
    }

    #[test]
    fn reactions_are_per_round() {
        let mut timer = ActionTimer::new(4).with_reactions(2);
        assert!(timer.consume_reaction());
        assert!(timer.consume_reaction());
        assert!(!timer.consume_reaction());

        timer.refresh_reactions();
        assert!(timer.has_reaction());
    }
}
