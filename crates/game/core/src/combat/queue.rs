use crate::state::EntityId;

/// Combatants in initiative order plus the index of the active slot.
///
/// `current` is `None` before the first turn of combat.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurnQueue {
    order: Vec<EntityId>,
    current: Option<usize>,
}

impl TurnQueue {
    pub fn new(order: Vec<EntityId>) -> Self {
        Self {
            order,
            current: None,
        }
    }

    pub fn order(&self) -> &[EntityId] {
        &self.order
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<EntityId> {
        self.current.and_then(|index| self.order.get(index).copied())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.order.contains(&id)
    }

    pub fn position(&self, id: EntityId) -> Option<usize> {
        self.order.iter().position(|entry| *entry == id)
    }

    /// Appends a late joiner; it acts at the end of the current round.
    pub fn push(&mut self, id: EntityId) {
        if !self.contains(id) {
            self.order.push(id);
        }
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.current = None;
    }

    /// Moves to the next slot. Returns the creature there and whether the
    /// index wrapped past the end of the order.
    pub fn advance(&mut self) -> Option<(EntityId, bool)> {
        if self.order.is_empty() {
            return None;
        }

        let (next, wrapped) = match self.current {
            None => (0, false),
            Some(index) if index + 1 >= self.order.len() => (0, true),
            Some(index) => (index + 1, false),
        };
        self.current = Some(next);
        Some((self.order[next], wrapped))
    }

    /// Moves `id` behind the `slots`-th eligible creature that follows it,
    /// counted cyclically, and rewinds `current` so the next
    /// [`advance`](Self::advance) lands on the creature that originally
    /// followed `id`.
    ///
    /// `slots` is clamped to the number of other eligible creatures, so a
    /// creature can never end up behind its own previous slot. Returns the
    /// creature it now acts after, or `None` if nobody else is eligible.
    pub fn postpone(
        &mut self,
        id: EntityId,
        slots: usize,
        eligible: impl Fn(EntityId) -> bool,
    ) -> Option<EntityId> {
        let from = self.position(id)?;
        let len = self.order.len();

        let others: Vec<EntityId> = (1..len)
            .map(|offset| self.order[(from + offset) % len])
            .filter(|other| eligible(*other))
            .collect();
        if others.is_empty() {
            return None;
        }

        let anchor = others[slots.clamp(1, others.len()) - 1];
        let follower = self.order[(from + 1) % len];
        let was_last = from + 1 == len;

        self.order.remove(from);
        let anchor_index = self.position(anchor)?;
        self.order.insert(anchor_index + 1, id);

        self.current = if was_last {
            Some(len - 1)
        } else {
            self.position(follower)?.checked_sub(1)
        };

        Some(anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u32]) -> Vec<EntityId> {
        raw.iter().copied().map(EntityId).collect()
    }

    #[test]
    fn advance_wraps_and_reports_it() {
        let mut queue = TurnQueue::new(ids(&[1, 2]));
        assert_eq!(queue.advance(), Some((EntityId(1), false)));
        assert_eq!(queue.advance(), Some((EntityId(2), false)));
        assert_eq!(queue.advance(), Some((EntityId(1), true)));
        assert!(TurnQueue::default().advance().is_none());
    }

    #[test]
    fn postpone_moves_behind_nth_eligible() {
        let mut queue = TurnQueue::new(ids(&[1, 2, 3, 4]));
        queue.advance();

        let anchor = queue.postpone(EntityId(1), 2, |_| true);
        assert_eq!(anchor, Some(EntityId(3)));
        assert_eq!(queue.order(), ids(&[2, 3, 1, 4]).as_slice());
        assert_eq!(queue.advance(), Some((EntityId(2), false)));
        assert_eq!(queue.advance(), Some((EntityId(3), false)));
        assert_eq!(queue.advance(), Some((EntityId(1), false)));
    }

    #[test]
    fn postpone_skips_ineligible_creatures_when_counting() {
        let mut queue = TurnQueue::new(ids(&[1, 2, 3, 4]));
        queue.advance();

        queue.postpone(EntityId(1), 1, |id| id != EntityId(2));
        assert_eq!(queue.order(), ids(&[2, 3, 1, 4]).as_slice());
        assert_eq!(queue.advance(), Some((EntityId(2), false)));
    }

    #[test]
    fn postpone_is_clamped_to_one_cycle() {
        let mut queue = TurnQueue::new(ids(&[1, 2, 3]));
        queue.advance();
        queue.advance();

        let anchor = queue.postpone(EntityId(2), 10, |_| true);
        assert_eq!(anchor, Some(EntityId(1)));
        assert_eq!(queue.order(), ids(&[1, 2, 3]).as_slice());
        assert_eq!(queue.advance(), Some((EntityId(3), false)));
        assert_eq!(queue.advance(), Some((EntityId(1), true)));
        assert_eq!(queue.advance(), Some((EntityId(2), false)));
    }

    #[test]
    fn postpone_from_last_slot_wraps_to_next_round() {
        let mut queue = TurnQueue::new(ids(&[1, 2, 3]));
        for _ in 0..3 {
            queue.advance();
        }

        queue.postpone(EntityId(3), 1, |_| true);
        assert_eq!(queue.order(), ids(&[1, 3, 2]).as_slice());
        assert_eq!(queue.advance(), Some((EntityId(1), true)));
        assert_eq!(queue.advance(), Some((EntityId(3), false)));
    }

    #[test]
    fn lone_creature_cannot_postpone() {
        let mut queue = TurnQueue::new(ids(&[1, 2]));
        queue.advance();
        assert_eq!(queue.postpone(EntityId(1), 1, |id| id == EntityId(1)), None);
        assert_eq!(queue.current(), Some(EntityId(1)));
    }
}
