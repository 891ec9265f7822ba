//! Game-rule collaborators the scheduler consults but does not implement.

use crate::state::{Area, Creature, EntityId};

/// Decides whether one creature perceives another.
pub trait VisibilityOracle {
    fn can_see(&self, area: &Area, observer: &Creature, target: &Creature) -> bool;
}

impl<T: VisibilityOracle + ?Sized> VisibilityOracle for Box<T> {
    fn can_see(&self, area: &Area, observer: &Creature, target: &Creature) -> bool {
        (**self).can_see(area, observer, target)
    }
}

/// Line of sight reduced to the observer's sight radius.
#[derive(Clone, Copy, Debug, Default)]
pub struct SightRadius;

impl VisibilityOracle for SightRadius {
    fn can_see(&self, _area: &Area, observer: &Creature, target: &Creature) -> bool {
        observer.position.distance(target.position) <= observer.sight
    }
}

/// Resolves attacks. Damage rules live behind this trait.
pub trait AttackResolver {
    /// Decision hook consulted before an AI creature takes a reactive
    /// attack. Defaults to always attacking.
    fn wants_reactive_attack(&self, _area: &Area, _attacker: EntityId, _target: EntityId) -> bool {
        true
    }

    fn resolve_attack(&mut self, area: &mut Area, attacker: EntityId, target: EntityId);
}

impl<T: AttackResolver + ?Sized> AttackResolver for Box<T> {
    fn wants_reactive_attack(&self, area: &Area, attacker: EntityId, target: EntityId) -> bool {
        (**self).wants_reactive_attack(area, attacker, target)
    }

    fn resolve_attack(&mut self, area: &mut Area, attacker: EntityId, target: EntityId) {
        (**self).resolve_attack(area, attacker, target);
    }
}

/// Resolver that records attacks without applying damage.
#[derive(Clone, Debug, Default)]
pub struct RecordingResolver {
    pub attacks: Vec<(EntityId, EntityId)>,
}

impl AttackResolver for RecordingResolver {
    fn resolve_attack(&mut self, _area: &mut Area, attacker: EntityId, target: EntityId) {
        self.attacks.push((attacker, target));
    }
}

/// Every hit takes a fixed number of hit points; creatures at zero or below
/// are dying, at the negative of `death_threshold` they are dead.
#[derive(Clone, Copy, Debug)]
pub struct FlatDamage {
    pub damage: i32,
    pub death_threshold: i32,
}

impl Default for FlatDamage {
    fn default() -> Self {
        Self {
            damage: 4,
            death_threshold: 10,
        }
    }
}

impl AttackResolver for FlatDamage {
    fn resolve_attack(&mut self, area: &mut Area, _attacker: EntityId, target: EntityId) {
        let Some(victim) = area.creature_mut(target) else {
            return;
        };
        if victim.is_dead() {
            return;
        }

        victim.hit_points -= self.damage;
        if victim.hit_points <= -self.death_threshold {
            victim.kill();
        } else if victim.hit_points <= 0 {
            victim.life = crate::state::LifeState::Dying;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Controller, Faction, LifeState, Position};

    #[test]
    fn flat_damage_walks_through_dying_to_dead() {
        let mut area = Area::new().with_creature(Creature::new(
            EntityId(1),
            "pc",
            Faction::Player,
            Controller::Player,
            Position::ORIGIN,
        ));
        let mut resolver = FlatDamage {
            damage: 6,
            death_threshold: 5,
        };

        resolver.resolve_attack(&mut area, EntityId(2), EntityId(1));
        assert_eq!(area.creature(EntityId(1)).unwrap().life, LifeState::Alive);

        resolver.resolve_attack(&mut area, EntityId(2), EntityId(1));
        assert_eq!(area.creature(EntityId(1)).unwrap().life, LifeState::Dying);

        resolver.resolve_attack(&mut area, EntityId(2), EntityId(1));
        assert_eq!(area.creature(EntityId(1)).unwrap().life, LifeState::Dead);
    }
}
