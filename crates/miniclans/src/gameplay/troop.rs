//! # Troops
//!
//! A deployed troop walks straight at the nearest living enemy building and
//! hits it until it falls, then picks the next one.
//!
//! ## Per-tick Update
//!
//! ```text
//! target dead / missing? ──yes──> nearest living building (ties: lowest index)
//!          │                               │ none
//!          v                               v
//!   distance d to target                 idle
//!          │
//!   d <= range ──yes──> damage × dt to target (no clamp)
//!          │ no
//!          v
//!   step min(speed × dt, d) toward target
//! ```
//!
//! The target is an index into the enemy base. Buildings are never removed,
//! so the index stays valid; only its hit points need re-checking.

use std::sync::Arc;

use miniclans_economy::{Building, TroopKind};
use miniclans_shared::Vec2;

/// A deployed troop.
#[derive(Clone, Debug, PartialEq)]
pub struct Troop {
    kind: Arc<TroopKind>,
    position: Vec2,
    hp: f32,
    target: Option<usize>,
}

/// What a troop did during one update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TroopStep {
    /// No living building to attack.
    Idle,
    /// Walked toward its target.
    Moved {
        /// Index of the target building.
        target: usize,
    },
    /// Hit its target.
    Attacked {
        /// Index of the target building.
        target: usize,
        /// The hit took the building to zero or below.
        destroyed: bool,
    },
}

impl Troop {
    /// Creates a troop at full health with no target.
    #[must_use]
    pub fn new(kind: Arc<TroopKind>, position: Vec2) -> Self {
        let hp = kind.hp;
        Self {
            kind,
            position,
            hp,
            target: None,
        }
    }

    /// The troop's kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &Arc<TroopKind> {
        &self.kind
    }

    /// Continuous grid position.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Current hit points.
    #[inline]
    #[must_use]
    pub const fn hp(&self) -> f32 {
        self.hp
    }

    /// Index of the building currently targeted.
    #[inline]
    #[must_use]
    pub const fn target(&self) -> Option<usize> {
        self.target
    }

    /// Dead troops are dropped from their roster at the end of the tick.
    #[inline]
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.hp <= 0.0
    }

    /// Subtracts damage. Returns true if the troop is dead afterwards.
    pub fn take_damage(&mut self, damage: f32) -> bool {
        self.hp -= damage;
        self.is_dead()
    }

    fn target_is_alive(&self, enemy: &[Building]) -> bool {
        self.target
            .and_then(|index| enemy.get(index))
            .is_some_and(|b| !b.is_destroyed())
    }
}

/// Nearest living building to `from`. Ties go to the lowest index.
#[must_use]
pub fn nearest_building(from: Vec2, enemy: &[Building]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, building) in enemy.iter().enumerate() {
        if building.is_destroyed() {
            continue;
        }
        let d = from.distance(building.position().to_vec2());
        // Strict less-than keeps the earliest of equal distances.
        if best.map_or(true, |(_, best_d)| d < best_d) {
            best = Some((index, d));
        }
    }
    best.map(|(index, _)| index)
}

/// Advances one troop by `dt` seconds against the enemy base.
pub fn update(troop: &mut Troop, dt: f32, enemy: &mut [Building]) -> TroopStep {
    if !troop.target_is_alive(enemy) {
        troop.target = nearest_building(troop.position, enemy);
    }
    let Some(target) = troop.target else {
        return TroopStep::Idle;
    };

    let building = &mut enemy[target];
    let goal = building.position().to_vec2();
    let d = troop.position.distance(goal);

    if d <= troop.kind.range {
        let destroyed = building.take_damage(troop.kind.damage * dt);
        return TroopStep::Attacked { target, destroyed };
    }

    // d > range >= 0 here, so d is strictly positive.
    let step = (troop.kind.speed * dt).min(d);
    troop.position += (goal - troop.position) * (step / d);
    TroopStep::Moved { target }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniclans_economy::Catalog;
    use miniclans_shared::GridPos;

    fn barbarian() -> Arc<TroopKind> {
        Catalog::standard().troop("BARBARIAN").unwrap()
    }

    fn buildings(positions: &[(i32, i32)]) -> Vec<Building> {
        let mine = Catalog::standard().building("GOLDMINE").unwrap();
        positions
            .iter()
            .map(|&(x, y)| Building::new(Arc::clone(&mine), GridPos::new(x, y), 1))
            .collect()
    }

    #[test]
    fn test_targets_nearest_with_earliest_tie() {
        let enemy = buildings(&[(10, 0), (0, 4), (4, 0)]);
        // (0,4) and (4,0) are both 4 away; index 1 wins.
        assert_eq!(nearest_building(Vec2::ZERO, &enemy), Some(1));
    }

    #[test]
    fn test_walks_then_attacks() {
        let mut enemy = buildings(&[(5, 0)]);
        let mut troop = Troop::new(barbarian(), Vec2::ZERO);

        assert_eq!(update(&mut troop, 1.0, &mut enemy), TroopStep::Moved { target: 0 });
        assert_eq!(troop.position(), Vec2::new(2.0, 0.0));

        update(&mut troop, 1.0, &mut enemy);
        assert_eq!(troop.position(), Vec2::new(4.0, 0.0));

        let step = update(&mut troop, 0.5, &mut enemy);
        assert_eq!(step, TroopStep::Attacked { target: 0, destroyed: false });
        assert_eq!(enemy[0].hp(), 500.0 - 7.5);
        assert_eq!(troop.position(), Vec2::new(4.0, 0.0));
    }

    #[test]
    fn test_step_does_not_overshoot() {
        let archer = Catalog::standard().troop("ARCHER").unwrap();
        let mut enemy = buildings(&[(6, 0)]);
        let mut troop = Troop::new(archer, Vec2::new(1.0, 0.0));
        // Archer range 4: distance 5, one long step lands on the target.
        update(&mut troop, 10.0, &mut enemy);
        assert_eq!(troop.position(), Vec2::new(6.0, 0.0));
    }

    #[test]
    fn test_retargets_after_destroying() {
        let mut enemy = buildings(&[(1, 0), (3, 0)]);
        let mut troop = Troop::new(barbarian(), Vec2::ZERO);

        let step = update(&mut troop, 100.0, &mut enemy);
        assert_eq!(step, TroopStep::Attacked { target: 0, destroyed: true });
        assert!(enemy[0].hp() < 0.0);

        assert_eq!(update(&mut troop, 0.5, &mut enemy), TroopStep::Moved { target: 1 });
        assert_eq!(troop.target(), Some(1));
    }

    #[test]
    fn test_idle_without_living_buildings() {
        let mut enemy = buildings(&[(2, 2)]);
        enemy[0].take_damage(1000.0);
        let mut troop = Troop::new(barbarian(), Vec2::new(1.0, 1.0));

        for _ in 0..10 {
            assert_eq!(update(&mut troop, 0.1, &mut enemy), TroopStep::Idle);
        }
        assert_eq!(troop.position(), Vec2::new(1.0, 1.0));
        assert_eq!(enemy[0].hp(), -500.0);
    }

    #[test]
    fn test_coincident_troop_attacks_without_moving() {
        let mut enemy = buildings(&[(3, 3)]);
        let mut troop = Troop::new(barbarian(), Vec2::new(3.0, 3.0));

        let step = update(&mut troop, 1.0, &mut enemy);
        assert_eq!(step, TroopStep::Attacked { target: 0, destroyed: false });
        assert_eq!(troop.position(), Vec2::new(3.0, 3.0));
        assert!(troop.position().x.is_finite());
        assert_eq!(enemy[0].hp(), 485.0);
    }
}
