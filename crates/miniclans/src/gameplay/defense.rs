//! Building defenses.
//!
//! Every living building with a weapon has a cooldown. At zero it fires one
//! shot at the nearest living troop in range, then waits `attack_interval`
//! seconds. A ready weapon with nothing in range stays ready.

use miniclans_economy::Building;

use super::troop::Troop;

/// One shot fired during a tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shot {
    /// Index of the firing building.
    pub building: usize,
    /// Index of the troop hit, in the roster as it was during the tick.
    pub troop: usize,
    /// Damage dealt.
    pub damage: f32,
    /// The shot killed the troop.
    pub killed: bool,
}

/// Weapon cooldowns of one base, indexed like its buildings.
#[derive(Clone, Debug, Default)]
pub struct Battery {
    cooldowns: Vec<f32>,
}

impl Battery {
    /// Creates a battery with every weapon ready.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining cooldown of a building, zero when ready.
    #[must_use]
    pub fn cooldown(&self, index: usize) -> f32 {
        self.cooldowns.get(index).copied().unwrap_or(0.0)
    }

    /// Forgets every cooldown.
    pub fn reset(&mut self) {
        self.cooldowns.clear();
    }

    /// Advances cooldowns by `dt` and fires every ready weapon.
    pub fn fire(&mut self, dt: f32, buildings: &[Building], troops: &mut [Troop]) -> Vec<Shot> {
        if self.cooldowns.len() < buildings.len() {
            self.cooldowns.resize(buildings.len(), 0.0);
        }

        let mut shots = Vec::new();
        for (index, building) in buildings.iter().enumerate() {
            let Some(weapon) = building.kind().weapon else {
                continue;
            };
            if building.is_destroyed() {
                continue;
            }

            let cooldown = &mut self.cooldowns[index];
            *cooldown = (*cooldown - dt).max(0.0);
            if *cooldown > 0.0 {
                continue;
            }

            let origin = building.position().to_vec2();
            let mut best: Option<(usize, f32)> = None;
            for (i, troop) in troops.iter().enumerate() {
                if troop.is_dead() {
                    continue;
                }
                let d = origin.distance(troop.position());
                if d <= weapon.range && best.map_or(true, |(_, best_d)| d < best_d) {
                    best = Some((i, d));
                }
            }

            if let Some((troop, _)) = best {
                let killed = troops[troop].take_damage(weapon.damage);
                *cooldown = weapon.attack_interval;
                shots.push(Shot {
                    building: index,
                    troop,
                    damage: weapon.damage,
                    killed,
                });
            }
        }
        shots
    }
}
