//! # Bases
//!
//! A base owns its buildings and its resource ledger.
//!
//! ## Building Lifecycle
//!
//! ```text
//! purchase + place ──┐
//!                    ├──> [alive: hp > 0] ──take_damage──> [destroyed: hp <= 0]
//! remote / snapshot ─┘          │                                  │
//!                          upgrade (heal)                 stays in the roster
//! ```
//!
//! Buildings are never removed. A destroyed building keeps its index and its
//! footprint so troop targets (indices) and placement checks stay stable.

use std::sync::Arc;
use std::time::Instant;

use miniclans_shared::constants::{
    GRID_HEIGHT, GRID_WIDTH, STARTING_ELIXIR, STARTING_GOLD, TOWN_HALL, TOWN_HALL_POSITION,
    UPGRADE_HP_FACTOR,
};
use miniclans_shared::{BuildingRecord, GridPos};

use crate::catalog::{BuildingKind, Catalog, Cost, Priced, Resource};
use crate::error::{GameError, GameResult, PlacementError};
use crate::snapshot::BaseSnapshot;

/// Max hit points of a kind at the given level.
///
/// Level 1 is the kind's base hp; each further level applies
/// `round(previous × 1.2)`, the same rule `upgrade` uses.
#[must_use]
pub fn max_hp_for_level(kind: &BuildingKind, level: u32) -> f32 {
    let mut hp = kind.hp;
    for _ in 1..level {
        hp = (hp * UPGRADE_HP_FACTOR).round();
    }
    hp
}

/// Two square footprints intersect with positive area.
///
/// Half-open intervals: `a.x + a_size == b.x` touches but does not overlap.
/// Edges are computed in `i64`, so cells near `i32::MAX` cannot wrap.
#[must_use]
pub const fn footprints_overlap(a: GridPos, a_size: i32, b: GridPos, b_size: i32) -> bool {
    let (ax, ay, asz) = (a.x as i64, a.y as i64, a_size as i64);
    let (bx, by, bsz) = (b.x as i64, b.y as i64, b_size as i64);
    !(ax + asz <= bx || bx + bsz <= ax || ay + asz <= by || by + bsz <= ay)
}

/// Footprint lies inside a `width` x `height` grid. Computed in `i64`.
const fn footprint_in_bounds(position: GridPos, size: i32, width: i32, height: i32) -> bool {
    let (x, y, size) = (position.x as i64, position.y as i64, size as i64);
    x >= 0 && y >= 0 && x + size <= width as i64 && y + size <= height as i64
}

/// A placed building.
#[derive(Clone, Debug, PartialEq)]
pub struct Building {
    kind: Arc<BuildingKind>,
    position: GridPos,
    level: u32,
    hp: f32,
    max_hp: f32,
}

impl Building {
    /// Creates a building at full health for its level.
    #[must_use]
    pub fn new(kind: Arc<BuildingKind>, position: GridPos, level: u32) -> Self {
        let level = level.clamp(1, kind.max_level);
        let max_hp = max_hp_for_level(&kind, level);
        Self {
            kind,
            position,
            level,
            hp: max_hp,
            max_hp,
        }
    }

    /// Rebuilds a building from a wire or snapshot record.
    ///
    /// The record's hp is kept as-is; it is trusted data.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` if the record names a kind the catalog lacks.
    pub fn from_record(record: &BuildingRecord, catalog: &Catalog) -> GameResult<Self> {
        let kind = catalog.building(&record.kind)?;
        let mut building = Self::new(kind, record.position, record.level);
        building.hp = record.hp;
        Ok(building)
    }

    /// The record sent to the peer and written to snapshots.
    #[must_use]
    pub fn to_record(&self) -> BuildingRecord {
        BuildingRecord {
            kind: self.kind.name.clone(),
            position: self.position,
            level: self.level,
            hp: self.hp,
        }
    }

    /// The building's kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &Arc<BuildingKind> {
        &self.kind
    }

    /// Top-left footprint cell.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> GridPos {
        self.position
    }

    /// Footprint edge length.
    #[inline]
    #[must_use]
    pub fn size(&self) -> i32 {
        self.kind.size
    }

    /// Current level.
    #[inline]
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Current hit points. Can be negative after overkill.
    #[inline]
    #[must_use]
    pub const fn hp(&self) -> f32 {
        self.hp
    }

    /// Max hit points at the current level.
    #[inline]
    #[must_use]
    pub const fn max_hp(&self) -> f32 {
        self.max_hp
    }

    /// Destroyed buildings stay in the base but do nothing.
    #[inline]
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.hp <= 0.0
    }

    /// Subtracts damage without clamping. Returns true if the building is
    /// destroyed afterwards.
    pub fn take_damage(&mut self, damage: f32) -> bool {
        self.hp -= damage;
        self.is_destroyed()
    }

    /// Raises the level by one and heals to the new max.
    fn upgrade(&mut self) -> bool {
        if self.level >= self.kind.max_level {
            return false;
        }
        self.level += 1;
        self.max_hp = (self.max_hp * UPGRADE_HP_FACTOR).round();
        self.hp = self.max_hp;
        true
    }
}

/// Starting conditions for a base.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BaseSettings {
    /// Gold on creation.
    pub starting_gold: f64,
    /// Elixir on creation.
    pub starting_elixir: f64,
    /// Grid width in cells.
    pub grid_width: i32,
    /// Grid height in cells.
    pub grid_height: i32,
}

impl Default for BaseSettings {
    fn default() -> Self {
        Self {
            starting_gold: STARTING_GOLD,
            starting_elixir: STARTING_ELIXIR,
            grid_width: GRID_WIDTH,
            grid_height: GRID_HEIGHT,
        }
    }
}

/// One player's base: buildings plus resource ledger.
#[derive(Clone, Debug)]
pub struct Base {
    buildings: Vec<Building>,
    gold: f64,
    elixir: f64,
    last_accrual: Instant,
    settings: BaseSettings,
}

impl Base {
    /// Creates a base with no buildings.
    #[must_use]
    pub fn empty(settings: BaseSettings, now: Instant) -> Self {
        Self {
            buildings: Vec::with_capacity(16),
            gold: settings.starting_gold,
            elixir: settings.starting_elixir,
            last_accrual: now,
            settings,
        }
    }

    /// Creates a fresh base with its town hall.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` if the catalog has no town hall.
    pub fn new(catalog: &Catalog, settings: BaseSettings, now: Instant) -> GameResult<Self> {
        let mut base = Self::empty(settings, now);
        let town_hall = catalog.building(TOWN_HALL)?;
        base.add_building(town_hall, TOWN_HALL_POSITION.into(), 1);
        Ok(base)
    }

    /// Rebuilds a base from a snapshot. Accrual restarts at `now`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` if a building names a kind the catalog lacks.
    pub fn from_snapshot(
        snapshot: &BaseSnapshot,
        catalog: &Catalog,
        settings: BaseSettings,
        now: Instant,
    ) -> GameResult<Self> {
        let buildings = snapshot
            .buildings
            .iter()
            .map(|record| Building::from_record(record, catalog))
            .collect::<GameResult<Vec<_>>>()?;

        Ok(Self {
            buildings,
            gold: snapshot.gold,
            elixir: snapshot.elixir,
            last_accrual: now,
            settings,
        })
    }

    /// Flat snapshot of buildings and ledger.
    #[must_use]
    pub fn to_snapshot(&self) -> BaseSnapshot {
        BaseSnapshot {
            buildings: self.buildings.iter().map(Building::to_record).collect(),
            gold: self.gold,
            elixir: self.elixir,
        }
    }

    /// Buildings in creation order.
    #[inline]
    #[must_use]
    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    /// Mutable access for damage resolution.
    #[inline]
    pub fn buildings_mut(&mut self) -> &mut [Building] {
        &mut self.buildings
    }

    /// Gold on hand. Call `accrue_resources` first for an up-to-date value.
    #[inline]
    #[must_use]
    pub const fn gold(&self) -> f64 {
        self.gold
    }

    /// Elixir on hand. Call `accrue_resources` first for an up-to-date value.
    #[inline]
    #[must_use]
    pub const fn elixir(&self) -> f64 {
        self.elixir
    }

    /// Grid and starting settings of this base.
    #[inline]
    #[must_use]
    pub const fn settings(&self) -> BaseSettings {
        self.settings
    }

    /// True if both counters cover the price.
    #[must_use]
    pub fn can_afford<K: Priced + ?Sized>(&self, kind: &K) -> bool {
        let cost = kind.cost();
        self.gold >= cost.gold && self.elixir >= cost.elixir
    }

    /// Debits both counters, or nothing at all.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFunds` and leaves the ledger untouched if either
    /// counter is short.
    pub fn purchase<K: Priced + ?Sized>(&mut self, kind: &K) -> GameResult<()> {
        let Cost { gold, elixir } = kind.cost();
        if !self.can_afford(kind) {
            return Err(GameError::InsufficientFunds {
                need_gold: gold,
                need_elixir: elixir,
                have_gold: self.gold,
                have_elixir: self.elixir,
            });
        }
        self.gold -= gold;
        self.elixir -= elixir;
        Ok(())
    }

    /// Placement check with the reason for refusal.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPlacement` if the footprint leaves the grid or
    /// overlaps any building, destroyed ones included.
    pub fn check_placement(&self, position: GridPos, size: i32) -> GameResult<()> {
        let BaseSettings {
            grid_width: width,
            grid_height: height,
            ..
        } = self.settings;

        let reason = if !footprint_in_bounds(position, size, width, height) {
            Some(PlacementError::OutOfBounds { width, height })
        } else {
            self.buildings
                .iter()
                .position(|b| footprints_overlap(position, size, b.position, b.size()))
                .map(|index| PlacementError::Overlap { index })
        };

        match reason {
            Some(reason) => Err(GameError::InvalidPlacement {
                x: position.x,
                y: position.y,
                reason,
            }),
            None => Ok(()),
        }
    }

    /// True if a footprint of `size` fits at `position`.
    #[must_use]
    pub fn can_place(&self, position: GridPos, size: i32) -> bool {
        self.check_placement(position, size).is_ok()
    }

    /// Appends a building at full health. No validation: callers check
    /// funds and placement first, or are ingesting trusted remote data.
    pub fn add_building(&mut self, kind: Arc<BuildingKind>, position: GridPos, level: u32) {
        self.buildings.push(Building::new(kind, position, level));
    }

    /// Appends a building described by a record, keeping its hp.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` without touching the base if the record names a
    /// kind the catalog lacks.
    pub fn add_building_record(&mut self, record: &BuildingRecord, catalog: &Catalog) -> GameResult<()> {
        let building = Building::from_record(record, catalog)?;
        self.buildings.push(building);
        Ok(())
    }

    /// Credits production since the last accrual.
    ///
    /// Uses wall-clock time so the result does not depend on frame rate.
    /// An instant before the last accrual credits nothing.
    pub fn accrue_resources(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_accrual).as_secs_f64();
        if now > self.last_accrual {
            self.last_accrual = now;
        }
        if elapsed <= 0.0 {
            return;
        }

        for building in &self.buildings {
            if building.is_destroyed() {
                continue;
            }
            if let Some(production) = building.kind.production {
                let amount = production.rate * elapsed;
                match production.resource {
                    Resource::Gold => self.gold += amount,
                    Resource::Elixir => self.elixir += amount,
                }
            }
        }
    }

    /// Upgrades one building by a level and fully heals it.
    ///
    /// # Errors
    ///
    /// Returns `BuildingNotFound` for a bad index and `MaxLevelReached` if
    /// the building cannot go higher.
    pub fn upgrade(&mut self, index: usize) -> GameResult<()> {
        let building = self
            .buildings
            .get_mut(index)
            .ok_or(GameError::BuildingNotFound(index))?;

        if building.upgrade() {
            tracing::debug!(
                index,
                kind = %building.kind.name,
                level = building.level,
                max_hp = building.max_hp,
                "building upgraded"
            );
            Ok(())
        } else {
            Err(GameError::MaxLevelReached {
                index,
                max_level: building.kind.max_level,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fresh_base() -> (Catalog, Base, Instant) {
        let catalog = Catalog::standard();
        let now = Instant::now();
        let base = Base::new(&catalog, BaseSettings::default(), now).unwrap();
        (catalog, base, now)
    }

    #[test]
    fn test_new_base_has_town_hall() {
        let (_, base, _) = fresh_base();
        assert_eq!(base.buildings().len(), 1);
        assert_eq!(base.buildings()[0].kind().name, "TOWNHALL");
        assert_eq!(base.buildings()[0].position(), GridPos::new(7, 7));
        assert_eq!(base.gold(), 1000.0);
        assert_eq!(base.elixir(), 1000.0);
    }

    #[test]
    fn test_purchase_is_all_or_nothing() {
        let (catalog, mut base, _) = fresh_base();
        let storage = catalog.building("STORAGE").unwrap();

        assert!(base.purchase(storage.as_ref()).is_ok());
        assert_eq!(base.gold(), 850.0);
        assert_eq!(base.elixir(), 850.0);

        // Drain gold only; elixir alone must not be debited.
        let cannon = catalog.building("CANNON").unwrap();
        for _ in 0..4 {
            base.purchase(cannon.as_ref()).unwrap();
        }
        assert_eq!(base.gold(), 50.0);

        let err = base.purchase(storage.as_ref()).unwrap_err();
        assert!(matches!(err, GameError::InsufficientFunds { .. }));
        assert_eq!(base.gold(), 50.0);
        assert_eq!(base.elixir(), 850.0);
    }

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let a = GridPos::new(0, 0);
        assert!(!footprints_overlap(a, 2, GridPos::new(2, 0), 2));
        assert!(!footprints_overlap(a, 2, GridPos::new(0, 2), 2));
        assert!(footprints_overlap(a, 2, GridPos::new(1, 1), 2));
        assert!(footprints_overlap(GridPos::new(1, 1), 1, a, 3));
    }

    #[test]
    fn test_placement_reasons() {
        let (_, base, _) = fresh_base();

        assert!(base.can_place(GridPos::new(0, 0), 2));
        assert!(base.can_place(GridPos::new(13, 13), 2));
        assert!(!base.can_place(GridPos::new(14, 0), 2));
        assert!(!base.can_place(GridPos::new(-1, 3), 2));

        // Town hall covers (7..10, 7..10).
        assert_eq!(
            base.check_placement(GridPos::new(6, 6), 2),
            Err(GameError::InvalidPlacement {
                x: 6,
                y: 6,
                reason: PlacementError::Overlap { index: 0 },
            })
        );
        assert!(base.can_place(GridPos::new(5, 7), 2));
        assert!(base.can_place(GridPos::new(10, 7), 2));
    }

    #[test]
    fn test_extreme_cells_are_out_of_bounds() {
        let (_, base, _) = fresh_base();
        let out = Err(GameError::InvalidPlacement {
            x: i32::MAX,
            y: 0,
            reason: PlacementError::OutOfBounds {
                width: 15,
                height: 15,
            },
        });

        assert_eq!(base.check_placement(GridPos::new(i32::MAX, 0), 2), out);
        assert!(!base.can_place(GridPos::new(0, i32::MAX), 3));
        assert!(!base.can_place(GridPos::new(i32::MIN, 0), 2));
        assert!(!base.can_place(GridPos::new(i32::MAX - 1, i32::MAX - 1), 2));

        let far = GridPos::new(i32::MAX, i32::MAX);
        assert!(footprints_overlap(far, 2, far, 2));
        assert!(!footprints_overlap(far, 2, GridPos::new(0, 0), 2));
        assert!(!footprints_overlap(GridPos::new(i32::MIN, 0), 2, GridPos::new(0, 0), 2));
    }

    #[test]
    fn test_destroyed_building_keeps_footprint_and_stops_producing() {
        let (catalog, mut base, now) = fresh_base();
        let mine = catalog.building("GOLDMINE").unwrap();
        base.add_building(mine, GridPos::new(0, 0), 1);

        assert!(base.buildings_mut()[1].take_damage(10_000.0));
        assert!(base.buildings()[1].hp() < 0.0);
        assert!(!base.can_place(GridPos::new(1, 1), 1));

        base.accrue_resources(now + Duration::from_secs(10));
        assert_eq!(base.gold(), 1000.0);
        assert_eq!(base.buildings().len(), 2);
    }

    #[test]
    fn test_accrual_uses_elapsed_wall_clock() {
        let (catalog, mut base, now) = fresh_base();
        base.add_building(catalog.building("GOLDMINE").unwrap(), GridPos::new(0, 0), 1);
        base.add_building(catalog.building("ELIXIR").unwrap(), GridPos::new(2, 0), 1);

        base.accrue_resources(now + Duration::from_millis(2500));
        assert!((base.gold() - 1025.0).abs() < 1e-6);
        assert!((base.elixir() - 1025.0).abs() < 1e-6);

        // Going backwards credits nothing and does not rewind.
        base.accrue_resources(now);
        assert!((base.gold() - 1025.0).abs() < 1e-6);
    }

    #[test]
    fn test_upgrade_until_max_level() {
        let (_, mut base, _) = fresh_base();
        // Town hall: max level 5, 2000 hp.
        let mut expected = 2000.0_f32;
        let mut successes = 0;
        for _ in 0..5 {
            match base.upgrade(0) {
                Ok(()) => {
                    successes += 1;
                    expected = (expected * 1.2).round();
                    assert_eq!(base.buildings()[0].max_hp(), expected);
                    assert_eq!(base.buildings()[0].hp(), expected);
                }
                Err(e) => assert_eq!(e, GameError::MaxLevelReached { index: 0, max_level: 5 }),
            }
        }
        assert_eq!(successes, 4);
        assert_eq!(base.buildings()[0].level(), 5);
        assert_eq!(base.upgrade(9), Err(GameError::BuildingNotFound(9)));
    }

    #[test]
    fn test_upgrade_heals_damaged_building() {
        let (_, mut base, _) = fresh_base();
        base.buildings_mut()[0].take_damage(1500.0);
        base.upgrade(0).unwrap();
        assert_eq!(base.buildings()[0].hp(), 2400.0);
    }

    #[test]
    fn test_level_hp_matches_upgrade_rule() {
        let catalog = Catalog::standard();
        let mine = catalog.building("GOLDMINE").unwrap();
        assert_eq!(max_hp_for_level(&mine, 1), 500.0);
        assert_eq!(max_hp_for_level(&mine, 2), 600.0);
        assert_eq!(max_hp_for_level(&mine, 3), 720.0);

        let building = Building::new(mine, GridPos::new(0, 0), 3);
        assert_eq!(building.hp(), 720.0);
    }

    #[test]
    fn test_record_with_unknown_kind_leaves_base_alone() {
        let (catalog, mut base, _) = fresh_base();
        let record = BuildingRecord {
            kind: "WIZARD_TOWER".to_string(),
            position: GridPos::new(0, 0),
            level: 1,
            hp: 100.0,
        };
        assert_eq!(
            base.add_building_record(&record, &catalog),
            Err(GameError::UnknownKind("WIZARD_TOWER".to_string()))
        );
        assert_eq!(base.buildings().len(), 1);
    }
}
