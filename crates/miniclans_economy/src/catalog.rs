//! # Kind Catalog
//!
//! Static description of every building and troop kind.
//!
//! ## Loading
//!
//! The catalog is read once at startup from TOML and never mutated again.
//! Kinds are handed out as `Arc`s so buildings and troops can keep a cheap
//! reference to their kind without borrowing the catalog.
//!
//! ```toml
//! [buildings.GOLDMINE]
//! cost_gold = 100.0
//! cost_elixir = 0.0
//! hp = 500.0
//! size = 2
//! max_level = 10
//! production = { resource = "gold", rate = 10.0 }
//!
//! [troops.BARBARIAN]
//! cost_elixir = 50.0
//! training_time = 5.0
//! hp = 100.0
//! damage = 15.0
//! speed = 2.0
//! range = 1.0
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{GameError, GameResult};

/// Catalog shipped with the crate.
const STANDARD_CATALOG: &str = include_str!("../data/catalog.toml");

/// The two currencies of a base.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    /// Spent on most buildings.
    Gold,
    /// Spent on troops and some buildings.
    Elixir,
}

/// A price in both currencies.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Cost {
    /// Gold part.
    pub gold: f64,
    /// Elixir part.
    pub elixir: f64,
}

impl Cost {
    /// Creates a new cost.
    #[must_use]
    pub const fn new(gold: f64, elixir: f64) -> Self {
        Self { gold, elixir }
    }
}

/// Anything that can be bought from a base's ledger.
pub trait Priced {
    /// What it costs.
    fn cost(&self) -> Cost;
}

/// Passive resource generation of a building.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Production {
    /// Which counter the building feeds.
    pub resource: Resource,
    /// Units per second of wall-clock time.
    pub rate: f64,
}

/// Defensive weapon of a building.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    /// Damage per shot.
    pub damage: f32,
    /// Reach in grid units.
    pub range: f32,
    /// Seconds between shots.
    pub attack_interval: f32,
}

/// A building kind.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildingKind {
    /// Catalog name (`GOLDMINE`, `CANNON`, ...).
    pub name: String,
    /// Gold cost.
    pub cost_gold: f64,
    /// Elixir cost.
    pub cost_elixir: f64,
    /// Hit points at level 1.
    pub hp: f32,
    /// Footprint edge length in cells.
    pub size: i32,
    /// Highest reachable level.
    pub max_level: u32,
    /// Resource generation, if any.
    pub production: Option<Production>,
    /// Defensive weapon, if any.
    pub weapon: Option<Weapon>,
}

impl Priced for BuildingKind {
    fn cost(&self) -> Cost {
        Cost::new(self.cost_gold, self.cost_elixir)
    }
}

/// A troop kind.
#[derive(Clone, Debug, PartialEq)]
pub struct TroopKind {
    /// Catalog name (`BARBARIAN`, `ARCHER`).
    pub name: String,
    /// Elixir cost per deployment.
    pub cost_elixir: f64,
    /// Seconds to train. Informational; deployment is instant.
    pub training_time: f32,
    /// Hit points.
    pub hp: f32,
    /// Damage per second while in range.
    pub damage: f32,
    /// Grid units per second.
    pub speed: f32,
    /// Attack reach in grid units.
    pub range: f32,
}

impl Priced for TroopKind {
    fn cost(&self) -> Cost {
        Cost::new(0.0, self.cost_elixir)
    }
}

/// Result of a name lookup that may hit either table.
#[derive(Clone, Debug, PartialEq)]
pub enum KindRef {
    /// A building kind.
    Building(Arc<BuildingKind>),
    /// A troop kind.
    Troop(Arc<TroopKind>),
}

impl KindRef {
    /// Catalog name of the kind.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Building(kind) => &kind.name,
            Self::Troop(kind) => &kind.name,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BuildingSpec {
    cost_gold: f64,
    cost_elixir: f64,
    hp: f32,
    size: i32,
    max_level: u32,
    #[serde(default)]
    production: Option<Production>,
    #[serde(default)]
    weapon: Option<Weapon>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TroopSpec {
    cost_elixir: f64,
    #[serde(default)]
    training_time: f32,
    hp: f32,
    damage: f32,
    speed: f32,
    range: f32,
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    buildings: BTreeMap<String, BuildingSpec>,
    #[serde(default)]
    troops: BTreeMap<String, TroopSpec>,
}

/// Read-only lookup of every kind in the game.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    buildings: BTreeMap<String, Arc<BuildingKind>>,
    troops: BTreeMap<String, Arc<TroopKind>>,
}

impl Catalog {
    /// The catalog shipped with the game.
    ///
    /// # Panics
    ///
    /// Never in practice: the embedded file is checked by the test suite.
    #[must_use]
    pub fn standard() -> Self {
        Self::from_toml_str(STANDARD_CATALOG).expect("embedded catalog is valid")
    }

    /// Parses a catalog from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on malformed TOML, a name used twice, or
    /// stats that make no sense (zero size, zero max level, negative costs).
    pub fn from_toml_str(text: &str) -> GameResult<Self> {
        let file: CatalogFile =
            toml::from_str(text).map_err(|e| GameError::InvalidConfig(e.to_string()))?;

        let mut catalog = Self::default();

        for (name, spec) in file.buildings {
            validate_building(&name, &spec)?;
            let kind = BuildingKind {
                name: name.clone(),
                cost_gold: spec.cost_gold,
                cost_elixir: spec.cost_elixir,
                hp: spec.hp,
                size: spec.size,
                max_level: spec.max_level,
                production: spec.production,
                weapon: spec.weapon,
            };
            catalog.buildings.insert(name, Arc::new(kind));
        }

        for (name, spec) in file.troops {
            if catalog.buildings.contains_key(&name) {
                return Err(GameError::InvalidConfig(format!(
                    "{name} is both a building and a troop"
                )));
            }
            validate_troop(&name, &spec)?;
            let kind = TroopKind {
                name: name.clone(),
                cost_elixir: spec.cost_elixir,
                training_time: spec.training_time,
                hp: spec.hp,
                damage: spec.damage,
                speed: spec.speed,
                range: spec.range,
            };
            catalog.troops.insert(name, Arc::new(kind));
        }

        tracing::debug!(
            buildings = catalog.buildings.len(),
            troops = catalog.troops.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Loads a catalog file from disk.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> GameResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            GameError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Looks up a name in both tables.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` if neither table has the name.
    pub fn kind(&self, name: &str) -> GameResult<KindRef> {
        if let Some(kind) = self.buildings.get(name) {
            return Ok(KindRef::Building(Arc::clone(kind)));
        }
        if let Some(kind) = self.troops.get(name) {
            return Ok(KindRef::Troop(Arc::clone(kind)));
        }
        Err(GameError::UnknownKind(name.to_string()))
    }

    /// Looks up a building kind.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` if there is no such building.
    pub fn building(&self, name: &str) -> GameResult<Arc<BuildingKind>> {
        self.buildings
            .get(name)
            .cloned()
            .ok_or_else(|| GameError::UnknownKind(name.to_string()))
    }

    /// Looks up a troop kind.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` if there is no such troop.
    pub fn troop(&self, name: &str) -> GameResult<Arc<TroopKind>> {
        self.troops
            .get(name)
            .cloned()
            .ok_or_else(|| GameError::UnknownKind(name.to_string()))
    }

    /// All building kinds, sorted by name.
    pub fn buildings(&self) -> impl Iterator<Item = &Arc<BuildingKind>> {
        self.buildings.values()
    }

    /// All troop kinds, sorted by name.
    pub fn troops(&self) -> impl Iterator<Item = &Arc<TroopKind>> {
        self.troops.values()
    }
}

fn validate_building(name: &str, spec: &BuildingSpec) -> GameResult<()> {
    let problem = if spec.size < 1 {
        Some("size must be at least 1")
    } else if spec.max_level < 1 {
        Some("max_level must be at least 1")
    } else if spec.hp <= 0.0 {
        Some("hp must be positive")
    } else if spec.cost_gold < 0.0 || spec.cost_elixir < 0.0 {
        Some("costs must not be negative")
    } else if spec.production.is_some_and(|p| p.rate < 0.0) {
        Some("production rate must not be negative")
    } else if spec
        .weapon
        .is_some_and(|w| w.attack_interval <= 0.0 || w.range < 0.0)
    {
        Some("weapon needs a positive interval and non-negative range")
    } else {
        None
    };

    match problem {
        Some(reason) => Err(GameError::InvalidConfig(format!("building {name}: {reason}"))),
        None => Ok(()),
    }
}

fn validate_troop(name: &str, spec: &TroopSpec) -> GameResult<()> {
    if spec.hp <= 0.0 || spec.cost_elixir < 0.0 || spec.speed < 0.0 || spec.range < 0.0 {
        return Err(GameError::InvalidConfig(format!(
            "troop {name}: hp must be positive and cost, speed, range non-negative"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_loads() {
        let catalog = Catalog::standard();

        let mine = catalog.building("GOLDMINE").unwrap();
        assert_eq!(mine.cost_gold, 100.0);
        assert_eq!(mine.size, 2);
        assert_eq!(
            mine.production,
            Some(Production {
                resource: Resource::Gold,
                rate: 10.0
            })
        );

        let cannon = catalog.building("CANNON").unwrap();
        assert_eq!(cannon.weapon.unwrap().range, 5.0);

        let barbarian = catalog.troop("BARBARIAN").unwrap();
        assert_eq!(barbarian.cost(), Cost::new(0.0, 50.0));
        assert_eq!(catalog.buildings().count(), 5);
        assert_eq!(catalog.troops().count(), 2);
    }

    #[test]
    fn test_kind_lookup_covers_both_tables() {
        let catalog = Catalog::standard();

        assert!(matches!(catalog.kind("ELIXIR"), Ok(KindRef::Building(_))));
        assert!(matches!(catalog.kind("ARCHER"), Ok(KindRef::Troop(_))));
        assert_eq!(catalog.kind("ARCHER").unwrap().name(), "ARCHER");
        assert_eq!(
            catalog.kind("DRAGON"),
            Err(GameError::UnknownKind("DRAGON".to_string()))
        );
        assert!(catalog.building("ARCHER").is_err());
        assert!(catalog.troop("CANNON").is_err());
    }

    #[test]
    fn test_invalid_catalogs_rejected() {
        let zero_size = r#"
            [buildings.WALL]
            cost_gold = 10.0
            cost_elixir = 0.0
            hp = 100.0
            size = 0
            max_level = 3
        "#;
        assert!(matches!(
            Catalog::from_toml_str(zero_size),
            Err(GameError::InvalidConfig(_))
        ));

        let clash = r#"
            [buildings.HUT]
            cost_gold = 10.0
            cost_elixir = 0.0
            hp = 100.0
            size = 1
            max_level = 1

            [troops.HUT]
            cost_elixir = 10.0
            hp = 10.0
            damage = 1.0
            speed = 1.0
            range = 1.0
        "#;
        assert!(Catalog::from_toml_str(clash).is_err());

        assert!(Catalog::from_toml_str("buildings = 3").is_err());
    }
}
