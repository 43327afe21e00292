//! # Mini Clans Economy
//!
//! Building and troop catalog, bases with their resource ledger, and match
//! snapshots.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     ECONOMY CRATE                        │
//! ├──────────────────────────────────────────────────────────┤
//! │  catalog.toml ──> Catalog (Arc<BuildingKind>/TroopKind)  │
//! │                        │                                 │
//! │                        v                                 │
//! │  Base: buildings + gold/elixir                           │
//! │    purchase / check_placement / accrue / upgrade         │
//! │                        │                                 │
//! │                        v                                 │
//! │  MatchSnapshot <──> savegame.json                        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Every fallible operation returns a [`GameError`] and leaves the base as it
//! was. Nothing here panics on bad input.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod base;
pub mod catalog;
pub mod error;
pub mod snapshot;

pub use base::{footprints_overlap, max_hp_for_level, Base, BaseSettings, Building};
pub use catalog::{BuildingKind, Catalog, Cost, KindRef, Priced, Production, Resource, TroopKind, Weapon};
pub use error::{GameError, GameResult, PlacementError};
pub use snapshot::{BaseSnapshot, MatchSnapshot, DEFAULT_SNAPSHOT_FILE};
