//! # Gameplay Systems
//!
//! Autonomous troops and building defenses. Both work on plain slices so
//! the match can hand them one roster and the opposing base at a time.

pub mod defense;
pub mod troop;

pub use defense::{Battery, Shot};
pub use troop::{update, Troop, TroopStep};
