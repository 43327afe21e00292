//! # Mini Clans Shared
//!
//! Common types used by both peers of a match.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER do I/O or hold simulation state. Everything here is
//! plain data: grid math, balance constants, and the records that cross the
//! wire or land in a snapshot file.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;
pub mod protocol;

pub use constants::{
    DEFAULT_HOST, DEFAULT_PORT, GRID_HEIGHT, GRID_WIDTH, STARTING_ELIXIR, STARTING_GOLD,
    TARGET_FPS,
};
pub use math::{GridPos, Vec2};
pub use protocol::{Action, BuildingRecord};
