//! # Game Error Types
//!
//! Business errors of the simulation. None of these are fatal: every
//! operation that returns one leaves the state exactly as it found it.

use thiserror::Error;

/// Why a footprint cannot go where it was asked to.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementError {
    /// Part of the footprint falls outside the grid.
    #[error("footprint leaves the {width}x{height} grid")]
    OutOfBounds {
        /// Grid width.
        width: i32,
        /// Grid height.
        height: i32,
    },
    /// The footprint intersects an existing building.
    #[error("footprint overlaps building {index}")]
    Overlap {
        /// Index of the first building hit.
        index: usize,
    },
}

/// Errors that can occur in the economy and simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GameError {
    /// The base cannot pay for the requested kind.
    #[error("insufficient funds: need {need_gold} gold / {need_elixir} elixir, have {have_gold} / {have_elixir}")]
    InsufficientFunds {
        /// Gold required.
        need_gold: f64,
        /// Elixir required.
        need_elixir: f64,
        /// Gold available.
        have_gold: f64,
        /// Elixir available.
        have_elixir: f64,
    },

    /// The footprint is out of bounds or overlaps another building.
    #[error("invalid placement at ({x}, {y}): {reason}")]
    InvalidPlacement {
        /// Requested column.
        x: i32,
        /// Requested row.
        y: i32,
        /// What went wrong.
        reason: PlacementError,
    },

    /// The building cannot be upgraded any further.
    #[error("building {index} is already at max level {max_level}")]
    MaxLevelReached {
        /// Index of the building in its base.
        index: usize,
        /// The kind's maximum level.
        max_level: u32,
    },

    /// Name not present in the catalog.
    #[error("unknown kind: {0}")]
    UnknownKind(String),

    /// No building at this index.
    #[error("building not found: {0}")]
    BuildingNotFound(usize),

    /// Invalid catalog or configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Snapshot could not be written or read.
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

/// Result type for economy and simulation operations.
pub type GameResult<T> = Result<T, GameError>;
