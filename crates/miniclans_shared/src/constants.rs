//! # Network & Balance Constants
//!
//! Defaults for a match. Every value here can be overridden by the
//! configuration file loaded at startup; these are what a peer uses when no
//! file is present.

// =============================================================================
// NETWORK CONFIGURATION
// =============================================================================

/// Address the host binds to and the joiner connects to by default.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// TCP port for peer traffic.
pub const DEFAULT_PORT: u16 = 5555;

/// Accept/read poll interval in milliseconds.
///
/// Bounds how long the receive thread takes to notice a close request.
pub const POLL_INTERVAL_MS: u64 = 100;

/// Connect timeout for the joining peer, in milliseconds.
pub const CONNECT_TIMEOUT_MS: u64 = 3_000;

/// Largest frame accepted before the receive loop discards its buffer.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Frame delimiter on the wire.
pub const FRAME_DELIMITER: u8 = b'\n';

// =============================================================================
// SIMULATION
// =============================================================================

/// Target frames per second of the simulation loop.
pub const TARGET_FPS: u32 = 60;

/// Grid width in cells.
pub const GRID_WIDTH: i32 = 15;

/// Grid height in cells.
pub const GRID_HEIGHT: i32 = 15;

// =============================================================================
// ECONOMY
// =============================================================================

/// Gold in a freshly created base.
pub const STARTING_GOLD: f64 = 1000.0;

/// Elixir in a freshly created base.
pub const STARTING_ELIXIR: f64 = 1000.0;

/// Kind of the building every base starts with.
pub const TOWN_HALL: &str = "TOWNHALL";

/// Where the starting town hall sits.
pub const TOWN_HALL_POSITION: (i32, i32) = (7, 7);

/// Troop kind selected when a match starts.
pub const DEFAULT_TROOP: &str = "BARBARIAN";

/// Max hit points grow by this factor per level.
pub const UPGRADE_HP_FACTOR: f32 = 1.2;
