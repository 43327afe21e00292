//! # Peer Configuration
//!
//! Loaded once at startup from TOML. Every key is optional; a missing file
//! means all defaults.
//!
//! ```toml
//! [network]
//! host = "127.0.0.1"
//! port = 5555
//! poll_interval_ms = 100
//! connect_timeout_ms = 3000
//! max_frame_len = 65536
//!
//! [simulation]
//! fps = 60
//! drain = "all"              # or "one"
//! remote_policy = "trusting" # or "validating"
//! event_capacity = 1024
//! defenses = false           # cannons shoot at enemy troops
//!
//! [economy]
//! starting_gold = 1000.0
//! starting_elixir = 1000.0
//! catalog = "data/catalog.toml"   # optional, built-in catalog otherwise
//!
//! [grid]
//! width = 15
//! height = 15
//! ```

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use miniclans_economy::{BaseSettings, Catalog, GameError, GameResult};
use miniclans_networking::LinkConfig;
use miniclans_shared::constants::{
    CONNECT_TIMEOUT_MS, DEFAULT_HOST, DEFAULT_PORT, GRID_HEIGHT, GRID_WIDTH, MAX_FRAME_LEN,
    POLL_INTERVAL_MS, STARTING_ELIXIR, STARTING_GOLD, TARGET_FPS,
};

use crate::events::DEFAULT_EVENT_CAPACITY;
use crate::match_state::RemotePolicy;

/// How many inbound actions a frame applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrainMode {
    /// Every queued action.
    #[default]
    All,
    /// At most one action per frame.
    One,
}

/// `[network]` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// Host address to bind or connect to.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Accept and read poll interval.
    pub poll_interval_ms: u64,
    /// Connect timeout of the joiner.
    pub connect_timeout_ms: u64,
    /// Longest accepted frame in bytes.
    pub max_frame_len: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            poll_interval_ms: POLL_INTERVAL_MS,
            connect_timeout_ms: CONNECT_TIMEOUT_MS,
            max_frame_len: MAX_FRAME_LEN,
        }
    }
}

/// `[simulation]` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Target frames per second.
    pub fps: u32,
    /// Inbound actions applied per frame.
    pub drain: DrainMode,
    /// How peer actions are checked.
    pub remote_policy: RemotePolicy,
    /// Capacity of the match event channel.
    pub event_capacity: usize,
    /// Whether cannons fire during the tick.
    pub defenses: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fps: TARGET_FPS,
            drain: DrainMode::default(),
            remote_policy: RemotePolicy::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            defenses: false,
        }
    }
}

/// `[economy]` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EconomyConfig {
    /// Gold in a fresh base.
    pub starting_gold: f64,
    /// Elixir in a fresh base.
    pub starting_elixir: f64,
    /// Catalog file replacing the built-in one.
    pub catalog: Option<PathBuf>,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_gold: STARTING_GOLD,
            starting_elixir: STARTING_ELIXIR,
            catalog: None,
        }
    }
}

/// `[grid]` section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Width in cells.
    pub width: i32,
    /// Height in cells.
    pub height: i32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: GRID_WIDTH,
            height: GRID_HEIGHT,
        }
    }
}

/// Full peer configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// Peer link settings.
    pub network: NetworkConfig,
    /// Frame loop settings.
    pub simulation: SimulationConfig,
    /// Starting resources and catalog.
    pub economy: EconomyConfig,
    /// Grid size.
    pub grid: GridConfig,
}

impl GameConfig {
    /// Parses and validates a configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on malformed TOML, unknown keys or
    /// out-of-range values.
    pub fn from_toml_str(text: &str) -> GameResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| GameError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the file exists but is unreadable or
    /// invalid.
    pub fn load(path: impl AsRef<Path>) -> GameResult<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let config = Self::from_toml_str(&text)?;
                tracing::info!(path = %path.display(), "configuration loaded");
                Ok(config)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no configuration file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(GameError::InvalidConfig(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first bad value.
    pub fn validate(&self) -> GameResult<()> {
        let problem = if self.simulation.fps == 0 {
            Some("simulation.fps must be positive")
        } else if self.grid.width < 1 || self.grid.height < 1 {
            Some("grid size must be positive")
        } else if self.economy.starting_gold < 0.0 || self.economy.starting_elixir < 0.0 {
            Some("starting resources must not be negative")
        } else if self.network.poll_interval_ms == 0 {
            Some("network.poll_interval_ms must be positive")
        } else if self.network.max_frame_len == 0 {
            Some("network.max_frame_len must be positive")
        } else if self.simulation.event_capacity == 0 {
            Some("simulation.event_capacity must be positive")
        } else {
            None
        };

        match problem {
            Some(reason) => Err(GameError::InvalidConfig(reason.to_string())),
            None => Ok(()),
        }
    }

    /// `host:port` of the match.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.network.host, self.network.port)
    }

    /// Link timing derived from `[network]`.
    #[must_use]
    pub const fn link_config(&self) -> LinkConfig {
        LinkConfig {
            poll_interval: Duration::from_millis(self.network.poll_interval_ms),
            connect_timeout: Duration::from_millis(self.network.connect_timeout_ms),
            max_frame_len: self.network.max_frame_len,
        }
    }

    /// Base settings derived from `[economy]` and `[grid]`.
    #[must_use]
    pub const fn base_settings(&self) -> BaseSettings {
        BaseSettings {
            starting_gold: self.economy.starting_gold,
            starting_elixir: self.economy.starting_elixir,
            grid_width: self.grid.width,
            grid_height: self.grid.height,
        }
    }

    /// The configured catalog, or the built-in one.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configured catalog file is bad.
    pub fn load_catalog(&self) -> GameResult<Catalog> {
        match &self.economy.catalog {
            Some(path) => Catalog::load(path),
            None => Ok(Catalog::standard()),
        }
    }
}
