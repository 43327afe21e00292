//! # Match Snapshots
//!
//! Plain JSON dump of both bases. Troops are not saved: a snapshot restores
//! the build phase, not a battle in progress.
//!
//! ```json
//! {
//!   "player_base":   { "buildings": [...], "gold": 900.0, "elixir": 1000.0 },
//!   "opponent_base": { "buildings": [...], "gold": 1000.0, "elixir": 1000.0 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;

use miniclans_shared::BuildingRecord;

use crate::error::{GameError, GameResult};

/// Default file name used by the peer binary.
pub const DEFAULT_SNAPSHOT_FILE: &str = "savegame.json";

/// Serialized form of a single base.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaseSnapshot {
    /// Buildings in creation order.
    pub buildings: Vec<BuildingRecord>,
    /// Gold counter.
    pub gold: f64,
    /// Elixir counter.
    pub elixir: f64,
}

/// Serialized form of a whole match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    /// The local player's base.
    pub player_base: BaseSnapshot,
    /// The mirrored opponent base.
    pub opponent_base: BaseSnapshot,
}

impl MatchSnapshot {
    /// Writes the snapshot as pretty JSON, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns `Snapshot` if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> GameResult<()> {
        let path = path.as_ref();
        let json =
            serde_json::to_string_pretty(self).map_err(|e| GameError::Snapshot(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| GameError::Snapshot(format!("failed to write {}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), "snapshot saved");
        Ok(())
    }

    /// Reads a snapshot. A missing file is not an error and yields `None`.
    ///
    /// # Errors
    ///
    /// Returns `Snapshot` if the file exists but cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> GameResult<Option<Self>> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no snapshot to load");
                return Ok(None);
            }
            Err(e) => {
                return Err(GameError::Snapshot(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        let snapshot = serde_json::from_str(&text)
            .map_err(|e| GameError::Snapshot(format!("{}: {e}", path.display())))?;
        Ok(Some(snapshot))
    }
}
