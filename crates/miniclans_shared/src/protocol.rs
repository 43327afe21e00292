//! Wire records exchanged between the two peers.
//!
//! Each record is one JSON object terminated by a newline. The `action` field
//! selects the variant:
//!
//! ```text
//! {"action":"place_building","building":{"type":"GOLDMINE","position":[0,0],"level":1,"hp":500.0}}
//! {"action":"deploy_troop","position":[3,4],"troop_type":"BARBARIAN"}
//! {"action":"ready_to_attack"}
//! ```
//!
//! Kind names travel as plain strings. Resolving them against the catalog is
//! the receiver's job, so a record with an unknown kind still decodes.

use crate::math::{GridPos, Vec2};
use serde::{Deserialize, Serialize};

/// A building as it appears on the wire and in snapshot files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildingRecord {
    /// Catalog name of the building kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Top-left footprint cell.
    pub position: GridPos,
    /// Current level.
    pub level: u32,
    /// Current hit points.
    pub hp: f32,
}

/// A discrete action announced to the other peer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// The sender placed a building in its own base.
    PlaceBuilding {
        /// The placed building.
        building: BuildingRecord,
    },
    /// The sender deployed a troop against the receiver's base.
    DeployTroop {
        /// Deployment point in grid coordinates.
        position: Vec2,
        /// Catalog name of the troop kind.
        troop_type: String,
    },
    /// The sender switched to attack mode. Informational only.
    ReadyToAttack,
}

impl Action {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PlaceBuilding { .. } => "place_building",
            Self::DeployTroop { .. } => "deploy_troop",
            Self::ReadyToAttack => "ready_to_attack",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_building_wire_shape() {
        let action = Action::PlaceBuilding {
            building: BuildingRecord {
                kind: "GOLDMINE".to_string(),
                position: GridPos::new(0, 0),
                level: 1,
                hp: 500.0,
            },
        };

        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["action"], "place_building");
        assert_eq!(value["building"]["type"], "GOLDMINE");
        assert_eq!(value["building"]["position"], serde_json::json!([0, 0]));
        assert_eq!(value["building"]["level"], 1);
    }

    #[test]
    fn test_decode_peer_messages() {
        let deploy: Action = serde_json::from_str(
            r#"{"action":"deploy_troop","position":[3,4],"troop_type":"ARCHER"}"#,
        )
        .unwrap();
        assert_eq!(
            deploy,
            Action::DeployTroop {
                position: Vec2::new(3.0, 4.0),
                troop_type: "ARCHER".to_string(),
            }
        );

        let ready: Action = serde_json::from_str(r#"{"action":"ready_to_attack"}"#).unwrap();
        assert_eq!(ready, Action::ReadyToAttack);
        assert_eq!(ready.name(), "ready_to_attack");
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let result = serde_json::from_str::<Action>(r#"{"action":"teleport"}"#);
        assert!(result.is_err());

        let missing_tag = serde_json::from_str::<Action>(r#"{"position":[1,1]}"#);
        assert!(missing_tag.is_err());
    }
}
