//! Action <-> frame conversion.
//!
//! A frame is one compact JSON object followed by the delimiter byte. JSON
//! never contains a raw newline outside strings, and serde_json escapes those.

use miniclans_shared::constants::FRAME_DELIMITER;
use miniclans_shared::Action;

use crate::error::{TransportError, TransportResult};

/// Serializes an action into a complete frame, delimiter included.
///
/// # Errors
///
/// Returns `MalformedMessage` if the action cannot be serialized.
pub fn encode(action: &Action) -> TransportResult<Vec<u8>> {
    let mut bytes =
        serde_json::to_vec(action).map_err(|e| TransportError::MalformedMessage(e.to_string()))?;
    bytes.push(FRAME_DELIMITER);
    Ok(bytes)
}

/// Decodes a frame body (delimiter already stripped).
///
/// # Errors
///
/// Returns `MalformedMessage` for invalid UTF-8, invalid JSON, a missing or
/// unknown `action` field, or missing action fields.
pub fn decode(frame: &[u8]) -> TransportResult<Action> {
    serde_json::from_slice(frame).map_err(|e| TransportError::MalformedMessage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniclans_shared::{BuildingRecord, GridPos, Vec2};

    #[test]
    fn test_frame_ends_with_single_delimiter() {
        let action = Action::PlaceBuilding {
            building: BuildingRecord {
                kind: "CANNON".to_string(),
                position: GridPos::new(3, 4),
                level: 1,
                hp: 600.0,
            },
        };
        let frame = encode(&action).unwrap();
        assert_eq!(frame.last(), Some(&b'\n'));
        assert_eq!(frame.iter().filter(|&&b| b == b'\n').count(), 1);
        assert_eq!(decode(&frame[..frame.len() - 1]).unwrap(), action);
    }

    #[test]
    fn test_decode_accepts_peer_spelling() {
        let frame = br#"{"troop_type": "ARCHER", "action": "deploy_troop", "position": [2, 11]}"#;
        assert_eq!(
            decode(frame).unwrap(),
            Action::DeployTroop {
                position: Vec2::new(2.0, 11.0),
                troop_type: "ARCHER".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_failures_are_malformed() {
        for frame in [
            &b"not json"[..],
            br#"{"position": [1, 1]}"#,
            br#"{"action": "fly_away"}"#,
            br#"{"action": "deploy_troop"}"#,
            &[0xff, 0xfe, b'{'][..],
        ] {
            assert!(matches!(
                decode(frame),
                Err(TransportError::MalformedMessage(_))
            ));
        }
    }
}
