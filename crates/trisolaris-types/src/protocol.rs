//! Wire envelopes exchanged between a session and its observers.
//!
//! Every frame is a UTF-8 JSON object with a `type` tag. Both directions
//! are closed enums: a tag this build does not know decodes to the
//! explicit `Unknown` variant, which receivers treat as a no-op. A frame
//! that carries a known tag with malformed fields fails to decode and is
//! dropped by the receiver without closing the connection.
//!
//! # Server to observer
//!
//! | Tag | Payload |
//! |-----|---------|
//! | `PHYSICS_UPDATE` | body list, `system_radius`, `timeScale` |
//! | `SOCIAL_UPDATE` | current sanity index |
//! | `SANITY_COLLAPSE_ALERT` | narrative text for a collapse |
//! | `EXTINCTION_REPORT` | narrative text when sanity reaches zero |
//!
//! # Observer to server
//!
//! | Tag | Payload |
//! |-----|---------|
//! | `INTERVENTION` | `interventionType`, `power` |
//! | `SET_TIME_SCALE` | `value` |

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One body as seen by observers. Velocity is never sent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WireBody {
    /// Body mass.
    pub mass: f64,
    /// Body radius.
    pub radius: f64,
    /// Position as `[x, y, z]`.
    pub position: [f64; 3],
}

/// Full physics state carried by a `PHYSICS_UPDATE`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PhysicsFrame {
    /// Every live body, in slot order.
    pub bodies: Vec<WireBody>,
    /// Expansion high-water mark of the session.
    pub system_radius: f64,
}

/// Messages pushed from a session to its observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Authoritative body positions after a tick.
    #[serde(rename = "PHYSICS_UPDATE")]
    PhysicsUpdate {
        /// The physics state.
        state: PhysicsFrame,
        /// Current player-set time multiplier.
        #[serde(rename = "timeScale")]
        time_scale: f64,
    },

    /// New value of the sanity index.
    #[serde(rename = "SOCIAL_UPDATE")]
    SanityUpdate {
        /// Sanity in `[0, 100]`.
        sanity: f64,
    },

    /// Sanity crossed below the collapse threshold.
    #[serde(rename = "SANITY_COLLAPSE_ALERT")]
    CollapseAlert {
        /// Narrative text (generated or fallback).
        message: String,
    },

    /// Sanity reached zero.
    #[serde(rename = "EXTINCTION_REPORT")]
    ExtinctionReport {
        /// Narrative text (generated or fallback).
        message: String,
    },

    /// A tag this build does not recognize.
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Serialize to the JSON text sent over the transport.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if a float field is not representable.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] for malformed frames. Unknown tags
    /// are not an error; they decode to [`ServerMessage::Unknown`].
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Named intervention commands an observer can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterventionKind {
    /// Strengthen the inward corrective force.
    GravityShield,
    /// Restore sanity points immediately.
    RationalBeacon,
    /// Change the time multiplier (legacy path through `INTERVENTION`).
    SetTimeScale,
    /// Any command this build does not recognize.
    #[serde(other)]
    Unknown,
}

/// Messages sent by observers to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// A bounded perturbation of the session.
    #[serde(rename = "INTERVENTION")]
    Intervention {
        /// Which command.
        #[serde(rename = "interventionType")]
        kind: InterventionKind,
        /// Command strength.
        power: f64,
    },

    /// Set the time multiplier.
    #[serde(rename = "SET_TIME_SCALE")]
    SetTimeScale {
        /// New multiplier, `>= 0`.
        value: f64,
    },

    /// A tag this build does not recognize.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Serialize to the JSON text sent over the transport.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if a float field is not representable.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] for malformed frames. Unknown tags
    /// decode to [`ClientMessage::Unknown`].
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn physics_update_wire_shape() {
        let msg = ServerMessage::PhysicsUpdate {
            state: PhysicsFrame {
                bodies: vec![WireBody {
                    mass: 1.0,
                    radius: 4.0,
                    position: [1.0, 2.0, 3.0],
                }],
                system_radius: 120.0,
            },
            time_scale: 2.0,
        };
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "PHYSICS_UPDATE");
        assert_eq!(json["timeScale"], 2.0);
        assert_eq!(json["state"]["system_radius"], 120.0);
        assert_eq!(json["state"]["bodies"][0]["position"][2], 3.0);
        assert!(json["state"]["bodies"][0].get("velocity").is_none());
    }

    #[test]
    fn sanity_update_uses_social_tag() {
        let text = ServerMessage::SanityUpdate { sanity: 42.0 }.to_json().unwrap();
        assert!(text.contains("\"type\":\"SOCIAL_UPDATE\""));
    }

    #[test]
    fn intervention_decodes_from_browser_frame() {
        let msg = ClientMessage::decode(
            r#"{"type":"INTERVENTION","interventionType":"RATIONAL_BEACON","power":20,"timeScale":3}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Intervention {
                kind: InterventionKind::RationalBeacon,
                power: 20.0,
            }
        );
    }

    #[test]
    fn unknown_tags_are_explicit_variants() {
        assert_eq!(
            ClientMessage::decode(r#"{"type":"SELF_DESTRUCT"}"#).unwrap(),
            ClientMessage::Unknown
        );
        assert_eq!(
            ServerMessage::decode(r#"{"type":"WEATHER","rain":true}"#).unwrap(),
            ServerMessage::Unknown
        );
    }

    #[test]
    fn unknown_intervention_kind_is_not_an_error() {
        let msg =
            ClientMessage::decode(r#"{"type":"INTERVENTION","interventionType":"DROPLET","power":1}"#)
                .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Intervention {
                kind: InterventionKind::Unknown,
                ..
            }
        ));
    }

    #[test]
    fn malformed_frames_fail_to_decode() {
        assert!(ClientMessage::decode("not json").is_err());
        assert!(ClientMessage::decode(r#"{"type":"SET_TIME_SCALE"}"#).is_err());
    }
}
