//! Wire protocol for the room channel.
//!
//! Inbound frames are JSON objects tagged by `type`; every recognized tag is a
//! variant of [`ServerMessage`], and anything else lands in
//! [`ServerMessage::Unknown`]. Outbound frames are [`ClientMessage`]s.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::room::{null_as_default, BuildingType, Resources, Room, TechType, UnitType};

/// Messages pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full state, sent right after the channel opens
    RoomState { room: Room },

    PlayerJoined { player_id: String, room: Room },

    PlayerReadyUpdate {
        player_id: String,
        ready: bool,
        room: Room,
    },

    GameStart { room: Room },

    /// Outcome of a build / train / research action.
    ///
    /// Rejections are sent only to the acting player and carry no room.
    ActionResult {
        #[serde(default)]
        player_id: Option<String>,
        #[serde(default)]
        action: Option<Action>,
        success: bool,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        room: Option<Room>,
    },

    BattleResult {
        attacker_id: String,
        defender_id: String,
        result: BattleOutcome,
        #[serde(default, deserialize_with = "null_as_default")]
        battle_details: BattleDetails,
        room: Room,
    },

    TradeCompleted {
        player_id: String,
        target_player_id: String,
        #[serde(default, deserialize_with = "null_as_default")]
        trade_offer: Resources,
        #[serde(default, deserialize_with = "null_as_default")]
        trade_request: Resources,
        room: Room,
    },

    TurnEnded {
        next_turn: String,
        #[serde(default)]
        turn_number: Option<u32>,
        room: Room,
    },

    PlayerDisconnected { player_id: String, room: Room },

    GameFinished {
        #[serde(default)]
        winner_id: Option<String>,
        #[serde(default)]
        winner_name: Option<String>,
        room: Room,
    },

    /// Any tag this client does not know yet
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::RoomState { .. } => "room_state",
            Self::PlayerJoined { .. } => "player_joined",
            Self::PlayerReadyUpdate { .. } => "player_ready_update",
            Self::GameStart { .. } => "game_start",
            Self::ActionResult { .. } => "action_result",
            Self::BattleResult { .. } => "battle_result",
            Self::TradeCompleted { .. } => "trade_completed",
            Self::TurnEnded { .. } => "turn_ended",
            Self::PlayerDisconnected { .. } => "player_disconnected",
            Self::GameFinished { .. } => "game_finished",
            Self::Unknown => "unknown",
        }
    }

    /// The snapshot carried by this message, if any.
    pub fn room(&self) -> Option<&Room> {
        match self {
            Self::RoomState { room }
            | Self::PlayerJoined { room, .. }
            | Self::PlayerReadyUpdate { room, .. }
            | Self::GameStart { room }
            | Self::BattleResult { room, .. }
            | Self::TradeCompleted { room, .. }
            | Self::TurnEnded { room, .. }
            | Self::PlayerDisconnected { room, .. }
            | Self::GameFinished { room, .. } => Some(room),
            Self::ActionResult { room, .. } => room.as_ref(),
            Self::Unknown => None,
        }
    }

    /// Decode one inbound text frame.
    pub fn decode(frame: &str) -> Result<Self, DecodeError> {
        let value: serde_json::Value =
            serde_json::from_str(frame).map_err(|e| DecodeError::Malformed(e.to_string()))?;

        let tag = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or(DecodeError::MissingTag)?
            .to_string();

        serde_json::from_value(value).map_err(|e| DecodeError::Payload {
            tag,
            reason: e.to_string(),
        })
    }
}

/// Who won a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BattleOutcome {
    AttackerWins,
    /// Any result other than `attacker_wins`
    DefenderWins,
}

impl From<String> for BattleOutcome {
    fn from(result: String) -> Self {
        if result == "attacker_wins" {
            Self::AttackerWins
        } else {
            Self::DefenderWins
        }
    }
}

impl From<BattleOutcome> for String {
    fn from(outcome: BattleOutcome) -> Self {
        match outcome {
            BattleOutcome::AttackerWins => "attacker_wins".to_string(),
            BattleOutcome::DefenderWins => "defender_wins".to_string(),
        }
    }
}

/// Casualties per unit type.
pub type Losses = BTreeMap<UnitType, u64>;

/// Server-computed battle breakdown. Every field is optional on the wire.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleDetails {
    pub attacker_losses: Option<Losses>,
    pub defender_losses: Option<Losses>,
    /// Only present when the attacker won
    pub loot: Option<Resources>,
    pub attacker_power: Option<f64>,
    pub defender_power: Option<f64>,
    pub attacker_roll: Option<u32>,
    pub defender_roll: Option<u32>,
    pub attacker_total: Option<f64>,
    pub defender_total: Option<f64>,
}

/// A player's intent. Validity beyond shape is decided by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Build {
        building_type: BuildingType,
    },
    TrainArmy {
        unit_type: UnitType,
        #[serde(default = "one")]
        quantity: u32,
    },
    Research {
        tech_type: TechType,
    },
    Attack {
        target_player_id: String,
    },
    Trade {
        target_player_id: String,
        #[serde(rename = "trade_offer")]
        offer: Resources,
        #[serde(rename = "trade_request")]
        request: Resources,
    },
}

fn one() -> u32 {
    1
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Build { .. } => ActionKind::Build,
            Self::TrainArmy { .. } => ActionKind::TrainArmy,
            Self::Research { .. } => ActionKind::Research,
            Self::Attack { .. } => ActionKind::Attack,
            Self::Trade { .. } => ActionKind::Trade,
        }
    }

    /// Short human label, e.g. "Train 5 archers".
    pub fn label(&self) -> String {
        match self {
            Self::Build { building_type } => format!("Build {}", building_type.display_name()),
            Self::TrainArmy {
                unit_type,
                quantity,
            } => format!("Train {} {}", quantity, unit_type.display_name()),
            Self::Research { tech_type } => format!("Research {}", tech_type.display_name()),
            Self::Attack { target_player_id } => format!("Attack {}", target_player_id),
            Self::Trade {
                target_player_id, ..
            } => format!("Trade with {}", target_player_id),
        }
    }
}

/// Action kinds, used for the transient action-menu selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Build,
    TrainArmy,
    Research,
    Attack,
    Trade,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::TrainArmy => "train_army",
            Self::Research => "research",
            Self::Attack => "attack",
            Self::Trade => "trade",
        }
    }
}

/// Messages sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    PlayerReady { ready: bool },
    GameAction { action: Action },
    EndTurn,
}

impl ClientMessage {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::PlayerReady { .. } => "player_ready",
            Self::GameAction { .. } => "game_action",
            Self::EndTurn => "end_turn",
        }
    }

    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Why an inbound frame could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Not a JSON document
    Malformed(String),
    /// JSON without a string `type` field
    MissingTag,
    /// Recognized tag, payload of the wrong shape
    Payload { tag: String, reason: String },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(reason) => write!(f, "Malformed frame: {}", reason),
            Self::MissingTag => write!(f, "Frame has no type tag"),
            Self::Payload { tag, reason } => {
                write!(f, "Invalid payload for {}: {}", tag, reason)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn room() -> serde_json::Value {
        json!({"code": "ABCD1234", "players": {}, "game_state": "waiting"})
    }

    #[test]
    fn test_decode_room_state() {
        let frame = json!({"type": "room_state", "room": room()}).to_string();
        let msg = ServerMessage::decode(&frame).unwrap();
        assert_eq!(msg.tag(), "room_state");
        assert_eq!(msg.room().map(|r| r.code.as_str()), Some("ABCD1234"));
    }

    #[test]
    fn test_decode_unknown_tag() {
        let frame = json!({"type": "weather_changed", "room": room()}).to_string();
        assert_eq!(ServerMessage::decode(&frame), Ok(ServerMessage::Unknown));
    }

    #[test]
    fn test_decode_failures() {
        assert!(matches!(
            ServerMessage::decode("{not json"),
            Err(DecodeError::Malformed(_))
        ));
        assert_eq!(
            ServerMessage::decode(r#"{"message": "WebSocket test successful"}"#),
            Err(DecodeError::MissingTag)
        );
        let err = ServerMessage::decode(r#"{"type": "turn_ended"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Payload { ref tag, .. } if tag == "turn_ended"));
    }

    #[test]
    fn test_decode_rejected_action_without_room() {
        let frame = json!({
            "type": "action_result",
            "success": false,
            "error": "Not enough resources"
        })
        .to_string();
        match ServerMessage::decode(&frame).unwrap() {
            ServerMessage::ActionResult {
                success,
                error,
                room,
                ..
            } => {
                assert!(!success);
                assert_eq!(error.as_deref(), Some("Not enough resources"));
                assert!(room.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_battle_outcome_fallback() {
        let outcome: BattleOutcome = serde_json::from_value(json!("draw")).unwrap();
        assert_eq!(outcome, BattleOutcome::DefenderWins);
    }

    #[test]
    fn test_encode_client_messages() {
        assert_eq!(
            serde_json::to_value(ClientMessage::PlayerReady { ready: true }).unwrap(),
            json!({"type": "player_ready", "ready": true})
        );
        assert_eq!(
            serde_json::to_value(ClientMessage::EndTurn).unwrap(),
            json!({"type": "end_turn"})
        );
        assert_eq!(
            serde_json::to_value(ClientMessage::GameAction {
                action: Action::TrainArmy {
                    unit_type: UnitType::Archers,
                    quantity: 5
                }
            })
            .unwrap(),
            json!({
                "type": "game_action",
                "action": {"type": "train_army", "unit_type": "archers", "quantity": 5}
            })
        );
    }

    #[test]
    fn test_encode_trade_uses_wire_names() {
        let action = Action::Trade {
            target_player_id: "p2".to_string(),
            offer: Resources::new(10, 0, 0, 0),
            request: Resources::new(0, 0, 0, 5),
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({
                "type": "trade",
                "target_player_id": "p2",
                "trade_offer": {"gold": 10, "wood": 0, "stone": 0, "food": 0},
                "trade_request": {"gold": 0, "wood": 0, "stone": 0, "food": 5}
            })
        );
    }

    #[test]
    fn test_action_label() {
        let action = Action::Build {
            building_type: BuildingType::Barracks,
        };
        assert_eq!(action.label(), "Build Barracks");
        assert_eq!(action.kind(), ActionKind::Build);
    }
}
