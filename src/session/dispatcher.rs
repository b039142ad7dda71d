//! Inbound frame routing.
//!
//! Decodes a text frame into a [`ServerMessage`] and translates it into a
//! [`Dispatch`]: the snapshot to install, the log line to append, and any
//! turn or phase notice. Routing is an exhaustive match, so a new server
//! message type does not compile until it is handled here.
//!
//! | tag | snapshot | log |
//! |-----|----------|-----|
//! | `room_state` | replace | - |
//! | `player_joined` | replace | info |
//! | `player_ready_update` | replace | success / info |
//! | `game_start` | replace, phase playing | success |
//! | `action_result` | replace if present | success, or warning when rejected |
//! | `battle_result` | replace | battle |
//! | `trade_completed` | replace | info |
//! | `turn_ended` | replace, move turn | info |
//! | `player_disconnected` | replace | warning |
//! | `game_finished` | replace, phase finished | success |

use super::log::LogCategory;
use super::protocol::{Action, BattleDetails, BattleOutcome, DecodeError, Losses, ServerMessage};
use super::room::{GamePhase, Resources, Room};

/// Longest slice of a raw frame copied into diagnostics.
const FRAME_PREVIEW_LEN: usize = 120;

/// Effect of one inbound message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dispatch {
    /// Snapshot to install, replacing the current one
    pub snapshot: Option<Room>,
    /// Line for the event log
    pub log: Option<(String, LogCategory)>,
    /// Player the turn passes to
    pub next_turn: Option<String>,
    /// Phase announced by the message itself
    pub phase: Option<GamePhase>,
}

impl Dispatch {
    fn replace(room: Room) -> Self {
        Self {
            snapshot: Some(room),
            ..Self::default()
        }
    }

    fn with_log(mut self, message: impl Into<String>, category: LogCategory) -> Self {
        self.log = Some((message.into(), category));
        self
    }
}

/// Decode one text frame.
///
/// Unrecognized tags decode to [`ServerMessage::Unknown`]; malformed frames
/// are returned as errors for the caller to log and drop.
pub fn decode_frame(frame: &str) -> Result<ServerMessage, DecodeError> {
    let message = ServerMessage::decode(frame)?;
    if message == ServerMessage::Unknown {
        tracing::info!(frame = preview(frame), "Ignoring unrecognized frame");
    }
    Ok(message)
}

fn preview(frame: &str) -> &str {
    match frame.char_indices().nth(FRAME_PREVIEW_LEN) {
        Some((end, _)) => &frame[..end],
        None => frame,
    }
}

/// Translate a message into its snapshot and log effects.
pub fn route(message: ServerMessage) -> Dispatch {
    match message {
        ServerMessage::RoomState { room } => Dispatch::replace(room),

        ServerMessage::PlayerJoined { player_id, room } => {
            let line = room
                .player_name(&player_id)
                .map(|name| format!("{} joined the game", name));
            with_optional_log(Dispatch::replace(room), line, LogCategory::Info)
        }

        ServerMessage::PlayerReadyUpdate {
            player_id,
            ready,
            room,
        } => {
            let line = room.player_name(&player_id).map(|name| {
                if ready {
                    format!("{} is ready", name)
                } else {
                    format!("{} is not ready", name)
                }
            });
            let category = if ready {
                LogCategory::Success
            } else {
                LogCategory::Info
            };
            with_optional_log(Dispatch::replace(room), line, category)
        }

        ServerMessage::GameStart { mut room } => {
            room.game_state = GamePhase::Playing;
            let mut dispatch =
                Dispatch::replace(room).with_log("Game started!", LogCategory::Success);
            dispatch.phase = Some(GamePhase::Playing);
            dispatch
        }

        ServerMessage::ActionResult {
            player_id,
            action,
            success,
            error,
            room,
        } => {
            let line = if success {
                let actor = player_id
                    .as_deref()
                    .and_then(|id| room.as_ref().and_then(|r| r.player_name(id)))
                    .unwrap_or("A player");
                action
                    .as_ref()
                    .and_then(|a| action_success_text(actor, a))
                    .map(|text| (text, LogCategory::Success))
            } else {
                Some((
                    action_rejected_text(action.as_ref(), error.as_deref()),
                    LogCategory::Warning,
                ))
            };

            Dispatch {
                snapshot: room,
                log: line,
                ..Dispatch::default()
            }
        }

        ServerMessage::BattleResult {
            attacker_id,
            defender_id,
            result,
            battle_details,
            room,
        } => {
            let attacker = room.player_name(&attacker_id).unwrap_or("A player");
            let defender = room.player_name(&defender_id).unwrap_or("a player");
            let text = battle_summary(attacker, defender, result, &battle_details);
            Dispatch::replace(room).with_log(text, LogCategory::Battle)
        }

        ServerMessage::TradeCompleted {
            player_id,
            target_player_id,
            trade_offer,
            trade_request,
            room,
        } => {
            let trader = room.player_name(&player_id).unwrap_or("A player");
            let target = room.player_name(&target_player_id).unwrap_or("a player");
            let text = trade_summary(trader, target, &trade_offer, &trade_request);
            Dispatch::replace(room).with_log(text, LogCategory::Info)
        }

        ServerMessage::TurnEnded {
            next_turn,
            turn_number,
            room,
        } => {
            let name = room.player_name(&next_turn).unwrap_or("a player");
            let text = format!("Turn {} passes to {}", turn_number.unwrap_or(1), name);
            let mut dispatch = Dispatch::replace(room).with_log(text, LogCategory::Info);
            dispatch.next_turn = Some(next_turn);
            dispatch
        }

        ServerMessage::PlayerDisconnected { player_id, room } => {
            let line = room
                .player_name(&player_id)
                .map(|name| format!("{} left the game", name));
            with_optional_log(Dispatch::replace(room), line, LogCategory::Warning)
        }

        ServerMessage::GameFinished {
            winner_id,
            winner_name,
            mut room,
        } => {
            room.game_state = GamePhase::Finished;
            let winner = winner_name
                .or_else(|| {
                    winner_id
                        .as_deref()
                        .or(room.winner.as_deref())
                        .and_then(|id| room.player_name(id))
                        .map(str::to_string)
                })
                .unwrap_or_else(|| "A player".to_string());
            let mut dispatch = Dispatch::replace(room)
                .with_log(format!("🏆 {} wins! Game over!", winner), LogCategory::Success);
            dispatch.phase = Some(GamePhase::Finished);
            dispatch
        }

        ServerMessage::Unknown => Dispatch::default(),
    }
}

fn with_optional_log(dispatch: Dispatch, line: Option<String>, category: LogCategory) -> Dispatch {
    match line {
        Some(text) => dispatch.with_log(text, category),
        None => dispatch,
    }
}

/// Verb phrase for a successful build, train, or research.
pub fn action_success_text(actor: &str, action: &Action) -> Option<String> {
    match action {
        Action::Build { building_type } => {
            Some(format!("{} built {}", actor, building_type.display_name()))
        }
        Action::TrainArmy {
            unit_type,
            quantity,
        } => Some(format!(
            "{} trained {} {}",
            actor,
            quantity,
            unit_type.display_name()
        )),
        Action::Research { tech_type } => {
            Some(format!("{} researched {}", actor, tech_type.display_name()))
        }
        // Reported through battle_result / trade_completed instead
        Action::Attack { .. } | Action::Trade { .. } => None,
    }
}

/// Warning line for an action the server refused.
pub fn action_rejected_text(action: Option<&Action>, error: Option<&str>) -> String {
    let reason = error.unwrap_or("unknown reason");
    match action {
        Some(action) => format!("{} rejected: {}", action.label(), reason),
        None => format!("Action rejected: {}", reason),
    }
}

/// Multi-line battle report. Empty categories produce no line.
pub fn battle_summary(
    attacker: &str,
    defender: &str,
    outcome: BattleOutcome,
    details: &BattleDetails,
) -> String {
    let mut lines = vec![match outcome {
        BattleOutcome::AttackerWins => format!("⚔️ {} defeated {}!", attacker, defender),
        BattleOutcome::DefenderWins => {
            format!("🛡️ {} repelled the attack of {}!", defender, attacker)
        }
    }];

    if let Some(line) = losses_line("Attacker losses", details.attacker_losses.as_ref()) {
        lines.push(line);
    }
    if let Some(line) = losses_line("Defender losses", details.defender_losses.as_ref()) {
        lines.push(line);
    }
    if outcome == BattleOutcome::AttackerWins {
        if let Some(loot) = details.loot.as_ref().filter(|l| l.has_any()) {
            lines.push(format!("Loot: {}", loot.icon_summary()));
        }
    }

    lines.join("\n")
}

fn losses_line(label: &str, losses: Option<&Losses>) -> Option<String> {
    let parts: Vec<String> = losses?
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(unit, count)| format!("{}: {}", unit.display_name(), count))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(format!("{}: {}", label, parts.join(", ")))
    }
}

/// One-line trade report, positive amounts only.
pub fn trade_summary(trader: &str, target: &str, offer: &Resources, request: &Resources) -> String {
    format!(
        "🤝 {} traded {} for {} with {}",
        trader,
        bundle_text(offer),
        bundle_text(request),
        target
    )
}

fn bundle_text(bundle: &Resources) -> String {
    if bundle.has_any() {
        bundle.icon_summary()
    } else {
        "nothing".to_string()
    }
}
