//! Turn ownership and phase-gated affordances.
//!
//! Everything here is derived from the latest snapshot. Gating is advisory:
//! the composer still sends whatever it is asked to, and the server rejects
//! out-of-turn actions.

use super::room::{GamePhase, Room, MAX_ROOM_PLAYERS};

/// Which controls make sense right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Affordances {
    pub build: bool,
    pub train: bool,
    pub research: bool,
    pub attack: bool,
    pub end_turn: bool,
    /// Trading is open to everyone while playing
    pub trade: bool,
    pub toggle_ready: bool,
}

/// Turn/phase view for one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnStatus {
    pub phase: GamePhase,
    pub current_turn: Option<String>,
    pub is_my_turn: bool,
}

impl TurnStatus {
    /// Derive from a snapshot. No snapshot means waiting, nobody's turn.
    pub fn derive(room: Option<&Room>, self_id: &str) -> Self {
        let phase = room.map(|r| r.game_state).unwrap_or_default();
        let current_turn = room.and_then(|r| r.current_turn.clone());
        let is_my_turn = current_turn.as_deref() == Some(self_id);

        Self {
            phase,
            current_turn,
            is_my_turn,
        }
    }

    /// Turn actions are meaningful only while playing and on our turn.
    pub fn can_submit_actions(&self) -> bool {
        self.phase == GamePhase::Playing && self.is_my_turn
    }

    pub fn affordances(&self) -> Affordances {
        let on_turn = self.can_submit_actions();
        Affordances {
            build: on_turn,
            train: on_turn,
            research: on_turn,
            attack: on_turn,
            end_turn: on_turn,
            trade: self.phase == GamePhase::Playing,
            toggle_ready: self.phase == GamePhase::Waiting,
        }
    }

    /// Header line for the current phase.
    pub fn indicator(&self, room: Option<&Room>) -> String {
        match self.phase {
            GamePhase::Waiting => {
                let count = room.map(|r| r.player_count()).unwrap_or(0);
                format!("Waiting for players... ({}/{})", count, MAX_ROOM_PLAYERS)
            }
            GamePhase::Playing if self.is_my_turn => "Your turn!".to_string(),
            GamePhase::Playing => {
                let name = self
                    .current_turn
                    .as_deref()
                    .and_then(|id| room.and_then(|r| r.player_name(id)))
                    .unwrap_or("...");
                format!("Turn: {}", name)
            }
            GamePhase::Finished => match room.and_then(|r| r.winner_player()) {
                Some(winner) => format!(
                    "Game over! Winner: {} ({} victory points)",
                    winner.name, winner.victory_points
                ),
                None => "Game over!".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn room(phase: &str, turn: Option<&str>) -> Room {
        let winner = if phase == "finished" { Some("p1") } else { None };
        serde_json::from_value(json!({
            "code": "ABCD1234",
            "players": {
                "p1": {"id": "p1", "name": "Alice", "victory_points": 10},
                "p2": {"id": "p2", "name": "Bob"}
            },
            "game_state": phase,
            "current_turn": turn,
            "winner": winner
        }))
        .unwrap()
    }

    #[test]
    fn test_is_my_turn() {
        let r = room("playing", Some("p1"));
        assert!(TurnStatus::derive(Some(&r), "p1").is_my_turn);
        assert!(!TurnStatus::derive(Some(&r), "p2").is_my_turn);
    }

    #[test]
    fn test_null_turn_does_not_panic() {
        let r = room("finished", None);
        let status = TurnStatus::derive(Some(&r), "p1");
        assert!(!status.is_my_turn);
        assert!(!status.can_submit_actions());
        assert_eq!(
            status.indicator(Some(&r)),
            "Game over! Winner: Alice (10 victory points)"
        );

        let empty = TurnStatus::derive(None, "p1");
        assert_eq!(empty.phase, GamePhase::Waiting);
        assert!(!empty.is_my_turn);
    }

    #[test]
    fn test_affordances_gated_by_phase_and_turn() {
        let mine = room("playing", Some("p1"));
        let a = TurnStatus::derive(Some(&mine), "p1").affordances();
        assert!(a.build && a.train && a.research && a.attack && a.end_turn && a.trade);
        assert!(!a.toggle_ready);

        let theirs = TurnStatus::derive(Some(&mine), "p2").affordances();
        assert!(!theirs.build && !theirs.end_turn);
        assert!(theirs.trade);

        let waiting = room("waiting", Some("p1"));
        let w = TurnStatus::derive(Some(&waiting), "p1").affordances();
        assert!(!w.build && !w.trade);
        assert!(w.toggle_ready);
    }

    #[test]
    fn test_indicator() {
        let waiting = room("waiting", Some("p1"));
        assert_eq!(
            TurnStatus::derive(Some(&waiting), "p1").indicator(Some(&waiting)),
            "Waiting for players... (2/4)"
        );

        let playing = room("playing", Some("p2"));
        assert_eq!(
            TurnStatus::derive(Some(&playing), "p1").indicator(Some(&playing)),
            "Turn: Bob"
        );
        assert_eq!(
            TurnStatus::derive(Some(&playing), "p2").indicator(Some(&playing)),
            "Your turn!"
        );
    }
}
