//! Canonical local snapshot.
//!
//! Every `room`-bearing message replaces the held [`Room`] wholesale. Derived
//! values (own player record, own ready flag) are read from the current
//! snapshot on every access, so they can never go stale.

use super::room::{GamePhase, Player, Room};

/// What changed when a snapshot was applied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SnapshotChange {
    /// `(before, after)` when the phase differs from the previous snapshot
    pub phase: Option<(Option<GamePhase>, GamePhase)>,
    /// `(before, after)` when the current turn moved
    pub turn: Option<(Option<String>, Option<String>)>,
}

impl SnapshotChange {
    pub fn is_empty(&self) -> bool {
        self.phase.is_none() && self.turn.is_none()
    }
}

/// Holds the latest server snapshot for one (room, player) session.
#[derive(Debug, Clone)]
pub struct StateReconciler {
    self_id: String,
    room: Option<Room>,
}

impl StateReconciler {
    pub fn new(self_id: impl Into<String>) -> Self {
        Self {
            self_id: self_id.into(),
            room: None,
        }
    }

    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    /// Replace the snapshot. Never merges.
    pub fn apply_snapshot(&mut self, room: Room) -> SnapshotChange {
        let previous_phase = self.room.as_ref().map(|r| r.game_state);
        let previous_turn = self.room.as_ref().and_then(|r| r.current_turn.clone());

        if let Some(before) = previous_phase {
            if !before.can_advance_to(room.game_state) {
                // The server owns phase order; record it and take the snapshot anyway.
                tracing::warn!(
                    room = %room.code,
                    from = %before,
                    to = %room.game_state,
                    "Snapshot moved phase backwards"
                );
            }
        }

        let mut change = SnapshotChange::default();
        if previous_phase != Some(room.game_state) {
            change.phase = Some((previous_phase, room.game_state));
        }
        if previous_turn != room.current_turn {
            change.turn = Some((previous_turn, room.current_turn.clone()));
        }

        self.room = Some(room);
        change
    }

    /// Point the current turn at `player_id`, if that player is in the room.
    ///
    /// Returns whether the turn was updated.
    pub fn set_current_turn(&mut self, player_id: &str) -> bool {
        match self.room.as_mut() {
            Some(room) if room.has_player(player_id) => {
                room.current_turn = Some(player_id.to_string());
                true
            }
            Some(room) => {
                tracing::warn!(room = %room.code, player = player_id, "Turn passed to unknown player");
                false
            }
            None => false,
        }
    }

    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    /// Current phase; `waiting` until the first snapshot arrives.
    pub fn phase(&self) -> GamePhase {
        self.room.as_ref().map(|r| r.game_state).unwrap_or_default()
    }

    pub fn current_turn(&self) -> Option<&str> {
        self.room.as_ref().and_then(|r| r.current_turn.as_deref())
    }

    /// The local player's record in the latest snapshot.
    pub fn self_player(&self) -> Option<&Player> {
        self.room.as_ref().and_then(|r| r.player(&self.self_id))
    }

    /// The local player's ready flag in the latest snapshot.
    pub fn is_ready(&self) -> bool {
        self.self_player().map(|p| p.is_ready).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn room(phase: &str, turn: Option<&str>, p1_ready: bool, gold: u64) -> Room {
        serde_json::from_value(json!({
            "code": "ABCD1234",
            "players": {
                "p1": {"id": "p1", "name": "Alice", "is_ready": p1_ready,
                       "resources": {"gold": gold, "wood": 0, "stone": 0, "food": 0}},
                "p2": {"id": "p2", "name": "Bob"}
            },
            "game_state": phase,
            "current_turn": turn
        }))
        .unwrap()
    }

    #[test]
    fn test_replacement_not_merge() {
        let mut state = StateReconciler::new("p1");

        let frames = vec![
            room("playing", Some("p2"), true, 900),
            room("waiting", Some("p1"), false, 1000),
            room("playing", None, true, 10),
        ];

        for frame in frames {
            state.apply_snapshot(frame.clone());
            assert_eq!(state.room(), Some(&frame));
        }
    }

    #[test]
    fn test_derived_values_follow_snapshot() {
        let mut state = StateReconciler::new("p1");
        assert!(!state.is_ready());
        assert!(state.self_player().is_none());
        assert_eq!(state.phase(), GamePhase::Waiting);

        state.apply_snapshot(room("waiting", Some("p1"), true, 1000));
        assert!(state.is_ready());

        state.apply_snapshot(room("waiting", Some("p1"), false, 1000));
        assert!(!state.is_ready());
        assert_eq!(state.self_player().unwrap().name, "Alice");
    }

    #[test]
    fn test_change_report() {
        let mut state = StateReconciler::new("p1");

        let first = state.apply_snapshot(room("waiting", Some("p1"), false, 1000));
        assert_eq!(first.phase, Some((None, GamePhase::Waiting)));

        let second = state.apply_snapshot(room("playing", Some("p2"), false, 1000));
        assert_eq!(
            second.phase,
            Some((Some(GamePhase::Waiting), GamePhase::Playing))
        );
        assert_eq!(
            second.turn,
            Some((Some("p1".to_string()), Some("p2".to_string())))
        );

        let same = state.apply_snapshot(room("playing", Some("p2"), false, 1000));
        assert!(same.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let mut state = StateReconciler::new("p1");
        let snapshot = room("playing", Some("p1"), true, 500);

        state.apply_snapshot(snapshot.clone());
        let once = state.room().cloned();
        let change = state.apply_snapshot(snapshot);
        assert!(change.is_empty());
        assert_eq!(state.room().cloned(), once);
    }

    #[test]
    fn test_set_current_turn_requires_known_player() {
        let mut state = StateReconciler::new("p1");
        assert!(!state.set_current_turn("p2"));

        state.apply_snapshot(room("playing", Some("p1"), false, 0));
        assert!(state.set_current_turn("p2"));
        assert_eq!(state.current_turn(), Some("p2"));

        assert!(!state.set_current_turn("ghost"));
        assert_eq!(state.current_turn(), Some("p2"));
    }
}
