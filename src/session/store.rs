//! Observable session store.
//!
//! Owns the snapshot and the event log for one session and exposes a single
//! [`SessionStore::apply`] entry point for inbound messages. Interested parties
//! subscribe to [`StoreChange`] notifications instead of polling.

use std::fmt;

use super::dispatcher;
use super::log::{EventLog, LogCategory, LogEntry};
use super::protocol::ServerMessage;
use super::reconciler::StateReconciler;
use super::room::{GamePhase, Player, Room};
use super::turn::{Affordances, TurnStatus};

/// Handle returned by [`SessionStore::subscribe`].
pub type SubscriptionId = u64;

/// Something observers may want to redraw.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    /// The snapshot was replaced by a different one
    Snapshot,
    /// A log entry was appended
    Logged(LogEntry),
    /// The room entered a new phase
    PhaseChanged(GamePhase),
    /// The turn moved
    TurnChanged(Option<String>),
}

type Observer = Box<dyn FnMut(&StoreChange)>;

/// Snapshot + log + observers for one (room, player) session.
pub struct SessionStore {
    state: StateReconciler,
    log: EventLog,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: SubscriptionId,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.state)
            .field("log_len", &self.log.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl SessionStore {
    pub fn new(self_id: impl Into<String>) -> Self {
        Self::with_log(self_id, EventLog::new())
    }

    pub fn with_log(self_id: impl Into<String>, log: EventLog) -> Self {
        Self {
            state: StateReconciler::new(self_id),
            log,
            observers: Vec::new(),
            next_subscription: 1,
        }
    }

    /// Register an observer. It is called once per change, in order.
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&StoreChange) + 'static,
    {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    /// Apply one inbound message fully, then notify observers.
    pub fn apply(&mut self, message: ServerMessage) -> Vec<StoreChange> {
        let tag = message.tag();
        let dispatch = dispatcher::route(message);
        let mut changes = Vec::new();
        let mut phase = dispatch.phase;

        if let Some(room) = dispatch.snapshot {
            let differs = self.state.room() != Some(&room);
            let change = self.state.apply_snapshot(room);
            if differs {
                changes.push(StoreChange::Snapshot);
            }
            if phase.is_none() {
                phase = change.phase.map(|(_, after)| after);
            }
            if let Some((_, after)) = change.turn {
                changes.push(StoreChange::TurnChanged(after));
            }
        }

        if let Some(next) = dispatch.next_turn {
            let moved = self.state.current_turn() != Some(next.as_str());
            if self.state.set_current_turn(&next) && moved {
                changes.push(StoreChange::TurnChanged(Some(next)));
            }
        }

        if let Some(phase) = phase {
            tracing::info!(phase = %phase, "Room phase");
            changes.push(StoreChange::PhaseChanged(phase));
        }

        if let Some((text, category)) = dispatch.log {
            let entry = self.log.append(text, category).clone();
            changes.push(StoreChange::Logged(entry));
        }

        tracing::debug!(tag, changes = changes.len(), "Applied frame");
        self.notify(&changes);
        changes
    }

    /// Append a locally produced log line (composer warnings and echoes).
    pub fn record(&mut self, message: impl Into<String>, category: LogCategory) {
        let entry = self.log.append(message, category).clone();
        self.notify(&[StoreChange::Logged(entry)]);
    }

    fn notify(&mut self, changes: &[StoreChange]) {
        for change in changes {
            for (_, observer) in self.observers.iter_mut() {
                observer(change);
            }
        }
    }

    pub fn self_id(&self) -> &str {
        self.state.self_id()
    }

    pub fn state(&self) -> &StateReconciler {
        &self.state
    }

    pub fn room(&self) -> Option<&Room> {
        self.state.room()
    }

    pub fn self_player(&self) -> Option<&Player> {
        self.state.self_player()
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn turn_status(&self) -> TurnStatus {
        TurnStatus::derive(self.state.room(), self.state.self_id())
    }

    pub fn is_my_turn(&self) -> bool {
        self.turn_status().is_my_turn
    }

    pub fn affordances(&self) -> Affordances {
        self.turn_status().affordances()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn room_json(phase: &str, turn: &str) -> serde_json::Value {
        json!({
            "code": "ABCD1234",
            "players": {
                "p1": {"id": "p1", "name": "Alice", "is_ready": true},
                "p2": {"id": "p2", "name": "Bob"}
            },
            "game_state": phase,
            "current_turn": turn
        })
    }

    fn frame(value: serde_json::Value) -> ServerMessage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_turn_ended_scenario() {
        let mut store = SessionStore::new("p1");
        store.apply(frame(json!({"type": "room_state", "room": room_json("playing", "p1")})));
        assert!(store.is_my_turn());

        store.apply(frame(json!({
            "type": "turn_ended",
            "next_turn": "p2",
            "turn_number": 4,
            "room": room_json("playing", "p2")
        })));

        assert_eq!(store.log().latest().unwrap().message, "Turn 4 passes to Bob");
        assert_eq!(store.state().current_turn(), Some("p2"));
        assert!(!store.is_my_turn());
    }

    #[test]
    fn test_same_snapshot_twice_is_idempotent() {
        let mut store = SessionStore::new("p1");
        let msg = frame(json!({"type": "room_state", "room": room_json("waiting", "p1")}));

        let first = store.apply(msg.clone());
        let room_after_first = store.room().cloned();
        let second = store.apply(msg);

        assert!(first.contains(&StoreChange::Snapshot));
        assert!(second.is_empty());
        assert_eq!(store.room().cloned(), room_after_first);
        assert!(store.log().is_empty());
    }

    #[test]
    fn test_observers_and_unsubscribe() {
        let mut store = SessionStore::new("p1");
        let seen: Rc<RefCell<Vec<StoreChange>>> = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        let id = store.subscribe(move |change| sink.borrow_mut().push(change.clone()));

        store.apply(frame(json!({"type": "game_start", "room": room_json("waiting", "p1")})));
        {
            let seen = seen.borrow();
            assert!(seen.contains(&StoreChange::Snapshot));
            assert!(seen.contains(&StoreChange::PhaseChanged(GamePhase::Playing)));
            assert!(seen
                .iter()
                .any(|c| matches!(c, StoreChange::Logged(e) if e.message == "Game started!")));
        }

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));

        let count = seen.borrow().len();
        store.record("local line", LogCategory::Info);
        assert_eq!(seen.borrow().len(), count);
        assert_eq!(store.log().latest().unwrap().message, "local line");
    }

    #[test]
    fn test_rejected_action_keeps_snapshot() {
        let mut store = SessionStore::new("p1");
        store.apply(frame(json!({"type": "room_state", "room": room_json("playing", "p1")})));
        let before = store.room().cloned();

        let changes = store.apply(frame(json!({
            "type": "action_result",
            "success": false,
            "error": "Not enough resources"
        })));

        assert_eq!(store.room().cloned(), before);
        assert_eq!(changes.len(), 1);
        assert_eq!(
            store.log().latest().unwrap().category,
            LogCategory::Warning
        );
    }

    #[test]
    fn test_unknown_message_changes_nothing() {
        let mut store = SessionStore::new("p1");
        assert!(store.apply(ServerMessage::Unknown).is_empty());
        assert!(store.room().is_none());
        assert!(!store.is_ready());
    }

    #[test]
    fn test_ready_flag_follows_snapshot() {
        let mut store = SessionStore::new("p1");
        store.apply(frame(json!({"type": "room_state", "room": room_json("waiting", "p1")})));
        assert!(store.is_ready());
        assert!(store.affordances().toggle_ready);
    }
}
