//! Session synchronization for the strategy game client.
//!
//! One [`GameSession`] per (room, player). It owns the channel, the canonical
//! snapshot, the event log and the action composer:
//!
//! - `connection` - persistent channel lifecycle (ewebsock backed)
//! - `protocol` - tagged wire messages, both directions
//! - `dispatcher` - per-tag snapshot and log effects
//! - `reconciler` - whole-snapshot replacement
//! - `store` - snapshot + log with change notifications
//! - `turn` - turn ownership and phase-gated affordances
//! - `log` - bounded, newest-first event log
//! - `composer` - outgoing actions with client-side checks
//! - `room` - server room model and display tables
//!
//! # Data flow
//!
//! ```text
//!  channel ──frames──▶ dispatcher ──▶ reconciler (snapshot)
//!     ▲                    │
//!     │                    └────────▶ event log
//!     │
//!  composer ◀── player intent         turn tracker ◀── snapshot
//! ```
//!
//! Frames are handled strictly one at a time: each frame's snapshot and log
//! effects are fully applied before the next is decoded.

pub mod composer;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod log;
pub mod protocol;
pub mod reconciler;
pub mod room;
pub mod store;
pub mod timer;
pub mod turn;

use std::time::Duration;

// Re-export commonly used types
pub use composer::{ActionComposer, ComposeError, Outgoing, TradeDraft};
pub use config::{SessionConfig, DEFAULT_BACKEND_URL, DEFAULT_PROBE_AFTER};
pub use connection::{
    Channel, ChannelEvent, ConnectionError, ConnectionManager, ConnectionState, WsChannel,
};
pub use log::{EventLog, LogCategory, LogEntry, MAX_LOG_ENTRIES};
pub use protocol::{Action, ActionKind, ClientMessage, DecodeError, ServerMessage};
pub use room::{
    Army, BuildingType, GamePhase, Player, PlayerView, ResourceKind, Resources, Room, TechType,
    UnitType, MAX_ROOM_PLAYERS,
};
pub use store::{SessionStore, StoreChange, SubscriptionId};
pub use turn::{Affordances, TurnStatus};

/// A live session: channel, snapshot, log and composer for one player.
#[derive(Debug)]
pub struct GameSession {
    connection: ConnectionManager,
    store: SessionStore,
    composer: ActionComposer,
}

impl GameSession {
    /// Open the channel for `(room_code, player_id)`.
    pub fn open(
        config: &SessionConfig,
        room_code: &str,
        player_id: &str,
    ) -> Result<Self, ConnectionError> {
        let connection = ConnectionManager::open(config, room_code, player_id)?;
        Ok(Self::with_connection(connection))
    }

    pub fn with_connection(connection: ConnectionManager) -> Self {
        let player_id = connection.player_id().to_string();
        Self {
            store: SessionStore::new(player_id.as_str()),
            composer: ActionComposer::new(player_id),
            connection,
        }
    }

    /// Drain the channel and apply every inbound frame in arrival order.
    pub fn poll(&mut self, elapsed: Duration) -> Vec<StoreChange> {
        let mut changes = Vec::new();

        for frame in self.connection.poll(elapsed) {
            match dispatcher::decode_frame(&frame) {
                Ok(message) => changes.extend(self.store.apply(message)),
                Err(e) => {
                    tracing::warn!(room = %self.connection.room_code(), error = %e, "Dropping frame");
                }
            }
        }

        changes
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SessionStore {
        &mut self.store
    }

    pub fn composer(&self) -> &ActionComposer {
        &self.composer
    }

    /// Transient selection lives here; it never touches the snapshot.
    pub fn composer_mut(&mut self) -> &mut ActionComposer {
        &mut self.composer
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn room(&self) -> Option<&Room> {
        self.store.room()
    }

    pub fn log(&self) -> &EventLog {
        self.store.log()
    }

    pub fn turn_status(&self) -> TurnStatus {
        self.store.turn_status()
    }

    /// Check if the session has nothing left to do.
    pub fn is_over(&self) -> bool {
        self.connection.state().is_terminal()
            || self.store.state().phase() == GamePhase::Finished
    }

    // Intents. Each returns whether a frame was written.

    pub fn build(&mut self, building_type: BuildingType) -> bool {
        let composed = self.composer.build(building_type);
        self.submit(Ok(composed))
    }

    pub fn train_army(&mut self, unit_type: UnitType, quantity: u32) -> bool {
        let composed = self.composer.train_army(unit_type, quantity);
        self.submit(Ok(composed))
    }

    /// Train from the composer's unit and quantity selection.
    pub fn train_selected(&mut self) -> bool {
        let composed = self.composer.train_selected();
        self.submit(composed)
    }

    pub fn research(&mut self, tech_type: TechType) -> bool {
        let composed = self.composer.research(tech_type);
        self.submit(Ok(composed))
    }

    pub fn attack(&mut self, target_player_id: &str) -> bool {
        let target_name = self.store.room().and_then(|r| r.player_name(target_player_id));
        let composed = self.composer.attack(target_player_id, target_name);
        self.submit(composed)
    }

    pub fn trade(
        &mut self,
        target_player_id: Option<&str>,
        offer: Resources,
        request: Resources,
    ) -> bool {
        let target_name = target_player_id
            .and_then(|id| self.store.room().and_then(|r| r.player_name(id)));
        let composed = self
            .composer
            .trade(target_player_id, offer, request, target_name);
        self.submit(composed)
    }

    /// Submit the composer's trade draft.
    pub fn submit_trade(&mut self) -> bool {
        let target_name = self
            .composer
            .trade_draft()
            .target
            .as_deref()
            .and_then(|id| self.store.room().and_then(|r| r.player_name(id)));
        let composed = self.composer.submit_trade(target_name);
        self.submit(composed)
    }

    pub fn end_turn(&mut self) -> bool {
        let composed = self.composer.end_turn();
        self.submit(Ok(composed))
    }

    pub fn set_ready(&mut self, ready: bool) -> bool {
        let composed = self.composer.set_ready(ready);
        self.submit(Ok(composed))
    }

    /// Ask for the opposite of the ready flag in the latest snapshot.
    pub fn toggle_ready(&mut self) -> bool {
        let ready = !self.store.is_ready();
        self.set_ready(ready)
    }

    /// Tear the session down. The channel is closed exactly once and the
    /// transient selection is dropped.
    pub fn close(&mut self) -> Result<(), ConnectionError> {
        self.composer.clear_selection();
        self.connection.close()
    }

    fn submit(&mut self, composed: Result<Outgoing, ComposeError>) -> bool {
        match composed {
            Ok(outgoing) => {
                let written = self.connection.send(&outgoing.message);
                if written {
                    if let Some((text, category)) = outgoing.echo {
                        self.store.record(text, category);
                    }
                }
                written
            }
            Err(e) => {
                tracing::debug!(error = %e, "Action not sent");
                self.store.record(e.to_string(), LogCategory::Warning);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::connection::memory::MemoryChannel;
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn room(phase: &str, turn: &str, p1_ready: bool) -> serde_json::Value {
        json!({
            "code": "ABCD1234",
            "players": {
                "p1": {"id": "p1", "name": "Alice", "is_ready": p1_ready,
                       "resources": {"gold": 100, "wood": 50, "stone": 20, "food": 30}},
                "p2": {"id": "p2", "name": "Bob", "is_ready": true}
            },
            "game_state": phase,
            "current_turn": turn
        })
    }

    fn open_session() -> (GameSession, MemoryChannel) {
        let channel = MemoryChannel::default();
        let connection = ConnectionManager::with_channel(
            Box::new(channel.clone()),
            "ABCD1234",
            "p1",
            DEFAULT_PROBE_AFTER,
        );
        let mut session = GameSession::with_connection(connection);
        channel.push(ChannelEvent::Opened);
        session.poll(Duration::ZERO);
        (session, channel)
    }

    fn sent(channel: &MemoryChannel) -> Vec<serde_json::Value> {
        channel
            .sent()
            .iter()
            .map(|s| serde_json::from_str(s).unwrap())
            .collect()
    }

    #[test]
    fn test_full_session() {
        let (mut session, channel) = open_session();

        channel.push_text(json!({"type": "room_state", "room": room("waiting", "p1", false)}).to_string());
        session.poll(Duration::from_millis(100));
        assert_eq!(
            session.turn_status().indicator(session.room()),
            "Waiting for players... (2/4)"
        );

        assert!(session.toggle_ready());
        assert_eq!(sent(&channel), vec![json!({"type": "player_ready", "ready": true})]);
        // No optimistic update: still not ready until the server says so
        assert!(!session.store().is_ready());

        channel.push_text(
            json!({"type": "player_ready_update", "player_id": "p1", "ready": true,
                   "room": room("waiting", "p1", true)})
            .to_string(),
        );
        channel.push_text(json!({"type": "game_start", "room": room("waiting", "p1", true)}).to_string());
        session.poll(Duration::from_millis(100));

        assert_eq!(session.store().state().phase(), GamePhase::Playing);
        assert!(session.store().is_my_turn());

        assert!(session.build(BuildingType::Barracks));
        assert_eq!(session.log().latest().unwrap().message, "Building Barracks...");

        channel.push_text(
            json!({"type": "action_result", "player_id": "p1",
                   "action": {"type": "build", "building_type": "barracks"},
                   "success": true, "room": room("playing", "p1", true)})
            .to_string(),
        );
        channel.push_text(
            json!({"type": "turn_ended", "next_turn": "p2", "turn_number": 2,
                   "room": room("playing", "p2", true)})
            .to_string(),
        );
        session.poll(Duration::from_millis(100));

        let lines: Vec<&str> = session.log().entries().map(|e| e.message.as_str()).collect();
        assert_eq!(
            lines,
            vec![
                "Turn 2 passes to Bob",
                "Alice built Barracks",
                "Building Barracks...",
                "Game started!",
                "Alice is ready",
            ]
        );
        assert!(!session.store().is_my_turn());

        channel.push_text(
            json!({"type": "game_finished", "winner_id": "p2", "winner_name": "Bob",
                   "room": room("finished", "p2", true)})
            .to_string(),
        );
        session.poll(Duration::from_millis(100));
        assert!(session.is_over());
        assert_eq!(session.log().latest().unwrap().message, "🏆 Bob wins! Game over!");

        session.close().unwrap();
        assert_eq!(channel.closes(), 1);
    }

    #[test]
    fn test_trade_rejected_locally() {
        let (mut session, channel) = open_session();
        channel.push_text(json!({"type": "room_state", "room": room("playing", "p1", true)}).to_string());
        session.poll(Duration::ZERO);

        let offer = Resources::default();
        let request = Resources::new(0, 0, 0, 5);
        assert!(!session.trade(Some("p2"), offer, request));

        assert!(channel.sent().is_empty());
        let latest = session.log().latest().unwrap();
        assert_eq!(latest.category, LogCategory::Warning);
        assert_eq!(latest.message, "Specify resources to offer");
    }

    #[test]
    fn test_trade_sent() {
        let (mut session, channel) = open_session();
        channel.push_text(json!({"type": "room_state", "room": room("playing", "p1", true)}).to_string());
        session.poll(Duration::ZERO);

        session.composer_mut().set_trade_target(Some("p2".to_string()));
        session.composer_mut().set_offer(ResourceKind::Gold, 10);
        session.composer_mut().set_request(ResourceKind::Food, 5);
        assert!(session.submit_trade());

        assert_eq!(
            sent(&channel),
            vec![json!({
                "type": "game_action",
                "action": {
                    "type": "trade",
                    "target_player_id": "p2",
                    "trade_offer": {"gold": 10, "wood": 0, "stone": 0, "food": 0},
                    "trade_request": {"gold": 0, "wood": 0, "stone": 0, "food": 5}
                }
            })]
        );
        assert_eq!(session.log().latest().unwrap().message, "Trade offer sent to Bob");
        assert_eq!(session.composer().trade_draft(), &TradeDraft::default());
    }

    #[test]
    fn test_send_dropped_before_open() {
        let channel = MemoryChannel::default();
        let connection = ConnectionManager::with_channel(
            Box::new(channel.clone()),
            "ABCD1234",
            "p1",
            DEFAULT_PROBE_AFTER,
        );
        let mut session = GameSession::with_connection(connection);

        assert!(!session.research(TechType::TradeRoutes));
        assert!(channel.sent().is_empty());
        // No echo for a frame that never left
        assert!(session.log().is_empty());
    }

    #[test]
    fn test_malformed_frame_dropped() {
        let (mut session, channel) = open_session();
        channel.push_text("{not json");
        channel.push_text(json!({"type": "game_start"}).to_string());
        channel.push_text(json!({"type": "chat", "text": "hi"}).to_string());
        channel.push_text(json!({"type": "room_state", "room": room("waiting", "p1", false)}).to_string());

        let changes = session.poll(Duration::ZERO);
        assert!(changes.contains(&StoreChange::Snapshot));
        assert!(session.log().is_empty());
        assert_eq!(session.room().unwrap().code, "ABCD1234");
    }

    #[test]
    fn test_close_clears_selection() {
        let (mut session, channel) = open_session();
        session.composer_mut().select_action(Some(ActionKind::TrainArmy));
        session.composer_mut().select_unit(Some(UnitType::Cavalry));
        session.composer_mut().set_quantity(4);
        session.composer_mut().set_trade_target(Some("p2".to_string()));

        session.close().unwrap();

        assert_eq!(session.composer().selected_action(), None);
        assert!(session.composer().selected_unit().is_none());
        assert_eq!(session.composer().quantity(), 1);
        assert_eq!(session.composer().trade_draft(), &TradeDraft::default());
        assert_eq!(session.close(), Err(ConnectionError::AlreadyClosed));
        assert_eq!(channel.closes(), 1);
    }

    #[test]
    fn test_attack_self_rejected() {
        let (mut session, channel) = open_session();
        assert!(!session.attack("p1"));
        assert!(channel.sent().is_empty());
        assert_eq!(session.log().latest().unwrap().category, LogCategory::Warning);
    }
}
