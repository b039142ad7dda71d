//! Strategy Session Library
//!
//! Client-side session synchronization for a turn-based multiplayer strategy
//! game. The server is authoritative: this crate keeps one channel per
//! (room, player), mirrors the server's room snapshot, narrates events into a
//! bounded log and encodes player intent into outgoing actions.
//!
//! # Overview
//!
//! - **Connection** - one persistent channel per session, closed exactly once,
//!   never reconnected.
//!
//! - **Dispatch** - nine tagged server events, each mapped to a snapshot
//!   replacement and an optional human-readable log line.
//!
//! - **Snapshot** - whole-room replacement on every update, never merged.
//!
//! - **Turn tracking** - turn ownership and phase-gated affordances derived
//!   from the snapshot.
//!
//! - **Composer** - build, train, research, attack and trade actions with
//!   client-side checks.
//!
//! # Design Principles
//!
//! 1. **The server decides** - no outcome, cost or win condition is computed
//!    here. Rejections come back as log lines.
//!
//! 2. **Sequential handling** - each frame is fully applied before the next.
//!
//! 3. **Nothing fatal** - malformed frames, rejected actions and closed
//!    channels degrade to a log line or a diagnostic event.
//!
//! # Example
//!
//! ```rust
//! use strategy_session::{ServerMessage, SessionStore};
//!
//! let mut store = SessionStore::new("p1");
//! let frame = r#"{
//!     "type": "turn_ended",
//!     "next_turn": "p2",
//!     "turn_number": 4,
//!     "room": {
//!         "code": "ABCD1234",
//!         "players": {
//!             "p1": {"id": "p1", "name": "Alice"},
//!             "p2": {"id": "p2", "name": "Bob"}
//!         },
//!         "game_state": "playing",
//!         "current_turn": "p2"
//!     }
//! }"#;
//!
//! store.apply(ServerMessage::decode(frame).unwrap());
//! assert_eq!(store.log().latest().unwrap().message, "Turn 4 passes to Bob");
//! assert!(!store.is_my_turn());
//! ```

pub mod session;

// Re-export everything from session module at crate root
pub use session::*;
