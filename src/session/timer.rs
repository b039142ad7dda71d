//! Session timers, driven by the caller's poll loop.
//!
//! Timers carry no thread of their own: every [`Timer::update`] call advances
//! them by the elapsed time and hands back the ones that fired.

use std::time::Duration;

/// What a timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Warn if the channel is still connecting
    ConnectProbe,
}

impl TimerId {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerId::ConnectProbe => "connect_probe",
        }
    }
}

#[derive(Debug, Clone)]
struct TimeEntry {
    id: TimerId,
    remaining: Duration,
}

/// One-shot timers keyed by [`TimerId`].
#[derive(Debug, Clone, Default)]
pub struct Timer {
    entries: Vec<TimeEntry>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a timer. An existing timer with the same id is restarted.
    pub fn start(&mut self, id: TimerId, after: Duration) {
        self.entries.retain(|e| e.id != id);
        self.entries.push(TimeEntry {
            id,
            remaining: after,
        });
    }

    /// Cancel a timer if it is still pending.
    pub fn cancel(&mut self, id: TimerId) {
        self.entries.retain(|e| e.id != id);
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Advance all timers and return the ones that fired, in start order.
    pub fn update(&mut self, elapsed: Duration) -> Vec<TimerId> {
        let mut fired = Vec::new();

        for entry in self.entries.iter_mut() {
            entry.remaining = entry.remaining.saturating_sub(elapsed);
            if entry.remaining.is_zero() {
                fired.push(entry.id);
            }
        }

        self.entries.retain(|e| !fired.contains(&e.id));
        fired
    }
}
