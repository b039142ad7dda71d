//! Connection management.
//!
//! One persistent text channel per (room, player) session. The manager drains
//! channel events on every poll, hands inbound text frames back to the caller
//! and writes outbound frames only while the channel is open. Nothing is
//! queued and nothing is retried: a dropped channel ends the session.

use std::fmt;
use std::time::Duration;

use ewebsock::{WsEvent, WsMessage, WsReceiver, WsSender};

use super::config::SessionConfig;
use super::protocol::ClientMessage;
use super::timer::{Timer, TimerId};

/// Something that happened on the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Opened,
    Text(String),
    Error(String),
    Closed,
}

/// A bidirectional text channel.
pub trait Channel {
    /// Write one text frame.
    fn send_text(&mut self, text: String);

    /// Next pending event, if any. Never blocks.
    fn try_recv(&mut self) -> Option<ChannelEvent>;

    /// Close the channel.
    fn close(&mut self);
}

/// Channel errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The channel could not be opened
    Connect(String),
    /// The session already released its channel
    AlreadyClosed,
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(reason) => write!(f, "Could not open channel: {}", reason),
            Self::AlreadyClosed => write!(f, "Channel already closed"),
        }
    }
}

impl std::error::Error for ConnectionError {}

/// WebSocket channel backed by ewebsock.
pub struct WsChannel {
    sender: WsSender,
    receiver: WsReceiver,
}

impl WsChannel {
    /// Start connecting to `url`. The handshake completes in the background.
    pub fn connect(url: &str) -> Result<Self, ConnectionError> {
        let (sender, receiver) = ewebsock::connect(url, ewebsock::Options::default())
            .map_err(ConnectionError::Connect)?;
        Ok(Self { sender, receiver })
    }
}

impl Channel for WsChannel {
    fn send_text(&mut self, text: String) {
        self.sender.send(WsMessage::Text(text));
    }

    fn try_recv(&mut self) -> Option<ChannelEvent> {
        loop {
            match self.receiver.try_recv()? {
                WsEvent::Opened => return Some(ChannelEvent::Opened),
                WsEvent::Message(WsMessage::Text(text)) => return Some(ChannelEvent::Text(text)),
                WsEvent::Message(other) => {
                    // Only text frames are part of the protocol
                    tracing::debug!(frame = ?other, "Ignoring non-text frame");
                    continue;
                }
                WsEvent::Error(reason) => return Some(ChannelEvent::Error(reason)),
                WsEvent::Closed => return Some(ChannelEvent::Closed),
            }
        }
    }

    fn close(&mut self) {
        self.sender.close();
    }
}

/// Channel lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshake in progress
    Connecting,

    /// Frames flow both ways
    Open,

    /// Closed by either side
    Closed,

    /// Transport error; terminal
    Failed(String),
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Failed(_) => "failed",
        }
    }

    /// Check if outbound frames may be written.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Check if the channel is gone for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed ({})", reason),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Owns the channel for one session.
pub struct ConnectionManager {
    /// Room this channel is addressed to
    room_code: String,

    /// Local player id
    player_id: String,

    channel: Box<dyn Channel>,

    state: ConnectionState,

    timer: Timer,

    /// Set once `close` has released the channel
    released: bool,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("room_code", &self.room_code)
            .field("player_id", &self.player_id)
            .field("state", &self.state)
            .field("released", &self.released)
            .finish()
    }
}

impl ConnectionManager {
    /// Open the session channel at `{ws_base}/ws/{room_code}/{player_id}`.
    pub fn open(
        config: &SessionConfig,
        room_code: &str,
        player_id: &str,
    ) -> Result<Self, ConnectionError> {
        let url = config.channel_url(room_code, player_id);
        tracing::info!(room = room_code, player = player_id, %url, "Opening channel");

        let channel = WsChannel::connect(&url).map_err(|e| {
            tracing::error!(room = room_code, player = player_id, error = %e, "Channel open failed");
            e
        })?;

        Ok(Self::with_channel(
            Box::new(channel),
            room_code,
            player_id,
            config.probe_after,
        ))
    }

    /// Wrap an already created channel.
    pub fn with_channel(
        channel: Box<dyn Channel>,
        room_code: impl Into<String>,
        player_id: impl Into<String>,
        probe_after: Duration,
    ) -> Self {
        let mut timer = Timer::new();
        timer.start(TimerId::ConnectProbe, probe_after);

        Self {
            room_code: room_code.into(),
            player_id: player_id.into(),
            channel,
            state: ConnectionState::Connecting,
            timer,
            released: false,
        }
    }

    pub fn room_code(&self) -> &str {
        &self.room_code
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Drain pending channel events in order and return inbound text frames.
    pub fn poll(&mut self, elapsed: Duration) -> Vec<String> {
        let mut frames = Vec::new();
        if self.released {
            return frames;
        }

        while let Some(event) = self.channel.try_recv() {
            match event {
                ChannelEvent::Opened => {
                    tracing::info!(room = %self.room_code, player = %self.player_id, "Channel open");
                    self.state = ConnectionState::Open;
                    self.timer.cancel(TimerId::ConnectProbe);
                }
                ChannelEvent::Text(text) => frames.push(text),
                ChannelEvent::Error(reason) => {
                    tracing::warn!(room = %self.room_code, error = %reason, "Channel error");
                    self.state = ConnectionState::Failed(reason);
                    self.timer.cancel_all();
                }
                ChannelEvent::Closed => {
                    tracing::info!(room = %self.room_code, "Channel closed by server");
                    if !self.state.is_terminal() {
                        self.state = ConnectionState::Closed;
                    }
                    self.timer.cancel_all();
                }
            }
        }

        for id in self.timer.update(elapsed) {
            match id {
                TimerId::ConnectProbe if self.state == ConnectionState::Connecting => {
                    tracing::warn!(
                        room = %self.room_code,
                        player = %self.player_id,
                        timer = id.as_str(),
                        "Channel still connecting"
                    );
                }
                TimerId::ConnectProbe => {}
            }
        }

        frames
    }

    /// Write a frame if the channel is open. Returns whether it was written.
    pub fn send(&mut self, message: &ClientMessage) -> bool {
        if !self.state.is_open() || self.released {
            tracing::debug!(tag = message.tag(), state = %self.state, "Dropping frame, channel not open");
            return false;
        }

        match message.encode() {
            Ok(text) => {
                tracing::debug!(tag = message.tag(), "Sending frame");
                self.channel.send_text(text);
                true
            }
            Err(e) => {
                tracing::error!(tag = message.tag(), error = %e, "Could not encode frame");
                false
            }
        }
    }

    /// Release the channel and cancel every timer. Only the first call closes.
    pub fn close(&mut self) -> Result<(), ConnectionError> {
        if self.released {
            return Err(ConnectionError::AlreadyClosed);
        }

        self.released = true;
        self.timer.cancel_all();
        self.channel.close();
        if !self.state.is_terminal() {
            self.state = ConnectionState::Closed;
        }
        tracing::info!(room = %self.room_code, player = %self.player_id, "Session channel released");
        Ok(())
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
