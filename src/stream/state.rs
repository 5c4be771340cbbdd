//! Connection state machine for a stream session

/// State of the stream connection
///
/// Transitions are validated so every component observes the same
/// lifecycle: `Idle → Connecting → Connected → (Closed | Errored) → Idle`,
/// with retries re-entering `Connecting` from the two terminal outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session, or the session was explicitly stopped
    Idle,
    /// A connection attempt is in progress
    Connecting,
    /// Frames are flowing
    Connected,
    /// The transport closed normally
    Closed,
    /// The transport failed
    Errored,
}

impl ConnectionState {
    /// Check if this state transition is valid
    pub fn can_transition_to(&self, target: &ConnectionState) -> bool {
        use ConnectionState::*;

        match (self, target) {
            (Idle, Connecting) => true,

            (Connecting, Connected) => true,
            // a failed attempt counts as an errored session
            (Connecting, Errored) => true,

            (Connected, Closed) => true,
            (Connected, Errored) => true,

            // retry path and explicit stop
            (Closed, Connecting) => true,
            (Errored, Connecting) => true,
            (Closed, Idle) => true,
            (Errored, Idle) => true,

            // stop can interrupt any phase
            (Connecting, Idle) => true,
            (Connected, Idle) => true,

            (a, b) if a == b => true,

            _ => false,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "Idle",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Closed => "Closed",
            ConnectionState::Errored => "Errored",
        }
    }

    /// Check if the session is playing or trying to
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Connected
        )
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Shared, validated state cell observed by all session components.
///
/// Only the network domain writes; reads are cheap enough for any
/// consumer. The render callback never touches this.
#[derive(Clone)]
pub struct StateCell {
    inner: std::sync::Arc<std::sync::Mutex<ConnectionState>>,
}

impl StateCell {
    pub fn new() -> Self {
        Self {
            inner: std::sync::Arc::new(std::sync::Mutex::new(ConnectionState::Idle)),
        }
    }

    pub fn get(&self) -> ConnectionState {
        self.inner
            .lock()
            .map(|s| *s)
            .unwrap_or(ConnectionState::Errored)
    }

    /// Apply a transition; invalid ones are refused and logged.
    pub fn set(&self, next: ConnectionState) -> bool {
        let Ok(mut current) = self.inner.lock() else {
            return false;
        };
        if !current.can_transition_to(&next) {
            log::warn!("refused state transition {} -> {}", *current, next);
            return false;
        }
        if *current != next {
            log::debug!("connection state {} -> {}", *current, next);
            *current = next;
        }
        true
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
