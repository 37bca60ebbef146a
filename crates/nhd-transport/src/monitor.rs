//! Connectivity debounce.
//!
//! A dropped link is only reported as disconnected after it has stayed down
//! for the grace window; a reconnect inside the window is invisible to the
//! consumer apart from a fresh `Connected`.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// No link has been reported yet in this generation.
    Connecting,
    Connected,
    /// Link is down but the consumer still believes it is connected.
    SoftDisconnected { deadline: Instant, reason: String },
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct LinkMonitor {
    state: LinkState,
    grace: Duration,
}

impl LinkMonitor {
    pub fn new(grace: Duration) -> Self {
        Self {
            state: LinkState::Connecting,
            grace,
        }
    }

    /// Monitor for a generation that replaces a link the consumer still
    /// considers live. Unless the new link comes up within `grace`, a
    /// disconnect is surfaced.
    pub fn resumed(grace: Duration, now: Instant, reason: impl Into<String>) -> Self {
        Self {
            state: LinkState::SoftDisconnected {
                deadline: now + grace,
                reason: reason.into(),
            },
            grace,
        }
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn is_link_up(&self) -> bool {
        self.state == LinkState::Connected
    }

    pub fn link_up(&mut self) {
        self.state = LinkState::Connected;
    }

    /// Only a live link starts the grace timer; repeated failures while
    /// already soft- or hard-disconnected keep the original deadline.
    pub fn link_down(&mut self, reason: impl Into<String>, now: Instant) {
        if self.state == LinkState::Connected {
            self.state = LinkState::SoftDisconnected {
                deadline: now + self.grace,
                reason: reason.into(),
            };
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            LinkState::SoftDisconnected { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    /// Returns the disconnect reason once the grace window has lapsed.
    pub fn poll_deadline(&mut self, now: Instant) -> Option<String> {
        match &self.state {
            LinkState::SoftDisconnected { deadline, reason } if now >= *deadline => {
                let reason = reason.clone();
                self.state = LinkState::Disconnected;
                Some(reason)
            }
            _ => None,
        }
    }
}
