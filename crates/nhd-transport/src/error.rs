use std::fmt;

/// Transport failures. All are recovered by the reconnect policy; none are
/// surfaced beyond the connectivity state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Engine.IO open packet missing or malformed.
    Handshake(String),
    /// Server refused the namespace connect.
    Rejected(String),
    /// A frame could not be decoded.
    Protocol(String),
    Http(String),
    WebSocket(String),
    Timeout(&'static str),
    Closed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handshake(e) => write!(f, "handshake failed: {e}"),
            Self::Rejected(e) => write!(f, "connect rejected: {e}"),
            Self::Protocol(e) => write!(f, "protocol error: {e}"),
            Self::Http(e) => write!(f, "http error: {e}"),
            Self::WebSocket(e) => write!(f, "websocket error: {e}"),
            Self::Timeout(what) => write!(f, "timed out waiting for {what}"),
            Self::Closed => write!(f, "transport closed"),
        }
    }
}

impl std::error::Error for TransportError {}
