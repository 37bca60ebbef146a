//! Engine.IO v4 / Socket.IO v5 wire codec.
//!
//! Engine.IO frames: a one-digit type followed by data. Over HTTP long-polling
//! several frames share one body, separated by the ASCII record separator.
//! A Socket.IO packet rides inside an Engine.IO `message` frame:
//! `<type>[/<namespace>,][<ack id>][<json>]`.

use serde::Deserialize;
use serde_json::Value;

use crate::TransportError;

pub const EIO_VERSION: &str = "4";
const RECORD_SEPARATOR: char = '\u{1e}';

// ---------------------------------------------------------------------------
// Engine.IO
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    Open(String),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(raw: &str) -> Result<Self, TransportError> {
        let mut chars = raw.chars();
        let Some(kind) = chars.next() else {
            return Err(TransportError::Protocol("empty engine packet".to_string()));
        };
        let data = chars.as_str().to_string();
        match kind {
            '0' => Ok(EnginePacket::Open(data)),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(data)),
            '3' => Ok(EnginePacket::Pong(data)),
            '4' => Ok(EnginePacket::Message(data)),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(TransportError::Protocol(format!(
                "unknown engine packet type {other:?}"
            ))),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(d) => format!("0{d}"),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(d) => format!("2{d}"),
            EnginePacket::Pong(d) => format!("3{d}"),
            EnginePacket::Message(d) => format!("4{d}"),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

/// Split a long-polling body into frames. Empty segments are ignored.
pub fn decode_payload(body: &str) -> Result<Vec<EnginePacket>, TransportError> {
    body.split(RECORD_SEPARATOR)
        .filter(|seg| !seg.is_empty())
        .map(EnginePacket::decode)
        .collect()
}

pub fn encode_payload(packets: &[EnginePacket]) -> String {
    packets
        .iter()
        .map(EnginePacket::encode)
        .collect::<Vec<_>>()
        .join(&RECORD_SEPARATOR.to_string())
}

/// Data of the Engine.IO `open` frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: u64,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

impl Handshake {
    pub fn parse(data: &str) -> Result<Self, TransportError> {
        serde_json::from_str(data).map_err(|e| TransportError::Handshake(e.to_string()))
    }

    pub fn can_upgrade(&self) -> bool {
        self.upgrades.iter().any(|u| u == "websocket")
    }
}

// ---------------------------------------------------------------------------
// Socket.IO
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect { sid: Option<String> },
    Disconnect,
    Event { name: String, data: Value },
    ConnectError { message: String },
    /// Acks and binary packets; not used by the bridge.
    Other(char),
}

impl SocketPacket {
    /// Namespace connect request for the default namespace.
    pub const CONNECT: &'static str = "0";

    pub fn decode(raw: &str) -> Result<Self, TransportError> {
        let mut chars = raw.chars();
        let Some(kind) = chars.next() else {
            return Err(TransportError::Protocol("empty socket packet".to_string()));
        };
        let mut rest = chars.as_str();

        // Namespace ("/admin,") precedes the ack id and payload.
        if rest.starts_with('/') {
            rest = match rest.find(',') {
                Some(i) => &rest[i + 1..],
                None => "",
            };
        }
        let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());

        let json = || -> Result<Value, TransportError> {
            if rest.is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(rest).map_err(|e| TransportError::Protocol(e.to_string()))
        };

        match kind {
            '0' => Ok(SocketPacket::Connect {
                sid: json()?.get("sid").and_then(Value::as_str).map(str::to_string),
            }),
            '1' => Ok(SocketPacket::Disconnect),
            '2' => {
                let Value::Array(mut args) = json()? else {
                    return Err(TransportError::Protocol("event without argument array".to_string()));
                };
                if args.is_empty() {
                    return Err(TransportError::Protocol("event without name".to_string()));
                }
                let name = match args.remove(0) {
                    Value::String(s) => s,
                    other => {
                        return Err(TransportError::Protocol(format!("event name is {other}")))
                    }
                };
                let data = if args.is_empty() {
                    Value::Null
                } else {
                    args.swap_remove(0)
                };
                Ok(SocketPacket::Event { name, data })
            }
            '4' => {
                let v = json()?;
                let message = v
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| v.to_string());
                Ok(SocketPacket::ConnectError { message })
            }
            other => Ok(SocketPacket::Other(other)),
        }
    }

    /// `2["name"]` or `2["name",data]`.
    pub fn encode_event(name: &str, data: Option<&Value>) -> String {
        let args = match data {
            Some(d) => Value::Array(vec![Value::String(name.to_string()), d.clone()]),
            None => Value::Array(vec![Value::String(name.to_string())]),
        };
        format!("2{args}")
    }
}
