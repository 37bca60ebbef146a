use serde_json::Value;

/// Which flavour of the bridge connection is carrying the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Polling,
    WebSocket,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Polling => "polling",
            TransportKind::WebSocket => "websocket",
        }
    }
}

/// The three names that carry strategy state. All are handled identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateSource {
    StrategyState,
    StrategyUpdate,
    Heartbeat,
}

impl StateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateSource::StrategyState => "strategy_state",
            StateSource::StrategyUpdate => "strategy_update",
            StateSource::Heartbeat => "heartbeat",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Link established (possibly again, within the grace window).
    Connected { transport: TransportKind },
    /// Link lost for longer than the grace window.
    Disconnected { reason: String },
    State { source: StateSource, payload: Value },
    Prices { name: String, payload: Value },
    Account { payload: Value },
    /// Any other named event; kept for the packet inspector.
    Unknown { name: String, payload: Value },
}

impl EventKind {
    pub fn from_wire(name: &str, payload: Value) -> Self {
        match name {
            "strategy_state" => EventKind::State {
                source: StateSource::StrategyState,
                payload,
            },
            "strategy_update" => EventKind::State {
                source: StateSource::StrategyUpdate,
                payload,
            },
            "heartbeat" => EventKind::State {
                source: StateSource::Heartbeat,
                payload,
            },
            "market_data" | "market_update" => EventKind::Prices {
                name: name.to_string(),
                payload,
            },
            "account_update" => EventKind::Account { payload },
            _ => EventKind::Unknown {
                name: name.to_string(),
                payload,
            },
        }
    }

    /// Wire name and payload for inbound data events; `None` for link changes.
    pub fn inbound(&self) -> Option<(&str, &Value)> {
        match self {
            EventKind::State { source, payload } => Some((source.as_str(), payload)),
            EventKind::Prices { name, payload } | EventKind::Unknown { name, payload } => {
                Some((name.as_str(), payload))
            }
            EventKind::Account { payload } => Some(("account_update", payload)),
            EventKind::Connected { .. } | EventKind::Disconnected { .. } => None,
        }
    }
}

/// An event tagged with the connection generation that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub generation: u64,
    pub kind: EventKind,
}
