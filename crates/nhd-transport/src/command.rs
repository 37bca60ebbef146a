use nhd_schemas::LogEntry;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Risk parameters pushed with `update_risk`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSettings {
    pub risk_per_stack: f64,
    pub daily_max_loss: f64,
    pub max_drawdown: f64,
    pub auto_pause: bool,
}

/// Outbound events. Fire-and-forget: the bridge never acknowledges them.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    RequestFullState,
    SubscribeAll,
    StartEngine,
    StopEngine,
    PanicClose,
    KillAll,
    ClosePosition {
        symbol: Option<String>,
        ticket: Option<u64>,
    },
    UpdateRisk(RiskSettings),
    /// Locally generated telemetry forwarded to the bridge.
    NewLog(LogEntry),
}

impl ControlCommand {
    /// The panic button closes everything and then kills the engine.
    pub fn panic_sequence() -> [ControlCommand; 2] {
        [ControlCommand::PanicClose, ControlCommand::KillAll]
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            ControlCommand::RequestFullState => "request_full_state",
            ControlCommand::SubscribeAll => "subscribe_all",
            ControlCommand::StartEngine => "start_engine",
            ControlCommand::StopEngine => "stop_engine",
            ControlCommand::PanicClose => "panic_close",
            ControlCommand::KillAll => "kill_all",
            ControlCommand::ClosePosition { .. } => "close_position",
            ControlCommand::UpdateRisk(_) => "update_risk",
            ControlCommand::NewLog(_) => "new_log_client",
        }
    }

    pub fn payload(&self) -> Option<Value> {
        match self {
            ControlCommand::ClosePosition { symbol, ticket } => {
                let mut body = serde_json::Map::new();
                if let Some(s) = symbol {
                    body.insert("symbol".to_string(), json!(s));
                }
                if let Some(t) = ticket {
                    body.insert("ticket".to_string(), json!(t));
                }
                Some(Value::Object(body))
            }
            ControlCommand::UpdateRisk(risk) => serde_json::to_value(risk).ok(),
            ControlCommand::NewLog(entry) => serde_json::to_value(entry).ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhd_schemas::LogLevel;

    #[test]
    fn risk_payload_uses_bridge_field_names() {
        let cmd = ControlCommand::UpdateRisk(RiskSettings {
            risk_per_stack: 1.5,
            daily_max_loss: 500.0,
            max_drawdown: 10.0,
            auto_pause: true,
        });
        assert_eq!(cmd.event_name(), "update_risk");
        assert_eq!(
            cmd.payload(),
            Some(json!({"riskPerStack": 1.5, "dailyMaxLoss": 500.0, "maxDrawdown": 10.0, "autoPause": true}))
        );
    }

    #[test]
    fn close_position_only_carries_given_keys() {
        let cmd = ControlCommand::ClosePosition {
            symbol: Some("BTCUSD".to_string()),
            ticket: None,
        };
        assert_eq!(cmd.payload(), Some(json!({"symbol": "BTCUSD"})));
    }

    #[test]
    fn log_forwarding_and_bare_commands() {
        let entry = LogEntry::new("10:00:00", LogLevel::Info, "SYS", "hello");
        let cmd = ControlCommand::NewLog(entry);
        assert_eq!(cmd.event_name(), "new_log_client");
        assert_eq!(cmd.payload().unwrap()["msg"], "hello");
        assert_eq!(ControlCommand::SubscribeAll.payload(), None);
        let names: Vec<_> = ControlCommand::panic_sequence()
            .iter()
            .map(ControlCommand::event_name)
            .collect();
        assert_eq!(names, ["panic_close", "kill_all"]);
    }
}
