use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::lenient;

/// Triggers whose log lines make up the execution log.
pub const EXECUTION_TRIGGERS: [&str; 5] = ["MT5_EXEC", "SIM_EXEC", "MANUAL", "API", "HISTORY"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LogLevel {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "success" => LogLevel::Success,
            "warning" | "warn" => LogLevel::Warning,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(d)?;
        Ok(v.as_str().map(LogLevel::parse).unwrap_or_default())
    }
}

/// One line of user-visible telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub time: String,
    #[serde(rename = "type", default)]
    pub level: LogLevel,
    /// Source tag, e.g. `NET`, `SYS`, `MT5_EXEC`.
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub trigger: String,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub msg: String,
}

impl LogEntry {
    pub fn new(
        time: impl Into<String>,
        level: LogLevel,
        trigger: &str,
        msg: impl Into<String>,
    ) -> Self {
        Self {
            time: time.into(),
            level,
            trigger: trigger.to_string(),
            msg: msg.into(),
        }
    }

    pub fn is_execution(&self) -> bool {
        EXECUTION_TRIGGERS.contains(&self.trigger.as_str())
    }
}
