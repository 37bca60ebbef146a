use nhd_schemas::lenient;
use serde_json::Value;

/// Global engine flags that ride along on strategy payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineFlags {
    /// `active`: whether the remote strategy engine is running.
    pub active: Option<bool>,
    /// `activeStrategy`: display name of the running strategy.
    pub strategy_name: Option<String>,
}

impl EngineFlags {
    pub fn is_empty(&self) -> bool {
        self.active.is_none() && self.strategy_name.is_none()
    }
}

pub fn decode_engine_flags(raw: &Value) -> EngineFlags {
    EngineFlags {
        active: raw.get("active").and_then(Value::as_bool),
        strategy_name: raw
            .get("activeStrategy")
            .and_then(lenient::text)
            .filter(|s| !s.trim().is_empty()),
    }
}
