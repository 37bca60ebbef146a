use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{lenient, SymbolStatus, TrendBias};

/// A filled entry currently carrying exposure. Derived every tick, never stored
/// by the engine itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePosition {
    pub symbol: String,
    #[serde(rename = "type")]
    pub bias: TrendBias,
    pub entry_price: f64,
    pub pnl: f64,
    /// 1-based position within the symbol's entry sequence.
    pub layer: u32,
    pub reason: String,
    /// Display time (`HH:MM:SS` in the configured timezone).
    pub time: String,
    pub status: SymbolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

/// A resting order, or a watchlist lock (LOCKED symbol, nothing placed yet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOrder {
    pub symbol: String,
    pub bias: TrendBias,
    pub status: SymbolStatus,
    /// Last known price, 0 when unknown.
    pub current_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// Entry layer the order came from; `None` for a watchlist lock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<u32>,
}

impl PendingOrder {
    pub fn is_watchlist_lock(&self) -> bool {
        self.layer.is_none() && self.ticket.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalStatus {
    #[default]
    #[serde(alias = "CLOSED")]
    Filled,
    #[serde(alias = "CANCELED")]
    Cancelled,
}

impl FinalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalStatus::Filled => "FILLED",
            FinalStatus::Cancelled => "CANCELLED",
        }
    }
}

/// Snapshot of a position or order at the moment it left the derived
/// collections. Immutable once written.
///
/// Remote ledgers may hold records written by other clients, so every field
/// decodes leniently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedTradeRecord {
    /// Content-derived id; nil for records that arrived without one.
    #[serde(default)]
    pub id: Uuid,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub symbol: String,
    #[serde(rename = "type", default)]
    pub bias: TrendBias,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub entry_price: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub pnl: f64,
    #[serde(default, deserialize_with = "lenient::u32_or_zero")]
    pub layer: u32,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub reason: String,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SymbolStatus>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_ticket"
    )]
    pub ticket: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_f64"
    )]
    pub volume: Option<f64>,
    #[serde(default)]
    pub final_status: FinalStatus,
    /// Epoch millis of the tick that produced the record; 0 if unknown.
    #[serde(default)]
    pub closed_at_ms: i64,
}

impl ClosedTradeRecord {
    /// Deterministic id over the fields that identify a transition.
    /// No RNG: the same transition observed twice yields the same id.
    pub fn derive_id(&self) -> Uuid {
        let identity = match self.ticket {
            Some(t) => format!("ticket:{t}"),
            None => format!("layer:{}", self.layer),
        };
        let name = format!(
            "nhd.closed_trade|{}|{}|{}|{}|{}",
            self.symbol,
            identity,
            self.final_status.as_str(),
            self.closed_at_ms,
            self.time
        );
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
    }

    /// Assign a derived id when the record has none.
    pub fn ensure_id(&mut self) {
        if self.id.is_nil() {
            self.id = self.derive_id();
        }
    }
}
