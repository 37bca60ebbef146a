use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::lenient;

/// HMA periods every freshly seeded symbol carries a (flat) trend for.
pub const SEED_HMA_PERIODS: [u32; 5] = [15, 30, 60, 120, 240];

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Directional stance reported by the engine for a symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrendBias {
    Long,
    Short,
    Hedged,
    #[default]
    None,
}

impl TrendBias {
    /// Case-insensitive parse. BULL/BUY and BEAR/SELL are synonyms for
    /// LONG and SHORT; anything unrecognised is `None`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "LONG" | "BULL" | "BUY" => TrendBias::Long,
            "SHORT" | "BEAR" | "SELL" => TrendBias::Short,
            "HEDGED" => TrendBias::Hedged,
            _ => TrendBias::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendBias::Long => "LONG",
            TrendBias::Short => "SHORT",
            TrendBias::Hedged => "HEDGED",
            TrendBias::None => "NONE",
        }
    }
}

/// Strategy lifecycle status of a symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolStatus {
    #[default]
    Scanning,
    Locked,
    Scaling,
    Invalidated,
    Monitor,
    Idle,
}

impl SymbolStatus {
    /// Case-insensitive parse; unknown values collapse to `Idle`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SCANNING" => SymbolStatus::Scanning,
            "LOCKED" => SymbolStatus::Locked,
            "SCALING" => SymbolStatus::Scaling,
            "INVALIDATED" => SymbolStatus::Invalidated,
            "MONITOR" => SymbolStatus::Monitor,
            _ => SymbolStatus::Idle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolStatus::Scanning => "SCANNING",
            SymbolStatus::Locked => "LOCKED",
            SymbolStatus::Scaling => "SCALING",
            SymbolStatus::Invalidated => "INVALIDATED",
            SymbolStatus::Monitor => "MONITOR",
            SymbolStatus::Idle => "IDLE",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HmaTrend {
    Up,
    Down,
    #[default]
    Flat,
}

impl HmaTrend {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "UP" => HmaTrend::Up,
            "DOWN" => HmaTrend::Down,
            _ => HmaTrend::Flat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HmaTrend::Up => "UP",
            HmaTrend::Down => "DOWN",
            HmaTrend::Flat => "FLAT",
        }
    }
}

macro_rules! string_enum_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let v = Value::deserialize(d)?;
                Ok(v.as_str().map(<$ty>::parse).unwrap_or_default())
            }
        }
    };
}

string_enum_serde!(TrendBias);
string_enum_serde!(SymbolStatus);
string_enum_serde!(HmaTrend);

// ---------------------------------------------------------------------------
// TradeEntry
// ---------------------------------------------------------------------------

/// One resting or filled order within a symbol's scaling sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeEntry {
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub price: f64,
    /// Epoch time as reported by the bridge (seconds or milliseconds).
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub time: f64,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub reason: String,
    /// Explicit order-type marker; `"PENDING"` is the only value with meaning.
    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub kind: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_f64"
    )]
    pub pnl: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_f64"
    )]
    pub profit: Option<f64>,
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
}

// ---------------------------------------------------------------------------
// SymbolState
// ---------------------------------------------------------------------------

/// Engine-reported state for one traded instrument.
///
/// `entries` order is layer order (1-based) and is never re-sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolState {
    #[serde(default, alias = "trendBias")]
    pub trend_bias: TrendBias,
    #[serde(default)]
    pub status: SymbolStatus,
    #[serde(default, deserialize_with = "lenient::seq_of")]
    pub entries: Vec<TradeEntry>,
    #[serde(
        default,
        alias = "entryCount",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_u64"
    )]
    pub entry_count: Option<u64>,
    #[serde(default, alias = "hmaValues", deserialize_with = "lenient::number_map")]
    pub hma_values: BTreeMap<String, f64>,
    #[serde(default, alias = "hmaTrends", deserialize_with = "lenient::trend_map")]
    pub hma_trends: BTreeMap<String, HmaTrend>,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "lenient::number_map"
    )]
    pub oscillators: BTreeMap<String, f64>,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "lenient::string_map"
    )]
    pub confluence: BTreeMap<String, String>,
}

impl SymbolState {
    /// State a universe symbol starts with before the engine reports on it.
    pub fn seed() -> Self {
        Self {
            hma_trends: SEED_HMA_PERIODS
                .iter()
                .map(|p| (p.to_string(), HmaTrend::Flat))
                .collect(),
            ..Self::default()
        }
    }
}

/// Canonical symbol → state mapping.
pub type SymbolStates = BTreeMap<String, SymbolState>;

/// Symbol → last-known price.
pub type MarketPrices = BTreeMap<String, f64>;
