//! nhd-normalize
//!
//! Decoders that reduce heterogeneous bridge payloads to canonical shapes.
//!
//! One decode function per event family, each returning a discriminated result
//! with an explicit unrecognised variant:
//! - [`decode_state_event`]: symbol-state fragment → `SymbolStates`
//! - [`decode_price_event`]: price fragment → `MarketPrices`
//! - [`decode_account_event`]: account replacement + connectivity hint
//! - [`decode_engine_flags`]: `active` / `activeStrategy` wrapper fields
//!
//! Pure, deterministic. No IO, no logging; callers decide what to report.

mod account;
mod error;
mod flags;
mod preview;
mod prices;
mod state;

pub use account::{decode_account_event, AccountUpdate};
pub use error::ShapeError;
pub use flags::{decode_engine_flags, EngineFlags};
pub use preview::describe_packet;
pub use prices::{decode_price_event, normalize_price_event, PriceDecode, PriceShape};
pub use state::{decode_state_event, normalize_state_event, StateDecode, StateShape};

use serde_json::Value;

/// Wrapper keys that are never symbols, even in a bare-object payload.
pub const RESERVED_KEYS: [&str; 10] = [
    "active",
    "activeStrategy",
    "symbols",
    "data",
    "prices",
    "status",
    "timestamp",
    "time",
    "type",
    "event",
];

pub(crate) fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

pub(crate) fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "object",
    }
}

/// `v[key]` when present and not null.
pub(crate) fn member<'a>(v: &'a Value, key: &str) -> Option<&'a Value> {
    v.get(key).filter(|m| !m.is_null())
}
