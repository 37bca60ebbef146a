use nhd_schemas::{SymbolState, SymbolStates};
use serde_json::{Map, Value};

use crate::{is_reserved, kind_of, member, ShapeError};

/// Where the symbol records were found and in which form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateShape {
    /// `{symbols: {SYM: {...}}}`
    SymbolsMap,
    /// `{symbols: [{symbol: SYM, ...}]}`
    SymbolsSequence,
    /// `{data: {symbols: {SYM: {...}}}}`
    DataSymbolsMap,
    /// `{data: {symbols: [{symbol: SYM, ...}]}}`
    DataSymbolsSequence,
    /// `{SYM: {...}}`
    BareMap,
    /// `[{symbol: SYM, ...}]`
    BareSequence,
}

impl StateShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateShape::SymbolsMap => "symbols-map",
            StateShape::SymbolsSequence => "symbols-sequence",
            StateShape::DataSymbolsMap => "data-symbols-map",
            StateShape::DataSymbolsSequence => "data-symbols-sequence",
            StateShape::BareMap => "bare-map",
            StateShape::BareSequence => "bare-sequence",
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(
            self,
            StateShape::SymbolsSequence
                | StateShape::DataSymbolsSequence
                | StateShape::BareSequence
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateDecode {
    Recognized {
        shape: StateShape,
        symbols: SymbolStates,
        /// Records skipped because they had no symbol or did not decode.
        dropped: usize,
    },
    Unrecognized(ShapeError),
}

impl StateDecode {
    pub fn into_symbols(self) -> Option<SymbolStates> {
        match self {
            StateDecode::Recognized { symbols, .. } => Some(symbols),
            StateDecode::Unrecognized(_) => None,
        }
    }
}

/// Classify a symbol-state payload.
///
/// Precedence follows the bridge's wrapping conventions: a non-null `symbols`
/// member wins, then `data.symbols`, then the payload itself.
pub fn decode_state_event(raw: &Value) -> StateDecode {
    if let Some(inner) = member(raw, "symbols") {
        return decode_container(
            inner,
            "symbols",
            StateShape::SymbolsMap,
            StateShape::SymbolsSequence,
        );
    }

    if let Some(inner) = raw.get("data").and_then(|d| member(d, "symbols")) {
        return decode_container(
            inner,
            "data.symbols",
            StateShape::DataSymbolsMap,
            StateShape::DataSymbolsSequence,
        );
    }

    match raw {
        Value::Array(items) => {
            let (symbols, dropped) = from_sequence(items);
            StateDecode::Recognized {
                shape: StateShape::BareSequence,
                symbols,
                dropped,
            }
        }
        Value::Object(map) => {
            let candidates: Vec<(&String, &Value)> = map
                .iter()
                .filter(|(k, v)| !is_reserved(k) && v.is_object())
                .collect();
            if candidates.is_empty() {
                return StateDecode::Unrecognized(ShapeError::NoSymbols);
            }
            let (symbols, dropped) = from_pairs(candidates.into_iter());
            StateDecode::Recognized {
                shape: StateShape::BareMap,
                symbols,
                dropped,
            }
        }
        other => StateDecode::Unrecognized(ShapeError::UnsupportedRoot {
            found: kind_of(other),
        }),
    }
}

/// Mapping form of a symbol-state payload, or `None` when unclassifiable.
pub fn normalize_state_event(raw: &Value) -> Option<SymbolStates> {
    decode_state_event(raw).into_symbols()
}

fn decode_container(
    inner: &Value,
    key: &'static str,
    map_shape: StateShape,
    seq_shape: StateShape,
) -> StateDecode {
    match inner {
        Value::Object(map) => {
            let (symbols, dropped) = from_map(map);
            StateDecode::Recognized {
                shape: map_shape,
                symbols,
                dropped,
            }
        }
        Value::Array(items) => {
            let (symbols, dropped) = from_sequence(items);
            StateDecode::Recognized {
                shape: seq_shape,
                symbols,
                dropped,
            }
        }
        other => StateDecode::Unrecognized(ShapeError::UnsupportedContainer {
            key,
            found: kind_of(other),
        }),
    }
}

fn from_map(map: &Map<String, Value>) -> (SymbolStates, usize) {
    from_pairs(map.iter())
}

fn from_pairs<'a>(pairs: impl Iterator<Item = (&'a String, &'a Value)>) -> (SymbolStates, usize) {
    let mut out = SymbolStates::new();
    let mut dropped = 0;
    for (symbol, v) in pairs {
        match decode_symbol(v) {
            Some(state) if !symbol.trim().is_empty() => {
                out.insert(symbol.clone(), state);
            }
            _ => dropped += 1,
        }
    }
    (out, dropped)
}

fn from_sequence(items: &[Value]) -> (SymbolStates, usize) {
    let mut out = SymbolStates::new();
    let mut dropped = 0;
    for item in items {
        let symbol = item
            .get("symbol")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty());
        match (symbol, decode_symbol(item)) {
            (Some(symbol), Some(state)) => {
                // Later records for the same symbol win, as they would in a merge.
                out.insert(symbol.to_string(), state);
            }
            _ => dropped += 1,
        }
    }
    (out, dropped)
}

fn decode_symbol(v: &Value) -> Option<SymbolState> {
    if !v.is_object() {
        return None;
    }
    serde_json::from_value(v.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhd_schemas::SymbolStatus;
    use serde_json::json;

    fn shape_of(raw: Value) -> StateShape {
        match decode_state_event(&raw) {
            StateDecode::Recognized { shape, .. } => shape,
            StateDecode::Unrecognized(e) => panic!("unrecognized: {e}"),
        }
    }

    #[test]
    fn detects_every_wrapping() {
        let rec = json!({"status": "LOCKED"});
        assert_eq!(shape_of(json!({"symbols": {"BTCUSD": rec}})), StateShape::SymbolsMap);
        assert_eq!(
            shape_of(json!({"symbols": [{"symbol": "BTCUSD"}]})),
            StateShape::SymbolsSequence
        );
        assert_eq!(
            shape_of(json!({"data": {"symbols": {"BTCUSD": rec}}})),
            StateShape::DataSymbolsMap
        );
        assert_eq!(
            shape_of(json!({"data": {"symbols": [{"symbol": "BTCUSD"}]}})),
            StateShape::DataSymbolsSequence
        );
        assert_eq!(shape_of(json!({"BTCUSD": rec})), StateShape::BareMap);
        assert_eq!(shape_of(json!([{"symbol": "BTCUSD"}])), StateShape::BareSequence);
    }

    #[test]
    fn null_symbols_member_falls_through_to_data() {
        let raw = json!({"symbols": null, "data": {"symbols": {"ETHUSD": {"status": "SCALING"}}}});
        let symbols = normalize_state_event(&raw).unwrap();
        assert_eq!(symbols["ETHUSD"].status, SymbolStatus::Scaling);
    }

    #[test]
    fn sequence_drops_records_without_symbol() {
        let raw = json!([
            {"symbol": "BTCUSD", "status": "LOCKED"},
            {"status": "SCALING"},
            {"symbol": "", "status": "SCALING"},
            42
        ]);
        match decode_state_event(&raw) {
            StateDecode::Recognized { symbols, dropped, .. } => {
                assert_eq!(symbols.len(), 1);
                assert_eq!(symbols["BTCUSD"].status, SymbolStatus::Locked);
                assert_eq!(dropped, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bare_object_ignores_wrapper_flags() {
        let raw = json!({
            "active": true,
            "activeStrategy": "HMA Scalper",
            "XAUUSD": {"trend_bias": "LONG"}
        });
        let symbols = normalize_state_event(&raw).unwrap();
        assert_eq!(symbols.keys().collect::<Vec<_>>(), vec!["XAUUSD"]);
    }

    #[test]
    fn flags_only_payload_is_unrecognized() {
        let raw = json!({"active": false, "activeStrategy": "Idle"});
        assert_eq!(
            decode_state_event(&raw),
            StateDecode::Unrecognized(ShapeError::NoSymbols)
        );
    }

    #[test]
    fn scalar_payloads_are_unrecognized() {
        assert!(normalize_state_event(&json!("hello")).is_none());
        assert!(normalize_state_event(&json!(null)).is_none());
        assert_eq!(
            decode_state_event(&json!({"symbols": 7})),
            StateDecode::Unrecognized(ShapeError::UnsupportedContainer {
                key: "symbols",
                found: "number"
            })
        );
    }
}
