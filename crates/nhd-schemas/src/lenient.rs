//! Tolerant field decoders for bridge payloads.
//!
//! The bridge is loosely typed: numbers sometimes arrive as strings, optional
//! fields arrive as `null`, and a single bad field must not reject the whole
//! symbol. Every decoder here accepts any JSON value and maps what it cannot
//! use to "absent".

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

use crate::HmaTrend;

/// Finite number from a JSON number or numeric string.
pub fn number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Broker ticket. `0` is the bridge's "no ticket" marker and maps to `None`.
pub fn ticket(v: &Value) -> Option<u64> {
    let t = match v {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && *f > 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    t.filter(|t| *t != 0)
}

/// Non-empty text. Numbers are rendered, everything else is absent.
pub fn text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// serde `deserialize_with` adapters
// ---------------------------------------------------------------------------

pub(crate) fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(number(&Value::deserialize(d)?))
}

pub(crate) fn f64_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(number(&Value::deserialize(d)?).unwrap_or(0.0))
}

pub(crate) fn u32_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let n = number(&Value::deserialize(d)?).unwrap_or(0.0);
    Ok(if n > 0.0 { n.min(u32::MAX as f64) as u32 } else { 0 })
}

pub(crate) fn opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    Ok(number(&Value::deserialize(d)?)
        .filter(|n| *n >= 0.0)
        .map(|n| n as u64))
}

pub(crate) fn opt_ticket<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    Ok(ticket(&Value::deserialize(d)?))
}

pub(crate) fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(text(&Value::deserialize(d)?))
}

pub(crate) fn string_or_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(text(&Value::deserialize(d)?).unwrap_or_default())
}

pub(crate) fn number_map<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<BTreeMap<String, f64>, D::Error> {
    let Value::Object(map) = Value::deserialize(d)? else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .iter()
        .filter_map(|(k, v)| number(v).map(|n| (k.clone(), n)))
        .collect())
}

pub(crate) fn string_map<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<BTreeMap<String, String>, D::Error> {
    let Value::Object(map) = Value::deserialize(d)? else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .iter()
        .filter_map(|(k, v)| text(v).map(|s| (k.clone(), s)))
        .collect())
}

pub(crate) fn trend_map<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<BTreeMap<String, HmaTrend>, D::Error> {
    let Value::Object(map) = Value::deserialize(d)? else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), HmaTrend::parse(s))))
        .collect())
}

/// Sequence of records; elements that fail to decode are skipped.
pub(crate) fn seq_of<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(d)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_accepts_numeric_strings_and_rejects_garbage() {
        assert_eq!(number(&json!(1.5)), Some(1.5));
        assert_eq!(number(&json!(" 2050 ")), Some(2050.0));
        assert_eq!(number(&json!("n/a")), None);
        assert_eq!(number(&json!(null)), None);
        assert_eq!(number(&json!(true)), None);
    }

    #[test]
    fn ticket_zero_means_absent() {
        assert_eq!(ticket(&json!(0)), None);
        assert_eq!(ticket(&json!(55)), Some(55));
        assert_eq!(ticket(&json!(55.0)), Some(55));
        assert_eq!(ticket(&json!("1234567")), Some(1_234_567));
        assert_eq!(ticket(&json!(-3)), None);
    }
}
