use nhd_schemas::{lenient, MarketPrices};
use serde_json::Value;

use crate::{is_reserved, kind_of, member, ShapeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceShape {
    /// `{prices: {SYM: px}}`
    PricesKey,
    /// `{data: {SYM: px}}`
    DataKey,
    /// `{SYM: px}`
    Bare,
}

impl PriceShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceShape::PricesKey => "prices",
            PriceShape::DataKey => "data",
            PriceShape::Bare => "bare",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PriceDecode {
    Recognized {
        shape: PriceShape,
        prices: MarketPrices,
        /// Members skipped because their value was not a finite number.
        dropped: usize,
    },
    Unrecognized(ShapeError),
}

impl PriceDecode {
    pub fn into_prices(self) -> Option<MarketPrices> {
        match self {
            PriceDecode::Recognized { prices, .. } => Some(prices),
            PriceDecode::Unrecognized(_) => None,
        }
    }
}

/// Classify a price payload: `prices`, then `data`, then the payload itself.
/// A recognised result always carries at least one price.
pub fn decode_price_event(raw: &Value) -> PriceDecode {
    let (shape, key, inner) = if let Some(p) = member(raw, "prices") {
        (PriceShape::PricesKey, "prices", p)
    } else if let Some(d) = member(raw, "data") {
        (PriceShape::DataKey, "data", d)
    } else {
        (PriceShape::Bare, "", raw)
    };

    let Value::Object(map) = inner else {
        return PriceDecode::Unrecognized(if key.is_empty() {
            ShapeError::UnsupportedRoot {
                found: kind_of(inner),
            }
        } else {
            ShapeError::UnsupportedContainer {
                key,
                found: kind_of(inner),
            }
        });
    };

    let mut prices = MarketPrices::new();
    let mut dropped = 0;
    for (symbol, v) in map {
        if shape == PriceShape::Bare && is_reserved(symbol) {
            continue;
        }
        match lenient::number(v) {
            Some(px) => {
                prices.insert(symbol.clone(), px);
            }
            None => dropped += 1,
        }
    }

    if prices.is_empty() {
        return PriceDecode::Unrecognized(ShapeError::NoPrices);
    }
    PriceDecode::Recognized {
        shape,
        prices,
        dropped,
    }
}

/// Mapping form of a price payload, or `None` when unclassifiable.
pub fn normalize_price_event(raw: &Value) -> Option<MarketPrices> {
    decode_price_event(raw).into_prices()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn all_three_wrappings_yield_the_same_mapping() {
        let expected = normalize_price_event(&json!({"ETHUSD": 2050.0})).unwrap();
        assert_eq!(
            normalize_price_event(&json!({"prices": {"ETHUSD": 2050}})).unwrap(),
            expected
        );
        assert_eq!(
            normalize_price_event(&json!({"data": {"ETHUSD": "2050"}})).unwrap(),
            expected
        );
    }

    #[test]
    fn bare_payload_skips_envelope_fields() {
        let raw = json!({"timestamp": 1700000000, "BTCUSD": 65000.5, "XAUUSD": "n/a"});
        match decode_price_event(&raw) {
            PriceDecode::Recognized {
                shape,
                prices,
                dropped,
            } => {
                assert_eq!(shape, PriceShape::Bare);
                assert_eq!(prices.len(), 1);
                assert_eq!(prices["BTCUSD"], 65000.5);
                assert_eq!(dropped, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_or_non_numeric_payloads_are_unrecognized() {
        assert_eq!(
            decode_price_event(&json!({"prices": {}})),
            PriceDecode::Unrecognized(ShapeError::NoPrices)
        );
        assert_eq!(
            decode_price_event(&json!({"prices": [1, 2]})),
            PriceDecode::Unrecognized(ShapeError::UnsupportedContainer {
                key: "prices",
                found: "sequence"
            })
        );
        assert!(normalize_price_event(&json!(12.5)).is_none());
    }
}
