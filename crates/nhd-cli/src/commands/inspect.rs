//! `nhd inspect`: offline decode of a captured payload.
//!
//! Runs the same normalizers the live engine runs, then (for state payloads)
//! the classifier, so an operator can see why a packet was or was not
//! reflected on the dashboard.

use anyhow::{bail, Result};
use nhd_normalize::{
    decode_account_event, decode_engine_flags, decode_price_event, decode_state_event,
    PriceDecode, StateDecode,
};
use nhd_reconcile::{classify, lifecycle_stages, summarize};
use nhd_schemas::MarketPrices;
use serde_json::{json, Value};

use super::{print_json, read_json_file};
use crate::InspectKind;

pub fn run(kind: InspectKind, file: &str) -> Result<()> {
    let raw = read_json_file(file)?;
    let report = match kind {
        InspectKind::State => inspect_state(&raw)?,
        InspectKind::Prices => inspect_prices(&raw)?,
        InspectKind::Account => inspect_account(&raw)?,
    };
    print_json(&report)
}

fn inspect_state(raw: &Value) -> Result<Value> {
    let flags = decode_engine_flags(raw);
    match decode_state_event(raw) {
        StateDecode::Recognized {
            shape,
            symbols,
            dropped,
        } => {
            let derived = classify(&symbols, &MarketPrices::new());
            let summary = summarize(&derived, None);
            Ok(json!({
                "shape": shape.as_str(),
                "symbols": symbols.keys().collect::<Vec<_>>(),
                "dropped": dropped,
                "engine_active": flags.active,
                "strategy_name": flags.strategy_name,
                "active": derived.active,
                "pending": derived.pending,
                "summary": summary,
                "lifecycle": lifecycle_stages(&symbols),
            }))
        }
        StateDecode::Unrecognized(err) if !flags.is_empty() => Ok(json!({
            "shape": Value::Null,
            "engine_active": flags.active,
            "strategy_name": flags.strategy_name,
            "note": format!("engine flags only ({err})"),
        })),
        StateDecode::Unrecognized(err) => bail!("UNRECOGNIZED state payload: {err}"),
    }
}

fn inspect_prices(raw: &Value) -> Result<Value> {
    match decode_price_event(raw) {
        PriceDecode::Recognized {
            shape,
            prices,
            dropped,
        } => Ok(json!({
            "shape": shape.as_str(),
            "prices": prices,
            "dropped": dropped,
        })),
        PriceDecode::Unrecognized(err) => bail!("UNRECOGNIZED prices payload: {err}"),
    }
}

fn inspect_account(raw: &Value) -> Result<Value> {
    let Some(update) = decode_account_event(raw) else {
        bail!("UNRECOGNIZED account payload: expected an object");
    };
    Ok(json!({
        "account": update.account,
        "equity_sample": update.equity_sample,
        "link_online": update.link_online,
    }))
}
