//! End-to-end: raw payloads through normalize → merge → classify → detect.

use nhd_normalize::{normalize_price_event, normalize_state_event};
use nhd_reconcile::{classify, detect_transitions, merge, merge_prices_into, TransitionContext};
use nhd_schemas::{FinalStatus, MarketPrices, SymbolState, SymbolStates};
use serde_json::json;

fn universe() -> SymbolStates {
    ["BTCUSD", "ETHUSD"]
        .iter()
        .map(|s| (s.to_string(), SymbolState::seed()))
        .collect()
}

#[test]
fn pending_order_then_cancellation_keeps_limit_price() {
    let mut states = universe();
    let mut prices = MarketPrices::new();

    // Tick 1: engine places a pending order for ETHUSD.
    let t1 = json!({
        "symbols": [{
            "symbol": "ETHUSD",
            "status": "LOCKED",
            "trend_bias": "LONG",
            "entries": [{"price": 2000, "time": 1_700_000_000, "type": "PENDING", "ticket": 55}]
        }]
    });
    states = merge(states, normalize_state_event(&t1).unwrap());
    let tick1 = classify(&states, &prices);

    assert!(tick1.active.is_empty());
    assert_eq!(tick1.pending.len(), 1);
    let p = &tick1.pending[0];
    assert_eq!(p.symbol, "ETHUSD");
    assert_eq!(p.ticket, Some(55));
    assert_eq!(p.limit_price, Some(2000.0));

    // Price moves.
    merge_prices_into(&mut prices, normalize_price_event(&json!({"ETHUSD": 2050})).unwrap());
    let tick2 = classify(&states, &prices);
    assert_eq!(tick2.pending[0].current_price, 2050.0);
    let ctx = TransitionContext {
        closed_at_ms: 1,
        time: "00:00:00".to_string(),
    };
    assert!(detect_transitions(&tick1.active, &tick1.pending, &tick2.active, &tick2.pending, &ctx)
        .is_empty());

    // Tick 3: order gone, nothing filled.
    let t3 = json!({"symbols": {"ETHUSD": {"status": "LOCKED", "trend_bias": "LONG", "entries": []}}});
    states = merge(states, normalize_state_event(&t3).unwrap());
    let tick3 = classify(&states, &prices);

    let records = detect_transitions(&tick2.active, &tick2.pending, &tick3.active, &tick3.pending, &ctx);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].final_status, FinalStatus::Cancelled);
    assert_eq!(records[0].ticket, Some(55));
    assert_eq!(records[0].entry_price, 2000.0);
}

#[test]
fn pnl_bearing_pending_reason_is_classified_active() {
    let raw = json!({"data": {"symbols": {
        "BTCUSD": {"status": "LOCKED", "entries": [{"price": 65000, "reason": "pending breakout", "profit": 12.5}]}
    }}});
    let states = merge(universe(), normalize_state_event(&raw).unwrap());
    let c = classify(&states, &MarketPrices::new());
    assert!(c.pending.is_empty());
    assert_eq!(c.active.len(), 1);
    assert_eq!(c.active[0].pnl, 12.5);
}
