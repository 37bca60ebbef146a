use nhd_schemas::{
    ActivePosition, MarketPrices, PendingOrder, SymbolStates, SymbolStatus, TradeEntry,
};
use serde::Serialize;

use crate::{resolve_pnl, DisplayClock};

/// Reason shown for a filled entry that arrived without one.
pub const DEFAULT_REASON: &str = "Auto HMA";

/// The two disjoint derived collections. Ordered by symbol, then layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Classified {
    pub active: Vec<ActivePosition>,
    pub pending: Vec<PendingOrder>,
}

/// Whether an entry is a resting order rather than a filled position.
///
/// Precedence: explicit `type == "PENDING"`, then presence of `pnl`/`profit`
/// (forces filled), then a "pending" substring in the reason text.
pub fn is_pending(entry: &TradeEntry) -> bool {
    if entry
        .kind
        .as_deref()
        .is_some_and(|k| k.trim().eq_ignore_ascii_case("PENDING"))
    {
        return true;
    }
    if entry.pnl.is_some() || entry.profit.is_some() {
        return false;
    }
    entry.reason.to_ascii_lowercase().contains("pending")
}

/// [`classify_with`] using UTC display times.
pub fn classify(states: &SymbolStates, prices: &MarketPrices) -> Classified {
    classify_with(states, prices, &DisplayClock::utc())
}

/// Derive active positions and pending orders from canonical state.
///
/// A LOCKED symbol with no entries is a watchlist lock (one pending order with
/// no ticket). A symbol with neither entries nor a lock contributes nothing.
pub fn classify_with(
    states: &SymbolStates,
    prices: &MarketPrices,
    clock: &DisplayClock,
) -> Classified {
    let mut out = Classified::default();

    for (symbol, state) in states {
        let current = prices.get(symbol).copied();

        if state.status == SymbolStatus::Locked && state.entries.is_empty() {
            out.pending.push(PendingOrder {
                symbol: symbol.clone(),
                bias: state.trend_bias,
                status: state.status,
                current_price: current.unwrap_or(0.0),
                limit_price: None,
                ticket: None,
                volume: None,
                layer: None,
            });
            continue;
        }

        for (idx, entry) in state.entries.iter().enumerate() {
            let layer = idx as u32 + 1;

            if is_pending(entry) {
                out.pending.push(PendingOrder {
                    symbol: symbol.clone(),
                    bias: state.trend_bias,
                    status: state.status,
                    current_price: current.unwrap_or(0.0),
                    limit_price: (entry.price != 0.0).then_some(entry.price),
                    ticket: entry.ticket,
                    volume: entry.volume,
                    layer: Some(layer),
                });
                continue;
            }

            let reason = if entry.reason.trim().is_empty() {
                DEFAULT_REASON.to_string()
            } else {
                entry.reason.clone()
            };

            out.active.push(ActivePosition {
                symbol: symbol.clone(),
                bias: state.trend_bias,
                entry_price: entry.price,
                pnl: resolve_pnl(entry, current, state.trend_bias),
                layer,
                reason,
                time: clock.format_entry_time(entry.time),
                status: state.status,
                ticket: entry.ticket,
                volume: entry.volume,
            });
        }
    }

    out
}
