use nhd_schemas::{TradeEntry, TrendBias};

/// Points-like scale applied to the fractional price move when the engine
/// reported no PnL. Not a currency conversion.
pub const PNL_ESTIMATE_SCALE: f64 = 10_000.0;

/// Unrealized PnL for one entry.
///
/// Trust order: `pnl`, then `profit`, then an estimate from the current price
/// (sign flipped for SHORT). No known price (absent or 0) yields 0.
pub fn resolve_pnl(entry: &TradeEntry, current_price: Option<f64>, bias: TrendBias) -> f64 {
    if let Some(pnl) = entry.pnl {
        return pnl;
    }
    if let Some(profit) = entry.profit {
        return profit;
    }

    let Some(current) = current_price.filter(|p| p.is_finite() && *p != 0.0) else {
        return 0.0;
    };
    if entry.price == 0.0 || !entry.price.is_finite() {
        return 0.0;
    }

    let raw_diff = (current - entry.price) / entry.price;
    let directed = if bias == TrendBias::Short {
        -raw_diff
    } else {
        raw_diff
    };
    directed * PNL_ESTIMATE_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(price: f64, pnl: Option<f64>, profit: Option<f64>) -> TradeEntry {
        TradeEntry {
            price,
            pnl,
            profit,
            ..TradeEntry::default()
        }
    }

    #[test]
    fn pnl_wins_over_profit() {
        let e = entry(100.0, Some(5.0), Some(10.0));
        assert_eq!(resolve_pnl(&e, Some(200.0), TrendBias::Long), 5.0);
    }

    #[test]
    fn profit_used_when_pnl_absent() {
        let e = entry(100.0, None, Some(10.0));
        assert_eq!(resolve_pnl(&e, Some(200.0), TrendBias::Long), 10.0);
    }

    #[test]
    fn estimate_scales_and_flips_for_short() {
        let e = entry(2000.0, None, None);
        let long = resolve_pnl(&e, Some(2050.0), TrendBias::Long);
        let short = resolve_pnl(&e, Some(2050.0), TrendBias::Short);
        assert!((long - 250.0).abs() < 1e-9);
        assert!((short + 250.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_price_or_zero_entry_price_is_zero() {
        assert_eq!(resolve_pnl(&entry(2000.0, None, None), None, TrendBias::Long), 0.0);
        assert_eq!(resolve_pnl(&entry(2000.0, None, None), Some(0.0), TrendBias::Long), 0.0);
        assert_eq!(resolve_pnl(&entry(0.0, None, None), Some(10.0), TrendBias::Long), 0.0);
    }
}
