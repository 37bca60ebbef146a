use nhd_schemas::{AccountState, TrendBias};
use serde::Serialize;

use crate::Classified;

/// Portfolio-level figures shown above the position tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortfolioSummary {
    /// Sum of resolved PnL over active positions.
    pub unrealized_pnl: f64,
    pub active_longs: usize,
    pub active_shorts: usize,
    pub pending_orders: usize,
    /// Equity minus balance, when an account snapshot exists.
    pub open_pnl: Option<f64>,
}

pub fn summarize(classified: &Classified, account: Option<&AccountState>) -> PortfolioSummary {
    let mut s = PortfolioSummary {
        pending_orders: classified.pending.len(),
        open_pnl: account.map(AccountState::open_pnl),
        ..PortfolioSummary::default()
    };
    for p in &classified.active {
        s.unrealized_pnl += p.pnl;
        match p.bias {
            TrendBias::Long => s.active_longs += 1,
            TrendBias::Short => s.active_shorts += 1,
            TrendBias::Hedged | TrendBias::None => {}
        }
    }
    s
}
