use std::collections::BTreeMap;

use nhd_schemas::{ClosedTradeRecord, FinalStatus};
use serde::Serialize;

/// Profit factor reported when there are winners but nothing lost.
pub const UNBOUNDED_PROFIT_FACTOR: f64 = 100.0;

/// Performance figures over the filled part of the trade history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoryStats {
    pub trades: usize,
    pub wins: usize,
    /// Break-even trades count as losses.
    pub losses: usize,
    /// Percent, 0..=100.
    pub win_rate: f64,
    pub gross_profit: f64,
    /// Absolute value of the summed losing PnL.
    pub gross_loss: f64,
    pub net_pnl: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    /// Positive magnitude.
    pub avg_loss: f64,
    pub risk_reward: f64,
    /// Expected PnL per trade from win rate and average win/loss.
    pub expectancy: f64,
    /// Never below zero.
    pub best_trade: f64,
    /// Never above zero.
    pub worst_trade: f64,
    pub pnl_by_symbol: BTreeMap<String, f64>,
}

/// Cancelled orders never traded and are left out.
pub fn history_stats(history: &[ClosedTradeRecord]) -> HistoryStats {
    let mut s = HistoryStats::default();
    for r in history.iter().filter(|r| r.final_status == FinalStatus::Filled) {
        s.trades += 1;
        s.net_pnl += r.pnl;
        if r.pnl > 0.0 {
            s.wins += 1;
            s.gross_profit += r.pnl;
        } else {
            s.losses += 1;
            s.gross_loss -= r.pnl;
        }
        s.best_trade = s.best_trade.max(r.pnl);
        s.worst_trade = s.worst_trade.min(r.pnl);
        *s.pnl_by_symbol.entry(r.symbol.clone()).or_insert(0.0) += r.pnl;
    }
    if s.trades == 0 {
        return s;
    }

    s.profit_factor = if s.gross_loss > 0.0 {
        s.gross_profit / s.gross_loss
    } else if s.gross_profit > 0.0 {
        UNBOUNDED_PROFIT_FACTOR
    } else {
        0.0
    };
    s.win_rate = s.wins as f64 / s.trades as f64 * 100.0;
    if s.wins > 0 {
        s.avg_win = s.gross_profit / s.wins as f64;
    }
    if s.losses > 0 {
        s.avg_loss = s.gross_loss / s.losses as f64;
    }
    if s.avg_loss > 0.0 {
        s.risk_reward = s.avg_win / s.avg_loss;
    }
    let p = s.win_rate / 100.0;
    s.expectancy = p * s.avg_win - (1.0 - p) * s.avg_loss;
    s
}
