use serde::{Deserialize, Serialize};

use crate::lenient;

/// Account financials. Replaced wholesale on every account update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub balance: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub equity: f64,
    #[serde(default, alias = "realizedPnl", deserialize_with = "lenient::f64_or_zero")]
    pub realized_pnl: f64,
    #[serde(default, alias = "winRate", deserialize_with = "lenient::f64_or_zero")]
    pub win_rate: f64,
    #[serde(default, alias = "totalTrades", deserialize_with = "lenient::f64_or_zero")]
    pub total_trades: f64,
    #[serde(default, alias = "maxDrawdown", deserialize_with = "lenient::f64_or_zero")]
    pub max_drawdown: f64,
}

impl AccountState {
    /// Floating PnL implied by the account: equity minus balance.
    pub fn open_pnl(&self) -> f64 {
        self.equity - self.balance
    }
}
