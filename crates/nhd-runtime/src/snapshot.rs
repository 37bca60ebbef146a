use std::collections::BTreeMap;
use std::sync::Arc;

use nhd_reconcile::{HistoryStats, LifecycleStage, PortfolioSummary};
use nhd_schemas::{
    AccountState, ActivePosition, ClosedTradeRecord, LogEntry, MarketPrices, PendingOrder,
    SymbolStates,
};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkStatus {
    pub connected: bool,
    /// "polling" | "websocket" while connected.
    pub transport: Option<&'static str>,
}

/// Immutable view handed to rendering consumers after every engine step.
///
/// Ledgers are shared behind `Arc` and only re-allocated when they change, so
/// cloning a snapshot per tick stays cheap for the large collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub generation: u64,
    pub link: LinkStatus,
    pub bot_active: bool,
    pub strategy_name: Option<String>,
    pub symbols: SymbolStates,
    pub prices: MarketPrices,
    pub account: Option<AccountState>,
    pub active: Vec<ActivePosition>,
    pub pending: Vec<PendingOrder>,
    pub summary: PortfolioSummary,
    pub lifecycle: BTreeMap<String, LifecycleStage>,
    /// Newest first.
    pub history: Arc<Vec<ClosedTradeRecord>>,
    /// Derived from `history`.
    pub stats: HistoryStats,
    /// Newest first.
    pub logs: Arc<Vec<LogEntry>>,
    /// Oldest first.
    pub equity: Vec<f64>,
    pub updated_at_ms: i64,
}

impl DashboardSnapshot {
    /// Log lines from execution sources (broker, manual, API, history).
    pub fn execution_logs(&self) -> Vec<LogEntry> {
        self.logs
            .iter()
            .filter(|l| l.is_execution())
            .cloned()
            .collect()
    }
}
