//! Request and response types for all nhd-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests.  No business logic lives here.

use nhd_reconcile::PortfolioSummary;
use nhd_schemas::{ActivePosition, ClosedTradeRecord, LogEntry, PendingOrder};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Read APIs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PositionsResponse {
    pub connected: bool,
    pub positions: Vec<ActivePosition>,
    pub summary: PortfolioSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrdersResponse {
    pub connected: bool,
    pub orders: Vec<PendingOrder>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub count: usize,
    /// Newest first.
    pub records: Vec<ClosedTradeRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsQuery {
    /// Only execution-source lines.
    #[serde(default)]
    pub execution: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogsResponse {
    pub count: usize,
    /// Newest first.
    pub logs: Vec<LogEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EquityResponse {
    /// Oldest first.
    pub samples: Vec<f64>,
    pub latest: Option<f64>,
}

// ---------------------------------------------------------------------------
// Control passthrough
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ClosePositionRequest {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub ticket: Option<u64>,
}

/// Commands are fire-and-forget; `accepted` only means the session took it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub accepted: bool,
    pub command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
