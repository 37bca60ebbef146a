//! Shared runtime state for nhd-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The daemon never owns
//! reconciliation state: it reads published snapshots and forwards operator
//! commands to the session.

use std::sync::Arc;
use std::time::Duration;

use nhd_reconcile::PortfolioSummary;
use nhd_runtime::{DashboardSnapshot, SessionCommand, SessionControl, SnapshotRx};
use nhd_schemas::{ActivePosition, LogEntry, PendingOrder};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    Status(StatusSnapshot),
    Book(BookUpdate),
    LogLine(LogEntry),
}

impl BusMsg {
    pub fn event_name(&self) -> &'static str {
        match self {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::Status(_) => "status",
            BusMsg::Book(_) => "book",
            BusMsg::LogLine(_) => "log",
        }
    }
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health / status responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// StatusSnapshot / BookUpdate
// ---------------------------------------------------------------------------

/// Returned by GET /v1/status and carried inside SSE `status` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub daemon_uptime_secs: u64,
    pub generation: u64,
    pub connected: bool,
    pub transport: Option<String>,
    pub bot_active: bool,
    pub strategy_name: Option<String>,
    pub symbols_tracked: usize,
    pub history_len: usize,
    pub log_len: usize,
    pub updated_at_ms: i64,
}

impl StatusSnapshot {
    pub fn from_snapshot(snap: &DashboardSnapshot) -> Self {
        Self {
            daemon_uptime_secs: uptime_secs(),
            generation: snap.generation,
            connected: snap.link.connected,
            transport: snap.link.transport.map(str::to_string),
            bot_active: snap.bot_active,
            strategy_name: snap.strategy_name.clone(),
            symbols_tracked: snap.symbols.len(),
            history_len: snap.history.len(),
            log_len: snap.logs.len(),
            updated_at_ms: snap.updated_at_ms,
        }
    }
}

/// Derived positions and orders; carried inside SSE `book` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookUpdate {
    pub active: Vec<ActivePosition>,
    pub pending: Vec<PendingOrder>,
    pub unrealized_pnl: f64,
    pub open_pnl: Option<f64>,
}

impl BookUpdate {
    pub fn from_snapshot(snap: &DashboardSnapshot) -> Self {
        let PortfolioSummary {
            unrealized_pnl,
            open_pnl,
            ..
        } = snap.summary;
        Self {
            active: snap.active.clone(),
            pending: snap.pending.clone(),
            unrealized_pnl,
            open_pnl,
        }
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    /// Static build metadata.
    pub build: BuildInfo,
    /// Latest snapshot published by the session.
    pub snapshots: SnapshotRx,
    /// Operator command channel into the session.
    pub control: SessionControl,
}

impl AppState {
    pub fn new(snapshots: SnapshotRx, control: SessionControl) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            bus,
            build: BuildInfo {
                service: "nhd-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            snapshots,
            control,
        }
    }

    pub fn snapshot(&self) -> Arc<DashboardSnapshot> {
        self.snapshots.borrow().clone()
    }

    pub fn send(&self, cmd: SessionCommand) -> bool {
        self.control.send(cmd)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}

/// Spawn a task that turns published snapshots into bus messages: a status
/// on every change, a book when positions or orders moved, and one log
/// message per new telemetry line.
pub fn spawn_snapshot_forwarder(state: Arc<AppState>) {
    let mut rx = state.snapshots.clone();
    tokio::spawn(async move {
        let mut prev = rx.borrow_and_update().clone();
        while rx.changed().await.is_ok() {
            let next = rx.borrow_and_update().clone();
            for msg in bus_messages(&prev, &next) {
                let _ = state.bus.send(msg);
            }
            prev = next;
        }
        debug!("snapshot channel closed; forwarder exiting");
    });
}

/// Bus messages describing the step from `prev` to `next`.
pub fn bus_messages(prev: &DashboardSnapshot, next: &DashboardSnapshot) -> Vec<BusMsg> {
    let mut out = vec![BusMsg::Status(StatusSnapshot::from_snapshot(next))];
    if prev.active != next.active || prev.pending != next.pending || prev.summary != next.summary
    {
        out.push(BusMsg::Book(BookUpdate::from_snapshot(next)));
    }
    // Oldest first so subscribers can append in order.
    out.extend(
        fresh_logs(&prev.logs, &next.logs)
            .iter()
            .rev()
            .cloned()
            .map(BusMsg::LogLine),
    );
    out
}

/// Entries in front of the previous newest line. Both slices are newest first.
fn fresh_logs<'a>(prev: &[LogEntry], next: &'a [LogEntry]) -> &'a [LogEntry] {
    match prev.first() {
        None => next,
        Some(head) => {
            let n = next.iter().position(|l| l == head).unwrap_or(next.len());
            &next[..n]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhd_schemas::LogLevel;

    fn log(msg: &str) -> LogEntry {
        LogEntry::new("12:00:00", LogLevel::Info, "SYS", msg)
    }

    #[test]
    fn only_new_log_lines_are_forwarded_oldest_first() {
        let prev = DashboardSnapshot {
            logs: Arc::new(vec![log("b"), log("a")]),
            ..DashboardSnapshot::default()
        };
        let next = DashboardSnapshot {
            logs: Arc::new(vec![log("d"), log("c"), log("b"), log("a")]),
            ..DashboardSnapshot::default()
        };
        let msgs = bus_messages(&prev, &next);
        let lines: Vec<_> = msgs
            .iter()
            .filter_map(|m| match m {
                BusMsg::LogLine(l) => Some(l.msg.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(lines, ["c", "d"]);
        assert!(matches!(msgs[0], BusMsg::Status(_)));
        assert!(!msgs.iter().any(|m| matches!(m, BusMsg::Book(_))));
    }

    #[test]
    fn cleared_log_produces_no_lines() {
        let prev = DashboardSnapshot {
            logs: Arc::new(vec![log("a")]),
            ..DashboardSnapshot::default()
        };
        assert_eq!(fresh_logs(&prev.logs, &[]).len(), 0);
    }
}
