use nhd_schemas::{ClosedTradeRecord, LogEntry};
use tracing::{info, warn};

use crate::{MirrorError, RemoteMirror};

/// Result of the startup pull.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// History came back; it replaces the local ledger wholesale. Logs are
    /// `None` when only their fetch failed.
    Remote {
        history: Vec<ClosedTradeRecord>,
        logs: Option<Vec<LogEntry>>,
    },
    /// Nothing usable came back; local caches stay as they are.
    LocalOnly { reason: String },
}

/// Pull history, then logs. History failing aborts the whole sync.
pub async fn startup_sync(mirror: &dyn RemoteMirror) -> SyncOutcome {
    let mut history = match mirror.fetch_history().await {
        Ok(h) => h,
        Err(e) => {
            if e != MirrorError::Disabled {
                warn!(mirror = mirror.name(), error = %e, "startup sync failed; keeping local ledgers");
            }
            return SyncOutcome::LocalOnly {
                reason: e.to_string(),
            };
        }
    };
    for r in &mut history {
        r.ensure_id();
    }

    let logs = match mirror.fetch_logs().await {
        Ok(l) => Some(l),
        Err(e) => {
            warn!(mirror = mirror.name(), error = %e, "log sync failed; keeping local logs");
            None
        }
    };

    info!(
        mirror = mirror.name(),
        history = history.len(),
        logs = ?logs.as_ref().map(Vec::len),
        "startup sync complete"
    );
    SyncOutcome::Remote { history, logs }
}
