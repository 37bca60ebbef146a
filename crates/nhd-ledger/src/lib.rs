//! nhd-ledger
//!
//! Bounded, persisted ledgers for the dashboard session:
//! - trade history (newest first, capped, FIFO eviction of the oldest)
//! - telemetry log (same shape, larger cap)
//! - session equity series (oldest first, capped)
//!
//! The local JSON files are the fallback source of truth. The bridge's history
//! endpoint is a best-effort mirror: pushes never roll back a local write, and
//! startup pulls replace local state only when they succeed.

mod latest;
mod mirror;
mod ring;
mod store;
mod sync;

pub use mirror::{HistoryMirror, HttpMirror, MirrorError, NullMirror, RemoteMirror};
pub use ring::{BoundedLedger, EquitySeries, HistoryLedger, TelemetryLog};
pub use store::{LedgerStore, LedgerWriter, HISTORY_FILE, LOGS_FILE};
pub use sync::{startup_sync, SyncOutcome};
