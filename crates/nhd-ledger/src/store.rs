use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use nhd_schemas::{ClosedTradeRecord, LogEntry};
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::latest::Latest;

pub const HISTORY_FILE: &str = "trade_history.json";
pub const LOGS_FILE: &str = "telemetry_logs.json";

/// JSON-file persistence for the history and telemetry ledgers.
///
/// Each ledger is one JSON array, rewritten whole on every mutation through a
/// temp file + rename so a crash never leaves a half-written file behind.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    dir: PathBuf,
}

impl LedgerStore {
    /// Creates the state directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).with_context(|| format!("create_dir_all {:?}", dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Missing file → empty. A corrupt file is an error; callers fall back to empty.
    pub fn load_history(&self) -> Result<Vec<ClosedTradeRecord>> {
        let mut records: Vec<ClosedTradeRecord> = read_array(&self.dir.join(HISTORY_FILE))?;
        for r in &mut records {
            r.ensure_id();
        }
        Ok(records)
    }

    pub fn save_history(&self, records: &[ClosedTradeRecord]) -> Result<()> {
        write_atomic(&self.dir.join(HISTORY_FILE), records)
    }

    pub fn load_logs(&self) -> Result<Vec<LogEntry>> {
        read_array(&self.dir.join(LOGS_FILE))
    }

    pub fn save_logs(&self, logs: &[LogEntry]) -> Result<()> {
        write_atomic(&self.dir.join(LOGS_FILE), logs)
    }
}

/// Background writer for a [`LedgerStore`].
///
/// Each ledger gets its own task; the file writes run on the blocking pool.
/// A snapshot still waiting when a newer one arrives is skipped, so bursts
/// cost one write per ledger, not one per change.
pub struct LedgerWriter {
    history: Latest<Vec<ClosedTradeRecord>>,
    logs: Latest<Vec<LogEntry>>,
}

impl LedgerWriter {
    pub fn spawn(store: LedgerStore) -> Self {
        let history = {
            let store = store.clone();
            Latest::spawn(move |records: Arc<Vec<ClosedTradeRecord>>| {
                let store = store.clone();
                async move {
                    let res = tokio::task::spawn_blocking(move || store.save_history(&records)).await;
                    report("history", res);
                }
            })
        };
        let logs = Latest::spawn(move |logs: Arc<Vec<LogEntry>>| {
            let store = store.clone();
            async move {
                let res = tokio::task::spawn_blocking(move || store.save_logs(&logs)).await;
                report("logs", res);
            }
        });
        Self { history, logs }
    }

    pub fn save_history(&self, records: Vec<ClosedTradeRecord>) {
        self.history.submit(records);
    }

    pub fn save_logs(&self, logs: Vec<LogEntry>) {
        self.logs.submit(logs);
    }

    /// Waits until both files reflect the newest submitted snapshots.
    pub async fn flush(&self) {
        self.history.settled().await;
        self.logs.settled().await;
    }
}

fn report(ledger: &'static str, res: std::result::Result<Result<()>, tokio::task::JoinError>) {
    match res {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(ledger, error = %e, "ledger save failed"),
        Err(e) => warn!(ledger, error = %e, "ledger writer task failed"),
    }
}

fn read_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&raw).with_context(|| format!("parse {:?}", path))
}

fn write_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_vec(value).context("serialize ledger failed")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &body).with_context(|| format!("write {:?}", tmp))?;
    fs::rename(&tmp, path).with_context(|| format!("rename {:?} -> {:?}", tmp, path))?;
    Ok(())
}
