use anyhow::{bail, Context, Result};
use nhd_ledger::LedgerStore;

use super::print_json;

pub fn show(state_dir: &str, limit: Option<usize>) -> Result<()> {
    let store = LedgerStore::new(state_dir)?;
    let records = store.load_history().context("load trade history")?;
    let n = limit.unwrap_or(records.len()).min(records.len());

    println!("history_count={}", records.len());
    print_json(&records[..n])
}

/// Guardrail: refuses without `--yes`; the ledger has no undo.
pub fn clear(state_dir: &str, yes: bool, logs: bool) -> Result<()> {
    let store = LedgerStore::new(state_dir)?;
    let existing = store.load_history().map(|r| r.len()).unwrap_or(0);

    if !yes {
        bail!(
            "REFUSING CLEAR: {} record(s) in {}. Re-run with: `nhd history clear --state-dir {} --yes`",
            existing,
            state_dir,
            state_dir
        );
    }

    store.save_history(&[])?;
    println!("history_cleared={existing}");
    if logs {
        store.save_logs(&[])?;
        println!("logs_cleared=true");
    }
    Ok(())
}
