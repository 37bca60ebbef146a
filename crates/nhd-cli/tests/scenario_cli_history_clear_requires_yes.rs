use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;

const HISTORY: &str = r#"[
  { "symbol": "ETHUSD", "type": "LONG", "entryPrice": 2000, "pnl": 0, "layer": 1,
    "reason": "Pending Limit", "time": "12:00:00", "ticket": 55,
    "finalStatus": "CANCELLED", "closedAtMs": 1700000000000 },
  { "symbol": "XAUUSD", "type": "SHORT", "entryPrice": 2350, "pnl": -4.2, "layer": 2,
    "reason": "Auto HMA", "time": "11:59:00", "ticket": 12,
    "finalStatus": "FILLED", "closedAtMs": 1699999990000 }
]"#;

/// `nhd history clear` refuses without --yes and leaves the ledger intact.
#[test]
fn history_clear_requires_yes() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let state_dir = dir.path().to_string_lossy().to_string();
    fs::write(dir.path().join("trade_history.json"), HISTORY)?;

    let mut show = assert_cmd::Command::cargo_bin("nhd")?;
    show.args(["history", "show", "--state-dir", &state_dir, "--limit", "1"]);
    show.assert()
        .success()
        .stdout(predicate::str::contains("history_count=2"))
        .stdout(predicate::str::contains("ETHUSD"))
        .stdout(predicate::str::contains("XAUUSD").not());

    let mut refuse = assert_cmd::Command::cargo_bin("nhd")?;
    refuse.args(["history", "clear", "--state-dir", &state_dir]);
    refuse
        .assert()
        .failure()
        .stderr(predicate::str::contains("REFUSING CLEAR: 2 record(s)"));

    let mut clear = assert_cmd::Command::cargo_bin("nhd")?;
    clear.args(["history", "clear", "--state-dir", &state_dir, "--yes"]);
    clear
        .assert()
        .success()
        .stdout(predicate::str::contains("history_cleared=2"));

    let raw = fs::read_to_string(dir.path().join("trade_history.json"))?;
    assert_eq!(raw.trim(), "[]");
    Ok(())
}
