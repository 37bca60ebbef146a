use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;

fn payload_file(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
    let p = dir.path().join(name);
    fs::write(&p, body).expect("write payload");
    p.to_string_lossy().to_string()
}

/// A wrapped sequence state payload is recognised and its entries are split
/// into active positions and pending orders.
#[test]
fn inspect_state_reports_shape_and_classification() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = payload_file(
        &dir,
        "state.json",
        r#"{
            "active": true,
            "activeStrategy": "Quantum Stack",
            "data": { "symbols": [
                { "symbol": "ETHUSD", "trendBias": "LONG", "status": "ACTIVE",
                  "entries": [
                    { "price": 2000, "type": "PENDING", "ticket": 55 },
                    { "price": 1990, "pnl": 12.5, "ticket": 56 }
                  ] }
            ] }
        }"#,
    );

    let mut cmd = assert_cmd::Command::cargo_bin("nhd")?;
    cmd.args(["inspect", "--kind", "state", "--file", &file]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"data-symbols-sequence\""))
        .stdout(predicate::str::contains("\"ETHUSD\""))
        .stdout(predicate::str::contains("\"engine_active\": true"));

    let out = cmd.output()?;
    let v: serde_json::Value = serde_json::from_slice(&out.stdout)?;
    assert_eq!(v["active"].as_array().map(Vec::len), Some(1));
    assert_eq!(v["pending"].as_array().map(Vec::len), Some(1));
    assert_eq!(v["pending"][0]["ticket"], 55);
    Ok(())
}

#[test]
fn inspect_prices_drops_non_numeric_members() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = payload_file(
        &dir,
        "prices.json",
        r#"{ "prices": { "XAUUSD": 2350.5, "BTCUSD": "n/a" } }"#,
    );

    let mut cmd = assert_cmd::Command::cargo_bin("nhd")?;
    cmd.args(["inspect", "--kind", "prices", "--file", &file]);
    let out = cmd.output()?;
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout)?;
    assert_eq!(v["shape"], "prices");
    assert_eq!(v["prices"]["XAUUSD"], 2350.5);
    assert_eq!(v["dropped"], 1);
    Ok(())
}

#[test]
fn inspect_rejects_unrecognized_payload() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = payload_file(&dir, "bad.json", "42");

    let mut cmd = assert_cmd::Command::cargo_bin("nhd")?;
    cmd.args(["inspect", "--kind", "state", "--file", &file]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("UNRECOGNIZED state payload"));
    Ok(())
}

#[test]
fn inspect_account_reports_equity_sample() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = payload_file(
        &dir,
        "account.json",
        r#"{ "balance": 10000, "equity": "10125.5", "status": "ONLINE" }"#,
    );

    let mut cmd = assert_cmd::Command::cargo_bin("nhd")?;
    cmd.args(["inspect", "--kind", "account", "--file", &file]);
    let out = cmd.output()?;
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout)?;
    assert_eq!(v["equity_sample"], 10125.5);
    assert_eq!(v["link_online"], true);
    Ok(())
}
