use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;

fn repo_config(name: &str) -> String {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("config")
        .join(name)
        .to_string_lossy()
        .to_string()
}

#[test]
fn base_config_is_clean() -> anyhow::Result<()> {
    let mut cmd = assert_cmd::Command::cargo_bin("nhd")?;
    cmd.args(["config-check", "--strict", &repo_config("base.yaml")]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("ok=true"))
        .stdout(predicate::str::contains("universe=BTCUSD,ETHUSD"));
    Ok(())
}

/// A misspelled key is reported, and fatal under --strict.
#[test]
fn typo_key_fails_strict_check() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let layer = dir.path().join("typo.yaml");
    fs::write(&layer, "bridge:\n  reconect_delay_ms: 500\n")?;
    let layer = layer.to_string_lossy().to_string();

    let mut warn = assert_cmd::Command::cargo_bin("nhd")?;
    warn.args(["config-check", &repo_config("base.yaml"), &layer]);
    warn.assert()
        .success()
        .stderr(predicate::str::contains("/bridge/reconect_delay_ms"));

    let mut strict = assert_cmd::Command::cargo_bin("nhd")?;
    strict.args(["config-check", "--strict", &repo_config("base.yaml"), &layer]);
    strict.assert().failure();
    Ok(())
}

#[test]
fn config_hash_is_stable_across_runs() -> anyhow::Result<()> {
    let run = || -> anyhow::Result<String> {
        let out = assert_cmd::Command::cargo_bin("nhd")?
            .args(["config-hash", &repo_config("base.yaml")])
            .output()?;
        let stdout = String::from_utf8(out.stdout)?;
        Ok(stdout.lines().next().unwrap_or_default().to_string())
    };
    let a = run()?;
    assert!(a.starts_with("config_hash="));
    assert_eq!(a, run()?);
    Ok(())
}
