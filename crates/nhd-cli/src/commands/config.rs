use anyhow::Result;
use nhd_config::{report_unused_keys, DashboardConfig, UnusedKeyPolicy};

use super::path_refs;

pub fn hash(paths: &[String]) -> Result<()> {
    let loaded = nhd_config::load_layered_yaml(&path_refs(paths))?;
    println!("config_hash={}", loaded.config_hash);
    println!("{}", loaded.canonical_json);
    Ok(())
}

pub fn check(paths: &[String], strict: bool) -> Result<()> {
    let (loaded, cfg) = DashboardConfig::load(&path_refs(paths))?;

    let policy = if strict {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let report = report_unused_keys(&loaded.config_json, policy)?;
    for p in &report.unused_leaf_pointers {
        eprintln!("WARN unused config key: {p}");
    }

    println!("config_hash={}", loaded.config_hash);
    println!("bridge={}{}", cfg.api_base(), cfg.bridge.socket_path);
    println!("state_dir={}", cfg.ledger.state_dir.display());
    println!("universe={}", cfg.universe.join(","));
    println!("ok=true");
    Ok(())
}
