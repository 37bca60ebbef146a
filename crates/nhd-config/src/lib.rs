//! nhd-config
//!
//! Layered YAML configuration for the dashboard runtime.
//!
//! - Later layers override earlier ones (mappings deep-merge, sequences replace).
//! - The merged document is canonicalised (keys sorted) and hashed with SHA-256
//!   so two processes can prove they run the same configuration.
//! - Leaf strings that look like credentials abort the load.
//! - [`DashboardConfig`] is the typed view every binary consumes.

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;

mod consumption;
mod dashboard;
mod env;

pub use consumption::{report_unused_keys, UnusedKeyPolicy, UnusedKeyReport, CONSUMED_POINTERS};
pub use dashboard::{
    BridgeConfig, DaemonConfig, DashboardConfig, DisplayConfig, LedgerConfig, DEFAULT_UNIVERSE,
};
pub use env::{EnvOverrides, ENV_API_URL, ENV_CONFIG_PATHS, ENV_DAEMON_ADDR, ENV_STATE_DIR};

/// Prefixes of values that must never appear as literals in config.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",
    "sk_live",
    "sk_test",
    "AKIA",
    "-----BEGIN",
    "ghp_",
    "gho_",
    "glpat-",
    "xoxb-",
    "xoxp-",
];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let layers = paths
        .iter()
        .map(|path| fs::read_to_string(path).with_context(|| format!("config layer {path}")))
        .collect::<Result<Vec<String>>>()?;
    let refs: Vec<&str> = layers.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Map::new());
    // An empty layer is legal (e.g. an override file with everything commented out).
    for (idx, layer) in yaml_docs.iter().enumerate().filter(|(_, d)| !d.trim().is_empty()) {
        let doc: serde_yaml::Value =
            serde_yaml::from_str(layer).with_context(|| format!("layer {idx}: invalid yaml"))?;
        let doc = serde_json::to_value(doc)
            .with_context(|| format!("layer {idx}: not representable as json"))?;
        overlay(&mut merged, doc);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    Ok(LoadedConfig {
        config_hash: sha256_hex(canonical_json.as_bytes()),
        canonical_json,
        config_json: merged,
    })
}

/// Mappings merge key by key; anything else in `top` replaces `base`.
fn overlay(base: &mut Value, top: Value) {
    match (base, top) {
        (Value::Object(base_map), Value::Object(top_map)) => {
            for (k, v) in top_map {
                overlay(base_map.entry(k).or_insert(Value::Null), v);
            }
        }
        (slot, v) => *slot = v,
    }
}

/// Compact JSON with object keys sorted recursively, so layer order and key
/// order inside a file never change the hash.
fn canonicalize_json(v: &Value) -> Result<String> {
    serde_json::to_string(&sort_keys(v)).context("canonical json serialize failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for k in keys {
                out.insert(k.clone(), sort_keys(&map[k.as_str()]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    consumption::collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(Value::as_str) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={ptr} value=REDACTED");
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    t.len() >= 8 && SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}
