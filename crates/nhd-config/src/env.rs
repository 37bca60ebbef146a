//! Environment overrides.
//!
//! The single place that reads process environment for configuration; binaries
//! call [`EnvOverrides::from_env`] once (after `dotenvy`) and apply the result.

use std::path::PathBuf;

use anyhow::Result;

use crate::{DashboardConfig, LoadedConfig};

pub const ENV_API_URL: &str = "NHD_API_URL";
pub const ENV_STATE_DIR: &str = "NHD_STATE_DIR";
pub const ENV_DAEMON_ADDR: &str = "NHD_DAEMON_ADDR";
/// Comma-separated YAML layer paths, lowest precedence first.
pub const ENV_CONFIG_PATHS: &str = "NHD_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub api_url: Option<String>,
    pub state_dir: Option<String>,
    pub daemon_addr: Option<String>,
    pub config_paths: Vec<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            api_url: get(ENV_API_URL),
            state_dir: get(ENV_STATE_DIR),
            daemon_addr: get(ENV_DAEMON_ADDR),
            config_paths: get(ENV_CONFIG_PATHS)
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Load the configured layers, then apply these overrides on top.
    pub fn resolve(&self) -> Result<(LoadedConfig, DashboardConfig)> {
        let paths: Vec<&str> = self.config_paths.iter().map(String::as_str).collect();
        let (loaded, mut cfg) = DashboardConfig::load(&paths)?;
        self.apply(&mut cfg);
        cfg.validate()?;
        Ok((loaded, cfg))
    }

    pub fn apply(&self, cfg: &mut DashboardConfig) {
        if let Some(url) = &self.api_url {
            cfg.bridge.api_url = url.clone();
        }
        if let Some(dir) = &self.state_dir {
            cfg.ledger.state_dir = PathBuf::from(dir);
        }
        if let Some(addr) = &self.daemon_addr {
            cfg.daemon.addr = addr.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn lookup_trims_and_splits() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_API_URL, " https://bridge.example "),
            (ENV_CONFIG_PATHS, "config/base.yaml, ,config/local.yaml"),
            (ENV_STATE_DIR, "   "),
        ]);
        let ov = EnvOverrides::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(ov.api_url.as_deref(), Some("https://bridge.example"));
        assert_eq!(ov.state_dir, None);
        assert_eq!(ov.config_paths, vec!["config/base.yaml", "config/local.yaml"]);

        let mut cfg = DashboardConfig::default();
        ov.apply(&mut cfg);
        assert_eq!(cfg.bridge.api_url, "https://bridge.example");
        assert_eq!(cfg.daemon.addr, "127.0.0.1:8899");
    }
}
