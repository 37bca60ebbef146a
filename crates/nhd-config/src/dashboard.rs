use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{load_layered_yaml, LoadedConfig};

/// Symbols tracked from startup, before the engine reports on any of them.
pub const DEFAULT_UNIVERSE: [&str; 9] = [
    "BTCUSD", "ETHUSD", "NAS100", "SP500", "TSLA", "USOIL", "XAGUSD", "XPTUSD", "XAUUSD",
];

/// Typed view of the merged configuration. Every field has a default, so an
/// empty document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub bridge: BridgeConfig,
    pub ledger: LedgerConfig,
    pub display: DisplayConfig,
    pub universe: Vec<String>,
    pub daemon: DaemonConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bridge: BridgeConfig::default(),
            ledger: LedgerConfig::default(),
            display: DisplayConfig::default(),
            universe: DEFAULT_UNIVERSE.iter().map(|s| s.to_string()).collect(),
            daemon: DaemonConfig::default(),
        }
    }
}

/// Streaming bridge connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub api_url: String,
    pub socket_path: String,
    /// Sent on every HTTP and websocket request (tunnel interstitial bypass).
    pub extra_headers: BTreeMap<String, String>,
    pub allow_upgrade: bool,
    pub connect_timeout_ms: u64,
    pub reconnect_delay_ms: u64,
    pub inactivity_timeout_ms: u64,
    pub disconnect_grace_ms: u64,
    pub startup_delay_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            socket_path: "/socket.io/".to_string(),
            extra_headers: BTreeMap::from([(
                "ngrok-skip-browser-warning".to_string(),
                "69420".to_string(),
            )]),
            allow_upgrade: true,
            connect_timeout_ms: 30_000,
            reconnect_delay_ms: 2_000,
            inactivity_timeout_ms: 30_000,
            disconnect_grace_ms: 3_000,
            startup_delay_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub state_dir: PathBuf,
    pub history_cap: usize,
    pub log_cap: usize,
    pub equity_cap: usize,
    /// Mirror history to the bridge and pull it on startup.
    pub remote_sync: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".nhd_state"),
            history_cap: 1000,
            log_cap: 2000,
            equity_cap: 50,
            remote_sync: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// IANA timezone name used for display times.
    pub timezone: String,
    /// How many inbound packets the inspector logs after startup.
    pub packet_inspector_limit: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            packet_inspector_limit: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub addr: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8899".to_string(),
        }
    }
}

impl DashboardConfig {
    pub fn from_config_json(v: &Value) -> Result<Self> {
        let cfg: DashboardConfig =
            serde_json::from_value(v.clone()).context("config does not match DashboardConfig")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load layers from disk. No paths means defaults only.
    pub fn load(paths: &[&str]) -> Result<(LoadedConfig, Self)> {
        let loaded = load_layered_yaml(paths)?;
        let cfg = Self::from_config_json(&loaded.config_json)?;
        Ok((loaded, cfg))
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.bridge.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("CONFIG_INVALID bridge.api_url must be http(s): {url:?}");
        }
        if !self.bridge.socket_path.starts_with('/') {
            bail!("CONFIG_INVALID bridge.socket_path must start with '/'");
        }
        if self.bridge.inactivity_timeout_ms == 0 {
            bail!("CONFIG_INVALID bridge.inactivity_timeout_ms must be > 0");
        }
        if self.ledger.history_cap == 0 || self.ledger.log_cap == 0 || self.ledger.equity_cap == 0
        {
            bail!("CONFIG_INVALID ledger caps must be > 0");
        }
        if self.universe.iter().any(|s| s.trim().is_empty()) {
            bail!("CONFIG_INVALID universe contains an empty symbol");
        }
        self.timezone()?;
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.display
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("CONFIG_INVALID display.timezone: {e}"))
    }

    /// Bridge base URL without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.bridge.api_url.trim().trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_layered_yaml_from_strings;

    #[test]
    fn empty_document_yields_defaults() {
        let loaded = load_layered_yaml_from_strings(&[]).unwrap();
        let cfg = DashboardConfig::from_config_json(&loaded.config_json).unwrap();
        assert_eq!(cfg, DashboardConfig::default());
        assert_eq!(cfg.universe.len(), 9);
        assert_eq!(cfg.bridge.reconnect_delay_ms, 2000);
        assert_eq!(cfg.bridge.inactivity_timeout_ms, 30_000);
        assert_eq!(cfg.bridge.disconnect_grace_ms, 3_000);
        assert_eq!(cfg.ledger.history_cap, 1000);
        assert_eq!(cfg.ledger.log_cap, 2000);
        assert_eq!(cfg.ledger.equity_cap, 50);
    }

    #[test]
    fn partial_override_keeps_sibling_defaults() {
        let loaded = load_layered_yaml_from_strings(&[
            "bridge:\n  api_url: https://abc.ngrok-free.app/\n",
            "display:\n  timezone: Europe/London\n",
        ])
        .unwrap();
        let cfg = DashboardConfig::from_config_json(&loaded.config_json).unwrap();
        assert_eq!(cfg.api_base(), "https://abc.ngrok-free.app");
        assert_eq!(cfg.bridge.socket_path, "/socket.io/");
        assert_eq!(cfg.timezone().unwrap(), chrono_tz::Europe::London);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad_tz = load_layered_yaml_from_strings(&["display:\n  timezone: Mars/Olympus\n"]).unwrap();
        assert!(DashboardConfig::from_config_json(&bad_tz.config_json).is_err());

        let bad_url = load_layered_yaml_from_strings(&["bridge:\n  api_url: localhost:8000\n"]).unwrap();
        assert!(DashboardConfig::from_config_json(&bad_url.config_json).is_err());

        let zero_cap = load_layered_yaml_from_strings(&["ledger:\n  equity_cap: 0\n"]).unwrap();
        assert!(DashboardConfig::from_config_json(&zero_cap.config_json).is_err());
    }
}
