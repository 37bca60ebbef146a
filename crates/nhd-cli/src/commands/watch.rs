//! `nhd watch`: headless dashboard session.
//!
//! Runs the same session the daemon runs and prints one line per published
//! snapshot until Ctrl-C or `--max-updates`.

use anyhow::{Context, Result};
use nhd_config::{DashboardConfig, EnvOverrides};
use nhd_runtime::{DashboardSession, DashboardSnapshot, SessionCommand};
use tracing::info;

use super::path_refs;

pub async fn run(config_paths: Vec<String>, max_updates: Option<u64>) -> Result<()> {
    let overrides = EnvOverrides::from_env();
    let (loaded, cfg) = if config_paths.is_empty() {
        overrides.resolve()?
    } else {
        let (loaded, mut cfg) = DashboardConfig::load(&path_refs(&config_paths))?;
        overrides.apply(&mut cfg);
        cfg.validate()?;
        (loaded, cfg)
    };
    info!(config_hash = %loaded.config_hash, "configuration loaded");

    let (session, control, mut snapshots) = DashboardSession::from_config(&cfg)
        .await
        .context("start dashboard session")?;
    let runner = tokio::spawn(session.run());

    let mut seen = 0u64;
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = snapshots.borrow_and_update().clone();
                println!("{}", summary_line(&snap));
                seen += 1;
                if max_updates.is_some_and(|m| seen >= m) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    control.send(SessionCommand::Shutdown);
    let _ = runner.await;
    Ok(())
}

fn summary_line(s: &DashboardSnapshot) -> String {
    let link = match (s.link.connected, s.link.transport) {
        (true, Some(t)) => format!("up/{t}"),
        (true, None) => "up".to_string(),
        (false, _) => "down".to_string(),
    };
    let newest = s
        .logs
        .first()
        .map(|l| format!("[{}] {}", l.trigger, l.msg))
        .unwrap_or_default();
    format!(
        "gen={} link={} engine={} active={} pending={} upnl={:.2} history={} {}",
        s.generation,
        link,
        if s.bot_active { "on" } else { "off" },
        s.active.len(),
        s.pending.len(),
        s.summary.unrealized_pnl,
        s.history.len(),
        newest
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhd_runtime::LinkStatus;

    #[test]
    fn summary_line_shows_link_and_counts() {
        let snap = DashboardSnapshot {
            generation: 2,
            link: LinkStatus {
                connected: true,
                transport: Some("polling"),
            },
            ..DashboardSnapshot::default()
        };
        let line = summary_line(&snap);
        assert!(line.starts_with("gen=2 link=up/polling engine=off active=0 pending=0"));
    }
}
