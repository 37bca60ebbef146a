//! Session loop: the single consumer of transport events and operator
//! commands. Owns the engine, persists ledger changes, mirrors history, and
//! publishes a fresh snapshot after every step.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use nhd_config::{BridgeConfig, DashboardConfig};
use nhd_ledger::{
    startup_sync, HistoryMirror, HttpMirror, LedgerStore, LedgerWriter, NullMirror, RemoteMirror,
};
use nhd_schemas::LogLevel;
use nhd_transport::{
    BridgeEndpoint, Connector, ControlCommand, SessionEvent, SessionHandle, SocketIoConnector,
    TransportConfig,
};
use tokio::sync::{mpsc, watch};
use tracing::{info, trace, warn};

use crate::{DashboardSnapshot, EngineSettings, Outcome, ReconciliationEngine};

/// Operator requests accepted by a running session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Tear the bridge connection down and start a new generation.
    HardReconnect,
    ClearHistory,
    ClearLogs,
    Control(ControlCommand),
    /// `panic_close` followed by `kill_all`.
    Panic,
    Shutdown,
}

/// Cloneable sender for [`SessionCommand`]s. The session stops once every
/// clone is dropped.
#[derive(Debug, Clone)]
pub struct SessionControl {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionControl {
    /// A detached control and the receiving end, for driving consumers
    /// without a session.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Returns false if the session has stopped.
    pub fn send(&self, cmd: SessionCommand) -> bool {
        self.tx.send(cmd).is_ok()
    }
}

/// Everything a session needs, already constructed.
pub struct SessionParts {
    pub settings: EngineSettings,
    pub store: LedgerStore,
    pub mirror: Arc<dyn RemoteMirror>,
    /// Pull history/logs from the mirror before connecting.
    pub remote_sync: bool,
    pub connector: Arc<dyn Connector>,
    pub transport: TransportConfig,
    /// Shown in the startup telemetry line.
    pub bridge_url: String,
}

pub type SnapshotRx = watch::Receiver<Arc<DashboardSnapshot>>;

pub fn transport_config(bridge: &BridgeConfig) -> TransportConfig {
    TransportConfig {
        inactivity_timeout: Duration::from_millis(bridge.inactivity_timeout_ms),
        disconnect_grace: Duration::from_millis(bridge.disconnect_grace_ms),
        reconnect_delay: Duration::from_millis(bridge.reconnect_delay_ms),
        connect_timeout: Duration::from_millis(bridge.connect_timeout_ms),
        startup_delay: Duration::from_millis(bridge.startup_delay_ms),
    }
}

pub struct DashboardSession {
    engine: ReconciliationEngine,
    transport: SessionHandle,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    writer: LedgerWriter,
    mirror: HistoryMirror,
    snapshot_tx: watch::Sender<Arc<DashboardSnapshot>>,
}

impl DashboardSession {
    /// Build the production stack (file store, HTTP mirror, Socket.IO
    /// connector) from configuration and start it.
    pub async fn from_config(
        cfg: &DashboardConfig,
    ) -> Result<(Self, SessionControl, SnapshotRx)> {
        let store = LedgerStore::new(&cfg.ledger.state_dir)
            .with_context(|| format!("open state dir {}", cfg.ledger.state_dir.display()))?;

        let mirror: Arc<dyn RemoteMirror> = if cfg.ledger.remote_sync {
            Arc::new(
                HttpMirror::new(cfg.api_base(), &cfg.bridge.extra_headers)
                    .context("build remote mirror")?,
            )
        } else {
            Arc::new(NullMirror)
        };

        let connector = SocketIoConnector::new(BridgeEndpoint {
            api_url: cfg.bridge.api_url.clone(),
            socket_path: cfg.bridge.socket_path.clone(),
            extra_headers: cfg.bridge.extra_headers.clone(),
            allow_upgrade: cfg.bridge.allow_upgrade,
        })
        .context("build bridge connector")?;

        Self::start(SessionParts {
            settings: EngineSettings::from_config(cfg)?,
            store,
            mirror,
            remote_sync: cfg.ledger.remote_sync,
            connector: Arc::new(connector),
            transport: transport_config(&cfg.bridge),
            bridge_url: cfg.api_base().to_string(),
        })
        .await
    }

    /// Restore local ledgers, run the startup sync, then start the transport.
    pub async fn start(parts: SessionParts) -> Result<(Self, SessionControl, SnapshotRx)> {
        let SessionParts {
            settings,
            store,
            mirror,
            remote_sync,
            connector,
            transport,
            bridge_url,
        } = parts;

        let mut engine = ReconciliationEngine::new(settings);
        let history = store.load_history().unwrap_or_else(|e| {
            warn!(error = %e, "cached history unreadable; starting empty");
            Vec::new()
        });
        let logs = store.load_logs().unwrap_or_else(|e| {
            warn!(error = %e, "cached logs unreadable; starting empty");
            Vec::new()
        });
        info!(history = history.len(), logs = logs.len(), "local ledgers restored");
        engine.restore(history, logs);

        let mut pending = Vec::new();
        if remote_sync {
            pending.push(engine.note(LogLevel::Info, "SYNC", "Attempting Cloud Sync...", Utc::now()));
            let sync = startup_sync(mirror.as_ref()).await;
            pending.push(engine.apply_sync(sync, Utc::now()));
        }

        let (transport, events) = SessionHandle::start(connector, transport);
        pending.push(engine.note(
            LogLevel::Info,
            "SYS",
            format!("Initializing Bridge Session: {bridge_url}"),
            Utc::now(),
        ));

        let (snapshot_tx, snapshots) =
            watch::channel(Arc::new(engine.snapshot(transport.generation(), Utc::now())));
        let (control, commands) = SessionControl::channel();

        let session = Self {
            engine,
            transport,
            events,
            commands,
            writer: LedgerWriter::spawn(store),
            mirror: HistoryMirror::spawn(mirror),
            snapshot_tx,
        };
        // Synced ledgers came from the mirror; pushing them back is pointless.
        for out in &pending {
            session.persist(out, false);
        }
        session.publish();

        Ok((session, control, snapshots))
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                ev = self.events.recv() => match ev {
                    Some(ev) => self.on_event(ev),
                    None => break,
                },
                cmd = self.commands.recv() => match cmd {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(cmd) => self.on_command(cmd),
                },
            }
        }
        self.transport.shutdown();
        self.writer.flush().await;
        info!("dashboard session stopped");
    }

    fn on_event(&mut self, ev: SessionEvent) {
        let current = self.transport.generation();
        if ev.generation != current {
            trace!(generation = ev.generation, current, "stale event dropped");
            return;
        }
        let out = self.engine.handle(ev.kind, Utc::now());
        self.apply(out);
    }

    fn on_command(&mut self, cmd: SessionCommand) {
        let now = Utc::now();
        let out = match cmd {
            SessionCommand::HardReconnect => {
                let out = self.engine.begin_generation(now);
                self.transport.hard_reconnect();
                out
            }
            SessionCommand::ClearHistory => self.engine.clear_history(),
            SessionCommand::ClearLogs => self.engine.clear_logs(),
            SessionCommand::Control(cmd) => self.engine.command(cmd, now),
            SessionCommand::Panic => {
                let [close, kill] = ControlCommand::panic_sequence();
                let first = self.engine.command(close, now);
                self.apply(first);
                self.engine.command(kill, now)
            }
            SessionCommand::Shutdown => return,
        };
        self.apply(out);
    }

    fn apply(&mut self, out: Outcome) {
        self.persist(&out, true);
        for cmd in out.commands {
            self.transport.send(cmd);
        }
        self.publish();
    }

    /// Queues the local writes and the mirror push; neither blocks the loop
    /// and a mirror failure never rolls anything back.
    fn persist(&self, out: &Outcome, mirror: bool) {
        if out.history_changed() {
            let history = self.engine.history().to_vec();
            if mirror {
                self.mirror.push(history.clone());
            }
            self.writer.save_history(history);
        }
        if out.logs_changed() {
            self.writer.save_logs(self.engine.logs().to_vec());
        }
    }

    fn publish(&self) {
        let snapshot = self.engine.snapshot(self.transport.generation(), Utc::now());
        self.snapshot_tx.send_replace(Arc::new(snapshot));
    }
}
