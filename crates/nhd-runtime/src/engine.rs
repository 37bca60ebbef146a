//! Reconciliation engine.
//!
//! Sole owner of canonical symbol state, prices, account, and the ledgers.
//! Every method runs to completion synchronously; the session loop feeds it
//! events strictly in arrival order.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use nhd_config::{DashboardConfig, DEFAULT_UNIVERSE};
use nhd_ledger::{EquitySeries, HistoryLedger, SyncOutcome, TelemetryLog};
use nhd_normalize::{
    decode_account_event, decode_engine_flags, decode_price_event, decode_state_event,
    describe_packet, PriceDecode, StateDecode,
};
use nhd_reconcile::{
    classify_with, detect_transitions, history_stats, lifecycle_stages, merge_into,
    merge_prices_into, summarize, Classified, DisplayClock, HistoryStats, LifecycleStage,
    PortfolioSummary, TransitionContext,
};
use nhd_schemas::{
    AccountState, ClosedTradeRecord, LogEntry, LogLevel, MarketPrices, SymbolState, SymbolStates,
};
use nhd_transport::{ControlCommand, EventKind, StateSource, TransportKind};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::{DashboardSnapshot, LinkStatus};

/// Engine tunables, normally taken from [`DashboardConfig`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Symbols seeded with a default state before the bridge reports on them.
    pub universe: Vec<String>,
    pub history_cap: usize,
    pub log_cap: usize,
    pub equity_cap: usize,
    /// How many inbound events get a DEBUG telemetry line per generation.
    pub packet_inspector_limit: usize,
    pub clock: DisplayClock,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            universe: DEFAULT_UNIVERSE.iter().map(|s| s.to_string()).collect(),
            history_cap: 1000,
            log_cap: 2000,
            equity_cap: 50,
            packet_inspector_limit: 10,
            clock: DisplayClock::utc(),
        }
    }
}

impl EngineSettings {
    pub fn from_config(cfg: &DashboardConfig) -> Result<Self> {
        Ok(Self {
            universe: cfg.universe.clone(),
            history_cap: cfg.ledger.history_cap,
            log_cap: cfg.ledger.log_cap,
            equity_cap: cfg.ledger.equity_cap,
            packet_inspector_limit: cfg.display.packet_inspector_limit,
            clock: DisplayClock::new(cfg.timezone()?),
        })
    }
}

/// Side effects the caller owes after one engine step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    /// Records appended this step, newest first.
    pub new_records: Vec<ClosedTradeRecord>,
    /// History was replaced or cleared wholesale.
    pub history_reset: bool,
    /// Telemetry created this step, in creation order.
    pub new_logs: Vec<LogEntry>,
    pub logs_reset: bool,
    /// Outbound events, in send order.
    pub commands: Vec<ControlCommand>,
}

impl Outcome {
    pub fn history_changed(&self) -> bool {
        self.history_reset || !self.new_records.is_empty()
    }

    pub fn logs_changed(&self) -> bool {
        self.logs_reset || !self.new_logs.is_empty()
    }
}

pub struct ReconciliationEngine {
    settings: EngineSettings,

    states: SymbolStates,
    prices: MarketPrices,
    account: Option<AccountState>,

    connected: bool,
    transport: Option<TransportKind>,
    bot_active: bool,
    strategy_name: Option<String>,

    derived: Classified,
    /// Last derived collections observed while live; detection diffs against it.
    baseline: Classified,
    summary: PortfolioSummary,
    lifecycle: BTreeMap<String, LifecycleStage>,

    history: HistoryLedger,
    logs: TelemetryLog,
    equity: EquitySeries,
    history_view: Arc<Vec<ClosedTradeRecord>>,
    stats: HistoryStats,
    logs_view: Arc<Vec<LogEntry>>,

    inspected: usize,
}

impl ReconciliationEngine {
    pub fn new(settings: EngineSettings) -> Self {
        let states: SymbolStates = settings
            .universe
            .iter()
            .map(|s| (s.clone(), SymbolState::seed()))
            .collect();
        let lifecycle = lifecycle_stages(&states);
        Self {
            history: HistoryLedger::new(settings.history_cap),
            logs: TelemetryLog::new(settings.log_cap),
            equity: EquitySeries::new(settings.equity_cap),
            settings,
            states,
            prices: MarketPrices::new(),
            account: None,
            connected: false,
            transport: None,
            bot_active: false,
            strategy_name: None,
            derived: Classified::default(),
            baseline: Classified::default(),
            summary: PortfolioSummary::default(),
            lifecycle,
            history_view: Arc::new(Vec::new()),
            stats: HistoryStats::default(),
            logs_view: Arc::new(Vec::new()),
            inspected: 0,
        }
    }

    /// Seed the ledgers from the local cache.
    pub fn restore(&mut self, history: Vec<ClosedTradeRecord>, logs: Vec<LogEntry>) {
        self.history.replace_all(history);
        self.logs.replace_all(logs);
        self.refresh_views(true, true);
    }

    // -----------------------------------------------------------------------
    // Event handling
    // -----------------------------------------------------------------------

    pub fn handle(&mut self, kind: EventKind, now: DateTime<Utc>) -> Outcome {
        let mut out = Outcome::default();

        if let Some((name, payload)) = kind.inbound() {
            self.inspect(&mut out, name, payload, now);
        }

        match kind {
            EventKind::Connected { transport } => {
                self.connected = true;
                self.transport = Some(transport);
                self.log(&mut out, LogLevel::Success, "NET", "Bridge Stabilized (Live)", now);
                out.commands.push(ControlCommand::RequestFullState);
                out.commands.push(ControlCommand::SubscribeAll);
            }
            EventKind::Disconnected { reason } => {
                self.connected = false;
                self.transport = None;
                self.log(&mut out, LogLevel::Error, "NET", format!("Disconnected: {reason}"), now);
            }
            EventKind::State { source, payload } => self.on_state(&mut out, source, &payload, now),
            EventKind::Prices { name, payload } => match decode_price_event(&payload) {
                PriceDecode::Recognized { prices, dropped, .. } => {
                    if dropped > 0 {
                        debug!(event = %name, dropped, "non-numeric prices skipped");
                    }
                    merge_prices_into(&mut self.prices, prices);
                    self.tick(&mut out, now);
                }
                PriceDecode::Unrecognized(err) => {
                    warn!(event = %name, error = %err, "price payload discarded");
                    self.log(&mut out, LogLevel::Warning, "DATA", format!("Discarded {name} payload: {err}"), now);
                }
            },
            EventKind::Account { payload } => match decode_account_event(&payload) {
                Some(update) => {
                    if update.link_online && !self.connected {
                        self.connected = true;
                    }
                    self.equity.push(update.equity_sample);
                    self.account = Some(update.account);
                    self.summary = summarize(&self.derived, self.account.as_ref());
                }
                None => {
                    warn!("account payload discarded");
                    self.log(&mut out, LogLevel::Warning, "DATA", "Discarded account_update payload: not an object", now);
                }
            },
            EventKind::Unknown { name, .. } => trace!(event = %name, "unhandled event"),
        }

        self.finish(out)
    }

    fn on_state(&mut self, out: &mut Outcome, source: StateSource, payload: &Value, now: DateTime<Utc>) {
        let flags = match source {
            StateSource::StrategyState | StateSource::StrategyUpdate => decode_engine_flags(payload),
            StateSource::Heartbeat => Default::default(),
        };
        if let Some(active) = flags.active {
            self.bot_active = active;
        }
        if let Some(name) = &flags.strategy_name {
            self.strategy_name = Some(name.clone());
        }

        match decode_state_event(payload) {
            StateDecode::Recognized { shape, symbols, dropped } => {
                if dropped > 0 {
                    debug!(event = source.as_str(), shape = shape.as_str(), dropped, "symbol records skipped");
                }
                merge_into(&mut self.states, symbols);
                self.tick(out, now);
            }
            // A bare `{active: false}` toggle is not a shape error.
            StateDecode::Unrecognized(_) if !flags.is_empty() => {}
            StateDecode::Unrecognized(err) => {
                warn!(event = source.as_str(), error = %err, "state payload discarded");
                self.log(out, LogLevel::Warning, "DATA", format!("Discarded {} payload: {err}", source.as_str()), now);
            }
        }

        match source {
            StateSource::StrategyState => {
                self.log(out, LogLevel::Info, "SYS", "Received Strategy Sync", now)
            }
            StateSource::Heartbeat => {
                if let Value::Array(items) = payload {
                    self.log(out, LogLevel::Info, "SYS", format!("Heartbeat: {} symbols", items.len()), now);
                }
            }
            StateSource::StrategyUpdate => {}
        }
    }

    /// Recompute derived views; while live, diff against the baseline.
    fn tick(&mut self, out: &mut Outcome, now: DateTime<Utc>) {
        let current = classify_with(&self.states, &self.prices, &self.settings.clock);

        if self.connected {
            let ctx = TransitionContext {
                closed_at_ms: now.timestamp_millis(),
                time: self.settings.clock.format_at(now),
            };
            let records = detect_transitions(
                &self.baseline.active,
                &self.baseline.pending,
                &current.active,
                &current.pending,
                &ctx,
            );
            if !records.is_empty() {
                debug!(count = records.len(), "lifecycle transitions recorded");
                self.history.prepend_batch(records.clone());
                out.new_records.extend(records);
            }
            self.baseline = current.clone();
        }

        self.summary = summarize(&current, self.account.as_ref());
        self.lifecycle = lifecycle_stages(&self.states);
        self.derived = current;
    }

    fn inspect(&mut self, out: &mut Outcome, name: &str, payload: &Value, now: DateTime<Utc>) {
        if self.inspected >= self.settings.packet_inspector_limit {
            return;
        }
        self.inspected += 1;
        self.log(out, LogLevel::Info, "DEBUG", describe_packet(name, payload), now);
    }

    // -----------------------------------------------------------------------
    // Operator actions
    // -----------------------------------------------------------------------

    /// Append a free-form telemetry line.
    pub fn note(&mut self, level: LogLevel, trigger: &str, msg: impl Into<String>, now: DateTime<Utc>) -> Outcome {
        let mut out = Outcome::default();
        self.log(&mut out, level, trigger, msg, now);
        self.finish(out)
    }

    /// Called when the transport starts a new generation.
    pub fn begin_generation(&mut self, now: DateTime<Utc>) -> Outcome {
        self.inspected = 0;
        self.note(LogLevel::Warning, "SYS", "Forcing Bridge Reset...", now)
    }

    /// Log an operator command and pass it through.
    pub fn command(&mut self, cmd: ControlCommand, now: DateTime<Utc>) -> Outcome {
        let mut out = Outcome::default();
        let msg = match &cmd {
            ControlCommand::PanicClose => "INITIATING PANIC CLOSE (ALL POSITIONS)...".to_string(),
            ControlCommand::ClosePosition { symbol, ticket } => format!(
                "Sending CLOSE command for {} (Ticket: {})...",
                symbol.as_deref().unwrap_or("?"),
                ticket.map_or_else(|| "ALL".to_string(), |t| t.to_string())
            ),
            other => format!("Sending {} command...", other.event_name().to_ascii_uppercase()),
        };
        let trigger = match &cmd {
            ControlCommand::PanicClose | ControlCommand::ClosePosition { .. } => "MANUAL",
            ControlCommand::UpdateRisk(_) => "RISK",
            _ => "SYS",
        };
        self.log(&mut out, LogLevel::Info, trigger, msg, now);
        out.commands.push(cmd);
        self.finish(out)
    }

    pub fn clear_history(&mut self) -> Outcome {
        self.history.clear();
        let out = Outcome {
            history_reset: true,
            ..Outcome::default()
        };
        self.finish(out)
    }

    pub fn clear_logs(&mut self) -> Outcome {
        self.logs.clear();
        let out = Outcome {
            logs_reset: true,
            ..Outcome::default()
        };
        self.finish(out)
    }

    /// Apply the startup pull from the remote mirror.
    pub fn apply_sync(&mut self, sync: SyncOutcome, now: DateTime<Utc>) -> Outcome {
        let mut out = Outcome::default();
        match sync {
            SyncOutcome::Remote { history, logs } => {
                self.history.replace_all(history);
                out.history_reset = true;
                self.log(&mut out, LogLevel::Success, "SYNC", "History Synced", now);
                if let Some(logs) = logs {
                    self.logs.replace_all(logs);
                    out.logs_reset = true;
                    self.log(&mut out, LogLevel::Success, "SYNC", "Telemetry Synced", now);
                }
            }
            SyncOutcome::LocalOnly { reason } => {
                self.log(&mut out, LogLevel::Warning, "SYNC", format!("Bridge Unreachable: {reason}"), now);
            }
        }
        self.finish(out)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn log(&mut self, out: &mut Outcome, level: LogLevel, trigger: &str, msg: impl Into<String>, now: DateTime<Utc>) {
        let entry = LogEntry::new(self.settings.clock.format_at(now), level, trigger, msg);
        self.logs.prepend(entry.clone());
        out.new_logs.push(entry);
    }

    /// Refresh shared views and queue log broadcasts while live.
    fn finish(&mut self, mut out: Outcome) -> Outcome {
        self.refresh_views(out.history_changed(), out.logs_changed());
        if self.connected {
            out.commands
                .extend(out.new_logs.iter().cloned().map(ControlCommand::NewLog));
        }
        out
    }

    fn refresh_views(&mut self, history: bool, logs: bool) {
        if history {
            self.history_view = Arc::new(self.history.items().to_vec());
            self.stats = history_stats(&self.history_view);
        }
        if logs {
            self.logs_view = Arc::new(self.logs.items().to_vec());
        }
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn bot_active(&self) -> bool {
        self.bot_active
    }

    pub fn strategy_name(&self) -> Option<&str> {
        self.strategy_name.as_deref()
    }

    pub fn states(&self) -> &SymbolStates {
        &self.states
    }

    pub fn prices(&self) -> &MarketPrices {
        &self.prices
    }

    pub fn account(&self) -> Option<&AccountState> {
        self.account.as_ref()
    }

    pub fn derived(&self) -> &Classified {
        &self.derived
    }

    pub fn summary(&self) -> &PortfolioSummary {
        &self.summary
    }

    pub fn stats(&self) -> &HistoryStats {
        &self.stats
    }

    pub fn history(&self) -> &[ClosedTradeRecord] {
        self.history.items()
    }

    pub fn logs(&self) -> &[LogEntry] {
        self.logs.items()
    }

    pub fn equity(&self) -> Vec<f64> {
        self.equity.to_vec()
    }

    pub fn snapshot(&self, generation: u64, now: DateTime<Utc>) -> DashboardSnapshot {
        DashboardSnapshot {
            generation,
            link: LinkStatus {
                connected: self.connected,
                transport: self.transport.map(|t| t.as_str()),
            },
            bot_active: self.bot_active,
            strategy_name: self.strategy_name.clone(),
            symbols: self.states.clone(),
            prices: self.prices.clone(),
            account: self.account.clone(),
            active: self.derived.active.clone(),
            pending: self.derived.pending.clone(),
            summary: self.summary.clone(),
            lifecycle: self.lifecycle.clone(),
            history: Arc::clone(&self.history_view),
            stats: self.stats.clone(),
            logs: Arc::clone(&self.logs_view),
            equity: self.equity.to_vec(),
            updated_at_ms: now.timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use nhd_schemas::FinalStatus;
    use serde_json::json;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn live_engine() -> ReconciliationEngine {
        let mut e = ReconciliationEngine::new(EngineSettings {
            packet_inspector_limit: 0,
            ..EngineSettings::default()
        });
        e.handle(EventKind::Connected { transport: TransportKind::WebSocket }, t(0));
        e
    }

    fn state(payload: Value) -> EventKind {
        EventKind::State {
            source: StateSource::StrategyUpdate,
            payload,
        }
    }

    #[test]
    fn universe_is_seeded_before_any_event() {
        let e = ReconciliationEngine::new(EngineSettings::default());
        assert_eq!(e.states().len(), 9);
        assert!(e.states().contains_key("XAUUSD"));
        assert!(e.derived().active.is_empty());
    }

    #[test]
    fn connect_requests_full_state_and_broadcasts_its_log() {
        let mut e = ReconciliationEngine::new(EngineSettings::default());
        let out = e.handle(EventKind::Connected { transport: TransportKind::Polling }, t(0));
        assert!(e.is_connected());
        assert_eq!(out.commands[0], ControlCommand::RequestFullState);
        assert_eq!(out.commands[1], ControlCommand::SubscribeAll);
        assert!(matches!(&out.commands[2], ControlCommand::NewLog(l) if l.msg == "Bridge Stabilized (Live)"));
    }

    #[test]
    fn disconnect_log_is_not_broadcast() {
        let mut e = live_engine();
        let out = e.handle(EventKind::Disconnected { reason: "ping timeout".into() }, t(1));
        assert!(!e.is_connected());
        assert_eq!(out.new_logs[0].msg, "Disconnected: ping timeout");
        assert!(out.commands.is_empty());
    }

    #[test]
    fn no_transitions_are_recorded_while_offline() {
        let mut e = live_engine();
        e.handle(state(json!({"symbols": {"BTCUSD": {"status": "SCALING", "entries": [{"price": 100, "ticket": 9, "pnl": 1}]}}})), t(1));
        assert_eq!(e.derived().active.len(), 1);

        e.handle(EventKind::Disconnected { reason: "transport close".into() }, t(2));
        // Prices still move while offline but nothing is inferred.
        let out = e.handle(EventKind::Prices { name: "market_data".into(), payload: json!({"BTCUSD": 101}) }, t(3));
        assert!(out.new_records.is_empty());

        // Back online: the position vanished during the outage and is recorded once.
        e.handle(EventKind::Connected { transport: TransportKind::Polling }, t(4));
        let out = e.handle(state(json!({"symbols": {"BTCUSD": {"status": "SCANNING", "entries": []}}})), t(5));
        assert_eq!(out.new_records.len(), 1);
        assert_eq!(out.new_records[0].final_status, FinalStatus::Filled);
        let again = e.handle(state(json!({"symbols": {"BTCUSD": {"status": "SCANNING", "entries": []}}})), t(6));
        assert!(again.new_records.is_empty());
        assert_eq!(e.history().len(), 1);
    }

    #[test]
    fn engine_flags_update_without_shape_warning() {
        let mut e = live_engine();
        let out = e.handle(state(json!({"active": true, "activeStrategy": "Hull Scalper"})), t(1));
        assert!(e.bot_active());
        assert_eq!(e.strategy_name(), Some("Hull Scalper"));
        assert!(out.new_logs.iter().all(|l| l.trigger != "DATA"));

        let out = e.handle(state(json!("garbage")), t(2));
        assert_eq!(out.new_logs[0].trigger, "DATA");
    }

    #[test]
    fn heartbeat_sequence_is_logged_with_its_size() {
        let mut e = live_engine();
        let out = e.handle(
            EventKind::State {
                source: StateSource::Heartbeat,
                payload: json!([{"symbol": "BTCUSD", "status": "LOCKED"}, {"symbol": "ETHUSD"}]),
            },
            t(1),
        );
        assert_eq!(out.new_logs.last().unwrap().msg, "Heartbeat: 2 symbols");
        assert_eq!(e.derived().pending.len(), 1);
    }

    #[test]
    fn account_updates_feed_equity_and_connectivity_hint() {
        let mut e = ReconciliationEngine::new(EngineSettings::default());
        e.handle(EventKind::Account { payload: json!({"balance": 10000, "equity": 10250, "status": "ONLINE"}) }, t(0));
        e.handle(EventKind::Account { payload: json!({"balance": 10000}) }, t(1));
        assert!(e.is_connected());
        assert_eq!(e.equity(), vec![10250.0, 10000.0]);
        assert_eq!(e.summary().open_pnl, Some(-10000.0));
    }

    #[test]
    fn packet_inspector_stops_after_limit_and_resets_per_generation() {
        let mut e = ReconciliationEngine::new(EngineSettings {
            packet_inspector_limit: 2,
            ..EngineSettings::default()
        });
        let mut debug_lines = 0;
        for i in 0..5 {
            let out = e.handle(EventKind::Unknown { name: "news".into(), payload: json!(i) }, t(i));
            debug_lines += out.new_logs.iter().filter(|l| l.trigger == "DEBUG").count();
        }
        assert_eq!(debug_lines, 2);

        let out = e.begin_generation(t(10));
        assert_eq!(out.new_logs[0].msg, "Forcing Bridge Reset...");
        let out = e.handle(EventKind::Unknown { name: "news".into(), payload: json!(1) }, t(11));
        assert!(out.new_logs[0].msg.starts_with("Packet: news"));
    }

    #[test]
    fn clearing_resets_ledgers_and_views() {
        let mut e = live_engine();
        e.restore(
            vec![ClosedTradeRecord::default()],
            vec![LogEntry::new("1", LogLevel::Info, "SYS", "x")],
        );
        assert_eq!(e.snapshot(1, t(0)).history.len(), 1);
        let out = e.clear_history();
        assert!(out.history_changed());
        assert!(e.snapshot(1, t(0)).history.is_empty());
        let out = e.clear_logs();
        assert!(out.logs_changed());
        assert!(e.logs().is_empty());
    }

    #[test]
    fn sync_failure_keeps_local_cache() {
        let mut e = ReconciliationEngine::new(EngineSettings::default());
        e.restore(vec![ClosedTradeRecord::default()], vec![]);
        let out = e.apply_sync(SyncOutcome::LocalOnly { reason: "HTTP 502".into() }, t(0));
        assert!(!out.history_changed());
        assert_eq!(e.history().len(), 1);
        assert_eq!(e.logs()[0].msg, "Bridge Unreachable: HTTP 502");
    }

    #[test]
    fn snapshot_stats_follow_the_history() {
        let mut e = live_engine();
        let filled = |symbol: &str, pnl: f64| ClosedTradeRecord {
            symbol: symbol.to_string(),
            pnl,
            final_status: FinalStatus::Filled,
            ..ClosedTradeRecord::default()
        };
        e.restore(vec![filled("BTCUSD", 12.0), filled("XAUUSD", -4.0)], vec![]);

        let stats = e.snapshot(1, t(0)).stats;
        assert_eq!(stats.trades, 2);
        assert_eq!(stats.profit_factor, 3.0);
        assert_eq!(stats.pnl_by_symbol.get("XAUUSD"), Some(&-4.0));

        e.clear_history();
        assert_eq!(e.snapshot(1, t(1)).stats.trades, 0);
        assert_eq!(e.stats().profit_factor, 0.0);
    }
}
