//! Bridge session driver.
//!
//! One task per connection generation: connect, pump frames, and reconnect
//! after a fixed delay, forever. Connectivity changes pass through a
//! [`LinkMonitor`] so short outages are not reported. A hard reconnect
//! aborts the task and starts a new generation; consumers drop events whose
//! generation is stale.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::protocol::SocketPacket;
use crate::{
    Connector, ControlCommand, EnginePacket, EventKind, Link, LinkMonitor, SessionEvent,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Tear the link down if nothing arrives for this long.
    pub inactivity_timeout: Duration,
    pub disconnect_grace: Duration,
    pub reconnect_delay: Duration,
    pub connect_timeout: Duration,
    /// Delay before the first connect of the first generation.
    pub startup_delay: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(30),
            disconnect_grace: Duration::from_secs(3),
            reconnect_delay: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(30),
            startup_delay: Duration::from_secs(1),
        }
    }
}

pub struct SessionHandle {
    generation: Arc<AtomicU64>,
    commands_tx: mpsc::UnboundedSender<ControlCommand>,
    commands_rx: Arc<Mutex<mpsc::UnboundedReceiver<ControlCommand>>>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    connector: Arc<dyn Connector>,
    cfg: TransportConfig,
    surfaced_connected: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Spawns generation 1. Must be called inside a tokio runtime.
    pub fn start(
        connector: Arc<dyn Connector>,
        cfg: TransportConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let mut handle = Self {
            generation: Arc::new(AtomicU64::new(1)),
            commands_tx,
            commands_rx: Arc::new(Mutex::new(commands_rx)),
            events_tx,
            connector,
            cfg,
            surfaced_connected: Arc::new(AtomicBool::new(false)),
            task: None,
        };
        let monitor = LinkMonitor::new(handle.cfg.disconnect_grace);
        let delay = handle.cfg.startup_delay;
        handle.spawn(1, monitor, delay);
        (handle, events_rx)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Shared view of the generation counter for consumers filtering events.
    pub fn generation_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.generation)
    }

    /// Queue an outbound event. Commands issued while the link is down are
    /// sent once a link is up.
    pub fn send(&self, cmd: ControlCommand) {
        if self.commands_tx.send(cmd).is_err() {
            debug!("command channel closed");
        }
    }

    /// Tear down the current connection and start a new generation
    /// immediately. Returns the new generation.
    pub fn hard_reconnect(&mut self) -> u64 {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let monitor = if self.surfaced_connected.load(Ordering::SeqCst) {
            LinkMonitor::resumed(self.cfg.disconnect_grace, Instant::now(), "forced reset")
        } else {
            LinkMonitor::new(self.cfg.disconnect_grace)
        };
        info!(generation, "bridge hard reconnect");
        self.spawn(generation, monitor, Duration::ZERO);
        generation
    }

    pub fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn spawn(&mut self, generation: u64, monitor: LinkMonitor, delay: Duration) {
        let driver = Driver {
            generation,
            connector: Arc::clone(&self.connector),
            cfg: self.cfg.clone(),
            events: self.events_tx.clone(),
            surfaced_connected: Arc::clone(&self.surfaced_connected),
            monitor,
        };
        let commands = Arc::clone(&self.commands_rx);
        self.task = Some(tokio::spawn(driver.run(commands, delay)));
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

enum PumpExit {
    LinkLost(String),
    Shutdown,
}

struct Driver {
    generation: u64,
    connector: Arc<dyn Connector>,
    cfg: TransportConfig,
    events: mpsc::UnboundedSender<SessionEvent>,
    surfaced_connected: Arc<AtomicBool>,
    monitor: LinkMonitor,
}

impl Driver {
    async fn run(
        mut self,
        commands: Arc<Mutex<mpsc::UnboundedReceiver<ControlCommand>>>,
        delay: Duration,
    ) {
        // Held for the life of this generation; released when the task is aborted.
        let mut cmd_rx = commands.lock().await;
        if !delay.is_zero() {
            self.wait(sleep(delay)).await;
        }

        let generation = self.generation;
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            debug!(generation, attempt, "bridge connect attempt");
            let connector = Arc::clone(&self.connector);
            let connect = tokio::time::timeout(self.cfg.connect_timeout, connector.connect());
            match self.wait(connect).await {
                Ok(Ok(link)) => {
                    info!(generation, attempt, transport = link.kind.as_str(), "bridge connected");
                    attempt = 0;
                    self.monitor.link_up();
                    self.emit(EventKind::Connected {
                        transport: link.kind,
                    });
                    match self.pump(link, &mut cmd_rx).await {
                        PumpExit::LinkLost(reason) => {
                            warn!(generation, reason = %reason, "bridge link lost");
                            self.monitor.link_down(reason, Instant::now());
                        }
                        PumpExit::Shutdown => return,
                    }
                }
                Ok(Err(e)) => {
                    warn!(generation, attempt, error = %e, "bridge connect failed");
                    self.monitor.link_down(e.to_string(), Instant::now());
                }
                Err(_) => {
                    warn!(generation, attempt, "bridge connect timed out");
                    self.monitor.link_down("connect timeout", Instant::now());
                }
            }
            if self.events.is_closed() {
                return;
            }
            self.wait(sleep(self.cfg.reconnect_delay)).await;
        }
    }

    /// Drives `fut` while honouring the disconnect grace deadline.
    async fn wait<F: Future>(&mut self, fut: F) -> F::Output {
        tokio::pin!(fut);
        loop {
            let deadline = self.monitor.deadline();
            tokio::select! {
                out = &mut fut => return out,
                _ = sleep_until_opt(deadline) => {
                    if let Some(reason) = self.monitor.poll_deadline(Instant::now()) {
                        info!(generation = self.generation, reason = %reason, "bridge disconnected");
                        self.emit(EventKind::Disconnected { reason });
                    }
                }
            }
        }
    }

    async fn pump(
        &mut self,
        link: Link,
        cmd_rx: &mut mpsc::UnboundedReceiver<ControlCommand>,
    ) -> PumpExit {
        let Link {
            mut reader,
            mut writer,
            ..
        } = link;
        let watchdog = sleep(self.cfg.inactivity_timeout);
        tokio::pin!(watchdog);

        loop {
            tokio::select! {
                _ = &mut watchdog => {
                    return PumpExit::LinkLost("inactivity timeout".to_string());
                }
                batch = reader.recv() => {
                    let packets = match batch {
                        Ok(Some(packets)) => packets,
                        Ok(None) => return PumpExit::LinkLost("transport close".to_string()),
                        Err(e) => return PumpExit::LinkLost(format!("transport error: {e}")),
                    };
                    watchdog.as_mut().reset(Instant::now() + self.cfg.inactivity_timeout);

                    for packet in packets {
                        match packet {
                            EnginePacket::Ping(data) => {
                                if let Err(e) = writer.send(vec![EnginePacket::Pong(data)]).await {
                                    return PumpExit::LinkLost(format!("transport error: {e}"));
                                }
                            }
                            EnginePacket::Close => {
                                return PumpExit::LinkLost("transport close".to_string());
                            }
                            EnginePacket::Message(text) => match SocketPacket::decode(&text) {
                                Ok(SocketPacket::Event { name, data }) => {
                                    self.emit(EventKind::from_wire(&name, data));
                                }
                                Ok(SocketPacket::Disconnect) => {
                                    return PumpExit::LinkLost("io server disconnect".to_string());
                                }
                                Ok(SocketPacket::ConnectError { message }) => {
                                    return PumpExit::LinkLost(format!("connect error: {message}"));
                                }
                                Ok(_) => {}
                                Err(e) => debug!(error = %e, "undecodable socket packet"),
                            },
                            _ => {}
                        }
                    }
                }
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else {
                        return PumpExit::Shutdown;
                    };
                    let payload = cmd.payload();
                    let text = SocketPacket::encode_event(cmd.event_name(), payload.as_ref());
                    if let Err(e) = writer.send(vec![EnginePacket::Message(text)]).await {
                        warn!(command = cmd.event_name(), error = %e, "command send failed");
                        return PumpExit::LinkLost(format!("transport error: {e}"));
                    }
                }
            }
        }
    }

    fn emit(&self, kind: EventKind) {
        match &kind {
            EventKind::Connected { .. } => self.surfaced_connected.store(true, Ordering::SeqCst),
            EventKind::Disconnected { .. } => {
                self.surfaced_connected.store(false, Ordering::SeqCst)
            }
            _ => {}
        }
        let _ = self.events.send(SessionEvent {
            generation: self.generation,
            kind,
        });
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(d) => sleep_until(d).await,
        None => std::future::pending().await,
    }
}
