//! Session driver behaviour against an in-memory bridge, on paused time.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nhd_transport::{
    Connector, ControlCommand, EnginePacket, EventKind, Link, LinkReader, LinkWriter,
    SessionEvent, SessionHandle, TransportConfig, TransportError, TransportKind,
};
use tokio::sync::mpsc;

/// Server side of one in-memory link.
struct ServerEnd {
    to_client: mpsc::UnboundedSender<Vec<EnginePacket>>,
    from_client: mpsc::UnboundedReceiver<Vec<EnginePacket>>,
}

impl ServerEnd {
    fn event(&self, text: &str) {
        self.to_client
            .send(vec![EnginePacket::Message(text.to_string())])
            .unwrap();
    }
}

struct MemReader(mpsc::UnboundedReceiver<Vec<EnginePacket>>);

#[async_trait]
impl LinkReader for MemReader {
    async fn recv(&mut self) -> Result<Option<Vec<EnginePacket>>, TransportError> {
        Ok(self.0.recv().await)
    }
}

struct MemWriter(mpsc::UnboundedSender<Vec<EnginePacket>>);

#[async_trait]
impl LinkWriter for MemWriter {
    async fn send(&mut self, packets: Vec<EnginePacket>) -> Result<(), TransportError> {
        self.0.send(packets).map_err(|_| TransportError::Closed)
    }
}

struct MemConnector {
    fail: AtomicBool,
    attempts: AtomicUsize,
    servers: mpsc::UnboundedSender<ServerEnd>,
}

#[async_trait]
impl Connector for MemConnector {
    async fn connect(&self) -> Result<Link, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::Http("connection refused".to_string()));
        }
        let (to_client, client_rx) = mpsc::unbounded_channel();
        let (client_tx, from_client) = mpsc::unbounded_channel();
        self.servers
            .send(ServerEnd {
                to_client,
                from_client,
            })
            .map_err(|_| TransportError::Closed)?;
        Ok(Link {
            kind: TransportKind::WebSocket,
            reader: Box::new(MemReader(client_rx)),
            writer: Box::new(MemWriter(client_tx)),
        })
    }
}

struct Harness {
    handle: SessionHandle,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    servers: mpsc::UnboundedReceiver<ServerEnd>,
    connector: Arc<MemConnector>,
}

fn start() -> Harness {
    let (servers_tx, servers) = mpsc::unbounded_channel();
    let connector = Arc::new(MemConnector {
        fail: AtomicBool::new(false),
        attempts: AtomicUsize::new(0),
        servers: servers_tx,
    });
    let cfg = TransportConfig {
        startup_delay: Duration::ZERO,
        ..TransportConfig::default()
    };
    let (handle, events) = SessionHandle::start(connector.clone(), cfg);
    Harness {
        handle,
        events,
        servers,
        connector,
    }
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Option<SessionEvent> {
    tokio::time::timeout(Duration::from_secs(60), events.recv())
        .await
        .ok()
        .flatten()
}

async fn next_server(h: &mut Harness) -> ServerEnd {
    tokio::time::timeout(Duration::from_secs(60), h.servers.recv())
        .await
        .ok()
        .flatten()
        .expect("connector was called")
}

#[tokio::test(start_paused = true)]
async fn routes_events_answers_pings_and_sends_commands() {
    let mut h = start();
    let mut server = next_server(&mut h).await;

    let ev = next_event(&mut h.events).await.unwrap();
    assert_eq!(ev.generation, 1);
    assert_eq!(
        ev.kind,
        EventKind::Connected {
            transport: TransportKind::WebSocket
        }
    );

    server.event(r#"2["market_data",{"BTCUSD":65000}]"#);
    let ev = next_event(&mut h.events).await.unwrap();
    assert!(matches!(ev.kind, EventKind::Prices { ref name, .. } if name == "market_data"));

    server.to_client.send(vec![EnginePacket::Ping(String::new())]).unwrap();
    assert_eq!(
        server.from_client.recv().await.unwrap(),
        vec![EnginePacket::Pong(String::new())]
    );

    h.handle.send(ControlCommand::RequestFullState);
    assert_eq!(
        server.from_client.recv().await.unwrap(),
        vec![EnginePacket::Message(r#"2["request_full_state"]"#.to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn reconnect_inside_grace_window_is_not_reported() {
    let mut h = start();
    let server = next_server(&mut h).await;
    assert!(matches!(
        next_event(&mut h.events).await.unwrap().kind,
        EventKind::Connected { .. }
    ));

    drop(server);
    // Reconnect delay (2s) beats the grace window (3s).
    let _server = next_server(&mut h).await;
    let ev = next_event(&mut h.events).await.unwrap();
    assert!(matches!(ev.kind, EventKind::Connected { .. }), "{ev:?}");
    assert_eq!(h.connector.attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn sustained_outage_is_reported_once_and_retries_continue() {
    let mut h = start();
    let server = next_server(&mut h).await;
    next_event(&mut h.events).await.unwrap();

    h.connector.fail.store(true, Ordering::SeqCst);
    drop(server);

    let ev = next_event(&mut h.events).await.unwrap();
    assert_eq!(
        ev.kind,
        EventKind::Disconnected {
            reason: "transport close".to_string()
        }
    );

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(h.connector.attempts.load(Ordering::SeqCst) >= 5);

    h.connector.fail.store(false, Ordering::SeqCst);
    let _server = next_server(&mut h).await;
    assert!(matches!(
        next_event(&mut h.events).await.unwrap().kind,
        EventKind::Connected { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn silent_link_is_torn_down_by_watchdog() {
    let mut h = start();
    let _first = next_server(&mut h).await;
    next_event(&mut h.events).await.unwrap();

    // Nothing arrives for 30s; the driver drops the link and reconnects.
    let _second = next_server(&mut h).await;
    assert_eq!(h.connector.attempts.load(Ordering::SeqCst), 2);
    assert!(matches!(
        next_event(&mut h.events).await.unwrap().kind,
        EventKind::Connected { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn hard_reconnect_starts_a_new_generation() {
    let mut h = start();
    let mut first = next_server(&mut h).await;
    next_event(&mut h.events).await.unwrap();

    let generation = h.handle.hard_reconnect();
    assert_eq!(generation, 2);
    assert_eq!(h.handle.generation(), 2);

    let _second = next_server(&mut h).await;
    let ev = next_event(&mut h.events).await.unwrap();
    assert_eq!(ev.generation, 2);
    assert!(matches!(ev.kind, EventKind::Connected { .. }));

    // The old link was released with the aborted task.
    assert_eq!(first.from_client.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn commands_queued_while_down_flush_on_connect() {
    let mut h = start();
    let first = next_server(&mut h).await;
    next_event(&mut h.events).await.unwrap();

    h.connector.fail.store(true, Ordering::SeqCst);
    drop(first);
    h.handle.send(ControlCommand::StopEngine);
    tokio::time::sleep(Duration::from_secs(5)).await;

    h.connector.fail.store(false, Ordering::SeqCst);
    let mut second = next_server(&mut h).await;
    assert_eq!(
        second.from_client.recv().await.unwrap(),
        vec![EnginePacket::Message(r#"2["stop_engine"]"#.to_string())]
    );
}
