//! Socket.IO client over Engine.IO v4.
//!
//! Connect sequence: polling handshake, namespace connect, then an optional
//! websocket upgrade (`2probe` / `3probe` / `5`). If the upgrade fails the
//! session stays on long-polling.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::protocol::{decode_payload, encode_payload, Handshake, SocketPacket, EIO_VERSION};
use crate::{Connector, EnginePacket, Link, LinkReader, LinkWriter, TransportError, TransportKind};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const ACK_POLLS: usize = 3;
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Slack on top of the server's ping cadence for a long-poll GET.
const POLL_SLACK: Duration = Duration::from_secs(5);

/// Where and how to reach the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeEndpoint {
    pub api_url: String,
    pub socket_path: String,
    pub extra_headers: BTreeMap<String, String>,
    pub allow_upgrade: bool,
}

pub struct SocketIoConnector {
    http: reqwest::Client,
    endpoint: BridgeEndpoint,
}

impl SocketIoConnector {
    pub fn new(endpoint: BridgeEndpoint) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .default_headers(header_map(&endpoint.extra_headers)?)
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self { http, endpoint })
    }

    fn polling_url(&self, sid: Option<&str>) -> String {
        let base = self.endpoint.api_url.trim_end_matches('/');
        let mut url = format!(
            "{base}{}?EIO={EIO_VERSION}&transport=polling",
            self.endpoint.socket_path
        );
        if let Some(sid) = sid {
            url.push_str("&sid=");
            url.push_str(sid);
        }
        url
    }

    fn websocket_url(&self, sid: &str) -> String {
        let base = self.endpoint.api_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!(
            "{base}{}?EIO={EIO_VERSION}&transport=websocket&sid={sid}",
            self.endpoint.socket_path
        )
    }

    async fn poll_once(&self, url: &str, timeout: Duration) -> Result<Vec<EnginePacket>, TransportError> {
        poll_get(&self.http, url, timeout).await
    }

    async fn post(&self, url: &str, packets: &[EnginePacket]) -> Result<(), TransportError> {
        poll_post(&self.http, url, packets).await
    }

    /// Waits for the namespace connect ack. Frames that arrive after the
    /// ack are returned so the caller can replay them.
    async fn await_namespace_ack(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Vec<EnginePacket>, TransportError> {
        let mut acked = false;
        let mut backlog = Vec::new();
        for _ in 0..ACK_POLLS {
            for packet in self.poll_once(url, timeout).await? {
                match packet {
                    EnginePacket::Message(text) => match SocketPacket::decode(&text)? {
                        SocketPacket::Connect { .. } => acked = true,
                        SocketPacket::ConnectError { message } => {
                            return Err(TransportError::Rejected(message))
                        }
                        _ if acked => backlog.push(EnginePacket::Message(text)),
                        _ => {}
                    },
                    EnginePacket::Ping(data) => {
                        self.post(url, &[EnginePacket::Pong(data)]).await?
                    }
                    EnginePacket::Close => return Err(TransportError::Closed),
                    _ => {}
                }
            }
            if acked {
                return Ok(backlog);
            }
        }
        Err(TransportError::Timeout("namespace connect ack"))
    }

    async fn upgrade(&self, sid: &str) -> Result<WsStream, TransportError> {
        let mut req = self
            .websocket_url(sid)
            .into_client_request()
            .map_err(|e| TransportError::WebSocket(e.to_string()))?;
        for (name, value) in header_map(&self.endpoint.extra_headers)?.iter() {
            req.headers_mut().insert(name.clone(), value.clone());
        }

        let (mut ws, _resp) = tokio_tungstenite::connect_async(req)
            .await
            .map_err(|e| TransportError::WebSocket(e.to_string()))?;

        ws.send(Message::Text(EnginePacket::Ping("probe".to_string()).encode()))
            .await
            .map_err(|e| TransportError::WebSocket(e.to_string()))?;

        let probe = tokio::time::timeout(PROBE_TIMEOUT, async {
            while let Some(msg) = ws.next().await {
                match msg {
                    Ok(Message::Text(t)) => return Some(t),
                    Ok(Message::Close(_)) | Err(_) => return None,
                    Ok(_) => continue,
                }
            }
            None
        })
        .await
        .map_err(|_| TransportError::Timeout("upgrade probe"))?;

        if probe.as_deref() != Some("3probe") {
            return Err(TransportError::WebSocket(format!(
                "unexpected probe reply {probe:?}"
            )));
        }

        ws.send(Message::Text(EnginePacket::Upgrade.encode()))
            .await
            .map_err(|e| TransportError::WebSocket(e.to_string()))?;
        Ok(ws)
    }

    fn polling_link(&self, url: String, timeout: Duration, backlog: Vec<EnginePacket>) -> Link {
        let (tx, rx) = mpsc::channel(64);
        let http = self.http.clone();
        let poll_url = url.clone();
        let task = tokio::spawn(async move {
            loop {
                let batch = poll_get(&http, &poll_url, timeout).await;
                let failed = batch.is_err();
                if tx.send(batch).await.is_err() || failed {
                    return;
                }
            }
        });

        Link {
            kind: TransportKind::Polling,
            reader: Box::new(PollingReader { rx, backlog, task }),
            writer: Box::new(PollingWriter {
                http: self.http.clone(),
                url,
            }),
        }
    }
}

#[async_trait]
impl Connector for SocketIoConnector {
    async fn connect(&self) -> Result<Link, TransportError> {
        let open = self
            .poll_once(&self.polling_url(None), Duration::from_secs(30))
            .await?;
        let handshake = match open.first() {
            Some(EnginePacket::Open(data)) => Handshake::parse(data)?,
            other => {
                return Err(TransportError::Handshake(format!(
                    "expected open packet, got {other:?}"
                )))
            }
        };
        debug!(sid = %handshake.sid, upgrades = ?handshake.upgrades, "engine.io handshake");

        let poll_timeout = Duration::from_millis(handshake.ping_interval + handshake.ping_timeout)
            + POLL_SLACK;
        let url = self.polling_url(Some(&handshake.sid));
        self.post(&url, &[EnginePacket::Message(SocketPacket::CONNECT.to_string())])
            .await?;
        let backlog = self.await_namespace_ack(&url, poll_timeout).await?;

        if self.endpoint.allow_upgrade && handshake.can_upgrade() {
            match self.upgrade(&handshake.sid).await {
                Ok(ws) => {
                    let (sink, stream) = ws.split();
                    return Ok(Link {
                        kind: TransportKind::WebSocket,
                        reader: Box::new(WsReader { stream, backlog }),
                        writer: Box::new(WsWriter { sink }),
                    });
                }
                Err(e) => warn!(error = %e, "websocket upgrade failed; staying on polling"),
            }
        }
        Ok(self.polling_link(url, poll_timeout, backlog))
    }
}

// ---------------------------------------------------------------------------
// Long-polling halves
// ---------------------------------------------------------------------------

async fn poll_get(
    http: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Vec<EnginePacket>, TransportError> {
    let resp = http
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| TransportError::Http(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(TransportError::Http(format!("GET {url} -> {status}")));
    }
    let body = resp
        .text()
        .await
        .map_err(|e| TransportError::Http(e.to_string()))?;
    decode_payload(&body)
}

async fn poll_post(
    http: &reqwest::Client,
    url: &str,
    packets: &[EnginePacket],
) -> Result<(), TransportError> {
    let resp = http
        .post(url)
        .header(CONTENT_TYPE, "text/plain;charset=UTF-8")
        .body(encode_payload(packets))
        .send()
        .await
        .map_err(|e| TransportError::Http(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(TransportError::Http(format!("POST {url} -> {status}")));
    }
    Ok(())
}

struct PollingReader {
    rx: mpsc::Receiver<Result<Vec<EnginePacket>, TransportError>>,
    backlog: Vec<EnginePacket>,
    task: JoinHandle<()>,
}

impl Drop for PollingReader {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[async_trait]
impl LinkReader for PollingReader {
    async fn recv(&mut self) -> Result<Option<Vec<EnginePacket>>, TransportError> {
        if !self.backlog.is_empty() {
            return Ok(Some(std::mem::take(&mut self.backlog)));
        }
        match self.rx.recv().await {
            Some(batch) => batch.map(Some),
            None => Ok(None),
        }
    }
}

struct PollingWriter {
    http: reqwest::Client,
    url: String,
}

#[async_trait]
impl LinkWriter for PollingWriter {
    async fn send(&mut self, packets: Vec<EnginePacket>) -> Result<(), TransportError> {
        poll_post(&self.http, &self.url, &packets).await
    }
}

// ---------------------------------------------------------------------------
// Websocket halves
// ---------------------------------------------------------------------------

struct WsReader {
    stream: SplitStream<WsStream>,
    backlog: Vec<EnginePacket>,
}

#[async_trait]
impl LinkReader for WsReader {
    async fn recv(&mut self) -> Result<Option<Vec<EnginePacket>>, TransportError> {
        if !self.backlog.is_empty() {
            return Ok(Some(std::mem::take(&mut self.backlog)));
        }
        loop {
            match self.stream.next().await {
                None | Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Err(e)) => return Err(TransportError::WebSocket(e.to_string())),
                Some(Ok(Message::Text(text))) => {
                    return match EnginePacket::decode(&text) {
                        Ok(packet) => Ok(Some(vec![packet])),
                        Err(e) => {
                            debug!(error = %e, "dropping undecodable frame");
                            Ok(Some(Vec::new()))
                        }
                    }
                }
                // Control and binary frames.
                Some(Ok(_)) => continue,
            }
        }
    }
}

struct WsWriter {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl LinkWriter for WsWriter {
    async fn send(&mut self, packets: Vec<EnginePacket>) -> Result<(), TransportError> {
        for packet in packets {
            self.sink
                .send(Message::Text(packet.encode()))
                .await
                .map_err(|e| TransportError::WebSocket(e.to_string()))?;
        }
        Ok(())
    }
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::new();
    for (k, v) in headers {
        let name = HeaderName::from_bytes(k.as_bytes())
            .map_err(|e| TransportError::Handshake(format!("header {k}: {e}")))?;
        let value = HeaderValue::from_str(v)
            .map_err(|e| TransportError::Handshake(format!("header {k}: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}
