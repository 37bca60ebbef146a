use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nhd_schemas::{ClosedTradeRecord, LogEntry};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::latest::Latest;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    /// Remote sync turned off in config.
    Disabled,
    /// Non-2xx response.
    Http { endpoint: String, status: u16 },
    /// Connection, TLS or timeout failure.
    Transport(String),
    /// Response body was not a JSON array.
    Decode(String),
}

impl fmt::Display for MirrorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "remote sync disabled"),
            Self::Http { endpoint, status } => write!(f, "{endpoint} returned HTTP {status}"),
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Decode(e) => write!(f, "decode error: {e}"),
        }
    }
}

impl std::error::Error for MirrorError {}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Remote copy of the ledgers.
#[async_trait]
pub trait RemoteMirror: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_history(&self) -> Result<Vec<ClosedTradeRecord>, MirrorError>;

    async fn fetch_logs(&self) -> Result<Vec<LogEntry>, MirrorError>;

    /// Replace the remote history with the full local array.
    async fn push_history(&self, records: &[ClosedTradeRecord]) -> Result<(), MirrorError>;
}

/// Ordered, fire-and-forget history pushes.
///
/// A single task owns the mirror and POSTs one array at a time. An array
/// still waiting when a newer one is pushed is dropped, so the remote copy
/// never moves backwards. Failures are logged and never surface.
pub struct HistoryMirror {
    queue: Latest<Vec<ClosedTradeRecord>>,
}

impl HistoryMirror {
    pub fn spawn(mirror: Arc<dyn RemoteMirror>) -> Self {
        let queue = Latest::spawn(move |records: Arc<Vec<ClosedTradeRecord>>| {
            let mirror = Arc::clone(&mirror);
            async move {
                match mirror.push_history(&records).await {
                    Ok(()) => debug!(mirror = mirror.name(), n = records.len(), "history mirrored"),
                    Err(MirrorError::Disabled) => {}
                    Err(e) => warn!(mirror = mirror.name(), error = %e, "history mirror failed"),
                }
            }
        });
        Self { queue }
    }

    pub fn push(&self, records: Vec<ClosedTradeRecord>) {
        self.queue.submit(records);
    }

    /// Waits until the newest pushed array has been attempted.
    pub async fn settled(&self) {
        self.queue.settled().await;
    }
}

// ---------------------------------------------------------------------------
// NullMirror
// ---------------------------------------------------------------------------

/// Mirror used when remote sync is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMirror;

#[async_trait]
impl RemoteMirror for NullMirror {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn fetch_history(&self) -> Result<Vec<ClosedTradeRecord>, MirrorError> {
        Err(MirrorError::Disabled)
    }

    async fn fetch_logs(&self) -> Result<Vec<LogEntry>, MirrorError> {
        Err(MirrorError::Disabled)
    }

    async fn push_history(&self, _records: &[ClosedTradeRecord]) -> Result<(), MirrorError> {
        Err(MirrorError::Disabled)
    }
}

// ---------------------------------------------------------------------------
// HttpMirror
// ---------------------------------------------------------------------------

/// Bridge HTTP endpoints: `GET/POST {base}/api/history`, `GET {base}/api/logs`.
#[derive(Debug, Clone)]
pub struct HttpMirror {
    http: reqwest::Client,
    base_url: String,
}

impl HttpMirror {
    /// `extra_headers` ride on every request. Invalid header names or values
    /// are skipped with a warning.
    pub fn new(base_url: &str, extra_headers: &BTreeMap<String, String>) -> Result<Self, MirrorError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(header_map(extra_headers))
            .build()
            .map_err(|e| MirrorError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_array<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, MirrorError> {
        let url = self.endpoint(path);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MirrorError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MirrorError::Http {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| MirrorError::Decode(e.to_string()))?;
        let Value::Array(items) = body else {
            return Err(MirrorError::Decode(format!("{path} did not return an array")));
        };

        // Element-wise so one malformed record does not discard the rest.
        Ok(items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect())
    }
}

#[async_trait]
impl RemoteMirror for HttpMirror {
    fn name(&self) -> &'static str {
        "bridge-http"
    }

    async fn fetch_history(&self) -> Result<Vec<ClosedTradeRecord>, MirrorError> {
        self.get_array("/api/history").await
    }

    async fn fetch_logs(&self) -> Result<Vec<LogEntry>, MirrorError> {
        self.get_array("/api/logs").await
    }

    async fn push_history(&self, records: &[ClosedTradeRecord]) -> Result<(), MirrorError> {
        let resp = self
            .http
            .post(self.endpoint("/api/history"))
            .json(records)
            .send()
            .await
            .map_err(|e| MirrorError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(MirrorError::Http {
                endpoint: "/api/history".to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

fn header_map(extra: &BTreeMap<String, String>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (k, v) in extra {
        match (
            HeaderName::from_bytes(k.as_bytes()),
            HeaderValue::from_str(v),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %k, "skipping invalid extra header"),
        }
    }
    headers
}
