//! Axum router and all HTTP handlers for nhd-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers.  All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use nhd_runtime::SessionCommand;
use nhd_transport::{ControlCommand, RiskSettings};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::{
    api_types::{
        ClosePositionRequest, CommandResponse, EquityResponse, ErrorResponse, HealthResponse,
        HistoryResponse, LogsQuery, LogsResponse, OrdersResponse, PositionsResponse,
    },
    state::{AppState, BusMsg, StatusSnapshot},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/snapshot", get(snapshot))
        .route("/v1/positions", get(positions))
        .route("/v1/orders", get(orders))
        .route("/v1/history", get(history))
        .route("/v1/logs", get(logs))
        .route("/v1/equity", get(equity))
        .route("/v1/analytics", get(analytics))
        .route("/v1/stream", get(stream))
        .route("/v1/bridge/reconnect", post(bridge_reconnect))
        .route("/v1/history/clear", post(history_clear))
        .route("/v1/logs/clear", post(logs_clear))
        .route("/v1/engine/start", post(engine_start))
        .route("/v1/engine/stop", post(engine_stop))
        .route("/v1/engine/panic", post(engine_panic))
        .route("/v1/positions/close", post(position_close))
        .route("/v1/risk", post(risk_update))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// Read APIs
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = StatusSnapshot::from_snapshot(&st.snapshot());
    let _ = st.bus.send(BusMsg::Status(snap.clone()));
    (StatusCode::OK, Json(snap))
}

pub(crate) async fn snapshot(State(st): State<Arc<AppState>>) -> Response {
    let snap = st.snapshot();
    (StatusCode::OK, Json(&*snap)).into_response()
}

pub(crate) async fn positions(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = st.snapshot();
    Json(PositionsResponse {
        connected: snap.link.connected,
        positions: snap.active.clone(),
        summary: snap.summary.clone(),
    })
}

pub(crate) async fn orders(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = st.snapshot();
    Json(OrdersResponse {
        connected: snap.link.connected,
        orders: snap.pending.clone(),
    })
}

pub(crate) async fn history(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = st.snapshot();
    Json(HistoryResponse {
        count: snap.history.len(),
        records: snap.history.to_vec(),
    })
}

pub(crate) async fn logs(
    State(st): State<Arc<AppState>>,
    Query(q): Query<LogsQuery>,
) -> impl IntoResponse {
    let snap = st.snapshot();
    let logs = if q.execution {
        snap.execution_logs()
    } else {
        snap.logs.to_vec()
    };
    Json(LogsResponse {
        count: logs.len(),
        logs,
    })
}

/// Performance figures over the filled history.
pub(crate) async fn analytics(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    Json(st.snapshot().stats.clone())
}

pub(crate) async fn equity(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = st.snapshot();
    Json(EquityResponse {
        latest: snap.equity.last().copied(),
        samples: snap.equity.clone(),
    })
}

// ---------------------------------------------------------------------------
// Control passthrough
// ---------------------------------------------------------------------------

fn dispatch(st: &AppState, name: &str, cmd: SessionCommand) -> Response {
    if !st.send(cmd) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "session stopped".to_string(),
            }),
        )
            .into_response();
    }
    info!(command = name, "control command accepted");
    (
        StatusCode::ACCEPTED,
        Json(CommandResponse {
            accepted: true,
            command: name.to_string(),
        }),
    )
        .into_response()
}

pub(crate) async fn bridge_reconnect(State(st): State<Arc<AppState>>) -> Response {
    dispatch(&st, "hard_reconnect", SessionCommand::HardReconnect)
}

pub(crate) async fn history_clear(State(st): State<Arc<AppState>>) -> Response {
    dispatch(&st, "clear_history", SessionCommand::ClearHistory)
}

pub(crate) async fn logs_clear(State(st): State<Arc<AppState>>) -> Response {
    dispatch(&st, "clear_logs", SessionCommand::ClearLogs)
}

pub(crate) async fn engine_start(State(st): State<Arc<AppState>>) -> Response {
    let cmd = ControlCommand::StartEngine;
    dispatch(&st, cmd.event_name(), SessionCommand::Control(cmd))
}

pub(crate) async fn engine_stop(State(st): State<Arc<AppState>>) -> Response {
    let cmd = ControlCommand::StopEngine;
    dispatch(&st, cmd.event_name(), SessionCommand::Control(cmd))
}

pub(crate) async fn engine_panic(State(st): State<Arc<AppState>>) -> Response {
    dispatch(&st, "panic", SessionCommand::Panic)
}

pub(crate) async fn position_close(
    State(st): State<Arc<AppState>>,
    Json(req): Json<ClosePositionRequest>,
) -> Response {
    if req.symbol.is_none() && req.ticket.is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "symbol or ticket required".to_string(),
            }),
        )
            .into_response();
    }
    let cmd = ControlCommand::ClosePosition {
        symbol: req.symbol,
        ticket: req.ticket,
    };
    dispatch(&st, cmd.event_name(), SessionCommand::Control(cmd))
}

pub(crate) async fn risk_update(
    State(st): State<Arc<AppState>>,
    Json(risk): Json<RiskSettings>,
) -> Response {
    let cmd = ControlCommand::UpdateRisk(risk);
    dispatch(&st, cmd.event_name(), SessionCommand::Control(cmd))
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(m.event_name()).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
