//! nhd-daemon entry point.
//!
//! Thin: sets up tracing, resolves configuration, starts the dashboard
//! session, wires middleware, and serves HTTP. Handlers live in `routes.rs`;
//! shared state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use nhd_config::EnvOverrides;
use nhd_daemon::{routes, state};
use nhd_runtime::{DashboardSession, SessionCommand};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let (loaded, cfg) = EnvOverrides::from_env()
        .resolve()
        .context("configuration")?;
    info!(config_hash = %loaded.config_hash, api = cfg.api_base(), "configuration loaded");

    let (session, control, snapshots) = DashboardSession::from_config(&cfg).await?;
    let runner = tokio::spawn(session.run());

    let shared = Arc::new(state::AppState::new(snapshots, control.clone()));
    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));
    state::spawn_snapshot_forwarder(Arc::clone(&shared));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr: SocketAddr = cfg
        .daemon
        .addr
        .parse()
        .with_context(|| format!("invalid daemon.addr {:?}", cfg.daemon.addr))?;
    info!("nhd-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server crashed")?;

    control.send(SessionCommand::Shutdown);
    let _ = runner.await;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
