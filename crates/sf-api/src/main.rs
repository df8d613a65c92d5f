//! sf-api entry point.
//!
//! This file is intentionally thin: it sets up tracing, builds the shared
//! state, wires middleware, and starts the HTTP server.  All route handlers
//! live in `routes.rs`; all shared state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use sf_api::{routes, state};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience).  Silent if the file does
    // not exist — production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let (cfg, loaded) = sf_config::AppConfig::load(&config_paths_from_env()?)?;
    info!(config_hash = %loaded.config_hash, "effective config loaded");

    let shared = Arc::new(state::AppState::new(&cfg)?);

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr: SocketAddr = cfg
        .api
        .bind_addr
        .parse()
        .with_context(|| format!("invalid api.bind_addr: {}", cfg.api.bind_addr))?;
    info!("sf-api listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Config layer paths from SF_CONFIG (colon-separated, merge order).
fn config_paths_from_env() -> anyhow::Result<Vec<&'static str>> {
    match std::env::var("SF_CONFIG") {
        Ok(raw) => {
            // Paths live for the process lifetime; leak once at startup.
            let leaked: &'static str = Box::leak(raw.into_boxed_str());
            Ok(leaked.split(':').filter(|p| !p.is_empty()).collect())
        }
        Err(_) => Ok(Vec::new()),
    }
}

fn cors_localhost_only() -> CorsLayer {
    CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:5173"),
            HeaderValue::from_static("http://127.0.0.1:5173"),
        ])
        .allow_methods([Method::GET, Method::POST])
}
