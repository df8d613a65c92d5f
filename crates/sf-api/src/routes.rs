//! Axum router and all HTTP handlers for sf-api.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers.  All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.
//!
//! Every endpoint is read-only over the locally persisted snapshots; the
//! mutation surface (buy/sell/reset) is in-process via `sf-ledger` and the
//! CLI, never HTTP.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;
use uuid::Uuid;

use sf_ledger::{compute_rankings, compute_stats, compute_valuation, money, return_rate_pct};
use sf_store::LocalStore;

use crate::{
    api_types::{
        ErrorResponse, HealthResponse, HoldingView, PortfolioResponse, PricesResponse,
        RankingsResponse, StatsResponse, StatusResponse,
    },
    state::{uptime_secs, AppState},
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
        .route("/v1/portfolio/:actor_id", get(portfolio))
        .route("/v1/portfolio/:actor_id/stats", get(portfolio_stats))
        .route("/v1/rankings", get(rankings))
        .route("/v1/prices", get(prices_handler))
        .route("/v1/prices/refresh", post(prices_refresh))
        .route("/v1/stream", get(stream))
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
// GET /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let priced_symbols = st.prices.read().await.len();
    (
        StatusCode::OK,
        Json(StatusResponse {
            uptime_secs: uptime_secs(),
            actors: st.list_actors().len(),
            priced_symbols,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/portfolio/{actor_id}
// ---------------------------------------------------------------------------

pub(crate) async fn portfolio(
    State(st): State<Arc<AppState>>,
    Path(actor_id): Path<Uuid>,
) -> Response {
    let Some(snapshot) = load_snapshot(&st, actor_id) else {
        return not_found(actor_id);
    };

    let prices = st.prices.read().await;
    let valuation = compute_valuation(snapshot.cash_micros, &snapshot.holdings, &prices);

    let holdings = snapshot
        .holdings
        .values()
        .map(|h| {
            let mark = *prices.get(&h.symbol).unwrap_or(&h.avg_cost_micros);
            HoldingView {
                symbol: h.symbol.clone(),
                qty: money::micros_to_units(h.qty_micros),
                avg_cost: money::micros_to_units(h.avg_cost_micros),
                market_value: money::micros_to_units(h.market_value_micros(mark)),
                unrealized_gain: money::micros_to_units(h.unrealized_gain_micros(mark)),
            }
        })
        .collect();

    let body = PortfolioResponse {
        actor_id,
        cash: money::micros_to_units(valuation.cash_micros),
        market_value: money::micros_to_units(valuation.market_value_micros),
        total_value: money::micros_to_units(valuation.total_value_micros),
        unrealized_gain: money::micros_to_units(valuation.unrealized_gain_micros),
        return_rate_pct: return_rate_pct(
            valuation.total_value_micros,
            snapshot.initial_cash_micros,
        ),
        trade_count: snapshot.trades.len(),
        holdings,
    };
    (StatusCode::OK, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/portfolio/{actor_id}/stats
// ---------------------------------------------------------------------------

pub(crate) async fn portfolio_stats(
    State(st): State<Arc<AppState>>,
    Path(actor_id): Path<Uuid>,
) -> Response {
    let Some(snapshot) = load_snapshot(&st, actor_id) else {
        return not_found(actor_id);
    };

    let body = StatsResponse {
        actor_id,
        stats: compute_stats(&snapshot.trades),
    };
    (StatusCode::OK, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/rankings
// ---------------------------------------------------------------------------

pub(crate) async fn rankings(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let prices = st.prices.read().await;

    let totals: Vec<(Uuid, i64)> = st
        .list_actors()
        .into_iter()
        .filter_map(|actor_id| {
            load_snapshot(&st, actor_id).map(|snap| {
                let valuation = compute_valuation(snap.cash_micros, &snap.holdings, &prices);
                (actor_id, valuation.total_value_micros)
            })
        })
        .collect();

    let entries = compute_rankings(&totals, st.initial_cash_micros);
    (StatusCode::OK, Json(RankingsResponse { entries }))
}

// ---------------------------------------------------------------------------
// GET /v1/prices  /  POST /v1/prices/refresh
// ---------------------------------------------------------------------------

pub(crate) async fn prices_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let prices = st.prices.read().await;
    (StatusCode::OK, Json(to_prices_response(&prices)))
}

pub(crate) async fn prices_refresh(State(st): State<Arc<AppState>>) -> Response {
    match st.refresh_prices().await {
        Ok(symbols) => {
            info!(symbols, "price cache refreshed");
            let prices = st.prices.read().await;
            (StatusCode::OK, Json(to_prices_response(&prices))).into_response()
        }
        Err(err) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: format!("price refresh failed: {err:#}"),
            }),
        )
            .into_response(),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/stream — SSE
// ---------------------------------------------------------------------------

pub(crate) async fn stream(
    State(st): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = st.bus.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| async move {
        let msg = msg.ok()?;
        let event = Event::default()
            .json_data(&msg)
            .unwrap_or_else(|_| Event::default().data("serialization error"));
        Some(Ok(event))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_snapshot(st: &AppState, actor_id: Uuid) -> Option<sf_ledger::LedgerState> {
    // Probe before open: LocalStore::open creates the actor directory, and a
    // GET for an unknown actor must not leave one behind.
    if !st
        .data_dir
        .join(actor_id.to_string())
        .join("snapshot.json")
        .exists()
    {
        return None;
    }
    let store = LocalStore::open(&st.data_dir, actor_id).ok()?;
    store.load_snapshot().ok().flatten()
}

fn not_found(actor_id: Uuid) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("no portfolio for actor {actor_id}"),
        }),
    )
        .into_response()
}

fn to_prices_response(prices: &sf_ledger::PriceMap) -> PricesResponse {
    PricesResponse {
        prices: prices
            .iter()
            .map(|(sym, px)| (sym.clone(), money::micros_to_units(*px)))
            .collect(),
    }
}
