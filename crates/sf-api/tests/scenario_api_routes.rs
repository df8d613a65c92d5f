//! In-process scenario tests for sf-api HTTP endpoints.
//!
//! These tests spin up the Axum router **without** binding a TCP socket.
//! Each test calls `routes::build_router` and drives it via
//! `tower::ServiceExt::oneshot` — no network I/O required.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sf_api::{routes, state};
use sf_config::AppConfig;
use sf_ledger::{PortfolioService, MICROS_SCALE};
use sf_store::LocalStore;
use tower::ServiceExt; // oneshot
use uuid::Uuid;

const M: i64 = MICROS_SCALE;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a config rooted at a temp directory, with a seeded price file.
fn make_config(root: &std::path::Path) -> AppConfig {
    let prices_path = root.join("prices.json");
    std::fs::write(&prices_path, r#"{"AAPL": 200.0, "TSLA": 300.0}"#).unwrap();

    AppConfig {
        data_dir: root.join("data").to_string_lossy().into_owned(),
        prices_path: prices_path.to_string_lossy().into_owned(),
        initial_cash: 100_000.0,
        ..AppConfig::default()
    }
}

/// Seed one actor's portfolio on disk and return its id.
fn seed_actor(cfg: &AppConfig) -> Uuid {
    let actor = Uuid::new_v4();
    let store = Arc::new(LocalStore::open(&cfg.data_dir, actor).unwrap());
    let svc = PortfolioService::with_store(actor, 100_000 * M, store);
    svc.buy("AAPL", 10 * M, 150 * M, 0).unwrap();
    svc.sell("AAPL", 5 * M, 180 * M, 0).unwrap();
    actor
}

fn make_router(cfg: &AppConfig) -> axum::Router {
    let st = Arc::new(state::AppState::new(cfg).unwrap());
    routes::build_router(st)
}

/// Drive the router with a single request and return (status, body_bytes).
async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let tmp = tempfile::tempdir().unwrap();
    let router = make_router(&make_config(tmp.path()));

    let (status, body) = call(router, get("/v1/health")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "sf-api");
}

// ---------------------------------------------------------------------------
// GET /v1/portfolio/{actor_id}
// ---------------------------------------------------------------------------

#[tokio::test]
async fn portfolio_marks_holdings_at_cached_prices() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = make_config(tmp.path());
    let actor = seed_actor(&cfg);
    let router = make_router(&cfg);

    let (status, body) = call(router, get(&format!("/v1/portfolio/{actor}"))).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    // cash = 100,000 - 1,500 + 900 = 99,400
    assert_eq!(json["cash"], 99_400.0);
    // 5 AAPL remaining, marked at the cached $200
    assert_eq!(json["market_value"], 1_000.0);
    assert_eq!(json["total_value"], 100_400.0);
    assert_eq!(json["trade_count"], 2);
    assert_eq!(json["holdings"][0]["symbol"], "AAPL");
    assert_eq!(json["holdings"][0]["qty"], 5.0);
    assert_eq!(json["holdings"][0]["avg_cost"], 150.0);
}

#[tokio::test]
async fn unknown_actor_returns_404_with_error_body() {
    let tmp = tempfile::tempdir().unwrap();
    let router = make_router(&make_config(tmp.path()));

    let (status, body) = call(router, get(&format!("/v1/portfolio/{}", Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(parse_json(body)["error"]
        .as_str()
        .unwrap()
        .contains("no portfolio"));
}

// ---------------------------------------------------------------------------
// GET /v1/portfolio/{actor_id}/stats
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stats_derive_from_the_trade_log() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = make_config(tmp.path());
    let actor = seed_actor(&cfg);
    let router = make_router(&cfg);

    let (status, body) = call(router, get(&format!("/v1/portfolio/{actor}/stats"))).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["stats"]["total_trades"], 2);
    assert_eq!(json["stats"]["buy_trades"], 1);
    assert_eq!(json["stats"]["sell_trades"], 1);
    assert_eq!(json["stats"]["winning_sells"], 1);
    assert_eq!(json["stats"]["win_rate"], 1.0);
}

// ---------------------------------------------------------------------------
// GET /v1/rankings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rankings_cover_all_seeded_actors() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = make_config(tmp.path());
    let a = seed_actor(&cfg);
    let b = seed_actor(&cfg);
    let router = make_router(&cfg);

    let (status, body) = call(router, get("/v1/rankings")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    let entries = json["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    // identical trade histories -> identical totals -> shared rank 1
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(entries[1]["rank"], 1);
    let ids: Vec<String> = entries
        .iter()
        .map(|e| e["actor_id"].as_str().unwrap().to_string())
        .collect();
    assert!(ids.contains(&a.to_string()));
    assert!(ids.contains(&b.to_string()));
}

#[tokio::test]
async fn rankings_empty_when_no_actors_exist() {
    let tmp = tempfile::tempdir().unwrap();
    let router = make_router(&make_config(tmp.path()));

    let (status, body) = call(router, get("/v1/rankings")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["entries"].as_array().unwrap().len(), 0);
}

// ---------------------------------------------------------------------------
// GET /v1/prices  /  POST /v1/prices/refresh
// ---------------------------------------------------------------------------

#[tokio::test]
async fn prices_refresh_picks_up_file_changes() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = make_config(tmp.path());
    let router = make_router(&cfg);

    let (status, body) = call(router.clone(), get("/v1/prices")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["prices"]["AAPL"], 200.0);

    // The cache holds until an explicit refresh.
    std::fs::write(&cfg.prices_path, r#"{"AAPL": 250.0}"#).unwrap();
    let (status, body) = call(router.clone(), get("/v1/prices")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["prices"]["AAPL"], 200.0);

    let refresh = Request::builder()
        .method("POST")
        .uri("/v1/prices/refresh")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = call(router.clone(), refresh).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["prices"]["AAPL"], 250.0);
    assert!(json["prices"].get("TSLA").is_none());
}
