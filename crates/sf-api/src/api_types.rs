//! Request and response types for all sf-api HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded by
//! Axum and decoded by tests.  Monetary fields are unit amounts (`f64`,
//! converted from micros at this boundary only); no business logic lives here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sf_ledger::{RankingEntry, TradeStats};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// /v1/status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub uptime_secs: u64,
    /// Actors with a snapshot on disk.
    pub actors: usize,
    /// Symbols currently present in the price cache.
    pub priced_symbols: usize,
}

// ---------------------------------------------------------------------------
// Error body (404 etc.)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// /v1/portfolio/{actor_id}
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingView {
    pub symbol: String,
    pub qty: f64,
    pub avg_cost: f64,
    pub market_value: f64,
    pub unrealized_gain: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioResponse {
    pub actor_id: Uuid,
    pub cash: f64,
    pub market_value: f64,
    pub total_value: f64,
    pub unrealized_gain: f64,
    pub return_rate_pct: f64,
    pub trade_count: usize,
    pub holdings: Vec<HoldingView>,
}

// ---------------------------------------------------------------------------
// /v1/portfolio/{actor_id}/stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub actor_id: Uuid,
    pub stats: TradeStats,
}

// ---------------------------------------------------------------------------
// /v1/rankings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingsResponse {
    pub entries: Vec<RankingEntry>,
}

// ---------------------------------------------------------------------------
// /v1/prices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricesResponse {
    /// symbol -> unit price
    pub prices: BTreeMap<String, f64>,
}
