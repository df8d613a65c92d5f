//! Shared runtime state for sf-api.
//!
//! All types here are `Clone`-able (via `Arc` or copy).  Handlers receive
//! `State<Arc<AppState>>` from Axum; this module owns nothing async itself
//! beyond the price-cache lock.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use sf_config::AppConfig;
use sf_ledger::{money, PriceMap};
use sf_store::load_price_file;

// ---------------------------------------------------------------------------
// BusMsg — SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    PricesRefreshed { symbols: usize },
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Cloneable (Arc) handle shared across all Axum handlers.
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    /// Static build metadata.
    pub build: BuildInfo,
    /// Root directory holding per-actor snapshot directories.
    pub data_dir: PathBuf,
    /// Price-cache file; reloaded on POST /v1/prices/refresh.
    pub prices_path: PathBuf,
    /// Period allocation used for return rates and rankings.
    pub initial_cash_micros: i64,
    /// In-memory price cache (symbol -> price_micros).
    pub prices: RwLock<PriceMap>,
}

impl AppState {
    /// Build state from config; the price cache is primed from the price
    /// file if it exists (missing file = empty cache).
    pub fn new(cfg: &AppConfig) -> Result<Self> {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        let prices_path = PathBuf::from(&cfg.prices_path);
        let prices = load_price_file(&prices_path)?;

        Ok(Self {
            bus,
            build: BuildInfo {
                service: "sf-api",
                version: env!("CARGO_PKG_VERSION"),
            },
            data_dir: PathBuf::from(&cfg.data_dir),
            prices_path,
            initial_cash_micros: money::units_to_micros(cfg.initial_cash)
                .context("initial_cash not representable")?,
            prices: RwLock::new(prices),
        })
    }

    /// Reload the price file into the cache; returns the new symbol count.
    pub async fn refresh_prices(&self) -> Result<usize> {
        let fresh = load_price_file(&self.prices_path)?;
        let count = fresh.len();
        *self.prices.write().await = fresh;
        let _ = self.bus.send(BusMsg::PricesRefreshed { symbols: count });
        Ok(count)
    }

    /// Actors that have a snapshot on disk, in deterministic order.
    pub fn list_actors(&self) -> Vec<Uuid> {
        let Ok(entries) = std::fs::read_dir(&self.data_dir) else {
            return Vec::new();
        };
        let mut actors: Vec<Uuid> = entries
            .flatten()
            .filter_map(|e| e.file_name().to_str().and_then(|n| Uuid::parse_str(n).ok()))
            .filter(|id| {
                self.data_dir
                    .join(id.to_string())
                    .join("snapshot.json")
                    .exists()
            })
            .collect();
        actors.sort();
        actors
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
