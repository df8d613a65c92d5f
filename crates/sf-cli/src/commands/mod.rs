//! Subcommand implementations.  `CliCtx` carries the effective config and
//! the resolved actor; each module opens stores and services through it.

pub mod db;
pub mod export;
pub mod portfolio;
pub mod prices;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use uuid::Uuid;

use sf_config::{AppConfig, LoadedConfig};
use sf_ledger::{money, PortfolioService, PriceMap};
use sf_store::LocalStore;

pub struct CliCtx {
    pub cfg: AppConfig,
    pub loaded: LoadedConfig,
    pub actor: Option<Uuid>,
}

impl CliCtx {
    pub fn new(cfg: AppConfig, loaded: LoadedConfig, actor: Option<Uuid>) -> Self {
        Self { cfg, loaded, actor }
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.cfg.data_dir)
    }

    pub fn prices_path(&self) -> PathBuf {
        PathBuf::from(&self.cfg.prices_path)
    }

    pub fn initial_cash_micros(&self) -> Result<i64> {
        money::units_to_micros(self.cfg.initial_cash).context("initial_cash not representable")
    }

    /// Open the resolved actor's store-backed service.
    pub fn service(&self) -> Result<PortfolioService> {
        let actor = crate::require_actor(self.actor)?;
        let store = Arc::new(LocalStore::open(self.data_dir(), actor)?);
        Ok(PortfolioService::with_store(
            actor,
            self.initial_cash_micros()?,
            store,
        ))
    }

    /// Current price cache (cold cache = empty map).
    pub fn price_map(&self) -> Result<PriceMap> {
        sf_store::load_price_file(&self.prices_path())
    }

    /// Actors that have a snapshot under the data dir, in deterministic order.
    pub fn list_actors(&self) -> Vec<Uuid> {
        let Ok(entries) = std::fs::read_dir(self.data_dir()) else {
            return Vec::new();
        };
        let mut actors: Vec<Uuid> = entries
            .flatten()
            .filter_map(|e| e.file_name().to_str().and_then(|n| Uuid::parse_str(n).ok()))
            .filter(|id| {
                self.data_dir()
                    .join(id.to_string())
                    .join("snapshot.json")
                    .exists()
            })
            .collect();
        actors.sort();
        actors
    }
}
