//! sf-ledger
//!
//! Virtual-portfolio ledger core:
//! - cash balance + holdings per actor, weighted-average cost basis
//! - append-only trade log as the single source of truth for statistics
//! - realized gain/loss locked in on sells against the average cost
//! - mark-to-market valuation against a caller-supplied price map
//! - deterministic leaderboard computation
//! - mutex-serialized service wrapper with a best-effort persistence seam
//!
//! Arithmetic is integer micros end to end (no floats in the accounting
//! path); time and ids are stamped only at the trade-record boundary.

mod accounting;
mod stats;
mod types;

pub mod ledger;
pub mod metrics;
pub mod money;
pub mod rankings;
pub mod service;

pub use accounting::{apply_record, recompute_from_trades};
pub use ledger::{Ledger, LedgerError};
pub use metrics::{
    compute_market_value_micros, compute_total_value_micros, compute_unrealized_gain_micros,
    compute_valuation, return_rate_pct, ValuationMetrics,
};
pub use rankings::{compute_rankings, RankingEntry};
pub use service::{PortfolioService, SnapshotStore, StoreError};
pub use stats::{compute_stats, TradeStats};
pub use types::{Holding, LedgerState, TradeRecord, TradeSide};

use std::collections::BTreeMap;

/// Price/cash scale: micros (1e-6).
pub const MICROS_SCALE: i64 = money::MICROS_PER_UNIT;

/// Cash allocation granted to every actor at the start of a period.
pub const DEFAULT_INITIAL_CASH_MICROS: i64 = 1_000_000 * MICROS_SCALE;

/// Canonical price map type (symbol -> price_micros).
pub type PriceMap = BTreeMap<String, i64>;

/// Helper to build a PriceMap with minimal boilerplate.
pub fn prices<I, S>(items: I) -> PriceMap
where
    I: IntoIterator<Item = (S, i64)>,
    S: Into<String>,
{
    let mut m = PriceMap::new();
    for (sym, px) in items {
        m.insert(sym.into(), px);
    }
    m
}
