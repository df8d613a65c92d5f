use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::mul_qty_price_micros;

/// BUY or SELL for executed trades.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }

    pub fn is_sell(&self) -> bool {
        matches!(self, TradeSide::Sell)
    }
}

/// A position in one symbol: share quantity plus weighted-average cost.
///
/// qty_micros is micro-shares (1 share = 1_000_000); always > 0 while the
/// holding is present in the map — a holding that reaches zero is removed.
/// avg_cost_micros is recomputed on buys only; sells carry the basis out
/// unchanged on the remaining shares.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub qty_micros: i64,
    pub avg_cost_micros: i64,
}

impl Holding {
    pub fn new<S: Into<String>>(symbol: S, qty_micros: i64, avg_cost_micros: i64) -> Self {
        debug_assert!(qty_micros > 0, "Holding.qty_micros must be > 0");
        debug_assert!(avg_cost_micros >= 0, "Holding.avg_cost_micros must be >= 0");
        Self {
            symbol: symbol.into(),
            qty_micros,
            avg_cost_micros,
        }
    }

    /// Cost basis of the full position: `qty × avg_cost`.
    pub fn cost_basis_micros(&self) -> i64 {
        mul_qty_price_micros(self.qty_micros, self.avg_cost_micros)
    }

    /// Mark-to-market value at the given price.
    pub fn market_value_micros(&self, price_micros: i64) -> i64 {
        mul_qty_price_micros(self.qty_micros, price_micros)
    }

    /// Unrealized gain/loss at the given price: `(price − avg_cost) × qty`.
    pub fn unrealized_gain_micros(&self, price_micros: i64) -> i64 {
        self.market_value_micros(price_micros)
            .saturating_sub(self.cost_basis_micros())
    }
}

/// Immutable record of one executed buy or sell — the audit atom.
///
/// Appended on every successful mutation, never mutated or deleted; all
/// statistics are derived from the record stream on demand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: Uuid,
    pub ts_utc: DateTime<Utc>,
    pub symbol: String,
    pub side: TradeSide,
    pub qty_micros: i64,
    pub price_micros: i64,
    pub fee_micros: i64,
    /// Cash moved by this trade: `qty×price + fee` for buys (debit),
    /// `qty×price − fee` for sells (credit).
    pub total_micros: i64,
    /// Sell only: the holding's average cost at the moment of sale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_cost_at_sale_micros: Option<i64>,
    /// Sell only: `proceeds − cost basis` of the shares sold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realized_gain_micros: Option<i64>,
    /// Sell only: realized gain as a percentage of the cost basis sold
    /// (0 when the basis is zero).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realized_gain_pct: Option<f64>,
}

impl TradeRecord {
    /// `true` if this is a sell that locked in a positive gain.
    pub fn is_winning_sell(&self) -> bool {
        self.side.is_sell() && self.realized_gain_micros.map(|g| g > 0).unwrap_or(false)
    }
}

/// Full ledger state for one actor — the persisted snapshot shape.
///
/// `trades` is the permanent audit trail; a period reset never truncates it.
/// `period_start` marks where the current competition period begins in the
/// log, so replay integrity and period views both survive resets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Cash allocation granted at the start of the current period.
    pub initial_cash_micros: i64,
    pub cash_micros: i64,
    pub holdings: BTreeMap<String, Holding>,
    pub trades: Vec<TradeRecord>,
    #[serde(default)]
    pub period_start: usize,
}

impl LedgerState {
    pub fn new(initial_cash_micros: i64) -> Self {
        Self {
            initial_cash_micros,
            cash_micros: initial_cash_micros,
            holdings: BTreeMap::new(),
            trades: Vec::new(),
            period_start: 0,
        }
    }

    /// Trades executed in the current period (suffix of the full log).
    pub fn period_trades(&self) -> &[TradeRecord] {
        &self.trades[self.period_start.min(self.trades.len())..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Ledger, MICROS_SCALE};

    const M: i64 = MICROS_SCALE;

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut ledger = Ledger::new(100_000 * M);
        ledger.buy("AAPL", 10 * M, 150 * M, M).unwrap();
        ledger.sell("AAPL", 4 * M, 180 * M, 0).unwrap();
        ledger.reset_period(50_000 * M);
        ledger.buy("TSLA", 2 * M, 250 * M, 0).unwrap();

        let snapshot = ledger.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: LedgerState = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, snapshot);
        assert_eq!(restored.period_start, 2);
        assert!(Ledger::from_state(restored).verify_integrity());
    }

    #[test]
    fn period_start_beyond_log_yields_empty_window() {
        let mut state = LedgerState::new(1_000 * M);
        state.period_start = 5;
        assert!(state.period_trades().is_empty());
    }
}
