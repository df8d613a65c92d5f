//! Ledger façade — the invariant-checking mutation boundary.
//!
//! # Purpose
//! [`accounting`](crate::accounting) contains the raw weighted-average-cost
//! mechanics.  This module wraps them behind a typed [`Ledger`] façade that:
//!
//! - Validates every operation up front (positive qty and price, non-negative
//!   fee, non-empty symbol, sufficient cash or shares) and leaves the state
//!   untouched on any error.
//! - Stamps each accepted operation into an immutable [`TradeRecord`] and
//!   appends it to the audit trail.
//! - Exposes read-only valuation and integrity views; mark-to-market queries
//!   take a caller-supplied [`PriceMap`](crate::PriceMap) and cache nothing.
//!
//! # Determinism
//! Aside from the id/timestamp stamped onto each record, all arithmetic is
//! pure: two ledgers fed the same operation sequence hold identical cash,
//! holdings, and derived metrics.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    accounting::{apply_record, recompute_from_trades},
    metrics,
    money::mul_qty_price_micros,
    types::{Holding, LedgerState, TradeRecord, TradeSide},
    PriceMap,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// All business-rule failures a [`Ledger`] operation can surface.
///
/// Every variant is recoverable: the operation is rejected, the ledger is
/// unchanged, and the caller decides the user-facing messaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Trade quantity must be strictly positive.
    InvalidQuantity { qty_micros: i64 },
    /// Trade price must be strictly positive.
    InvalidPrice { price_micros: i64 },
    /// Fee must be non-negative.
    NegativeFee { fee_micros: i64 },
    /// Symbol must be non-empty.
    EmptySymbol,
    /// Buy cost (qty×price + fee) exceeds available cash.
    InsufficientFunds {
        required_micros: i64,
        available_micros: i64,
    },
    /// Sell quantity exceeds the held quantity.
    InsufficientShares {
        requested_micros: i64,
        held_micros: i64,
    },
    /// Sell attempted on a symbol with no position.
    NoSuchHolding { symbol: String },
    /// Sell fee exceeds gross proceeds; accepting it would debit cash on a
    /// sell and could drive the balance negative.
    ExcessiveFee {
        fee_micros: i64,
        gross_micros: i64,
    },
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuantity { qty_micros } => {
                write!(f, "trade quantity must be > 0, got {qty_micros} micro-shares")
            }
            Self::InvalidPrice { price_micros } => {
                write!(f, "trade price must be > 0, got {price_micros} micros")
            }
            Self::NegativeFee { fee_micros } => {
                write!(f, "fee must be >= 0, got {fee_micros} micros")
            }
            Self::EmptySymbol => write!(f, "symbol must not be empty"),
            Self::InsufficientFunds {
                required_micros,
                available_micros,
            } => write!(
                f,
                "insufficient funds: need {required_micros} micros, have {available_micros}"
            ),
            Self::InsufficientShares {
                requested_micros,
                held_micros,
            } => write!(
                f,
                "insufficient shares: requested {requested_micros} micro-shares, hold {held_micros}"
            ),
            Self::NoSuchHolding { symbol } => {
                write!(f, "no holding for symbol '{symbol}'")
            }
            Self::ExcessiveFee {
                fee_micros,
                gross_micros,
            } => write!(
                f,
                "fee {fee_micros} micros exceeds gross proceeds {gross_micros}"
            ),
        }
    }
}

impl std::error::Error for LedgerError {}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Owner of cash balance and holdings for one actor/context — the unit of
/// atomic mutation.  All writes go through [`Ledger::buy`], [`Ledger::sell`],
/// and [`Ledger::reset_period`]; everything else is a read.
#[derive(Clone, Debug)]
pub struct Ledger {
    state: LedgerState,
}

impl Ledger {
    /// Create a fresh ledger with the given initial cash allocation.
    pub fn new(initial_cash_micros: i64) -> Self {
        Self {
            state: LedgerState::new(initial_cash_micros),
        }
    }

    /// Rehydrate a ledger from a persisted snapshot.
    pub fn from_state(state: LedgerState) -> Self {
        Self { state }
    }

    // -----------------------------------------------------------------------
    // Write surface
    // -----------------------------------------------------------------------

    /// Execute a buy: debit `qty×price + fee` from cash, reweight (or create)
    /// the holding, and append the trade record.
    ///
    /// # Errors
    /// Returns [`LedgerError`] on any validation failure or when the cost
    /// exceeds available cash.  The ledger is **not** mutated on error.
    pub fn buy(
        &mut self,
        symbol: &str,
        qty_micros: i64,
        price_micros: i64,
        fee_micros: i64,
    ) -> Result<TradeRecord, LedgerError> {
        Self::validate(symbol, qty_micros, price_micros, fee_micros)?;

        let gross = mul_qty_price_micros(qty_micros, price_micros);
        let cost = gross.saturating_add(fee_micros);
        if cost > self.state.cash_micros {
            return Err(LedgerError::InsufficientFunds {
                required_micros: cost,
                available_micros: self.state.cash_micros,
            });
        }

        let record = TradeRecord {
            id: Uuid::new_v4(),
            ts_utc: Utc::now(),
            symbol: symbol.to_string(),
            side: TradeSide::Buy,
            qty_micros,
            price_micros,
            fee_micros,
            total_micros: cost,
            avg_cost_at_sale_micros: None,
            realized_gain_micros: None,
            realized_gain_pct: None,
        };

        apply_record(&mut self.state, &record);
        self.state.trades.push(record.clone());
        Ok(record)
    }

    /// Execute a sell: credit `qty×price − fee` to cash, reduce the holding
    /// (removing it at zero), and append a trade record carrying the realized
    /// gain/loss against the average cost at sale.
    ///
    /// # Errors
    /// Returns [`LedgerError`] on validation failure, a missing holding, or
    /// an over-sell.  The ledger is **not** mutated on error.
    pub fn sell(
        &mut self,
        symbol: &str,
        qty_micros: i64,
        price_micros: i64,
        fee_micros: i64,
    ) -> Result<TradeRecord, LedgerError> {
        Self::validate(symbol, qty_micros, price_micros, fee_micros)?;

        let holding = match self.state.holdings.get(symbol) {
            Some(h) => h,
            None => {
                return Err(LedgerError::NoSuchHolding {
                    symbol: symbol.to_string(),
                })
            }
        };
        if qty_micros > holding.qty_micros {
            return Err(LedgerError::InsufficientShares {
                requested_micros: qty_micros,
                held_micros: holding.qty_micros,
            });
        }

        let gross = mul_qty_price_micros(qty_micros, price_micros);
        if fee_micros > gross {
            return Err(LedgerError::ExcessiveFee {
                fee_micros,
                gross_micros: gross,
            });
        }

        let avg_cost = holding.avg_cost_micros;
        let proceeds = gross.saturating_sub(fee_micros);
        let cost_basis = mul_qty_price_micros(qty_micros, avg_cost);
        let realized = proceeds.saturating_sub(cost_basis);
        let realized_pct = if cost_basis > 0 {
            realized as f64 / cost_basis as f64 * 100.0
        } else {
            0.0
        };

        let record = TradeRecord {
            id: Uuid::new_v4(),
            ts_utc: Utc::now(),
            symbol: symbol.to_string(),
            side: TradeSide::Sell,
            qty_micros,
            price_micros,
            fee_micros,
            total_micros: proceeds,
            avg_cost_at_sale_micros: Some(avg_cost),
            realized_gain_micros: Some(realized),
            realized_gain_pct: Some(realized_pct),
        };

        apply_record(&mut self.state, &record);
        self.state.trades.push(record.clone());
        Ok(record)
    }

    /// Start a new competition period: clear all holdings and restore cash to
    /// the given allocation.  The trade log is never truncated — the period
    /// boundary is tracked by index so the full audit trail stays readable.
    pub fn reset_period(&mut self, initial_cash_micros: i64) {
        self.state.holdings.clear();
        self.state.cash_micros = initial_cash_micros;
        self.state.initial_cash_micros = initial_cash_micros;
        self.state.period_start = self.state.trades.len();
    }

    // -----------------------------------------------------------------------
    // Read surface
    // -----------------------------------------------------------------------

    /// Pure check: can a buy of `amount_micros` total cost be afforded?
    pub fn can_buy(&self, amount_micros: i64) -> bool {
        amount_micros <= self.state.cash_micros
    }

    /// Pure check: does a holding exist with at least `qty_micros` shares?
    pub fn can_sell(&self, symbol: &str, qty_micros: i64) -> bool {
        self.state
            .holdings
            .get(symbol)
            .map(|h| qty_micros <= h.qty_micros)
            .unwrap_or(false)
    }

    pub fn cash_micros(&self) -> i64 {
        self.state.cash_micros
    }

    pub fn initial_cash_micros(&self) -> i64 {
        self.state.initial_cash_micros
    }

    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.state.holdings.get(symbol)
    }

    /// Held quantity for a symbol (0 if not held).
    pub fn qty_micros(&self, symbol: &str) -> i64 {
        self.state
            .holdings
            .get(symbol)
            .map(|h| h.qty_micros)
            .unwrap_or(0)
    }

    /// `true` if no open holdings exist.
    pub fn is_flat(&self) -> bool {
        self.state.holdings.is_empty()
    }

    /// The full append-only trade log (audit trail across all periods).
    pub fn trades(&self) -> &[TradeRecord] {
        &self.state.trades
    }

    /// Borrow the full state (for persistence and API views).
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Cloned snapshot of the full state.
    pub fn snapshot(&self) -> LedgerState {
        self.state.clone()
    }

    /// Mark-to-market total value: `cash + Σ qty×price`.
    pub fn total_value_micros(&self, prices: &PriceMap) -> i64 {
        metrics::compute_total_value_micros(self.state.cash_micros, &self.state.holdings, prices)
    }

    /// Return rate of the current period versus its initial allocation,
    /// as a percentage.
    pub fn return_rate_pct(&self, prices: &PriceMap) -> f64 {
        metrics::return_rate_pct(
            self.total_value_micros(prices),
            self.state.initial_cash_micros,
        )
    }

    /// Total unrealized gain/loss across holdings at the given prices.
    pub fn unrealized_gain_micros(&self, prices: &PriceMap) -> i64 {
        metrics::compute_unrealized_gain_micros(&self.state.holdings, prices)
    }

    /// Replay the current period's trades from its initial allocation and
    /// verify the result matches the incremental state.
    ///
    /// This is an **integrity check** — O(n) replay — for tests, startup
    /// verification, or audit flows only.
    pub fn verify_integrity(&self) -> bool {
        let (cash, holdings) = recompute_from_trades(
            self.state.initial_cash_micros,
            self.state.period_trades(),
        );
        cash == self.state.cash_micros && holdings == self.state.holdings
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn validate(
        symbol: &str,
        qty_micros: i64,
        price_micros: i64,
        fee_micros: i64,
    ) -> Result<(), LedgerError> {
        if symbol.trim().is_empty() {
            return Err(LedgerError::EmptySymbol);
        }
        if qty_micros <= 0 {
            return Err(LedgerError::InvalidQuantity { qty_micros });
        }
        if price_micros <= 0 {
            return Err(LedgerError::InvalidPrice { price_micros });
        }
        if fee_micros < 0 {
            return Err(LedgerError::NegativeFee { fee_micros });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
