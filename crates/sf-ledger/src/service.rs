//! Concurrency-safe service wrapper and the persistence collaborator seam.
//!
//! A [`PortfolioService`] owns one [`Ledger`] behind a mutex: buy/sell/reset
//! serialize their read-modify-write, and read queries take the same lock so
//! every read observes a consistent state.  Instances are constructed per
//! actor/context and injected — there is no process-wide singleton.
//!
//! Persistence is best-effort by contract: after each successful mutation the
//! configured [`SnapshotStore`] is invoked, and a failure is logged at WARN
//! without rolling back the mutation.  In-memory state is authoritative.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    ledger::{Ledger, LedgerError},
    metrics::ValuationMetrics,
    stats::{compute_stats, TradeStats},
    types::{LedgerState, TradeRecord},
    PriceMap,
};

/// Boxed error type crossing the persistence seam.
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Outbound persistence collaborator.
///
/// Contract: `save` is called after every successful mutation and `load`
/// once at startup; both are best-effort — a failure is logged by the
/// service, never fatal, and never rolls back in-memory state.
/// `append_trade` lets journaling stores record each trade atom as it
/// happens; stores without a journal keep the default no-op.
pub trait SnapshotStore: Send + Sync {
    fn save(&self, snapshot: &LedgerState) -> Result<(), StoreError>;
    fn load(&self) -> Result<Option<LedgerState>, StoreError>;

    fn append_trade(&self, record: &TradeRecord) -> Result<(), StoreError> {
        let _ = record;
        Ok(())
    }
}

/// Mutex-serialized ledger handle for one actor.
pub struct PortfolioService {
    actor_id: Uuid,
    inner: Mutex<Ledger>,
    store: Option<Arc<dyn SnapshotStore>>,
}

impl PortfolioService {
    /// In-memory service with no persistence collaborator.
    pub fn new(actor_id: Uuid, initial_cash_micros: i64) -> Self {
        Self {
            actor_id,
            inner: Mutex::new(Ledger::new(initial_cash_micros)),
            store: None,
        }
    }

    /// Service backed by a persistence collaborator.  An existing snapshot is
    /// loaded at startup; a load failure is logged and the service starts
    /// fresh from `initial_cash_micros` (best-effort contract).
    pub fn with_store(
        actor_id: Uuid,
        initial_cash_micros: i64,
        store: Arc<dyn SnapshotStore>,
    ) -> Self {
        let ledger = match store.load() {
            Ok(Some(state)) => Ledger::from_state(state),
            Ok(None) => Ledger::new(initial_cash_micros),
            Err(err) => {
                warn!(actor_id = %actor_id, error = %err, "snapshot load failed; starting fresh");
                Ledger::new(initial_cash_micros)
            }
        };
        Self {
            actor_id,
            inner: Mutex::new(ledger),
            store: Some(store),
        }
    }

    pub fn actor_id(&self) -> Uuid {
        self.actor_id
    }

    // -----------------------------------------------------------------------
    // Mutations (serialized)
    // -----------------------------------------------------------------------

    pub fn buy(
        &self,
        symbol: &str,
        qty_micros: i64,
        price_micros: i64,
        fee_micros: i64,
    ) -> Result<TradeRecord, LedgerError> {
        let mut guard = self.lock();
        let record = guard.buy(symbol, qty_micros, price_micros, fee_micros)?;
        info!(
            actor_id = %self.actor_id,
            symbol,
            side = record.side.as_str(),
            qty_micros = record.qty_micros,
            total_micros = record.total_micros,
            "trade executed"
        );
        self.persist(&guard, Some(&record));
        Ok(record)
    }

    pub fn sell(
        &self,
        symbol: &str,
        qty_micros: i64,
        price_micros: i64,
        fee_micros: i64,
    ) -> Result<TradeRecord, LedgerError> {
        let mut guard = self.lock();
        let record = guard.sell(symbol, qty_micros, price_micros, fee_micros)?;
        info!(
            actor_id = %self.actor_id,
            symbol,
            side = record.side.as_str(),
            qty_micros = record.qty_micros,
            realized_gain_micros = record.realized_gain_micros,
            "trade executed"
        );
        self.persist(&guard, Some(&record));
        Ok(record)
    }

    pub fn reset_period(&self, initial_cash_micros: i64) {
        let mut guard = self.lock();
        guard.reset_period(initial_cash_micros);
        info!(actor_id = %self.actor_id, initial_cash_micros, "period reset");
        self.persist(&guard, None);
    }

    // -----------------------------------------------------------------------
    // Reads (consistent under the same lock)
    // -----------------------------------------------------------------------

    pub fn can_buy(&self, amount_micros: i64) -> bool {
        self.lock().can_buy(amount_micros)
    }

    pub fn can_sell(&self, symbol: &str, qty_micros: i64) -> bool {
        self.lock().can_sell(symbol, qty_micros)
    }

    pub fn snapshot(&self) -> LedgerState {
        self.lock().snapshot()
    }

    pub fn total_value_micros(&self, prices: &PriceMap) -> i64 {
        self.lock().total_value_micros(prices)
    }

    pub fn return_rate_pct(&self, prices: &PriceMap) -> f64 {
        self.lock().return_rate_pct(prices)
    }

    pub fn valuation(&self, prices: &PriceMap) -> ValuationMetrics {
        let guard = self.lock();
        let state = guard.state();
        crate::metrics::compute_valuation(state.cash_micros, &state.holdings, prices)
    }

    /// Statistics over the full trade log (all periods).
    pub fn stats(&self) -> TradeStats {
        compute_stats(self.lock().trades())
    }

    /// Statistics over the current period only.
    pub fn period_stats(&self) -> TradeStats {
        let guard = self.lock();
        compute_stats(guard.state().period_trades())
    }

    pub fn verify_integrity(&self) -> bool {
        self.lock().verify_integrity()
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        // Ledger mutations are pure arithmetic and cannot panic mid-update;
        // a poisoned lock still guards a fully-applied state, so recover it.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn persist(&self, ledger: &Ledger, record: Option<&TradeRecord>) {
        let Some(store) = &self.store else {
            return;
        };
        if let Some(record) = record {
            if let Err(err) = store.append_trade(record) {
                warn!(
                    actor_id = %self.actor_id,
                    trade_id = %record.id,
                    error = %err,
                    "trade journal append failed; in-memory state remains authoritative"
                );
            }
        }
        if let Err(err) = store.save(ledger.state()) {
            warn!(
                actor_id = %self.actor_id,
                error = %err,
                "snapshot save failed; in-memory state remains authoritative"
            );
        }
    }
}
