use std::collections::BTreeMap;

use crate::money::weighted_avg_price_micros;
use crate::types::{Holding, LedgerState, TradeRecord, TradeSide};

/// Apply an already-validated trade record to cash and holdings (incremental).
///
/// Deterministic, pure logic, no IO.  The caller owns appending the record
/// to the trade log; this function only moves state.
///
/// Rules:
/// - Buy: cash −= total (qty×price + fee); existing holding's average cost
///   becomes the quantity-weighted average of old basis and new purchase,
///   then qty is added; first buy of a symbol creates the holding at
///   `avg = price`.
/// - Sell: cash += total (qty×price − fee); qty is subtracted with the
///   average cost untouched — the basis rides out on the remaining shares;
///   a holding at zero qty is removed so rebuys start a fresh basis.
pub fn apply_record(state: &mut LedgerState, record: &TradeRecord) {
    apply_to(&mut state.cash_micros, &mut state.holdings, record);
}

fn apply_to(cash_micros: &mut i64, holdings: &mut BTreeMap<String, Holding>, r: &TradeRecord) {
    debug_assert!(r.qty_micros > 0);
    debug_assert!(r.price_micros > 0);
    debug_assert!(r.fee_micros >= 0);

    match r.side {
        TradeSide::Buy => {
            *cash_micros = cash_micros.saturating_sub(r.total_micros);
            match holdings.get_mut(&r.symbol) {
                Some(h) => {
                    h.avg_cost_micros = weighted_avg_price_micros(
                        h.qty_micros,
                        h.avg_cost_micros,
                        r.qty_micros,
                        r.price_micros,
                    );
                    h.qty_micros = h.qty_micros.saturating_add(r.qty_micros);
                }
                None => {
                    holdings.insert(
                        r.symbol.clone(),
                        Holding::new(&r.symbol, r.qty_micros, r.price_micros),
                    );
                }
            }
        }
        TradeSide::Sell => {
            *cash_micros = cash_micros.saturating_add(r.total_micros);
            if let Some(h) = holdings.get_mut(&r.symbol) {
                h.qty_micros -= r.qty_micros;
                if h.qty_micros <= 0 {
                    holdings.remove(&r.symbol);
                }
            }
        }
    }
}

/// Replay a trade slice from an initial cash amount and return the derived
/// cash balance and holdings map.
///
/// Determinism invariant: incremental [`apply_record`] must match this
/// replay on the same record stream — [`crate::Ledger::verify_integrity`]
/// checks exactly that.
pub fn recompute_from_trades(
    initial_cash_micros: i64,
    trades: &[TradeRecord],
) -> (i64, BTreeMap<String, Holding>) {
    let mut cash = initial_cash_micros;
    let mut holdings: BTreeMap<String, Holding> = BTreeMap::new();

    for record in trades {
        apply_to(&mut cash, &mut holdings, record);
    }

    (cash, holdings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::{mul_qty_price_micros, MICROS_PER_UNIT};
    use chrono::Utc;
    use uuid::Uuid;

    const M: i64 = MICROS_PER_UNIT;

    fn record(symbol: &str, side: TradeSide, qty: i64, price: i64, fee: i64) -> TradeRecord {
        let gross = mul_qty_price_micros(qty, price);
        let total = match side {
            TradeSide::Buy => gross + fee,
            TradeSide::Sell => gross - fee,
        };
        TradeRecord {
            id: Uuid::new_v4(),
            ts_utc: Utc::now(),
            symbol: symbol.to_string(),
            side,
            qty_micros: qty,
            price_micros: price,
            fee_micros: fee,
            total_micros: total,
            avg_cost_at_sale_micros: None,
            realized_gain_micros: None,
            realized_gain_pct: None,
        }
    }

    #[test]
    fn buy_creates_holding_at_purchase_price() {
        let mut st = LedgerState::new(100_000 * M);
        apply_record(&mut st, &record("AAPL", TradeSide::Buy, 10 * M, 100 * M, 0));

        let h = st.holdings.get("AAPL").expect("holding exists");
        assert_eq!(h.qty_micros, 10 * M);
        assert_eq!(h.avg_cost_micros, 100 * M);
        assert_eq!(st.cash_micros, 99_000 * M);
    }

    #[test]
    fn second_buy_reweights_average_cost() {
        let mut st = LedgerState::new(100_000 * M);
        apply_record(&mut st, &record("AAPL", TradeSide::Buy, 10 * M, 100 * M, 0));
        apply_record(&mut st, &record("AAPL", TradeSide::Buy, 10 * M, 200 * M, 0));

        let h = st.holdings.get("AAPL").expect("holding exists");
        assert_eq!(h.qty_micros, 20 * M);
        assert_eq!(h.avg_cost_micros, 150 * M);
    }

    #[test]
    fn sell_keeps_average_cost_on_remaining_shares() {
        let mut st = LedgerState::new(100_000 * M);
        apply_record(&mut st, &record("AAPL", TradeSide::Buy, 10 * M, 100 * M, 0));
        apply_record(&mut st, &record("AAPL", TradeSide::Sell, 4 * M, 150 * M, 0));

        let h = st.holdings.get("AAPL").expect("holding exists");
        assert_eq!(h.qty_micros, 6 * M);
        assert_eq!(h.avg_cost_micros, 100 * M);
    }

    #[test]
    fn full_sell_removes_the_holding() {
        let mut st = LedgerState::new(100_000 * M);
        apply_record(&mut st, &record("AAPL", TradeSide::Buy, 10 * M, 100 * M, 0));
        apply_record(&mut st, &record("AAPL", TradeSide::Sell, 10 * M, 150 * M, 0));

        assert!(st.holdings.is_empty());
        // 100_000 - 1_000 + 1_500
        assert_eq!(st.cash_micros, 100_500 * M);
    }

    #[test]
    fn rebuy_after_flatten_starts_a_fresh_basis() {
        let mut st = LedgerState::new(100_000 * M);
        apply_record(&mut st, &record("AAPL", TradeSide::Buy, 10 * M, 100 * M, 0));
        apply_record(&mut st, &record("AAPL", TradeSide::Sell, 10 * M, 150 * M, 0));
        apply_record(&mut st, &record("AAPL", TradeSide::Buy, 5 * M, 300 * M, 0));

        let h = st.holdings.get("AAPL").expect("holding exists");
        assert_eq!(h.avg_cost_micros, 300 * M);
        assert_eq!(h.qty_micros, 5 * M);
    }

    #[test]
    fn replay_matches_incremental_state() {
        let mut st = LedgerState::new(50_000 * M);
        let trades = vec![
            record("AAPL", TradeSide::Buy, 10 * M, 100 * M, M),
            record("TSLA", TradeSide::Buy, 2 * M, 250 * M, 0),
            record("AAPL", TradeSide::Sell, 5 * M, 120 * M, M),
        ];
        for t in &trades {
            apply_record(&mut st, t);
            st.trades.push(t.clone());
        }

        let (cash, holdings) = recompute_from_trades(st.initial_cash_micros, &st.trades);
        assert_eq!(cash, st.cash_micros);
        assert_eq!(holdings, st.holdings);
    }
}
