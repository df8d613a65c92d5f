use std::collections::BTreeMap;

use serde::Serialize;

use crate::money::i128_to_i64_clamp;
use crate::types::Holding;
use crate::PriceMap;

/// Valuation metrics for one ledger at a point in time (micros).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValuationMetrics {
    pub cash_micros: i64,
    pub market_value_micros: i64,
    pub total_value_micros: i64,
    pub unrealized_gain_micros: i64,
}

fn mark_for(holding: &Holding, prices: &PriceMap) -> i64 {
    // Stale-cache fallback: a symbol missing from the price map values at
    // its average cost rather than zero, so an incomplete quote refresh
    // does not crater the portfolio value.
    *prices.get(&holding.symbol).unwrap_or(&holding.avg_cost_micros)
}

/// Σ qty × mark over all holdings.
pub fn compute_market_value_micros(
    holdings: &BTreeMap<String, Holding>,
    prices: &PriceMap,
) -> i64 {
    let mut mv: i128 = 0;

    // deterministic iteration (BTreeMap); per-holding rounding matches the
    // trade path so a summed view never disagrees with its rows
    for holding in holdings.values() {
        let mark = mark_for(holding, prices);
        mv += holding.market_value_micros(mark) as i128;
    }

    i128_to_i64_clamp(mv)
}

/// Total portfolio value: `cash + Σ qty × mark`.
pub fn compute_total_value_micros(
    cash_micros: i64,
    holdings: &BTreeMap<String, Holding>,
    prices: &PriceMap,
) -> i64 {
    cash_micros.saturating_add(compute_market_value_micros(holdings, prices))
}

/// Σ (mark − avg_cost) × qty over all holdings.
pub fn compute_unrealized_gain_micros(
    holdings: &BTreeMap<String, Holding>,
    prices: &PriceMap,
) -> i64 {
    let mut pnl: i128 = 0;

    for holding in holdings.values() {
        let mark = mark_for(holding, prices);
        pnl += holding.unrealized_gain_micros(mark) as i128;
    }

    i128_to_i64_clamp(pnl)
}

/// Percentage change of total value versus the initial allocation.
/// Returns 0 when the initial allocation is non-positive.
pub fn return_rate_pct(total_value_micros: i64, initial_cash_micros: i64) -> f64 {
    if initial_cash_micros <= 0 {
        return 0.0;
    }
    (total_value_micros - initial_cash_micros) as f64 / initial_cash_micros as f64 * 100.0
}

/// Bundle cash, market value, total value, and unrealized gain in one pass.
pub fn compute_valuation(
    cash_micros: i64,
    holdings: &BTreeMap<String, Holding>,
    prices: &PriceMap,
) -> ValuationMetrics {
    let market_value_micros = compute_market_value_micros(holdings, prices);
    ValuationMetrics {
        cash_micros,
        market_value_micros,
        total_value_micros: cash_micros.saturating_add(market_value_micros),
        unrealized_gain_micros: compute_unrealized_gain_micros(holdings, prices),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{prices, MICROS_SCALE};

    const M: i64 = MICROS_SCALE;

    fn holdings(items: &[(&str, i64, i64)]) -> BTreeMap<String, Holding> {
        items
            .iter()
            .map(|(s, q, c)| (s.to_string(), Holding::new(*s, *q, *c)))
            .collect()
    }

    #[test]
    fn market_value_sums_marked_holdings() {
        let h = holdings(&[("AAPL", 10 * M, 100 * M), ("TSLA", 2 * M, 250 * M)]);
        let px = prices([("AAPL", 110 * M), ("TSLA", 300 * M)]);
        // 10×110 + 2×300 = 1700
        assert_eq!(compute_market_value_micros(&h, &px), 1_700 * M);
    }

    #[test]
    fn missing_price_falls_back_to_average_cost() {
        let h = holdings(&[("AAPL", 10 * M, 100 * M)]);
        let px = PriceMap::new();
        assert_eq!(compute_market_value_micros(&h, &px), 1_000 * M);
        assert_eq!(compute_unrealized_gain_micros(&h, &px), 0);
    }

    #[test]
    fn unrealized_gain_long_position() {
        let h = holdings(&[("AAPL", 10 * M, 100 * M)]);
        let px = prices([("AAPL", 115 * M)]);
        assert_eq!(compute_unrealized_gain_micros(&h, &px), 150 * M);
    }

    #[test]
    fn unrealized_loss_is_negative() {
        let h = holdings(&[("AAPL", 10 * M, 100 * M)]);
        let px = prices([("AAPL", 90 * M)]);
        assert_eq!(compute_unrealized_gain_micros(&h, &px), -100 * M);
    }

    #[test]
    fn return_rate_basic() {
        assert_eq!(return_rate_pct(1_100 * M, 1_000 * M), 10.0);
        assert_eq!(return_rate_pct(900 * M, 1_000 * M), -10.0);
        assert_eq!(return_rate_pct(1_000 * M, 0), 0.0);
    }

    #[test]
    fn valuation_bundle_is_consistent() {
        let h = holdings(&[("AAPL", 10 * M, 100 * M)]);
        let px = prices([("AAPL", 110 * M)]);
        let v = compute_valuation(500 * M, &h, &px);
        assert_eq!(v.cash_micros, 500 * M);
        assert_eq!(v.market_value_micros, 1_100 * M);
        assert_eq!(v.total_value_micros, 1_600 * M);
        assert_eq!(v.unrealized_gain_micros, 100 * M);
    }
}
