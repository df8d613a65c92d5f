//! Trade statistics derived on demand from the immutable trade log.
//!
//! There are deliberately no incremental counters anywhere in this crate:
//! every figure below is recomputed from the record stream, so the numbers
//! can never drift from the audit trail they describe.

use serde::Serialize;

use crate::money::mul_qty_price_micros;
use crate::types::{TradeRecord, TradeSide};

/// Aggregate statistics over a trade log (or any slice of it).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TradeStats {
    pub total_trades: usize,
    pub buy_trades: usize,
    pub sell_trades: usize,
    /// Σ qty×price gross across both sides (fees excluded).
    pub volume_micros: i64,
    pub fees_micros: i64,
    /// Σ realized gain/loss across sell records.
    pub realized_gain_micros: i64,
    /// Sell records with a strictly positive realized gain.
    pub winning_sells: usize,
    /// winning_sells / sell_trades; 0 when there are no sells.
    pub win_rate: f64,
}

/// Compute statistics over a slice of trade records.
pub fn compute_stats(trades: &[TradeRecord]) -> TradeStats {
    let mut stats = TradeStats::default();

    for record in trades {
        stats.total_trades += 1;
        stats.volume_micros = stats
            .volume_micros
            .saturating_add(mul_qty_price_micros(record.qty_micros, record.price_micros));
        stats.fees_micros = stats.fees_micros.saturating_add(record.fee_micros);

        match record.side {
            TradeSide::Buy => stats.buy_trades += 1,
            TradeSide::Sell => {
                stats.sell_trades += 1;
                if let Some(gain) = record.realized_gain_micros {
                    stats.realized_gain_micros = stats.realized_gain_micros.saturating_add(gain);
                }
                if record.is_winning_sell() {
                    stats.winning_sells += 1;
                }
            }
        }
    }

    if stats.sell_trades > 0 {
        stats.win_rate = stats.winning_sells as f64 / stats.sell_trades as f64;
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Ledger, MICROS_SCALE};

    const M: i64 = MICROS_SCALE;

    fn sample_ledger() -> Ledger {
        let mut l = Ledger::new(1_000_000 * M);
        l.buy("AAPL", 10 * M, 100 * M, M).unwrap();
        l.buy("TSLA", 4 * M, 250 * M, 0).unwrap();
        // winning sell: +200
        l.sell("AAPL", 5 * M, 140 * M, 0).unwrap();
        // losing sell: -100
        l.sell("TSLA", 2 * M, 200 * M, 0).unwrap();
        l
    }

    #[test]
    fn totals_partition_into_buys_and_sells() {
        let stats = compute_stats(sample_ledger().trades());
        assert_eq!(stats.total_trades, 4);
        assert_eq!(stats.buy_trades, 2);
        assert_eq!(stats.sell_trades, 2);
        assert_eq!(stats.total_trades, stats.buy_trades + stats.sell_trades);
    }

    #[test]
    fn volume_and_fees_accumulate_gross() {
        let stats = compute_stats(sample_ledger().trades());
        // 1000 + 1000 + 700 + 400
        assert_eq!(stats.volume_micros, 3_100 * M);
        assert_eq!(stats.fees_micros, M);
    }

    #[test]
    fn realized_gain_sums_only_sell_records() {
        let stats = compute_stats(sample_ledger().trades());
        // +200 (AAPL) - 100 (TSLA)
        assert_eq!(stats.realized_gain_micros, 100 * M);
    }

    #[test]
    fn win_rate_is_computed_over_sells_only() {
        let stats = compute_stats(sample_ledger().trades());
        assert_eq!(stats.winning_sells, 1);
        assert_eq!(stats.win_rate, 0.5);
    }

    #[test]
    fn empty_log_yields_zeroed_stats() {
        let stats = compute_stats(&[]);
        assert_eq!(stats, TradeStats::default());
        assert_eq!(stats.win_rate, 0.0);
    }

    #[test]
    fn buys_only_log_has_zero_win_rate() {
        let mut l = Ledger::new(1_000_000 * M);
        l.buy("AAPL", M, 100 * M, 0).unwrap();
        let stats = compute_stats(l.trades());
        assert_eq!(stats.sell_trades, 0);
        assert_eq!(stats.win_rate, 0.0);
    }
}
