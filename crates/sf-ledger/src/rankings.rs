//! Leaderboard computation — derived, read-only, recomputed on demand.
//!
//! A ranking is a pure function of `(actor, total assets)` pairs plus the
//! period's initial allocation; nothing here is independently mutable.
//! Ordering is canonical: total assets descending, ties broken by actor id
//! ascending, so the same inputs always produce the same board regardless
//! of input order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::return_rate_pct;

/// One row of a computed leaderboard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    /// 1-based competition rank; actors with equal total assets share a
    /// rank and the following rank is skipped.
    pub rank: u32,
    pub actor_id: Uuid,
    pub total_assets_micros: i64,
    pub return_rate_pct: f64,
}

/// Compute a leaderboard from `(actor_id, total_assets)` pairs.
///
/// `initial_cash_micros` is the period allocation every actor started from;
/// the return rate is derived from it per entry.
pub fn compute_rankings(totals: &[(Uuid, i64)], initial_cash_micros: i64) -> Vec<RankingEntry> {
    let mut sorted: Vec<(Uuid, i64)> = totals.to_vec();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut entries = Vec::with_capacity(sorted.len());
    let mut last_assets: Option<i64> = None;
    let mut last_rank: u32 = 0;

    for (i, (actor_id, total_assets_micros)) in sorted.into_iter().enumerate() {
        let rank = match last_assets {
            Some(prev) if prev == total_assets_micros => last_rank,
            _ => i as u32 + 1,
        };
        last_assets = Some(total_assets_micros);
        last_rank = rank;

        entries.push(RankingEntry {
            rank,
            actor_id,
            total_assets_micros,
            return_rate_pct: return_rate_pct(total_assets_micros, initial_cash_micros),
        });
    }

    entries
}
