//! Export the actor's trade log as CSV plus a metrics JSON.
//!
//! Layout under the output directory:
//!
//! ```text
//! <out>/<actor_id>/trades.csv    — one row per trade record
//! <out>/<actor_id>/metrics.json  — stats + valuation at current prices
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use sf_ledger::{compute_stats, compute_valuation, money};

use super::CliCtx;

pub fn run(ctx: &CliCtx, out_dir: &str) -> Result<()> {
    let actor = crate::require_actor(ctx.actor)?;
    let svc = ctx.service()?;
    let prices = ctx.price_map()?;
    let snap = svc.snapshot();

    let dir = Path::new(out_dir).join(actor.to_string());
    fs::create_dir_all(&dir).with_context(|| format!("create export dir {}", dir.display()))?;

    // trades.csv
    let csv_path = dir.join("trades.csv");
    let mut writer = csv::Writer::from_path(&csv_path)
        .with_context(|| format!("open {}", csv_path.display()))?;
    writer
        .write_record([
            "ts_utc",
            "trade_id",
            "symbol",
            "side",
            "qty",
            "price",
            "fee",
            "total",
            "realized_gain",
            "realized_gain_pct",
        ])
        .context("write csv header failed")?;
    for t in &snap.trades {
        writer
            .write_record([
                t.ts_utc.to_rfc3339(),
                t.id.to_string(),
                t.symbol.clone(),
                t.side.as_str().to_string(),
                format!("{:.6}", money::micros_to_units(t.qty_micros)),
                format!("{:.6}", money::micros_to_units(t.price_micros)),
                format!("{:.6}", money::micros_to_units(t.fee_micros)),
                format!("{:.6}", money::micros_to_units(t.total_micros)),
                t.realized_gain_micros
                    .map(|g| format!("{:.6}", money::micros_to_units(g)))
                    .unwrap_or_default(),
                t.realized_gain_pct
                    .map(|p| format!("{p:.4}"))
                    .unwrap_or_default(),
            ])
            .context("write csv row failed")?;
    }
    writer.flush().context("flush csv failed")?;

    // metrics.json
    let stats = compute_stats(&snap.trades);
    let valuation = compute_valuation(snap.cash_micros, &snap.holdings, &prices);
    let metrics = serde_json::json!({
        "actor_id": actor,
        "exported_at_utc": chrono::Utc::now(),
        "stats": stats,
        "valuation": valuation,
        "return_rate_pct": sf_ledger::return_rate_pct(
            valuation.total_value_micros,
            snap.initial_cash_micros,
        ),
    });
    let metrics_path = dir.join("metrics.json");
    let json = serde_json::to_string_pretty(&metrics).context("serialize metrics failed")?;
    fs::write(&metrics_path, format!("{json}\n"))
        .with_context(|| format!("write metrics failed: {}", metrics_path.display()))?;

    println!(
        "exported {} trades to {}",
        snap.trades.len(),
        dir.display()
    );
    Ok(())
}
