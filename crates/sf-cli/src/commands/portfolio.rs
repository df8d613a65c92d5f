//! Portfolio subcommands: show, buy, sell, reset, stats, rankings.

use anyhow::{Context, Result};
use uuid::Uuid;

use sf_ledger::{compute_rankings, compute_valuation, money, LedgerState, TradeRecord};
use sf_store::LocalStore;

use super::CliCtx;

pub fn show(ctx: &CliCtx) -> Result<()> {
    let svc = ctx.service()?;
    let prices = ctx.price_map()?;
    let snap = svc.snapshot();
    let valuation = compute_valuation(snap.cash_micros, &snap.holdings, &prices);

    println!("actor:           {}", svc.actor_id());
    println!("cash:            {:.2}", money::micros_to_units(valuation.cash_micros));
    println!(
        "market value:    {:.2}",
        money::micros_to_units(valuation.market_value_micros)
    );
    println!(
        "total value:     {:.2}",
        money::micros_to_units(valuation.total_value_micros)
    );
    println!(
        "unrealized gain: {:+.2}",
        money::micros_to_units(valuation.unrealized_gain_micros)
    );
    println!(
        "return rate:     {:+.2}%",
        sf_ledger::return_rate_pct(valuation.total_value_micros, snap.initial_cash_micros)
    );
    println!("trades:          {}", snap.trades.len());

    if snap.holdings.is_empty() {
        println!("holdings:        (none)");
    } else {
        println!("holdings:");
        for h in snap.holdings.values() {
            let mark = *prices.get(&h.symbol).unwrap_or(&h.avg_cost_micros);
            println!(
                "  {:<8} {:>12.4} @ {:>10.2}  mark {:>10.2}  p/l {:+.2}",
                h.symbol,
                money::micros_to_units(h.qty_micros),
                money::micros_to_units(h.avg_cost_micros),
                money::micros_to_units(mark),
                money::micros_to_units(h.unrealized_gain_micros(mark)),
            );
        }
    }
    Ok(())
}

pub fn buy(ctx: &CliCtx, symbol: &str, qty: f64, price: f64, fee: Option<f64>) -> Result<()> {
    let svc = ctx.service()?;
    let qty_micros = money::units_to_micros(qty).context("qty not representable")?;
    let price_micros = money::units_to_micros(price).context("price not representable")?;
    let fee_micros = resolve_fee(ctx, qty_micros, price_micros, fee)?;

    match svc.buy(symbol, qty_micros, price_micros, fee_micros) {
        Ok(record) => {
            print_trade(&record);
            println!(
                "cash remaining: {:.2}",
                money::micros_to_units(svc.snapshot().cash_micros)
            );
            Ok(())
        }
        Err(err) => {
            println!("rejected: {err}");
            Ok(())
        }
    }
}

pub fn sell(ctx: &CliCtx, symbol: &str, qty: f64, price: f64, fee: Option<f64>) -> Result<()> {
    let svc = ctx.service()?;
    let qty_micros = money::units_to_micros(qty).context("qty not representable")?;
    let price_micros = money::units_to_micros(price).context("price not representable")?;
    let fee_micros = resolve_fee(ctx, qty_micros, price_micros, fee)?;

    match svc.sell(symbol, qty_micros, price_micros, fee_micros) {
        Ok(record) => {
            print_trade(&record);
            if let (Some(gain), Some(pct)) = (record.realized_gain_micros, record.realized_gain_pct)
            {
                println!(
                    "realized: {:+.2} ({:+.2}%)",
                    money::micros_to_units(gain),
                    pct
                );
            }
            Ok(())
        }
        Err(err) => {
            println!("rejected: {err}");
            Ok(())
        }
    }
}

pub fn reset(ctx: &CliCtx, cash: Option<f64>) -> Result<()> {
    let svc = ctx.service()?;
    let cash_micros = match cash {
        Some(units) => money::units_to_micros(units).context("cash not representable")?,
        None => ctx.initial_cash_micros()?,
    };
    svc.reset_period(cash_micros);
    println!(
        "period reset: cash {:.2}, holdings cleared, audit trail kept ({} records)",
        money::micros_to_units(cash_micros),
        svc.snapshot().trades.len()
    );
    Ok(())
}

pub fn stats(ctx: &CliCtx, period: bool) -> Result<()> {
    let svc = ctx.service()?;
    let stats = if period { svc.period_stats() } else { svc.stats() };

    println!("trades:        {}", stats.total_trades);
    println!("  buys:        {}", stats.buy_trades);
    println!("  sells:       {}", stats.sell_trades);
    println!("volume:        {:.2}", money::micros_to_units(stats.volume_micros));
    println!("fees:          {:.2}", money::micros_to_units(stats.fees_micros));
    println!(
        "realized p/l:  {:+.2}",
        money::micros_to_units(stats.realized_gain_micros)
    );
    println!(
        "win rate:      {:.1}% ({}/{} sells)",
        stats.win_rate * 100.0,
        stats.winning_sells,
        stats.sell_trades
    );
    Ok(())
}

pub fn rankings(ctx: &CliCtx) -> Result<()> {
    let prices = ctx.price_map()?;
    let initial = ctx.initial_cash_micros()?;

    let totals: Vec<(Uuid, i64)> = ctx
        .list_actors()
        .into_iter()
        .filter_map(|actor| {
            let snap = load_snapshot(ctx, actor)?;
            let valuation = compute_valuation(snap.cash_micros, &snap.holdings, &prices);
            Some((actor, valuation.total_value_micros))
        })
        .collect();

    let board = compute_rankings(&totals, initial);
    if board.is_empty() {
        println!("no portfolios found under {}", ctx.data_dir().display());
        return Ok(());
    }
    for entry in board {
        println!(
            "#{:<3} {}  {:>14.2}  {:+.2}%",
            entry.rank,
            entry.actor_id,
            money::micros_to_units(entry.total_assets_micros),
            entry.return_rate_pct,
        );
    }
    Ok(())
}

fn load_snapshot(ctx: &CliCtx, actor: Uuid) -> Option<LedgerState> {
    let store = LocalStore::open(ctx.data_dir(), actor).ok()?;
    store.load_snapshot().ok().flatten()
}

/// Explicit fee wins; otherwise `default_fee_bps` of gross value.
fn resolve_fee(
    ctx: &CliCtx,
    qty_micros: i64,
    price_micros: i64,
    fee: Option<f64>,
) -> Result<i64> {
    if let Some(units) = fee {
        return money::units_to_micros(units).context("fee not representable");
    }
    let gross = money::mul_qty_price_micros(qty_micros, price_micros);
    Ok(((gross as i128 * ctx.cfg.default_fee_bps as i128) / 10_000) as i64)
}

fn print_trade(record: &TradeRecord) {
    println!(
        "{} {} {:.4} @ {:.2} (fee {:.2}) -> total {:.2}  [{}]",
        record.side.as_str(),
        record.symbol,
        money::micros_to_units(record.qty_micros),
        money::micros_to_units(record.price_micros),
        money::micros_to_units(record.fee_micros),
        money::micros_to_units(record.total_micros),
        record.id,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_config::AppConfig;
    use sf_ledger::MICROS_SCALE;

    const M: i64 = MICROS_SCALE;

    fn ctx_with_bps(bps: i64) -> CliCtx {
        let cfg = AppConfig {
            default_fee_bps: bps,
            ..AppConfig::default()
        };
        let loaded = sf_config::load_layered_yaml_from_strings(&["{}"]).unwrap();
        CliCtx::new(cfg, loaded, None)
    }

    #[test]
    fn explicit_fee_overrides_default_bps() {
        let ctx = ctx_with_bps(25);
        let fee = resolve_fee(&ctx, 10 * M, 100 * M, Some(3.5)).unwrap();
        assert_eq!(fee, 3_500_000);
    }

    #[test]
    fn default_fee_is_bps_of_gross() {
        let ctx = ctx_with_bps(25);
        // gross 1,000 -> 25 bps = 2.50
        let fee = resolve_fee(&ctx, 10 * M, 100 * M, None).unwrap();
        assert_eq!(fee, 2_500_000);
    }

    #[test]
    fn zero_bps_means_free_trades() {
        let ctx = ctx_with_bps(0);
        assert_eq!(resolve_fee(&ctx, 10 * M, 100 * M, None).unwrap(), 0);
    }
}
