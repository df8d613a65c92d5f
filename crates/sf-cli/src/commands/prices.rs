//! Price cache subcommands.

use anyhow::{Context, Result};

use sf_ledger::money;

use super::CliCtx;

pub fn show(ctx: &CliCtx) -> Result<()> {
    let map = ctx.price_map()?;
    if map.is_empty() {
        println!("price cache is empty ({})", ctx.prices_path().display());
        return Ok(());
    }
    for (symbol, px) in &map {
        println!("{:<8} {:>12.4}", symbol, money::micros_to_units(*px));
    }
    Ok(())
}

pub fn set(ctx: &CliCtx, symbol: &str, price: f64) -> Result<()> {
    let price_micros = money::units_to_micros(price).context("price not representable")?;
    sf_store::set_price(&ctx.prices_path(), symbol, price_micros)?;
    println!("{symbol} = {:.4}", money::micros_to_units(price_micros));
    Ok(())
}
