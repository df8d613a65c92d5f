//! Database mirror subcommands (Postgres via SF_DATABASE_URL).

use anyhow::{bail, Context, Result};
use tracing::info;

use sf_store::{pg, LocalStore};

use super::CliCtx;

pub async fn status() -> Result<()> {
    let pool = pg::connect_from_env().await?;
    let status = pg::status(&pool).await?;
    println!("connectivity: {}", if status.ok { "ok" } else { "FAILED" });
    println!(
        "schema:       {}",
        if status.has_ledgers_table {
            "present"
        } else {
            "missing (run `sf db migrate`)"
        }
    );
    Ok(())
}

pub async fn migrate() -> Result<()> {
    let pool = pg::connect_from_env().await?;
    pg::migrate(&pool).await?;
    println!("migrations applied");
    Ok(())
}

pub async fn push(ctx: &CliCtx) -> Result<()> {
    let actor = crate::require_actor(ctx.actor)?;
    let store = LocalStore::open(ctx.data_dir(), actor)?;
    let Some(snapshot) = store.load_snapshot()? else {
        bail!("no local snapshot for actor {actor}");
    };

    let pool = pg::connect_from_env().await?;
    pg::push_snapshot(&pool, actor, &snapshot)
        .await
        .context("push failed")?;
    info!(actor_id = %actor, trades = snapshot.trades.len(), "snapshot pushed");
    println!(
        "pushed: cash {}, {} holdings, {} trades",
        snapshot.cash_micros,
        snapshot.holdings.len(),
        snapshot.trades.len()
    );
    Ok(())
}

pub async fn pull(ctx: &CliCtx) -> Result<()> {
    let actor = crate::require_actor(ctx.actor)?;

    let pool = pg::connect_from_env().await?;
    let Some(snapshot) = pg::fetch_snapshot(&pool, actor).await? else {
        bail!("no mirrored snapshot for actor {actor}");
    };

    let store = LocalStore::open(ctx.data_dir(), actor)?;
    store.save_snapshot(&snapshot)?;
    println!(
        "pulled: cash {}, {} holdings, {} trades",
        snapshot.cash_micros,
        snapshot.holdings.len(),
        snapshot.trades.len()
    );
    Ok(())
}
