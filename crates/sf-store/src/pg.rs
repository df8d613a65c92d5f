//! Async PostgreSQL mirror: one row per ledger, holding, and trade.
//!
//! This backend is for sharing snapshots across machines (leaderboards,
//! restore on a new host).  It is **not** on the per-mutation persistence
//! path — callers push and pull explicitly, and the local snapshot stays
//! authoritative in between.

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use uuid::Uuid;

use sf_ledger::{Holding, LedgerState, TradeRecord, TradeSide};

pub const ENV_DB_URL: &str = "SF_DATABASE_URL";

/// Connect to Postgres using SF_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL)
        .with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_ledgers_table: bool,
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='ledgers'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_ledgers_table: exists,
    })
}

/// Upsert one actor's full snapshot: ledger row, replaced holdings, and any
/// trades not yet mirrored (trade ids are stable, so re-pushing is idempotent).
pub async fn push_snapshot(pool: &PgPool, actor_id: Uuid, state: &LedgerState) -> Result<()> {
    let mut tx = pool.begin().await.context("begin push transaction failed")?;

    sqlx::query(
        r#"
        insert into ledgers (actor_id, initial_cash_micros, cash_micros, period_start, updated_at_utc)
        values ($1, $2, $3, $4, now())
        on conflict (actor_id) do update
        set initial_cash_micros = excluded.initial_cash_micros,
            cash_micros = excluded.cash_micros,
            period_start = excluded.period_start,
            updated_at_utc = now()
        "#,
    )
    .bind(actor_id)
    .bind(state.initial_cash_micros)
    .bind(state.cash_micros)
    .bind(state.period_start as i64)
    .execute(&mut *tx)
    .await
    .context("upsert ledger row failed")?;

    sqlx::query("delete from holdings where actor_id = $1")
        .bind(actor_id)
        .execute(&mut *tx)
        .await
        .context("clear holdings failed")?;

    for holding in state.holdings.values() {
        sqlx::query(
            r#"
            insert into holdings (actor_id, symbol, qty_micros, avg_cost_micros)
            values ($1, $2, $3, $4)
            "#,
        )
        .bind(actor_id)
        .bind(&holding.symbol)
        .bind(holding.qty_micros)
        .bind(holding.avg_cost_micros)
        .execute(&mut *tx)
        .await
        .context("insert holding failed")?;
    }

    for (seq, trade) in state.trades.iter().enumerate() {
        sqlx::query(
            r#"
            insert into trades (
                id, actor_id, seq, ts_utc, symbol, side,
                qty_micros, price_micros, fee_micros, total_micros,
                avg_cost_at_sale_micros, realized_gain_micros, realized_gain_pct
            )
            values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            on conflict (id) do nothing
            "#,
        )
        .bind(trade.id)
        .bind(actor_id)
        .bind(seq as i64)
        .bind(trade.ts_utc)
        .bind(&trade.symbol)
        .bind(trade.side.as_str())
        .bind(trade.qty_micros)
        .bind(trade.price_micros)
        .bind(trade.fee_micros)
        .bind(trade.total_micros)
        .bind(trade.avg_cost_at_sale_micros)
        .bind(trade.realized_gain_micros)
        .bind(trade.realized_gain_pct)
        .execute(&mut *tx)
        .await
        .context("insert trade failed")?;
    }

    tx.commit().await.context("commit push transaction failed")?;
    Ok(())
}

/// Fetch one actor's snapshot, reassembled in log order.
pub async fn fetch_snapshot(pool: &PgPool, actor_id: Uuid) -> Result<Option<LedgerState>> {
    let ledger_row = sqlx::query(
        "select initial_cash_micros, cash_micros, period_start from ledgers where actor_id = $1",
    )
    .bind(actor_id)
    .fetch_optional(pool)
    .await
    .context("fetch ledger row failed")?;

    let Some(row) = ledger_row else {
        return Ok(None);
    };

    let mut state = LedgerState::new(row.try_get::<i64, _>("initial_cash_micros")?);
    state.cash_micros = row.try_get("cash_micros")?;
    state.period_start = row.try_get::<i64, _>("period_start")? as usize;

    let holding_rows = sqlx::query(
        "select symbol, qty_micros, avg_cost_micros from holdings where actor_id = $1",
    )
    .bind(actor_id)
    .fetch_all(pool)
    .await
    .context("fetch holdings failed")?;

    for row in holding_rows {
        let symbol: String = row.try_get("symbol")?;
        let holding = Holding::new(
            symbol.clone(),
            row.try_get("qty_micros")?,
            row.try_get("avg_cost_micros")?,
        );
        state.holdings.insert(symbol, holding);
    }

    let trade_rows = sqlx::query(
        r#"
        select id, ts_utc, symbol, side, qty_micros, price_micros, fee_micros,
               total_micros, avg_cost_at_sale_micros, realized_gain_micros, realized_gain_pct
        from trades
        where actor_id = $1
        order by seq asc
        "#,
    )
    .bind(actor_id)
    .fetch_all(pool)
    .await
    .context("fetch trades failed")?;

    for row in trade_rows {
        let side: String = row.try_get("side")?;
        let side = match side.as_str() {
            "sell" => TradeSide::Sell,
            _ => TradeSide::Buy,
        };
        state.trades.push(TradeRecord {
            id: row.try_get("id")?,
            ts_utc: row.try_get("ts_utc")?,
            symbol: row.try_get("symbol")?,
            side,
            qty_micros: row.try_get("qty_micros")?,
            price_micros: row.try_get("price_micros")?,
            fee_micros: row.try_get("fee_micros")?,
            total_micros: row.try_get("total_micros")?,
            avg_cost_at_sale_micros: row.try_get("avg_cost_at_sale_micros")?,
            realized_gain_micros: row.try_get("realized_gain_micros")?,
            realized_gain_pct: row.try_get("realized_gain_pct")?,
        });
    }

    Ok(Some(state))
}

/// Every actor with a mirrored ledger.
pub async fn list_actors(pool: &PgPool) -> Result<Vec<Uuid>> {
    let rows = sqlx::query("select actor_id from ledgers order by actor_id")
        .fetch_all(pool)
        .await
        .context("list actors failed")?;

    rows.into_iter()
        .map(|row| row.try_get::<Uuid, _>("actor_id").context("actor_id decode failed"))
        .collect()
}
