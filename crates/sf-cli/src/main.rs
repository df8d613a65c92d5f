//! sf — operator CLI for the simfolio paper-trading ledger.
//!
//! Command tree only; each subcommand's implementation lives in
//! `commands/`.  Config layers are YAML paths merged in order via
//! `--config` (repeatable); the actor comes from `--actor` or the
//! `actor_id` config key.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use sf_config::AppConfig;

mod commands;

use commands::CliCtx;

#[derive(Parser)]
#[command(name = "sf")]
#[command(about = "simfolio paper-trading CLI", long_about = None)]
struct Cli {
    /// Config layer paths in merge order (base -> env -> contest overrides)
    #[arg(long = "config", global = true)]
    config: Vec<String>,

    /// Actor whose portfolio the command operates on
    #[arg(long, global = true)]
    actor: Option<Uuid>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Portfolio operations (show/buy/sell/reset)
    Portfolio {
        #[command(subcommand)]
        cmd: PortfolioCmd,
    },

    /// Trade statistics derived from the audit log
    Stats {
        /// Restrict to the current period instead of the full log
        #[arg(long)]
        period: bool,
    },

    /// Leaderboard over every locally stored portfolio
    Rankings,

    /// Price cache commands
    Prices {
        #[command(subcommand)]
        cmd: PricesCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> contest overrides)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Database mirror commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Export the trade log as CSV plus a metrics JSON
    Export {
        /// Output directory (created if missing)
        out_dir: String,
    },
}

#[derive(Subcommand)]
enum PortfolioCmd {
    /// Print cash, holdings, valuation, and return rate
    Show,

    /// Buy shares: `sf portfolio buy AAPL 10 189.50`
    Buy {
        symbol: String,
        /// Share quantity (fractional allowed)
        qty: f64,
        /// Price per share
        price: f64,
        /// Absolute fee; defaults to `default_fee_bps` of gross value
        #[arg(long)]
        fee: Option<f64>,
    },

    /// Sell shares: `sf portfolio sell AAPL 10 195.00`
    Sell {
        symbol: String,
        qty: f64,
        price: f64,
        #[arg(long)]
        fee: Option<f64>,
    },

    /// Start a new period: restore the allocation, clear holdings,
    /// keep the audit trail
    Reset {
        /// Allocation for the new period; defaults to `initial_cash`
        #[arg(long)]
        cash: Option<f64>,
    },
}

#[derive(Subcommand)]
enum PricesCmd {
    /// Print the cached prices
    Show,

    /// Set one symbol's cached price: `sf prices set AAPL 189.50`
    Set { symbol: String, price: f64 },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Connectivity + schema presence
    Status,

    /// Apply SQL migrations
    Migrate,

    /// Push the actor's local snapshot to the mirror
    Push,

    /// Pull the actor's snapshot from the mirror into the local store
    Pull,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience); production sets env vars.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    let paths: Vec<&str> = cli.config.iter().map(|s| s.as_str()).collect();
    let (cfg, loaded) = AppConfig::load(&paths).context("config load failed")?;

    let actor = cli.actor.or(cfg.actor_id);
    let ctx = CliCtx::new(cfg, loaded, actor);

    match cli.cmd {
        Commands::Portfolio { cmd } => match cmd {
            PortfolioCmd::Show => commands::portfolio::show(&ctx),
            PortfolioCmd::Buy {
                symbol,
                qty,
                price,
                fee,
            } => commands::portfolio::buy(&ctx, &symbol, qty, price, fee),
            PortfolioCmd::Sell {
                symbol,
                qty,
                price,
                fee,
            } => commands::portfolio::sell(&ctx, &symbol, qty, price, fee),
            PortfolioCmd::Reset { cash } => commands::portfolio::reset(&ctx, cash),
        },
        Commands::Stats { period } => commands::portfolio::stats(&ctx, period),
        Commands::Rankings => commands::portfolio::rankings(&ctx),
        Commands::Prices { cmd } => match cmd {
            PricesCmd::Show => commands::prices::show(&ctx),
            PricesCmd::Set { symbol, price } => commands::prices::set(&ctx, &symbol, price),
        },
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = sf_config::load_layered_yaml(&path_refs)?;
            println!("config_hash: {}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
            Ok(())
        }
        Commands::Db { cmd } => match cmd {
            DbCmd::Status => commands::db::status().await,
            DbCmd::Migrate => commands::db::migrate().await,
            DbCmd::Push => commands::db::push(&ctx).await,
            DbCmd::Pull => commands::db::pull(&ctx).await,
        },
        Commands::Export { out_dir } => commands::export::run(&ctx, &out_dir),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}

/// Exported for command modules that must refuse to run without an actor.
pub(crate) fn require_actor(actor: Option<Uuid>) -> Result<Uuid> {
    match actor {
        Some(id) => Ok(id),
        None => bail!("no actor: pass --actor <uuid> or set actor_id in config"),
    }
}
