//! Persistence adapters for sf-ledger.
//!
//! Two backends share the same snapshot shape ([`sf_ledger::LedgerState`]):
//!
//! - [`local::LocalStore`] — per-actor directory with an atomically-written
//!   `snapshot.json` plus an append-only, hash-chained `trades.jsonl`
//!   journal.  Implements [`sf_ledger::SnapshotStore`]; this is the
//!   collaborator a [`sf_ledger::PortfolioService`] normally runs with.
//! - [`pg`] — an async PostgreSQL mirror (one row per ledger, holding, and
//!   trade) for sharing snapshots across machines.  Callers push/pull
//!   explicitly; it is not on the per-mutation persistence path.
//!
//! [`prices`] holds the file-backed price cache the query tools mark
//! portfolios against.

pub mod local;
pub mod pg;
pub mod prices;

pub use local::LocalStore;
pub use pg::{connect_from_env, DbStatus, ENV_DB_URL};
pub use prices::{load_price_file, set_price};
