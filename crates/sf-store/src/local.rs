//! Local filesystem store: one directory per actor.
//!
//! Layout under the data root:
//!
//! ```text
//! <root>/<actor_id>/snapshot.json   — full ledger state, atomic overwrite
//! <root>/<actor_id>/trades.jsonl    — append-only journal, one record per
//!                                     line, hash-chained (hash_prev/hash_self)
//! ```
//!
//! The snapshot is the load/restore source; the journal is the tamper-evident
//! audit trail.  Journal lines are canonical JSON (keys sorted recursively,
//! compact) so the chain hash is stable across serializer versions.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use sf_ledger::{LedgerState, SnapshotStore, StoreError, TradeRecord};

/// One journal line: the trade atom plus its chain links.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct JournalLine {
    record: TradeRecord,
    hash_prev: Option<String>,
    hash_self: Option<String>,
}

/// Per-actor filesystem store.
pub struct LocalStore {
    actor_dir: PathBuf,
    /// Tail of the journal hash chain; restored from the last line on open.
    last_hash: Mutex<Option<String>>,
}

impl LocalStore {
    /// Open (creating if needed) the store directory for one actor and
    /// restore the journal chain tail.
    pub fn open(root: impl AsRef<Path>, actor_id: Uuid) -> Result<Self> {
        let actor_dir = root.as_ref().join(actor_id.to_string());
        fs::create_dir_all(&actor_dir)
            .with_context(|| format!("create_dir_all {}", actor_dir.display()))?;

        let store = Self {
            actor_dir,
            last_hash: Mutex::new(None),
        };
        let tail = store.read_journal_tail()?;
        *store.lock_last_hash() = tail;
        Ok(store)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.actor_dir.join("snapshot.json")
    }

    pub fn journal_path(&self) -> PathBuf {
        self.actor_dir.join("trades.jsonl")
    }

    /// Write the snapshot atomically: temp file in the same directory, then
    /// rename over the target.
    pub fn save_snapshot(&self, snapshot: &LedgerState) -> Result<()> {
        let path = self.snapshot_path();
        let tmp = self.actor_dir.join("snapshot.json.tmp");

        let json = serde_json::to_string_pretty(snapshot).context("serialize snapshot failed")?;
        fs::write(&tmp, format!("{json}\n"))
            .with_context(|| format!("write snapshot tmp failed: {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("rename snapshot failed: {}", path.display()))?;
        Ok(())
    }

    /// Read the snapshot, if one exists.
    pub fn load_snapshot(&self) -> Result<Option<LedgerState>> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("read snapshot failed: {}", path.display()))?;
        let state = serde_json::from_str(&raw)
            .with_context(|| format!("snapshot not valid JSON: {}", path.display()))?;
        Ok(Some(state))
    }

    /// Append one trade to the journal, extending the hash chain.
    pub fn journal_trade(&self, record: &TradeRecord) -> Result<()> {
        let mut last = self.lock_last_hash();

        let mut line = JournalLine {
            record: record.clone(),
            hash_prev: last.clone(),
            hash_self: None,
        };
        let self_hash = compute_line_hash(&line)?;
        line.hash_self = Some(self_hash.clone());

        let serialized = canonical_json_line(&line)?;
        append_line(&self.journal_path(), &serialized)?;

        *last = Some(self_hash);
        Ok(())
    }

    /// Walk the journal and verify every line's hash and chain link.
    /// Returns the number of verified records.
    pub fn verify_journal(&self) -> Result<usize> {
        let path = self.journal_path();
        if !path.exists() {
            return Ok(0);
        }

        let file = fs::File::open(&path)
            .with_context(|| format!("open journal failed: {}", path.display()))?;
        let mut prev: Option<String> = None;
        let mut count = 0usize;

        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.context("read journal line failed")?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed: JournalLine = serde_json::from_str(&line)
                .with_context(|| format!("journal line {idx} not valid JSON"))?;

            if parsed.hash_prev != prev {
                bail!("journal chain broken at line {idx}: hash_prev mismatch");
            }
            let expected = compute_line_hash(&JournalLine {
                hash_self: None,
                ..parsed.clone()
            })?;
            match &parsed.hash_self {
                Some(h) if *h == expected => {}
                _ => bail!("journal chain broken at line {idx}: hash_self mismatch"),
            }
            prev = parsed.hash_self;
            count += 1;
        }

        Ok(count)
    }

    /// Read every record out of the journal in order (audit flows).
    pub fn read_journal(&self) -> Result<Vec<TradeRecord>> {
        let path = self.journal_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&path)
            .with_context(|| format!("open journal failed: {}", path.display()))?;
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.context("read journal line failed")?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed: JournalLine =
                serde_json::from_str(&line).context("journal line not valid JSON")?;
            records.push(parsed.record);
        }
        Ok(records)
    }

    fn read_journal_tail(&self) -> Result<Option<String>> {
        let path = self.journal_path();
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("read journal failed: {}", path.display()))?;
        let Some(last_line) = raw.lines().rev().find(|l| !l.trim().is_empty()) else {
            return Ok(None);
        };
        let parsed: JournalLine =
            serde_json::from_str(last_line).context("journal tail not valid JSON")?;
        Ok(parsed.hash_self)
    }

    fn lock_last_hash(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        match self.last_hash.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SnapshotStore for LocalStore {
    fn save(&self, snapshot: &LedgerState) -> Result<(), StoreError> {
        self.save_snapshot(snapshot).map_err(Into::into)
    }

    fn load(&self) -> Result<Option<LedgerState>, StoreError> {
        self.load_snapshot().map_err(Into::into)
    }

    fn append_trade(&self, record: &TradeRecord) -> Result<(), StoreError> {
        self.journal_trade(record).map_err(Into::into)
    }
}

// ---------------------------------------------------------------------------
// Canonical JSON + hashing helpers
// ---------------------------------------------------------------------------

/// Canonicalize by sorting keys recursively and emitting compact JSON.
/// One record == one JSON line.
fn canonical_json_line<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize journal line failed")?;
    let sorted = sort_keys(&raw);
    serde_json::to_string(&sorted).context("json stringify failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

fn compute_line_hash(line: &JournalLine) -> Result<String> {
    let canonical = canonical_json_line(line)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Write a single line to file (with trailing newline).
fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open journal {}", path.display()))?;
    f.write_all(line.as_bytes()).context("write journal line failed")?;
    f.write_all(b"\n").context("write newline failed")?;
    Ok(())
}
