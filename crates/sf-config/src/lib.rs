//! Layered configuration for the simfolio toolchain.
//!
//! Config is assembled from YAML documents merged in order (base -> env ->
//! contest overrides); later documents override earlier ones, objects are
//! deep-merged.  The merged document is canonicalized to compact JSON and
//! hashed with SHA-256 so any two runs can prove they used the same
//! effective config.  Secrets must never appear as literal values — leaf
//! strings that look like credentials abort the load.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use uuid::Uuid;

/// Known secret-like prefixes.  If any leaf string value in the effective
/// config starts with one of these, loading aborts with CONFIG_SECRET_DETECTED.
/// Database and API credentials belong in the environment (`SF_DATABASE_URL`),
/// never in config files.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // service API keys
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "eyJ",        // JWTs / service-role tokens
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "xoxb-",      // Slack bot token
    "postgres://",
    "postgresql://",
];

// ---------------------------------------------------------------------------
// Loading + hashing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

/// Load and merge YAML files in order; earlier paths are base, later override.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

/// Merge YAML documents supplied as strings (test seam and env overrides).
pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

/// Canonical form: keys sorted recursively, compact serialization.
fn canonicalize_json(v: &Value) -> Result<String> {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).context("canonical json serialize failed")
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

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Secret guard
// ---------------------------------------------------------------------------

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(val) = v.pointer(&ptr) {
            if let Some(s) = val.as_str() {
                if looks_like_secret(s) {
                    bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
                }
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            let p = if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            };
            out.push(p);
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

// ---------------------------------------------------------------------------
// Typed config
// ---------------------------------------------------------------------------

/// Typed view of the effective config.  Every field has a default so a
/// missing file or empty layer still yields a usable config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Cash allocation (in units) granted at the start of each period.
    pub initial_cash: f64,
    /// Default trade fee in basis points of gross value, applied by the CLI
    /// when no explicit fee is given.  The ledger itself takes absolute fees.
    pub default_fee_bps: i64,
    /// Root directory for per-actor snapshots and trade journals.
    pub data_dir: String,
    /// Price-cache file (symbol -> unit price) the tools read at query time.
    pub prices_path: String,
    /// Default actor when the CLI is invoked without `--actor`.
    pub actor_id: Option<Uuid>,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            initial_cash: 1_000_000.0,
            default_fee_bps: 0,
            data_dir: "data".to_string(),
            prices_path: "data/prices.json".to_string(),
            actor_id: None,
            api: ApiConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8790".to_string(),
        }
    }
}

impl AppConfig {
    /// Extract the typed config from a merged document.
    pub fn from_value(config_json: &Value) -> Result<Self> {
        serde_json::from_value(config_json.clone()).context("config shape invalid")
    }

    /// Load layered YAML paths and extract the typed config; no paths yields
    /// the defaults.
    pub fn load(paths: &[&str]) -> Result<(Self, LoadedConfig)> {
        let loaded = if paths.is_empty() {
            load_layered_yaml_from_strings(&["{}"])?
        } else {
            load_layered_yaml(paths)?
        };
        let cfg = Self::from_value(&loaded.config_json)?;
        Ok((cfg, loaded))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
