//! File-backed price cache: a JSON object of `symbol -> unit price`.
//!
//! The ledger itself never reads prices; tools load this cache into a
//! [`PriceMap`] at query time and refresh the file independently (manual
//! edits, a quote fetcher, or `sf prices set`).

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use sf_ledger::{money, PriceMap};

/// Read the price file into a PriceMap (micros).  A missing file yields an
/// empty map — the cache starts cold.
pub fn load_price_file(path: &Path) -> Result<PriceMap> {
    if !path.exists() {
        return Ok(PriceMap::new());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read price file failed: {}", path.display()))?;
    let units: BTreeMap<String, f64> =
        serde_json::from_str(&raw).context("price file not a symbol->price object")?;

    let mut map = PriceMap::new();
    for (symbol, px) in units {
        let micros = money::units_to_micros(px)
            .with_context(|| format!("price for {symbol} not representable"))?;
        map.insert(symbol, micros);
    }
    Ok(map)
}

/// Write one symbol's price into the file, creating it if needed.
pub fn set_price(path: &Path, symbol: &str, price_micros: i64) -> Result<()> {
    let mut map = load_price_file(path)?;
    map.insert(symbol.to_string(), price_micros);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create_dir_all {}", parent.display()))?;
    }

    let units: BTreeMap<&String, f64> = map
        .iter()
        .map(|(sym, px)| (sym, money::micros_to_units(*px)))
        .collect();
    let json = serde_json::to_string_pretty(&units).context("serialize price file failed")?;
    std::fs::write(path, format!("{json}\n"))
        .with_context(|| format!("write price file failed: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_ledger::MICROS_SCALE;

    const M: i64 = MICROS_SCALE;

    #[test]
    fn missing_file_is_an_empty_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let map = load_price_file(&tmp.path().join("prices.json")).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn set_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("prices.json");

        set_price(&path, "AAPL", 150 * M).unwrap();
        set_price(&path, "TSLA", 250_500_000).unwrap();

        let map = load_price_file(&path).unwrap();
        assert_eq!(map.get("AAPL"), Some(&(150 * M)));
        assert_eq!(map.get("TSLA"), Some(&250_500_000));
    }

    #[test]
    fn set_overwrites_an_existing_symbol() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("prices.json");

        set_price(&path, "AAPL", 150 * M).unwrap();
        set_price(&path, "AAPL", 160 * M).unwrap();

        let map = load_price_file(&path).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("AAPL"), Some(&(160 * M)));
    }
}
