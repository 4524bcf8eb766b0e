//! Trading pair naming and symbol resolution
//!
//! Pairs are named `BASE_QUOTE` (e.g. `BTC_THB`). Bitkub spells the same
//! market quote-first (`THB_BTC` in the directory, `thb_btc` in request
//! parameters), so every value crossing the exchange boundary is converted here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::{MarketDataError, Result};

/// A market named in the client's external `BASE_QUOTE` convention
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TradingPair {
    base: String,
    quote: String,
}

impl TradingPair {
    /// Build a pair from its base and quote assets
    pub fn new(base: &str, quote: &str) -> Self {
        Self {
            base: base.to_uppercase(),
            quote: quote.to_uppercase(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// The exchange spelling used in REST parameters and stream addresses
    pub fn exchange_symbol(&self) -> ExchangeSymbol {
        ExchangeSymbol(format!(
            "{}_{}",
            self.quote.to_lowercase(),
            self.base.to_lowercase()
        ))
    }

    /// Normalize a directory symbol (`THB_BTC`) into the external convention
    pub fn from_exchange_symbol(symbol: &str) -> Result<Self> {
        let (quote, base) = split_symbol(symbol)?;
        Ok(Self::new(base, quote))
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.base, self.quote)
    }
}

impl FromStr for TradingPair {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self> {
        let (base, quote) = split_symbol(s)?;
        Ok(Self::new(base, quote))
    }
}

impl TryFrom<String> for TradingPair {
    type Error = MarketDataError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TradingPair> for String {
    fn from(pair: TradingPair) -> Self {
        pair.to_string()
    }
}

fn split_symbol(symbol: &str) -> Result<(&str, &str)> {
    let symbol = symbol.trim();
    match symbol.split_once('_') {
        Some((left, right)) if !left.is_empty() && !right.is_empty() && !right.contains('_') => {
            Ok((left, right))
        }
        _ => Err(MarketDataError::InvalidSymbol(symbol.to_string())),
    }
}

/// A pair in exchange spelling: quote first, lower-case (`thb_btc`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExchangeSymbol(String);

impl ExchangeSymbol {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExchangeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Symbol directory entry, with `symbol` already in the external convention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSymbol {
    pub id: u64,
    pub symbol: TradingPair,
    pub info: String,
}

/// Directory keyed by external pair name
pub type MarketSymbols = BTreeMap<TradingPair, MarketSymbol>;

/// Symbol directory entry as the exchange returns it
#[derive(Debug, Clone, Deserialize)]
pub struct RawMarketSymbol {
    pub id: u64,
    pub symbol: String,
    #[serde(default)]
    pub info: String,
}

/// Re-key the exchange directory by external pair name.
///
/// Entries whose symbol cannot be split into base and quote are skipped.
pub fn normalize_directory(raw: Vec<RawMarketSymbol>) -> MarketSymbols {
    let mut symbols = MarketSymbols::new();
    for entry in raw {
        match TradingPair::from_exchange_symbol(&entry.symbol) {
            Ok(pair) => {
                symbols.insert(
                    pair.clone(),
                    MarketSymbol {
                        id: entry.id,
                        symbol: pair,
                        info: entry.info,
                    },
                );
            }
            Err(e) => debug!(symbol = %entry.symbol, error = %e, "Skipping directory entry"),
        }
    }
    symbols
}

/// Map every requested pair to its exchange identifier.
///
/// Fails on the first pair missing from the directory.
pub fn resolve_pairs(
    directory: &MarketSymbols,
    pairs: &[TradingPair],
) -> Result<BTreeMap<TradingPair, u64>> {
    pairs
        .iter()
        .map(|pair| match directory.get(pair) {
            Some(entry) => Ok((pair.clone(), entry.id)),
            None => Err(MarketDataError::SymbolNotFound(pair.clone())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: u64, symbol: &str) -> RawMarketSymbol {
        RawMarketSymbol {
            id,
            symbol: symbol.to_string(),
            info: String::new(),
        }
    }

    #[test]
    fn test_parse_pair() {
        let pair: TradingPair = "btc_thb".parse().unwrap();
        assert_eq!(pair.base(), "BTC");
        assert_eq!(pair.quote(), "THB");
        assert_eq!(pair.to_string(), "BTC_THB");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["BTCTHB", "_THB", "BTC_", "A_B_C", ""] {
            assert!(bad.parse::<TradingPair>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_exchange_symbol_swaps_and_lowercases() {
        let pair = TradingPair::new("BTC", "THB");
        assert_eq!(pair.exchange_symbol().as_str(), "thb_btc");
    }

    #[test]
    fn test_normalize_directory() {
        let symbols = normalize_directory(vec![
            RawMarketSymbol {
                id: 1,
                symbol: "THB_BTC".to_string(),
                info: "Thai Baht to Bitcoin".to_string(),
            },
            raw(2, "THB_ETH"),
            raw(3, "broken"),
        ]);

        assert_eq!(symbols.len(), 2);
        let btc = &symbols[&TradingPair::new("BTC", "THB")];
        assert_eq!(btc.id, 1);
        assert_eq!(btc.symbol.to_string(), "BTC_THB");
        assert_eq!(btc.info, "Thai Baht to Bitcoin");
    }

    #[test]
    fn test_resolve_swapped_directory_entry() {
        let directory = normalize_directory(vec![raw(7, "THB_BTC")]);
        let pairs = vec![TradingPair::new("BTC", "THB")];

        let resolved = resolve_pairs(&directory, &pairs).unwrap();
        assert_eq!(resolved[&TradingPair::new("BTC", "THB")], 7);
    }

    #[test]
    fn test_resolve_missing_pair_names_it() {
        let directory = normalize_directory(vec![raw(7, "THB_BTC")]);
        let pairs = vec![TradingPair::new("BTC", "THB"), TradingPair::new("DOGE", "THB")];

        match resolve_pairs(&directory, &pairs) {
            Err(MarketDataError::SymbolNotFound(pair)) => assert_eq!(pair.to_string(), "DOGE_THB"),
            other => panic!("Expected SymbolNotFound, got {other:?}"),
        }
    }
}
