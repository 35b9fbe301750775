//! Symbol resolver.
//!
//! Maps a directed asset pair onto the exchange symbol that trades it and
//! works out whether the requested direction runs against the symbol's
//! quoting convention.

use std::collections::HashMap;

use crate::types::{ArbError, ArbResult, Asset, CanonicalSymbol, DirectedPair, PairBinding};

/// Default Binance symbol set: (name, base, quote).
const BINANCE_DEFAULTS: &[(&str, &str, &str)] = &[
    ("BCCETH", "BCC", "ETH"),
    ("IOTAETH", "IOTA", "ETH"),
    ("ETHUSDT", "ETH", "USDT"),
    ("ETHBTC", "ETH", "BTC"),
    ("IOTABTC", "IOTA", "BTC"),
    ("BTCUSDT", "BTC", "USDT"),
];

/// Static lookup from unordered asset pairs to canonical symbols.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: HashMap<(Asset, Asset), CanonicalSymbol>,
}

/// Order-independent key for {a, b}.
fn unordered_key(a: &Asset, b: &Asset) -> (Asset, Asset) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a list of symbols, rejecting inconsistent entries.
    pub fn from_symbols(symbols: impl IntoIterator<Item = CanonicalSymbol>) -> ArbResult<Self> {
        let mut table = Self::new();
        for symbol in symbols {
            table.insert(symbol)?;
        }
        Ok(table)
    }

    /// The six default Binance symbols.
    pub fn binance_defaults() -> Self {
        let mut table = Self::new();
        for (name, base, quote) in BINANCE_DEFAULTS {
            table.symbols.insert(
                unordered_key(&Asset::from(*base), &Asset::from(*quote)),
                CanonicalSymbol::new(*name, Asset::from(*base), Asset::from(*quote)),
            );
        }
        table
    }

    /// Register a symbol. One symbol per unordered pair; re-registering the
    /// same symbol is a no-op, registering a different one is an error.
    pub fn insert(&mut self, symbol: CanonicalSymbol) -> ArbResult<()> {
        if symbol.base == symbol.quote {
            return Err(ArbError::Config(format!(
                "symbol {} has identical base and quote {}",
                symbol.name, symbol.base
            )));
        }

        let key = unordered_key(&symbol.base, &symbol.quote);
        match self.symbols.get(&key) {
            Some(existing) if existing == &symbol => Ok(()),
            Some(existing) => Err(ArbError::Config(format!(
                "pair {}/{} mapped to both {} and {}",
                symbol.base, symbol.quote, existing.name, symbol.name
            ))),
            None => {
                self.symbols.insert(key, symbol);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Resolve `from → to` to its canonical symbol and inversion flag.
    pub fn resolve(&self, from: &Asset, to: &Asset) -> ArbResult<PairBinding> {
        let symbol = self
            .symbols
            .get(&unordered_key(from, to))
            .ok_or_else(|| ArbError::UnknownPair {
                from: from.clone(),
                to: to.clone(),
            })?;

        Ok(PairBinding {
            pair: DirectedPair::new(from.clone(), to.clone()),
            inverted: &symbol.base == to,
            symbol: symbol.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
