//! Cycle model: three bindings forming a closed base → quote → tertiary loop.

use std::fmt;

use crate::types::{ArbError, ArbResult, Asset, PairBinding};

use super::symbols::SymbolTable;

/// Identifies one of the three legs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Leg {
    A,
    B,
    C,
}

impl Leg {
    pub const ALL: [Leg; 3] = [Leg::A, Leg::B, Leg::C];
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leg::A => write!(f, "A"),
            Leg::B => write!(f, "B"),
            Leg::C => write!(f, "C"),
        }
    }
}

/// An immutable closed loop of three legs.
#[derive(Debug, Clone, PartialEq)]
pub struct ArbitrageCycle {
    leg_a: PairBinding,
    leg_b: PairBinding,
    leg_c: PairBinding,
}

impl ArbitrageCycle {
    /// Resolve (base, quote), (quote, tertiary) and (tertiary, base).
    ///
    /// Any missing symbol is a configuration error raised here, never later
    /// inside the decision loop.
    pub fn build(
        table: &SymbolTable,
        base: &Asset,
        quote: &Asset,
        tertiary: &Asset,
    ) -> ArbResult<Self> {
        if base == quote || quote == tertiary || tertiary == base {
            return Err(ArbError::Config(format!(
                "cycle assets must be distinct, got {base}/{quote}/{tertiary}"
            )));
        }

        let cycle = Self {
            leg_a: table.resolve(base, quote)?,
            leg_b: table.resolve(quote, tertiary)?,
            leg_c: table.resolve(tertiary, base)?,
        };
        debug_assert!(cycle.is_closed());
        Ok(cycle)
    }

    fn is_closed(&self) -> bool {
        self.leg_a.pair.to == self.leg_b.pair.from
            && self.leg_b.pair.to == self.leg_c.pair.from
            && self.leg_c.pair.to == self.leg_a.pair.from
    }

    pub fn leg_a(&self) -> &PairBinding {
        &self.leg_a
    }

    pub fn leg_b(&self) -> &PairBinding {
        &self.leg_b
    }

    pub fn leg_c(&self) -> &PairBinding {
        &self.leg_c
    }

    pub fn leg(&self, leg: Leg) -> &PairBinding {
        match leg {
            Leg::A => &self.leg_a,
            Leg::B => &self.leg_b,
            Leg::C => &self.leg_c,
        }
    }

    /// Legs in trading order.
    pub fn legs(&self) -> [&PairBinding; 3] {
        [&self.leg_a, &self.leg_b, &self.leg_c]
    }

    /// Canonical symbol names to fetch / trade, in leg order.
    pub fn symbols(&self) -> [&str; 3] {
        [
            self.leg_a.symbol.name.as_str(),
            self.leg_b.symbol.name.as_str(),
            self.leg_c.symbol.name.as_str(),
        ]
    }

    /// The asset the cycle starts and ends in.
    pub fn base_asset(&self) -> &Asset {
        &self.leg_a.pair.from
    }
}

impl fmt::Display for ArbitrageCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} → {} → {} → {}",
            self.leg_a.pair.from, self.leg_b.pair.from, self.leg_c.pair.from, self.leg_a.pair.from
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn build(base: &str, quote: &str, tertiary: &str) -> ArbResult<ArbitrageCycle> {
        ArbitrageCycle::build(
            &SymbolTable::binance_defaults(),
            &base.into(),
            &quote.into(),
            &tertiary.into(),
        )
    }

    #[test]
    fn test_usdt_btc_eth_cycle() {
        let cycle = build("USDT", "BTC", "ETH").unwrap();
        assert_eq!(cycle.symbols(), ["BTCUSDT", "ETHBTC", "ETHUSDT"]);
        assert_eq!(
            cycle.legs().map(|l| l.inverted),
            [true, true, false]
        );
        assert_eq!(cycle.base_asset(), &Asset::from("USDT"));
        assert_eq!(cycle.to_string(), "USDT → BTC → ETH → USDT");
    }

    #[test]
    fn test_reverse_direction_flips_inversion() {
        let cycle = build("USDT", "ETH", "BTC").unwrap();
        assert_eq!(cycle.symbols(), ["ETHUSDT", "ETHBTC", "BTCUSDT"]);
        assert_eq!(
            cycle.legs().map(|l| l.inverted),
            [true, false, false]
        );
    }

    #[test]
    fn test_cycle_is_closed() {
        let cycle = build("BTC", "ETH", "IOTA").unwrap();
        assert!(cycle.is_closed());
        assert_eq!(cycle.leg(Leg::C).pair.to, Asset::from("BTC"));
    }

    #[test]
    fn test_unknown_asset_fails_at_build() {
        let err = build("USDT", "BTC", "DOGE").unwrap_err();
        assert!(matches!(err, ArbError::UnknownPair { .. }));
    }

    #[test]
    fn test_repeated_asset_rejected() {
        let err = build("USDT", "BTC", "USDT").unwrap_err();
        assert!(matches!(err, ArbError::Config(_)));
    }
}
