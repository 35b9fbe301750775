//! Shared types for the TRIARB engine.
//!
//! These types form the data model used across all modules.
//! They are plain values so that the exchange, strategy and engine
//! modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Assets and pairs
// ---------------------------------------------------------------------------

/// An opaque currency identifier ("USDT", "BTC", ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Asset(String);

impl Asset {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Asset {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An ordered (from → to) conversion between two assets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectedPair {
    pub from: Asset,
    pub to: Asset,
}

impl DirectedPair {
    pub fn new(from: Asset, to: Asset) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for DirectedPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}→{}", self.from, self.to)
    }
}

/// The exchange's name for an unordered asset pair, together with the
/// asset it quotes in. `ETHBTC` has base `ETH` and quote `BTC`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalSymbol {
    pub name: String,
    pub base: Asset,
    pub quote: Asset,
}

impl CanonicalSymbol {
    pub fn new(name: impl Into<String>, base: Asset, quote: Asset) -> Self {
        Self {
            name: name.into(),
            base,
            quote,
        }
    }
}

impl fmt::Display for CanonicalSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A directed pair bound to the symbol that trades it.
///
/// `inverted` is set when the symbol's base asset is the `to` side of the
/// pair: prices read from that symbol must be reciprocated, and book walks
/// consult the bids rather than the asks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairBinding {
    pub pair: DirectedPair,
    pub symbol: CanonicalSymbol,
    pub inverted: bool,
}

impl PairBinding {
    /// Order side used when placing this leg (inverted ⇒ SELL).
    pub fn side(&self) -> Side {
        if self.inverted {
            Side::Sell
        } else {
            Side::Buy
        }
    }

    /// Order amount for spending `input` of the `from` asset. Spending the
    /// symbol's quote asset is sized in quote units, spending its base asset
    /// in base units.
    pub fn order_amount(&self, input: Decimal) -> OrderAmount {
        if self.pair.from == self.symbol.quote {
            OrderAmount::Quote(input)
        } else {
            OrderAmount::Base(input)
        }
    }
}

impl fmt::Display for PairBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} via {}{}",
            self.pair,
            self.symbol,
            if self.inverted { " (inverted)" } else { "" }
        )
    }
}

/// Order direction on the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Size of a market order and the asset it is denominated in.
///
/// `Base` maps to Binance `quantity`, `Quote` to `quoteOrderQty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "lowercase")]
pub enum OrderAmount {
    Base(Decimal),
    Quote(Decimal),
}

impl OrderAmount {
    pub fn value(&self) -> Decimal {
        match self {
            OrderAmount::Base(v) | OrderAmount::Quote(v) => *v,
        }
    }

    /// Binance query parameter carrying this amount.
    pub fn param(&self) -> &'static str {
        match self {
            OrderAmount::Base(_) => "quantity",
            OrderAmount::Quote(_) => "quoteOrderQty",
        }
    }
}

impl fmt::Display for OrderAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.param(), self.value())
    }
}

// ---------------------------------------------------------------------------
// Order books
// ---------------------------------------------------------------------------

/// One price level of a depth snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

impl OrderLevel {
    pub fn new(price: Decimal, quantity: Decimal) -> Self {
        Self { price, quantity }
    }

    /// `price × quantity`: the amount of input this level absorbs.
    /// Saturates at `Decimal::MAX`.
    pub fn value(&self) -> Decimal {
        self.price.saturating_mul(self.quantity)
    }
}

/// Point-in-time depth: asks ascending by price, bids descending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub asks: Vec<OrderLevel>,
    pub bids: Vec<OrderLevel>,
}

impl OrderBookSnapshot {
    pub fn new(asks: Vec<OrderLevel>, bids: Vec<OrderLevel>) -> Self {
        Self { asks, bids }
    }

    pub fn is_empty(&self) -> bool {
        self.asks.is_empty() && self.bids.is_empty()
    }

    pub fn best_ask(&self) -> Option<&OrderLevel> {
        self.asks.first()
    }

    pub fn best_bid(&self) -> Option<&OrderLevel> {
        self.bids.first()
    }
}

/// Best bid / best ask for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookTicker {
    pub bid_price: Decimal,
    pub ask_price: Decimal,
}

/// Outcome of walking a book for some input quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillResult {
    pub output_quantity: Decimal,
    /// False when the input exceeded the liquidity visible in the snapshot.
    pub fully_filled: bool,
}

// ---------------------------------------------------------------------------
// Profit samples
// ---------------------------------------------------------------------------

/// One simulated pass around the cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitSample {
    /// Base-asset quantity fed into leg A.
    pub base_quantity: Decimal,
    /// Leg A output after fees (input of leg B).
    pub leg_a_output: Decimal,
    /// Leg B output after fees (input of leg C).
    pub leg_b_output: Decimal,
    /// Base-asset quantity after all three legs and fees.
    pub implicit_profit: Decimal,
    /// Per-leg `fully_filled` flags in order A, B, C.
    pub legs_filled: [bool; 3],
    pub timestamp: DateTime<Utc>,
}

impl ProfitSample {
    /// True when any leg ran out of visible depth: the figure is a lower bound.
    pub fn low_confidence(&self) -> bool {
        self.legs_filled.iter().any(|filled| !filled)
    }

    /// `implicit_profit - base_quantity`.
    pub fn net_gain(&self) -> Decimal {
        self.implicit_profit - self.base_quantity
    }
}

impl fmt::Display for ProfitSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} → {} → {} → {}{}",
            self.base_quantity,
            self.leg_a_output.round_dp(8),
            self.leg_b_output.round_dp(8),
            self.implicit_profit.round_dp(8),
            if self.low_confidence() { " (partial depth)" } else { "" }
        )
    }
}

// ---------------------------------------------------------------------------
// Exchange metadata and orders
// ---------------------------------------------------------------------------

/// Order size rules for a symbol (Binance `LOT_SIZE`, `NOTIONAL` and the
/// quote asset precision).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolFilters {
    pub step_size: Decimal,
    pub min_qty: Decimal,
    pub max_qty: Decimal,
    /// Decimal places accepted for `quoteOrderQty`.
    pub quote_precision: u32,
    /// Smallest quote value of an order; zero when the symbol has no rule.
    pub min_notional: Decimal,
}

impl SymbolFilters {
    /// Round down to a whole number of steps. Never rounds up.
    pub fn round_down(&self, quantity: Decimal) -> Decimal {
        if self.step_size <= Decimal::ZERO {
            return quantity;
        }
        ((quantity / self.step_size).floor() * self.step_size).normalize()
    }

    /// Round an order amount down to what the exchange accepts: base
    /// amounts to the step size (clamped to `max_qty`), quote amounts to
    /// the quote precision.
    pub fn round_amount(&self, amount: OrderAmount) -> OrderAmount {
        match amount {
            OrderAmount::Base(q) => OrderAmount::Base(self.round_down(q.min(self.max_qty))),
            OrderAmount::Quote(q) => OrderAmount::Quote(
                q.round_dp_with_strategy(self.quote_precision, RoundingStrategy::ToZero)
                    .normalize(),
            ),
        }
    }

    /// Why `amount` would be rejected, if it would.
    pub fn rejection(&self, amount: OrderAmount) -> Option<String> {
        match amount {
            OrderAmount::Base(q) if q <= Decimal::ZERO || q < self.min_qty => {
                Some(format!("below minimum quantity {}", self.min_qty))
            }
            OrderAmount::Quote(q) if q <= Decimal::ZERO || q < self.min_notional => {
                Some(format!("below minimum notional {}", self.min_notional))
            }
            _ => None,
        }
    }
}

/// Exchange acknowledgement of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub amount: OrderAmount,
    /// Base-asset quantity filled.
    pub executed_quantity: Decimal,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for TRIARB.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArbError {
    #[error("Unknown trading pair: no canonical symbol for {from}/{to}")]
    UnknownPair { from: Asset, to: Asset },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error ({venue}): {message}")]
    Transport { venue: String, message: String },

    #[error("Rate limited by {venue} (retry after {retry_after_secs:?}s)")]
    RateLimited {
        venue: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Exchange error ({venue}) HTTP {status}: {message}")]
    Exchange {
        venue: String,
        status: u16,
        message: String,
    },

    #[error("Failed to decode {what}: {message}")]
    Decode { what: String, message: String },

    #[error("Invalid quantity {quantity} for {symbol}: {reason}")]
    InvalidQuantity {
        symbol: String,
        quantity: Decimal,
        reason: String,
    },
}

impl ArbError {
    /// Rate limiting is a transport failure that also suppresses triggers.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ArbError::RateLimited { .. })
    }

    /// Errors that are fatal at startup rather than per-cycle.
    pub fn is_configuration(&self) -> bool {
        matches!(self, ArbError::UnknownPair { .. } | ArbError::Config(_))
    }
}

pub type ArbResult<T> = std::result::Result<T, ArbError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
