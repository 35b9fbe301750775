//! Exchange integrations.
//!
//! Defines the collaborator traits the engine consumes and provides a
//! Binance spot implementation:
//! - `MarketData`: best bid/ask and depth snapshots
//! - `OrderPlacer`: market order placement
//! - `ExchangeMetadata`: per-symbol order size rules

pub mod binance;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::types::{
    ArbResult, BookTicker, OrderAmount, OrderBookSnapshot, OrderConfirmation, Side, SymbolFilters,
};

/// Read-only market data for canonical symbols.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Best bid and ask for a symbol.
    async fn get_best_bid_ask(&self, symbol: &str) -> ArbResult<BookTicker>;

    /// Depth snapshot with at most `depth_limit` levels per side.
    async fn get_depth(&self, symbol: &str, depth_limit: u16) -> ArbResult<OrderBookSnapshot>;
}

/// Market order placement.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OrderPlacer: Send + Sync {
    /// `amount` is already rounded to the symbol's rules and carries its
    /// unit: base quantity or quote value.
    async fn place_market_order(
        &self,
        symbol: &str,
        side: Side,
        amount: OrderAmount,
    ) -> ArbResult<OrderConfirmation>;
}

/// Exchange trading rules.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ExchangeMetadata: Send + Sync {
    /// Lot size, quote precision and minimum notional for a symbol.
    async fn get_symbol_filters(&self, symbol: &str) -> ArbResult<SymbolFilters>;
}
