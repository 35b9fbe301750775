//! Mock exchange for integration testing.
//!
//! Provides a deterministic implementation of the market-data, order and
//! metadata traits. Books and tickers are fully controllable from
//! test code, and every placed order is recorded in memory.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Mutex;

use triarb::exchange::{ExchangeMetadata, MarketData, OrderPlacer};
use triarb::types::*;

/// An order the engine sent to the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub symbol: String,
    pub side: Side,
    pub amount: OrderAmount,
}

/// A mock spot exchange for deterministic testing.
pub struct MockExchange {
    books: Mutex<HashMap<String, OrderBookSnapshot>>,
    tickers: Mutex<HashMap<String, BookTicker>>,
    orders: Mutex<Vec<PlacedOrder>>,
    depth_requests: Mutex<Vec<(String, u16)>>,
    /// If set, all market-data calls return this error.
    force_error: Mutex<Option<ArbError>>,
    /// Orders on this symbol are rejected.
    reject_symbol: Mutex<Option<String>>,
}

impl MockExchange {
    /// An exchange quoting the USDT/BTC/ETH cycle at a 1% edge:
    /// BTCUSDT bid 50000, ETHBTC bid 0.05, ETHUSDT ask 2525.
    pub fn new() -> Self {
        let exchange = Self {
            books: Mutex::new(HashMap::new()),
            tickers: Mutex::new(HashMap::new()),
            orders: Mutex::new(Vec::new()),
            depth_requests: Mutex::new(Vec::new()),
            force_error: Mutex::new(None),
            reject_symbol: Mutex::new(None),
        };
        exchange.set_book(
            "BTCUSDT",
            vec![level(dec!(50010), dec!(2))],
            vec![level(dec!(50000), dec!(2)), level(dec!(49990), dec!(5))],
        );
        exchange.set_book(
            "ETHBTC",
            vec![level(dec!(0.0501), dec!(100))],
            vec![level(dec!(0.05), dec!(100))],
        );
        exchange.set_book(
            "ETHUSDT",
            vec![level(dec!(2525), dec!(10)), level(dec!(2530), dec!(20))],
            vec![level(dec!(2520), dec!(10))],
        );
        exchange
    }

    /// Replace a symbol's book; the ticker follows the top of book.
    pub fn set_book(&self, symbol: &str, asks: Vec<OrderLevel>, bids: Vec<OrderLevel>) {
        let book = OrderBookSnapshot::new(asks, bids);
        let ticker = BookTicker {
            bid_price: book.best_bid().map_or(Decimal::ZERO, |l| l.price),
            ask_price: book.best_ask().map_or(Decimal::ZERO, |l| l.price),
        };
        self.tickers.lock().unwrap().insert(symbol.to_string(), ticker);
        self.books.lock().unwrap().insert(symbol.to_string(), book);
    }

    /// Force all subsequent market-data calls to return an error.
    pub fn set_error(&self, error: ArbError) {
        *self.force_error.lock().unwrap() = Some(error);
    }

    /// Clear any forced error.
    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    pub fn reject_orders_for(&self, symbol: &str) {
        *self.reject_symbol.lock().unwrap() = Some(symbol.to_string());
    }

    /// All orders recorded so far, in placement order.
    pub fn orders(&self) -> Vec<PlacedOrder> {
        self.orders.lock().unwrap().clone()
    }

    pub fn depth_requests(&self) -> Vec<(String, u16)> {
        self.depth_requests.lock().unwrap().clone()
    }

    fn check_error(&self) -> ArbResult<()> {
        match self.force_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

pub fn level(price: Decimal, quantity: Decimal) -> OrderLevel {
    OrderLevel::new(price, quantity)
}

fn unknown_symbol(symbol: &str) -> ArbError {
    ArbError::Exchange {
        venue: "mock".into(),
        status: 400,
        message: format!("Invalid symbol {symbol}"),
    }
}

#[async_trait]
impl MarketData for MockExchange {
    async fn get_best_bid_ask(&self, symbol: &str) -> ArbResult<BookTicker> {
        self.check_error()?;
        self.tickers
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .ok_or_else(|| unknown_symbol(symbol))
    }

    async fn get_depth(&self, symbol: &str, depth_limit: u16) -> ArbResult<OrderBookSnapshot> {
        self.check_error()?;
        self.depth_requests
            .lock()
            .unwrap()
            .push((symbol.to_string(), depth_limit));

        let book = self
            .books
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .ok_or_else(|| unknown_symbol(symbol))?;
        let limit = depth_limit as usize;
        Ok(OrderBookSnapshot::new(
            book.asks.into_iter().take(limit).collect(),
            book.bids.into_iter().take(limit).collect(),
        ))
    }
}

#[async_trait]
impl OrderPlacer for MockExchange {
    async fn place_market_order(
        &self,
        symbol: &str,
        side: Side,
        amount: OrderAmount,
    ) -> ArbResult<OrderConfirmation> {
        if self.reject_symbol.lock().unwrap().as_deref() == Some(symbol) {
            return Err(ArbError::Exchange {
                venue: "mock".into(),
                status: 400,
                message: "Account has insufficient balance for requested action.".into(),
            });
        }

        let mut orders = self.orders.lock().unwrap();
        orders.push(PlacedOrder {
            symbol: symbol.to_string(),
            side,
            amount,
        });

        Ok(OrderConfirmation {
            order_id: format!("MOCK-{}", orders.len()),
            symbol: symbol.to_string(),
            side,
            amount,
            executed_quantity: amount.value(),
            status: "FILLED".to_string(),
            timestamp: Utc::now(),
        })
    }
}

#[async_trait]
impl ExchangeMetadata for MockExchange {
    async fn get_symbol_filters(&self, _symbol: &str) -> ArbResult<SymbolFilters> {
        Ok(SymbolFilters {
            step_size: dec!(0.00001),
            min_qty: dec!(0.00001),
            max_qty: dec!(1000000),
            quote_precision: 8,
            min_notional: Decimal::ZERO,
        })
    }
}
