//! Binance spot REST integration.
//!
//! Public market data (depth, book ticker, exchange info) plus signed
//! market order placement.
//!
//! API docs: https://binance-docs.github.io/apidocs/spot/en/
//! Base URL: https://api.binance.com
//! Rate limits: HTTP 429 when a weight limit is hit, HTTP 418 once the IP
//! has been banned for ignoring 429s. Both carry a `Retry-After` header.
//! Auth: `X-MBX-APIKEY` header; signed endpoints add an HMAC-SHA256
//! `signature` over the query string.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{ExchangeMetadata, MarketData, OrderPlacer};
use crate::types::{
    ArbError, ArbResult, BookTicker, OrderAmount, OrderBookSnapshot, OrderConfirmation, OrderLevel,
    Side, SymbolFilters,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
const VENUE: &str = "binance";

/// Default `recvWindow` for signed requests (ms).
const DEFAULT_RECV_WINDOW_MS: u64 = 5_000;

/// Used when `exchangeInfo` omits `quoteAssetPrecision`.
const DEFAULT_QUOTE_PRECISION: u32 = 8;

/// API key and secret for signed endpoints.
pub struct Credentials {
    pub api_key: String,
    pub api_secret: SecretString,
}

impl Credentials {
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret: SecretString::new(api_secret),
        }
    }
}

// ---------------------------------------------------------------------------
// API response types (Binance JSON → Rust)
// ---------------------------------------------------------------------------

/// `/api/v3/depth` — levels are `[price, qty]` string pairs.
#[derive(Debug, Deserialize)]
struct DepthResponse {
    bids: Vec<(String, String)>,
    asks: Vec<(String, String)>,
}

/// `/api/v3/ticker/bookTicker`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookTickerResponse {
    bid_price: String,
    ask_price: String,
}

/// `/api/v3/exchangeInfo`
#[derive(Debug, Deserialize)]
struct ExchangeInfoResponse {
    symbols: Vec<ExchangeSymbol>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeSymbol {
    symbol: String,
    #[serde(default)]
    quote_asset_precision: Option<u32>,
    #[serde(default)]
    filters: Vec<ExchangeFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeFilter {
    filter_type: String,
    #[serde(default)]
    min_qty: Option<String>,
    #[serde(default)]
    max_qty: Option<String>,
    #[serde(default)]
    step_size: Option<String>,
    /// `NOTIONAL` / legacy `MIN_NOTIONAL`.
    #[serde(default)]
    min_notional: Option<String>,
}

/// `POST /api/v3/order` (FULL/RESULT response).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    symbol: String,
    order_id: i64,
    #[serde(default)]
    status: String,
    #[serde(default)]
    executed_qty: Option<String>,
    #[serde(default)]
    transact_time: Option<i64>,
}

/// Error body: `{"code": -1013, "msg": "Filter failure: LOT_SIZE"}`.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Binance spot client implementing all three collaborator traits.
pub struct BinanceClient {
    http: Client,
    base_url: String,
    credentials: Option<Credentials>,
    recv_window_ms: u64,
    filters: RwLock<HashMap<String, SymbolFilters>>,
}

impl BinanceClient {
    /// Create a new client.
    ///
    /// `credentials` are only needed for placing orders; market data and
    /// exchange info are public.
    pub fn new(
        base_url: Option<String>,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> ArbResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("TRIARB/0.1.0 (triangular-arbitrage-engine)")
            .build()
            .map_err(|e| ArbError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            credentials,
            recv_window_ms: DEFAULT_RECV_WINDOW_MS,
            filters: RwLock::new(HashMap::new()),
        })
    }

    pub fn with_recv_window(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    // -- Internal helpers ------------------------------------------------

    /// Send a request and turn transport failures and non-2xx statuses
    /// into typed errors.
    async fn send(&self, request: RequestBuilder, what: &str) -> ArbResult<Response> {
        let resp = request.send().await.map_err(|e| ArbError::Transport {
            venue: VENUE.to_string(),
            message: format!("{what}: {e}"),
        })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::IM_A_TEAPOT {
            let retry_after_secs = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            warn!(status = %status, retry_after_secs = ?retry_after_secs, what, "Binance rate limit hit");
            return Err(ArbError::RateLimited {
                venue: VENUE.to_string(),
                retry_after_secs,
            });
        }

        let body = resp.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(err) => format!("{what}: code {} {}", err.code, err.msg),
            Err(_) => format!("{what}: {body}"),
        };
        Err(ArbError::Exchange {
            venue: VENUE.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> ArbResult<T> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, ?query, "Binance GET");

        let mut request = self.http.get(&url).query(query);
        if let Some(creds) = &self.credentials {
            request = request.header("X-MBX-APIKEY", &creds.api_key);
        }

        let resp = self.send(request, what).await?;
        resp.json::<T>().await.map_err(|e| ArbError::Decode {
            what: what.to_string(),
            message: e.to_string(),
        })
    }

    /// HMAC-SHA256 of `payload` with the API secret, hex encoded.
    fn sign(secret: &SecretString, payload: &str) -> ArbResult<String> {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
            .map_err(|e| ArbError::Config(format!("invalid API secret: {e}")))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn fetch_filters(&self, symbol: &str) -> ArbResult<SymbolFilters> {
        let info: ExchangeInfoResponse = self
            .get_json(
                "/api/v3/exchangeInfo",
                &[("symbol", symbol.to_string())],
                "exchangeInfo",
            )
            .await?;

        let entry = info
            .symbols
            .into_iter()
            .find(|s| s.symbol == symbol)
            .ok_or_else(|| ArbError::Config(format!("symbol {symbol} not listed on Binance")))?;

        symbol_filters(entry)
    }
}

/// Order size rules from one `exchangeInfo` symbol entry.
fn symbol_filters(entry: ExchangeSymbol) -> ArbResult<SymbolFilters> {
    let quote_precision = entry.quote_asset_precision.unwrap_or(DEFAULT_QUOTE_PRECISION);
    let mut lot = None;
    let mut min_notional = Decimal::ZERO;

    for filter in entry.filters {
        match filter.filter_type.as_str() {
            "LOT_SIZE" => lot = Some(filter),
            "NOTIONAL" | "MIN_NOTIONAL" => {
                if let Some(raw) = filter.min_notional {
                    min_notional = min_notional.max(parse_decimal(&raw, "minNotional")?);
                }
            }
            _ => {}
        }
    }

    let lot = lot.ok_or_else(|| {
        decode_err("exchangeInfo", format!("no LOT_SIZE filter for {}", entry.symbol))
    })?;

    Ok(SymbolFilters {
        step_size: parse_opt(lot.step_size, "stepSize")?,
        min_qty: parse_opt(lot.min_qty, "minQty")?,
        max_qty: parse_opt(lot.max_qty, "maxQty")?,
        quote_precision,
        min_notional,
    })
}

/// Unsigned query string of a MARKET order.
fn order_query(
    symbol: &str,
    side: Side,
    amount: OrderAmount,
    recv_window_ms: u64,
    timestamp_ms: i64,
) -> String {
    format!(
        "symbol={symbol}&side={side}&type=MARKET&{}={}&newOrderRespType=RESULT&recvWindow={recv_window_ms}&timestamp={timestamp_ms}",
        amount.param(),
        amount.value().normalize(),
    )
}

fn decode_err(what: &str, message: String) -> ArbError {
    ArbError::Decode {
        what: what.to_string(),
        message,
    }
}

fn parse_decimal(raw: &str, field: &str) -> ArbResult<Decimal> {
    Decimal::from_str(raw).map_err(|e| decode_err(field, format!("{raw:?}: {e}")))
}

fn parse_opt(raw: Option<String>, field: &str) -> ArbResult<Decimal> {
    let raw = raw.ok_or_else(|| decode_err(field, "missing".to_string()))?;
    parse_decimal(&raw, field)
}

/// Parse `[price, qty]` pairs, dropping levels that are not strictly positive.
fn parse_levels(raw: &[(String, String)]) -> ArbResult<Vec<OrderLevel>> {
    let mut levels = Vec::with_capacity(raw.len());
    for (price, qty) in raw {
        let level = OrderLevel::new(parse_decimal(price, "price")?, parse_decimal(qty, "qty")?);
        if level.price > Decimal::ZERO && level.quantity > Decimal::ZERO {
            levels.push(level);
        }
    }
    Ok(levels)
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl MarketData for BinanceClient {
    async fn get_best_bid_ask(&self, symbol: &str) -> ArbResult<BookTicker> {
        let t: BookTickerResponse = self
            .get_json(
                "/api/v3/ticker/bookTicker",
                &[("symbol", symbol.to_string())],
                "bookTicker",
            )
            .await?;

        Ok(BookTicker {
            bid_price: parse_decimal(&t.bid_price, "bidPrice")?,
            ask_price: parse_decimal(&t.ask_price, "askPrice")?,
        })
    }

    async fn get_depth(&self, symbol: &str, depth_limit: u16) -> ArbResult<OrderBookSnapshot> {
        let depth: DepthResponse = self
            .get_json(
                "/api/v3/depth",
                &[
                    ("symbol", symbol.to_string()),
                    ("limit", depth_limit.to_string()),
                ],
                "depth",
            )
            .await?;

        let snapshot = OrderBookSnapshot::new(parse_levels(&depth.asks)?, parse_levels(&depth.bids)?);
        debug!(
            symbol,
            asks = snapshot.asks.len(),
            bids = snapshot.bids.len(),
            "Depth snapshot fetched"
        );
        Ok(snapshot)
    }
}

#[async_trait]
impl OrderPlacer for BinanceClient {
    async fn place_market_order(
        &self,
        symbol: &str,
        side: Side,
        amount: OrderAmount,
    ) -> ArbResult<OrderConfirmation> {
        let creds = self.credentials.as_ref().ok_or_else(|| {
            ArbError::Config("Binance API credentials required to place orders".to_string())
        })?;

        let query = order_query(
            symbol,
            side,
            amount,
            self.recv_window_ms,
            Utc::now().timestamp_millis(),
        );
        let signature = Self::sign(&creds.api_secret, &query)?;
        let url = format!("{}/api/v3/order?{query}&signature={signature}", self.base_url);

        info!(symbol, side = %side, amount = %amount, "Placing market order");

        let request = self.http.post(&url).header("X-MBX-APIKEY", &creds.api_key);
        let resp = self.send(request, "order").await?;
        let order: OrderResponse = resp.json().await.map_err(|e| ArbError::Decode {
            what: "order".to_string(),
            message: e.to_string(),
        })?;

        let executed_quantity = match order.executed_qty {
            Some(raw) => parse_decimal(&raw, "executedQty")?,
            None => Decimal::ZERO,
        };
        let timestamp = order
            .transact_time
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now);

        Ok(OrderConfirmation {
            order_id: order.order_id.to_string(),
            symbol: order.symbol,
            side,
            amount,
            executed_quantity,
            status: order.status,
            timestamp,
        })
    }
}

#[async_trait]
impl ExchangeMetadata for BinanceClient {
    /// Cached after the first successful fetch per symbol.
    async fn get_symbol_filters(&self, symbol: &str) -> ArbResult<SymbolFilters> {
        if let Some(filters) = self.filters.read().await.get(symbol) {
            return Ok(*filters);
        }

        let filters = self.fetch_filters(symbol).await?;
        self.filters.write().await.insert(symbol.to_string(), filters);
        debug!(symbol, ?filters, "Symbol filters cached");
        Ok(filters)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
