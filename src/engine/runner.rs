//! Cycle runner: fetches the three leg books concurrently and feeds them to
//! the profit estimator.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::exchange::MarketData;
use crate::strategy::{ArbitrageCycle, LegSnapshots, ProfitEstimator};
use crate::types::{ArbError, ArbResult, BookTicker, ProfitSample};

/// Depth limits the exchange accepts, ascending.
pub const VALID_DEPTH_LIMITS: [u16; 7] = [5, 10, 20, 50, 100, 500, 1000];

pub fn is_valid_depth_limit(limit: u16) -> bool {
    VALID_DEPTH_LIMITS.contains(&limit)
}

/// The next deeper valid limit, if any.
pub fn next_depth_limit(current: u16) -> Option<u16> {
    VALID_DEPTH_LIMITS.iter().copied().find(|&l| l > current)
}

/// Fetch depth for all three legs at once. The first failure wins.
pub async fn fetch_snapshots(
    market: &dyn MarketData,
    cycle: &ArbitrageCycle,
    depth_limit: u16,
) -> ArbResult<LegSnapshots> {
    let [a, b, c] = cycle.symbols();
    let (leg_a, leg_b, leg_c) = futures::try_join!(
        market.get_depth(a, depth_limit),
        market.get_depth(b, depth_limit),
        market.get_depth(c, depth_limit),
    )?;
    Ok(LegSnapshots { leg_a, leg_b, leg_c })
}

/// Fetch best bid/ask for all three legs at once.
pub async fn fetch_tickers(
    market: &dyn MarketData,
    cycle: &ArbitrageCycle,
) -> ArbResult<[BookTicker; 3]> {
    let [a, b, c] = cycle.symbols();
    let (ta, tb, tc) = futures::try_join!(
        market.get_best_bid_ask(a),
        market.get_best_bid_ask(b),
        market.get_best_bid_ask(c),
    )?;
    Ok([ta, tb, tc])
}

pub struct CycleRunner {
    market: Arc<dyn MarketData>,
    estimator: ProfitEstimator,
    depth_limit: u16,
}

impl CycleRunner {
    pub fn new(market: Arc<dyn MarketData>, estimator: ProfitEstimator, depth_limit: u16) -> ArbResult<Self> {
        if !is_valid_depth_limit(depth_limit) {
            return Err(ArbError::Config(format!(
                "depth limit {depth_limit} not one of {VALID_DEPTH_LIMITS:?}"
            )));
        }
        Ok(Self {
            market,
            estimator,
            depth_limit,
        })
    }

    pub fn depth_limit(&self) -> u16 {
        self.depth_limit
    }

    /// Step up to the next valid depth limit. Returns the new limit, or
    /// `None` when already at the deepest.
    pub fn widen_depth(&mut self) -> Option<u16> {
        let next = next_depth_limit(self.depth_limit)?;
        self.depth_limit = next;
        Some(next)
    }

    /// Fetch the three books and simulate the cycle for `base_quantity`.
    pub async fn run_cycle(&self, cycle: &ArbitrageCycle, base_quantity: Decimal) -> ArbResult<ProfitSample> {
        self.run_cycle_at(cycle, base_quantity, Utc::now()).await
    }

    /// As [`run_cycle`](Self::run_cycle), stamping the sample with `now`.
    pub async fn run_cycle_at(
        &self,
        cycle: &ArbitrageCycle,
        base_quantity: Decimal,
        now: DateTime<Utc>,
    ) -> ArbResult<ProfitSample> {
        let snapshots = fetch_snapshots(self.market.as_ref(), cycle, self.depth_limit).await?;
        debug!(
            depth_limit = self.depth_limit,
            a = snapshots.leg_a.asks.len() + snapshots.leg_a.bids.len(),
            b = snapshots.leg_b.asks.len() + snapshots.leg_b.bids.len(),
            c = snapshots.leg_c.asks.len() + snapshots.leg_c.bids.len(),
            "Leg books fetched"
        );
        Ok(self.estimator.estimate_at(cycle, base_quantity, &snapshots, now))
    }

    /// Top-of-book cycle rate net of fees; `None` when a quote is unusable.
    pub async fn quick_rate(&self, cycle: &ArbitrageCycle) -> ArbResult<Option<Decimal>> {
        let tickers = fetch_tickers(self.market.as_ref(), cycle).await?;
        Ok(self.estimator.quick_cycle_rate(cycle, &tickers))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
