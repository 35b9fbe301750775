//! Profit estimator.
//!
//! Walks the three leg books in sequence, deducting the trading fee after
//! every leg, to find how much base asset a full cycle returns. Also offers
//! a cheap top-of-book rate used as a pre-filter before fetching depth.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::cycle::{ArbitrageCycle, Leg};
use super::walker::walk;
use crate::types::{BookTicker, OrderBookSnapshot, PairBinding, ProfitSample};

/// Depth snapshots for the three legs, in leg order.
#[derive(Debug, Clone, Default)]
pub struct LegSnapshots {
    pub leg_a: OrderBookSnapshot,
    pub leg_b: OrderBookSnapshot,
    pub leg_c: OrderBookSnapshot,
}

impl LegSnapshots {
    pub fn get(&self, leg: Leg) -> &OrderBookSnapshot {
        match leg {
            Leg::A => &self.leg_a,
            Leg::B => &self.leg_b,
            Leg::C => &self.leg_c,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfitEstimator {
    fee_rate: Decimal,
}

impl ProfitEstimator {
    pub fn new(fee_rate: Decimal) -> Self {
        Self { fee_rate }
    }

    fn after_fee(&self, quantity: Decimal) -> Decimal {
        quantity * (Decimal::ONE - self.fee_rate)
    }

    /// Simulate the cycle against `snapshots`, stamped with the current time.
    pub fn estimate(
        &self,
        cycle: &ArbitrageCycle,
        base_quantity: Decimal,
        snapshots: &LegSnapshots,
    ) -> ProfitSample {
        self.estimate_at(cycle, base_quantity, snapshots, Utc::now())
    }

    /// Simulate the cycle with an explicit sample timestamp.
    pub fn estimate_at(
        &self,
        cycle: &ArbitrageCycle,
        base_quantity: Decimal,
        snapshots: &LegSnapshots,
        timestamp: DateTime<Utc>,
    ) -> ProfitSample {
        let mut quantity = base_quantity;
        let mut outputs = [Decimal::ZERO; 3];
        let mut legs_filled = [true; 3];

        for (i, leg) in Leg::ALL.into_iter().enumerate() {
            let binding = cycle.leg(leg);
            let fill = walk(snapshots.get(leg), quantity, binding.inverted);
            if !fill.fully_filled {
                warn!(
                    leg = %leg,
                    symbol = %binding.symbol,
                    input = %quantity,
                    "Not enough order book depth to fill leg; consider a deeper depth limit"
                );
            }
            quantity = self.after_fee(fill.output_quantity);
            outputs[i] = quantity;
            legs_filled[i] = fill.fully_filled;
        }

        let sample = ProfitSample {
            base_quantity,
            leg_a_output: outputs[0],
            leg_b_output: outputs[1],
            implicit_profit: outputs[2],
            legs_filled,
            timestamp,
        };
        debug!(cycle = %cycle, sample = %sample, "Cycle estimated");
        sample
    }

    /// Cycle conversion rate from best bid/ask alone, net of fees.
    ///
    /// Each leg converts at the ask (non-inverted) or at `1 / bid`
    /// (inverted), matching the first level the walker would consume.
    /// Returns `None` when a required price is not positive or the product
    /// overflows.
    pub fn quick_cycle_rate(&self, cycle: &ArbitrageCycle, tickers: &[BookTicker; 3]) -> Option<Decimal> {
        let mut rate = Decimal::ONE;
        for (binding, ticker) in cycle.legs().into_iter().zip(tickers) {
            rate = self.after_fee(rate.checked_mul(leg_rate(binding, ticker)?)?);
        }
        Some(rate)
    }
}

fn leg_rate(binding: &PairBinding, ticker: &BookTicker) -> Option<Decimal> {
    if binding.inverted {
        (ticker.bid_price > Decimal::ZERO)
            .then(|| Decimal::ONE.checked_div(ticker.bid_price))
            .flatten()
    } else {
        (ticker.ask_price > Decimal::ZERO).then_some(ticker.ask_price)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
