//! Rolling sample window: bounded FIFO of recent profit samples.

use std::collections::VecDeque;

use rust_decimal::Decimal;

use crate::types::ProfitSample;

#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    samples: VecDeque<ProfitSample>,
}

impl RollingWindow {
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a sample, evicting the oldest once full.
    pub fn push(&mut self, sample: ProfitSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Mean implicit profit over the `n` most recent samples, or over all
    /// of them when fewer than `n` are held. `None` when empty or `n == 0`.
    pub fn average(&self, n: usize) -> Option<Decimal> {
        let take = n.min(self.samples.len());
        if take == 0 {
            return None;
        }
        let sum: Decimal = self
            .samples
            .iter()
            .rev()
            .take(take)
            .map(|s| s.implicit_profit)
            .sum();
        Some(sum / Decimal::from(take))
    }

    /// Lowest and highest implicit profit held.
    pub fn range(&self) -> Option<(Decimal, Decimal)> {
        let mut profits = self.samples.iter().map(|s| s.implicit_profit);
        let first = profits.next()?;
        Some(profits.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    pub fn latest(&self) -> Option<&ProfitSample> {
        self.samples.back()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ProfitSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
