//! Trade decision engine.
//!
//! Smooths profit samples with a short rolling window and decides whether a
//! sample should trigger leg placement. A trigger requires all of:
//!
//! 1. the debounce interval has elapsed since the previous trigger,
//! 2. the sample beats the smoothed reference,
//! 3. the reference itself clears the profit threshold.
//!
//! A rate-limit signal from the exchange additionally blocks triggers for
//! one full debounce interval.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::strategy::RollingWindow;
use crate::types::ProfitSample;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DecisionConfig {
    /// Samples averaged into the reference.
    pub short_window: usize,
    /// Samples retained for diagnostics.
    pub long_window: usize,
    /// Minimum time between two triggers.
    pub debounce: Duration,
    /// Reference must exceed this (base-asset quantity after the cycle).
    pub profit_threshold: Decimal,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            short_window: 5,
            long_window: 60,
            debounce: Duration::seconds(10),
            profit_threshold: Decimal::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// Trade gate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Cooling,
}

/// Debounce and threshold state. Only `DecisionEngine` mutates it.
#[derive(Debug, Clone)]
pub struct TradeGate {
    pub last_trigger_time: Option<DateTime<Utc>>,
    pub debounce_interval: Duration,
    pub profit_threshold: Decimal,
    /// Set by a rate-limit signal; no trigger before this instant.
    pub suppressed_until: Option<DateTime<Utc>>,
}

impl TradeGate {
    fn new(debounce_interval: Duration, profit_threshold: Decimal) -> Self {
        Self {
            last_trigger_time: None,
            debounce_interval,
            profit_threshold,
            suppressed_until: None,
        }
    }

    pub fn debounce_elapsed(&self, now: DateTime<Utc>) -> bool {
        match self.last_trigger_time {
            Some(last) => now - last >= self.debounce_interval,
            None => true,
        }
    }

    pub fn is_suppressed(&self, now: DateTime<Utc>) -> bool {
        self.suppressed_until.is_some_and(|until| now < until)
    }

    pub fn state(&self, now: DateTime<Utc>) -> GateState {
        if self.debounce_elapsed(now) && !self.is_suppressed(now) {
            GateState::Idle
        } else {
            GateState::Cooling
        }
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Why a sample did not trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    /// Inside the debounce interval of the previous trigger.
    Cooling,
    /// Inside the suppression window of a rate-limit signal.
    RateLimited,
    /// Window not yet full; the reference is the sample itself.
    WarmingUp,
    /// Sample did not beat the reference.
    BelowReference,
    /// Reference did not clear the profit threshold.
    ReferenceBelowThreshold,
}

impl fmt::Display for HoldReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HoldReason::Cooling => "cooling",
            HoldReason::RateLimited => "rate-limited",
            HoldReason::WarmingUp => "warming up",
            HoldReason::BelowReference => "below reference",
            HoldReason::ReferenceBelowThreshold => "reference below threshold",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerDecision {
    Trigger {
        profit: Decimal,
        reference: Decimal,
    },
    Hold {
        profit: Decimal,
        reference: Decimal,
        reason: HoldReason,
    },
}

impl TriggerDecision {
    pub fn is_trigger(&self) -> bool {
        matches!(self, TriggerDecision::Trigger { .. })
    }

    pub fn reference(&self) -> Decimal {
        match self {
            TriggerDecision::Trigger { reference, .. } | TriggerDecision::Hold { reference, .. } => {
                *reference
            }
        }
    }
}

/// Spread of the diagnostic history, logged alongside each observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistorySummary {
    pub samples: usize,
    pub low: Decimal,
    pub average: Decimal,
    pub high: Decimal,
}

impl fmt::Display for HistorySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} samples, min {} avg {} max {}",
            self.samples,
            self.low.round_dp(8).normalize(),
            self.average.round_dp(8).normalize(),
            self.high.round_dp(8).normalize()
        )
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct DecisionEngine {
    short_window_size: usize,
    window: RollingWindow,
    history: RollingWindow,
    gate: TradeGate,
}

impl DecisionEngine {
    pub fn new(config: DecisionConfig) -> Self {
        let short_window_size = config.short_window.max(1);
        Self {
            short_window_size,
            window: RollingWindow::new(short_window_size),
            history: RollingWindow::new(config.long_window.max(short_window_size)),
            gate: TradeGate::new(config.debounce, config.profit_threshold),
        }
    }

    pub fn gate(&self) -> &TradeGate {
        &self.gate
    }

    /// Samples feeding the reference average.
    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    /// Longer diagnostic history; never consulted for decisions.
    pub fn history(&self) -> &RollingWindow {
        &self.history
    }

    /// Min, mean and max profit over the diagnostic history.
    pub fn history_summary(&self) -> Option<HistorySummary> {
        let (low, high) = self.history.range()?;
        let average = self.history.average(self.history.len())?;
        Some(HistorySummary {
            samples: self.history.len(),
            low,
            average,
            high,
        })
    }

    /// Record a sample and decide whether it triggers. The sample's own
    /// timestamp is "now". On a trigger the debounce anchor moves to that
    /// instant before any order is placed, whatever the placement outcome.
    pub fn on_sample(&mut self, sample: &ProfitSample) -> TriggerDecision {
        let now = sample.timestamp;
        let profit = sample.implicit_profit;

        self.window.push(sample.clone());
        self.history.push(sample.clone());

        let warm = self.window.len() >= self.short_window_size;
        let reference = if warm {
            self.window.average(self.short_window_size).unwrap_or(profit)
        } else {
            profit
        };

        let hold = |reason| TriggerDecision::Hold {
            profit,
            reference,
            reason,
        };

        let decision = if self.gate.is_suppressed(now) {
            hold(HoldReason::RateLimited)
        } else if !self.gate.debounce_elapsed(now) {
            hold(HoldReason::Cooling)
        } else if !warm {
            hold(HoldReason::WarmingUp)
        } else if profit <= reference {
            hold(HoldReason::BelowReference)
        } else if reference <= self.gate.profit_threshold {
            hold(HoldReason::ReferenceBelowThreshold)
        } else {
            self.gate.last_trigger_time = Some(now);
            TriggerDecision::Trigger { profit, reference }
        };

        match &decision {
            TriggerDecision::Trigger { .. } => info!(
                profit = %profit,
                reference = %reference.round_dp(8),
                threshold = %self.gate.profit_threshold,
                "Trade triggered"
            ),
            TriggerDecision::Hold { reason, .. } => debug!(
                profit = %profit,
                reference = %reference.round_dp(8),
                reason = %reason,
                "No trigger"
            ),
        }

        decision
    }

    /// Block triggers for one debounce interval from `now`. The window is
    /// left as it was.
    pub fn note_rate_limited(&mut self, now: DateTime<Utc>) {
        let until = now + self.gate.debounce_interval;
        self.gate.suppressed_until = Some(
            self.gate
                .suppressed_until
                .map_or(until, |current| current.max(until)),
        );
        warn!(until = %until, "Rate limited; triggers suppressed");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
