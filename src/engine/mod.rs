//! Core engine — the fetch → estimate → decide → execute loop.

pub mod decision;
pub mod executor;
pub mod runner;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::strategy::ArbitrageCycle;
use crate::types::{ArbResult, ProfitSample};
use decision::{DecisionEngine, TriggerDecision};
use executor::{ExecutionReport, LegExecutor};
use runner::CycleRunner;

/// Per-run knobs that are not owned by a sub-component.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Base-asset quantity simulated (and traded) each cycle.
    pub base_quantity: Decimal,
    /// Step the depth limit up after a low-confidence sample.
    pub widen_depth_on_shallow: bool,
    /// Skip the depth fetch when the top-of-book rate is below this.
    pub quick_check_min_rate: Option<Decimal>,
}

/// What one `tick` did.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// Quick check below floor; no depth fetched, no state touched.
    Skipped { quick_rate: Option<Decimal> },
    /// Sample recorded, no trade.
    Observed {
        sample: ProfitSample,
        decision: TriggerDecision,
    },
    /// Sample triggered leg placement.
    Traded {
        sample: ProfitSample,
        decision: TriggerDecision,
        report: ExecutionReport,
    },
}

/// Drives one cycle per `tick`. Single writer: not meant to be shared
/// between concurrent loops.
pub struct ArbitrageEngine {
    cycle: ArbitrageCycle,
    runner: CycleRunner,
    decision: DecisionEngine,
    executor: LegExecutor,
    settings: EngineSettings,
}

impl ArbitrageEngine {
    pub fn new(
        cycle: ArbitrageCycle,
        runner: CycleRunner,
        decision: DecisionEngine,
        executor: LegExecutor,
        settings: EngineSettings,
    ) -> Self {
        Self {
            cycle,
            runner,
            decision,
            executor,
            settings,
        }
    }

    pub fn cycle(&self) -> &ArbitrageCycle {
        &self.cycle
    }

    pub fn decision(&self) -> &DecisionEngine {
        &self.decision
    }

    pub fn depth_limit(&self) -> u16 {
        self.runner.depth_limit()
    }

    /// Fetch the leg books and estimate the cycle. No engine state changes.
    pub async fn run_cycle(&self, base_quantity: Decimal) -> ArbResult<ProfitSample> {
        self.runner.run_cycle(&self.cycle, base_quantity).await
    }

    /// Feed a sample to the decision engine.
    pub fn on_sample(&mut self, sample: &ProfitSample) -> TriggerDecision {
        self.decision.on_sample(sample)
    }

    /// One pass of the decision loop at the current time.
    pub async fn tick(&mut self) -> ArbResult<CycleOutcome> {
        self.tick_at(Utc::now()).await
    }

    /// One pass of the decision loop at `now`.
    ///
    /// The sample is stamped with `now` and a rate-limit suppression is
    /// anchored there. Transport failures abort the pass before any sample
    /// is recorded; a rate-limit failure also suppresses triggers for one
    /// debounce interval. The error is returned so the caller owns retry
    /// policy.
    pub async fn tick_at(&mut self, now: DateTime<Utc>) -> ArbResult<CycleOutcome> {
        let result = self.tick_inner(now).await;
        if let Err(e) = &result {
            if e.is_rate_limited() {
                self.decision.note_rate_limited(now);
            }
        }
        result
    }

    async fn tick_inner(&mut self, now: DateTime<Utc>) -> ArbResult<CycleOutcome> {
        if let Some(floor) = self.settings.quick_check_min_rate {
            let quick_rate = self.runner.quick_rate(&self.cycle).await?;
            if quick_rate.map_or(true, |rate| rate < floor) {
                info!(quick_rate = ?quick_rate, floor = %floor, "Top-of-book rate below floor; skipping depth");
                return Ok(CycleOutcome::Skipped { quick_rate });
            }
        }

        let sample = self
            .runner
            .run_cycle_at(&self.cycle, self.settings.base_quantity, now)
            .await?;

        if sample.low_confidence() && self.settings.widen_depth_on_shallow {
            match self.runner.widen_depth() {
                Some(limit) => info!(depth_limit = limit, "Widening depth limit for next cycle"),
                None => warn!(
                    depth_limit = self.runner.depth_limit(),
                    "Book still too shallow at maximum depth limit"
                ),
            }
        }

        let decision = self.on_sample(&sample);
        if !decision.is_trigger() {
            return Ok(CycleOutcome::Observed { sample, decision });
        }

        let report = self.executor.execute(&self.cycle, &sample).await;
        Ok(CycleOutcome::Traded {
            sample,
            decision,
            report,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
