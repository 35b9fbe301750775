//! Leg executor.
//!
//! Places the three market orders of a triggered cycle in order A, B, C.
//! Each leg spends its input in the leg's `from` asset: sized with
//! `quoteOrderQty` when that asset is the symbol's quote, with `quantity`
//! when it is the base, and rounded down to the symbol's rules. The first
//! failing leg stops the sequence; legs are not atomic and a partial cycle
//! is reported rather than unwound.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::exchange::{ExchangeMetadata, OrderPlacer};
use crate::strategy::{ArbitrageCycle, Leg};
use crate::types::{
    ArbError, ArbResult, OrderAmount, OrderConfirmation, PairBinding, ProfitSample, Side,
};

// ---------------------------------------------------------------------------
// Execution result
// ---------------------------------------------------------------------------

/// Result of executing one cycle.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub executed: Vec<ExecutedLeg>,
    pub failed: Vec<FailedLeg>,
    /// Legs never attempted because an earlier leg failed.
    pub skipped: Vec<Leg>,
}

impl ExecutionReport {
    /// All three legs went through.
    pub fn is_complete(&self) -> bool {
        self.executed.len() == 3
    }
}

#[derive(Debug, Clone)]
pub struct ExecutedLeg {
    pub leg: Leg,
    pub symbol: String,
    pub side: Side,
    pub amount: OrderAmount,
    pub confirmation: OrderConfirmation,
}

#[derive(Debug, Clone)]
pub struct FailedLeg {
    pub leg: Leg,
    pub symbol: String,
    pub error: ArbError,
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct LegExecutor {
    placer: Arc<dyn OrderPlacer>,
    metadata: Arc<dyn ExchangeMetadata>,
    dry_run: bool,
}

impl LegExecutor {
    pub fn new(
        placer: Arc<dyn OrderPlacer>,
        metadata: Arc<dyn ExchangeMetadata>,
        dry_run: bool,
    ) -> Self {
        Self {
            placer,
            metadata,
            dry_run,
        }
    }

    /// Execute the cycle sized by `sample`.
    ///
    /// Leg inputs are the sample's base quantity and its leg A / leg B
    /// outputs, each expressed in the leg's `from` asset.
    pub async fn execute(&self, cycle: &ArbitrageCycle, sample: &ProfitSample) -> ExecutionReport {
        let inputs = [sample.base_quantity, sample.leg_a_output, sample.leg_b_output];
        let mut report = ExecutionReport::default();

        info!(cycle = %cycle, dry_run = self.dry_run, "Executing cycle");

        for (leg, input) in Leg::ALL.into_iter().zip(inputs) {
            if !report.failed.is_empty() {
                report.skipped.push(leg);
                continue;
            }

            let binding = cycle.leg(leg);
            match self.execute_leg(binding, input).await {
                Ok((amount, confirmation)) => {
                    info!(
                        leg = %leg,
                        symbol = %binding.symbol,
                        side = %binding.side(),
                        amount = %amount,
                        order_id = %confirmation.order_id,
                        "Leg placed"
                    );
                    report.executed.push(ExecutedLeg {
                        leg,
                        symbol: binding.symbol.name.clone(),
                        side: binding.side(),
                        amount,
                        confirmation,
                    });
                }
                Err(error) => {
                    warn!(
                        leg = %leg,
                        symbol = %binding.symbol,
                        error = %error,
                        "Leg placement failed; remaining legs skipped"
                    );
                    report.failed.push(FailedLeg {
                        leg,
                        symbol: binding.symbol.name.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            executed = report.executed.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Cycle execution complete"
        );

        report
    }

    async fn execute_leg(
        &self,
        binding: &PairBinding,
        input: Decimal,
    ) -> ArbResult<(OrderAmount, OrderConfirmation)> {
        let symbol = binding.symbol.name.as_str();
        let amount = self.tradable_amount(symbol, binding.order_amount(input)).await?;
        let side = binding.side();

        if self.dry_run {
            info!(symbol, side = %side, amount = %amount, "[DRY RUN] Would place market order");
            return Ok((amount, OrderConfirmation::dry_run(symbol, side, amount)));
        }

        let confirmation = self.placer.place_market_order(symbol, side, amount).await?;
        Ok((amount, confirmation))
    }

    /// Round to the symbol's rules and reject what the exchange would.
    async fn tradable_amount(&self, symbol: &str, requested: OrderAmount) -> ArbResult<OrderAmount> {
        let filters = self.metadata.get_symbol_filters(symbol).await?;
        let amount = filters.round_amount(requested);

        if let Some(reason) = filters.rejection(amount) {
            return Err(ArbError::InvalidQuantity {
                symbol: symbol.to_string(),
                quantity: amount.value(),
                reason: format!("{reason} (requested {requested})"),
            });
        }
        Ok(amount)
    }
}

// ---------------------------------------------------------------------------
// OrderConfirmation helpers
// ---------------------------------------------------------------------------

impl OrderConfirmation {
    /// A confirmation for an order that was only logged.
    pub fn dry_run(symbol: &str, side: Side, amount: OrderAmount) -> Self {
        Self {
            order_id: format!("dry-run-{}", uuid::Uuid::new_v4()),
            symbol: symbol.to_string(),
            side,
            amount,
            executed_quantity: Decimal::ZERO,
            status: "DRY_RUN".to_string(),
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
