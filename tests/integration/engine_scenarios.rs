//! End-to-end engine scenarios against the mock exchange.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use triarb::engine::decision::{DecisionConfig, DecisionEngine, HoldReason, TriggerDecision};
use triarb::engine::executor::LegExecutor;
use triarb::engine::runner::CycleRunner;
use triarb::engine::{ArbitrageEngine, CycleOutcome, EngineSettings};
use triarb::strategy::{ArbitrageCycle, ProfitEstimator, SymbolTable};
use triarb::types::{ArbError, Asset, OrderAmount, Side};

use crate::mock_exchange::{level, MockExchange, PlacedOrder};

struct Harness {
    exchange: Arc<MockExchange>,
    fee_rate: Decimal,
    depth_limit: u16,
    dry_run: bool,
    settings: EngineSettings,
    decision: DecisionConfig,
}

impl Harness {
    fn new() -> Self {
        Self {
            exchange: Arc::new(MockExchange::new()),
            fee_rate: Decimal::ZERO,
            depth_limit: 5,
            dry_run: false,
            settings: EngineSettings {
                base_quantity: dec!(100),
                widen_depth_on_shallow: false,
                quick_check_min_rate: None,
            },
            decision: DecisionConfig {
                short_window: 2,
                long_window: 10,
                debounce: chrono::Duration::seconds(60),
                profit_threshold: dec!(100),
            },
        }
    }

    fn build(&self) -> ArbitrageEngine {
        let cycle = usdt_btc_eth().unwrap();
        let runner = CycleRunner::new(
            self.exchange.clone(),
            ProfitEstimator::new(self.fee_rate),
            self.depth_limit,
        )
        .unwrap();
        let executor = LegExecutor::new(self.exchange.clone(), self.exchange.clone(), self.dry_run);
        ArbitrageEngine::new(
            cycle,
            runner,
            DecisionEngine::new(self.decision.clone()),
            executor,
            self.settings.clone(),
        )
    }
}

fn usdt_btc_eth() -> Result<ArbitrageCycle, ArbError> {
    ArbitrageCycle::build(
        &SymbolTable::binance_defaults(),
        &Asset::new("USDT"),
        &Asset::new("BTC"),
        &Asset::new("ETH"),
    )
}

fn raise_eth_ask(exchange: &MockExchange, price: Decimal) {
    exchange.set_book(
        "ETHUSDT",
        vec![level(price, dec!(10))],
        vec![level(price - dec!(5), dec!(10))],
    );
}

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_end_to_end_estimate_with_fees() {
    let mut harness = Harness::new();
    harness.fee_rate = dec!(0.0005);
    let engine = harness.build();

    let sample = engine.run_cycle(dec!(100)).await.unwrap();

    assert_eq!(sample.legs_filled, [true; 3]);
    assert!(!sample.low_confidence());
    assert!(sample.implicit_profit > dec!(100.84));
    assert!(sample.implicit_profit < dec!(100.86));
    assert!(sample.leg_a_output < dec!(0.002));
}

#[test]
fn test_cycle_symbols_and_sides() {
    let cycle = usdt_btc_eth().unwrap();
    assert_eq!(cycle.symbols(), ["BTCUSDT", "ETHBTC", "ETHUSDT"]);
    assert_eq!(cycle.leg_a().side(), Side::Sell);
    assert_eq!(cycle.leg_b().side(), Side::Sell);
    assert_eq!(cycle.leg_c().side(), Side::Buy);
}

#[test]
fn test_unknown_pair_fails_at_build() {
    let err = ArbitrageCycle::build(
        &SymbolTable::binance_defaults(),
        &Asset::new("USDT"),
        &Asset::new("BTC"),
        &Asset::new("XRP"),
    )
    .unwrap_err();
    assert!(matches!(err, ArbError::UnknownPair { .. }));
    assert!(err.is_configuration());
}

// ---------------------------------------------------------------------------
// Decisions and execution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_rising_profit_triggers_three_orders() {
    let harness = Harness::new();
    let mut engine = harness.build();

    // 101: window still warming up
    let first = engine.tick().await.unwrap();
    assert!(matches!(
        first,
        CycleOutcome::Observed {
            decision: TriggerDecision::Hold { reason: HoldReason::WarmingUp, .. },
            ..
        }
    ));

    // 102 against a reference of 101.5
    raise_eth_ask(&harness.exchange, dec!(2550));
    let second = engine.tick().await.unwrap();
    match second {
        CycleOutcome::Traded { sample, decision, report } => {
            assert_eq!(sample.implicit_profit, dec!(102));
            assert_eq!(decision.reference(), dec!(101.5));
            assert!(report.is_complete());
        }
        other => panic!("expected a trade, got {other:?}"),
    }

    assert_eq!(
        harness.exchange.orders(),
        vec![
            PlacedOrder {
                symbol: "BTCUSDT".into(),
                side: Side::Sell,
                amount: OrderAmount::Quote(dec!(100)),
            },
            PlacedOrder {
                symbol: "ETHBTC".into(),
                side: Side::Sell,
                amount: OrderAmount::Quote(dec!(0.002)),
            },
            PlacedOrder {
                symbol: "ETHUSDT".into(),
                side: Side::Buy,
                amount: OrderAmount::Base(dec!(0.04)),
            },
        ]
    );

    // Still qualifying, but inside the debounce interval
    raise_eth_ask(&harness.exchange, dec!(2600));
    let third = engine.tick().await.unwrap();
    assert!(matches!(
        third,
        CycleOutcome::Observed {
            decision: TriggerDecision::Hold { reason: HoldReason::Cooling, .. },
            ..
        }
    ));
    assert_eq!(harness.exchange.orders().len(), 3);
}

#[tokio::test]
async fn test_each_leg_is_sized_in_the_asset_it_spends() {
    let harness = Harness::new();
    let mut engine = harness.build();

    engine.tick().await.unwrap();
    raise_eth_ask(&harness.exchange, dec!(2550));
    engine.tick().await.unwrap();

    let orders = harness.exchange.orders();
    // USDT -> BTC on BTCUSDT spends the quote asset
    assert_eq!(orders[0].amount.param(), "quoteOrderQty");
    assert_eq!(orders[0].amount.value(), dec!(100));
    // BTC -> ETH on ETHBTC spends the quote asset
    assert_eq!(orders[1].amount.param(), "quoteOrderQty");
    // ETH -> USDT on ETHUSDT spends the base asset
    assert_eq!(orders[2].amount.param(), "quantity");
}

#[tokio::test]
async fn test_flat_profit_never_triggers() {
    let harness = Harness::new();
    let mut engine = harness.build();

    for _ in 0..5 {
        let outcome = engine.tick().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Observed { .. }));
    }
    assert!(harness.exchange.orders().is_empty());
    assert!(engine.decision().gate().last_trigger_time.is_none());
}

#[tokio::test]
async fn test_rejected_leg_leaves_cycle_partial() {
    let harness = Harness::new();
    harness.exchange.reject_orders_for("ETHBTC");
    let mut engine = harness.build();

    engine.tick().await.unwrap();
    raise_eth_ask(&harness.exchange, dec!(2550));
    let outcome = engine.tick().await.unwrap();

    let CycleOutcome::Traded { report, .. } = outcome else {
        panic!("expected a trade");
    };
    assert_eq!(report.executed.len(), 1);
    assert_eq!(report.failed[0].symbol, "ETHBTC");
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(harness.exchange.orders().len(), 1);
    // The trigger still counts towards the debounce
    assert!(engine.decision().gate().last_trigger_time.is_some());
}

#[tokio::test]
async fn test_dry_run_places_nothing() {
    let mut harness = Harness::new();
    harness.dry_run = true;
    let mut engine = harness.build();

    engine.tick().await.unwrap();
    raise_eth_ask(&harness.exchange, dec!(2550));
    let outcome = engine.tick().await.unwrap();

    assert!(matches!(outcome, CycleOutcome::Traded { ref report, .. } if report.is_complete()));
    assert!(harness.exchange.orders().is_empty());
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_rate_limit_suppresses_following_triggers() {
    let harness = Harness::new();
    let mut engine = harness.build();

    harness.exchange.set_error(ArbError::RateLimited {
        venue: "mock".into(),
        retry_after_secs: Some(30),
    });
    let err = engine.tick().await.unwrap_err();
    assert!(err.is_rate_limited());
    assert!(engine.decision().window().is_empty());
    assert!(engine.decision().gate().suppressed_until.is_some());

    harness.exchange.clear_error();
    engine.tick().await.unwrap();
    raise_eth_ask(&harness.exchange, dec!(2550));
    let outcome = engine.tick().await.unwrap();

    assert!(matches!(
        outcome,
        CycleOutcome::Observed {
            decision: TriggerDecision::Hold { reason: HoldReason::RateLimited, .. },
            ..
        }
    ));
    assert!(harness.exchange.orders().is_empty());
}

#[tokio::test]
async fn test_transport_error_skips_sample() {
    let harness = Harness::new();
    let mut engine = harness.build();

    harness.exchange.set_error(ArbError::Transport {
        venue: "mock".into(),
        message: "connection refused".into(),
    });
    assert!(engine.tick().await.is_err());
    assert!(engine.decision().window().is_empty());
    assert!(engine.decision().history().is_empty());
    assert!(engine.decision().gate().suppressed_until.is_none());
}

// ---------------------------------------------------------------------------
// Depth handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_shallow_book_widens_depth_limit() {
    let mut harness = Harness::new();
    harness.settings.widen_depth_on_shallow = true;
    // 0.001 BTC at 50000 absorbs only 50 USDT
    harness.exchange.set_book(
        "BTCUSDT",
        vec![level(dec!(50010), dec!(2))],
        vec![level(dec!(50000), dec!(0.001))],
    );
    let mut engine = harness.build();

    let outcome = engine.tick().await.unwrap();
    let CycleOutcome::Observed { sample, .. } = outcome else {
        panic!("expected an observation");
    };
    assert!(sample.low_confidence());
    assert_eq!(sample.legs_filled, [false, true, true]);
    assert_eq!(engine.depth_limit(), 10);

    engine.tick().await.unwrap();
    let requests = harness.exchange.depth_requests();
    assert!(requests[..3].iter().all(|(_, limit)| *limit == 5));
    assert!(requests[3..].iter().all(|(_, limit)| *limit == 10));
}

#[tokio::test]
async fn test_quick_check_gates_depth_fetch() {
    let mut harness = Harness::new();
    // Top-of-book rate is exactly 1.01
    harness.settings.quick_check_min_rate = Some(dec!(1.02));
    let mut engine = harness.build();

    let outcome = engine.tick().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Skipped { quick_rate: Some(r) } if r == dec!(1.01)));
    assert!(harness.exchange.depth_requests().is_empty());

    harness.settings.quick_check_min_rate = Some(dec!(1.005));
    let mut engine = harness.build();
    let outcome = engine.tick().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Observed { .. }));
    assert_eq!(harness.exchange.depth_requests().len(), 3);
}
