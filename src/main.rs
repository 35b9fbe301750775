//! TRIARB — Triangular arbitrage estimation and trade-decision engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the cycle and exchange client, and runs the
//! fetch→estimate→decide→execute loop with graceful shutdown.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use triarb::config::{self, AppConfig};
use triarb::engine::decision::{DecisionEngine, HistorySummary};
use triarb::engine::executor::{ExecutionReport, LegExecutor};
use triarb::engine::runner::CycleRunner;
use triarb::engine::{ArbitrageEngine, CycleOutcome, EngineSettings};
use triarb::exchange::binance::{BinanceClient, Credentials};
use triarb::strategy::{ArbitrageCycle, ProfitEstimator};
use triarb::types::Asset;

const BANNER: &str = r#"
 _____ ____  ___    _    ____  ____
|_   _|  _ \|_ _|  / \  |  _ \| __ )
  | | | |_) || |  / _ \ | |_) |  _ \
  | | |  _ < | | / ___ \|  _ <| |_) |
  |_| |_| \_\___/_/   \_\_| \_\____/

  Triangular arbitrage estimation and trade-decision engine
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::var("TRIARB_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let cfg = config::AppConfig::load(&config_path)?;

    init_logging();

    println!("{BANNER}");
    info!(
        agent_name = %cfg.agent.name,
        poll_interval_ms = cfg.agent.poll_interval_ms,
        dry_run = cfg.agent.dry_run,
        "TRIARB starting up"
    );

    // -- Cycle -----------------------------------------------------------

    let table = cfg.symbol_table()?;
    let cycle = ArbitrageCycle::build(
        &table,
        &Asset::new(cfg.cycle.base.as_str()),
        &Asset::new(cfg.cycle.quote.as_str()),
        &Asset::new(cfg.cycle.tertiary.as_str()),
    )
    .context("Failed to build arbitrage cycle")?;

    let [a, b, c] = cycle.symbols();
    info!(cycle = %cycle, leg_a = a, leg_b = b, leg_c = c, "Cycle resolved");

    // -- Exchange client -------------------------------------------------

    let credentials = load_credentials(&cfg)?;
    let client = Arc::new(
        BinanceClient::new(
            cfg.exchange.base_url.clone(),
            credentials,
            Duration::from_secs(cfg.exchange.timeout_secs),
        )?
        .with_recv_window(cfg.exchange.recv_window_ms),
    );
    info!(signed = client.has_credentials(), "Binance client ready");

    // -- Engine ----------------------------------------------------------

    let runner = CycleRunner::new(
        client.clone(),
        ProfitEstimator::new(cfg.cycle.fee_rate),
        cfg.cycle.depth_limit,
    )?;
    let decision = DecisionEngine::new(cfg.decision_config());
    let executor = LegExecutor::new(client.clone(), client.clone(), cfg.agent.dry_run);

    let mut engine = ArbitrageEngine::new(
        cycle,
        runner,
        decision,
        executor,
        EngineSettings {
            base_quantity: cfg.cycle.base_quantity,
            widen_depth_on_shallow: cfg.cycle.widen_depth_on_shallow,
            quick_check_min_rate: cfg.cycle.quick_check_min_rate,
        },
    );

    // -- Main loop -------------------------------------------------------

    let mut interval = tokio::time::interval(Duration::from_millis(cfg.agent.poll_interval_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        base_quantity = %cfg.cycle.base_quantity,
        profit_threshold = %cfg.profit_threshold(),
        "Entering main loop. Press Ctrl+C to stop."
    );

    let mut ticks: u64 = 0;
    let mut trades: u64 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                ticks += 1;
                match engine.tick().await {
                    Ok(outcome) => {
                        if matches!(outcome, CycleOutcome::Traded { .. }) {
                            trades += 1;
                        }
                        log_outcome(&outcome, engine.decision().history_summary());
                    }
                    Err(e) if e.is_configuration() => {
                        error!(error = %e, "Configuration error; stopping");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Cycle failed, continuing to next");
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!(ticks, trades, "TRIARB shut down cleanly.");
    Ok(())
}

/// Credentials are optional in dry-run mode.
fn load_credentials(cfg: &AppConfig) -> Result<Option<Credentials>> {
    let key = AppConfig::resolve_env(&cfg.exchange.api_key_env);
    let secret = AppConfig::resolve_env(&cfg.exchange.api_secret_env);

    match (key, secret) {
        (Ok(key), Ok(secret)) => Ok(Some(Credentials::new(key, secret))),
        (Err(e), _) | (_, Err(e)) => {
            if cfg.agent.dry_run {
                warn!("No exchange credentials configured; running in dry-run mode");
                Ok(None)
            } else {
                Err(e.context("Exchange credentials are required when dry_run = false"))
            }
        }
    }
}

fn log_outcome(outcome: &CycleOutcome, history: Option<HistorySummary>) {
    match outcome {
        CycleOutcome::Skipped { quick_rate } => {
            info!(quick_rate = ?quick_rate, "Cycle skipped by quick check");
        }
        CycleOutcome::Observed { sample, decision } => {
            info!(
                profit = %sample.implicit_profit,
                reference = %decision.reference().round_dp(8),
                low_confidence = sample.low_confidence(),
                history = %history.map(|h| h.to_string()).unwrap_or_default(),
                "{sample}"
            );
        }
        CycleOutcome::Traded { sample, report, .. } => {
            log_execution(sample.net_gain(), report);
        }
    }
}

fn log_execution(expected_gain: rust_decimal::Decimal, report: &ExecutionReport) {
    if report.is_complete() {
        info!(expected_gain = %expected_gain, "All three legs placed");
    } else {
        for failed in &report.failed {
            error!(
                leg = %failed.leg,
                symbol = %failed.symbol,
                error = %failed.error,
                skipped = report.skipped.len(),
                "Cycle left partially executed"
            );
        }
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("triarb=info"));

    let json_logging = std::env::var("TRIARB_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
