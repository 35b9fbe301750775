//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Exchange credentials are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`.

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;

use crate::engine::decision::DecisionConfig;
use crate::engine::runner::{is_valid_depth_limit, VALID_DEPTH_LIMITS};
use crate::strategy::SymbolTable;
use crate::types::{Asset, CanonicalSymbol};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub exchange: ExchangeConfig,
    pub cycle: CycleConfig,
    pub decision: DecisionSection,
    /// Canonical symbols; the built-in Binance set is used when empty.
    #[serde(default)]
    pub symbols: Vec<SymbolEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub poll_interval_ms: u64,
    /// Log orders instead of sending them.
    #[serde(default = "default_true")]
    pub dry_run: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExchangeConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    pub api_key_env: String,
    pub api_secret_env: String,
    #[serde(default = "default_recv_window_ms")]
    pub recv_window_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CycleConfig {
    pub base: String,
    pub quote: String,
    pub tertiary: String,
    pub base_quantity: Decimal,
    #[serde(default = "default_depth_limit")]
    pub depth_limit: u16,
    #[serde(default)]
    pub fee_rate: Decimal,
    #[serde(default)]
    pub widen_depth_on_shallow: bool,
    #[serde(default)]
    pub quick_check_min_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DecisionSection {
    pub short_window: usize,
    pub long_window: usize,
    pub debounce_secs: u64,
    /// Required gain over `base_quantity`, in base-asset units.
    #[serde(default)]
    pub min_profit: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SymbolEntry {
    pub name: String,
    pub base: String,
    pub quote: String,
}

fn default_true() -> bool {
    true
}

fn default_recv_window_ms() -> u64 {
    5_000
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_depth_limit() -> u16 {
    100
}

impl AppConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("Invalid config file: {path}"))?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_depth_limit(self.cycle.depth_limit) {
            bail!(
                "cycle.depth_limit {} must be one of {:?}",
                self.cycle.depth_limit,
                VALID_DEPTH_LIMITS
            );
        }
        if self.cycle.fee_rate < Decimal::ZERO || self.cycle.fee_rate >= Decimal::ONE {
            bail!("cycle.fee_rate {} must be in [0, 1)", self.cycle.fee_rate);
        }
        if self.cycle.base_quantity <= Decimal::ZERO {
            bail!("cycle.base_quantity must be positive");
        }
        if self.decision.short_window == 0 {
            bail!("decision.short_window must be at least 1");
        }
        if self.decision.short_window > self.decision.long_window {
            bail!(
                "decision.short_window ({}) exceeds decision.long_window ({})",
                self.decision.short_window,
                self.decision.long_window
            );
        }
        if self.agent.poll_interval_ms == 0 {
            bail!("agent.poll_interval_ms must be positive");
        }
        Ok(())
    }

    /// Trigger threshold: the base quantity plus the required gain.
    pub fn profit_threshold(&self) -> Decimal {
        self.cycle.base_quantity + self.decision.min_profit
    }

    pub fn decision_config(&self) -> DecisionConfig {
        DecisionConfig {
            short_window: self.decision.short_window,
            long_window: self.decision.long_window,
            debounce: chrono::Duration::seconds(self.decision.debounce_secs as i64),
            profit_threshold: self.profit_threshold(),
        }
    }

    /// Configured symbols, or the Binance defaults when none are listed.
    pub fn symbol_table(&self) -> Result<SymbolTable> {
        if self.symbols.is_empty() {
            return Ok(SymbolTable::binance_defaults());
        }
        let table = SymbolTable::from_symbols(self.symbols.iter().map(|s| {
            CanonicalSymbol::new(
                s.name.as_str(),
                Asset::new(s.base.as_str()),
                Asset::new(s.quote.as_str()),
            )
        }))?;
        Ok(table)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
