//! Integration tests: the full engine driven against an in-memory exchange.

mod engine_scenarios;
mod mock_exchange;
