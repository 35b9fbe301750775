//! Strategy core — symbol resolution, book walking, cycle estimation and
//! the rolling sample window.
//!
//! Everything here is synchronous and side-effect free apart from logging;
//! I/O and mutable decision state live in `engine`.

pub mod cycle;
pub mod estimator;
pub mod symbols;
pub mod walker;
pub mod window;

pub use cycle::{ArbitrageCycle, Leg};
pub use estimator::{LegSnapshots, ProfitEstimator};
pub use symbols::SymbolTable;
pub use walker::walk;
pub use window::RollingWindow;
