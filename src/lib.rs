//! DCA Ladder
//!
//! A scheduled, stateless trading bot: each invocation loads its persisted
//! state, polls the exchange once, advances a multi-level DCA strategy with
//! per-level take-profits and a global trailing stop by one step, saves, and
//! exits. The scheduler provides the loop.

pub mod binance;
pub mod config;
pub mod engine;
pub mod state;
pub mod types;

pub use config::StrategyConfig;
pub use types::*;
