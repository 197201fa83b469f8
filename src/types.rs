//! Core data types shared across the bot

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation and startup errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("num_levels ({0}) must be between 1 and 4")]
    InvalidNumLevels(u32),

    #[error("{field} ({value}) must be positive")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} ({value}) must be below 100%")]
    PercentageOutOfRange { field: &'static str, value: f64 },

    #[error("missing environment variable {0}")]
    MissingCredential(&'static str),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// State persistence errors
///
/// All variants are fatal for the current invocation: corrupt state is never
/// auto-repaired, since discarding tracked order ids would orphan live
/// orders on the exchange.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to access state file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("state file {path} is malformed: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("state schema version {found} does not match expected {expected}")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("another invocation holds the state lock ({path})")]
    Locked { path: String },
}

/// Exchange API errors
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("exchange rejected request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse exchange response: {0}")]
    Parse(String),
}

/// Order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// Order type (the bot only uses limit entries/exits and a market liquidation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Market,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Limit => "LIMIT",
            OrderType::Market => "MARKET",
        }
    }
}

/// Strategy lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotStatus {
    Idle,
    Active,
    Stopped,
}

/// One rung of the DCA ladder
///
/// Created together with its siblings at activation; `buy_order_id` and
/// `sell_order_id` are each set exactly once and never cleared, so a level
/// can never re-place an order it already owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    /// 1-based position in the ladder
    pub index: u32,
    pub buy_price: f64,
    pub quantity: f64,
    pub buy_order_id: Option<String>,
    pub sell_order_id: Option<String>,
    pub is_complete: bool,
}

impl Level {
    pub fn new(index: u32, buy_price: f64, quantity: f64) -> Self {
        Self {
            index,
            buy_price,
            quantity,
            buy_order_id: None,
            sell_order_id: None,
            is_complete: false,
        }
    }
}

/// Global trailing stop state
///
/// Activated once, on the invocation where the first take-profit sell is
/// observed filled. The peak is a ratchet: it only moves up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrailingStop {
    pub active: bool,
    pub peak_price: f64,
}

impl TrailingStop {
    /// Arm the trailing stop at the current price
    pub fn activate(&mut self, price: f64) {
        self.active = true;
        self.peak_price = price;
    }

    /// Raise the peak if the observed price exceeds it.
    /// Returns true if the peak moved.
    pub fn observe(&mut self, price: f64) -> bool {
        if self.active && price > self.peak_price {
            self.peak_price = price;
            return true;
        }
        false
    }

    /// Liquidation threshold for a given trailing percentage
    pub fn stop_price(&self, trailing_stop_pct: f64) -> f64 {
        self.peak_price * (1.0 - trailing_stop_pct / 100.0)
    }

    /// True once the price has retraced the configured percentage from the peak
    pub fn is_triggered(&self, price: f64, trailing_stop_pct: f64) -> bool {
        self.active && price <= self.stop_price(trailing_stop_pct)
    }
}

/// Current persisted-state schema version; `StateStore::load` fails fast on
/// any other value rather than attempting best-effort coercion.
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// The single persisted document carried between invocations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub schema_version: u32,
    pub status: BotStatus,
    pub levels: Vec<Level>,
    pub trailing_stop: TrailingStop,
    /// Sum of quantities bought but not yet sold back
    pub total_quantity_held: f64,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            status: BotStatus::Idle,
            levels: Vec::new(),
            trailing_stop: TrailingStop::default(),
            total_quantity_held: 0.0,
        }
    }
}

impl RunState {
    /// Number of levels whose take-profit sell has filled
    pub fn completed_levels(&self) -> usize {
        self.levels.iter().filter(|l| l.is_complete).count()
    }
}
