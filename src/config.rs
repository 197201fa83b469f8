//! Strategy configuration
//!
//! Loaded once per invocation from a JSON file and validated before any
//! exchange call is made. Credentials never live in the config file; they
//! come from the environment (see [`crate::binance::Credentials`]).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::types::ConfigError;

/// Immutable strategy parameters for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Trading pair, e.g. "SOLUSDT"
    pub symbol: String,
    /// Entry activation threshold: the ladder is armed once price <= trigger
    pub trigger_price: f64,
    /// Number of DCA levels, 1..=4
    pub num_levels: u32,
    /// Quote-currency amount invested at each level
    pub base_amount: f64,
    /// Price drop between consecutive levels, percent
    pub drop_pct: f64,
    /// Per-level take-profit, percent above the level's buy price
    pub take_profit_pct: f64,
    /// Global trailing stop distance from the peak, percent
    pub trailing_stop_pct: f64,
    /// Whether a STOPPED run re-arms when price returns below the trigger.
    /// Off by default: a trailing-stop exit should not silently start a
    /// fresh cycle without operator intervention.
    #[serde(default)]
    pub reactivate_after_stop: bool,
}

impl StrategyConfig {
    /// Load and validate a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: StrategyConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate parameter ranges; called before any exchange call
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=4).contains(&self.num_levels) {
            return Err(ConfigError::InvalidNumLevels(self.num_levels));
        }

        for (field, value) in [
            ("trigger_price", self.trigger_price),
            ("base_amount", self.base_amount),
            ("take_profit_pct", self.take_profit_pct),
            ("trailing_stop_pct", self.trailing_stop_pct),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }

        if self.drop_pct < 0.0 {
            return Err(ConfigError::NonPositive {
                field: "drop_pct",
                value: self.drop_pct,
            });
        }

        // A drop or trailing distance of 100% or more would produce
        // non-positive prices down the ladder.
        for (field, value) in [
            ("drop_pct", self.drop_pct),
            ("trailing_stop_pct", self.trailing_stop_pct),
        ] {
            if value >= 100.0 {
                return Err(ConfigError::PercentageOutOfRange { field, value });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> StrategyConfig {
        StrategyConfig {
            symbol: "SOLUSDT".to_string(),
            trigger_price: 100.0,
            num_levels: 4,
            base_amount: 20.0,
            drop_pct: 1.0,
            take_profit_pct: 0.8,
            trailing_stop_pct: 2.0,
            reactivate_after_stop: false,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_levels() {
        for bad in [0, 5, 10] {
            let mut config = base_config();
            config.num_levels = bad;
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidNumLevels(n)) if n == bad
            ));
        }
    }

    #[test]
    fn rejects_non_positive_amounts() {
        let mut config = base_config();
        config.base_amount = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive { field: "base_amount", .. })
        ));

        let mut config = base_config();
        config.trigger_price = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_full_percentage_drop() {
        let mut config = base_config();
        config.drop_pct = 100.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PercentageOutOfRange { field: "drop_pct", .. })
        ));
    }

    #[test]
    fn reactivate_defaults_to_false() {
        let json = r#"{
            "symbol": "SOLUSDT",
            "trigger_price": 100.0,
            "num_levels": 2,
            "base_amount": 20.0,
            "drop_pct": 1.0,
            "take_profit_pct": 0.8,
            "trailing_stop_pct": 2.0
        }"#;
        let config: StrategyConfig = serde_json::from_str(json).unwrap();
        assert!(!config.reactivate_after_stop);
    }
}
