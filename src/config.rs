//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files with environment
//! variable overrides. Decimal values are written as strings, e.g.
//! `"lower_price": "90.5"`.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::backtest::{BacktestSettings, DEFAULT_PRICE_STEP};
use crate::data::StaticInstruments;
use crate::optimizer::SweepSettings;
use crate::strategy::{GridParams, OrderMode};
use crate::Money;

/// Overrides `backtest.data_file`
pub const DATA_FILE_ENV: &str = "GRID_BOT_DATA_FILE";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub instrument: InstrumentConfig,
    pub grid: GridConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
    #[serde(default)]
    pub sweep: SweepSettings,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        if let Ok(data_file) = std::env::var(DATA_FILE_ENV) {
            config.backtest.data_file = data_file;
        }

        Ok(config)
    }

    pub fn grid_params(&self) -> GridParams {
        GridParams {
            instrument_id: self.instrument.id.clone(),
            lower_price: self.grid.lower_price,
            upper_price: self.grid.upper_price,
            levels: self.grid.levels,
            investment: self.grid.investment,
            lot_size: self.instrument.lot_size,
            order_mode: self.grid.order_mode,
        }
    }

    pub fn backtest_settings(&self) -> BacktestSettings {
        BacktestSettings {
            price_step: self.backtest.price_step,
            fee: self.backtest.fee,
            sell_at_end: self.backtest.sell_at_end,
        }
    }

    /// Lot-size table holding the configured instrument
    pub fn instruments(&self) -> StaticInstruments {
        StaticInstruments::new().with(self.instrument.id.clone(), self.instrument.lot_size)
    }
}

/// Traded instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub id: String,
    pub lot_size: Money,
}

/// Grid strategy parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub lower_price: Money,
    pub upper_price: Money,
    pub levels: usize,
    pub investment: Money,
    #[serde(default)]
    pub order_mode: OrderMode,
}

/// Backtest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub data_file: String,
    /// Sub-candle path step
    #[serde(default = "default_price_step")]
    pub price_step: Money,
    #[serde(default)]
    pub fee: Money,
    /// Sell the remaining inventory after the last candle
    #[serde(default)]
    pub sell_at_end: bool,
    /// Inclusive date range, `YYYY-MM-DD`
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

fn default_price_step() -> Money {
    DEFAULT_PRICE_STEP
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            data_file: "data/candles.csv".to_string(),
            price_step: DEFAULT_PRICE_STEP,
            fee: Money::ZERO,
            sell_at_end: false,
            start: None,
            end: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InstrumentMetadata;
    use rust_decimal_macros::dec;
    use std::io::Write;

    const MINIMAL: &str = r#"{
        "instrument": { "id": "SBER", "lot_size": "10" },
        "grid": {
            "lower_price": "90",
            "upper_price": "110",
            "levels": 5,
            "investment": "10000"
        }
    }"#;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: Config = serde_json::from_str(MINIMAL).unwrap();
        assert_eq!(config.grid.order_mode, OrderMode::Market);
        assert_eq!(config.backtest.price_step, Money::new(dec!(0.05)));
        assert_eq!(config.backtest.fee, Money::ZERO);
        assert_eq!(config.sweep, SweepSettings::default());

        let params = config.grid_params();
        assert_eq!(params.lot_size, Money::new(dec!(10)));
        assert_eq!(params.levels, 5);
        assert_eq!(config.instruments().lot_size("SBER").unwrap(), Money::new(dec!(10)));
    }

    #[test]
    fn test_full_config() {
        let json = r#"{
            "instrument": { "id": "SBER", "lot_size": "1" },
            "grid": {
                "lower_price": "90.5",
                "upper_price": "110",
                "levels": 8,
                "investment": "50000",
                "order_mode": "limit"
            },
            "backtest": {
                "data_file": "data/sber.csv",
                "price_step": "0.01",
                "fee": "0.0005",
                "start": "2024-01-01",
                "end": "2024-03-31"
            },
            "sweep": { "divisions": 8, "top": 10 }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.grid.lower_price, Money::new(dec!(90.5)));
        assert_eq!(config.grid.order_mode, OrderMode::Limit);
        assert_eq!(config.backtest_settings().fee, Money::new(dec!(0.0005)));
        assert_eq!(config.backtest.start, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(config.sweep.divisions, 8);
        assert_eq!(config.sweep.max_levels, 50);
        assert_eq!(config.sweep.top, 10);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.instrument.id, "SBER");
    }

    #[test]
    fn test_from_file_reports_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }
}
