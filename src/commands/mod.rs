//! Subcommand implementations

pub mod analyze;
pub mod backtest;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use grid_bot::data::{CandleSource, CsvCandleSource, InstrumentMetadata};
use grid_bot::{Candle, Config, Money};

/// Load the configured candles, clipped to the configured date range
pub(crate) fn load_candles(config: &Config) -> Result<Vec<Candle>> {
    let source = CsvCandleSource::new(&config.backtest.data_file);
    let candles = source.candles(&config.instrument.id, config.backtest.start, config.backtest.end)?;
    if candles.is_empty() {
        anyhow::bail!("No candles in {} for the selected range", config.backtest.data_file);
    }
    Ok(candles)
}

/// Lot size of the configured instrument
pub(crate) fn resolve_lot_size(config: &Config) -> Result<Money> {
    let lot_size = config
        .instruments()
        .lot_size(&config.instrument.id)
        .context("Instrument metadata lookup failed")?;
    Ok(lot_size)
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize results")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
