//! Market data and instrument metadata
//!
//! Loads historical candles from CSV files and provides static lot sizes.
//! Prices are parsed straight from text into decimals.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{GridError, GridResult};
use crate::{Candle, Money};

// =============================================================================
// Collaborator traits
// =============================================================================

/// Source of historical candles, ordered and deduplicated by timestamp
pub trait CandleSource {
    fn candles(
        &self,
        instrument_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Candle>>;
}

/// Per-instrument lot size lookup
pub trait InstrumentMetadata {
    fn lot_size(&self, instrument_id: &str) -> GridResult<Money>;
}

// =============================================================================
// CSV Data Loading
// =============================================================================

/// Candle source backed by one CSV file
#[derive(Debug, Clone)]
pub struct CsvCandleSource {
    path: PathBuf,
}

impl CsvCandleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CandleSource for CsvCandleSource {
    fn candles(
        &self,
        instrument_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Candle>> {
        let candles = load_csv(&self.path)
            .with_context(|| format!("Failed to load data for {}", instrument_id))?;
        let clipped = clip_range(candles, start, end);
        info!(
            instrument = instrument_id,
            candles = clipped.len(),
            path = %self.path.display(),
            "Loaded candles"
        );
        Ok(clipped)
    }
}

/// Load OHLC data from a CSV file with a header row:
/// `datetime,open,high,low,close[,volume]`.
///
/// Rows sharing a whole-second timestamp collapse to the last one; the result
/// is ordered by timestamp ascending.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let mut reader = csv::Reader::from_path(path.as_ref()).context("Failed to open CSV file")?;

    let mut by_time: BTreeMap<i64, Candle> = BTreeMap::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.context(format!("Failed to read row {}", row_idx + 1))?;

        let dt_str = record.get(0).context("Missing datetime column")?;
        let datetime = parse_datetime(dt_str)?;

        let open = parse_price(&record, 1, "open")?;
        let high = parse_price(&record, 2, "high")?;
        let low = parse_price(&record, 3, "low")?;
        let close = parse_price(&record, 4, "close")?;

        let candle = Candle::new(datetime, open, high, low, close)
            .with_context(|| format!("Invalid candle at row {}", row_idx + 1))?;

        if by_time.insert(candle.timestamp_seconds(), candle).is_some() {
            warn!(%datetime, "Duplicate candle timestamp, keeping the later row");
        }
    }

    Ok(by_time.into_values().collect())
}

fn parse_datetime(dt_str: &str) -> Result<DateTime<Utc>> {
    let dt_str = dt_str.trim();
    dt_str
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Try parsing without timezone and assume UTC
            NaiveDateTime::parse_from_str(dt_str, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        })
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(dt_str, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        })
        .or_else(|| {
            // Unix seconds
            dt_str
                .parse::<i64>()
                .ok()
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        })
        .context(format!("Failed to parse datetime: {}", dt_str))
}

fn parse_price(record: &csv::StringRecord, idx: usize, name: &str) -> Result<Money> {
    record
        .get(idx)
        .context(format!("Missing {} column", name))?
        .parse::<Money>()
        .context(format!("Failed to parse {}", name))
}

/// Keep candles whose date lies in `[start, end]`, both bounds inclusive
pub fn clip_range(candles: Vec<Candle>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<Candle> {
    candles
        .into_iter()
        .filter(|c| {
            let day = c.datetime.date_naive();
            start.map_or(true, |s| day >= s) && end.map_or(true, |e| day <= e)
        })
        .collect()
}

// =============================================================================
// Instrument metadata
// =============================================================================

/// Fixed lot-size table
#[derive(Debug, Clone, Default)]
pub struct StaticInstruments {
    lot_sizes: HashMap<String, Money>,
}

impl StaticInstruments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, instrument_id: impl Into<String>, lot_size: Money) -> Self {
        self.lot_sizes.insert(instrument_id.into(), lot_size);
        self
    }
}

impl InstrumentMetadata for StaticInstruments {
    fn lot_size(&self, instrument_id: &str) -> GridResult<Money> {
        match self.lot_sizes.get(instrument_id) {
            Some(lot) if lot.is_positive() => Ok(*lot),
            Some(lot) => Err(GridError::invalid(format!(
                "lot size of {} must be positive: {}",
                instrument_id, lot
            ))),
            None => Err(GridError::invalid(format!("unknown instrument: {}", instrument_id))),
        }
    }
}
