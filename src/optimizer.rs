//! Grid parameter sweep
//!
//! Tries every combination of lower bound, upper bound and level count over a
//! candle series and ranks them by total profit. The lower bound walks up
//! from the series low through its bottom half, the upper bound walks up from
//! the middle of the range to the series high, both in `range / divisions`
//! increments. Every combination is an independent backtest, so runs execute
//! in parallel with no shared state.

use indicatif::ProgressBar;
use itertools::iproduct;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::backtest::{BacktestSettings, Backtester};
use crate::error::{GridError, GridResult};
use crate::strategy::{GridParams, OrderMode};
use crate::types::DEFAULT_SCALE;
use crate::{Candle, Money};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
    /// Bound increment is `(max_high - min_low) / divisions`
    pub divisions: u32,
    pub min_levels: usize,
    /// Exclusive
    pub max_levels: usize,
    /// Investment used by every run
    pub investment: Money,
    /// Results kept after ranking
    pub top: usize,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            divisions: 16,
            min_levels: 2,
            max_levels: 50,
            investment: Money::from_i64(10_000_000),
            top: 5,
        }
    }
}

/// Outcome of one parameter combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepResult {
    pub lower_price: Money,
    pub upper_price: Money,
    pub levels: usize,
    pub total_profit: Money,
    pub total_profit_fraction: Money,
    pub realized_profit: Money,
    pub transactions_count: usize,
    pub max_drawdown: Money,
}

/// Lowest low and highest high of a series
pub fn price_range(candles: &[Candle]) -> Option<(Money, Money)> {
    let low = candles.iter().map(|c| c.low).min()?;
    let high = candles.iter().map(|c| c.high).max()?;
    Some((low, high))
}

/// Candidate lower and upper bounds for a series spanning `[min_low, max_high]`
pub fn bound_candidates(
    min_low: Money,
    max_high: Money,
    divisions: u32,
) -> GridResult<(Vec<Money>, Vec<Money>)> {
    if divisions == 0 {
        return Err(GridError::invalid("sweep divisions must be positive"));
    }
    let range = max_high - min_low;
    let increment = range
        .checked_div(Money::from(u64::from(divisions)))
        .ok_or_else(|| GridError::invalid("sweep increment cannot be computed"))?
        .trunc_dp(DEFAULT_SCALE);
    if !increment.is_positive() {
        return Err(GridError::invalid(format!(
            "price range {}..{} is too narrow to sweep",
            min_low, max_high
        )));
    }
    let half = range
        .checked_div(Money::from_i64(2))
        .ok_or_else(|| GridError::invalid("sweep range cannot be halved"))?;

    let lower_limit = min_low + half;
    let lowers: Vec<Money> = std::iter::successors(Some(min_low), |p| Some(*p + increment))
        .take_while(|p| *p < lower_limit)
        .collect();

    let uppers: Vec<Money> = std::iter::successors(Some(max_high - half), |p| Some(*p + increment))
        .take_while(|p| *p <= max_high)
        .collect();

    Ok((lowers, uppers))
}

pub struct Optimizer {
    instrument_id: String,
    lot_size: Money,
    backtest: BacktestSettings,
    sweep: SweepSettings,
}

impl Optimizer {
    pub fn new(
        instrument_id: impl Into<String>,
        lot_size: Money,
        backtest: BacktestSettings,
        sweep: SweepSettings,
    ) -> Self {
        Optimizer {
            instrument_id: instrument_id.into(),
            lot_size,
            backtest,
            sweep,
        }
    }

    /// Every parameter combination to test over `candles`
    pub fn candidates(&self, candles: &[Candle]) -> GridResult<Vec<GridParams>> {
        let (min_low, max_high) =
            price_range(candles).ok_or_else(|| GridError::invalid("no candles to analyze"))?;
        let (lowers, uppers) = bound_candidates(min_low, max_high, self.sweep.divisions)?;

        Ok(iproduct!(lowers, uppers, self.sweep.min_levels..self.sweep.max_levels)
            .map(|(lower_price, upper_price, levels)| GridParams {
                instrument_id: self.instrument_id.clone(),
                lower_price,
                upper_price,
                levels,
                investment: self.sweep.investment,
                lot_size: self.lot_size,
                order_mode: OrderMode::Market,
            })
            .collect())
    }

    /// Backtest every combination and return the best `top` by total profit.
    /// Combinations that cannot be constructed are skipped.
    pub fn run(&self, candles: &[Candle], progress: Option<&ProgressBar>) -> GridResult<Vec<SweepResult>> {
        let candidates = self.candidates(candles)?;
        tracing::info!("Testing {} parameter combinations", candidates.len());

        let mut results: Vec<SweepResult> = candidates
            .into_par_iter()
            .filter_map(|params| {
                let outcome = Backtester::new(params.clone(), self.backtest).run(candles);
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                match outcome {
                    Ok(result) => Some(SweepResult {
                        lower_price: params.lower_price,
                        upper_price: params.upper_price,
                        levels: params.levels,
                        total_profit: result.statistics.total_profit,
                        total_profit_fraction: result.statistics.total_profit_fraction,
                        realized_profit: result.statistics.realized_profit,
                        transactions_count: result.statistics.transactions_count,
                        max_drawdown: result.max_drawdown,
                    }),
                    Err(err) => {
                        tracing::debug!(
                            lower = %params.lower_price,
                            upper = %params.upper_price,
                            levels = params.levels,
                            error = %err,
                            "Skipping combination"
                        );
                        None
                    }
                }
            })
            .collect();

        tracing::info!("{} combinations completed", results.len());
        sort_results(&mut results);
        results.truncate(self.sweep.top);
        Ok(results)
    }
}

/// Best total profit first; ties ordered by bounds, then level count
pub fn sort_results(results: &mut [SweepResult]) {
    results.sort_by(|a, b| {
        b.total_profit_fraction
            .cmp(&a.total_profit_fraction)
            .then(a.lower_price.cmp(&b.lower_price))
            .then(a.upper_price.cmp(&b.upper_price))
            .then(a.levels.cmp(&b.levels))
    });
}
