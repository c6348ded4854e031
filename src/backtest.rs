//! Backtesting engine
//!
//! Replays OHLC candles through one grid strategy. Only four prices per candle
//! are known, so a sub-candle path is synthesized in the worst-case order
//! open → low → high → close, stepping by a fixed price step smaller than the
//! grid step. Every level between low and high is therefore visited in both
//! directions and no crossing inside a candle is lost.
//!
//! Each path price moves the simulated executor first (settling limit orders),
//! then reaches the strategy. Statistics are taken at the last close.

use chrono::{DateTime, Utc};
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::error::{GridError, GridResult};
use crate::grid::PriceGrid;
use crate::oms::SimulatedExecutor;
use crate::report::GridStatistics;
use crate::strategy::{GridBot, GridParams};
use crate::types::DEFAULT_SCALE;
use crate::{Candle, Money};

/// Sub-candle price step used when none is configured
pub const DEFAULT_PRICE_STEP: Money = Money::new(dec!(0.05));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leg {
    Open,
    ToLow,
    ToHigh,
    ToClose,
    Done,
}

/// Synthetic price path through one candle
#[derive(Debug, Clone)]
pub struct SubCandlePath {
    open: Money,
    high: Money,
    low: Money,
    close: Money,
    step: Money,
    leg: Leg,
    cursor: Money,
}

impl SubCandlePath {
    pub fn new(candle: &Candle, step: Money) -> GridResult<Self> {
        if !step.is_positive() {
            return Err(GridError::invalid(format!("price step must be positive: {}", step)));
        }
        candle
            .validate()
            .map_err(|e| GridError::invalid(format!("candle at {}: {}", candle.datetime, e)))?;

        Ok(Self {
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
            step,
            leg: Leg::Open,
            cursor: candle.open,
        })
    }
}

impl Iterator for SubCandlePath {
    type Item = Money;

    fn next(&mut self) -> Option<Money> {
        let next = match self.leg {
            Leg::Open => {
                self.leg = Leg::ToLow;
                self.open
            }
            Leg::ToLow => {
                let price = self.cursor - self.step;
                if price >= self.low {
                    price
                } else {
                    self.leg = Leg::ToHigh;
                    self.low
                }
            }
            Leg::ToHigh => {
                let price = self.cursor + self.step;
                if price <= self.high {
                    price
                } else {
                    self.leg = Leg::ToClose;
                    self.high
                }
            }
            Leg::ToClose => {
                let price = self.cursor - self.step;
                if price >= self.close {
                    price
                } else {
                    self.leg = Leg::Done;
                    self.close
                }
            }
            Leg::Done => return None,
        };
        self.cursor = next;
        Some(next)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacktestSettings {
    /// Sub-candle path step, strictly below the grid step
    pub price_step: Money,
    /// Fraction of the notional charged per fill
    pub fee: Money,
    /// Close the strategy after the last candle and sell the inventory
    pub sell_at_end: bool,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            price_step: DEFAULT_PRICE_STEP,
            fee: Money::ZERO,
            sell_at_end: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub instrument_id: String,
    pub candles: usize,
    pub initial_price: Money,
    pub final_price: Money,
    pub lots_per_grid: u64,
    pub lots_bought_on_start: u64,
    pub final_balance: Money,
    pub statistics: GridStatistics,
    /// Balance at every candle close
    pub equity_curve: Vec<(DateTime<Utc>, Money)>,
    /// Largest peak-to-trough balance decline, as a fraction of the peak
    pub max_drawdown: Money,
}

/// Backtest engine
pub struct Backtester {
    params: GridParams,
    settings: BacktestSettings,
}

impl Backtester {
    pub fn new(params: GridParams, settings: BacktestSettings) -> Self {
        Backtester { params, settings }
    }

    pub fn params(&self) -> &GridParams {
        &self.params
    }

    /// Replay `candles` (ordered by time) and report statistics at the last close
    pub fn run(&self, candles: &[Candle]) -> GridResult<BacktestResult> {
        let (Some(first), Some(last)) = (candles.first(), candles.last()) else {
            return Err(GridError::invalid("no candles to replay"));
        };

        let grid = PriceGrid::new(self.params.lower_price, self.params.upper_price, self.params.levels)?;
        if self.settings.price_step >= grid.price_step() {
            return Err(GridError::invalid(format!(
                "path step {} must be smaller than the grid step {}",
                self.settings.price_step,
                grid.price_step()
            )));
        }

        let executor = SimulatedExecutor::new(self.params.lot_size, self.settings.fee)?;
        let mut bot = GridBot::new(&self.params, executor, first.open)?;

        let mut equity_curve = Vec::with_capacity(candles.len());
        for candle in candles {
            for price in SubCandlePath::new(candle, self.settings.price_step)? {
                bot.on_price(price)?;
            }
            equity_curve.push((candle.datetime, bot.ledger().balance_at(candle.close)));
        }

        if self.settings.sell_at_end {
            bot.close(true)?;
        }

        let statistics = bot.statistics(last.close)?;
        let balances: Vec<Money> = equity_curve.iter().map(|(_, balance)| *balance).collect();
        let max_drawdown = max_drawdown(self.params.investment, &balances);

        tracing::info!(
            instrument = %self.params.instrument_id,
            candles = candles.len(),
            total_profit = %statistics.total_profit,
            transactions = statistics.transactions_count,
            "Backtest complete"
        );

        Ok(BacktestResult {
            instrument_id: self.params.instrument_id.clone(),
            candles: candles.len(),
            initial_price: first.open,
            final_price: last.close,
            lots_per_grid: bot.tracker().lots_per_grid(),
            lots_bought_on_start: bot.lots_bought_on_start(),
            final_balance: bot.ledger().balance_at(last.close),
            statistics,
            equity_curve,
            max_drawdown,
        })
    }
}

/// Largest decline from a running peak, starting the peak at `initial`
pub fn max_drawdown(initial: Money, balances: &[Money]) -> Money {
    let mut peak = initial;
    let mut max_dd = Money::ZERO;

    for &balance in balances {
        if balance > peak {
            peak = balance;
        }
        let dd = (peak - balance)
            .checked_div(peak)
            .map(|dd| dd.trunc_dp(DEFAULT_SCALE))
            .unwrap_or(Money::ZERO);
        if dd > max_dd {
            max_dd = dd;
        }
    }
    max_dd
}
