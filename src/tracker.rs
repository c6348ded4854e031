//! Level crossing detection
//!
//! [`LevelCrossingTracker`] watches a stream of prices and reports how many
//! grid-unit orders are due whenever the price moves into a different level
//! bucket. Rising through levels sells, falling through levels buys.
//!
//! The most recently consumed boundary is remembered as the *active level*.
//! Re-crossing it does not signal again, which keeps a price oscillating
//! around one boundary from producing an order storm.

use serde::Serialize;
use std::cmp::Ordering;

use crate::error::{GridError, GridResult};
use crate::grid::PriceGrid;
use crate::types::DEFAULT_SCALE;
use crate::Money;

/// Outcome of one price observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Signal {
    Hold,
    /// Buy `units` times `lots_per_grid`
    Buy { units: u32 },
    /// Sell `units` times `lots_per_grid`
    Sell { units: u32 },
}

impl Signal {
    /// Signed unit count: positive buys, negative sells
    pub fn signed_units(self) -> i64 {
        match self {
            Signal::Hold => 0,
            Signal::Buy { units } => i64::from(units),
            Signal::Sell { units } => -i64::from(units),
        }
    }

    pub fn units(self) -> u32 {
        match self {
            Signal::Hold => 0,
            Signal::Buy { units } | Signal::Sell { units } => units,
        }
    }
}

/// Number of lots traded per grid level.
///
/// `investment / (average_buy_price * lot_size * (level_count - 1))`, truncated,
/// where the average buy price spans the lowest and the second-highest level.
/// The top level is never bought.
pub fn lots_per_grid(grid: &PriceGrid, investment: Money, lot_size: Money) -> GridResult<u64> {
    if !investment.is_positive() {
        return Err(GridError::invalid(format!("investment must be positive: {}", investment)));
    }
    if !lot_size.is_positive() {
        return Err(GridError::invalid(format!("lot size must be positive: {}", lot_size)));
    }

    let levels = grid.levels();
    let intervals = Money::from((grid.level_count() - 1) as u64);
    let average_buy_price = (levels[0] + levels[grid.level_count() - 2])
        .checked_div(Money::from_i64(2))
        .ok_or_else(|| GridError::invalid("average buy price cannot be computed"))?
        .trunc_dp(DEFAULT_SCALE);
    let required_per_level = average_buy_price * lot_size * intervals;

    let lots = investment
        .checked_div(required_per_level)
        .and_then(Money::trunc_to_i64)
        .and_then(|lots| u64::try_from(lots).ok())
        .ok_or_else(|| {
            GridError::invalid(format!(
                "investment {} buys more lots per level than can be represented",
                investment
            ))
        })?;

    if lots == 0 {
        return Err(GridError::InsufficientInvestment {
            investment,
            required_per_level,
        });
    }
    Ok(lots)
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelCrossingTracker {
    grid: PriceGrid,
    lots_per_grid: u64,
    /// Most recently consumed boundary. Starts at the initial price when that
    /// lies between levels, `None` when it sits exactly on one.
    active_level: Option<Money>,
    previous_price: Money,
}

impl LevelCrossingTracker {
    pub fn new(
        grid: PriceGrid,
        investment: Money,
        lot_size: Money,
        initial_price: Money,
    ) -> GridResult<Self> {
        if !initial_price.is_positive() {
            return Err(GridError::invalid(format!(
                "initial price must be positive: {}",
                initial_price
            )));
        }
        let lots_per_grid = lots_per_grid(&grid, investment, lot_size)?;
        // A start inside a bucket counts as consumed, so the first move out of it
        // signals in either direction. A start exactly on a level leaves it unset.
        let active_level = if grid.levels().contains(&initial_price) {
            None
        } else {
            Some(initial_price)
        };
        Ok(Self {
            grid,
            lots_per_grid,
            active_level,
            previous_price: initial_price,
        })
    }

    /// Lots to buy before trading starts so that holdings match a position
    /// bought at every level between the current price and the top.
    pub fn lots_to_buy_on_start(&self, current_price: Money) -> GridResult<u64> {
        let top = (self.grid.level_count() - 1) as i64;
        let index = self.grid.level_index_of(current_price)?;
        let units = if index == top {
            0
        } else if index <= 0 {
            top
        } else {
            top - index
        };
        (units as u64).checked_mul(self.lots_per_grid).ok_or_else(|| {
            GridError::invalid(format!(
                "start-up lots overflow: {} units of {} lots",
                units, self.lots_per_grid
            ))
        })
    }

    /// Feed the next price and get the orders now due.
    pub fn observe(&mut self, current_price: Money) -> GridResult<Signal> {
        let current_index = self.grid.level_index_of(current_price)?;
        let previous_index = self.grid.level_index_of(self.previous_price)?;
        let previous_price = self.previous_price;
        self.previous_price = current_price;

        if current_index == previous_index {
            return Ok(Signal::Hold);
        }

        let crossed_index = current_index.max(previous_index);
        let crossed_level = self.grid.level(crossed_index).ok_or_else(|| {
            GridError::InternalInconsistency(format!("crossed level {} is off the grid", crossed_index))
        })?;

        if self.active_level == Some(crossed_level) {
            return Ok(Signal::Hold);
        }

        // An unset active level orders below every positive price
        let relative_to_active = match self.active_level {
            Some(active) => previous_price.cmp(&active),
            None => Ordering::Greater,
        };

        let signal = if current_index > previous_index {
            let adjacent = i64::from(relative_to_active == Ordering::Less);
            Signal::Sell {
                units: units(current_index - previous_index - adjacent)?,
            }
        } else {
            let adjacent = i64::from(relative_to_active == Ordering::Greater);
            Signal::Buy {
                units: units(previous_index - current_index - adjacent)?,
            }
        };
        self.active_level = Some(crossed_level);

        tracing::debug!(
            price = %current_price,
            crossed_level = %crossed_level,
            signal = ?signal,
            "Grid level crossed"
        );
        Ok(signal)
    }

    pub fn grid(&self) -> &PriceGrid {
        &self.grid
    }

    pub fn lots_per_grid(&self) -> u64 {
        self.lots_per_grid
    }

    pub fn active_level(&self) -> Option<Money> {
        self.active_level
    }

    pub fn previous_price(&self) -> Money {
        self.previous_price
    }
}

fn units(multiplier: i64) -> GridResult<u32> {
    u32::try_from(multiplier).map_err(|_| {
        GridError::InternalInconsistency(format!("negative crossing multiplier {}", multiplier))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn m(value: rust_decimal::Decimal) -> Money {
        Money::new(value)
    }

    fn tracker_at(price: Money) -> LevelCrossingTracker {
        let grid = PriceGrid::new(m(dec!(90)), m(dec!(110)), 5).unwrap();
        LevelCrossingTracker::new(grid, m(dec!(10000)), Money::ONE, price).unwrap()
    }

    #[test]
    fn test_lots_per_grid() {
        let grid = PriceGrid::new(m(dec!(90)), m(dec!(110)), 5).unwrap();
        // average buy price (90 + 105) / 2 = 97.5; 10000 / (97.5 * 4) = 25.6
        assert_eq!(lots_per_grid(&grid, m(dec!(10000)), Money::ONE).unwrap(), 25);
        assert_eq!(lots_per_grid(&grid, m(dec!(10000)), m(dec!(10))).unwrap(), 2);
    }

    #[test]
    fn test_insufficient_investment() {
        let grid = PriceGrid::new(m(dec!(90)), m(dec!(110)), 5).unwrap();
        let err = lots_per_grid(&grid, m(dec!(389)), Money::ONE).unwrap_err();
        assert!(matches!(err, GridError::InsufficientInvestment { .. }));
    }

    #[test]
    fn test_invalid_lot_size_and_investment() {
        let grid = PriceGrid::new(m(dec!(90)), m(dec!(110)), 5).unwrap();
        assert!(matches!(
            lots_per_grid(&grid, m(dec!(10000)), Money::ZERO),
            Err(GridError::InvalidParameter(_))
        ));
        assert!(matches!(
            lots_per_grid(&grid, Money::ZERO, Money::ONE),
            Err(GridError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_unrepresentable_lot_count_is_invalid() {
        let grid = PriceGrid::new(Money::ONE, m(dec!(2)), 2).unwrap();
        let err = lots_per_grid(&grid, m(dec!(100000000000000000000)), Money::ONE).unwrap_err();
        assert!(matches!(err, GridError::InvalidParameter(_)));
    }

    #[test]
    fn test_start_between_levels_seeds_active_level() {
        assert_eq!(tracker_at(m(dec!(103))).active_level(), Some(m(dec!(103))));
        assert_eq!(tracker_at(m(dec!(100))).active_level(), None);
    }

    #[test]
    fn test_oscillation_starting_downward_signals_once() {
        let mut tracker = tracker_at(m(dec!(97)));
        assert_eq!(tracker.observe(m(dec!(94))).unwrap(), Signal::Buy { units: 1 });
        for _ in 0..5 {
            assert_eq!(tracker.observe(m(dec!(97))).unwrap(), Signal::Hold);
            assert_eq!(tracker.observe(m(dec!(94))).unwrap(), Signal::Hold);
        }
        assert_eq!(tracker.active_level(), Some(m(dec!(95))));
    }

    #[test]
    fn test_lots_to_buy_on_start() {
        let tracker = tracker_at(m(dec!(100)));
        let per_grid = tracker.lots_per_grid();
        assert_eq!(tracker.lots_to_buy_on_start(m(dec!(100))).unwrap(), 2 * per_grid);
        assert_eq!(tracker.lots_to_buy_on_start(m(dec!(96))).unwrap(), 3 * per_grid);
        assert_eq!(tracker.lots_to_buy_on_start(m(dec!(92))).unwrap(), 4 * per_grid);
        assert_eq!(tracker.lots_to_buy_on_start(m(dec!(80))).unwrap(), 4 * per_grid);
        assert_eq!(tracker.lots_to_buy_on_start(m(dec!(110))).unwrap(), 0);
        assert_eq!(tracker.lots_to_buy_on_start(m(dec!(120))).unwrap(), 0);
    }

    #[test]
    fn test_same_bucket_never_signals() {
        let mut tracker = tracker_at(m(dec!(100)));
        for price in [dec!(101), dec!(104.99), dec!(100), dec!(102.5)] {
            assert_eq!(tracker.observe(m(price)).unwrap(), Signal::Hold);
        }
        assert_eq!(tracker.active_level(), None);
    }

    #[test]
    fn test_scenario_down_then_up() {
        let mut tracker = tracker_at(m(dec!(100)));

        let down = tracker.observe(m(dec!(94))).unwrap();
        assert_eq!(down, Signal::Buy { units: 1 });
        assert_eq!(down.signed_units(), 1);
        assert_eq!(tracker.active_level(), Some(m(dec!(100))));

        let up = tracker.observe(m(dec!(108))).unwrap();
        assert_eq!(up, Signal::Sell { units: 2 });
        assert_eq!(up.signed_units(), -2);
        assert_eq!(tracker.active_level(), Some(m(dec!(105))));
    }

    #[test]
    fn test_oscillation_at_one_boundary_signals_once() {
        let mut tracker = tracker_at(m(dec!(103)));
        assert_eq!(tracker.observe(m(dec!(106))).unwrap(), Signal::Sell { units: 1 });
        for _ in 0..5 {
            assert_eq!(tracker.observe(m(dec!(104))).unwrap(), Signal::Hold);
            assert_eq!(tracker.observe(m(dec!(106))).unwrap(), Signal::Hold);
        }
        // A different boundary signals again
        assert_eq!(tracker.observe(m(dec!(104))).unwrap(), Signal::Hold);
        assert_eq!(tracker.observe(m(dec!(99))).unwrap(), Signal::Buy { units: 1 });
        assert_eq!(tracker.active_level(), Some(m(dec!(100))));
    }

    #[test]
    fn test_multi_level_jump_up() {
        // Start in bucket 0, jump above level 3
        let mut tracker = tracker_at(m(dec!(92)));
        let signal = tracker.observe(m(dec!(107))).unwrap();
        assert_eq!(signal, Signal::Sell { units: 3 });
        assert_eq!(tracker.active_level(), Some(m(dec!(105))));
    }

    #[test]
    fn test_previous_price_advances_on_dedup() {
        let mut tracker = tracker_at(m(dec!(103)));
        tracker.observe(m(dec!(106))).unwrap();
        tracker.observe(m(dec!(104))).unwrap();
        assert_eq!(tracker.previous_price(), m(dec!(104)));
    }

    #[test]
    fn test_tracker_rejects_non_positive_start() {
        let grid = PriceGrid::new(m(dec!(90)), m(dec!(110)), 5).unwrap();
        assert!(LevelCrossingTracker::new(grid, m(dec!(10000)), Money::ONE, Money::ZERO).is_err());
    }
}
