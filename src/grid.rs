//! Price grid geometry
//!
//! Splits `[lower, upper]` into `level_count` equally spaced levels. Levels are
//! indexed `0..level_count`; a price is assigned the index of the level at or
//! directly below it:
//!
//! - `-1` for prices below `lower`
//! - `i` for prices in `[levels[i], levels[i + 1])`
//! - `level_count - 1` for prices at or above `upper`

use serde::Serialize;

use crate::error::{GridError, GridResult};
use crate::types::DEFAULT_SCALE;
use crate::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceGrid {
    lower_price: Money,
    upper_price: Money,
    level_count: usize,
    price_step: Money,
    levels: Vec<Money>,
}

impl PriceGrid {
    pub fn new(lower_price: Money, upper_price: Money, level_count: usize) -> GridResult<Self> {
        if !lower_price.is_positive() || !upper_price.is_positive() {
            return Err(GridError::invalid(format!(
                "grid bounds must be positive (lower: {}, upper: {})",
                lower_price, upper_price
            )));
        }
        if lower_price >= upper_price {
            return Err(GridError::invalid(format!(
                "lower price {} must be less than upper price {}",
                lower_price, upper_price
            )));
        }
        if level_count < 2 {
            return Err(GridError::invalid(format!(
                "grid needs at least 2 levels, got {}",
                level_count
            )));
        }

        let intervals = Money::from((level_count - 1) as u64);
        let price_step = (upper_price - lower_price)
            .checked_div(intervals)
            .ok_or_else(|| GridError::invalid("grid step cannot be computed"))?
            .trunc_dp(DEFAULT_SCALE);
        if !price_step.is_positive() {
            return Err(GridError::invalid(format!(
                "price range {}..{} is too narrow for {} levels",
                lower_price, upper_price, level_count
            )));
        }

        // The top level is pinned to `upper` so truncation of the step never drifts it
        let mut levels: Vec<Money> = (0..level_count - 1)
            .map(|i| lower_price + price_step * Money::from(i as u64))
            .collect();
        levels.push(upper_price);

        Ok(Self {
            lower_price,
            upper_price,
            level_count,
            price_step,
            levels,
        })
    }

    /// Index of the level at or below `price`, in `[-1, level_count - 1]`
    pub fn level_index_of(&self, price: Money) -> GridResult<i64> {
        if price.is_negative() {
            return Err(GridError::invalid(format!("price must not be negative: {}", price)));
        }
        let top = (self.level_count - 1) as i64;
        if price < self.lower_price {
            return Ok(-1);
        }
        if price > self.upper_price {
            return Ok(top);
        }
        let offset = (price - self.lower_price)
            .checked_div(self.price_step)
            .and_then(Money::trunc_to_i64)
            .ok_or_else(|| {
                GridError::InternalInconsistency(format!("cannot index price {} on grid", price))
            })?;
        Ok(offset.min(top))
    }

    /// Price of level `index`; `None` outside `0..level_count`
    pub fn level(&self, index: i64) -> Option<Money> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.levels.get(i))
            .copied()
    }

    pub fn levels(&self) -> &[Money] {
        &self.levels
    }

    pub fn lower_price(&self) -> Money {
        self.lower_price
    }

    pub fn upper_price(&self) -> Money {
        self.upper_price
    }

    pub fn level_count(&self) -> usize {
        self.level_count
    }

    pub fn price_step(&self) -> Money {
        self.price_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn m(value: rust_decimal::Decimal) -> Money {
        Money::new(value)
    }

    fn grid_90_110() -> PriceGrid {
        PriceGrid::new(m(dec!(90)), m(dec!(110)), 5).unwrap()
    }

    #[test]
    fn test_levels_are_evenly_spaced() {
        let grid = grid_90_110();
        assert_eq!(grid.price_step(), m(dec!(5)));
        assert_eq!(
            grid.levels(),
            &[m(dec!(90)), m(dec!(95)), m(dec!(100)), m(dec!(105)), m(dec!(110))]
        );
    }

    #[test]
    fn test_step_is_truncated_and_top_level_pinned() {
        let grid = PriceGrid::new(m(dec!(100)), m(dec!(200)), 4).unwrap();
        assert_eq!(grid.price_step(), m(dec!(33.33333333)));
        assert_eq!(grid.levels()[2], m(dec!(166.66666666)));
        assert_eq!(grid.levels()[3], m(dec!(200)));
    }

    #[test]
    fn test_level_index_boundaries() {
        let grid = grid_90_110();
        assert_eq!(grid.level_index_of(m(dec!(89.99))).unwrap(), -1);
        assert_eq!(grid.level_index_of(m(dec!(90))).unwrap(), 0);
        assert_eq!(grid.level_index_of(m(dec!(94.99999))).unwrap(), 0);
        assert_eq!(grid.level_index_of(m(dec!(95))).unwrap(), 1);
        assert_eq!(grid.level_index_of(m(dec!(100))).unwrap(), 2);
        assert_eq!(grid.level_index_of(m(dec!(109.99))).unwrap(), 3);
        assert_eq!(grid.level_index_of(m(dec!(110))).unwrap(), 4);
        assert_eq!(grid.level_index_of(m(dec!(250))).unwrap(), 4);
        assert_eq!(grid.level_index_of(Money::ZERO).unwrap(), -1);
    }

    #[test]
    fn test_upper_bound_indexes_to_top_with_truncated_step() {
        let grid = PriceGrid::new(m(dec!(100)), m(dec!(200)), 4).unwrap();
        assert_eq!(grid.level_index_of(m(dec!(200))).unwrap(), 3);
        assert_eq!(grid.level_index_of(m(dec!(199.99))).unwrap(), 2);
    }

    #[test]
    fn test_negative_price_rejected() {
        let grid = grid_90_110();
        assert!(matches!(
            grid.level_index_of(m(dec!(-1))),
            Err(GridError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_invalid_construction() {
        assert!(PriceGrid::new(Money::ZERO, m(dec!(10)), 3).is_err());
        assert!(PriceGrid::new(m(dec!(10)), m(dec!(-10)), 3).is_err());
        assert!(PriceGrid::new(m(dec!(10)), m(dec!(10)), 3).is_err());
        assert!(PriceGrid::new(m(dec!(20)), m(dec!(10)), 3).is_err());
        assert!(PriceGrid::new(m(dec!(10)), m(dec!(20)), 1).is_err());
        assert!(PriceGrid::new(m(dec!(10)), m(dec!(20)), 2).is_ok());
    }

    #[test]
    fn test_level_lookup() {
        let grid = grid_90_110();
        assert_eq!(grid.level(0), Some(m(dec!(90))));
        assert_eq!(grid.level(4), Some(m(dec!(110))));
        assert_eq!(grid.level(-1), None);
        assert_eq!(grid.level(5), None);
    }
}
