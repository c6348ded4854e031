//! Property tests for grid geometry, crossing detection and ledger accounting

use proptest::prelude::*;
use rust_decimal::Decimal;

use grid_bot::{LevelCrossingTracker, Money, PositionLedger, PriceGrid, Side, Signal};

fn cents(value: i64) -> Money {
    Money::new(Decimal::new(value, 2))
}

/// Lower bound, range and level count of a grid with a positive step
fn grid_strategy() -> impl Strategy<Value = (i64, i64, usize)> {
    (100i64..100_000, 100i64..100_000, 2usize..60)
}

proptest! {
    #[test]
    fn test_levels_are_increasing_and_pinned((lower, range, count) in grid_strategy()) {
        let grid = PriceGrid::new(cents(lower), cents(lower + range), count).unwrap();
        let levels = grid.levels();

        prop_assert_eq!(levels.len(), count);
        prop_assert_eq!(levels[0], cents(lower));
        prop_assert_eq!(levels[count - 1], cents(lower + range));
        for pair in levels.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_level_index_is_monotonic(
        (lower, range, count) in grid_strategy(),
        a in 1i64..300_000,
        b in 1i64..300_000,
    ) {
        let grid = PriceGrid::new(cents(lower), cents(lower + range), count).unwrap();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        let low_index = grid.level_index_of(cents(low)).unwrap();
        let high_index = grid.level_index_of(cents(high)).unwrap();
        prop_assert!(low_index <= high_index);
        prop_assert!((-1..count as i64).contains(&low_index));
        prop_assert!((-1..count as i64).contains(&high_index));
    }

    #[test]
    fn test_out_of_range_indices(
        (lower, range, count) in grid_strategy(),
        below in 1i64..100,
        above in 0i64..10_000,
    ) {
        let grid = PriceGrid::new(cents(lower), cents(lower + range), count).unwrap();
        let top = count as i64 - 1;

        prop_assert_eq!(grid.level_index_of(cents(lower - below)).unwrap(), -1);
        prop_assert_eq!(grid.level_index_of(cents(lower + range + above)).unwrap(), top);
        prop_assert_eq!(grid.level_index_of(cents(lower)).unwrap(), 0);
    }

    #[test]
    fn test_oscillation_signals_once(
        boundary in 1usize..9,
        touches in 1usize..20,
        offset in 1i64..99,
    ) {
        // Levels 10.00, 11.00, ..., 20.00
        let grid = PriceGrid::new(cents(1000), cents(2000), 11).unwrap();
        let level = grid.levels()[boundary];
        let below = level - cents(offset);
        let above = level + cents(offset);

        let mut tracker = LevelCrossingTracker::new(grid, cents(100_000_000), Money::ONE, below).unwrap();
        let mut signals = Vec::new();
        for _ in 0..touches {
            signals.push(tracker.observe(above).unwrap());
            signals.push(tracker.observe(below).unwrap());
        }

        let non_zero: Vec<&Signal> = signals.iter().filter(|s| s.units() > 0).collect();
        prop_assert_eq!(non_zero, vec![&Signal::Sell { units: 1 }]);
        prop_assert_eq!(tracker.active_level(), Some(level));
    }

    #[test]
    fn test_oscillation_starting_downward_signals_once(
        boundary in 1usize..9,
        touches in 1usize..20,
        offset in 1i64..99,
    ) {
        let grid = PriceGrid::new(cents(1000), cents(2000), 11).unwrap();
        let level = grid.levels()[boundary];
        let below = level - cents(offset);
        let above = level + cents(offset);

        let mut tracker = LevelCrossingTracker::new(grid, cents(100_000_000), Money::ONE, above).unwrap();
        let mut signals = Vec::new();
        for _ in 0..touches {
            signals.push(tracker.observe(below).unwrap());
            signals.push(tracker.observe(above).unwrap());
        }

        let non_zero: Vec<&Signal> = signals.iter().filter(|s| s.units() > 0).collect();
        prop_assert_eq!(non_zero, vec![&Signal::Buy { units: 1 }]);
        prop_assert_eq!(tracker.active_level(), Some(level));
    }

    #[test]
    fn test_multi_level_jump_counts_skipped_levels(
        start_bucket in 0usize..2,
        end_bucket in 6usize..10,
        start_offset in 1i64..99,
        end_offset in 1i64..99,
    ) {
        let grid = PriceGrid::new(cents(1000), cents(2000), 11).unwrap();
        let start = grid.levels()[start_bucket] + cents(start_offset);
        let end = grid.levels()[end_bucket] + cents(end_offset);

        let mut tracker = LevelCrossingTracker::new(grid, cents(100_000_000), Money::ONE, start).unwrap();
        let signal = tracker.observe(end).unwrap();

        let expected = u32::try_from(end_bucket - start_bucket).unwrap();
        prop_assert!(expected >= 3);
        prop_assert_eq!(signal, Signal::Sell { units: expected });
    }

    #[test]
    fn test_alternating_fills_count_every_transaction(
        prices in prop::collection::vec(100i64..10_000, 1..40),
        lots in 1u64..50,
    ) {
        let mut ledger = PositionLedger::new(cents(100_000_000), Money::ONE);
        for (i, price) in prices.iter().enumerate() {
            let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
            let price = cents(*price);
            ledger.record(side, price, price * Money::from(lots), lots).unwrap();
        }

        prop_assert_eq!(ledger.transactions_count(), prices.len());
        prop_assert_eq!(ledger.pairs().len(), (prices.len() + 1) / 2);
        prop_assert_eq!(ledger.lots_held(), (prices.len() as u64 % 2) * lots);
    }

    #[test]
    fn test_buy_low_sell_high_is_profitable(
        buy in 100i64..10_000,
        markup in 1i64..10_000,
        lots in 1u64..100,
    ) {
        let mut ledger = PositionLedger::new(cents(100_000_000), Money::ONE);
        let buy_price = cents(buy);
        let sell_price = cents(buy + markup);
        ledger.record(Side::Buy, buy_price, buy_price * Money::from(lots), lots).unwrap();
        ledger.record(Side::Sell, sell_price, sell_price * Money::from(lots), lots).unwrap();

        let profit = ledger.realized_profit().unwrap();
        prop_assert!(profit.is_positive());
        prop_assert_eq!(profit, cents(markup) * Money::from(lots));
        prop_assert!(ledger.pairs()[0].is_complete());
    }
}
