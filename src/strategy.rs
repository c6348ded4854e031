//! Grid trading strategy
//!
//! [`GridBot`] wires one crossing tracker, one position ledger and one order
//! executor into a running strategy instance. A single instance must be driven
//! by a single stream of prices; it is not meant to be shared between threads.
//!
//! Two order modes are supported:
//! - `Market`: every crossing signal is converted into market orders of
//!   `lots_per_grid` lots, one per signal unit.
//! - `Limit`: a resting limit order is kept on every level except the active
//!   one (buy below the reference price, sell at or above it). Each fill
//!   becomes the new active level and re-arms the ladder.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{GridError, GridResult};
use crate::grid::PriceGrid;
use crate::ledger::PositionLedger;
use crate::oms::{Fill, OrderExecutor, OrderRequest};
use crate::report::{format_profit, GridStatistics};
use crate::tracker::{LevelCrossingTracker, Signal};
use crate::{Money, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderMode {
    #[default]
    Market,
    Limit,
}

/// Everything needed to start one strategy instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridParams {
    pub instrument_id: String,
    pub lower_price: Money,
    pub upper_price: Money,
    pub levels: usize,
    pub investment: Money,
    pub lot_size: Money,
    #[serde(default)]
    pub order_mode: OrderMode,
}

pub struct GridBot<E: OrderExecutor> {
    instrument_id: String,
    tracker: LevelCrossingTracker,
    ledger: PositionLedger,
    executor: E,
    order_mode: OrderMode,
    lots_bought_on_start: u64,
    /// Limit mode: price of the last fill, never re-armed while active
    active_level: Option<Money>,
    /// Limit mode: levels holding a resting order
    armed_levels: BTreeSet<Money>,
    closed: bool,
}

impl<E: OrderExecutor> GridBot<E> {
    /// Build the strategy at `initial_price`, buy the start-up inventory and,
    /// in limit mode, place the initial ladder.
    pub fn new(params: &GridParams, executor: E, initial_price: Money) -> GridResult<Self> {
        if params.instrument_id.trim().is_empty() {
            return Err(GridError::invalid("instrument id must not be empty"));
        }

        let grid = PriceGrid::new(params.lower_price, params.upper_price, params.levels)?;
        let tracker =
            LevelCrossingTracker::new(grid, params.investment, params.lot_size, initial_price)?;
        let ledger = PositionLedger::new(params.investment, params.lot_size);

        tracing::info!(
            instrument = %params.instrument_id,
            lower = %params.lower_price,
            upper = %params.upper_price,
            levels = params.levels,
            step = %tracker.grid().price_step(),
            lots_per_grid = tracker.lots_per_grid(),
            mode = ?params.order_mode,
            "Grid bot created"
        );
        tracing::debug!(levels = ?tracker.grid().levels(), "Price levels");

        let mut bot = Self {
            instrument_id: params.instrument_id.clone(),
            tracker,
            ledger,
            executor,
            order_mode: params.order_mode,
            lots_bought_on_start: 0,
            active_level: None,
            armed_levels: BTreeSet::new(),
            closed: false,
        };

        for fill in bot.executor.advance_to(initial_price)? {
            bot.on_fill(fill)?;
        }
        bot.buy_on_start(initial_price)?;
        if bot.order_mode == OrderMode::Limit {
            bot.arm_ladder(initial_price)?;
        }
        Ok(bot)
    }

    fn buy_on_start(&mut self, initial_price: Money) -> GridResult<()> {
        let lots = self.tracker.lots_to_buy_on_start(initial_price)?;
        if lots == 0 {
            return Ok(());
        }

        tracing::info!(price = %initial_price, lots, "Making initial order");
        match self.executor.place_market(&OrderRequest::market(Side::Buy, lots)) {
            Ok(fill) => {
                self.ledger
                    .record_standalone(fill.side, fill.price, fill.amount, fill.lots)?;
                self.lots_bought_on_start = fill.lots;
                if self.order_mode == OrderMode::Limit {
                    self.active_level = Some(fill.price);
                }
                Ok(())
            }
            Err(GridError::ExecutionFailure(reason)) => {
                tracing::warn!(%reason, "Initial order failed");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Feed the next observed price
    pub fn on_price(&mut self, price: Money) -> GridResult<()> {
        if self.closed {
            return Ok(());
        }

        for fill in self.executor.advance_to(price)? {
            self.on_fill(fill)?;
        }

        if self.order_mode == OrderMode::Market {
            let signal = self.tracker.observe(price)?;
            self.execute_signal(signal)?;
        }
        Ok(())
    }

    fn execute_signal(&mut self, signal: Signal) -> GridResult<()> {
        let side = match signal {
            Signal::Hold => return Ok(()),
            Signal::Buy { .. } => Side::Buy,
            Signal::Sell { .. } => Side::Sell,
        };
        let request = OrderRequest::market(side, self.tracker.lots_per_grid());

        for _ in 0..signal.units() {
            match self.executor.place_market(&request) {
                Ok(fill) => self.record_fill(&fill)?,
                Err(GridError::ExecutionFailure(reason)) => {
                    tracing::warn!(side = %side, %reason, "Market order failed, continuing");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Apply an executed limit order. The ladder is keyed on the order's
    /// level, not on the possibly improved execution price.
    pub fn on_fill(&mut self, fill: Fill) -> GridResult<()> {
        self.record_fill(&fill)?;
        if self.order_mode == OrderMode::Limit && !self.closed {
            let level = fill.limit_price.unwrap_or(fill.price);
            self.active_level = Some(level);
            self.armed_levels.remove(&level);
            self.arm_ladder(level)?;
        }
        Ok(())
    }

    fn record_fill(&mut self, fill: &Fill) -> GridResult<()> {
        self.ledger.record(fill.side, fill.price, fill.amount, fill.lots)?;
        tracing::info!(
            side = %fill.side,
            price = %fill.price,
            lots = fill.lots,
            balance = %self.ledger.balance_at(fill.price),
            grid_profit = %format_profit(self.ledger.realized_profit()?),
            "Order processed"
        );
        Ok(())
    }

    fn arm_ladder(&mut self, reference_price: Money) -> GridResult<()> {
        let lots = self.tracker.lots_per_grid();
        let levels = self.tracker.grid().levels().to_vec();

        for level in levels {
            if self.armed_levels.contains(&level) || self.active_level == Some(level) {
                continue;
            }
            let side = if level < reference_price {
                Side::Buy
            } else {
                Side::Sell
            };
            match self.executor.place_limit(&OrderRequest::limit(side, lots, level)) {
                Ok(_) => {
                    self.armed_levels.insert(level);
                }
                Err(GridError::ExecutionFailure(reason)) => {
                    tracing::warn!(side = %side, price = %level, %reason, "Limit order failed");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Cancel resting orders and optionally sell the remaining inventory.
    /// Prices fed afterwards are ignored.
    pub fn close(&mut self, sell_inventory: bool) -> GridResult<()> {
        self.executor.cancel_all()?;
        self.armed_levels.clear();
        self.closed = true;

        let lots = self.ledger.lots_held();
        if sell_inventory && lots > 0 {
            tracing::info!(lots, "Selling inventory");
            match self.executor.place_market(&OrderRequest::market(Side::Sell, lots)) {
                Ok(fill) => {
                    self.ledger
                        .record_standalone(fill.side, fill.price, fill.amount, fill.lots)?;
                }
                Err(GridError::ExecutionFailure(reason)) => {
                    tracing::warn!(%reason, "Closing sell failed");
                }
                Err(err) => return Err(err),
            }
        }

        tracing::info!(
            instrument = %self.instrument_id,
            grid_profit = %format_profit(self.ledger.realized_profit()?),
            base = %self.ledger.base_amount(),
            instrument_amount = %self.ledger.instrument_amount(),
            "Grid bot closed"
        );
        Ok(())
    }

    pub fn statistics(&self, price: Money) -> GridResult<GridStatistics> {
        GridStatistics::from_ledger(&self.ledger, price)
    }

    pub fn instrument_id(&self) -> &str {
        &self.instrument_id
    }

    pub fn tracker(&self) -> &LevelCrossingTracker {
        &self.tracker
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn order_mode(&self) -> OrderMode {
        self.order_mode
    }

    pub fn lots_bought_on_start(&self) -> u64 {
        self.lots_bought_on_start
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
