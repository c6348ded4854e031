//! Order execution capability
//!
//! The strategy talks to exactly one [`OrderExecutor`]: the backtest uses
//! [`SimulatedExecutor`](super::SimulatedExecutor), live trading uses
//! [`LiveExecutor`](super::LiveExecutor) over a broker connection.

use crate::error::GridResult;
use crate::oms::types::{Fill, Order, OrderId, OrderRequest};
use crate::Money;

pub trait OrderExecutor {
    /// Execute a market order now. Fails with `ExecutionFailure` if nothing was filled.
    fn place_market(&mut self, request: &OrderRequest) -> GridResult<Fill>;

    /// Leave a limit order resting until the price reaches it
    fn place_limit(&mut self, request: &OrderRequest) -> GridResult<OrderId>;

    /// Cancel every resting order
    fn cancel_all(&mut self) -> GridResult<()>;

    /// Move to the next observed price and collect the limit orders it filled
    fn advance_to(&mut self, price: Money) -> GridResult<Vec<Fill>>;

    fn open_orders(&self) -> Vec<Order>;
}

impl<E: OrderExecutor + ?Sized> OrderExecutor for Box<E> {
    fn place_market(&mut self, request: &OrderRequest) -> GridResult<Fill> {
        (**self).place_market(request)
    }

    fn place_limit(&mut self, request: &OrderRequest) -> GridResult<OrderId> {
        (**self).place_limit(request)
    }

    fn cancel_all(&mut self) -> GridResult<()> {
        (**self).cancel_all()
    }

    fn advance_to(&mut self, price: Money) -> GridResult<Vec<Fill>> {
        (**self).advance_to(price)
    }

    fn open_orders(&self) -> Vec<Order> {
        (**self).open_orders()
    }
}
