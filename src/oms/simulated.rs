//! Simulated executor for backtests
//!
//! Market orders fill at the current mark price. Limit orders rest until a
//! price sweep reaches them: a falling sweep fills buy orders in
//! `[current, previous)`, a rising sweep fills sell orders in
//! `(previous, current]`. Both fill at the limit price.
//!
//! The mark price is owned by the executor and moved only by
//! [`OrderExecutor::advance_to`].

use crate::error::{GridError, GridResult};
use crate::oms::executor::OrderExecutor;
use crate::oms::types::{Fill, Order, OrderId, OrderRequest, OrderType};
use crate::{Money, Side};

#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    lot_size: Money,
    /// Fraction of the notional charged per fill
    fee: Money,
    mark_price: Option<Money>,
    orders: Vec<Order>,
    next_order_id: OrderId,
}

impl SimulatedExecutor {
    pub fn new(lot_size: Money, fee: Money) -> GridResult<Self> {
        if !lot_size.is_positive() {
            return Err(GridError::invalid(format!("lot size must be positive: {}", lot_size)));
        }
        if fee.is_negative() || fee >= Money::ONE {
            return Err(GridError::invalid(format!("fee must be in [0, 1): {}", fee)));
        }
        Ok(Self {
            lot_size,
            fee,
            mark_price: None,
            orders: Vec::new(),
            next_order_id: 1,
        })
    }

    pub fn mark_price(&self) -> Option<Money> {
        self.mark_price
    }

    /// Fill and remove resting orders crossed by a move from `previous` to `current`
    pub fn settle_sweep(&mut self, previous: Money, current: Money) -> Vec<Fill> {
        if previous == current {
            return Vec::new();
        }
        let falling = current < previous;

        let (mut crossed, resting): (Vec<Order>, Vec<Order>) =
            std::mem::take(&mut self.orders).into_iter().partition(|order| {
                let Some(price) = order.limit_price else {
                    return false;
                };
                if falling {
                    order.side == Side::Buy && current <= price && price < previous
                } else {
                    order.side == Side::Sell && previous < price && price <= current
                }
            });
        self.orders = resting;

        // Fill in the order the path reaches the prices
        crossed.sort_by_key(|order| order.limit_price);
        if falling {
            crossed.reverse();
        }

        crossed
            .into_iter()
            .filter_map(|order| {
                let price = order.limit_price?;
                Some(self.fill(order.id, order.side, price, Some(price), order.lots))
            })
            .collect()
    }

    fn fill(
        &self,
        order_id: OrderId,
        side: Side,
        price: Money,
        limit_price: Option<Money>,
        lots: u64,
    ) -> Fill {
        let notional = price * self.lot_size * Money::from(lots);
        let amount = match side {
            Side::Buy => notional * (Money::ONE + self.fee),
            Side::Sell => notional * (Money::ONE - self.fee),
        };
        tracing::debug!(order_id, side = %side, price = %price, lots, amount = %amount, "Simulated fill");
        Fill {
            order_id,
            side,
            price,
            limit_price,
            lots,
            amount,
        }
    }

    fn next_id(&mut self) -> OrderId {
        let id = self.next_order_id;
        self.next_order_id += 1;
        id
    }
}

impl OrderExecutor for SimulatedExecutor {
    fn place_market(&mut self, request: &OrderRequest) -> GridResult<Fill> {
        if request.lots == 0 {
            return Err(GridError::invalid("order must be at least one lot"));
        }
        let price = self
            .mark_price
            .ok_or_else(|| GridError::execution("no simulated price to fill a market order"))?;
        let id = self.next_id();
        Ok(self.fill(id, request.side, price, None, request.lots))
    }

    fn place_limit(&mut self, request: &OrderRequest) -> GridResult<OrderId> {
        if request.order_type != OrderType::Limit {
            return Err(GridError::invalid("limit placement needs a limit order"));
        }
        if request.lots == 0 {
            return Err(GridError::invalid("order must be at least one lot"));
        }
        match request.limit_price {
            Some(price) if price.is_positive() => {}
            other => {
                return Err(GridError::invalid(format!("invalid limit price: {:?}", other)));
            }
        }
        let id = self.next_id();
        self.orders.push(Order::from_request(id, request));
        Ok(id)
    }

    fn cancel_all(&mut self) -> GridResult<()> {
        let cancelled = self.orders.len();
        self.orders.clear();
        tracing::debug!(cancelled, "Simulated orders cancelled");
        Ok(())
    }

    fn advance_to(&mut self, price: Money) -> GridResult<Vec<Fill>> {
        if !price.is_positive() {
            return Err(GridError::invalid(format!("price must be positive: {}", price)));
        }
        let fills = match self.mark_price {
            Some(previous) => self.settle_sweep(previous, price),
            None => Vec::new(),
        };
        self.mark_price = Some(price);
        Ok(fills)
    }

    fn open_orders(&self) -> Vec<Order> {
        self.orders.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn m(value: rust_decimal::Decimal) -> Money {
        Money::new(value)
    }

    #[test]
    fn test_market_order_needs_mark_price() {
        let mut executor = SimulatedExecutor::new(Money::ONE, Money::ZERO).unwrap();
        let err = executor.place_market(&OrderRequest::market(Side::Buy, 1)).unwrap_err();
        assert!(matches!(err, GridError::ExecutionFailure(_)));
    }

    #[test]
    fn test_market_fill_at_mark_with_fee() {
        let mut executor = SimulatedExecutor::new(m(dec!(10)), m(dec!(0.001))).unwrap();
        executor.advance_to(m(dec!(100))).unwrap();

        let buy = executor.place_market(&OrderRequest::market(Side::Buy, 2)).unwrap();
        assert_eq!(buy.price, m(dec!(100)));
        // Fee lands on the notional; the quantity stays whole lots
        assert_eq!(buy.lots, 2);
        assert_eq!(buy.amount, m(dec!(2002)));
        assert_eq!(buy.limit_price, None);

        let sell = executor.place_market(&OrderRequest::market(Side::Sell, 2)).unwrap();
        assert_eq!(sell.amount, m(dec!(1998)));
        assert!(sell.order_id > buy.order_id);
    }

    #[test]
    fn test_falling_sweep_fills_buys_only() {
        let mut executor = SimulatedExecutor::new(Money::ONE, Money::ZERO).unwrap();
        executor.advance_to(m(dec!(100))).unwrap();
        executor.place_limit(&OrderRequest::limit(Side::Buy, 1, m(dec!(95)))).unwrap();
        executor.place_limit(&OrderRequest::limit(Side::Buy, 1, m(dec!(90)))).unwrap();
        executor.place_limit(&OrderRequest::limit(Side::Sell, 1, m(dec!(105)))).unwrap();

        assert!(executor.advance_to(m(dec!(95.01))).unwrap().is_empty());

        let fills = executor.advance_to(m(dec!(95))).unwrap();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].side, Side::Buy);
        assert_eq!(fills[0].price, m(dec!(95)));
        assert_eq!(fills[0].limit_price, Some(m(dec!(95))));
        assert_eq!(executor.open_orders().len(), 2);
    }

    #[test]
    fn test_rising_sweep_fills_sells_at_limit() {
        let mut executor = SimulatedExecutor::new(Money::ONE, Money::ZERO).unwrap();
        executor.advance_to(m(dec!(100))).unwrap();
        executor.place_limit(&OrderRequest::limit(Side::Sell, 1, m(dec!(105)))).unwrap();
        executor.place_limit(&OrderRequest::limit(Side::Sell, 1, m(dec!(110)))).unwrap();
        executor.place_limit(&OrderRequest::limit(Side::Buy, 1, m(dec!(95)))).unwrap();

        let fills = executor.advance_to(m(dec!(112))).unwrap();
        assert_eq!(fills.len(), 2);
        assert!(fills.iter().all(|f| f.side == Side::Sell));
        assert_eq!(fills[0].amount, m(dec!(105)));
        assert_eq!(executor.open_orders().len(), 1);
    }

    #[test]
    fn test_sell_at_mark_fills_only_after_price_returns() {
        let mut executor = SimulatedExecutor::new(Money::ONE, Money::ZERO).unwrap();
        executor.advance_to(m(dec!(100))).unwrap();
        executor.place_limit(&OrderRequest::limit(Side::Sell, 1, m(dec!(100)))).unwrap();
        assert!(executor.advance_to(m(dec!(99))).unwrap().is_empty());
        assert_eq!(executor.advance_to(m(dec!(100))).unwrap().len(), 1);
    }

    #[test]
    fn test_cancel_all() {
        let mut executor = SimulatedExecutor::new(Money::ONE, Money::ZERO).unwrap();
        executor.place_limit(&OrderRequest::limit(Side::Buy, 1, m(dec!(95)))).unwrap();
        executor.cancel_all().unwrap();
        assert!(executor.open_orders().is_empty());
    }

    #[test]
    fn test_invalid_construction() {
        assert!(SimulatedExecutor::new(Money::ZERO, Money::ZERO).is_err());
        assert!(SimulatedExecutor::new(Money::ONE, Money::ONE).is_err());
        assert!(SimulatedExecutor::new(Money::ONE, m(dec!(-0.1))).is_err());
    }
}
