//! Core OMS types
//!
//! Orders are sized in whole lots; a fill reports the executed price and the
//! notional that changed hands. All monetary values use [`Money`].

use serde::{Deserialize, Serialize};

use crate::{Money, Side};

/// Order ID type, assigned by the executor that accepted the order
pub type OrderId = u64;

/// Order type - determines execution logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Execute immediately at the current price
    Market,

    /// Rest until the price reaches the limit
    /// Buy limit: executes when price falls to limit_price
    /// Sell limit: executes when price rises to limit_price
    Limit,
}

/// Order state as reported by an executor or broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    /// Accepted and resting
    New,

    /// Completely filled
    Filled,

    /// Cancelled by us
    Cancelled,

    /// Rejected by the venue
    Rejected,
}

/// Order request from the strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub side: Side,
    pub order_type: OrderType,
    pub lots: u64,
    pub limit_price: Option<Money>,
}

impl OrderRequest {
    pub fn market(side: Side, lots: u64) -> Self {
        Self {
            side,
            order_type: OrderType::Market,
            lots,
            limit_price: None,
        }
    }

    pub fn limit(side: Side, lots: u64, limit_price: Money) -> Self {
        Self {
            side,
            order_type: OrderType::Limit,
            lots,
            limit_price: Some(limit_price),
        }
    }
}

/// Resting order tracked by an executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub order_type: OrderType,
    pub lots: u64,
    pub limit_price: Option<Money>,
    pub state: OrderState,
    pub client_id: Option<String>,
}

impl Order {
    pub fn from_request(id: OrderId, request: &OrderRequest) -> Self {
        Self {
            id,
            side: request.side,
            order_type: request.order_type,
            lots: request.lots,
            limit_price: request.limit_price,
            state: OrderState::New,
            client_id: None,
        }
    }

    pub fn with_client_id(mut self, client_id: String) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn is_active(&self) -> bool {
        self.state == OrderState::New
    }
}

/// Individual fill record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub side: Side,
    /// Executed price, which may improve on the limit
    pub price: Money,
    /// Grid level of the originating limit order, `None` for market fills
    #[serde(default)]
    pub limit_price: Option<Money>,
    pub lots: u64,
    /// Base currency paid (buy) or received (sell), fees included
    pub amount: Money,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_market_request() {
        let req = OrderRequest::market(Side::Buy, 3);
        assert_eq!(req.side, Side::Buy);
        assert_eq!(req.order_type, OrderType::Market);
        assert_eq!(req.lots, 3);
        assert!(req.limit_price.is_none());
    }

    #[test]
    fn test_limit_order_from_request() {
        let req = OrderRequest::limit(Side::Sell, 2, Money::new(dec!(105)));
        let order = Order::from_request(7, &req).with_client_id("abc".to_string());
        assert_eq!(order.id, 7);
        assert_eq!(order.limit_price, Some(Money::new(dec!(105))));
        assert_eq!(order.client_id.as_deref(), Some("abc"));
        assert!(order.is_active());
    }
}
