//! Live executor over a broker connection
//!
//! Every submission carries a fresh client order id so the venue can
//! deduplicate resends. Failed or unexpected reports surface as
//! `ExecutionFailure`; nothing is retried here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GridError, GridResult};
use crate::oms::executor::OrderExecutor;
use crate::oms::types::{Fill, Order, OrderId, OrderRequest, OrderState, OrderType};
use crate::{Money, Side};

/// Order as submitted to the venue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerOrder {
    pub client_order_id: String,
    pub instrument_id: String,
    pub side: Side,
    pub order_type: OrderType,
    pub lots: u64,
    pub price: Option<Money>,
}

/// Order state as reported by the venue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerReport {
    pub client_order_id: String,
    pub state: OrderState,
    /// Average execution price, zero until something filled
    pub price: Money,
    /// Executed notional in base currency
    pub amount: Money,
    pub lots: u64,
}

/// Connection to a trading venue
pub trait Broker {
    fn post_order(&mut self, order: &BrokerOrder) -> GridResult<BrokerReport>;

    fn order_state(&mut self, client_order_id: &str) -> GridResult<BrokerReport>;

    fn cancel_order(&mut self, client_order_id: &str) -> GridResult<()>;
}

pub struct LiveExecutor<B: Broker> {
    broker: B,
    instrument_id: String,
    resting: Vec<Order>,
    next_order_id: OrderId,
}

impl<B: Broker> LiveExecutor<B> {
    pub fn new(broker: B, instrument_id: impl Into<String>) -> Self {
        Self {
            broker,
            instrument_id: instrument_id.into(),
            resting: Vec::new(),
            next_order_id: 1,
        }
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    fn submit(&mut self, request: &OrderRequest) -> GridResult<(Order, BrokerReport)> {
        let client_order_id = Uuid::new_v4().to_string();
        let order = BrokerOrder {
            client_order_id: client_order_id.clone(),
            instrument_id: self.instrument_id.clone(),
            side: request.side,
            order_type: request.order_type,
            lots: request.lots,
            price: request.limit_price,
        };

        tracing::info!(
            client_order_id = %client_order_id,
            side = %request.side,
            order_type = ?request.order_type,
            lots = request.lots,
            "Posting order"
        );
        let report = self.broker.post_order(&order)?;

        let id = self.next_order_id;
        self.next_order_id += 1;
        let order = Order::from_request(id, request).with_client_id(client_order_id);
        Ok((order, report))
    }
}

fn fill_from_report(order: &Order, report: &BrokerReport) -> Fill {
    Fill {
        order_id: order.id,
        side: order.side,
        price: report.price,
        limit_price: order.limit_price,
        lots: report.lots,
        amount: report.amount,
    }
}

impl<B: Broker> OrderExecutor for LiveExecutor<B> {
    fn place_market(&mut self, request: &OrderRequest) -> GridResult<Fill> {
        let (order, report) = self.submit(request)?;
        if report.state != OrderState::Filled {
            return Err(GridError::execution(format!(
                "market order {} ended in state {:?}",
                report.client_order_id, report.state
            )));
        }
        Ok(fill_from_report(&order, &report))
    }

    fn place_limit(&mut self, request: &OrderRequest) -> GridResult<OrderId> {
        let (order, report) = self.submit(request)?;
        match report.state {
            // Filled on arrival; picked up by the next poll
            OrderState::New | OrderState::Filled => {
                let id = order.id;
                self.resting.push(order);
                Ok(id)
            }
            state => Err(GridError::execution(format!(
                "limit order {} ended in state {:?}",
                report.client_order_id, state
            ))),
        }
    }

    /// Every resting order gets a cancel attempt. Orders the venue refused to
    /// cancel stay tracked and the first error is returned.
    fn cancel_all(&mut self) -> GridResult<()> {
        let mut first_error = None;
        let mut still_resting = Vec::new();

        for order in std::mem::take(&mut self.resting) {
            let Some(client_order_id) = order.client_id.as_deref() else {
                continue;
            };
            if let Err(err) = self.broker.cancel_order(client_order_id) {
                tracing::warn!(client_order_id = %client_order_id, error = %err, "Cancel failed");
                first_error.get_or_insert(err);
                still_resting.push(order);
            }
        }

        self.resting = still_resting;
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn advance_to(&mut self, _price: Money) -> GridResult<Vec<Fill>> {
        let mut fills = Vec::new();
        let mut still_resting = Vec::with_capacity(self.resting.len());

        for order in std::mem::take(&mut self.resting) {
            let Some(client_order_id) = order.client_id.clone() else {
                continue;
            };
            let report = match self.broker.order_state(&client_order_id) {
                Ok(report) => report,
                Err(err) => {
                    tracing::warn!(client_order_id = %client_order_id, error = %err, "Order state poll failed");
                    still_resting.push(order);
                    continue;
                }
            };
            match report.state {
                OrderState::New => still_resting.push(order),
                OrderState::Filled => fills.push(fill_from_report(&order, &report)),
                state => {
                    tracing::warn!(client_order_id = %client_order_id, ?state, "Limit order left the book unfilled");
                }
            }
        }

        self.resting = still_resting;
        Ok(fills)
    }

    fn open_orders(&self) -> Vec<Order> {
        self.resting.clone()
    }
}
