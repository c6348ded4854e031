//! Order Management System (OMS)
//!
//! Order execution for the grid strategy:
//! - [`OrderExecutor`] capability used by the strategy
//! - [`SimulatedExecutor`] for deterministic backtest fills
//! - [`LiveExecutor`] adapting a [`Broker`] connection

pub mod executor;
pub mod live;
pub mod simulated;
pub mod types;

// Re-export core types
pub use executor::OrderExecutor;
pub use live::{Broker, BrokerOrder, BrokerReport, LiveExecutor};
pub use simulated::SimulatedExecutor;
pub use types::{Fill, Order, OrderId, OrderRequest, OrderState, OrderType};
