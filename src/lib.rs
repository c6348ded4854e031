//! Grid Trading Engine
//!
//! Splits a price range into evenly spaced levels, buys as the price falls
//! through them and sells as it rises, and accounts realized and unrealized
//! profit. Includes a deterministic OHLC backtest replayer and a parallel
//! parameter sweep.

pub mod backtest;
pub mod config;
pub mod data;
pub mod error;
pub mod grid;
pub mod ledger;
pub mod oms;
pub mod optimizer;
pub mod report;
pub mod strategy;
pub mod tracker;
pub mod types;

pub use backtest::{BacktestResult, BacktestSettings, Backtester, SubCandlePath};
pub use config::Config;
pub use error::{GridError, GridResult};
pub use grid::PriceGrid;
pub use ledger::{PositionLedger, Transaction, TransactionPair};
pub use report::GridStatistics;
pub use strategy::{GridBot, GridParams, OrderMode};
pub use tracker::{LevelCrossingTracker, Signal};
pub use types::*;
