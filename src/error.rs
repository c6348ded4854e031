//! Error taxonomy of the grid engine

use crate::Money;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// Malformed grid bounds, level count, lot size or price. Fatal to construction.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Investment cannot cover a single lot on every level
    #[error(
        "Not enough investment: {investment} does not cover one lot per level ({required_per_level} per level required)"
    )]
    InsufficientInvestment {
        investment: Money,
        required_per_level: Money,
    },

    /// Ledger or engine state contradicts its own invariants
    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),

    /// An executor could not fill an order. The caller decides whether to retry.
    #[error("Execution failure: {0}")]
    ExecutionFailure(String),
}

impl GridError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Self::ExecutionFailure(msg.into())
    }
}

pub type GridResult<T> = Result<T, GridError>;
