//! Position ledger
//!
//! Holds the running base-currency and instrument amounts of one strategy and
//! pairs fills into round trips for profit attribution. Balance and profit are
//! computed on demand from holdings and a reference price.

use serde::Serialize;

use crate::error::{GridError, GridResult};
use crate::{Money, Side};

/// One executed fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub side: Side,
    pub price: Money,
    /// Notional paid (buy) or received (sell), fees included
    pub amount: Money,
    pub lots: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionPair {
    pub open: Transaction,
    pub close: Option<Transaction>,
    /// Inventory adjustments outside grid trading (start-up buy, close-out sell).
    /// Never paired with a later fill.
    pub standalone: bool,
}

impl TransactionPair {
    pub fn is_complete(&self) -> bool {
        self.close.is_some()
    }

    /// Realized profit of a complete pair, `None` while still open
    pub fn profit(&self) -> GridResult<Option<Money>> {
        let Some(close) = self.close else {
            return Ok(None);
        };
        match (self.open.side, close.side) {
            (Side::Buy, Side::Sell) => Ok(Some(close.amount - self.open.amount)),
            (Side::Sell, Side::Buy) => Ok(Some(self.open.amount - close.amount)),
            (open, close) => Err(GridError::InternalInconsistency(format!(
                "pair opened with {} was closed with {}",
                open, close
            ))),
        }
    }

    fn transaction_count(&self) -> usize {
        if self.is_complete() {
            2
        } else {
            1
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionLedger {
    pairs: Vec<TransactionPair>,
    base_amount: Money,
    instrument_amount: Money,
    initial_balance: Money,
    lot_size: Money,
}

impl PositionLedger {
    /// Start with `initial_balance` in base currency and no instrument
    pub fn new(initial_balance: Money, lot_size: Money) -> Self {
        Self {
            pairs: Vec::new(),
            base_amount: initial_balance,
            instrument_amount: Money::ZERO,
            initial_balance,
            lot_size,
        }
    }

    /// Record a grid fill and pair it with the latest open round trip
    pub fn record(&mut self, side: Side, price: Money, amount: Money, lots: u64) -> GridResult<()> {
        let transaction = self.apply(side, price, amount, lots)?;

        let open_pair = self
            .pairs
            .iter_mut()
            .rev()
            .find(|pair| !pair.standalone && !pair.is_complete());

        match open_pair {
            Some(pair) if pair.open.side == side.opposite() => {
                pair.close = Some(transaction);
            }
            _ => self.pairs.push(TransactionPair {
                open: transaction,
                close: None,
                standalone: false,
            }),
        }
        Ok(())
    }

    /// Record an inventory adjustment that takes no part in round-trip pairing
    pub fn record_standalone(
        &mut self,
        side: Side,
        price: Money,
        amount: Money,
        lots: u64,
    ) -> GridResult<()> {
        let transaction = self.apply(side, price, amount, lots)?;
        self.pairs.push(TransactionPair {
            open: transaction,
            close: None,
            standalone: true,
        });
        Ok(())
    }

    fn apply(&mut self, side: Side, price: Money, amount: Money, lots: u64) -> GridResult<Transaction> {
        if !price.is_positive() {
            return Err(GridError::invalid(format!("fill price must be positive: {}", price)));
        }
        if amount.is_negative() {
            return Err(GridError::invalid(format!("fill amount must not be negative: {}", amount)));
        }

        let quantity = Money::from(lots) * self.lot_size;
        match side {
            Side::Buy => {
                self.base_amount -= amount;
                self.instrument_amount += quantity;
            }
            Side::Sell => {
                self.base_amount += amount;
                self.instrument_amount -= quantity;
            }
        }

        tracing::debug!(
            side = %side,
            price = %price,
            amount = %amount,
            lots,
            base = %self.base_amount,
            instrument = %self.instrument_amount,
            "Transaction recorded"
        );

        Ok(Transaction {
            side,
            price,
            amount,
            lots,
        })
    }

    /// Sum of profits over complete round trips
    pub fn realized_profit(&self) -> GridResult<Money> {
        let mut total = Money::ZERO;
        for pair in &self.pairs {
            if let Some(profit) = pair.profit()? {
                total += profit;
            }
        }
        Ok(total)
    }

    pub fn balance_at(&self, price: Money) -> Money {
        self.base_amount + self.instrument_amount * price
    }

    pub fn unrealized_profit(&self, price: Money) -> GridResult<Money> {
        Ok(self.balance_at(price) - self.realized_profit()? - self.initial_balance)
    }

    /// Incomplete pairs count once, complete pairs twice
    pub fn transactions_count(&self) -> usize {
        self.pairs.iter().map(TransactionPair::transaction_count).sum()
    }

    pub fn pairs(&self) -> &[TransactionPair] {
        &self.pairs
    }

    pub fn base_amount(&self) -> Money {
        self.base_amount
    }

    pub fn instrument_amount(&self) -> Money {
        self.instrument_amount
    }

    /// Whole lots currently held
    pub fn lots_held(&self) -> u64 {
        self.instrument_amount
            .checked_div(self.lot_size)
            .and_then(Money::trunc_to_i64)
            .and_then(|lots| u64::try_from(lots).ok())
            .unwrap_or(0)
    }

    pub fn initial_balance(&self) -> Money {
        self.initial_balance
    }

    pub fn lot_size(&self) -> Money {
        self.lot_size
    }
}
