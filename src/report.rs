//! Strategy statistics and reporting sinks

use serde::Serialize;

use crate::error::GridResult;
use crate::ledger::PositionLedger;
use crate::types::DEFAULT_SCALE;
use crate::Money;

/// Display precision of profit figures
const DISPLAY_SCALE: u32 = 2;

/// Profit figures of one strategy at a reference price.
/// Fractions are relative to the initial balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridStatistics {
    pub total_profit: Money,
    pub total_profit_fraction: Money,
    pub realized_profit: Money,
    pub realized_profit_fraction: Money,
    pub unrealized_profit: Money,
    pub unrealized_profit_fraction: Money,
    pub transactions_count: usize,
}

impl GridStatistics {
    pub fn from_ledger(ledger: &PositionLedger, price: Money) -> GridResult<Self> {
        let initial = ledger.initial_balance();
        let total_profit = ledger.balance_at(price) - initial;
        let realized_profit = ledger.realized_profit()?;
        let unrealized_profit = ledger.unrealized_profit(price)?;

        Ok(Self {
            total_profit,
            total_profit_fraction: fraction_of(total_profit, initial),
            realized_profit,
            realized_profit_fraction: fraction_of(realized_profit, initial),
            unrealized_profit,
            unrealized_profit_fraction: fraction_of(unrealized_profit, initial),
            transactions_count: ledger.transactions_count(),
        })
    }
}

fn fraction_of(value: Money, base: Money) -> Money {
    value
        .checked_div(base)
        .map(|fraction| fraction.trunc_dp(DEFAULT_SCALE))
        .unwrap_or(Money::ZERO)
}

/// `+12.34` for gains, `-5.67` for losses, truncated to two decimals
pub fn format_profit(value: Money) -> String {
    let prefix = if value.is_positive() { "+" } else { "" };
    format!("{}{:.2}", prefix, value.trunc_dp(DISPLAY_SCALE).inner())
}

/// Fraction as a signed percentage, e.g. `0.0123` becomes `+1.23%`
pub fn format_profit_pct(fraction: Money) -> String {
    let prefix = if fraction.is_positive() { "+" } else { "" };
    let pct = (fraction * Money::from_i64(100)).trunc_dp(DISPLAY_SCALE);
    format!("{}{:.2}%", prefix, pct.inner())
}

/// Receives computed statistics for display
pub trait ReportSink {
    fn publish(&mut self, label: &str, stats: &GridStatistics);
}

/// Prints a result block to stdout
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn publish(&mut self, label: &str, stats: &GridStatistics) {
        println!("\n{}", "=".repeat(60));
        println!("{}", label);
        println!("{}", "=".repeat(60));
        println!(
            "Total profit:      {} ({})",
            format_profit(stats.total_profit),
            format_profit_pct(stats.total_profit_fraction)
        );
        println!(
            "Grid profit:       {} ({})",
            format_profit(stats.realized_profit),
            format_profit_pct(stats.realized_profit_fraction)
        );
        println!(
            "Unrealized profit: {} ({})",
            format_profit(stats.unrealized_profit),
            format_profit_pct(stats.unrealized_profit_fraction)
        );
        println!("Transactions:      {}", stats.transactions_count);
        println!("{}", "=".repeat(60));
    }
}

/// Emits statistics as a structured log event
#[derive(Debug, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn publish(&mut self, label: &str, stats: &GridStatistics) {
        tracing::info!(
            label,
            total_profit = %format_profit(stats.total_profit),
            total_profit_pct = %format_profit_pct(stats.total_profit_fraction),
            grid_profit = %format_profit(stats.realized_profit),
            unrealized_profit = %format_profit(stats.unrealized_profit),
            transactions = stats.transactions_count,
            "Grid statistics"
        );
    }
}
