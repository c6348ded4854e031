//! Backtest command implementation

use anyhow::Result;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::info;

use grid_bot::report::{format_profit, format_profit_pct, ConsoleSink, ReportSink, TracingSink};
use grid_bot::{Backtester, Config, Money};

/// Command-line values that replace configured ones
#[derive(Debug, Default)]
pub struct Overrides {
    pub lower: Option<Money>,
    pub upper: Option<Money>,
    pub levels: Option<usize>,
    pub investment: Option<Money>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub price_step: Option<Money>,
    pub sell_at_end: bool,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(lower) = self.lower {
            config.grid.lower_price = lower;
        }
        if let Some(upper) = self.upper {
            config.grid.upper_price = upper;
        }
        if let Some(levels) = self.levels {
            config.grid.levels = levels;
        }
        if let Some(investment) = self.investment {
            config.grid.investment = investment;
        }
        if self.start.is_some() {
            config.backtest.start = self.start;
        }
        if self.end.is_some() {
            config.backtest.end = self.end;
        }
        if let Some(step) = self.price_step {
            config.backtest.price_step = step;
        }
        config.backtest.sell_at_end |= self.sell_at_end;
    }
}

pub fn run(config_path: String, overrides: Overrides, output: Option<PathBuf>) -> Result<()> {
    info!("Starting backtest");

    let mut config = Config::from_file(&config_path)?;
    info!("Loaded configuration from: {}", config_path);
    overrides.apply(&mut config);

    config.instrument.lot_size = super::resolve_lot_size(&config)?;
    let candles = super::load_candles(&config)?;
    info!("Loaded {} candles for {}", candles.len(), config.instrument.id);

    let params = config.grid_params();
    info!(
        "Grid: {} - {} with {} levels, investment {}, {:?} orders",
        params.lower_price, params.upper_price, params.levels, params.investment, params.order_mode
    );

    let backtester = Backtester::new(params, config.backtest_settings());
    let result = backtester.run(&candles)?;

    let label = format!("BACKTEST RESULTS: {}", result.instrument_id);
    TracingSink.publish(&label, &result.statistics);
    ConsoleSink.publish(&label, &result.statistics);

    println!("Candles:           {}", result.candles);
    println!("Price:             {} -> {}", result.initial_price, result.final_price);
    println!("Lots per grid:     {}", result.lots_per_grid);
    println!("Lots on start:     {}", result.lots_bought_on_start);
    println!(
        "Final balance:     {} ({})",
        result.final_balance.trunc_dp(2),
        format_profit(result.final_balance - backtester.params().investment)
    );
    println!("Max drawdown:      {}", format_profit_pct(-result.max_drawdown));
    println!("{}", "=".repeat(60));

    if let Some(path) = output {
        super::write_json(&path, &result)?;
        info!("Results written to {}", path.display());
    }

    Ok(())
}
