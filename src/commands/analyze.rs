//! Analyze command: grid parameter sweep with progress tracking

use anyhow::Result;
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::info;

use grid_bot::optimizer::Optimizer;
use grid_bot::report::format_profit_pct;
use grid_bot::{Config, Money};

/// Command-line values that replace configured ones
#[derive(Debug, Default)]
pub struct Overrides {
    pub divisions: Option<u32>,
    pub top: Option<usize>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub price_step: Option<Money>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(divisions) = self.divisions {
            config.sweep.divisions = divisions;
        }
        if let Some(top) = self.top {
            config.sweep.top = top;
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
    }
}

pub fn run(config_path: String, overrides: Overrides, output: Option<PathBuf>) -> Result<()> {
    info!("Starting analysis");

    let mut config = Config::from_file(&config_path)?;
    info!("Loaded configuration from: {}", config_path);
    overrides.apply(&mut config);

    let lot_size = super::resolve_lot_size(&config)?;
    let candles = super::load_candles(&config)?;
    info!("Loaded {} candles for {}", candles.len(), config.instrument.id);

    let optimizer = Optimizer::new(
        config.instrument.id.clone(),
        lot_size,
        config.backtest_settings(),
        config.sweep.clone(),
    );
    let total_runs = optimizer.candidates(&candles)?.len();

    println!("\n{}", "=".repeat(70));
    println!("ANALYSIS SUMMARY");
    println!("{}", "=".repeat(70));
    println!("  Instrument:    {}", config.instrument.id);
    println!("  Candles:       {}", candles.len());
    println!("  Divisions:     {}", config.sweep.divisions);
    println!(
        "  Levels:        {}..{}",
        config.sweep.min_levels, config.sweep.max_levels
    );
    println!("  Total tests:   {}", total_runs);
    println!("{}\n", "=".repeat(70));

    let pb = ProgressBar::new(total_runs as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("⚡ {percent:>3}%|{bar:40}| {pos}/{len} [{elapsed}<{eta}, {per_sec:.2}]")?
            .progress_chars("█░ "),
    );

    let results = optimizer.run(&candles, Some(&pb))?;
    pb.finish();
    println!();

    if results.is_empty() {
        info!("No valid results found.");
        println!("No parameter combination could be backtested.");
        return Ok(());
    }

    println!("\n{}", "=".repeat(90));
    println!("TOP {} GRID PARAMETERS", results.len());
    println!("{}", "=".repeat(90));
    println!(
        "{:<4} {:>12} {:>12} {:>6} | {:>10} {:>10} {:>8} {:>6}",
        "Rank", "Lower", "Upper", "Levels", "Profit%", "Grid", "MaxDD%", "Trades"
    );
    println!("{}", "-".repeat(90));

    for (i, result) in results.iter().enumerate() {
        println!(
            "{:<4} {:>12} {:>12} {:>6} | {:>10} {:>10} {:>8} {:>6}",
            i + 1,
            result.lower_price.trunc_dp(4).to_string(),
            result.upper_price.trunc_dp(4).to_string(),
            result.levels,
            format_profit_pct(result.total_profit_fraction),
            result.realized_profit.trunc_dp(2).to_string(),
            format_profit_pct(-result.max_drawdown),
            result.transactions_count
        );
    }
    println!("{}", "=".repeat(90));

    if let Some(path) = output {
        super::write_json(&path, &results)?;
        info!("Results written to {}", path.display());
    }

    info!("Analysis completed successfully");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_sweep_values() {
        let mut config: Config = serde_json::from_str(
            r#"{
                "instrument": { "id": "SBER", "lot_size": "1" },
                "grid": {
                    "lower_price": "90",
                    "upper_price": "110",
                    "levels": 5,
                    "investment": "10000"
                }
            }"#,
        )
        .unwrap();

        Overrides {
            divisions: Some(4),
            top: Some(10),
            ..Overrides::default()
        }
        .apply(&mut config);

        assert_eq!(config.sweep.divisions, 4);
        assert_eq!(config.sweep.top, 10);
        assert_eq!(config.sweep.min_levels, 2);
    }
}
