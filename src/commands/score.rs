//! Score command: rank backtest trade exports by hyperopt loss

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use sekka_dca::hyperopt::{HyperoptLoss, TradeResult, ZeroLossMaxTrades};
use statrs::statistics::Statistics;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone)]
struct ScoredRun {
    file: PathBuf,
    trades: usize,
    losses: usize,
    avg_profit: f64,
    loss: f64,
}

fn load_trades(path: &Path) -> Result<Vec<TradeResult>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<TradeResult>, _>>()
        .with_context(|| format!("Failed to parse trades in {}", path.display()))
}

fn score_file(path: &Path, loss_fn: &dyn HyperoptLoss) -> Option<ScoredRun> {
    let trades = match load_trades(path) {
        Ok(trades) => trades,
        Err(e) => {
            warn!("Skipping {}: {:#}", path.display(), e);
            return None;
        }
    };

    let losses = trades.iter().filter(|t| t.is_loss()).count();
    let avg_profit = if trades.is_empty() {
        0.0
    } else {
        trades.iter().map(|t| t.profit_ratio).mean()
    };

    Some(ScoredRun {
        file: path.to_path_buf(),
        trades: trades.len(),
        losses,
        avg_profit,
        loss: loss_fn.loss(&trades),
    })
}

/// Lower loss first
fn sort_results(results: &mut [ScoredRun]) {
    results.sort_by(|a, b| a.loss.total_cmp(&b.loss));
}

pub fn run(files: Vec<PathBuf>, top: usize, sequential: bool) -> Result<()> {
    let loss_fn = ZeroLossMaxTrades::default();
    info!("Scoring {} files with {}", files.len(), loss_fn.name());

    println!("\n{}", "=".repeat(70));
    println!("SCORING SUMMARY");
    println!("{}", "=".repeat(70));
    println!("  Files:         {}", files.len());
    println!("  Loss:          {}", loss_fn.name());
    println!("  Mode:          {}", if sequential { "sequential" } else { "parallel" });
    println!("{}\n", "=".repeat(70));

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("⚡ {percent:>3}%|{bar:40}| {pos}/{len} [{elapsed}<{eta}, {per_sec:.2}] ✓ {msg}")?
            .progress_chars("█░ "),
    );

    let mut results: Vec<ScoredRun> = if sequential {
        files
            .iter()
            .filter_map(|path| {
                let scored = score_file(path, &loss_fn);
                pb.inc(1);
                scored
            })
            .collect()
    } else {
        files
            .par_iter()
            .filter_map(|path| {
                let scored = score_file(path, &loss_fn);
                pb.inc(1);
                scored
            })
            .collect()
    };
    pb.finish_with_message(format!("{} scored", results.len()));
    println!();

    sort_results(&mut results);
    info!("Total results: {}", results.len());

    let display_count = top.min(results.len());
    println!("\n{}", "=".repeat(100));
    println!("TOP {} RESULTS (lower loss is better)", display_count);
    println!("{}", "=".repeat(100));
    println!(
        "{:<5} {:<50} {:>8} {:>8} {:>12} {:>12}",
        "Rank", "File", "Trades", "Losses", "Avg Profit", "Loss"
    );
    println!("{}", "-".repeat(100));

    for (rank, run) in results.iter().take(display_count).enumerate() {
        println!(
            "{:<5} {:<50} {:>8} {:>8} {:>11.2}% {:>12.3}",
            rank + 1,
            run.file.display().to_string(),
            run.trades,
            run.losses,
            run.avg_profit * 100.0,
            run.loss
        );
    }
    println!("{}", "=".repeat(100));

    Ok(())
}
