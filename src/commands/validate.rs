//! Load a config file, resolve it against its preset and report the result

use anyhow::{Context, Result};
use sekka_dca::{Config, Direction};
use std::path::PathBuf;
use tracing::{info, warn};

pub fn run(config_path: PathBuf) -> Result<()> {
    info!("Validating {}", config_path.display());

    let file = Config::from_file(&config_path)?;
    let policy = match file.resolve() {
        Ok(policy) => policy,
        Err(e) => {
            warn!(error = %e, "Configuration rejected");
            return Err(e).with_context(|| format!("Invalid configuration in {}", config_path.display()));
        }
    };

    println!("\n{}", "=".repeat(70));
    println!("CONFIGURATION OK: {}", config_path.display());
    println!("{}", "=".repeat(70));
    println!("  Preset:        {}", file.preset.as_deref().unwrap_or("-"));
    println!("  Pairs:         {}", file.pairs.len());

    for direction in [Direction::Long, Direction::Short] {
        match policy.ladder(direction) {
            Some(ladder) => {
                let confirm = ladder
                    .confirmation
                    .map(|c| format!("{:?} {}", c.comparison, c.level))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "  {:<14} N={} threshold={} take_profit={} confirm={}",
                    format!("{}:", direction),
                    ladder.max_dca_steps,
                    ladder.dca_threshold,
                    ladder.take_profit,
                    confirm
                );
            }
            None => println!("  {:<14} disabled", format!("{}:", direction)),
        }
    }

    println!("  Pair budget:   {:?}", policy.pair_budget);
    println!("  Sizing:        {:?}", policy.sizing);
    println!("  Stop-loss:     {}", if policy.stop_loss_after_dca { "after DCA" } else { "off" });
    println!(
        "  Cooldown:      {}",
        policy
            .cooldown
            .map(|c| format!("{}h", c.num_minutes() as f64 / 60.0))
            .unwrap_or_else(|| "-".to_string())
    );
    println!("  Leverage:      {}", policy.leverage);
    println!("{}", "=".repeat(70));

    info!("Configuration valid");
    Ok(())
}
