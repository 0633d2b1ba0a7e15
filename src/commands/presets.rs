//! List the named presets

use anyhow::Result;
use sekka_dca::{DcaConfig, Direction, LadderParams, PairBudget, Preset};

fn describe_ladder(ladder: Option<&LadderParams>) -> String {
    match ladder {
        None => "-".to_string(),
        Some(l) => format!(
            "N={} th={:.2}% tp={:.2}%",
            l.max_dca_steps,
            l.dca_threshold * 100.0,
            l.take_profit * 100.0
        ),
    }
}

fn describe_budget(config: &DcaConfig) -> String {
    match config.pair_budget {
        PairBudget::FullBalance => "full".to_string(),
        PairBudget::EvenSplit { max_open_positions } => {
            format!("split/{}", max_open_positions)
        }
    }
}

pub fn run() -> Result<()> {
    println!("\n{}", "=".repeat(110));
    println!("NAMED PRESETS");
    println!("{}", "=".repeat(110));
    println!(
        "{:<20} {:<28} {:<28} {:<9} {:<6} {:<5}",
        "Preset", "Long", "Short", "Budget", "SL", "Lev"
    );
    println!("{}", "-".repeat(110));

    for preset in Preset::ALL {
        let config = preset.config();
        println!(
            "{:<20} {:<28} {:<28} {:<9} {:<6} {:<5.1}",
            preset.name(),
            describe_ladder(config.ladder(Direction::Long)),
            describe_ladder(config.ladder(Direction::Short)),
            describe_budget(&config),
            if config.stop_loss_after_dca { "on" } else { "off" },
            config.leverage
        );
        println!("{:<20} {}", "", preset.description());
    }
    println!("{}", "=".repeat(110));

    Ok(())
}
