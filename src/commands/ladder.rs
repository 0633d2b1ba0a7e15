//! Print the staged ladder a policy would build if every DCA filled exactly
//! at its trigger price

use anyhow::{bail, Context, Result};
use chrono::Utc;
use sekka_dca::dca::stage_policy;
use sekka_dca::{
    Config, DcaConfig, DcaEngine, Direction, Money, Position, PositionId, Preset, Symbol, Tick,
    TickOutcome, WalletState,
};
use std::path::PathBuf;
use tracing::info;

fn parse_direction(s: &str) -> Result<Direction> {
    match s.trim().to_lowercase().as_str() {
        "long" => Ok(Direction::Long),
        "short" => Ok(Direction::Short),
        other => bail!("Unknown direction '{}'. Expected long or short", other),
    }
}

fn load_policy(preset: &str, config: Option<PathBuf>) -> Result<(String, DcaConfig)> {
    match config {
        Some(path) => {
            let file = Config::from_file(&path)?;
            let resolved = file
                .resolve()
                .with_context(|| format!("Invalid configuration in {}", path.display()))?;
            Ok((path.display().to_string(), resolved))
        }
        None => {
            let preset = Preset::from_name(preset)?;
            Ok((preset.name().to_string(), preset.config()))
        }
    }
}

struct Rung {
    tag: String,
    price: f64,
    stake: Money,
    committed: Money,
    avg_entry: f64,
}

pub fn run(
    preset: String,
    config: Option<PathBuf>,
    capital: f64,
    price: f64,
    direction: String,
) -> Result<()> {
    let direction = parse_direction(&direction)?;
    let (label, policy) = load_policy(&preset, config)?;
    let Some(ladder) = policy.ladder(direction).copied() else {
        bail!("{} does not trade {} positions", label, direction);
    };
    if capital <= 0.0 || price <= 0.0 {
        bail!("capital and price must be positive");
    }

    info!(policy = %label, direction = %direction, capital, price, "Building ladder");

    let mut engine = DcaEngine::new(policy)?;
    let pair = Symbol::new("LADDER/SIM");
    let total = Money::from_f64(capital);
    let opened_at = Utc::now();

    let wallet = WalletState::new(total, total);
    let initial = engine.initial_stake(&pair, direction, &wallet, &[]);
    if !initial.is_positive() {
        bail!("Initial stake is zero for capital {}", total);
    }

    let mut committed = initial;
    let mut quantity = initial.to_f64() / price;
    let mut position = Position {
        id: PositionId::synthetic(&pair, opened_at),
        pair: pair.clone(),
        direction,
        entry_price: price,
        stage: 1,
        stake: committed,
        opened_at,
    };
    let mut rungs = vec![Rung {
        tag: "ENTRY".to_string(),
        price,
        stake: initial,
        committed,
        avg_entry: price,
    }];

    loop {
        // Fill a hair past the trigger so float rounding cannot stall the ladder
        let trigger = match direction {
            Direction::Long => {
                stage_policy::next_trigger_price(position.entry_price, direction, &ladder)
                    * (1.0 - 1e-9)
            }
            Direction::Short => {
                stage_policy::next_trigger_price(position.entry_price, direction, &ladder)
                    * (1.0 + 1e-9)
            }
        };
        let wallet = WalletState::new(total, total - committed);
        let open = [position.clone()];
        let tick = Tick {
            position: &position,
            wallet: &wallet,
            current_price: trigger,
            now: opened_at,
            confirmation: None,
            open_positions: &open,
        };

        let TickOutcome::AddStake { stake, entry_tag } = engine.evaluate(&tick) else {
            break;
        };

        committed += stake;
        quantity += stake.to_f64() / trigger;
        position.entry_price = committed.to_f64() / quantity;
        position.stage += 1;
        position.stake = committed;
        rungs.push(Rung {
            tag: entry_tag,
            price: trigger,
            stake,
            committed,
            avg_entry: position.entry_price,
        });
    }

    println!("\n{}", "=".repeat(90));
    println!(
        "LADDER: {} ({}, N={}, threshold {:.2}%, take-profit {:.2}%)",
        label,
        direction,
        ladder.max_dca_steps,
        ladder.dca_threshold * 100.0,
        ladder.take_profit * 100.0
    );
    println!("{}", "=".repeat(90));
    println!(
        "{:<8} {:>12} {:>12} {:>12} {:>8} {:>12} {:>12}",
        "Tag", "Price", "Stake", "Committed", "Used%", "Avg Entry", "TP Price"
    );
    println!("{}", "-".repeat(90));

    for rung in &rungs {
        let tp_price = match direction {
            Direction::Long => rung.avg_entry * (1.0 + ladder.take_profit),
            Direction::Short => rung.avg_entry * (1.0 - ladder.take_profit),
        };
        println!(
            "{:<8} {:>12.4} {:>12} {:>12} {:>7.1}% {:>12.4} {:>12.4}",
            rung.tag,
            rung.price,
            format!("{:.2}", rung.stake),
            format!("{:.2}", rung.committed),
            rung.committed.to_f64() / capital * 100.0,
            rung.avg_entry,
            tp_price
        );
    }
    println!("{}", "-".repeat(90));
    println!(
        "Entries filled: {} of {}   Capital committed: {:.2} of {:.2}",
        rungs.len(),
        ladder.total_entries(),
        committed,
        total
    );
    println!("{}", "=".repeat(90));

    Ok(())
}
