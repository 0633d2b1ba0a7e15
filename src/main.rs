//! Staged DCA tooling - main entry point
//!
//! This binary provides four subcommands:
//! - presets: List the named policy presets
//! - ladder: Print the staged ladder for a preset or config file
//! - validate: Load and validate a config file
//! - score: Rank trade-result CSV files by hyperopt loss

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "sekka-dca")]
#[command(about = "Staged DCA position sizing: presets, ladders and hyperopt scoring", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List named presets
    Presets,

    /// Print per-stage stakes and trigger prices
    Ladder {
        /// Preset name (ignored when --config is given)
        #[arg(short, long, default_value = "spot_long")]
        preset: String,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Total wallet capital
        #[arg(long, default_value = "1000")]
        capital: f64,

        /// Initial entry price
        #[arg(long, default_value = "100")]
        price: f64,

        /// Ladder side (long or short)
        #[arg(short, long, default_value = "long")]
        direction: String,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/spot_long.json")]
        config: PathBuf,
    },

    /// Score trade-result CSV files with the hyperopt loss
    Score {
        /// CSV files with a `profit_ratio` column
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Number of top results to show
        #[arg(short, long, default_value = "10")]
        top: usize,

        /// Run sequentially instead of parallel
        #[arg(long)]
        sequential: bool,
    },
}

fn setup_logging(verbose: bool, command_name: &str, file_only: bool) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    if file_only {
        // Keep the console clean for the progress bar
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    } else {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true);

        // Same format without ANSI colors
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!("Logging initialized");
        info!("Log file: {}", log_path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let (command_name, file_only) = match &cli.command {
        Commands::Presets => ("presets", false),
        Commands::Ladder { .. } => ("ladder", false),
        Commands::Validate { .. } => ("validate", false),
        Commands::Score { .. } => ("score", true),
    };

    setup_logging(cli.verbose, command_name, file_only)?;

    match cli.command {
        Commands::Presets => commands::presets::run(),

        Commands::Ladder {
            preset,
            config,
            capital,
            price,
            direction,
        } => commands::ladder::run(preset, config, capital, price, direction),

        Commands::Validate { config } => commands::validate::run(config),

        Commands::Score {
            files,
            top,
            sequential,
        } => commands::score::run(files, top, sequential),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_requires_files() {
        assert!(Cli::try_parse_from(["sekka-dca", "score"]).is_err());

        let cli = Cli::try_parse_from(["sekka-dca", "score", "a.csv", "b.csv", "--top", "3"]).unwrap();
        match cli.command {
            Commands::Score { files, top, sequential } => {
                assert_eq!(files, vec![PathBuf::from("a.csv"), PathBuf::from("b.csv")]);
                assert_eq!(top, 3);
                assert!(!sequential);
            }
            other => panic!("expected score, got {:?}", other),
        }
    }

    #[test]
    fn test_ladder_defaults_and_global_verbose() {
        let cli = Cli::try_parse_from(["sekka-dca", "ladder", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Ladder { preset, config, capital, price, direction } => {
                assert_eq!(preset, "spot_long");
                assert!(config.is_none());
                assert_eq!(capital, 1000.0);
                assert_eq!(price, 100.0);
                assert_eq!(direction, "long");
            }
            other => panic!("expected ladder, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_and_presets_parse() {
        let cli = Cli::try_parse_from(["sekka-dca", "validate"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Validate { config } if config == PathBuf::from("configs/spot_long.json")
        ));
        assert!(matches!(
            Cli::try_parse_from(["sekka-dca", "presets"]).unwrap().command,
            Commands::Presets
        ));
    }
}
