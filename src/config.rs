//! Configuration management
//!
//! `DcaConfig` is the plain, immutable policy every decision function reads.
//! It is produced once per run, either from a named preset or by resolving a
//! JSON `Config` file on top of one, and validated before any engine is
//! built. Invalid values are rejected, never clamped.

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::presets::Preset;
use crate::{Direction, Symbol};

/// Slots assumed when the host reports an unlimited (`-1`) open-trade count
pub const UNLIMITED_OPEN_TRADES_FALLBACK: u32 = 7;

/// Upper bound on DCA steps per ladder
pub const MAX_DCA_STEPS: u32 = 1000;

/// Upper bound on the post-stop-loss cooldown (one year)
pub const MAX_COOLDOWN_HOURS: f64 = 24.0 * 365.0;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} ({value}) must be within [0, 1)")]
    ThresholdOutOfRange { field: &'static str, value: f64 },

    #[error("{field} ({value}) must be >= 0")]
    NegativeSteps { field: &'static str, value: i64 },

    #[error("{field} ({value}) must be <= {max}")]
    TooManySteps {
        field: &'static str,
        value: i64,
        max: u32,
    },

    #[error("max_open_trades ({0}) must be >= 1, or -1 for unlimited")]
    InvalidMaxOpenTrades(i64),

    #[error("leverage ({0}) must be a finite value >= 1")]
    InvalidLeverage(f64),

    #[error("take-profit confirmation level ({0}) must be finite")]
    InvalidConfirmationLevel(f64),

    #[error("cooldown_hours ({0}) must be a finite value within [0, 8760]")]
    InvalidCooldown(f64),

    #[error("missing required field '{0}' (no preset supplies it)")]
    MissingField(&'static str),

    #[error("unknown preset: '{name}'. Available: {available}")]
    UnknownPreset { name: String, available: String },
}

/// How the oscillator reading must relate to the confirmation level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    AtLeast,
    AtMost,
}

/// Momentum gate applied on top of the take-profit threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TakeProfitConfirmation {
    pub level: f64,
    pub comparison: Comparison,
}

impl TakeProfitConfirmation {
    pub fn at_least(level: f64) -> Self {
        Self {
            level,
            comparison: Comparison::AtLeast,
        }
    }

    pub fn at_most(level: f64) -> Self {
        Self {
            level,
            comparison: Comparison::AtMost,
        }
    }

    /// A missing signal never confirms.
    pub fn is_met(&self, signal: Option<f64>) -> bool {
        match signal {
            Some(value) if value.is_finite() => match self.comparison {
                Comparison::AtLeast => value >= self.level,
                Comparison::AtMost => value <= self.level,
            },
            _ => false,
        }
    }
}

/// Ladder parameters for one trade direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LadderParams {
    /// Number of DCA entries allowed after the initial entry (N)
    pub max_dca_steps: u32,
    /// Fractional adverse move from the average entry that triggers a DCA
    pub dca_threshold: f64,
    /// Relative profit at which the position is taken off
    pub take_profit: f64,
    pub confirmation: Option<TakeProfitConfirmation>,
}

impl LadderParams {
    pub fn new(max_dca_steps: u32, dca_threshold: f64, take_profit: f64) -> Self {
        Self {
            max_dca_steps,
            dca_threshold,
            take_profit,
            confirmation: None,
        }
    }

    pub fn with_confirmation(mut self, confirmation: TakeProfitConfirmation) -> Self {
        self.confirmation = Some(confirmation);
        self
    }

    /// Initial entry plus all DCA steps (N + 1)
    pub fn total_entries(&self) -> u32 {
        self.max_dca_steps.saturating_add(1)
    }

    fn validate(&self, side: Direction) -> Result<(), ConfigError> {
        let (steps_field, threshold_field, tp_field) = match side {
            Direction::Long => ("long.max_dca_steps", "long.dca_threshold", "long.take_profit"),
            Direction::Short => (
                "short.max_dca_steps",
                "short.dca_threshold",
                "short.take_profit",
            ),
        };
        if self.max_dca_steps > MAX_DCA_STEPS {
            return Err(ConfigError::TooManySteps {
                field: steps_field,
                value: i64::from(self.max_dca_steps),
                max: MAX_DCA_STEPS,
            });
        }
        check_fraction(threshold_field, self.dca_threshold)?;
        check_fraction(tp_field, self.take_profit)?;
        if let Some(confirmation) = self.confirmation {
            if !confirmation.level.is_finite() {
                return Err(ConfigError::InvalidConfirmationLevel(confirmation.level));
            }
        }
        Ok(())
    }
}

fn check_fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOutOfRange { field, value })
    }
}

/// Portion of the wallet one pair's full ladder may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairBudget {
    /// Total capital
    FullBalance,
    /// Total capital split evenly across concurrent positions
    EvenSplit { max_open_positions: u32 },
}

/// How DCA stakes after the initial entry are sized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMode {
    /// Spread what is left of the pair budget over the remaining steps
    #[default]
    Rebalance,
    /// Reuse the per-entry stake fixed at the initial entry
    FixedReservation,
}

/// Resolved DCA policy for one run
#[derive(Debug, Clone, PartialEq)]
pub struct DcaConfig {
    pub long: LadderParams,
    /// `None` disables short positions
    pub short: Option<LadderParams>,
    pub pair_budget: PairBudget,
    pub sizing: SizingMode,
    /// Exit once every DCA step is used and the loss still exceeds the trigger
    pub stop_loss_after_dca: bool,
    /// Entry block per pair after a stop-loss-after-DCA exit
    pub cooldown: Option<Duration>,
    pub leverage: f64,
}

impl DcaConfig {
    /// Long-only config with full-balance budget and rebalance sizing
    pub fn new(long: LadderParams) -> Self {
        Self {
            long,
            short: None,
            pair_budget: PairBudget::FullBalance,
            sizing: SizingMode::Rebalance,
            stop_loss_after_dca: false,
            cooldown: None,
            leverage: 1.0,
        }
    }

    pub fn with_short(mut self, short: LadderParams) -> Self {
        self.short = Some(short);
        self
    }

    pub fn with_pair_budget(mut self, pair_budget: PairBudget) -> Self {
        self.pair_budget = pair_budget;
        self
    }

    pub fn with_sizing(mut self, sizing: SizingMode) -> Self {
        self.sizing = sizing;
        self
    }

    pub fn with_stop_loss_after_dca(mut self, enabled: bool) -> Self {
        self.stop_loss_after_dca = enabled;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    pub fn with_leverage(mut self, leverage: f64) -> Self {
        self.leverage = leverage;
        self
    }

    /// Ladder for a direction, `None` when the direction is not traded
    pub fn ladder(&self, direction: Direction) -> Option<&LadderParams> {
        match direction {
            Direction::Long => Some(&self.long),
            Direction::Short => self.short.as_ref(),
        }
    }

    pub fn allows(&self, direction: Direction) -> bool {
        self.ladder(direction).is_some()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.long.validate(Direction::Long)?;
        if let Some(short) = &self.short {
            short.validate(Direction::Short)?;
        }
        if let PairBudget::EvenSplit { max_open_positions } = self.pair_budget {
            if max_open_positions == 0 {
                return Err(ConfigError::InvalidMaxOpenTrades(0));
            }
        }
        if !self.leverage.is_finite() || self.leverage < 1.0 {
            return Err(ConfigError::InvalidLeverage(self.leverage));
        }
        if let Some(cooldown) = self.cooldown {
            if cooldown < Duration::zero() || cooldown.num_hours() as f64 > MAX_COOLDOWN_HOURS {
                return Err(ConfigError::InvalidCooldown(
                    cooldown.num_minutes() as f64 / 60.0,
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// File configuration
// =============================================================================

/// Ladder overrides as written in a config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LadderFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_dca_steps: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dca_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<TakeProfitConfirmation>,
}

impl LadderFile {
    fn resolve(
        &self,
        base: Option<LadderParams>,
        side: Direction,
    ) -> Result<LadderParams, ConfigError> {
        let (steps_field, threshold_field, tp_field) = match side {
            Direction::Long => (
                "long.max_dca_steps",
                "long.dca_threshold",
                "long.take_profit",
            ),
            Direction::Short => (
                "short.max_dca_steps",
                "short.dca_threshold",
                "short.take_profit",
            ),
        };

        let max_dca_steps = match (self.max_dca_steps, base) {
            (Some(steps), _) if steps < 0 => {
                return Err(ConfigError::NegativeSteps {
                    field: steps_field,
                    value: steps,
                })
            }
            (Some(steps), _) => u32::try_from(steps)
                .ok()
                .filter(|n| *n <= MAX_DCA_STEPS)
                .ok_or(ConfigError::TooManySteps {
                    field: steps_field,
                    value: steps,
                    max: MAX_DCA_STEPS,
                })?,
            (None, Some(base)) => base.max_dca_steps,
            (None, None) => return Err(ConfigError::MissingField(steps_field)),
        };
        let dca_threshold = self
            .dca_threshold
            .or(base.map(|b| b.dca_threshold))
            .ok_or(ConfigError::MissingField(threshold_field))?;
        let take_profit = self
            .take_profit
            .or(base.map(|b| b.take_profit))
            .ok_or(ConfigError::MissingField(tp_field))?;
        let confirmation = self.confirmation.or(base.and_then(|b| b.confirmation));

        Ok(LadderParams {
            max_dca_steps,
            dca_threshold,
            take_profit,
            confirmation,
        })
    }
}

/// Pair budget as written in a config file.
///
/// `max_open_trades` follows the host convention where `-1` means unlimited.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PairBudgetFile {
    FullBalance,
    EvenSplit { max_open_trades: i64 },
}

impl PairBudgetFile {
    fn resolve(self) -> Result<PairBudget, ConfigError> {
        match self {
            PairBudgetFile::FullBalance => Ok(PairBudget::FullBalance),
            PairBudgetFile::EvenSplit { max_open_trades: -1 } => Ok(PairBudget::EvenSplit {
                max_open_positions: UNLIMITED_OPEN_TRADES_FALLBACK,
            }),
            PairBudgetFile::EvenSplit { max_open_trades } => u32::try_from(max_open_trades)
                .ok()
                .filter(|n| *n >= 1)
                .map(|max_open_positions| PairBudget::EvenSplit { max_open_positions })
                .ok_or(ConfigError::InvalidMaxOpenTrades(max_open_trades)),
        }
    }
}

/// Main configuration file structure
///
/// Every field is optional on top of `preset`; without a preset the long
/// ladder must be given in full.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    /// Pair whitelist, informational for CLI reports
    #[serde(default)]
    pub pairs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long: Option<LadderFile>,
    /// Omitted keeps the preset's short ladder; use `allow_short: false` to drop it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<LadderFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_short: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair_budget: Option<PairBudgetFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizing: Option<SizingMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss_after_dca: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leverage: Option<f64>,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        // Preset may be swapped from the environment without editing the file
        if let Ok(preset) = std::env::var("DCA_PRESET") {
            config.preset = Some(preset);
        }

        Ok(config)
    }

    pub fn pairs(&self) -> Vec<Symbol> {
        self.pairs.iter().map(Symbol::new).collect()
    }

    /// Resolve file values on top of the preset into a validated `DcaConfig`
    pub fn resolve(&self) -> Result<DcaConfig, ConfigError> {
        let base = match &self.preset {
            Some(name) => Some(Preset::from_name(name)?.config()),
            None => None,
        };

        let long = self
            .long
            .clone()
            .unwrap_or_default()
            .resolve(base.as_ref().map(|b| b.long), Direction::Long)?;

        let base_short = base.as_ref().and_then(|b| b.short);
        let short = match (self.allow_short, &self.short) {
            (Some(false), _) => None,
            (_, Some(file)) => Some(file.resolve(base_short, Direction::Short)?),
            (Some(true), None) => Some(
                base_short
                    .ok_or(ConfigError::MissingField("short"))?,
            ),
            (None, None) => base_short,
        };

        let pair_budget = match self.pair_budget {
            Some(file) => file.resolve()?,
            None => base
                .as_ref()
                .map(|b| b.pair_budget)
                .unwrap_or(PairBudget::FullBalance),
        };

        let cooldown = match self.cooldown_hours {
            Some(hours) if !hours.is_finite() || !(0.0..=MAX_COOLDOWN_HOURS).contains(&hours) => {
                return Err(ConfigError::InvalidCooldown(hours))
            }
            Some(hours) if hours == 0.0 => None,
            Some(hours) => Some(
                Duration::try_seconds((hours * 3600.0).round() as i64)
                    .ok_or(ConfigError::InvalidCooldown(hours))?,
            ),
            None => base.as_ref().and_then(|b| b.cooldown),
        };

        let config = DcaConfig {
            long,
            short,
            pair_budget,
            sizing: self
                .sizing
                .or(base.as_ref().map(|b| b.sizing))
                .unwrap_or_default(),
            stop_loss_after_dca: self
                .stop_loss_after_dca
                .or(base.as_ref().map(|b| b.stop_loss_after_dca))
                .unwrap_or(false),
            cooldown,
            leverage: self
                .leverage
                .or(base.as_ref().map(|b| b.leverage))
                .unwrap_or(1.0),
        };

        config.validate()?;
        Ok(config)
    }
}
