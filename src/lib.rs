//! Staged DCA Position Sizing
//!
//! Decision engine for dollar-cost-averaging ladders: how much to stake on
//! each entry, when an open position may add another entry, and when it
//! should be closed. Order placement, wallets and indicators belong to the
//! host; this crate only answers its questions.

pub mod config;
pub mod dca;
pub mod hyperopt;
pub mod presets;
pub mod types;

pub use config::{Config, ConfigError, DcaConfig, LadderParams, PairBudget, SizingMode};
pub use dca::{DcaEngine, ExitDecision, Tick, TickOutcome};
pub use presets::Preset;
pub use types::*;
