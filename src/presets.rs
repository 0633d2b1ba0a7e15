//! Named policy presets
//!
//! The strategy family differs only in which policy knobs are switched on:
//! whether shorts are traded, how the pair budget is carved out of the
//! wallet, how later stakes are sized, and whether a fully averaged loser is
//! cut. Each variant is one preset instead of one module.

use chrono::Duration;

use crate::config::{
    ConfigError, DcaConfig, LadderParams, PairBudget, SizingMode, TakeProfitConfirmation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    /// Spot, long only, holds losers indefinitely
    SpotLong,
    /// Spot, long only, cuts after the ladder is exhausted
    SpotLongGuarded,
    /// Perpetual futures, long only, 3x, 24h cooldown after a cut
    PerpsLong,
    /// Perpetual futures with per-entry stakes fixed at the initial entry
    PerpsReserved,
    /// Long and short ladders with independent parameters
    HybridLongShort,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::SpotLong,
        Preset::SpotLongGuarded,
        Preset::PerpsLong,
        Preset::PerpsReserved,
        Preset::HybridLongShort,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::SpotLong => "spot_long",
            Preset::SpotLongGuarded => "spot_long_guarded",
            Preset::PerpsLong => "perps_long",
            Preset::PerpsReserved => "perps_reserved",
            Preset::HybridLongShort => "hybrid_long_short",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Preset::SpotLong => "spot long-only, full balance, no stop-loss",
            Preset::SpotLongGuarded => "spot long-only, full balance, stop-loss after DCA",
            Preset::PerpsLong => "futures long-only, 3x, stop-loss after DCA, 24h cooldown",
            Preset::PerpsReserved => "futures long-only, fixed per-entry stakes, 6h cooldown",
            Preset::HybridLongShort => "futures long+short, even split over 7 slots, no stop-loss",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        Preset::ALL
            .iter()
            .copied()
            .find(|p| p.name() == name)
            .ok_or_else(|| ConfigError::UnknownPreset {
                name: name.to_string(),
                available: Preset::ALL
                    .iter()
                    .map(|p| p.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    pub fn config(&self) -> DcaConfig {
        match self {
            Preset::SpotLong => DcaConfig::new(
                LadderParams::new(4, 0.03, 0.04)
                    .with_confirmation(TakeProfitConfirmation::at_least(70.0)),
            ),
            Preset::SpotLongGuarded => DcaConfig::new(
                LadderParams::new(4, 0.04, 0.01)
                    .with_confirmation(TakeProfitConfirmation::at_least(65.0)),
            )
            .with_stop_loss_after_dca(true),
            Preset::PerpsLong => DcaConfig::new(LadderParams::new(7, 0.04, 0.02))
                .with_stop_loss_after_dca(true)
                .with_cooldown(Duration::hours(24))
                .with_leverage(3.0),
            Preset::PerpsReserved => DcaConfig::new(LadderParams::new(5, 0.03, 0.02))
                .with_pair_budget(PairBudget::EvenSplit {
                    max_open_positions: 5,
                })
                .with_sizing(SizingMode::FixedReservation)
                .with_stop_loss_after_dca(true)
                .with_cooldown(Duration::hours(6)),
            Preset::HybridLongShort => DcaConfig::new(
                LadderParams::new(10, 0.04, 0.01)
                    .with_confirmation(TakeProfitConfirmation::at_least(61.0)),
            )
            .with_short(
                LadderParams::new(6, 0.08, 0.01)
                    .with_confirmation(TakeProfitConfirmation::at_most(36.0)),
            )
            .with_pair_budget(PairBudget::EvenSplit {
                max_open_positions: 7,
            }),
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
