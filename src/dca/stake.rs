//! Stake sizing for initial and DCA entries
//!
//! # Pair budget
//!
//! Each pair's full ladder is funded from a pair budget: either the whole
//! wallet (`FullBalance`) or the wallet split evenly across concurrent
//! positions (`EvenSplit`).
//!
//! # Sizing modes
//!
//! ```text
//! Rebalance         stage 0: budget / (N + 1)
//!                   stage s: max(budget - committed, 0) / (N - s)
//! FixedReservation  stage 0: (max(available - reserved, 0) / free_slots) / (N + 1)
//!                   stage s: per-entry stake fixed at stage 0
//! ```
//!
//! Every result is clamped to `[0, available]`. A stake of zero means "do
//! nothing"; it is never an error.

use crate::config::{DcaConfig, PairBudget, SizingMode};
use crate::dca::reservation::ReservationLedger;
use crate::{Direction, Money, Position, Symbol, WalletState};

/// Inputs of one stake query
#[derive(Debug, Clone, Copy)]
pub struct StakeRequest<'a> {
    pub pair: &'a Symbol,
    /// Used when `position` is `None`; otherwise the position's direction wins
    pub direction: Direction,
    /// `None` for the initial entry
    pub position: Option<&'a Position>,
    pub wallet: &'a WalletState,
    /// Currently open positions sharing the wallet, excluding a new entry
    pub open_positions: &'a [Position],
}

impl<'a> StakeRequest<'a> {
    pub fn initial(
        pair: &'a Symbol,
        direction: Direction,
        wallet: &'a WalletState,
        open_positions: &'a [Position],
    ) -> Self {
        Self {
            pair,
            direction,
            position: None,
            wallet,
            open_positions,
        }
    }

    pub fn adjustment(
        position: &'a Position,
        wallet: &'a WalletState,
        open_positions: &'a [Position],
    ) -> Self {
        Self {
            pair: &position.pair,
            direction: position.direction,
            position: Some(position),
            wallet,
            open_positions,
        }
    }

    fn stage(&self) -> u32 {
        self.position.map(|p| p.stage).unwrap_or(0)
    }

    fn effective_direction(&self) -> Direction {
        self.position.map(|p| p.direction).unwrap_or(self.direction)
    }
}

/// Computes stake recommendations for one `DcaConfig`
#[derive(Debug, Clone, Copy)]
pub struct StakeAllocator<'a> {
    config: &'a DcaConfig,
}

impl<'a> StakeAllocator<'a> {
    pub fn new(config: &'a DcaConfig) -> Self {
        Self { config }
    }

    /// Capital one pair's full ladder may use
    pub fn pair_budget(&self, wallet: &WalletState) -> Money {
        match self.config.pair_budget {
            PairBudget::FullBalance => wallet.total,
            PairBudget::EvenSplit { max_open_positions } => {
                wallet.total / Money::from(max_open_positions)
            }
        }
    }

    /// Stake for the next entry of `request`.
    ///
    /// The initial-entry computation records the unclamped per-entry stake
    /// in `ledger`.
    pub fn compute_stake(&self, request: &StakeRequest<'_>, ledger: &mut ReservationLedger) -> Money {
        let Some(ladder) = self.config.ladder(request.effective_direction()) else {
            return Money::ZERO;
        };
        let stage = request.stage();
        let total_entries = Money::from(ladder.total_entries());

        let proposed = match (self.config.sizing, request.position) {
            (SizingMode::Rebalance, None) => {
                let stake = self.pair_budget(request.wallet) / total_entries;
                if stake.is_positive() {
                    ledger.reserve(request.pair, stake);
                }
                stake
            }
            (SizingMode::Rebalance, Some(position)) => {
                let remaining_budget =
                    (self.pair_budget(request.wallet) - position.stake).max(Money::ZERO);
                let remaining_steps = i64::from(ladder.max_dca_steps) - i64::from(stage);
                if remaining_steps > 0 {
                    remaining_budget / Money::from_i64(remaining_steps)
                } else {
                    Money::ZERO
                }
            }
            (SizingMode::FixedReservation, None) => {
                let stake = self.fresh_reserved_stake(request, ledger) / total_entries;
                if stake.is_positive() {
                    ledger.reserve(request.pair, stake);
                }
                stake
            }
            (SizingMode::FixedReservation, Some(_)) => {
                if stage >= ladder.total_entries() {
                    Money::ZERO
                } else {
                    ledger.per_entry(request.pair).unwrap_or(Money::ZERO)
                }
            }
        };

        let stake = proposed.clamp_to(Money::ZERO, request.wallet.available.max(Money::ZERO));

        tracing::debug!(
            pair = %request.pair,
            stage,
            proposed = %proposed,
            available = %request.wallet.available,
            stake = %stake,
            "Computed stake"
        );

        stake
    }

    /// Unreserved free capital divided across the pairs that could still open
    fn fresh_reserved_stake(&self, request: &StakeRequest<'_>, ledger: &ReservationLedger) -> Money {
        let reserved = ledger.reserved_total(request.open_positions, self.config);
        let unreserved = (request.wallet.available - reserved).max(Money::ZERO);

        let free_slots = match self.config.pair_budget {
            PairBudget::FullBalance => 1,
            PairBudget::EvenSplit { max_open_positions } => {
                let open = u32::try_from(request.open_positions.len()).unwrap_or(u32::MAX);
                max_open_positions.saturating_sub(open)
            }
        };

        if free_slots == 0 {
            tracing::debug!(pair = %request.pair, "No free slot for a new ladder");
            return Money::ZERO;
        }

        unreserved / Money::from(free_slots)
    }
}
