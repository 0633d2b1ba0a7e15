//! Per-run orchestration of the DCA components
//!
//! One engine per run owns the stage tracker, the reservation ledger and the
//! cooldown book. The host drives it with one `Tick` per open position and
//! applies whatever it returns.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::{ConfigError, DcaConfig};
use crate::dca::exit::{CooldownBook, ExitDecision, ExitEvaluator};
use crate::dca::reservation::ReservationLedger;
use crate::dca::stage_policy;
use crate::dca::stake::{StakeAllocator, StakeRequest};
use crate::dca::tracker::DcaStageTracker;
use crate::{Direction, Money, Position, Symbol, WalletState};

/// Host snapshot for one open position on one tick
#[derive(Debug, Clone, Copy)]
pub struct Tick<'a> {
    pub position: &'a Position,
    pub wallet: &'a WalletState,
    pub current_price: f64,
    pub now: DateTime<Utc>,
    /// Oscillator reading for the take-profit confirmation, if any
    pub confirmation: Option<f64>,
    /// Every open position sharing the wallet, including `position`
    pub open_positions: &'a [Position],
}

/// What the host should do with the position
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Hold,
    Exit {
        decision: ExitDecision,
        reason: &'static str,
    },
    AddStake {
        stake: Money,
        entry_tag: String,
    },
}

#[derive(Debug, Clone)]
pub struct DcaEngine {
    config: DcaConfig,
    tracker: DcaStageTracker,
    ledger: ReservationLedger,
    cooldowns: CooldownBook,
}

impl DcaEngine {
    pub fn new(config: DcaConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            tracker: DcaStageTracker::new(),
            ledger: ReservationLedger::new(),
            cooldowns: CooldownBook::new(),
        })
    }

    pub fn config(&self) -> &DcaConfig {
        &self.config
    }

    pub fn tracker(&self) -> &DcaStageTracker {
        &self.tracker
    }

    pub fn ledger(&self) -> &ReservationLedger {
        &self.ledger
    }

    pub fn cooldowns(&self) -> &CooldownBook {
        &self.cooldowns
    }

    /// Whether a new position may be opened on `pair` in `direction`
    pub fn confirm_entry(&mut self, pair: &Symbol, direction: Direction, now: DateTime<Utc>) -> bool {
        let cleared = self.cooldowns.clear_expired(now);
        if cleared > 0 {
            debug!(cleared, "Expired cooldowns removed");
        }

        if !self.config.allows(direction) {
            debug!(pair = %pair, direction = %direction, "Entry rejected: direction not traded");
            return false;
        }
        if self.cooldowns.is_cooldown_active(pair, now) {
            debug!(
                pair = %pair,
                until = ?self.cooldowns.expiry(pair),
                "Entry rejected: pair in cooldown"
            );
            return false;
        }
        true
    }

    /// Stake for a new position's first entry. Records the pair reservation.
    pub fn initial_stake(
        &mut self,
        pair: &Symbol,
        direction: Direction,
        wallet: &WalletState,
        open_positions: &[Position],
    ) -> Money {
        let request = StakeRequest::initial(pair, direction, wallet, open_positions);
        StakeAllocator::new(&self.config).compute_stake(&request, &mut self.ledger)
    }

    /// Exit check, then DCA check. A terminal exit suppresses any DCA on the
    /// same tick and releases the position's state.
    pub fn evaluate(&mut self, tick: &Tick<'_>) -> TickOutcome {
        let position = tick.position;

        let decision = ExitEvaluator::new(&self.config).evaluate(
            position,
            tick.current_price,
            tick.confirmation,
        );
        if let Some(reason) = decision.reason() {
            info!(
                pair = %position.pair,
                id = %position.id,
                stage = position.stage,
                price = tick.current_price,
                profit = position.relative_profit(tick.current_price),
                reason,
                "Exit"
            );
            if decision == ExitDecision::StopLossAfterDca {
                if let Some(cooldown) = self.config.cooldown {
                    let until = self.cooldowns.start(&position.pair, tick.now, cooldown);
                    info!(pair = %position.pair, until = %until, "Cooldown started");
                }
            }
            self.release(position);
            return TickOutcome::Exit { decision, reason };
        }

        if self.tracker.is_recorded(&position.id, position.stage) {
            debug!(id = %position.id, stage = position.stage, "DCA already issued for stage");
            return TickOutcome::Hold;
        }
        if !stage_policy::should_trigger(position, &self.config, tick.current_price) {
            return TickOutcome::Hold;
        }

        let request = StakeRequest::adjustment(position, tick.wallet, tick.open_positions);
        let stake = StakeAllocator::new(&self.config).compute_stake(&request, &mut self.ledger);
        if !stake.is_positive() {
            debug!(
                pair = %position.pair,
                stage = position.stage,
                available = %tick.wallet.available,
                "DCA triggered but the rung sizes to zero"
            );
            return TickOutcome::Hold;
        }

        self.tracker.record(&position.id, position.stage);
        let entry_tag = stage_policy::entry_tag(position.stage + 1);
        info!(
            pair = %position.pair,
            id = %position.id,
            price = tick.current_price,
            avg_entry = position.entry_price,
            stake = %stake,
            tag = %entry_tag,
            "DCA triggered"
        );
        TickOutcome::AddStake { stake, entry_tag }
    }

    /// Forget a closed position. Safe to call more than once.
    pub fn release(&mut self, position: &Position) {
        let had_stage = self.tracker.release(&position.id);
        let had_reservation = self.ledger.release(&position.pair).is_some();
        if had_stage || had_reservation {
            debug!(pair = %position.pair, id = %position.id, "Released position state");
        }
    }

    /// Leverage requested for new positions. Leverage is configured per
    /// policy, so `pair` does not change the answer.
    pub fn leverage(&self, _pair: &Symbol, direction: Direction) -> f64 {
        if self.config.allows(direction) {
            self.config.leverage
        } else {
            1.0
        }
    }
}
