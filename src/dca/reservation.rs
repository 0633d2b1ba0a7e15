//! Capital earmarked for open positions' future DCA entries
//!
//! When many positions share one wallet, free capital overstates what a new
//! trade may use: part of it is already promised to the remaining rungs of
//! existing ladders. The ledger records each pair's per-entry stake at its
//! initial entry so that promise can be projected.

use std::collections::HashMap;

use crate::config::DcaConfig;
use crate::{Money, Position, Symbol};

#[derive(Debug, Clone, Default)]
pub struct ReservationLedger {
    per_entry: HashMap<Symbol, Money>,
}

impl ReservationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the per-entry stake for `pair`, replacing any stale value
    pub fn reserve(&mut self, pair: &Symbol, per_entry_stake: Money) {
        tracing::debug!(pair = %pair, stake = %per_entry_stake, "Reserved per-entry stake");
        self.per_entry.insert(pair.clone(), per_entry_stake);
    }

    /// Drop the reservation for `pair`. Returns the released per-entry stake.
    pub fn release(&mut self, pair: &Symbol) -> Option<Money> {
        self.per_entry.remove(pair)
    }

    pub fn per_entry(&self, pair: &Symbol) -> Option<Money> {
        self.per_entry.get(pair).copied()
    }

    /// Capital promised to the remaining entries of `open_positions`.
    ///
    /// Sum over positions with a reservation of
    /// `(N + 1 - stage) * per_entry_stake`, using each position's own
    /// direction ladder. Positions without a reservation contribute nothing.
    pub fn reserved_total(&self, open_positions: &[Position], config: &DcaConfig) -> Money {
        open_positions
            .iter()
            .filter_map(|position| {
                let stake = self.per_entry(&position.pair)?;
                let ladder = config.ladder(position.direction)?;
                let remaining = ladder.total_entries().saturating_sub(position.stage);
                Some(stake * Money::from(remaining))
            })
            .sum()
    }

    pub fn len(&self) -> usize {
        self.per_entry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_entry.is_empty()
    }
}
