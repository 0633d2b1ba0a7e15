//! Terminal exit decisions and post-stop-loss cooldowns

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::config::DcaConfig;
use crate::dca::stage_policy;
use crate::{Position, Symbol};

/// Outcome of an exit check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitDecision {
    /// Keep the position open
    None,
    TakeProfit,
    /// All DCA capacity used and the loss still exceeds the DCA trigger
    StopLossAfterDca,
}

impl ExitDecision {
    /// Host-facing reason tag
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            ExitDecision::None => None,
            ExitDecision::TakeProfit => Some("TAKE_PROFIT"),
            ExitDecision::StopLossAfterDca => Some("STOP_LOSS_AFTER_DCA"),
        }
    }

    /// Terminal decisions require the host to call `release` on closure
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExitDecision::None)
    }
}

impl std::fmt::Display for ExitDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason().unwrap_or("NONE"))
    }
}

/// Decides take-profit and stop-loss-after-DCA exits
#[derive(Debug, Clone, Copy)]
pub struct ExitEvaluator<'a> {
    config: &'a DcaConfig,
}

impl<'a> ExitEvaluator<'a> {
    pub fn new(config: &'a DcaConfig) -> Self {
        Self { config }
    }

    /// `confirmation_signal` is the oscillator reading supplied by the
    /// indicator layer; it is only consulted when the ladder configures a
    /// take-profit confirmation.
    pub fn evaluate(
        &self,
        position: &Position,
        current_price: f64,
        confirmation_signal: Option<f64>,
    ) -> ExitDecision {
        let Some(ladder) = self.config.ladder(position.direction) else {
            return ExitDecision::None;
        };

        let rel = position.relative_profit(current_price);

        let confirmed = ladder
            .confirmation
            .map(|gate| gate.is_met(confirmation_signal))
            .unwrap_or(true);
        if rel >= ladder.take_profit && confirmed {
            return ExitDecision::TakeProfit;
        }

        if self.config.stop_loss_after_dca
            && stage_policy::is_exhausted(position, ladder)
            && rel <= -ladder.dca_threshold
        {
            return ExitDecision::StopLossAfterDca;
        }

        ExitDecision::None
    }
}

/// Per-pair entry blocks set after a stop-loss-after-DCA exit
#[derive(Debug, Clone, Default)]
pub struct CooldownBook {
    until: HashMap<Symbol, DateTime<Utc>>,
}

impl CooldownBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block `pair` until `now + duration`, saturating at the latest
    /// representable time. Returns the expiry.
    pub fn start(&mut self, pair: &Symbol, now: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
        let expiry = now
            .checked_add_signed(duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.until.insert(pair.clone(), expiry);
        expiry
    }

    pub fn is_cooldown_active(&self, pair: &Symbol, now: DateTime<Utc>) -> bool {
        self.until.get(pair).is_some_and(|expiry| now < *expiry)
    }

    pub fn expiry(&self, pair: &Symbol) -> Option<DateTime<Utc>> {
        self.until.get(pair).copied()
    }

    /// Drop expired entries, returning how many were removed
    pub fn clear_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.until.len();
        self.until.retain(|_, expiry| now < *expiry);
        before - self.until.len()
    }

    pub fn len(&self) -> usize {
        self.until.len()
    }

    pub fn is_empty(&self) -> bool {
        self.until.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LadderParams, TakeProfitConfirmation};
    use crate::{Direction, Money, PositionId};
    use chrono::TimeZone;

    fn position(direction: Direction, stage: u32) -> Position {
        Position {
            id: PositionId::new("1"),
            pair: Symbol::new("BTC/USDT"),
            direction,
            entry_price: 100.0,
            stage,
            stake: Money::from_i64(500),
            opened_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn confirmed_config() -> DcaConfig {
        DcaConfig::new(
            LadderParams::new(4, 0.03, 0.04)
                .with_confirmation(TakeProfitConfirmation::at_least(65.0)),
        )
        .with_stop_loss_after_dca(true)
    }

    #[test]
    fn test_take_profit_requires_confirmation() {
        let config = confirmed_config();
        let evaluator = ExitEvaluator::new(&config);
        let pos = position(Direction::Long, 1);

        assert_eq!(evaluator.evaluate(&pos, 104.0, Some(70.0)), ExitDecision::TakeProfit);
        assert_eq!(evaluator.evaluate(&pos, 104.0, Some(60.0)), ExitDecision::None);
        assert_eq!(evaluator.evaluate(&pos, 104.0, None), ExitDecision::None);
        assert_eq!(evaluator.evaluate(&pos, 103.0, Some(90.0)), ExitDecision::None);
    }

    #[test]
    fn test_take_profit_without_gate() {
        let config = DcaConfig::new(LadderParams::new(4, 0.03, 0.04));
        let evaluator = ExitEvaluator::new(&config);
        assert_eq!(
            evaluator.evaluate(&position(Direction::Long, 1), 104.0, None),
            ExitDecision::TakeProfit
        );
    }

    #[test]
    fn test_short_take_profit_uses_at_most_gate() {
        let config = DcaConfig::new(LadderParams::new(4, 0.03, 0.04)).with_short(
            LadderParams::new(2, 0.05, 0.02).with_confirmation(TakeProfitConfirmation::at_most(36.0)),
        );
        let evaluator = ExitEvaluator::new(&config);
        let pos = position(Direction::Short, 1);
        assert_eq!(evaluator.evaluate(&pos, 97.0, Some(30.0)), ExitDecision::TakeProfit);
        assert_eq!(evaluator.evaluate(&pos, 97.0, Some(50.0)), ExitDecision::None);
    }

    #[test]
    fn test_stop_loss_only_after_ladder_exhausted() {
        let config = confirmed_config();
        let evaluator = ExitEvaluator::new(&config);

        assert_eq!(
            evaluator.evaluate(&position(Direction::Long, 5), 95.0, None),
            ExitDecision::StopLossAfterDca
        );
        assert_eq!(
            evaluator.evaluate(&position(Direction::Long, 2), 95.0, None),
            ExitDecision::None
        );
        // Exhausted but loss inside the trigger band
        assert_eq!(
            evaluator.evaluate(&position(Direction::Long, 5), 98.0, None),
            ExitDecision::None
        );
    }

    #[test]
    fn test_stop_loss_toggle() {
        let config = confirmed_config().with_stop_loss_after_dca(false);
        let evaluator = ExitEvaluator::new(&config);
        assert_eq!(
            evaluator.evaluate(&position(Direction::Long, 5), 50.0, None),
            ExitDecision::None
        );
    }

    #[test]
    fn test_reason_tags() {
        assert_eq!(ExitDecision::TakeProfit.reason(), Some("TAKE_PROFIT"));
        assert_eq!(
            ExitDecision::StopLossAfterDca.reason(),
            Some("STOP_LOSS_AFTER_DCA")
        );
        assert!(!ExitDecision::None.is_terminal());
    }

    #[test]
    fn test_cooldown_saturates_instead_of_overflowing() {
        let mut book = CooldownBook::new();
        let pair = Symbol::new("BTC/USDT");
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let expiry = book.start(&pair, now, Duration::days(1_000_000_000));
        assert_eq!(expiry, DateTime::<Utc>::MAX_UTC);
        assert!(book.is_cooldown_active(&pair, now + Duration::days(365 * 100)));
    }

    #[test]
    fn test_cooldown_expires() {
        let mut book = CooldownBook::new();
        let pair = Symbol::new("BTC/USDT");
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        book.start(&pair, now, Duration::hours(6));
        assert!(book.is_cooldown_active(&pair, now + Duration::hours(5)));
        assert!(!book.is_cooldown_active(&pair, now + Duration::hours(6)));
        assert!(!book.is_cooldown_active(&Symbol::new("ETH/USDT"), now));

        assert_eq!(book.clear_expired(now + Duration::hours(1)), 0);
        assert_eq!(book.clear_expired(now + Duration::hours(7)), 1);
        assert!(book.is_empty());
    }
}
