//! Stage policy: may this position take another entry at this price?
//!
//! The trigger is measured against the average entry price, not the last
//! fill. Each DCA improves the average, so the next trigger sits a full
//! threshold beyond the new average and the rungs widen as the ladder fills.

use crate::config::{DcaConfig, LadderParams};
use crate::{Direction, Position};

/// Signed move from the average entry: `current/entry - 1`
pub fn deviation(position: &Position, current_price: f64) -> f64 {
    if position.entry_price <= 0.0 {
        return 0.0;
    }
    current_price / position.entry_price - 1.0
}

/// Whether the position has used its initial entry plus all N steps
pub fn is_exhausted(position: &Position, ladder: &LadderParams) -> bool {
    position.stage >= ladder.total_entries()
}

/// Returns true when a DCA entry is permitted for `position` at `current_price`.
///
/// Fails closed once `stage >= N + 1` and for directions the config does
/// not trade.
pub fn should_trigger(position: &Position, config: &DcaConfig, current_price: f64) -> bool {
    let Some(ladder) = config.ladder(position.direction) else {
        return false;
    };
    if is_exhausted(position, ladder) || position.entry_price <= 0.0 {
        return false;
    }

    let move_from_avg = deviation(position, current_price);
    match position.direction {
        Direction::Long => move_from_avg <= -ladder.dca_threshold,
        Direction::Short => move_from_avg >= ladder.dca_threshold,
    }
}

/// Price at which the next DCA would fire given the current average
pub fn next_trigger_price(entry_price: f64, direction: Direction, ladder: &LadderParams) -> f64 {
    match direction {
        Direction::Long => entry_price * (1.0 - ladder.dca_threshold),
        Direction::Short => entry_price * (1.0 + ladder.dca_threshold),
    }
}

/// Audit tag for the entry that takes the position to `next_stage`
pub fn entry_tag(next_stage: u32) -> String {
    format!("DCA_{}", next_stage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Money, PositionId, Symbol};
    use chrono::Utc;

    fn config() -> DcaConfig {
        DcaConfig::new(LadderParams::new(4, 0.03, 0.04))
            .with_short(LadderParams::new(2, 0.05, 0.02))
    }

    fn position(direction: Direction, entry_price: f64, stage: u32) -> Position {
        Position {
            id: PositionId::new("p1"),
            pair: Symbol::new("BTC/USDT"),
            direction,
            entry_price,
            stage,
            stake: Money::from_i64(200),
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn test_long_triggers_at_threshold() {
        let cfg = config();
        let pos = position(Direction::Long, 100.0, 1);
        assert!(!should_trigger(&pos, &cfg, 98.0));
        assert!(should_trigger(&pos, &cfg, 97.0));
        assert!(should_trigger(&pos, &cfg, 90.0));
    }

    #[test]
    fn test_short_triggers_on_rise() {
        let cfg = config();
        let pos = position(Direction::Short, 100.0, 1);
        assert!(!should_trigger(&pos, &cfg, 96.0));
        assert!(!should_trigger(&pos, &cfg, 104.0));
        assert!(should_trigger(&pos, &cfg, 105.0));
    }

    #[test]
    fn test_fails_closed_when_exhausted() {
        let cfg = config();
        for stage in 5..10 {
            let pos = position(Direction::Long, 100.0, stage);
            assert!(!should_trigger(&pos, &cfg, 1.0), "stage {}", stage);
        }
        let short = position(Direction::Short, 100.0, 3);
        assert!(!should_trigger(&short, &cfg, 200.0));
    }

    #[test]
    fn test_short_blocked_without_short_ladder() {
        let cfg = DcaConfig::new(LadderParams::new(4, 0.03, 0.04));
        let pos = position(Direction::Short, 100.0, 1);
        assert!(!should_trigger(&pos, &cfg, 150.0));
    }

    #[test]
    fn test_trigger_follows_average_not_first_fill() {
        let cfg = config();
        // After a DCA at 97 the host reports an average of 98.5
        let pos = position(Direction::Long, 98.5, 2);
        assert!(!should_trigger(&pos, &cfg, 97.0));
        assert!(!should_trigger(&pos, &cfg, 95.6));
        assert!(should_trigger(&pos, &cfg, 95.5));
    }

    #[test]
    fn test_next_trigger_price() {
        let ladder = LadderParams::new(4, 0.03, 0.04);
        assert!((next_trigger_price(100.0, Direction::Long, &ladder) - 97.0).abs() < 1e-9);
        assert!((next_trigger_price(100.0, Direction::Short, &ladder) - 103.0).abs() < 1e-9);
    }

    #[test]
    fn test_entry_tag() {
        assert_eq!(entry_tag(2), "DCA_2");
    }
}
