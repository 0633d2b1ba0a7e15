//! Per-position guard against firing the same stage twice
//!
//! The host applies a DCA order some time after the policy proposes it. Until
//! the position's stage moves, re-evaluating it must not propose the same
//! entry again. The tracker remembers the stage at which the last trigger
//! was issued; a matching stage is a no-op.

use std::collections::HashMap;

use crate::PositionId;

#[derive(Debug, Clone, Default)]
pub struct DcaStageTracker {
    last_triggered: HashMap<PositionId, u32>,
}

impl DcaStageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a trigger was already issued for `id` at `stage`
    pub fn is_recorded(&self, id: &PositionId, stage: u32) -> bool {
        self.last_triggered.get(id) == Some(&stage)
    }

    /// Record that a trigger advancing `id` from `stage` was issued
    pub fn record(&mut self, id: &PositionId, stage: u32) {
        self.last_triggered.insert(id.clone(), stage);
    }

    pub fn last_stage(&self, id: &PositionId) -> Option<u32> {
        self.last_triggered.get(id).copied()
    }

    /// Forget `id`. The host does not report closures on its own, so its
    /// exit handler must call this.
    pub fn release(&mut self, id: &PositionId) -> bool {
        self.last_triggered.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.last_triggered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_triggered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_stage_is_recorded_until_advance() {
        let mut tracker = DcaStageTracker::new();
        let id = PositionId::new("7");

        assert!(!tracker.is_recorded(&id, 1));
        tracker.record(&id, 1);
        assert!(tracker.is_recorded(&id, 1));
        assert!(tracker.is_recorded(&id, 1));

        // Host filled the order, stage moved on
        assert!(!tracker.is_recorded(&id, 2));
        assert_eq!(tracker.last_stage(&id), Some(1));
    }

    #[test]
    fn test_release_forgets_position() {
        let mut tracker = DcaStageTracker::new();
        let id = PositionId::new("7");
        tracker.record(&id, 3);
        assert!(tracker.release(&id));
        assert!(!tracker.release(&id));
        assert!(!tracker.is_recorded(&id, 3));
        assert!(tracker.is_empty());
    }
}
