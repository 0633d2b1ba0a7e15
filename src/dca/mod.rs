//! Staged DCA decision components
//!
//! Per tick, per open position:
//!
//! ```text
//! ExitEvaluator ──terminal──> Exit (tracker + ledger released, cooldown on stop-loss)
//!       │
//!      none
//!       ▼
//! DcaStageTracker ──already issued──> Hold
//!       ▼
//! StagePolicy ──no trigger──> Hold
//!       ▼
//! StakeAllocator (ReservationLedger) ──zero / unaffordable──> Hold
//!       ▼
//! tracker.record ──> AddStake { stake, DCA_<n> }
//! ```
//!
//! `DcaEngine` wires these together; each piece is also usable on its own.

pub mod engine;
pub mod exit;
pub mod reservation;
pub mod stage_policy;
pub mod stake;
pub mod tracker;

pub use engine::{DcaEngine, Tick, TickOutcome};
pub use exit::{CooldownBook, ExitDecision, ExitEvaluator};
pub use reservation::ReservationLedger;
pub use stake::{StakeAllocator, StakeRequest};
pub use tracker::DcaStageTracker;
