pub mod orchestrator;
pub mod types;

pub use orchestrator::CreditOrchestrator;
pub use types::{
    AdjustmentError, CreditAdjustment, CreditOutcome, LeaderboardEntry, MAX_ADJUSTMENT_AMOUNT,
    Standing, ViolatorEntry,
};
