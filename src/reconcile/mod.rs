pub mod engine;
pub mod types;

pub use engine::ReconciliationEngine;
pub use types::{MemberObservation, ReconciliationPlan};
