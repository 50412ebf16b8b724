use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    ranks::RankEntry,
    reconcile::ReconciliationPlan,
    types::{Credits, MemberId, ScoreChange, ViolationStats},
};

pub const MAX_ADJUSTMENT_AMOUNT: Credits = 1_000_000;
pub const DEFAULT_LISTING_SIZE: usize = 10;
pub const MIN_LISTING_SIZE: usize = 3;
pub const MAX_LISTING_SIZE: usize = 20;

/// An administrative change to a member's credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "amount", rename_all = "snake_case")]
pub enum CreditAdjustment {
    Give(Credits),
    Take(Credits),
    Set(Credits),
}

impl CreditAdjustment {
    pub fn validate(self) -> Result<Self, AdjustmentError> {
        match self {
            CreditAdjustment::Give(amount) | CreditAdjustment::Take(amount)
                if !(1..=MAX_ADJUSTMENT_AMOUNT).contains(&amount) =>
            {
                Err(AdjustmentError::out_of_range(amount))
            }
            _ => Ok(self),
        }
    }

    pub fn amount(self) -> Credits {
        match self {
            CreditAdjustment::Give(amount)
            | CreditAdjustment::Take(amount)
            | CreditAdjustment::Set(amount) => amount,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            CreditAdjustment::Give(_) => "give",
            CreditAdjustment::Take(_) => "take",
            CreditAdjustment::Set(_) => "set",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentError {
    pub amount: Credits,
    pub message: String,
}

impl AdjustmentError {
    fn out_of_range(amount: Credits) -> Self {
        Self {
            amount,
            message: format!(
                "adjustment amount {amount} is outside the permitted range 1..={MAX_ADJUSTMENT_AMOUNT}"
            ),
        }
    }
}

impl fmt::Display for AdjustmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AdjustmentError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditOutcome {
    pub change: ScoreChange,
    pub rank: RankEntry,
    pub plan: ReconciliationPlan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub credits: Credits,
    pub rank: RankEntry,
    pub violations: ViolationStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub position: usize,
    pub member_id: MemberId,
    pub credits: Credits,
    pub rank: RankEntry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolatorEntry {
    pub position: usize,
    pub member_id: MemberId,
    pub stats: ViolationStats,
}

pub fn clamp_listing_size(top_n: Option<usize>) -> usize {
    top_n
        .unwrap_or(DEFAULT_LISTING_SIZE)
        .clamp(MIN_LISTING_SIZE, MAX_LISTING_SIZE)
}
