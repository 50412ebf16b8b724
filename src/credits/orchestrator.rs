use std::cmp::Reverse;

use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::{
    credits::types::{
        CreditAdjustment, CreditOutcome, LeaderboardEntry, Standing, ViolatorEntry,
        clamp_listing_size,
    },
    ledger::{
        CreditBook, CreditStore, LedgerError, ViolationBook, ViolationStore,
        error::{arithmetic_error, invalid_request},
    },
    reconcile::{MemberObservation, ReconciliationEngine, ReconciliationPlan},
    types::{CommunityId, Credits, DEFAULT_CREDITS, Identity, ScoreChange, ViolationStats},
};

/// Sole writer of credits and violation stats.
///
/// Each store sits behind its own lock, held only for the read-modify-write of a
/// single call. The two stores fail independently: a violation record is never
/// rolled back because the paired credit update failed, and vice versa.
pub struct CreditOrchestrator {
    credits: Mutex<Box<dyn CreditStore>>,
    violations: Mutex<Box<dyn ViolationStore>>,
    engine: ReconciliationEngine,
    default_credits: Credits,
}

impl CreditOrchestrator {
    pub fn new(
        credits: Box<dyn CreditStore>,
        violations: Box<dyn ViolationStore>,
        engine: ReconciliationEngine,
        default_credits: Credits,
    ) -> Self {
        Self {
            credits: Mutex::new(credits),
            violations: Mutex::new(violations),
            engine,
            default_credits,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            Box::new(CreditBook::in_memory()),
            Box::new(ViolationBook::in_memory()),
            ReconciliationEngine::default(),
            DEFAULT_CREDITS,
        )
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    pub fn default_credits(&self) -> Credits {
        self.default_credits
    }

    pub async fn credits(&self, identity: Identity) -> Credits {
        self.credits
            .lock()
            .await
            .credits(&identity)
            .unwrap_or(self.default_credits)
    }

    pub async fn apply_delta(
        &self,
        identity: Identity,
        delta: Credits,
    ) -> Result<ScoreChange, LedgerError> {
        let mut store = self.credits.lock().await;
        let old_credits = store.credits(&identity).unwrap_or(self.default_credits);
        let new_credits = old_credits.checked_add(delta).ok_or_else(|| {
            arithmetic_error(format!(
                "credit overflow applying delta {delta} to {identity} (current {old_credits})"
            ))
        })?;
        store.set_credits(&identity, new_credits)?;
        drop(store);

        tracing::debug!(
            target: "credits",
            identity = %identity,
            delta,
            old_credits,
            new_credits,
            "credits_delta_applied"
        );
        Ok(ScoreChange {
            identity,
            old_credits,
            new_credits,
        })
    }

    pub async fn apply_absolute(
        &self,
        identity: Identity,
        value: Credits,
    ) -> Result<ScoreChange, LedgerError> {
        let mut store = self.credits.lock().await;
        let old_credits = store.credits(&identity).unwrap_or(self.default_credits);
        store.set_credits(&identity, value)?;
        drop(store);

        tracing::debug!(
            target: "credits",
            identity = %identity,
            old_credits,
            new_credits = value,
            "credits_set"
        );
        Ok(ScoreChange {
            identity,
            old_credits,
            new_credits: value,
        })
    }

    pub async fn record_violation(
        &self,
        identity: Identity,
        penalty: u64,
    ) -> Result<ViolationStats, LedgerError> {
        let stats = self.violations.lock().await.record(&identity, penalty)?;
        tracing::debug!(
            target: "credits",
            identity = %identity,
            penalty,
            count = stats.count,
            total_penalty = stats.total_penalty,
            "violation_recorded"
        );
        Ok(stats)
    }

    pub async fn violation_stats(&self, identity: Identity) -> ViolationStats {
        self.violations.lock().await.stats(&identity)
    }

    pub fn reconcile(
        &self,
        change: &ScoreChange,
        observation: &MemberObservation,
        now: OffsetDateTime,
    ) -> ReconciliationPlan {
        self.engine
            .reconcile(observation, change.old_credits, change.new_credits, now)
    }

    /// Applies an administrative adjustment and plans the follow-up platform changes.
    pub async fn adjust(
        &self,
        identity: Identity,
        adjustment: CreditAdjustment,
        observation: &MemberObservation,
        now: OffsetDateTime,
    ) -> Result<CreditOutcome, LedgerError> {
        let adjustment = adjustment
            .validate()
            .map_err(|err| invalid_request(err.to_string()))?;
        let change = match adjustment {
            CreditAdjustment::Give(amount) => self.apply_delta(identity, amount).await?,
            CreditAdjustment::Take(amount) => self.apply_delta(identity, -amount).await?,
            CreditAdjustment::Set(value) => self.apply_absolute(identity, value).await?,
        };
        Ok(self.outcome(change, observation, now))
    }

    /// Deducts a violation penalty and plans the follow-up platform changes.
    /// Does not touch violation stats; see [`Self::record_violation`].
    pub async fn penalize(
        &self,
        identity: Identity,
        penalty: Credits,
        observation: &MemberObservation,
        now: OffsetDateTime,
    ) -> Result<CreditOutcome, LedgerError> {
        let change = self.apply_delta(identity, -penalty).await?;
        Ok(self.outcome(change, observation, now))
    }

    fn outcome(
        &self,
        change: ScoreChange,
        observation: &MemberObservation,
        now: OffsetDateTime,
    ) -> CreditOutcome {
        let plan = self.reconcile(&change, observation, now);
        CreditOutcome {
            rank: self.engine.classify(change.new_credits).clone(),
            change,
            plan,
        }
    }

    pub async fn standing(&self, identity: Identity) -> Standing {
        let credits = self.credits(identity).await;
        let violations = self.violation_stats(identity).await;
        Standing {
            credits,
            rank: self.engine.classify(credits).clone(),
            violations,
        }
    }

    pub async fn leaderboard(
        &self,
        community_id: CommunityId,
        top_n: Option<usize>,
    ) -> Vec<LeaderboardEntry> {
        let mut members = self.credits.lock().await.community_credits(community_id);
        members.sort_by_key(|(member_id, credits)| (Reverse(*credits), *member_id));

        members
            .into_iter()
            .take(clamp_listing_size(top_n))
            .enumerate()
            .map(|(index, (member_id, credits))| LeaderboardEntry {
                position: index + 1,
                member_id,
                credits,
                rank: self.engine.classify(credits).clone(),
            })
            .collect()
    }

    pub async fn violators(
        &self,
        community_id: CommunityId,
        top_n: Option<usize>,
    ) -> Vec<ViolatorEntry> {
        let mut members = self.violations.lock().await.community_stats(community_id);
        members.sort_by_key(|(member_id, stats)| {
            (Reverse((stats.count, stats.total_penalty)), *member_id)
        });

        members
            .into_iter()
            .take(clamp_listing_size(top_n))
            .enumerate()
            .map(|(index, (member_id, stats))| ViolatorEntry {
                position: index + 1,
                member_id,
                stats,
            })
            .collect()
    }
}
