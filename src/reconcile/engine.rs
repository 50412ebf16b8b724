use std::sync::Arc;

use time::OffsetDateTime;

use crate::{
    ranks::{RankEntry, RankTable},
    reconcile::types::{MemberObservation, ReconciliationPlan},
    restriction::RestrictionPolicy,
    types::Credits,
};

/// Pure planner: same inputs, same plan. Holds no member state.
#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    ranks: Arc<RankTable>,
    policy: RestrictionPolicy,
}

impl ReconciliationEngine {
    pub fn new(ranks: Arc<RankTable>, policy: RestrictionPolicy) -> Self {
        Self { ranks, policy }
    }

    pub fn ranks(&self) -> &RankTable {
        &self.ranks
    }

    pub fn policy(&self) -> &RestrictionPolicy {
        &self.policy
    }

    pub fn classify(&self, credits: Credits) -> &RankEntry {
        self.ranks.classify(credits)
    }

    pub fn reconcile(
        &self,
        observation: &MemberObservation,
        old_credits: Credits,
        new_credits: Credits,
        now: OffsetDateTime,
    ) -> ReconciliationPlan {
        let old_rank = self.ranks.classify(old_credits);
        let new_rank = self.ranks.classify(new_credits);
        let target_role = new_rank.role_label.as_deref();

        // every other rank role goes, even if several are held at once
        let roles_to_remove = observation
            .roles
            .iter()
            .filter(|role| self.ranks.is_rank_role(role) && Some(role.as_str()) != target_role)
            .cloned()
            .collect();

        let role_to_add = target_role
            .filter(|role| !observation.roles.contains(*role))
            .map(str::to_string);

        let restriction = self
            .policy
            .decide(new_credits, observation.restricted_until, now);

        ReconciliationPlan {
            roles_to_remove,
            role_to_add,
            restriction,
            rank_label: new_rank.label.clone(),
            rank_changed: old_rank.threshold != new_rank.threshold,
        }
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new(Arc::new(RankTable::standard()), RestrictionPolicy::default())
    }
}
