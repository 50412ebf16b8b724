use std::collections::BTreeSet;

use time::OffsetDateTime;

use crate::restriction::RestrictionDirective;

/// Member state as last read from the platform. Never cached by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemberObservation {
    pub roles: BTreeSet<String>,
    pub restricted_until: Option<OffsetDateTime>,
}

impl MemberObservation {
    pub fn new(
        roles: impl IntoIterator<Item = impl Into<String>>,
        restricted_until: Option<OffsetDateTime>,
    ) -> Self {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            restricted_until,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub roles_to_remove: BTreeSet<String>,
    pub role_to_add: Option<String>,
    pub restriction: RestrictionDirective,
    pub rank_label: String,
    pub rank_changed: bool,
}

impl ReconciliationPlan {
    pub fn is_noop(&self) -> bool {
        self.roles_to_remove.is_empty() && self.role_to_add.is_none() && self.restriction.is_none()
    }
}
