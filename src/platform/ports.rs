use std::collections::BTreeSet;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    credits::{LeaderboardEntry, Standing, ViolatorEntry},
    platform::error::PlatformError,
    reconcile::MemberObservation,
    types::{ChannelId, CommunityId, Credits, Identity, MemberId, MessageRef},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeTarget {
    Channel {
        community_id: CommunityId,
        channel_id: ChannelId,
    },
    Direct(Identity),
}

/// Structured announcement; rendering is left to the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    ViolationIntercepted {
        identity: Identity,
        excerpt: String,
        penalty: Credits,
        new_credits: Credits,
    },
    CreditsAdjusted {
        identity: Identity,
        actor_id: MemberId,
        operation: &'static str,
        amount: Credits,
        new_credits: Credits,
        rank: String,
    },
    RestrictionApplied {
        identity: Identity,
        credits: Credits,
        minutes: i64,
        extended: bool,
        rank_role: Option<String>,
    },
    RestrictionLifted {
        identity: Identity,
        credits: Credits,
        rank_role: Option<String>,
    },
    ConfigurationProblem {
        identity: Identity,
        message: String,
    },
    PermissionProblem {
        identity: Identity,
        message: String,
    },
    CommandRejected {
        actor_id: MemberId,
        message: String,
    },
    /// `restricted_until` is only set while the restriction is still active.
    StandingReport {
        identity: Identity,
        standing: Standing,
        restricted_until: Option<OffsetDateTime>,
        held_rank_role: Option<String>,
    },
    LeaderboardReport {
        community_id: CommunityId,
        entries: Vec<LeaderboardEntry>,
    },
    ViolatorReport {
        community_id: CommunityId,
        entries: Vec<ViolatorEntry>,
    },
}

#[async_trait]
pub trait PlatformPort: Send + Sync {
    async fn current_roles(&self, identity: Identity) -> Result<BTreeSet<String>, PlatformError>;

    async fn restriction_end(
        &self,
        identity: Identity,
    ) -> Result<Option<OffsetDateTime>, PlatformError>;

    async fn remove_roles(
        &self,
        identity: Identity,
        roles: &BTreeSet<String>,
        reason: &str,
    ) -> Result<(), PlatformError>;

    async fn add_role(
        &self,
        identity: Identity,
        role: &str,
        reason: &str,
    ) -> Result<(), PlatformError>;

    async fn set_restriction(
        &self,
        identity: Identity,
        until: Option<OffsetDateTime>,
        reason: &str,
    ) -> Result<(), PlatformError>;

    async fn remove_message(&self, message: MessageRef) -> Result<(), PlatformError>;

    async fn notify(&self, target: NoticeTarget, notice: Notice) -> Result<(), PlatformError>;
}

pub async fn observe_member(
    platform: &dyn PlatformPort,
    identity: Identity,
) -> Result<MemberObservation, PlatformError> {
    Ok(MemberObservation {
        roles: platform.current_roles(identity).await?,
        restricted_until: platform.restriction_end(identity).await?,
    })
}
