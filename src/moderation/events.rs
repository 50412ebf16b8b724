use serde::{Deserialize, Serialize};

use crate::{
    credits::CreditAdjustment,
    types::{ChannelId, CommunityId, Identity, MemberId, MessageId},
};

/// Community activity delivered by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommunityEvent {
    MessagePosted {
        community_id: CommunityId,
        channel_id: ChannelId,
        message_id: MessageId,
        member_id: MemberId,
        #[serde(default)]
        author_is_bot: bool,
        content: String,
    },
    /// `actor_is_admin` is the gateway's view of the actor's community permissions;
    /// adjustments from anyone else are refused.
    AdminAdjust {
        community_id: CommunityId,
        channel_id: ChannelId,
        member_id: MemberId,
        actor_id: MemberId,
        #[serde(default)]
        actor_is_admin: bool,
        adjustment: CreditAdjustment,
    },
    CheckStanding {
        community_id: CommunityId,
        channel_id: ChannelId,
        member_id: MemberId,
    },
    Leaderboard {
        community_id: CommunityId,
        channel_id: ChannelId,
        requester_id: MemberId,
        #[serde(default)]
        top_n: Option<usize>,
    },
    Violators {
        community_id: CommunityId,
        channel_id: ChannelId,
        requester_id: MemberId,
        #[serde(default)]
        top_n: Option<usize>,
    },
}

impl CommunityEvent {
    /// The member the event is about, or who issued it for community-wide queries.
    pub fn identity(&self) -> Identity {
        match self {
            CommunityEvent::MessagePosted {
                community_id,
                member_id,
                ..
            }
            | CommunityEvent::AdminAdjust {
                community_id,
                member_id,
                ..
            }
            | CommunityEvent::CheckStanding {
                community_id,
                member_id,
                ..
            }
            | CommunityEvent::Leaderboard {
                community_id,
                requester_id: member_id,
                ..
            }
            | CommunityEvent::Violators {
                community_id,
                requester_id: member_id,
                ..
            } => Identity::new(*community_id, *member_id),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CommunityEvent::MessagePosted { .. } => "message_posted",
            CommunityEvent::AdminAdjust { .. } => "admin_adjust",
            CommunityEvent::CheckStanding { .. } => "check_standing",
            CommunityEvent::Leaderboard { .. } => "leaderboard",
            CommunityEvent::Violators { .. } => "violators",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Event(CommunityEvent),
    Shutdown,
}
