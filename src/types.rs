use std::fmt;

use serde::{Deserialize, Serialize};

pub type CommunityId = u64;
pub type MemberId = u64;
pub type ChannelId = u64;
pub type MessageId = u64;
pub type Credits = i64;

pub const DEFAULT_CREDITS: Credits = 1_000;
pub const FORBIDDEN_CONTENT_PENALTY: Credits = 1_000;

/// A tracked member, always scoped to the community it was observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub community_id: CommunityId,
    pub member_id: MemberId,
}

impl Identity {
    pub fn new(community_id: CommunityId, member_id: MemberId) -> Self {
        Self {
            community_id,
            member_id,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.community_id, self.member_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViolationStats {
    pub count: u64,
    #[serde(rename = "deducted_credits")]
    pub total_penalty: u64,
}

impl ViolationStats {
    pub fn recorded(self, penalty: u64) -> Self {
        Self {
            count: self.count.saturating_add(1),
            total_penalty: self.total_penalty.saturating_add(penalty),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreChange {
    pub identity: Identity,
    pub old_credits: Credits,
    pub new_credits: Credits,
}

impl ScoreChange {
    pub fn as_pair(&self) -> (Credits, Credits) {
        (self.old_credits, self.new_credits)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub identity: Identity,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}
