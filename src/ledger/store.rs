use std::collections::BTreeMap;

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    ledger::{error::LedgerError, persistence::JsonDocument},
    types::{CommunityId, Credits, Identity, MemberId, ViolationStats},
};

/// Community id -> member id -> value. Serializes with string keys.
pub type ScopedBook<V> = BTreeMap<CommunityId, BTreeMap<MemberId, V>>;

pub trait CreditStore: Send {
    fn credits(&self, identity: &Identity) -> Option<Credits>;

    fn set_credits(&mut self, identity: &Identity, credits: Credits) -> Result<(), LedgerError>;

    fn community_credits(&self, community_id: CommunityId) -> Vec<(MemberId, Credits)>;
}

pub trait ViolationStore: Send {
    fn stats(&self, identity: &Identity) -> ViolationStats;

    fn record(&mut self, identity: &Identity, penalty: u64) -> Result<ViolationStats, LedgerError>;

    fn community_stats(&self, community_id: CommunityId) -> Vec<(MemberId, ViolationStats)>;
}

/// In-memory book, optionally mirrored to a JSON document after every write.
#[derive(Debug, Clone)]
pub struct BookStore<V> {
    book: ScopedBook<V>,
    document: Option<JsonDocument>,
}

impl<V> BookStore<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    pub fn in_memory() -> Self {
        Self {
            book: BTreeMap::new(),
            document: None,
        }
    }

    pub fn open(document: JsonDocument) -> Result<Self, LedgerError> {
        let book = document.load_or_default()?;
        Ok(Self {
            book,
            document: Some(document),
        })
    }

    pub fn get(&self, identity: &Identity) -> Option<&V> {
        self.book
            .get(&identity.community_id)
            .and_then(|members| members.get(&identity.member_id))
    }

    pub fn community(&self, community_id: CommunityId) -> Vec<(MemberId, V)> {
        self.book
            .get(&community_id)
            .map(|members| {
                members
                    .iter()
                    .map(|(member_id, value)| (*member_id, value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Writes `value` and persists; on a failed save the previous value is restored.
    fn put(&mut self, identity: &Identity, value: V) -> Result<(), LedgerError> {
        let previous = self
            .book
            .entry(identity.community_id)
            .or_default()
            .insert(identity.member_id, value);

        let Some(document) = &self.document else {
            return Ok(());
        };
        let Err(err) = document.save(&self.book) else {
            return Ok(());
        };

        match previous {
            Some(previous) => {
                if let Some(members) = self.book.get_mut(&identity.community_id) {
                    members.insert(identity.member_id, previous);
                }
            }
            None => {
                let now_empty = self
                    .book
                    .get_mut(&identity.community_id)
                    .map(|members| {
                        members.remove(&identity.member_id);
                        members.is_empty()
                    })
                    .unwrap_or(false);
                if now_empty {
                    self.book.remove(&identity.community_id);
                }
            }
        }
        Err(err)
    }
}

impl<V> Default for BookStore<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    fn default() -> Self {
        Self::in_memory()
    }
}

pub type CreditBook = BookStore<Credits>;
pub type ViolationBook = BookStore<ViolationStats>;

impl CreditStore for BookStore<Credits> {
    fn credits(&self, identity: &Identity) -> Option<Credits> {
        self.get(identity).copied()
    }

    fn set_credits(&mut self, identity: &Identity, credits: Credits) -> Result<(), LedgerError> {
        self.put(identity, credits)
    }

    fn community_credits(&self, community_id: CommunityId) -> Vec<(MemberId, Credits)> {
        self.community(community_id)
    }
}

impl ViolationStore for BookStore<ViolationStats> {
    fn stats(&self, identity: &Identity) -> ViolationStats {
        self.get(identity).copied().unwrap_or_default()
    }

    fn record(&mut self, identity: &Identity, penalty: u64) -> Result<ViolationStats, LedgerError> {
        let updated = self.stats(identity).recorded(penalty);
        self.put(identity, updated)?;
        Ok(updated)
    }

    fn community_stats(&self, community_id: CommunityId) -> Vec<(MemberId, ViolationStats)> {
        self.community(community_id)
    }
}
