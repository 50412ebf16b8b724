use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    platform::{
        error::{PlatformError, role_missing},
        ports::{Notice, NoticeTarget, PlatformPort},
    },
    types::{Identity, MessageRef},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlatformOperation {
    CurrentRoles,
    RestrictionEnd,
    RemoveRoles,
    AddRole,
    SetRestriction,
    RemoveMessage,
    Notify,
}

#[derive(Debug, Clone, Default)]
struct MemberState {
    roles: BTreeSet<String>,
    restricted_until: Option<OffsetDateTime>,
}

/// Notices and removed messages kept for inspection by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 256;

#[derive(Debug)]
struct InMemoryPlatformState {
    members: BTreeMap<Identity, MemberState>,
    known_roles: Option<BTreeSet<String>>,
    faults: BTreeMap<PlatformOperation, VecDeque<PlatformError>>,
    calls: BTreeMap<PlatformOperation, usize>,
    history_limit: usize,
    notices: VecDeque<(NoticeTarget, Notice)>,
    removed_messages: VecDeque<MessageRef>,
}

impl Default for InMemoryPlatformState {
    fn default() -> Self {
        Self {
            members: BTreeMap::new(),
            known_roles: None,
            faults: BTreeMap::new(),
            calls: BTreeMap::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            notices: VecDeque::new(),
            removed_messages: VecDeque::new(),
        }
    }
}

/// Appends to a history ring, dropping the oldest entries beyond `limit`.
fn remember<T>(history: &mut VecDeque<T>, limit: usize, item: T) {
    if limit == 0 {
        return;
    }
    while history.len() >= limit {
        history.pop_front();
    }
    history.push_back(item);
}

impl InMemoryPlatformState {
    fn enter(&mut self, operation: PlatformOperation) -> Result<(), PlatformError> {
        *self.calls.entry(operation).or_default() += 1;
        match self
            .faults
            .get_mut(&operation)
            .and_then(|queue| queue.pop_front())
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Deterministic platform kept entirely in memory. Members are created on first
/// touch; roles are accepted freely unless a set of known roles is configured.
#[derive(Debug, Default)]
pub struct InMemoryPlatform {
    state: Mutex<InMemoryPlatformState>,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_known_roles(roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let platform = Self::default();
        platform.state().known_roles = Some(roles.into_iter().map(Into::into).collect());
        platform
    }

    /// Caps the notice and removed-message history; `0` keeps nothing.
    pub fn with_history_limit(self, limit: usize) -> Self {
        {
            let mut state = self.state();
            state.history_limit = limit;
            state.notices.truncate(limit);
            state.removed_messages.truncate(limit);
        }
        self
    }

    fn state(&self) -> MutexGuard<'_, InMemoryPlatformState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_member(
        &self,
        identity: Identity,
        roles: impl IntoIterator<Item = impl Into<String>>,
        restricted_until: Option<OffsetDateTime>,
    ) {
        self.state().members.insert(
            identity,
            MemberState {
                roles: roles.into_iter().map(Into::into).collect(),
                restricted_until,
            },
        );
    }

    pub fn roles_of(&self, identity: Identity) -> BTreeSet<String> {
        self.state()
            .members
            .get(&identity)
            .map(|member| member.roles.clone())
            .unwrap_or_default()
    }

    pub fn restricted_until(&self, identity: Identity) -> Option<OffsetDateTime> {
        self.state()
            .members
            .get(&identity)
            .and_then(|member| member.restricted_until)
    }

    /// Queues an error returned by the next call of `operation`.
    pub fn fail_next(&self, operation: PlatformOperation, err: PlatformError) {
        self.state()
            .faults
            .entry(operation)
            .or_default()
            .push_back(err);
    }

    pub fn calls(&self, operation: PlatformOperation) -> usize {
        self.state().calls.get(&operation).copied().unwrap_or(0)
    }

    pub fn notices(&self) -> Vec<(NoticeTarget, Notice)> {
        self.state().notices.iter().cloned().collect()
    }

    pub fn removed_messages(&self) -> Vec<MessageRef> {
        self.state().removed_messages.iter().copied().collect()
    }
}

#[async_trait]
impl PlatformPort for InMemoryPlatform {
    async fn current_roles(&self, identity: Identity) -> Result<BTreeSet<String>, PlatformError> {
        let mut state = self.state();
        state.enter(PlatformOperation::CurrentRoles)?;
        Ok(state
            .members
            .get(&identity)
            .map(|member| member.roles.clone())
            .unwrap_or_default())
    }

    async fn restriction_end(
        &self,
        identity: Identity,
    ) -> Result<Option<OffsetDateTime>, PlatformError> {
        let mut state = self.state();
        state.enter(PlatformOperation::RestrictionEnd)?;
        Ok(state
            .members
            .get(&identity)
            .and_then(|member| member.restricted_until))
    }

    async fn remove_roles(
        &self,
        identity: Identity,
        roles: &BTreeSet<String>,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.enter(PlatformOperation::RemoveRoles)?;
        let member = state.members.entry(identity).or_default();
        member.roles.retain(|role| !roles.contains(role));
        Ok(())
    }

    async fn add_role(
        &self,
        identity: Identity,
        role: &str,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.enter(PlatformOperation::AddRole)?;
        if let Some(known_roles) = &state.known_roles
            && !known_roles.contains(role)
        {
            return Err(role_missing(format!(
                "role '{role}' not found in community {}",
                identity.community_id
            )));
        }
        state
            .members
            .entry(identity)
            .or_default()
            .roles
            .insert(role.to_string());
        Ok(())
    }

    async fn set_restriction(
        &self,
        identity: Identity,
        until: Option<OffsetDateTime>,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.enter(PlatformOperation::SetRestriction)?;
        state.members.entry(identity).or_default().restricted_until = until;
        Ok(())
    }

    async fn remove_message(&self, message: MessageRef) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.enter(PlatformOperation::RemoveMessage)?;
        tracing::info!(
            target: "platform",
            identity = %message.identity,
            channel_id = message.channel_id,
            message_id = message.message_id,
            "message_removed"
        );
        let limit = state.history_limit;
        remember(&mut state.removed_messages, limit, message);
        Ok(())
    }

    async fn notify(&self, target: NoticeTarget, notice: Notice) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.enter(PlatformOperation::Notify)?;
        tracing::info!(target: "platform", target_kind = ?target, notice = ?notice, "notice_delivered");
        let limit = state.history_limit;
        remember(&mut state.notices, limit, (target, notice));
        Ok(())
    }
}
