use std::sync::Arc;

use time::OffsetDateTime;
use tokio::{sync::mpsc, time::timeout};

use crate::{
    credits::{CreditAdjustment, CreditOrchestrator, CreditOutcome},
    ledger::LedgerError,
    moderation::{
        events::{CommunityEvent, Inbound},
        matcher::ContentMatcher,
    },
    platform::{
        Notice, NoticeTarget, PlanApplication, PlanApplier, PlatformErrorKind, PlatformPort,
        error::{PlatformError, transient},
        observe_member,
    },
    reconcile::MemberObservation,
    restriction::{RestrictionDirective, is_active},
    types::{ChannelId, Credits, Identity, MemberId, MessageRef, ViolationStats},
};

const ACCESS_DENIED: &str = "access denied: only community administrators can adjust credits";

/// Ledger outcome of one event plus what reached the platform.
///
/// `application` is `None` when the member's platform state could not be
/// observed; the ledger is still updated and the next change resynchronizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberUpdate {
    pub outcome: CreditOutcome,
    pub application: Option<PlanApplication>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Ignored,
    Rejected {
        message: String,
    },
    Violation {
        excerpt: String,
        violations: Option<ViolationStats>,
        update: MemberUpdate,
    },
    Adjusted(MemberUpdate),
    Reported,
}

impl EventOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            EventOutcome::Ignored => "ignored",
            EventOutcome::Rejected { .. } => "rejected",
            EventOutcome::Violation { .. } => "violation",
            EventOutcome::Adjusted(_) => "adjusted",
            EventOutcome::Reported => "reported",
        }
    }

    pub fn update(&self) -> Option<&MemberUpdate> {
        match self {
            EventOutcome::Violation { update, .. } | EventOutcome::Adjusted(update) => Some(update),
            EventOutcome::Ignored | EventOutcome::Rejected { .. } | EventOutcome::Reported => None,
        }
    }
}

pub struct ModerationService {
    orchestrator: Arc<CreditOrchestrator>,
    platform: Arc<dyn PlatformPort>,
    matcher: Arc<dyn ContentMatcher>,
    applier: PlanApplier,
    penalty: Credits,
}

impl ModerationService {
    pub fn new(
        orchestrator: Arc<CreditOrchestrator>,
        platform: Arc<dyn PlatformPort>,
        matcher: Arc<dyn ContentMatcher>,
        applier: PlanApplier,
        penalty: Credits,
    ) -> Self {
        Self {
            orchestrator,
            platform,
            matcher,
            applier,
            penalty,
        }
    }

    pub fn orchestrator(&self) -> &Arc<CreditOrchestrator> {
        &self.orchestrator
    }

    #[tracing::instrument(name = "moderation_run", target = "moderation", skip_all)]
    pub async fn run(self, mut inbound_rx: mpsc::Receiver<Inbound>) {
        while let Some(inbound) = inbound_rx.recv().await {
            let event = match inbound {
                Inbound::Event(event) => event,
                Inbound::Shutdown => break,
            };

            let kind = event.kind();
            let identity = event.identity();
            match self.handle(event).await {
                Ok(outcome) => tracing::debug!(
                    target: "moderation",
                    identity = %identity,
                    event = kind,
                    outcome = outcome.label(),
                    "event_handled"
                ),
                Err(err) => tracing::warn!(
                    target: "moderation",
                    identity = %identity,
                    event = kind,
                    kind = ?err.kind,
                    error = %err,
                    "event_failed"
                ),
            }
        }

        tracing::info!(target: "moderation", "moderation_loop_stopped");
    }

    pub async fn handle(&self, event: CommunityEvent) -> Result<EventOutcome, LedgerError> {
        self.handle_at(event, OffsetDateTime::now_utc()).await
    }

    pub async fn handle_at(
        &self,
        event: CommunityEvent,
        now: OffsetDateTime,
    ) -> Result<EventOutcome, LedgerError> {
        match event {
            CommunityEvent::MessagePosted {
                community_id,
                channel_id,
                message_id,
                member_id,
                author_is_bot,
                content,
            } => {
                if author_is_bot {
                    return Ok(EventOutcome::Ignored);
                }
                let Some(excerpt) = self.matcher.find(&content) else {
                    return Ok(EventOutcome::Ignored);
                };
                let message = MessageRef {
                    identity: Identity::new(community_id, member_id),
                    channel_id,
                    message_id,
                };
                self.handle_violation(message, excerpt, now).await
            }
            CommunityEvent::AdminAdjust {
                community_id,
                channel_id,
                member_id,
                actor_id,
                actor_is_admin,
                adjustment,
            } => {
                if !actor_is_admin {
                    let identity = Identity::new(community_id, member_id);
                    tracing::info!(
                        target: "moderation",
                        identity = %identity,
                        actor_id,
                        operation = adjustment.key(),
                        "adjustment_denied"
                    );
                    return Ok(self
                        .reject(
                            channel_target(identity, channel_id),
                            actor_id,
                            ACCESS_DENIED.to_string(),
                        )
                        .await);
                }
                self.handle_adjustment(
                    Identity::new(community_id, member_id),
                    channel_id,
                    actor_id,
                    adjustment,
                    now,
                )
                .await
            }
            CommunityEvent::CheckStanding {
                community_id,
                channel_id,
                member_id,
            } => {
                let identity = Identity::new(community_id, member_id);
                let standing = self.orchestrator.standing(identity).await;
                let (restricted_until, held_rank_role) = match self.observe(identity).await {
                    Some(observation) => (
                        observation
                            .restricted_until
                            .filter(|until| is_active(Some(*until), now)),
                        self.orchestrator
                            .engine()
                            .ranks()
                            .highest_held(&observation.roles)
                            .and_then(|entry| entry.role_label.clone()),
                    ),
                    None => (None, None),
                };
                self.announce(
                    channel_target(identity, channel_id),
                    Notice::StandingReport {
                        identity,
                        standing,
                        restricted_until,
                        held_rank_role,
                    },
                )
                .await;
                Ok(EventOutcome::Reported)
            }
            CommunityEvent::Leaderboard {
                community_id,
                channel_id,
                top_n,
                ..
            } => {
                let entries = self.orchestrator.leaderboard(community_id, top_n).await;
                self.announce(
                    NoticeTarget::Channel {
                        community_id,
                        channel_id,
                    },
                    Notice::LeaderboardReport {
                        community_id,
                        entries,
                    },
                )
                .await;
                Ok(EventOutcome::Reported)
            }
            CommunityEvent::Violators {
                community_id,
                channel_id,
                top_n,
                ..
            } => {
                let entries = self.orchestrator.violators(community_id, top_n).await;
                self.announce(
                    NoticeTarget::Channel {
                        community_id,
                        channel_id,
                    },
                    Notice::ViolatorReport {
                        community_id,
                        entries,
                    },
                )
                .await;
                Ok(EventOutcome::Reported)
            }
        }
    }

    async fn handle_violation(
        &self,
        message: MessageRef,
        excerpt: String,
        now: OffsetDateTime,
    ) -> Result<EventOutcome, LedgerError> {
        let identity = message.identity;
        let channel = channel_target(identity, message.channel_id);
        tracing::info!(
            target: "moderation",
            identity = %identity,
            channel_id = message.channel_id,
            message_id = message.message_id,
            excerpt = %excerpt,
            "forbidden_content_detected"
        );

        if let Err(err) = self.platform.remove_message(message).await {
            tracing::warn!(
                target: "moderation",
                identity = %identity,
                message_id = message.message_id,
                error = %err,
                "message_removal_failed"
            );
        }

        let violations = match self
            .orchestrator
            .record_violation(identity, self.penalty.unsigned_abs())
            .await
        {
            Ok(stats) => Some(stats),
            Err(err) => {
                tracing::warn!(
                    target: "moderation",
                    identity = %identity,
                    error = %err,
                    "violation_record_failed"
                );
                None
            }
        };

        let observation = self.observe(identity).await;
        let outcome = self
            .orchestrator
            .penalize(
                identity,
                self.penalty,
                observation.as_ref().unwrap_or(&MemberObservation::default()),
                now,
            )
            .await?;

        let notice = Notice::ViolationIntercepted {
            identity,
            excerpt: excerpt.clone(),
            penalty: self.penalty,
            new_credits: outcome.change.new_credits,
        };
        self.announce(channel, notice.clone()).await;
        let application = self
            .synchronize(identity, channel, &outcome, observation.is_some())
            .await;
        self.announce(NoticeTarget::Direct(identity), notice).await;

        Ok(EventOutcome::Violation {
            excerpt,
            violations,
            update: MemberUpdate {
                outcome,
                application,
            },
        })
    }

    async fn handle_adjustment(
        &self,
        identity: Identity,
        channel_id: ChannelId,
        actor_id: MemberId,
        adjustment: CreditAdjustment,
        now: OffsetDateTime,
    ) -> Result<EventOutcome, LedgerError> {
        let channel = channel_target(identity, channel_id);
        if let Err(err) = adjustment.validate() {
            tracing::info!(
                target: "moderation",
                identity = %identity,
                actor_id,
                operation = adjustment.key(),
                amount = err.amount,
                "adjustment_rejected"
            );
            return Ok(self.reject(channel, actor_id, err.message).await);
        }

        let observation = self.observe(identity).await;
        let outcome = self
            .orchestrator
            .adjust(
                identity,
                adjustment,
                observation.as_ref().unwrap_or(&MemberObservation::default()),
                now,
            )
            .await?;
        tracing::info!(
            target: "moderation",
            identity = %identity,
            actor_id,
            operation = adjustment.key(),
            amount = adjustment.amount(),
            old_credits = outcome.change.old_credits,
            new_credits = outcome.change.new_credits,
            "credits_adjusted"
        );

        let notice = Notice::CreditsAdjusted {
            identity,
            actor_id,
            operation: adjustment.key(),
            amount: adjustment.amount(),
            new_credits: outcome.change.new_credits,
            rank: outcome.rank.display(),
        };
        self.announce(channel, notice.clone()).await;
        let application = self
            .synchronize(identity, channel, &outcome, observation.is_some())
            .await;
        self.announce(NoticeTarget::Direct(identity), notice).await;

        Ok(EventOutcome::Adjusted(MemberUpdate {
            outcome,
            application,
        }))
    }

    async fn observe(&self, identity: Identity) -> Option<MemberObservation> {
        let call_timeout = self.applier.config().call_timeout;
        let observed = match timeout(call_timeout, observe_member(self.platform.as_ref(), identity))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(transient(format!(
                "member observation timed out after {}ms",
                call_timeout.as_millis()
            ))),
        };

        observed
            .map_err(|err: PlatformError| {
                tracing::warn!(
                    target: "moderation",
                    identity = %identity,
                    kind = ?err.kind,
                    error = %err,
                    "member_observation_failed"
                );
            })
            .ok()
    }

    async fn synchronize(
        &self,
        identity: Identity,
        channel: NoticeTarget,
        outcome: &CreditOutcome,
        observed: bool,
    ) -> Option<PlanApplication> {
        if !observed {
            return None;
        }

        let credits = outcome.change.new_credits;
        let application = self.applier.apply(identity, credits, &outcome.plan).await;
        let rank_role = outcome.rank.role_label.clone();

        if application.restriction.is_applied() {
            match &outcome.plan.restriction {
                RestrictionDirective::Apply { duration, .. }
                | RestrictionDirective::Extend { duration, .. } => {
                    let notice = Notice::RestrictionApplied {
                        identity,
                        credits,
                        minutes: duration.whole_minutes(),
                        extended: matches!(
                            outcome.plan.restriction,
                            RestrictionDirective::Extend { .. }
                        ),
                        rank_role,
                    };
                    self.announce(channel, notice.clone()).await;
                    self.announce(NoticeTarget::Direct(identity), notice).await;
                }
                RestrictionDirective::Lift => {
                    self.announce(
                        channel,
                        Notice::RestrictionLifted {
                            identity,
                            credits,
                            rank_role,
                        },
                    )
                    .await;
                }
                RestrictionDirective::None => {}
            }
        }

        for (step, err) in application.failures() {
            let message = format!("{step}: {err}");
            let notice = match err.kind {
                PlatformErrorKind::RoleMissing => Notice::ConfigurationProblem { identity, message },
                PlatformErrorKind::Permission => Notice::PermissionProblem { identity, message },
                PlatformErrorKind::NotFound | PlatformErrorKind::Transient => continue,
            };
            self.announce(channel, notice).await;
        }

        Some(application)
    }

    async fn reject(
        &self,
        channel: NoticeTarget,
        actor_id: MemberId,
        message: String,
    ) -> EventOutcome {
        self.announce(
            channel,
            Notice::CommandRejected {
                actor_id,
                message: message.clone(),
            },
        )
        .await;
        EventOutcome::Rejected { message }
    }

    async fn announce(&self, target: NoticeTarget, notice: Notice) {
        if let Err(err) = self.platform.notify(target, notice).await {
            tracing::warn!(
                target: "moderation",
                notice_target = ?target,
                error = %err,
                "notice_delivery_failed"
            );
        }
    }
}

fn channel_target(identity: Identity, channel_id: ChannelId) -> NoticeTarget {
    NoticeTarget::Channel {
        community_id: identity.community_id,
        channel_id,
    }
}
