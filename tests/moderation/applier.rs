use std::{collections::BTreeSet, sync::Arc, time::Duration};

use async_trait::async_trait;
use social_credit::{
    platform::{
        ApplyConfig, InMemoryPlatform, Notice, NoticeTarget, PlanApplier, PlatformErrorKind,
        PlatformOperation, PlatformPort, StepOutcome,
        error::{PlatformError, not_found, permission_denied, transient},
    },
    reconcile::ReconciliationPlan,
    restriction::RestrictionDirective,
    types::{Identity, MessageRef},
};
use time::OffsetDateTime;

fn member() -> Identity {
    Identity::new(1, 2)
}

fn quick_config() -> ApplyConfig {
    ApplyConfig {
        call_timeout: Duration::from_millis(200),
        transient_retries: 2,
        retry_backoff: Duration::from_millis(1),
    }
}

fn rank_swap_plan() -> ReconciliationPlan {
    ReconciliationPlan {
        roles_to_remove: BTreeSet::from(["Ordinary Citizen".to_string()]),
        role_to_add: Some("Suspicious Citizen".to_string()),
        restriction: RestrictionDirective::Lift,
        rank_label: "Suspicious Citizen".to_string(),
        rank_changed: true,
    }
}

fn applier_over(platform: &Arc<InMemoryPlatform>, config: ApplyConfig) -> PlanApplier {
    let port: Arc<dyn PlatformPort> = platform.clone();
    PlanApplier::new(port, config)
}

#[tokio::test]
async fn given_transient_failure_when_applying_then_step_is_retried_and_succeeds() {
    let platform = Arc::new(InMemoryPlatform::new());
    platform.set_member(member(), ["Ordinary Citizen"], None);
    platform.fail_next(PlatformOperation::AddRole, transient("rate limited"));

    let application = applier_over(&platform, quick_config())
        .apply(member(), 0, &rank_swap_plan())
        .await;

    assert!(application.fully_applied());
    assert_eq!(platform.calls(PlatformOperation::AddRole), 2);
    assert!(platform.roles_of(member()).contains("Suspicious Citizen"));
}

#[tokio::test]
async fn given_persistent_transient_failure_when_applying_then_retries_are_bounded() {
    let platform = Arc::new(InMemoryPlatform::new());
    for _ in 0..5 {
        platform.fail_next(PlatformOperation::RemoveRoles, transient("gateway down"));
    }

    let application = applier_over(&platform, quick_config())
        .apply(member(), 0, &rank_swap_plan())
        .await;

    assert_eq!(platform.calls(PlatformOperation::RemoveRoles), 3);
    let failures: Vec<_> = application.failures().map(|(step, _)| step).collect();
    assert_eq!(failures, vec!["remove_roles"]);
    assert!(application.role_added.is_applied());
    assert!(application.restriction.is_applied());
}

#[tokio::test]
async fn given_permanent_failures_when_applying_then_no_retry_and_other_steps_proceed() {
    let platform = Arc::new(InMemoryPlatform::new());
    platform.fail_next(
        PlatformOperation::SetRestriction,
        permission_denied("cannot moderate an administrator"),
    );
    platform.fail_next(PlatformOperation::RemoveRoles, not_found("member left"));

    let application = applier_over(&platform, quick_config())
        .apply(member(), 0, &rank_swap_plan())
        .await;

    assert_eq!(platform.calls(PlatformOperation::SetRestriction), 1);
    assert_eq!(platform.calls(PlatformOperation::RemoveRoles), 1);
    assert_eq!(
        application
            .restriction
            .error()
            .map(|err| err.kind),
        Some(PlatformErrorKind::Permission)
    );
    assert_eq!(
        application.roles_removed.error().map(|err| err.kind),
        Some(PlatformErrorKind::NotFound)
    );
    assert!(application.role_added.is_applied());
}

#[tokio::test]
async fn given_noop_plan_when_applying_then_platform_is_not_called() {
    let platform = Arc::new(InMemoryPlatform::new());
    let plan = ReconciliationPlan {
        roles_to_remove: BTreeSet::new(),
        role_to_add: None,
        restriction: RestrictionDirective::None,
        rank_label: "Ordinary Citizen".to_string(),
        rank_changed: false,
    };
    assert!(plan.is_noop());

    let application = applier_over(&platform, quick_config())
        .apply(member(), 1_000, &plan)
        .await;

    assert_eq!(application.roles_removed, StepOutcome::Skipped);
    assert_eq!(application.role_added, StepOutcome::Skipped);
    assert_eq!(application.restriction, StepOutcome::Skipped);
    for operation in [
        PlatformOperation::RemoveRoles,
        PlatformOperation::AddRole,
        PlatformOperation::SetRestriction,
    ] {
        assert_eq!(platform.calls(operation), 0);
    }
}

#[test]
fn given_backoff_base_when_attempts_grow_then_delay_doubles_up_to_cap() {
    let platform = Arc::new(InMemoryPlatform::new());
    let applier = applier_over(
        &platform,
        ApplyConfig {
            retry_backoff: Duration::from_millis(250),
            ..ApplyConfig::default()
        },
    );

    assert_eq!(applier.backoff_delay(0), Duration::from_millis(250));
    assert_eq!(applier.backoff_delay(1), Duration::from_millis(500));
    assert_eq!(applier.backoff_delay(4), Duration::from_millis(4_000));
    assert_eq!(applier.backoff_delay(9), Duration::from_millis(4_000));
    assert_eq!(applier.backoff_delay(64), Duration::from_millis(4_000));
}

/// Platform whose role additions never finish.
struct StalledPlatform;

#[async_trait]
impl PlatformPort for StalledPlatform {
    async fn current_roles(&self, _identity: Identity) -> Result<BTreeSet<String>, PlatformError> {
        Ok(BTreeSet::new())
    }

    async fn restriction_end(
        &self,
        _identity: Identity,
    ) -> Result<Option<OffsetDateTime>, PlatformError> {
        Ok(None)
    }

    async fn remove_roles(
        &self,
        _identity: Identity,
        _roles: &BTreeSet<String>,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn add_role(
        &self,
        _identity: Identity,
        _role: &str,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }

    async fn set_restriction(
        &self,
        _identity: Identity,
        _until: Option<OffsetDateTime>,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn remove_message(&self, _message: MessageRef) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn notify(&self, _target: NoticeTarget, _notice: Notice) -> Result<(), PlatformError> {
        Ok(())
    }
}

#[tokio::test]
async fn given_hung_platform_call_when_applying_then_step_times_out_as_transient() {
    let applier = PlanApplier::new(
        Arc::new(StalledPlatform),
        ApplyConfig {
            call_timeout: Duration::from_millis(20),
            transient_retries: 0,
            retry_backoff: Duration::from_millis(1),
        },
    );

    let application = applier.apply(member(), 0, &rank_swap_plan()).await;

    let err = application
        .role_added
        .error()
        .expect("hung call should fail");
    assert_eq!(err.kind, PlatformErrorKind::Transient);
    assert!(err.message.contains("timed out"));
    assert!(application.roles_removed.is_applied());
    assert!(application.restriction.is_applied());
}
