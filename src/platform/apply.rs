use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::{sleep, timeout};

use crate::{
    platform::{
        error::{PlatformError, transient},
        ports::PlatformPort,
    },
    reconcile::ReconciliationPlan,
    restriction::RestrictionDirective,
    types::{Credits, Identity},
};

const MAX_BACKOFF_FACTOR: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyConfig {
    pub call_timeout: Duration,
    pub transient_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_millis(10_000),
            transient_retries: 2,
            retry_backoff: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Skipped,
    Applied,
    Failed(PlatformError),
}

impl StepOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, StepOutcome::Applied)
    }

    pub fn error(&self) -> Option<&PlatformError> {
        match self {
            StepOutcome::Failed(err) => Some(err),
            StepOutcome::Skipped | StepOutcome::Applied => None,
        }
    }
}

/// Per-step result of applying a plan. Steps are independent; a failure in one
/// does not stop the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanApplication {
    pub roles_removed: StepOutcome,
    pub role_added: StepOutcome,
    pub restriction: StepOutcome,
}

impl PlanApplication {
    pub fn failures(&self) -> impl Iterator<Item = (&'static str, &PlatformError)> {
        [
            ("remove_roles", &self.roles_removed),
            ("add_role", &self.role_added),
            ("set_restriction", &self.restriction),
        ]
        .into_iter()
        .filter_map(|(step, outcome)| outcome.error().map(|err| (step, err)))
    }

    pub fn fully_applied(&self) -> bool {
        self.failures().next().is_none()
    }
}

#[derive(Clone)]
pub struct PlanApplier {
    platform: Arc<dyn PlatformPort>,
    config: ApplyConfig,
}

impl PlanApplier {
    pub fn new(platform: Arc<dyn PlatformPort>, config: ApplyConfig) -> Self {
        Self { platform, config }
    }

    pub fn config(&self) -> &ApplyConfig {
        &self.config
    }

    pub async fn apply(
        &self,
        identity: Identity,
        credits: Credits,
        plan: &ReconciliationPlan,
    ) -> PlanApplication {
        let platform = self.platform.as_ref();

        let roles_removed = if plan.roles_to_remove.is_empty() {
            StepOutcome::Skipped
        } else {
            let roles = &plan.roles_to_remove;
            self.run_step("remove_roles", identity, move || {
                platform.remove_roles(identity, roles, "Social rank updated")
            })
            .await
        };

        let role_added = match plan.role_to_add.as_deref() {
            None => StepOutcome::Skipped,
            Some(role) => {
                let reason = format!("New social rank: {role}");
                let reason = reason.as_str();
                self.run_step("add_role", identity, move || {
                    platform.add_role(identity, role, reason)
                })
                .await
            }
        };

        let restriction = match plan.restriction.target_until() {
            None => StepOutcome::Skipped,
            Some(until) => {
                let reason = restriction_reason(&plan.restriction, credits);
                let reason = reason.as_str();
                self.run_step("set_restriction", identity, move || {
                    platform.set_restriction(identity, until, reason)
                })
                .await
            }
        };

        let application = PlanApplication {
            roles_removed,
            role_added,
            restriction,
        };
        tracing::debug!(
            target: "platform",
            identity = %identity,
            credits,
            fully_applied = application.fully_applied(),
            "plan_applied"
        );
        application
    }

    async fn run_step<F, Fut>(
        &self,
        step: &'static str,
        identity: Identity,
        mut call: F,
    ) -> StepOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), PlatformError>>,
    {
        let mut attempt = 0u32;
        loop {
            let err = match timeout(self.config.call_timeout, call()).await {
                Ok(Ok(())) => return StepOutcome::Applied,
                Ok(Err(err)) => err,
                Err(_) => transient(format!(
                    "{step} timed out after {}ms",
                    self.config.call_timeout.as_millis()
                )),
            };

            if err.retryable() && attempt < self.config.transient_retries {
                let delay = self.backoff_delay(attempt);
                tracing::debug!(
                    target: "platform",
                    identity = %identity,
                    step,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "platform_step_retrying"
                );
                attempt += 1;
                sleep(delay).await;
                continue;
            }

            tracing::warn!(
                target: "platform",
                identity = %identity,
                step,
                attempt,
                kind = ?err.kind,
                error = %err,
                "platform_step_failed"
            );
            return StepOutcome::Failed(err);
        }
    }

    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt)
            .unwrap_or(MAX_BACKOFF_FACTOR)
            .min(MAX_BACKOFF_FACTOR);
        self.config.retry_backoff.saturating_mul(factor)
    }
}

fn restriction_reason(directive: &RestrictionDirective, credits: Credits) -> String {
    match directive {
        RestrictionDirective::Lift => "Social credit restored, restriction lifted.".to_string(),
        RestrictionDirective::Apply { .. } => {
            format!("Negative social credit ({credits}). Restriction applied.")
        }
        RestrictionDirective::Extend { .. } => {
            format!("Worsening social credit ({credits}). Restriction extended.")
        }
        RestrictionDirective::None => String::new(),
    }
}
