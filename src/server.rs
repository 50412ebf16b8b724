use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    signal::unix::{SignalKind, signal},
    sync::mpsc,
};

use crate::{
    config::Config,
    credits::CreditOrchestrator,
    ingress::EventIngress,
    ledger::{CreditBook, JsonDocument, ViolationBook},
    logging::init_tracing,
    moderation::{CommunityEvent, ModerationService, PatternMatcher},
    platform::{InMemoryPlatform, PlanApplier, PlatformPort},
    reconcile::ReconciliationEngine,
};

enum ExitReason {
    InputClosed,
    Signal(&'static str),
}

impl ExitReason {
    fn label(&self) -> &'static str {
        match self {
            ExitReason::InputClosed => "input_closed",
            ExitReason::Signal(signal_name) => *signal_name,
        }
    }
}

/// Runs the moderation loop, reading community events as NDJSON from stdin
/// until EOF or SIGINT/SIGTERM.
pub async fn run(config: Config) -> Result<()> {
    let logging = init_tracing(&config.logging)?;

    let ranks = Arc::new(config.rank_table().context("invalid rank table")?);
    let policy = config
        .restriction_policy()
        .context("invalid restriction policy")?;
    let engine = ReconciliationEngine::new(Arc::clone(&ranks), policy);
    let credits = CreditBook::open(JsonDocument::new(&config.storage.credits_path))
        .with_context(|| {
            format!(
                "failed to open credits store {}",
                config.storage.credits_path.display()
            )
        })?;
    let violations = ViolationBook::open(JsonDocument::new(&config.storage.violations_path))
        .with_context(|| {
            format!(
                "failed to open violations store {}",
                config.storage.violations_path.display()
            )
        })?;
    let orchestrator = Arc::new(CreditOrchestrator::new(
        Box::new(credits),
        Box::new(violations),
        engine,
        config.credits.default_credits,
    ));
    let matcher = PatternMatcher::new(&config.moderation.forbidden_patterns)
        .context("invalid moderation.forbidden_patterns")?;

    let platform: Arc<dyn PlatformPort> = Arc::new(
        InMemoryPlatform::with_known_roles(ranks.role_labels()).with_history_limit(0),
    );
    let applier = PlanApplier::new(Arc::clone(&platform), config.apply_config());
    let service = ModerationService::new(
        orchestrator,
        platform,
        Arc::new(matcher),
        applier,
        config.moderation.penalty,
    );

    let (inbound_tx, inbound_rx) = mpsc::channel(config.ingress.queue_capacity.max(1));
    let ingress = EventIngress::new(inbound_tx);
    let service_task = tokio::spawn(service.run(inbound_rx));

    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;

    tracing::info!(
        target: "server",
        run_id = logging.run_id(),
        log_dir = %logging.log_dir().display(),
        credits_path = %config.storage.credits_path.display(),
        violations_path = %config.storage.violations_path.display(),
        "social_credit_started"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let exit_reason = loop {
        tokio::select! {
            _ = sigint.recv() => break ExitReason::Signal("SIGINT"),
            _ = sigterm.recv() => break ExitReason::Signal("SIGTERM"),
            line = lines.next_line() => match line {
                Ok(Some(line)) => forward_line(&ingress, &line).await,
                Ok(None) => break ExitReason::InputClosed,
                Err(err) => {
                    tracing::warn!(target: "server", error = %err, "event_input_failed");
                    break ExitReason::InputClosed;
                }
            },
        }
    };

    tracing::info!(target: "server", reason = exit_reason.label(), "closing_event_ingress");
    ingress
        .shutdown()
        .await
        .context("failed to enqueue shutdown marker")?;
    service_task
        .await
        .context("moderation task join failed")?;

    tracing::info!(
        target: "server",
        run_id = logging.run_id(),
        reason = exit_reason.label(),
        "social_credit_stopped"
    );
    Ok(())
}

async fn forward_line(ingress: &EventIngress, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    match parse_event(line) {
        Ok(event) => {
            if let Err(err) = ingress.send(event).await {
                tracing::warn!(target: "server", error = %err, "event_dropped");
            }
        }
        Err(err) => {
            tracing::warn!(target: "server", error = %format!("{err:#}"), "ignoring_invalid_event");
        }
    }
}

pub fn parse_event(line: &str) -> Result<CommunityEvent> {
    serde_json::from_str(line).context("invalid community event")
}
