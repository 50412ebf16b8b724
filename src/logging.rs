use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result, anyhow};
use tracing::Subscriber;
use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling::{self, RollingFileAppender},
};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, registry::LookupSpan,
    util::SubscriberInitExt,
};
use uuid::Uuid;

use crate::config::{LoggingConfig, LoggingRotation};

const LOG_FILE_PREFIX: &str = "social-credit.log";
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Keeps the non-blocking writer alive; dropping it flushes pending lines.
pub struct LoggingGuard {
    _worker_guard: WorkerGuard,
    run_id: String,
    log_dir: PathBuf,
}

impl LoggingGuard {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

pub fn init_tracing(logging_config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_dir = prepare_log_dir(logging_config)?;
    let sweep = RetentionSweep::new(LOG_FILE_PREFIX, logging_config.retention_days)
        .run(&log_dir, SystemTime::now());

    let (writer, worker_guard) =
        tracing_appender::non_blocking(rolling_appender(&log_dir, &logging_config.rotation));
    let file_layer = json_file_layer(writer, build_env_filter(&logging_config.filter)?);
    let stderr_layer = logging_config.stderr_warn_enabled.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    let run_id = Uuid::now_v7().to_string();
    tracing::info!(
        target: "logging",
        run_id = %run_id,
        dir = %log_dir.display(),
        filter = %logging_config.filter,
        rotation = ?logging_config.rotation,
        retention_days = logging_config.retention_days,
        expired_files_removed = sweep.removed.len(),
        "logging_initialized"
    );
    for warning in &sweep.warnings {
        tracing::warn!(target: "logging", warning = %warning, "logging_retention_warning");
    }

    Ok(LoggingGuard {
        _worker_guard: worker_guard,
        run_id,
        log_dir,
    })
}

fn prepare_log_dir(logging_config: &LoggingConfig) -> Result<PathBuf> {
    if logging_config.filter.trim().is_empty() {
        return Err(anyhow!("logging.filter cannot be empty"));
    }
    if logging_config.dir.as_os_str().is_empty() {
        return Err(anyhow!("logging.dir cannot be empty"));
    }

    let log_dir = if logging_config.dir.is_absolute() {
        logging_config.dir.clone()
    } else {
        std::env::current_dir()
            .context("failed to read current working directory for logging.dir resolution")?
            .join(&logging_config.dir)
    };
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create logging directory {}", log_dir.display()))?;
    Ok(log_dir)
}

/// One JSON object per line with RFC 3339 UTC timestamps and the span chain,
/// so moderation and ledger events can be correlated per event.
fn json_file_layer<S>(writer: NonBlocking, filter: EnvFilter) -> impl Layer<S> + Send + Sync
where
    S: Subscriber + for<'span> LookupSpan<'span> + 'static,
{
    fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter)
}

fn build_env_filter(filter: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(filter).with_context(|| format!("failed to parse logging.filter '{filter}'"))
}

fn rolling_appender(log_dir: &Path, rotation: &LoggingRotation) -> RollingFileAppender {
    match rotation {
        LoggingRotation::Daily => rolling::daily(log_dir, LOG_FILE_PREFIX),
        LoggingRotation::Hourly => rolling::hourly(log_dir, LOG_FILE_PREFIX),
    }
}

#[derive(Debug, Default)]
struct SweepReport {
    removed: Vec<PathBuf>,
    warnings: Vec<String>,
}

/// Deletes rotated log files older than the retention window. Problems are
/// collected, not returned: the subscriber is not up yet when the sweep runs.
#[derive(Debug, Clone, Copy)]
struct RetentionSweep<'a> {
    prefix: &'a str,
    retention: Duration,
}

impl<'a> RetentionSweep<'a> {
    fn new(prefix: &'a str, retention_days: usize) -> Self {
        let days = u64::try_from(retention_days).unwrap_or(u64::MAX);
        Self {
            prefix,
            retention: Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY)),
        }
    }

    fn cutoff(&self, now: SystemTime) -> SystemTime {
        now.checked_sub(self.retention)
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }

    fn run(&self, log_dir: &Path, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();
        let entries = match fs::read_dir(log_dir) {
            Ok(entries) => entries,
            Err(err) => {
                report.warnings.push(format!(
                    "failed to scan logging directory {}: {err}",
                    log_dir.display()
                ));
                return report;
            }
        };

        let cutoff = self.cutoff(now);
        for entry in entries {
            match entry {
                Ok(entry) if entry.file_name().to_string_lossy().starts_with(self.prefix) => {
                    self.visit(&entry.path(), cutoff, &mut report);
                }
                Ok(_) => {}
                Err(err) => report
                    .warnings
                    .push(format!("failed to iterate logging directory entries: {err}")),
            }
        }
        report
    }

    fn visit(&self, path: &Path, cutoff: SystemTime, report: &mut SweepReport) {
        let modified = match fs::metadata(path) {
            Ok(metadata) if !metadata.is_file() => return,
            Ok(metadata) => metadata.modified(),
            Err(err) => Err(err),
        };
        match modified {
            Ok(modified) if modified > cutoff => {}
            Ok(_) => match fs::remove_file(path) {
                Ok(()) => report.removed.push(path.to_path_buf()),
                Err(err) => report.warnings.push(format!(
                    "failed to remove expired log file {}: {err}",
                    path.display()
                )),
            },
            Err(err) => report
                .warnings
                .push(format!("failed to stat {}: {err}", path.display())),
        }
    }
}
