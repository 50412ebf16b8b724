use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration as StdDuration,
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::Duration;

use crate::{
    platform::ApplyConfig,
    ranks::{RankEntry, RankTable, RankTableError, RankThreshold},
    restriction::RestrictionPolicy,
    types::{Credits, DEFAULT_CREDITS, FORBIDDEN_CONTENT_PENALTY},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub credits: CreditsConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
    #[serde(default)]
    pub restriction: RestrictionConfig,
    #[serde(default = "default_ranks")]
    pub ranks: Vec<RankConfig>,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub ingress: IngressConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            storage: StorageConfig::default(),
            credits: CreditsConfig::default(),
            moderation: ModerationConfig::default(),
            restriction: RestrictionConfig::default(),
            ranks: default_ranks(),
            platform: PlatformConfig::default(),
            ingress: IngressConfig::default(),
        }
    }
}

fn default_enabled_true() -> bool {
    true
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

fn default_credits_path() -> PathBuf {
    PathBuf::from("./social_credits.json")
}

fn default_violations_path() -> PathBuf {
    PathBuf::from("./forbidden_word_stats.json")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_credits_path")]
    pub credits_path: PathBuf,
    #[serde(default = "default_violations_path")]
    pub violations_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            credits_path: default_credits_path(),
            violations_path: default_violations_path(),
        }
    }
}

fn default_credits() -> Credits {
    DEFAULT_CREDITS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditsConfig {
    #[serde(default = "default_credits")]
    pub default_credits: Credits,
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self {
            default_credits: default_credits(),
        }
    }
}

fn default_forbidden_patterns() -> Vec<String> {
    vec!["examplebadword1".to_string(), "examplebadword2".to_string()]
}

fn default_penalty() -> Credits {
    FORBIDDEN_CONTENT_PENALTY
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    #[serde(default = "default_forbidden_patterns")]
    pub forbidden_patterns: Vec<String>,
    #[serde(default = "default_penalty")]
    pub penalty: Credits,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            forbidden_patterns: default_forbidden_patterns(),
            penalty: default_penalty(),
        }
    }
}

fn default_credits_per_unit() -> Credits {
    1_000
}

fn default_minutes_per_unit() -> i64 {
    10
}

fn default_max_days() -> i64 {
    28
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestrictionConfig {
    #[serde(default = "default_credits_per_unit")]
    pub credits_per_unit: Credits,
    #[serde(default = "default_minutes_per_unit")]
    pub minutes_per_unit: i64,
    #[serde(default = "default_max_days")]
    pub max_days: i64,
}

impl Default for RestrictionConfig {
    fn default() -> Self {
        Self {
            credits_per_unit: default_credits_per_unit(),
            minutes_per_unit: default_minutes_per_unit(),
            max_days: default_max_days(),
        }
    }
}

/// One rank as written in the config file; a `null` threshold marks the floor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankConfig {
    pub threshold: Option<Credits>,
    pub label: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl From<&RankEntry> for RankConfig {
    fn from(entry: &RankEntry) -> Self {
        Self {
            threshold: match entry.threshold {
                RankThreshold::Floor => None,
                RankThreshold::AtLeast(threshold) => Some(threshold),
            },
            label: entry.label.clone(),
            icon: entry.icon.clone(),
            role: entry.role_label.clone(),
        }
    }
}

impl RankConfig {
    fn to_entry(&self) -> RankEntry {
        let threshold = self
            .threshold
            .map_or(RankThreshold::Floor, RankThreshold::AtLeast);
        RankEntry::new(threshold, &self.label, &self.icon, self.role.as_deref())
    }
}

fn default_ranks() -> Vec<RankConfig> {
    RankTable::standard().entries().map(RankConfig::from).collect()
}

fn default_call_timeout_ms() -> u64 {
    10_000
}

fn default_transient_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    250
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    #[serde(default = "default_transient_retries")]
    pub transient_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: default_call_timeout_ms(),
            transient_retries: default_transient_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_queue_capacity() -> usize {
    64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngressConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema_path = resolve_schema_path(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema_path)?;

        let mut config: Config =
            serde_json::from_value(config_value).context("failed to deserialize config")?;

        for path in [
            &mut config.storage.credits_path,
            &mut config.storage.violations_path,
        ] {
            if !path.is_absolute() {
                *path = config_base.join(&*path);
            }
        }
        config
            .rank_table()
            .with_context(|| format!("invalid ranks in {}", config_path.display()))?;
        config
            .restriction_policy()
            .with_context(|| format!("invalid restriction in {}", config_path.display()))?;

        Ok(config)
    }

    pub fn rank_table(&self) -> Result<RankTable, RankTableError> {
        RankTable::new(self.ranks.iter().map(RankConfig::to_entry).collect())
    }

    pub fn restriction_policy(&self) -> Result<RestrictionPolicy> {
        let duration_per_unit = checked_duration(self.restriction.minutes_per_unit, 60)
            .context("restriction.minutes_per_unit is out of range")?;
        let max_duration = checked_duration(self.restriction.max_days, 86_400)
            .context("restriction.max_days is out of range")?;
        Ok(RestrictionPolicy::new(
            self.restriction.credits_per_unit,
            duration_per_unit,
            max_duration,
        ))
    }

    pub fn apply_config(&self) -> ApplyConfig {
        ApplyConfig {
            call_timeout: StdDuration::from_millis(self.platform.call_timeout_ms),
            transient_retries: self.platform.transient_retries,
            retry_backoff: StdDuration::from_millis(self.platform.retry_backoff_ms),
        }
    }
}

fn checked_duration(count: i64, seconds_per_count: i64) -> Result<Duration> {
    count
        .checked_mul(seconds_per_count)
        .map(Duration::seconds)
        .ok_or_else(|| anyhow!("{count} overflows a duration"))
}

fn resolve_schema_path(config_base: &Path, config_value: &Value) -> Result<PathBuf> {
    if let Some(path_text) = config_value.get("$schema").and_then(|value| value.as_str()) {
        let configured = PathBuf::from(path_text);
        if configured.is_absolute() {
            return Ok(configured);
        }
        return Ok(config_base.join(&configured));
    }

    let local_default = config_base.join("social-credit.schema.json");
    if local_default.exists() {
        return Ok(local_default);
    }

    Err(anyhow!(
        "unable to resolve schema path: expected $schema in config or social-credit.schema.json"
    ))
}

fn validate_against_schema(config_value: &Value, schema_path: &Path) -> Result<()> {
    let schema_content = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    let schema: Value = serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))?;

    let compiled =
        JSONSchema::compile(&schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    match compiled.validate(config_value) {
        Ok(()) => Ok(()),
        Err(errors_iter) => {
            let validation_errors: Vec<ValidationError> = errors_iter.collect();
            let messages: Vec<String> = validation_errors
                .into_iter()
                .map(|error| error.to_string())
                .collect();
            Err(anyhow!("config validation failed: {}", messages.join("; ")))
        }
    }
}
