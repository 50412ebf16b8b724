use time::{Duration, OffsetDateTime};

use crate::types::Credits;

/// Longest restriction the platform accepts.
pub const PLATFORM_MAX_RESTRICTION: Duration = Duration::days(28);

const DEFAULT_CREDITS_PER_UNIT: Credits = 1_000;
const DEFAULT_DURATION_PER_UNIT: Duration = Duration::minutes(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictionDirective {
    None,
    Lift,
    Apply {
        until: OffsetDateTime,
        duration: Duration,
    },
    Extend {
        until: OffsetDateTime,
        duration: Duration,
    },
}

impl RestrictionDirective {
    pub fn is_none(&self) -> bool {
        matches!(self, RestrictionDirective::None)
    }

    /// Restriction end to hand to the platform, `None` meaning "clear it".
    pub fn target_until(&self) -> Option<Option<OffsetDateTime>> {
        match self {
            RestrictionDirective::None => None,
            RestrictionDirective::Lift => Some(None),
            RestrictionDirective::Apply { until, .. } | RestrictionDirective::Extend { until, .. } => {
                Some(Some(*until))
            }
        }
    }
}

pub fn is_active(restricted_until: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
    restricted_until.is_some_and(|until| until > now)
}

/// Escalating restriction for negative scores: one unit of duration per full
/// unit of deficit, capped, and never shortened while still active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestrictionPolicy {
    credits_per_unit: Credits,
    duration_per_unit: Duration,
    max_duration: Duration,
}

impl RestrictionPolicy {
    /// Non-positive inputs fall back to the defaults; the ceiling is clamped to the platform limit.
    pub fn new(credits_per_unit: Credits, duration_per_unit: Duration, max_duration: Duration) -> Self {
        let credits_per_unit = if credits_per_unit > 0 {
            credits_per_unit
        } else {
            DEFAULT_CREDITS_PER_UNIT
        };
        let duration_per_unit = if duration_per_unit.is_positive() {
            duration_per_unit
        } else {
            DEFAULT_DURATION_PER_UNIT
        };
        let max_duration = if max_duration.is_positive() {
            max_duration.min(PLATFORM_MAX_RESTRICTION)
        } else {
            PLATFORM_MAX_RESTRICTION
        };

        Self {
            credits_per_unit,
            duration_per_unit,
            max_duration,
        }
    }

    pub fn max_duration(&self) -> Duration {
        self.max_duration
    }

    /// Restriction length implied by `credits`, `None` while less than one full unit in deficit.
    pub fn duration_for(&self, credits: Credits) -> Option<Duration> {
        if credits >= 0 {
            return None;
        }

        let units = credits.unsigned_abs() / self.credits_per_unit.unsigned_abs();
        if units == 0 {
            return None;
        }

        let unit_seconds = self.duration_per_unit.whole_seconds();
        let total_seconds = i64::try_from(units)
            .unwrap_or(i64::MAX)
            .saturating_mul(unit_seconds);
        Some(Duration::seconds(total_seconds).min(self.max_duration))
    }

    pub fn decide(
        &self,
        credits: Credits,
        current_restricted_until: Option<OffsetDateTime>,
        now: OffsetDateTime,
    ) -> RestrictionDirective {
        if credits >= 0 {
            return if is_active(current_restricted_until, now) {
                RestrictionDirective::Lift
            } else {
                RestrictionDirective::None
            };
        }

        let Some(duration) = self.duration_for(credits) else {
            return RestrictionDirective::None;
        };
        let candidate_until = now.saturating_add(duration);

        match current_restricted_until {
            Some(current) if current > now => {
                if candidate_until > current {
                    RestrictionDirective::Extend {
                        until: candidate_until,
                        duration,
                    }
                } else {
                    RestrictionDirective::None
                }
            }
            _ => RestrictionDirective::Apply {
                until: candidate_until,
                duration,
            },
        }
    }
}

impl Default for RestrictionPolicy {
    fn default() -> Self {
        Self {
            credits_per_unit: DEFAULT_CREDITS_PER_UNIT,
            duration_per_unit: DEFAULT_DURATION_PER_UNIT,
            max_duration: PLATFORM_MAX_RESTRICTION,
        }
    }
}
