use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use crate::types::Credits;

/// Lower bound of a rank. `Floor` orders below every `AtLeast`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankThreshold {
    Floor,
    AtLeast(Credits),
}

impl RankThreshold {
    pub fn admits(self, credits: Credits) -> bool {
        match self {
            RankThreshold::Floor => true,
            RankThreshold::AtLeast(threshold) => credits >= threshold,
        }
    }
}

impl fmt::Display for RankThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankThreshold::Floor => write!(f, "-inf"),
            RankThreshold::AtLeast(threshold) => write!(f, "{threshold}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankEntry {
    pub threshold: RankThreshold,
    pub label: String,
    pub icon: String,
    #[serde(default)]
    pub role_label: Option<String>,
}

impl RankEntry {
    pub fn new(
        threshold: RankThreshold,
        label: impl Into<String>,
        icon: impl Into<String>,
        role_label: Option<&str>,
    ) -> Self {
        Self {
            threshold,
            label: label.into(),
            icon: icon.into(),
            role_label: role_label.map(str::to_string),
        }
    }

    pub fn display(&self) -> String {
        format!("{} {}", self.icon, self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankTableError {
    #[error("rank table must contain exactly one floor entry, found {0}")]
    FloorCount(usize),
    #[error("rank threshold {0} is declared more than once")]
    DuplicateThreshold(Credits),
    #[error("rank role '{0}' is assigned to more than one rank")]
    DuplicateRole(String),
    #[error("rank label cannot be empty (threshold {0})")]
    EmptyLabel(RankThreshold),
}

/// Immutable score-to-rank mapping, validated once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankTable {
    floor: RankEntry,
    // strictly increasing `AtLeast` thresholds
    tiers: Vec<RankEntry>,
}

impl RankTable {
    pub fn new(entries: Vec<RankEntry>) -> Result<Self, RankTableError> {
        let mut seen_roles = BTreeSet::new();
        for entry in &entries {
            if entry.label.trim().is_empty() {
                return Err(RankTableError::EmptyLabel(entry.threshold));
            }
            if let Some(role_label) = &entry.role_label
                && !seen_roles.insert(role_label.clone())
            {
                return Err(RankTableError::DuplicateRole(role_label.clone()));
            }
        }

        let (mut floors, mut tiers): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|entry| entry.threshold == RankThreshold::Floor);
        if floors.len() != 1 {
            return Err(RankTableError::FloorCount(floors.len()));
        }
        let Some(floor) = floors.pop() else {
            return Err(RankTableError::FloorCount(0));
        };

        tiers.sort_by_key(|entry| entry.threshold);
        for pair in tiers.windows(2) {
            if let [lower, upper] = pair
                && lower.threshold == upper.threshold
                && let RankThreshold::AtLeast(threshold) = lower.threshold
            {
                return Err(RankTableError::DuplicateThreshold(threshold));
            }
        }

        Ok(Self { floor, tiers })
    }

    pub fn standard() -> Self {
        Self {
            floor: RankEntry::new(
                RankThreshold::Floor,
                "Social Outcast",
                "🚫",
                Some("Social Outcast"),
            ),
            tiers: vec![
                RankEntry::new(
                    RankThreshold::AtLeast(0),
                    "Suspicious Citizen",
                    "❓",
                    Some("Suspicious Citizen"),
                ),
                RankEntry::new(
                    RankThreshold::AtLeast(500),
                    "Ordinary Citizen",
                    "👤",
                    Some("Ordinary Citizen"),
                ),
                RankEntry::new(
                    RankThreshold::AtLeast(1_500),
                    "Model Citizen",
                    "🌟",
                    Some("Model Citizen"),
                ),
                RankEntry::new(
                    RankThreshold::AtLeast(3_000),
                    "Pride of the Party",
                    "🇨🇳",
                    Some("Pride of the Party"),
                ),
                RankEntry::new(
                    RankThreshold::AtLeast(5_000),
                    "Great Helmsman",
                    "👑",
                    Some("Great Helmsman"),
                ),
            ],
        }
    }

    /// Highest rank whose threshold admits `credits`; the floor when nothing else does.
    pub fn classify(&self, credits: Credits) -> &RankEntry {
        self.tiers
            .iter()
            .rev()
            .find(|entry| entry.threshold.admits(credits))
            .unwrap_or(&self.floor)
    }

    /// Entries in ascending threshold order, floor first.
    pub fn entries(&self) -> impl Iterator<Item = &RankEntry> {
        std::iter::once(&self.floor).chain(self.tiers.iter())
    }

    pub fn role_labels(&self) -> impl Iterator<Item = &str> {
        self.entries()
            .filter_map(|entry| entry.role_label.as_deref())
    }

    pub fn is_rank_role(&self, role_label: &str) -> bool {
        self.role_labels().any(|known| known == role_label)
    }

    /// Highest rank whose role is among `roles`.
    pub fn highest_held(&self, roles: &BTreeSet<String>) -> Option<&RankEntry> {
        self.tiers
            .iter()
            .rev()
            .chain(std::iter::once(&self.floor))
            .find(|entry| {
                entry
                    .role_label
                    .as_ref()
                    .is_some_and(|role_label| roles.contains(role_label))
            })
    }
}

impl Default for RankTable {
    fn default() -> Self {
        Self::standard()
    }
}
