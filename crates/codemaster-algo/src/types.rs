use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest Leitner box a problem can reach.
pub const MAX_BOX_LEVEL: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    /// Ordering rank used by the relationship graph: Easy=1, Medium=2, Hard=3.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Easy => 1,
            Self::Medium => 2,
            Self::Hard => 3,
        }
    }

    pub fn parse(s: &str) -> Self {
        Self::try_parse(s).unwrap_or_default()
    }

    /// Strict variant used by record normalization, where an unknown
    /// difficulty is a validation error rather than a default.
    pub fn try_parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

/// A single attempt at a problem. Immutable once created; histories are
/// append-only and only ever aggregated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub problem_id: u32,
    pub success: bool,
    pub time_spent_secs: u32,
    pub attempt_date: DateTime<Utc>,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptStats {
    pub total_attempts: u32,
    pub successful_attempts: u32,
}

impl AttemptStats {
    pub fn failed_attempts(&self) -> u32 {
        self.total_attempts.saturating_sub(self.successful_attempts)
    }

    pub fn success_ratio(&self) -> f64 {
        if self.total_attempts > 0 {
            self.successful_attempts as f64 / self.total_attempts as f64
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: u32,
    pub title: String,
    pub difficulty: Difficulty,
    pub tags: BTreeSet<String>,
    pub box_level: u8,
    #[serde(default)]
    pub attempt_stats: AttemptStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt_date: Option<DateTime<Utc>>,
}

impl Problem {
    pub fn shares_tag_with(&self, other: &Problem) -> bool {
        self.tags.iter().any(|t| other.tags.contains(t))
    }
}

/// Derived per-tag aggregate, recomputed whenever a tag's attempts change.
/// Invariant: `successful_attempts <= total_attempts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagMastery {
    pub tag: String,
    pub total_attempts: u32,
    pub successful_attempts: u32,
    pub decay_score: f64,
    pub mastery_threshold: f64,
    pub mastered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt_date: Option<DateTime<Utc>>,
}

impl TagMastery {
    pub fn mastery_ratio(&self) -> f64 {
        if self.total_attempts > 0 {
            self.successful_attempts as f64 / self.total_attempts as f64
        } else {
            0.0
        }
    }

    pub fn failed_attempts(&self) -> u32 {
        self.total_attempts.saturating_sub(self.successful_attempts)
    }
}

/// Rolling accuracy snapshot over the most recent attempts, fed to the
/// poor-performance guard rail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentPerformance {
    pub accuracy: f64,
    pub avg_time_spent_secs: f64,
    pub consecutive_wrong: u32,
}

/// How the user reached their current difficulty cap. Escape-hatch
/// promotions carry less evidence than a standard volume-gate promotion and
/// get stricter guard-rail treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum PromotionType {
    #[default]
    Standard,
    StagnationEscapeHatch,
    TimeEscapeHatch,
}

impl PromotionType {
    pub fn is_escape_hatch(&self) -> bool {
        !matches!(self, Self::Standard)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::StagnationEscapeHatch => "stagnation_escape_hatch",
            Self::TimeEscapeHatch => "time_escape_hatch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_rank_is_ordered() {
        assert!(Difficulty::Easy.rank() < Difficulty::Medium.rank());
        assert!(Difficulty::Medium.rank() < Difficulty::Hard.rank());
    }

    #[test]
    fn lenient_parse_defaults_to_medium() {
        assert_eq!(Difficulty::parse("HARD"), Difficulty::Hard);
        assert_eq!(Difficulty::parse("unknown"), Difficulty::Medium);
        assert_eq!(Difficulty::try_parse("unknown"), None);
    }

    #[test]
    fn attempt_stats_ratio_handles_zero_attempts() {
        let stats = AttemptStats::default();
        assert_eq!(stats.success_ratio(), 0.0);
        assert_eq!(stats.failed_attempts(), 0);
    }

    #[test]
    fn escape_hatch_promotions_are_flagged() {
        assert!(!PromotionType::Standard.is_escape_hatch());
        assert!(PromotionType::StagnationEscapeHatch.is_escape_hatch());
        assert!(PromotionType::TimeEscapeHatch.is_escape_hatch());
    }
}
