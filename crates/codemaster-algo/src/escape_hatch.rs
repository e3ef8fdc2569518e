//! Escape Hatch Detector
//!
//! A tag-scoped relaxation system that lowers promotion/mastery thresholds
//! under sustained stagnation. Runs in parallel with the adaptive threshold
//! engine and composes with it; activation keys are recorded idempotently so
//! a hatch is never announced twice.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::TagMastery;

const SESSION_GATE: u32 = 10;
const SESSION_RELAXED_ACCURACY: f64 = 0.8;

const ATTEMPT_FAILED_GATE: u32 = 15;
const STALE_DAYS_GATE: i64 = 14;
const RATE_BAND_LOW: f64 = 0.6;
const RATE_BAND_HIGH: f64 = 0.8;
const TAG_RELAXED_THRESHOLD: f64 = 0.6;

const DIFFICULTY_DEFAULT: f64 = 0.9;
const MASTERY_DEFAULT: f64 = 0.8;

/// Persisted per-user escape-hatch bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscapeHatchState {
    pub sessions_at_current_difficulty: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_difficulty_promotion: Option<DateTime<Utc>>,
    pub sessions_without_promotion: u32,
    #[serde(default)]
    pub activated_escape_hatches: BTreeSet<String>,
}

impl EscapeHatchState {
    /// Appends an activation key at most once. Returns whether the key was
    /// newly recorded.
    pub fn record_activation(&mut self, key: impl Into<String>) -> bool {
        self.activated_escape_hatches.insert(key.into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHatch {
    pub sessions_at_current_difficulty: u32,
    pub adjusted_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagHatch {
    pub tag: String,
    pub success_rate: f64,
    pub failed_attempts: u32,
    pub adjusted_threshold: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscapeHatchReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_based: Option<SessionHatch>,
    pub attempt_based: Vec<TagHatch>,
    pub time_based: Vec<TagHatch>,
    pub recommendations: Vec<String>,
}

impl EscapeHatchReport {
    pub fn is_empty(&self) -> bool {
        self.session_based.is_none() && self.attempt_based.is_empty() && self.time_based.is_empty()
    }

    /// Stable activation keys for the hatches in this report.
    pub fn activation_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        if self.session_based.is_some() {
            keys.push("session-based".to_string());
        }
        keys.extend(
            self.attempt_based
                .iter()
                .map(|h| format!("attempt-based-{}", h.tag)),
        );
        keys.extend(
            self.time_based
                .iter()
                .map(|h| format!("time-based-{}", h.tag)),
        );
        keys
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdKind {
    Difficulty,
    Mastery,
}

pub fn detect_applicable_escape_hatches(
    state: &EscapeHatchState,
    mastery_data: &[TagMastery],
    tier_tags: &[String],
) -> EscapeHatchReport {
    detect_applicable_escape_hatches_at(state, mastery_data, tier_tags, Utc::now())
}

pub fn detect_applicable_escape_hatches_at(
    state: &EscapeHatchState,
    mastery_data: &[TagMastery],
    tier_tags: &[String],
    now: DateTime<Utc>,
) -> EscapeHatchReport {
    let mut report = EscapeHatchReport::default();

    if state.sessions_at_current_difficulty >= SESSION_GATE {
        report.session_based = Some(SessionHatch {
            sessions_at_current_difficulty: state.sessions_at_current_difficulty,
            adjusted_threshold: SESSION_RELAXED_ACCURACY,
        });
        report.recommendations.push(format!(
            "{} sessions at the current difficulty; promotion accuracy relaxed to {SESSION_RELAXED_ACCURACY}",
            state.sessions_at_current_difficulty
        ));
    }

    for tag in tier_tags {
        let Some(mastery) = mastery_data.iter().find(|m| &m.tag == tag) else {
            continue;
        };
        let rate = mastery.mastery_ratio();
        if !(RATE_BAND_LOW..RATE_BAND_HIGH).contains(&rate) {
            continue;
        }

        if mastery.failed_attempts() >= ATTEMPT_FAILED_GATE {
            report.attempt_based.push(TagHatch {
                tag: tag.clone(),
                success_rate: rate,
                failed_attempts: mastery.failed_attempts(),
                adjusted_threshold: TAG_RELAXED_THRESHOLD,
            });
            report.recommendations.push(format!(
                "tag `{tag}` has {} failed attempts at {:.0}% accuracy; mastery bar lowered to {TAG_RELAXED_THRESHOLD}",
                mastery.failed_attempts(),
                rate * 100.0
            ));
        }

        let stale = mastery
            .last_attempt_date
            .map(|date| (now - date).num_days() >= STALE_DAYS_GATE)
            .unwrap_or(false);
        if stale {
            report.time_based.push(TagHatch {
                tag: tag.clone(),
                success_rate: rate,
                failed_attempts: mastery.failed_attempts(),
                adjusted_threshold: TAG_RELAXED_THRESHOLD,
            });
            report.recommendations.push(format!(
                "tag `{tag}` untouched for {STALE_DAYS_GATE}+ days at {:.0}% accuracy; mastery bar lowered to {TAG_RELAXED_THRESHOLD}",
                rate * 100.0
            ));
        }
    }

    report
}

/// Resolves the threshold a given type/tag should currently use: the
/// attempt-based hatch wins over the time-based one, and without either the
/// defaults apply (0.9 for difficulty promotion, 0.8 for mastery). The
/// session hatch only relaxes the difficulty default.
pub fn calculate_adjusted_threshold(
    report: &EscapeHatchReport,
    kind: ThresholdKind,
    tag: Option<&str>,
) -> f64 {
    if let Some(tag) = tag {
        if let Some(hatch) = report.attempt_based.iter().find(|h| h.tag == tag) {
            return hatch.adjusted_threshold;
        }
        if let Some(hatch) = report.time_based.iter().find(|h| h.tag == tag) {
            return hatch.adjusted_threshold;
        }
    }
    match kind {
        ThresholdKind::Difficulty => report
            .session_based
            .as_ref()
            .map(|h| h.adjusted_threshold)
            .unwrap_or(DIFFICULTY_DEFAULT),
        ThresholdKind::Mastery => MASTERY_DEFAULT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tag_mastery(tag: &str, total: u32, successful: u32, days_old: i64) -> TagMastery {
        TagMastery {
            tag: tag.to_string(),
            total_attempts: total,
            successful_attempts: successful,
            decay_score: 0.0,
            mastery_threshold: 0.8,
            mastered: false,
            last_attempt_date: Some(Utc::now() - Duration::days(days_old)),
        }
    }

    #[test]
    fn session_hatch_needs_ten_sessions() {
        let mut state = EscapeHatchState {
            sessions_at_current_difficulty: 9,
            ..Default::default()
        };
        let report = detect_applicable_escape_hatches(&state, &[], &[]);
        assert!(report.session_based.is_none());

        state.sessions_at_current_difficulty = 10;
        let report = detect_applicable_escape_hatches(&state, &[], &[]);
        assert_eq!(
            report.session_based.map(|h| h.adjusted_threshold),
            Some(0.8)
        );
    }

    #[test]
    fn attempt_hatch_requires_rate_band_and_failure_volume() {
        let state = EscapeHatchState::default();
        let tags = vec!["dp".to_string(), "graphs".to_string(), "trees".to_string()];
        let mastery = vec![
            // 65% with 17 failures: qualifies.
            tag_mastery("dp", 49, 32, 1),
            // 50%: below the band even with many failures.
            tag_mastery("graphs", 40, 20, 1),
            // 75% but only 5 failures: volume gate misses.
            tag_mastery("trees", 20, 15, 1),
        ];
        let report = detect_applicable_escape_hatches(&state, &mastery, &tags);
        assert_eq!(report.attempt_based.len(), 1);
        assert_eq!(report.attempt_based[0].tag, "dp");
        assert_eq!(report.attempt_based[0].adjusted_threshold, 0.6);
    }

    #[test]
    fn time_hatch_requires_fourteen_day_staleness() {
        let state = EscapeHatchState::default();
        let tags = vec!["heaps".to_string(), "tries".to_string()];
        let mastery = vec![
            tag_mastery("heaps", 10, 7, 14),
            tag_mastery("tries", 10, 7, 13),
        ];
        let report = detect_applicable_escape_hatches(&state, &mastery, &tags);
        assert_eq!(report.time_based.len(), 1);
        assert_eq!(report.time_based[0].tag, "heaps");
    }

    #[test]
    fn tags_outside_the_tier_are_ignored() {
        let state = EscapeHatchState::default();
        let mastery = vec![tag_mastery("dp", 49, 32, 30)];
        let report = detect_applicable_escape_hatches(&state, &mastery, &[]);
        assert!(report.is_empty());
    }

    #[test]
    fn adjusted_threshold_prefers_attempt_then_time_then_default() {
        let report = EscapeHatchReport {
            session_based: Some(SessionHatch {
                sessions_at_current_difficulty: 12,
                adjusted_threshold: 0.8,
            }),
            attempt_based: vec![TagHatch {
                tag: "dp".to_string(),
                success_rate: 0.65,
                failed_attempts: 17,
                adjusted_threshold: 0.6,
            }],
            time_based: vec![TagHatch {
                tag: "graphs".to_string(),
                success_rate: 0.7,
                failed_attempts: 3,
                adjusted_threshold: 0.6,
            }],
            recommendations: vec![],
        };

        assert_eq!(
            calculate_adjusted_threshold(&report, ThresholdKind::Mastery, Some("dp")),
            0.6
        );
        assert_eq!(
            calculate_adjusted_threshold(&report, ThresholdKind::Mastery, Some("graphs")),
            0.6
        );
        assert_eq!(
            calculate_adjusted_threshold(&report, ThresholdKind::Mastery, Some("arrays")),
            0.8
        );
        assert_eq!(
            calculate_adjusted_threshold(&report, ThresholdKind::Difficulty, None),
            0.8,
            "session hatch relaxes the difficulty default"
        );

        let quiet = EscapeHatchReport::default();
        assert_eq!(
            calculate_adjusted_threshold(&quiet, ThresholdKind::Difficulty, None),
            0.9
        );
    }

    #[test]
    fn activation_keys_are_idempotent() {
        let mut state = EscapeHatchState::default();
        assert!(state.record_activation("attempt-based-dp"));
        assert!(!state.record_activation("attempt-based-dp"));
        assert_eq!(state.activated_escape_hatches.len(), 1);
    }

    #[test]
    fn report_lists_stable_activation_keys() {
        let state = EscapeHatchState {
            sessions_at_current_difficulty: 10,
            ..Default::default()
        };
        let mastery = vec![tag_mastery("dp", 49, 32, 30)];
        let report = detect_applicable_escape_hatches(&state, &mastery, &["dp".to_string()]);
        let keys = report.activation_keys();
        assert!(keys.contains(&"session-based".to_string()));
        assert!(keys.contains(&"attempt-based-dp".to_string()));
        assert!(keys.contains(&"time-based-dp".to_string()));
    }
}
