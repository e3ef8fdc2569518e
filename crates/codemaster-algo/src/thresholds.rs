//! Adaptive Threshold Engine
//!
//! Computes context-specific threshold adjustments from struggle-history
//! counters. Adjustments are monotonically non-increasing as struggle grows;
//! every rule combines with the running value via `min()`, and the mastery
//! context additionally combines its attempt-based and time-based families
//! via `min()`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const DIFFICULTY_BASE_ACCURACY: f64 = 0.9;
const DIFFICULTY_RELAXED: f64 = 0.8;
const DIFFICULTY_RELAXED_SESSIONS: u32 = 10;
const DIFFICULTY_FLOOR: f64 = 0.75;
const DIFFICULTY_FLOOR_SESSIONS: u32 = 15;

const MASTERY_BASE: f64 = 0.8;
const MASTERY_ATTEMPT_LIGHT: f64 = 0.75;
const MASTERY_ATTEMPT_LIGHT_GATE: u32 = 8;
const MASTERY_ATTEMPT_MID: f64 = 0.70;
const MASTERY_ATTEMPT_MID_GATE: u32 = 15;
const MASTERY_ATTEMPT_MID_STRUGGLES: u32 = 5;
const MASTERY_ATTEMPT_FLOOR: f64 = 0.65;
const MASTERY_ATTEMPT_FLOOR_GATE: u32 = 20;
const MASTERY_ATTEMPT_FLOOR_STRUGGLES: u32 = 8;
const MASTERY_TIME_RELAXED: f64 = 0.70;
const MASTERY_TIME_RELAXED_DAYS: u32 = 14;
const MASTERY_TIME_FLOOR: f64 = 0.60;
const MASTERY_TIME_FLOOR_DAYS: u32 = 21;

const EXPANSION_BASE_ACCURACY: f64 = 0.75;
const EXPANSION_BASE_EFFICIENCY: f64 = 0.6;
const EXPANSION_RELAXED_SESSIONS: u32 = 5;
const EXPANSION_RELAXED: (f64, f64) = (0.65, 0.5);
const EXPANSION_FLOOR_SESSIONS: u32 = 8;
const EXPANSION_FLOOR: (f64, f64) = (0.60, 0.4);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdContext {
    Difficulty,
    Mastery,
    Expansion,
}

impl ThresholdContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Difficulty => "difficulty",
            Self::Mastery => "mastery",
            Self::Expansion => "expansion",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyThresholds {
    pub promotion_accuracy: f64,
}

impl Default for DifficultyThresholds {
    fn default() -> Self {
        Self {
            promotion_accuracy: DIFFICULTY_BASE_ACCURACY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryThresholds {
    pub mastery_threshold: f64,
}

impl Default for MasteryThresholds {
    fn default() -> Self {
        Self {
            mastery_threshold: MASTERY_BASE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionThresholds {
    pub accuracy_threshold: f64,
    pub efficiency_threshold: f64,
}

impl Default for ExpansionThresholds {
    fn default() -> Self {
        Self {
            accuracy_threshold: EXPANSION_BASE_ACCURACY,
            efficiency_threshold: EXPANSION_BASE_EFFICIENCY,
        }
    }
}

/// Thresholds tagged by the context they govern. One variant per context
/// keeps the adjustment rules type-safe instead of dispatching on strings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "context", rename_all = "lowercase")]
pub enum BaseThresholds {
    Difficulty(DifficultyThresholds),
    Mastery(MasteryThresholds),
    Expansion(ExpansionThresholds),
}

impl BaseThresholds {
    pub fn context(&self) -> ThresholdContext {
        match self {
            Self::Difficulty(_) => ThresholdContext::Difficulty,
            Self::Mastery(_) => ThresholdContext::Mastery,
            Self::Expansion(_) => ThresholdContext::Expansion,
        }
    }
}

/// Counters accumulated while a user fails to progress in some context.
/// Created empty on first struggle; `reset_struggle_history` clears the
/// counters (never the dates) when genuine progress lands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StruggleHistory {
    pub sessions_at_current_level: u32,
    pub consecutive_failed_promotions: u32,
    pub consecutive_struggles: u32,
    pub days_without_progress: u32,
    pub sessions_at_same_tag_count: u32,
    pub expansion_failures: u32,
    pub total_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_struggle_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_promotion_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_mastery_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_expansion_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_struggles: Option<Box<StruggleHistory>>,
}

impl StruggleHistory {
    pub fn is_empty(&self) -> bool {
        self.sessions_at_current_level == 0
            && self.consecutive_failed_promotions == 0
            && self.consecutive_struggles == 0
            && self.days_without_progress == 0
            && self.sessions_at_same_tag_count == 0
            && self.expansion_failures == 0
            && self.total_attempts == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdAdjustment {
    pub original: BaseThresholds,
    pub adjusted: BaseThresholds,
    pub adaptations: Vec<String>,
    pub reason: String,
}

impl ThresholdAdjustment {
    pub fn is_adapted(&self) -> bool {
        !self.adaptations.is_empty()
    }
}

/// Pure and deterministic. An absent or empty history returns the base
/// thresholds untouched with no adaptation notes.
pub fn calculate_adaptive_thresholds(
    base: &BaseThresholds,
    history: Option<&StruggleHistory>,
) -> ThresholdAdjustment {
    let history = match history {
        Some(h) if !h.is_empty() => h,
        _ => {
            return ThresholdAdjustment {
                original: *base,
                adjusted: *base,
                adaptations: Vec::new(),
                reason: "no struggle history; thresholds unchanged".to_string(),
            }
        }
    };

    let mut adaptations = Vec::new();
    let adjusted = match base {
        BaseThresholds::Difficulty(t) => {
            BaseThresholds::Difficulty(adjust_difficulty(t, history, &mut adaptations))
        }
        BaseThresholds::Mastery(t) => {
            BaseThresholds::Mastery(adjust_mastery(t, history, &mut adaptations))
        }
        BaseThresholds::Expansion(t) => {
            BaseThresholds::Expansion(adjust_expansion(t, history, &mut adaptations))
        }
    };

    let reason = if adaptations.is_empty() {
        "struggle below adaptation gates; thresholds unchanged".to_string()
    } else {
        format!(
            "{} adaptation(s) applied for sustained {} struggle",
            adaptations.len(),
            base.context().as_str()
        )
    };

    ThresholdAdjustment {
        original: *base,
        adjusted,
        adaptations,
        reason,
    }
}

fn adjust_difficulty(
    base: &DifficultyThresholds,
    history: &StruggleHistory,
    adaptations: &mut Vec<String>,
) -> DifficultyThresholds {
    let mut accuracy = base.promotion_accuracy;
    if history.sessions_at_current_level >= DIFFICULTY_RELAXED_SESSIONS {
        accuracy = accuracy.min(DIFFICULTY_RELAXED);
        adaptations.push(format!(
            "promotion accuracy relaxed to {DIFFICULTY_RELAXED} after {} sessions at the current level",
            history.sessions_at_current_level
        ));
    }
    if history.sessions_at_current_level >= DIFFICULTY_FLOOR_SESSIONS {
        accuracy = accuracy.min(DIFFICULTY_FLOOR);
        adaptations.push(format!(
            "promotion accuracy floored at {DIFFICULTY_FLOOR} after {} sessions at the current level",
            history.sessions_at_current_level
        ));
    }
    DifficultyThresholds {
        promotion_accuracy: accuracy,
    }
}

fn adjust_mastery(
    base: &MasteryThresholds,
    history: &StruggleHistory,
    adaptations: &mut Vec<String>,
) -> MasteryThresholds {
    let mut attempt_based = base.mastery_threshold;
    if history.total_attempts >= MASTERY_ATTEMPT_LIGHT_GATE {
        attempt_based = attempt_based.min(MASTERY_ATTEMPT_LIGHT);
        adaptations.push(format!(
            "mastery threshold relaxed to {MASTERY_ATTEMPT_LIGHT} after {} attempts",
            history.total_attempts
        ));
    }
    if history.total_attempts >= MASTERY_ATTEMPT_MID_GATE
        && history.consecutive_struggles >= MASTERY_ATTEMPT_MID_STRUGGLES
    {
        attempt_based = attempt_based.min(MASTERY_ATTEMPT_MID);
        adaptations.push(format!(
            "mastery threshold relaxed to {MASTERY_ATTEMPT_MID} after {} attempts and {} consecutive struggles",
            history.total_attempts, history.consecutive_struggles
        ));
    }
    if history.total_attempts >= MASTERY_ATTEMPT_FLOOR_GATE
        && history.consecutive_struggles >= MASTERY_ATTEMPT_FLOOR_STRUGGLES
    {
        attempt_based = attempt_based.min(MASTERY_ATTEMPT_FLOOR);
        adaptations.push(format!(
            "mastery threshold floored at {MASTERY_ATTEMPT_FLOOR} after {} attempts and {} consecutive struggles",
            history.total_attempts, history.consecutive_struggles
        ));
    }

    let mut time_based = base.mastery_threshold;
    if history.days_without_progress >= MASTERY_TIME_RELAXED_DAYS {
        time_based = time_based.min(MASTERY_TIME_RELAXED);
        adaptations.push(format!(
            "mastery threshold relaxed to {MASTERY_TIME_RELAXED} after {} days without progress",
            history.days_without_progress
        ));
    }
    if history.days_without_progress >= MASTERY_TIME_FLOOR_DAYS {
        time_based = time_based.min(MASTERY_TIME_FLOOR);
        adaptations.push(format!(
            "mastery threshold floored at {MASTERY_TIME_FLOOR} after {} days without progress",
            history.days_without_progress
        ));
    }

    // The two reduction families compound to the lower of the two.
    MasteryThresholds {
        mastery_threshold: attempt_based.min(time_based),
    }
}

fn adjust_expansion(
    base: &ExpansionThresholds,
    history: &StruggleHistory,
    adaptations: &mut Vec<String>,
) -> ExpansionThresholds {
    let mut accuracy = base.accuracy_threshold;
    let mut efficiency = base.efficiency_threshold;
    if history.sessions_at_same_tag_count >= EXPANSION_RELAXED_SESSIONS {
        accuracy = accuracy.min(EXPANSION_RELAXED.0);
        efficiency = efficiency.min(EXPANSION_RELAXED.1);
        adaptations.push(format!(
            "expansion thresholds relaxed to {}/{} after {} sessions at the same tag count",
            EXPANSION_RELAXED.0, EXPANSION_RELAXED.1, history.sessions_at_same_tag_count
        ));
    }
    if history.sessions_at_same_tag_count >= EXPANSION_FLOOR_SESSIONS {
        accuracy = accuracy.min(EXPANSION_FLOOR.0);
        efficiency = efficiency.min(EXPANSION_FLOOR.1);
        adaptations.push(format!(
            "expansion thresholds floored at {}/{} after {} sessions at the same tag count",
            EXPANSION_FLOOR.0, EXPANSION_FLOOR.1, history.sessions_at_same_tag_count
        ));
    }
    ExpansionThresholds {
        accuracy_threshold: accuracy,
        efficiency_threshold: efficiency,
    }
}

/// Outcome of one session in some context, fed into the struggle counters.
#[derive(Debug, Clone, Copy)]
pub struct SessionOutcome {
    pub succeeded: bool,
    pub attempts: u32,
    pub when: DateTime<Utc>,
}

/// A success (promoted / mastered / expanded) resets the context's
/// consecutive-failure counter and stamps the last-success date; a failure
/// increments it. Session counters advance either way.
pub fn update_struggle_history(
    history: &mut StruggleHistory,
    context: ThresholdContext,
    outcome: &SessionOutcome,
) {
    match context {
        ThresholdContext::Difficulty => {
            history.sessions_at_current_level += 1;
            if outcome.succeeded {
                history.consecutive_failed_promotions = 0;
                history.last_promotion_date = Some(outcome.when);
            } else {
                history.consecutive_failed_promotions += 1;
            }
        }
        ThresholdContext::Mastery => {
            history.total_attempts += outcome.attempts;
            if outcome.succeeded {
                history.consecutive_struggles = 0;
                history.last_mastery_date = Some(outcome.when);
            } else {
                history.consecutive_struggles += 1;
            }
        }
        ThresholdContext::Expansion => {
            history.sessions_at_same_tag_count += 1;
            if outcome.succeeded {
                history.expansion_failures = 0;
                history.last_expansion_date = Some(outcome.when);
            } else {
                history.expansion_failures += 1;
            }
        }
    }

    if outcome.succeeded {
        history.days_without_progress = 0;
        history.first_struggle_date = None;
    } else {
        let since = history
            .first_struggle_date
            .get_or_insert(outcome.when)
            .to_owned();
        history.days_without_progress = (outcome.when - since).num_days().max(0) as u32;
    }
}

/// Fires on genuine progress. Counters are cleared, dates are preserved, and
/// the pre-reset counters are snapshotted under `previous_struggles` for
/// audit.
pub fn reset_struggle_history(history: &mut StruggleHistory, reason: &str) {
    reset_struggle_history_at(history, reason, Utc::now());
}

pub fn reset_struggle_history_at(history: &mut StruggleHistory, reason: &str, now: DateTime<Utc>) {
    let mut snapshot = history.clone();
    snapshot.previous_struggles = None;

    history.sessions_at_current_level = 0;
    history.consecutive_failed_promotions = 0;
    history.consecutive_struggles = 0;
    history.days_without_progress = 0;
    history.sessions_at_same_tag_count = 0;
    history.expansion_failures = 0;
    history.total_attempts = 0;
    history.first_struggle_date = None;
    history.reset_date = Some(now);
    history.reset_reason = Some(reason.to_string());
    history.previous_struggles = Some(Box::new(snapshot));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mastery_base() -> BaseThresholds {
        BaseThresholds::Mastery(MasteryThresholds::default())
    }

    #[test]
    fn absent_history_returns_base_unchanged() {
        let result = calculate_adaptive_thresholds(&mastery_base(), None);
        assert_eq!(result.original, result.adjusted);
        assert!(result.adaptations.is_empty());
    }

    #[test]
    fn empty_history_returns_base_unchanged() {
        let result =
            calculate_adaptive_thresholds(&mastery_base(), Some(&StruggleHistory::default()));
        assert_eq!(result.original, result.adjusted);
        assert!(result.adaptations.is_empty());
    }

    #[test]
    fn difficulty_relaxes_stepwise_with_sessions() {
        let base = BaseThresholds::Difficulty(DifficultyThresholds::default());
        let mut history = StruggleHistory {
            sessions_at_current_level: 10,
            ..Default::default()
        };
        let relaxed = calculate_adaptive_thresholds(&base, Some(&history));
        assert_eq!(
            relaxed.adjusted,
            BaseThresholds::Difficulty(DifficultyThresholds {
                promotion_accuracy: 0.8
            })
        );

        history.sessions_at_current_level = 15;
        let floored = calculate_adaptive_thresholds(&base, Some(&history));
        assert_eq!(
            floored.adjusted,
            BaseThresholds::Difficulty(DifficultyThresholds {
                promotion_accuracy: 0.75
            })
        );
        assert_eq!(floored.adaptations.len(), 2, "both gates report their note");
    }

    #[test]
    fn mastery_attempt_and_time_families_compound_via_min() {
        // Attempt family alone reaches 0.70; time family reaches 0.60.
        let history = StruggleHistory {
            total_attempts: 16,
            consecutive_struggles: 5,
            days_without_progress: 21,
            ..Default::default()
        };
        let result = calculate_adaptive_thresholds(&mastery_base(), Some(&history));
        assert_eq!(
            result.adjusted,
            BaseThresholds::Mastery(MasteryThresholds {
                mastery_threshold: 0.60
            })
        );
    }

    #[test]
    fn mastery_attempt_floor_needs_both_gates() {
        let history = StruggleHistory {
            total_attempts: 25,
            consecutive_struggles: 7,
            ..Default::default()
        };
        let result = calculate_adaptive_thresholds(&mastery_base(), Some(&history));
        // 25 attempts but only 7 consecutive struggles: stops at 0.70.
        assert_eq!(
            result.adjusted,
            BaseThresholds::Mastery(MasteryThresholds {
                mastery_threshold: 0.70
            })
        );
    }

    #[test]
    fn expansion_reduces_both_thresholds_together() {
        let base = BaseThresholds::Expansion(ExpansionThresholds::default());
        let history = StruggleHistory {
            sessions_at_same_tag_count: 8,
            ..Default::default()
        };
        let result = calculate_adaptive_thresholds(&base, Some(&history));
        assert_eq!(
            result.adjusted,
            BaseThresholds::Expansion(ExpansionThresholds {
                accuracy_threshold: 0.60,
                efficiency_threshold: 0.4
            })
        );
    }

    #[test]
    fn adjustments_never_raise_a_lowered_base() {
        // Caller already carries a base below the relaxation step.
        let base = BaseThresholds::Mastery(MasteryThresholds {
            mastery_threshold: 0.68,
        });
        let history = StruggleHistory {
            total_attempts: 9,
            ..Default::default()
        };
        let result = calculate_adaptive_thresholds(&base, Some(&history));
        assert_eq!(
            result.adjusted,
            BaseThresholds::Mastery(MasteryThresholds {
                mastery_threshold: 0.68
            }),
            "min() with the 0.75 step must not raise 0.68"
        );
    }

    #[test]
    fn update_resets_consecutive_counter_on_success() {
        let mut history = StruggleHistory::default();
        let now = Utc::now();
        let failure = SessionOutcome {
            succeeded: false,
            attempts: 4,
            when: now,
        };
        update_struggle_history(&mut history, ThresholdContext::Mastery, &failure);
        update_struggle_history(&mut history, ThresholdContext::Mastery, &failure);
        assert_eq!(history.consecutive_struggles, 2);
        assert_eq!(history.total_attempts, 8);

        let success = SessionOutcome {
            succeeded: true,
            attempts: 3,
            when: now,
        };
        update_struggle_history(&mut history, ThresholdContext::Mastery, &success);
        assert_eq!(history.consecutive_struggles, 0);
        assert_eq!(history.last_mastery_date, Some(now));
        assert_eq!(history.days_without_progress, 0);
    }

    #[test]
    fn days_without_progress_grows_from_first_struggle() {
        let mut history = StruggleHistory::default();
        let start = Utc::now();
        update_struggle_history(
            &mut history,
            ThresholdContext::Mastery,
            &SessionOutcome {
                succeeded: false,
                attempts: 1,
                when: start,
            },
        );
        update_struggle_history(
            &mut history,
            ThresholdContext::Mastery,
            &SessionOutcome {
                succeeded: false,
                attempts: 1,
                when: start + chrono::Duration::days(16),
            },
        );
        assert_eq!(history.days_without_progress, 16);
        assert_eq!(history.first_struggle_date, Some(start));
    }

    #[test]
    fn reset_clears_counters_preserves_dates_and_snapshots() {
        let now = Utc::now();
        let mut history = StruggleHistory {
            sessions_at_current_level: 12,
            consecutive_struggles: 4,
            total_attempts: 30,
            last_promotion_date: Some(now),
            ..Default::default()
        };
        reset_struggle_history_at(&mut history, "difficulty promotion", now);

        assert!(history.is_empty());
        assert_eq!(history.last_promotion_date, Some(now), "dates survive reset");
        assert_eq!(history.reset_reason.as_deref(), Some("difficulty promotion"));
        let snapshot = history.previous_struggles.as_ref().expect("snapshot kept");
        assert_eq!(snapshot.sessions_at_current_level, 12);
        assert_eq!(snapshot.total_attempts, 30);
        assert!(snapshot.previous_struggles.is_none(), "snapshots do not chain");
    }
}
