//! Session safety guard rails.
//!
//! Post-composition checks that detect unbalanced difficulty distributions.
//! Rails are evaluated in a fixed precedence order and the first trigger
//! wins; the poor-performance rail outranks the minimum-count rails.

use serde::{Deserialize, Serialize};

use crate::config::GuardRailParams;
use crate::types::{Difficulty, Problem, PromotionType, RecentPerformance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardRailKind {
    PoorPerformanceProtection,
    HardCapMinimum,
    MediumCapMinimum,
    FirstSessionMinimum,
}

impl GuardRailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PoorPerformanceProtection => "poor_performance_protection",
            Self::HardCapMinimum => "hard_cap_minimum",
            Self::MediumCapMinimum => "medium_cap_minimum",
            Self::FirstSessionMinimum => "first_session_minimum",
        }
    }
}

/// A difficulty the session must carry at least `count` of.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyTarget {
    pub difficulty: Difficulty,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardRailOutcome {
    pub needs_rebalance: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard_rail: Option<GuardRailKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<DifficultyTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excess_hard: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement_difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn count_of(problems: &[Problem], difficulty: Difficulty) -> usize {
    problems.iter().filter(|p| p.difficulty == difficulty).count()
}

pub fn apply_safety_guard_rails(
    problems: &[Problem],
    difficulty_cap: Difficulty,
    sessions_at_current_difficulty: u32,
    recent_performance: Option<&RecentPerformance>,
    promotion_type: PromotionType,
    params: &GuardRailParams,
) -> GuardRailOutcome {
    let hard_count = count_of(problems, Difficulty::Hard);
    let medium_count = count_of(problems, Difficulty::Medium);

    // Rail 1: poor-performance protection. Only an escape-hatch promotion
    // into Hard with sub-50% recent accuracy (strict) and more than one Hard
    // problem qualifies.
    if difficulty_cap == Difficulty::Hard
        && promotion_type.is_escape_hatch()
        && recent_performance
            .map(|p| p.accuracy < params.poor_accuracy_cutoff)
            .unwrap_or(false)
        && hard_count > 1
    {
        let excess = hard_count - 1;
        return GuardRailOutcome {
            needs_rebalance: true,
            guard_rail: Some(GuardRailKind::PoorPerformanceProtection),
            target: None,
            excess_hard: Some(excess),
            replacement_difficulty: Some(Difficulty::Medium),
            message: Some(format!(
                "recent accuracy below {:.0}% after an escape-hatch promotion; swapping {excess} hard problem(s) for medium",
                params.poor_accuracy_cutoff * 100.0
            )),
        };
    }

    // Rail 2: hard-cap minimum. A nonzero-but-thin Hard share gets topped up;
    // zero Hard problems is left alone by this rail.
    if difficulty_cap == Difficulty::Hard
        && problems.len() >= params.hard_session_min_len
        && hard_count > 0
        && hard_count < params.min_hard
    {
        return minimum_outcome(GuardRailKind::HardCapMinimum, Difficulty::Hard, params.min_hard);
    }

    // Rail 3: medium-cap minimum.
    if difficulty_cap == Difficulty::Medium
        && problems.len() >= params.medium_session_min_len
        && medium_count > 0
        && medium_count < params.min_medium
    {
        return minimum_outcome(
            GuardRailKind::MediumCapMinimum,
            Difficulty::Medium,
            params.min_medium,
        );
    }

    // Rail 4: very first session at a newly promoted difficulty enforces the
    // corresponding minimum with the session-length gate waived. Never
    // applies at an Easy cap.
    if sessions_at_current_difficulty == 0 {
        match difficulty_cap {
            Difficulty::Hard if hard_count > 0 && hard_count < params.min_hard => {
                return minimum_outcome(
                    GuardRailKind::FirstSessionMinimum,
                    Difficulty::Hard,
                    params.min_hard,
                );
            }
            Difficulty::Medium if medium_count > 0 && medium_count < params.min_medium => {
                return minimum_outcome(
                    GuardRailKind::FirstSessionMinimum,
                    Difficulty::Medium,
                    params.min_medium,
                );
            }
            _ => {}
        }
    }

    GuardRailOutcome::default()
}

fn minimum_outcome(kind: GuardRailKind, difficulty: Difficulty, count: usize) -> GuardRailOutcome {
    GuardRailOutcome {
        needs_rebalance: true,
        guard_rail: Some(kind),
        target: Some(DifficultyTarget { difficulty, count }),
        excess_hard: None,
        replacement_difficulty: None,
        message: Some(format!(
            "session under-represents {} problems; raising to {count}",
            difficulty.as_str()
        )),
    }
}
