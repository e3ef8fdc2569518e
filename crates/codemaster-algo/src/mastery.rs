//! Mastery Calculator
//!
//! Turns an attempt-count tuple into a mastery verdict, a decay score, and a
//! progressive escape-hatch classification. The threshold ladder is
//! evaluated in strict precedence order; only one hatch can be active at a
//! time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const DEFAULT_THRESHOLD: f64 = 0.8;

const LIGHT_MIN_ATTEMPTS: u32 = 8;
const LIGHT_THRESHOLD: f64 = 0.75;

const MODERATE_MIN_ATTEMPTS: u32 = 12;
const MODERATE_THRESHOLD: f64 = 0.70;

const HEAVY_MIN_FAILED: u32 = 15;
const HEAVY_MIN_RATIO: f64 = 0.6;
const HEAVY_THRESHOLD: f64 = 0.6;

const SECS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeHatchTier {
    Light,
    Moderate,
    Heavy,
}

impl EscapeHatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light struggle (75% threshold)",
            Self::Moderate => "moderate struggle (70% threshold)",
            Self::Heavy => "heavy struggle (60% threshold)",
        }
    }

    pub fn threshold(&self) -> f64 {
        match self {
            Self::Light => LIGHT_THRESHOLD,
            Self::Moderate => MODERATE_THRESHOLD,
            Self::Heavy => HEAVY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryStatus {
    pub mastery_ratio: f64,
    pub failed_attempts: u32,
    pub decay_score: f64,
    pub mastered: bool,
    pub mastery_threshold: f64,
    pub escape_hatch_activated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escape_hatch: Option<EscapeHatchTier>,
}

pub fn calculate_mastery_status(
    total_attempts: u32,
    successful_attempts: u32,
    last_attempt_date: Option<DateTime<Utc>>,
) -> MasteryStatus {
    calculate_mastery_status_at(total_attempts, successful_attempts, last_attempt_date, Utc::now())
}

/// Deterministic variant taking an explicit "now", used by tests and by the
/// engine when scoring a whole snapshot against a single instant.
pub fn calculate_mastery_status_at(
    total_attempts: u32,
    successful_attempts: u32,
    last_attempt_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> MasteryStatus {
    let successful_attempts = successful_attempts.min(total_attempts);
    let mastery_ratio = if total_attempts > 0 {
        successful_attempts as f64 / total_attempts as f64
    } else {
        0.0
    };
    let failed_attempts = total_attempts - successful_attempts;

    let decay_score = decay_score_at(total_attempts, mastery_ratio, last_attempt_date, now);
    let escape_hatch = classify_escape_hatch(total_attempts, failed_attempts, mastery_ratio);
    let mastery_threshold = escape_hatch
        .map(|tier| tier.threshold())
        .unwrap_or(DEFAULT_THRESHOLD);

    MasteryStatus {
        mastery_ratio,
        failed_attempts,
        decay_score,
        mastered: mastery_ratio >= mastery_threshold,
        mastery_threshold,
        escape_hatch_activated: escape_hatch.is_some(),
        escape_hatch,
    }
}

/// Decay grows with both staleness and poor accuracy. A tag with no
/// attempts defaults to maximal decay (1.0); a perfect-accuracy tag never
/// decays regardless of age. An attempted tag with no recorded date has no
/// staleness evidence and scores 0.
pub fn decay_score_at(
    total_attempts: u32,
    mastery_ratio: f64,
    last_attempt_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> f64 {
    if total_attempts == 0 {
        return 1.0;
    }
    let days_since = last_attempt_date
        .map(|date| ((now - date).num_seconds().max(0) as f64) / SECS_PER_DAY)
        .unwrap_or(0.0);
    (1.0 - mastery_ratio) * days_since
}

/// First match wins; hatches never stack. Heavy struggle is keyed on
/// absolute failure volume with no attempt-count ceiling, so very high
/// attempt counts at 60%+ accuracy always qualify.
fn classify_escape_hatch(
    total_attempts: u32,
    failed_attempts: u32,
    mastery_ratio: f64,
) -> Option<EscapeHatchTier> {
    if total_attempts >= LIGHT_MIN_ATTEMPTS
        && mastery_ratio >= LIGHT_THRESHOLD
        && mastery_ratio < DEFAULT_THRESHOLD
    {
        return Some(EscapeHatchTier::Light);
    }
    if total_attempts >= MODERATE_MIN_ATTEMPTS
        && mastery_ratio >= MODERATE_THRESHOLD
        && mastery_ratio < DEFAULT_THRESHOLD
    {
        return Some(EscapeHatchTier::Moderate);
    }
    if failed_attempts >= HEAVY_MIN_FAILED && mastery_ratio >= HEAVY_MIN_RATIO {
        return Some(EscapeHatchTier::Heavy);
    }
    None
}
