//! Optimal-path scoring.
//!
//! Ranks a candidate problem by how well it extends the user's recent
//! successes through the relationship graph. Scores feed a ranking, not a
//! correctness-critical decision, so the public entry point degrades to a
//! neutral score instead of propagating internal errors; the fallible
//! computation stays visible for callers that want to distinguish "neutral
//! by default" from "computation failed".

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Difficulty, Problem, TagMastery};

pub const NEUTRAL_SCORE: f64 = 1.0;
pub const MIN_SCORE: f64 = 0.1;
pub const MAX_SCORE: f64 = 5.0;

const RELATIONSHIP_WEIGHT: f64 = 0.3;
const PLATEAU_HARD_BOOST: f64 = 0.75;
const PLATEAU_MEDIUM_BOOST: f64 = 0.25;
const UNMASTERED_TAG_BONUS: f64 = 0.2;
const DECAYED_TAG_BONUS: f64 = 0.1;
const DECAYED_TAG_CUTOFF: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathScoreError {
    #[error("missing problem record")]
    MissingProblem,
    #[error("non-finite relationship strength for key `{0}`")]
    InvalidStrength(String),
}

/// Snapshot of the user consulted during scoring.
#[derive(Debug, Clone, Default)]
pub struct PathScoringState {
    pub recent_successful_ids: Vec<u32>,
    pub tag_mastery: Option<HashMap<String, TagMastery>>,
}

/// Precomputed lookups shared across one scoring pass. The relationship map
/// is keyed `"<fromId>-<toId>"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathScoringCache {
    pub relationship_map: HashMap<String, f64>,
    pub is_plateauing: bool,
}

impl PathScoringCache {
    pub fn relationship_key(from: u32, to: u32) -> String {
        format!("{from}-{to}")
    }
}

/// Fail-safe wrapper: any internal error collapses to the neutral 1.0.
pub fn calculate_optimal_path_score(
    problem: Option<&Problem>,
    state: &PathScoringState,
    cache: &PathScoringCache,
) -> f64 {
    score_optimal_path(problem, state, cache).unwrap_or(NEUTRAL_SCORE)
}

pub fn score_optimal_path(
    problem: Option<&Problem>,
    state: &PathScoringState,
    cache: &PathScoringCache,
) -> Result<f64, PathScoreError> {
    let problem = problem.ok_or(PathScoreError::MissingProblem)?;
    let mut score = NEUTRAL_SCORE;

    for from in &state.recent_successful_ids {
        let key = PathScoringCache::relationship_key(*from, problem.id);
        if let Some(strength) = cache.relationship_map.get(&key) {
            if !strength.is_finite() {
                return Err(PathScoreError::InvalidStrength(key));
            }
            score += strength * RELATIONSHIP_WEIGHT;
        }
    }

    // Stagnation boost: when the user plateaus, harder problems must rank
    // strictly above easier ones.
    if cache.is_plateauing {
        score += match problem.difficulty {
            Difficulty::Hard => PLATEAU_HARD_BOOST,
            Difficulty::Medium => PLATEAU_MEDIUM_BOOST,
            Difficulty::Easy => 0.0,
        };
    }

    if let Some(tag_mastery) = &state.tag_mastery {
        for tag in &problem.tags {
            if let Some(mastery) = tag_mastery.get(tag) {
                if !mastery.mastered {
                    score += UNMASTERED_TAG_BONUS;
                } else if mastery.decay_score > DECAYED_TAG_CUTOFF {
                    score += DECAYED_TAG_BONUS;
                }
            }
        }
    }

    Ok(score.clamp(MIN_SCORE, MAX_SCORE))
}
