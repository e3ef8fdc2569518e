//! Bridge-problem scoring.
//!
//! Finds mastered problems that connect multiple currently-struggling
//! problems through the relationship graph and ranks them for triggered
//! review. Weak edges are filtered before aggregation; they contribute
//! neither strength nor coverage.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::BridgeParams;
use crate::graph::builder::ProblemGraph;
use crate::types::Problem;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeCandidate {
    pub problem_id: u32,
    pub aggregate_strength: f64,
    pub connected_problems: u32,
    pub coverage_bonus: f64,
    pub final_score: f64,
}

/// Scores `mastered` candidates against the struggling set and returns the
/// strongest bridges, capped at `min(max_bridge_problems, session_length,
/// available)`. Candidates connected to nothing are excluded outright.
///
/// `tag_decay` carries the cached per-tag decay scores; every candidate tag
/// below the staleness cutoff compounds the ×1.1 multiplier.
pub fn score_bridge_problems(
    struggling_ids: &[u32],
    mastered: &[Problem],
    graph: &ProblemGraph,
    tag_decay: &HashMap<String, f64>,
    session_length: usize,
    params: &BridgeParams,
) -> Vec<BridgeCandidate> {
    if struggling_ids.is_empty() {
        return Vec::new();
    }

    let mut candidates: Vec<BridgeCandidate> = mastered
        .iter()
        .filter_map(|candidate| {
            let mut aggregate_strength = 0.0;
            let mut connected_problems = 0u32;

            for edge in graph.edges(candidate.id) {
                if struggling_ids.contains(&edge.problem_id)
                    && edge.strength >= params.strength_floor
                {
                    aggregate_strength += edge.strength;
                    connected_problems += 1;
                }
            }

            if connected_problems == 0 {
                return None;
            }

            let coverage_bonus = connected_problems as f64 / struggling_ids.len() as f64;
            let mut final_score = aggregate_strength * (1.0 + coverage_bonus);

            for tag in &candidate.tags {
                if tag_decay
                    .get(tag)
                    .map(|decay| *decay < params.stale_decay_cutoff)
                    .unwrap_or(false)
                {
                    final_score *= params.staleness_multiplier;
                }
            }

            Some(BridgeCandidate {
                problem_id: candidate.id,
                aggregate_strength,
                connected_problems,
                coverage_bonus,
                final_score,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.problem_id.cmp(&b.problem_id))
    });

    let cap = params
        .max_bridge_problems
        .min(session_length)
        .min(candidates.len());
    candidates.truncate(cap);
    candidates
}
