//! Relationship graph builder.
//!
//! Edges are derived from tag similarity and constrained by difficulty
//! ordering: an edge only points toward an equal-or-harder problem, never
//! "down" to an easier one. Each node's adjacency list is trimmed to a
//! per-node limit; edges cut by trimming move to a secondary index so
//! restoration never has to recompute similarity.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::GraphParams;
use crate::types::Problem;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedProblem {
    pub problem_id: u32,
    pub strength: f64,
}

/// Adjacency map plus the removed-edge side table. Every known problem has
/// a graph entry, including ones with no valid edges.
#[derive(Debug, Clone, Default)]
pub struct ProblemGraph {
    pub graph: HashMap<u32, Vec<RelatedProblem>>,
    pub removed: HashMap<u32, Vec<RelatedProblem>>,
}

impl ProblemGraph {
    pub fn edges(&self, problem_id: u32) -> &[RelatedProblem] {
        self.graph
            .get(&problem_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Shared-tag similarity, symmetric, 4.0 for identical tag sets and 0 for
/// disjoint ones. Crosses 2.0 exactly when half of the combined tags are
/// shared, which is the floor the bridge scorer filters on.
pub fn tag_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.iter().filter(|t| b.contains(*t)).count();
    if shared == 0 {
        return 0.0;
    }
    (shared as f64 * 2.0 / (a.len() + b.len()) as f64) * 4.0
}

pub fn calculate_and_trim_problem_relationships<'a, I>(problems: I, limit: usize) -> ProblemGraph
where
    I: IntoIterator<Item = &'a Problem>,
{
    let problems: Vec<&Problem> = problems.into_iter().collect();
    let mut graph = ProblemGraph::default();

    for p1 in &problems {
        let mut edges: Vec<RelatedProblem> = Vec::new();
        for p2 in &problems {
            if p1.id == p2.id {
                continue;
            }
            let similarity = tag_similarity(&p1.tags, &p2.tags);
            if similarity > 0.0 && p1.difficulty.rank() <= p2.difficulty.rank() {
                edges.push(RelatedProblem {
                    problem_id: p2.id,
                    strength: similarity,
                });
            }
        }

        edges.sort_by(|a, b| {
            b.strength
                .partial_cmp(&a.strength)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.problem_id.cmp(&b.problem_id))
        });

        if edges.len() > limit {
            let overflow = edges.split_off(limit);
            graph.removed.insert(p1.id, overflow);
        }
        graph.graph.insert(p1.id, edges);
    }

    graph
}

/// Re-links orphaned nodes: first refill from the removed-edge side table,
/// then fall back to pairing with any same-tagged peer so every problem
/// keeps at least one outgoing edge when a peer exists. The fallback
/// ignores the difficulty-ordering constraint on purpose; an orphan with
/// only easier peers still needs somewhere to point.
pub fn restore_missing_problem_relationships<'a, I>(
    problems: I,
    graph: &mut ProblemGraph,
    params: &GraphParams,
) where
    I: IntoIterator<Item = &'a Problem>,
{
    let problems: Vec<&Problem> = problems.into_iter().collect();

    for problem in &problems {
        let orphaned = graph.edges(problem.id).is_empty();
        if !orphaned {
            continue;
        }

        if let Some(removed) = graph.removed.remove(&problem.id) {
            if !removed.is_empty() {
                graph.graph.insert(problem.id, removed);
                continue;
            }
        }

        if let Some(peer) = problems
            .iter()
            .find(|other| other.id != problem.id && problem.shares_tag_with(other))
        {
            graph.graph.insert(
                problem.id,
                vec![RelatedProblem {
                    problem_id: peer.id,
                    strength: params.fallback_strength,
                }],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Difficulty;

    fn problem(id: u32, difficulty: Difficulty, tags: &[&str]) -> Problem {
        Problem {
            id,
            title: format!("problem {id}"),
            difficulty,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            box_level: 0,
            attempt_stats: Default::default(),
            last_attempt_date: None,
        }
    }

    #[test]
    fn identical_tag_sets_score_four() {
        let a = problem(1, Difficulty::Easy, &["dp"]);
        let b = problem(2, Difficulty::Easy, &["dp"]);
        assert_eq!(tag_similarity(&a.tags, &b.tags), 4.0);
    }

    #[test]
    fn half_shared_tags_score_two() {
        let a = problem(1, Difficulty::Easy, &["dp", "arrays"]);
        let b = problem(2, Difficulty::Easy, &["dp", "graphs"]);
        assert_eq!(tag_similarity(&a.tags, &b.tags), 2.0);
    }

    #[test]
    fn no_self_edges_ever() {
        let problems = vec![
            problem(1, Difficulty::Easy, &["dp"]),
            problem(2, Difficulty::Medium, &["dp"]),
            problem(3, Difficulty::Hard, &["dp"]),
        ];
        let graph = calculate_and_trim_problem_relationships(&problems, 10);
        for (source, edges) in &graph.graph {
            assert!(
                edges.iter().all(|e| e.problem_id != *source),
                "node {source} points at itself"
            );
        }
    }

    #[test]
    fn edges_never_point_to_easier_problems() {
        let problems = vec![
            problem(1, Difficulty::Hard, &["dp"]),
            problem(2, Difficulty::Easy, &["dp"]),
            problem(3, Difficulty::Medium, &["dp"]),
        ];
        let graph = calculate_and_trim_problem_relationships(&problems, 10);

        assert!(graph.edges(1).is_empty(), "hard has no equal-or-harder peer");
        let easy_targets: Vec<u32> = graph.edges(2).iter().map(|e| e.problem_id).collect();
        assert_eq!(easy_targets, vec![1, 3], "easy points everywhere upward");
        assert_eq!(
            graph.edges(3).iter().map(|e| e.problem_id).collect::<Vec<_>>(),
            vec![1]
        );
    }

    #[test]
    fn every_problem_gets_an_entry_even_without_edges() {
        let problems = vec![
            problem(1, Difficulty::Easy, &["dp"]),
            problem(2, Difficulty::Easy, &["strings"]),
        ];
        let graph = calculate_and_trim_problem_relationships(&problems, 10);
        assert_eq!(graph.graph.len(), 2);
        assert!(graph.edges(1).is_empty());
        assert!(graph.edges(2).is_empty());
    }

    #[test]
    fn trimming_respects_limit_and_keeps_removed_edges() {
        let problems = vec![
            problem(1, Difficulty::Easy, &["dp", "arrays"]),
            problem(2, Difficulty::Medium, &["dp", "arrays"]),
            problem(3, Difficulty::Medium, &["dp"]),
            problem(4, Difficulty::Hard, &["arrays"]),
        ];
        let graph = calculate_and_trim_problem_relationships(&problems, 1);

        for edges in graph.graph.values() {
            assert!(edges.len() <= 1);
        }
        // Node 1 had three candidates; the strongest (identical tags, 4.0)
        // survives and the rest land in the side table.
        assert_eq!(graph.edges(1)[0].problem_id, 2);
        let removed = graph.removed.get(&1).expect("overflow retained");
        assert_eq!(removed.len(), 2);
    }

    #[test]
    fn restoration_refills_from_removed_before_fabricating() {
        let problems = vec![
            problem(1, Difficulty::Easy, &["dp", "arrays"]),
            problem(2, Difficulty::Medium, &["dp", "arrays"]),
            problem(3, Difficulty::Medium, &["dp"]),
        ];
        let mut graph = calculate_and_trim_problem_relationships(&problems, 1);
        // Simulate an orphaned node whose edges were all trimmed away.
        let trimmed = graph.graph.insert(1, Vec::new());
        assert!(trimmed.is_some());

        restore_missing_problem_relationships(&problems, &mut graph, &GraphParams::default());
        let restored = graph.edges(1);
        assert!(!restored.is_empty());
        assert!(graph.removed.get(&1).is_none(), "side table entry consumed");
    }

    #[test]
    fn restoration_falls_back_to_same_tag_pairing() {
        // Hard problem with only an easier peer: the builder leaves it
        // orphaned, the fallback pairs it anyway.
        let problems = vec![
            problem(1, Difficulty::Hard, &["dp"]),
            problem(2, Difficulty::Easy, &["dp"]),
        ];
        let mut graph = calculate_and_trim_problem_relationships(&problems, 10);
        assert!(graph.edges(1).is_empty());

        let params = GraphParams::default();
        restore_missing_problem_relationships(&problems, &mut graph, &params);
        assert_eq!(graph.edges(1)[0].problem_id, 2);
        assert_eq!(graph.edges(1)[0].strength, params.fallback_strength);
    }

    #[test]
    fn restoration_leaves_tagless_orphans_alone() {
        let problems = vec![
            problem(1, Difficulty::Easy, &["dp"]),
            problem(2, Difficulty::Easy, &["strings"]),
        ];
        let mut graph = calculate_and_trim_problem_relationships(&problems, 10);
        restore_missing_problem_relationships(&problems, &mut graph, &GraphParams::default());
        assert!(graph.edges(1).is_empty(), "no same-tagged peer exists");
    }
}
