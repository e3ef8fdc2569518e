//! Problem relationship graph: construction, trimming, restoration, path
//! scoring, and bridge-problem ranking.

pub mod bridge;
pub mod builder;
pub mod path;

pub use bridge::{score_bridge_problems, BridgeCandidate};
pub use builder::{
    calculate_and_trim_problem_relationships, restore_missing_problem_relationships,
    tag_similarity, ProblemGraph, RelatedProblem,
};
pub use path::{calculate_optimal_path_score, PathScoreError, PathScoringCache, PathScoringState};
