//! # codemaster-algo - Adaptive practice core algorithms
//!
//! Pure, synchronous algorithms behind the CodeMaster practice engine:
//!
//! - **Mastery Calculator** - per-tag mastery verdicts with progressive
//!   escape-hatch thresholds and a staleness-sensitive decay score
//! - **Adaptive Threshold Engine** - context-specific threshold relaxation
//!   driven by struggle-history counters
//! - **Escape Hatch Detector** - session, attempt, and time based relaxation
//!   for tags stuck below the mastery bar
//! - **Relationship Graph** - tag-similarity problem graph with per-node
//!   trimming, restoration, path scoring, and bridge-problem ranking
//! - **Guard Rails** - post-composition difficulty balancing rules
//! - **Leitner** - box promotion, demotion, and time-decay recalibration
//!
//! Everything here is deterministic and free of I/O; the async engine crate
//! wires these functions to the problem, schedule, and session stores.

pub mod config;
pub mod escape_hatch;
pub mod graph;
pub mod guard_rails;
pub mod leitner;
pub mod mastery;
pub mod sanitize;
pub mod thresholds;
pub mod types;

pub use config::{BridgeParams, GraphParams, GuardRailParams};
pub use escape_hatch::{
    calculate_adjusted_threshold, detect_applicable_escape_hatches, EscapeHatchReport,
    EscapeHatchState, ThresholdKind,
};
pub use graph::bridge::{score_bridge_problems, BridgeCandidate};
pub use graph::builder::{
    calculate_and_trim_problem_relationships, restore_missing_problem_relationships,
    tag_similarity, ProblemGraph, RelatedProblem,
};
pub use graph::path::{calculate_optimal_path_score, PathScoringCache, PathScoringState};
pub use guard_rails::{apply_safety_guard_rails, GuardRailKind, GuardRailOutcome};
pub use mastery::{calculate_mastery_status, EscapeHatchTier, MasteryStatus};
pub use thresholds::{
    calculate_adaptive_thresholds, reset_struggle_history, update_struggle_history,
    BaseThresholds, DifficultyThresholds, ExpansionThresholds, MasteryThresholds,
    StruggleHistory, ThresholdAdjustment, ThresholdContext,
};
pub use types::{
    Attempt, AttemptStats, Difficulty, Problem, PromotionType, RecentPerformance, TagMastery,
};
