//! Session composition.
//!
//! Assembles review + new problem lists against the injected stores,
//! post-processes them with the safety guard rails, attaches bridge
//! problems for triggered review, and emits advisory messages. Store
//! errors propagate unchanged; concurrent compositions for one user are the
//! caller's job to serialize.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use codemaster_algo::config::{BridgeParams, GraphParams, GuardRailParams};
use codemaster_algo::escape_hatch::{detect_applicable_escape_hatches, EscapeHatchReport};
use codemaster_algo::graph::bridge::{score_bridge_problems, BridgeCandidate};
use codemaster_algo::graph::builder::{
    calculate_and_trim_problem_relationships, restore_missing_problem_relationships, ProblemGraph,
};
use codemaster_algo::graph::path::{
    calculate_optimal_path_score, PathScoringCache, PathScoringState,
};
use codemaster_algo::guard_rails::{apply_safety_guard_rails, GuardRailOutcome};
use codemaster_algo::thresholds::{
    calculate_adaptive_thresholds, BaseThresholds, MasteryThresholds, StruggleHistory,
};
use codemaster_algo::types::{Difficulty, Problem, PromotionType, RecentPerformance, TagMastery};

use crate::cache::{keys, EngineCache};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::messages::{
    generate_adaptation_messages, generate_escape_hatch_messages, generate_guard_rail_message,
    AdaptationMessage,
};
use crate::session::SessionComposition;
use crate::stores::{ProblemStore, ScheduleService, SessionStore, TagMasteryStore};

const MASTERED_RATIO_GATE: f64 = 0.8;
const MASTERED_MIN_ATTEMPTS: u32 = 3;
const PLATEAU_STRUGGLE_GATE: u32 = 3;

#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub user_id: String,
    pub session_length: usize,
    pub number_of_new_problems: usize,
    pub allowed_tags: BTreeSet<String>,
    pub difficulty_cap: Difficulty,
    pub promotion_type: PromotionType,
    pub recent_performance: Option<RecentPerformance>,
    pub struggle_history: Option<StruggleHistory>,
}

#[derive(Debug, Clone)]
pub struct ComposedSession {
    pub composition: SessionComposition,
    pub guard_rail: GuardRailOutcome,
    pub escape_hatches: EscapeHatchReport,
    pub bridge_problems: Vec<BridgeCandidate>,
    pub messages: Vec<AdaptationMessage>,
}

pub struct SessionComposer {
    problems: Arc<dyn ProblemStore>,
    schedule: Arc<dyn ScheduleService>,
    tag_mastery: Arc<dyn TagMasteryStore>,
    sessions: Arc<dyn SessionStore>,
    cache: EngineCache,
    config: EngineConfig,
    guard_rails: GuardRailParams,
    graph_params: GraphParams,
    bridge_params: BridgeParams,
}

impl SessionComposer {
    pub fn new(
        problems: Arc<dyn ProblemStore>,
        schedule: Arc<dyn ScheduleService>,
        tag_mastery: Arc<dyn TagMasteryStore>,
        sessions: Arc<dyn SessionStore>,
        config: EngineConfig,
    ) -> Self {
        let cache = EngineCache::new(config.cache_capacity);
        Self {
            problems,
            schedule,
            tag_mastery,
            sessions,
            cache,
            config,
            guard_rails: GuardRailParams::default(),
            graph_params: GraphParams::default(),
            bridge_params: BridgeParams::default(),
        }
    }

    /// Test/teardown reset for the composer-owned cache.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Assembles the raw problem list: review problems up to the review
    /// share, then new problems, then catalog backfill, truncated to
    /// exactly `session_length`.
    pub async fn fetch_and_assemble_session_problems(
        &self,
        session_length: usize,
        number_of_new_problems: usize,
        allowed_tags: &BTreeSet<String>,
        difficulty_cap: Difficulty,
    ) -> Result<Vec<Problem>, EngineError> {
        let (review, rest) = self
            .assemble(
                session_length,
                number_of_new_problems,
                allowed_tags,
                difficulty_cap,
                None,
            )
            .await?;
        Ok(review.into_iter().chain(rest).collect())
    }

    async fn assemble(
        &self,
        session_length: usize,
        number_of_new_problems: usize,
        allowed_tags: &BTreeSet<String>,
        difficulty_cap: Difficulty,
        scoring: Option<(&PathScoringState, &PathScoringCache)>,
    ) -> Result<(Vec<Problem>, Vec<Problem>), EngineError> {
        let review_target = (session_length as f64 * self.config.review_ratio).floor() as usize;
        // The bound is the request parameter; whatever the schedule service
        // actually returns is kept, up to the session length.
        let mut review = self.schedule.daily_review_schedule(review_target).await?;
        review.truncate(session_length);

        let mut exclude: HashSet<u32> = review.iter().map(|p| p.id).collect();
        let new_slots = session_length.saturating_sub(review.len());

        let mut fresh = self
            .problems
            .fetch_additional_problems(number_of_new_problems, &exclude)
            .await?;
        fresh.retain(|p| fits_session(p, allowed_tags, difficulty_cap));
        if fresh.len() > new_slots {
            fresh = select_by_path_score(fresh, new_slots, scoring);
        }
        exclude.extend(fresh.iter().map(|p| p.id));

        let mut rest = fresh;
        if review.len() + rest.len() < session_length {
            let catalog = self.problems.fetch_all_problems().await?;
            for problem in catalog {
                if review.len() + rest.len() >= session_length {
                    break;
                }
                if exclude.contains(&problem.id)
                    || problem.difficulty.rank() > difficulty_cap.rank()
                {
                    continue;
                }
                exclude.insert(problem.id);
                rest.push(problem);
            }
        }

        let overflow = (review.len() + rest.len()).saturating_sub(session_length);
        if overflow > 0 {
            rest.truncate(rest.len() - overflow);
        }

        debug!(
            review = review.len(),
            new = rest.len(),
            session_length,
            "assembled session problems"
        );
        Ok((review, rest))
    }

    /// Full composition pipeline: assembly, guard rails, escape hatches,
    /// bridge problems, messages, and persistence.
    pub async fn compose_session(
        &self,
        request: SessionRequest,
    ) -> Result<ComposedSession, EngineError> {
        if request.session_length == 0 {
            return Err(EngineError::InvalidRequest(
                "session length must be at least 1".to_string(),
            ));
        }
        if request.user_id.trim().is_empty() {
            return Err(EngineError::InvalidRequest("missing user id".to_string()));
        }

        let mut hatch_state = self
            .sessions
            .load_escape_hatch_state(&request.user_id)
            .await?
            .unwrap_or_default();
        let tag_mastery = self.cached_tag_mastery(&request.user_id).await?;

        let catalog = self.problems.fetch_all_problems().await?;
        let mut graph =
            calculate_and_trim_problem_relationships(&catalog, self.config.relationship_limit);
        restore_missing_problem_relationships(&catalog, &mut graph, &self.graph_params);

        let scoring_state = PathScoringState {
            recent_successful_ids: recent_successes(&catalog),
            tag_mastery: Some(
                tag_mastery
                    .iter()
                    .map(|m| (m.tag.clone(), m.clone()))
                    .collect(),
            ),
        };
        let scoring_cache = path_cache_from_graph(&graph, &request);

        let (mut review, mut rest) = self
            .assemble(
                request.session_length,
                request.number_of_new_problems,
                &request.allowed_tags,
                request.difficulty_cap,
                Some((&scoring_state, &scoring_cache)),
            )
            .await?;

        let assembled: Vec<Problem> = review.iter().chain(rest.iter()).cloned().collect();
        let guard_rail = apply_safety_guard_rails(
            &assembled,
            request.difficulty_cap,
            hatch_state.sessions_at_current_difficulty,
            request.recent_performance.as_ref(),
            request.promotion_type,
            &self.guard_rails,
        );
        if guard_rail.needs_rebalance {
            info!(
                rail = guard_rail.guard_rail.map(|r| r.as_str()).unwrap_or(""),
                "guard rail triggered; rebalancing session"
            );
            self.rebalance(&mut review, &mut rest, &guard_rail).await?;
        }

        let escape_hatches = detect_applicable_escape_hatches(
            &hatch_state,
            &tag_mastery,
            &request.allowed_tags.iter().cloned().collect::<Vec<_>>(),
        );
        for key in escape_hatches.activation_keys() {
            hatch_state.record_activation(key);
        }
        hatch_state.sessions_at_current_difficulty += 1;
        self.sessions
            .save_escape_hatch_state(&request.user_id, &hatch_state)
            .await?;

        let struggling_ids: Vec<u32> = self
            .problems
            .problems_with_high_failures()
            .await?
            .iter()
            .map(|p| p.id)
            .collect();
        let mastered_pool: Vec<Problem> = catalog
            .iter()
            .filter(|p| {
                p.attempt_stats.total_attempts >= MASTERED_MIN_ATTEMPTS
                    && p.attempt_stats.success_ratio() >= MASTERED_RATIO_GATE
            })
            .cloned()
            .collect();
        let tag_decay: HashMap<String, f64> = tag_mastery
            .iter()
            .map(|m| (m.tag.clone(), m.decay_score))
            .collect();
        let bridge_problems = score_bridge_problems(
            &struggling_ids,
            &mastered_pool,
            &graph,
            &tag_decay,
            request.session_length,
            &self.bridge_params,
        );

        let adjustment = calculate_adaptive_thresholds(
            &BaseThresholds::Mastery(MasteryThresholds::default()),
            request.struggle_history.as_ref(),
        );
        let mut messages = generate_adaptation_messages(&adjustment);
        messages.extend(generate_escape_hatch_messages(&escape_hatches));
        messages.extend(generate_guard_rail_message(&guard_rail));

        let composition = SessionComposition {
            session_id: Uuid::new_v4().to_string(),
            user_id: request.user_id.clone(),
            review_problems: review,
            new_problems: rest,
            session_length: request.session_length,
            difficulty_cap: request.difficulty_cap,
            promotion_type: request.promotion_type,
            created_at: Utc::now(),
        };
        self.sessions.save_session(&composition).await?;
        self.cache.set(
            &keys::adaptation_messages_key(&request.user_id, &composition.session_id),
            &messages,
            keys::MESSAGES_TTL,
        );

        info!(
            session_id = %composition.session_id,
            problems = composition.len(),
            bridges = bridge_problems.len(),
            messages = messages.len(),
            "session composed"
        );

        Ok(ComposedSession {
            composition,
            guard_rail,
            escape_hatches,
            bridge_problems,
            messages,
        })
    }

    async fn cached_tag_mastery(&self, user_id: &str) -> Result<Vec<TagMastery>, EngineError> {
        let key = keys::tag_mastery_key(user_id);
        if let Some(rows) = self.cache.get::<Vec<TagMastery>>(&key) {
            return Ok(rows);
        }
        let rows = self.tag_mastery.tag_mastery().await?;
        self.cache.set(&key, &rows, keys::TAG_MASTERY_TTL);
        Ok(rows)
    }

    /// Applies the correction a triggered guard rail asks for. Swaps happen
    /// at the tail of the new-problem list first; review problems are only
    /// touched when nothing else is left.
    async fn rebalance(
        &self,
        review: &mut Vec<Problem>,
        rest: &mut Vec<Problem>,
        outcome: &GuardRailOutcome,
    ) -> Result<(), EngineError> {
        let exclude: HashSet<u32> = review
            .iter()
            .chain(rest.iter())
            .map(|p| p.id)
            .collect();

        if let (Some(excess), Some(replacement)) =
            (outcome.excess_hard, outcome.replacement_difficulty)
        {
            let mut replacements: Vec<Problem> = self
                .problems
                .fetch_additional_problems(excess, &exclude)
                .await?
                .into_iter()
                .filter(|p| p.difficulty == replacement)
                .collect();

            // Swapping exactly `excess` hard problems from the tail leaves
            // the front-most hard problem in place.
            let mut remaining = excess.min(replacements.len());
            for list in [&mut *rest, &mut *review] {
                let mut index = list.len();
                while index > 0 && remaining > 0 {
                    index -= 1;
                    if list[index].difficulty != Difficulty::Hard {
                        continue;
                    }
                    if let Some(swap) = replacements.pop() {
                        list[index] = swap;
                        remaining -= 1;
                    }
                }
            }
            return Ok(());
        }

        if let Some(target) = outcome.target {
            let current = review
                .iter()
                .chain(rest.iter())
                .filter(|p| p.difficulty == target.difficulty)
                .count();
            let needed = target.count.saturating_sub(current);
            if needed == 0 {
                return Ok(());
            }

            let mut candidates: Vec<Problem> = self
                .problems
                .fetch_all_problems()
                .await?
                .into_iter()
                .filter(|p| p.difficulty == target.difficulty && !exclude.contains(&p.id))
                .take(needed)
                .collect();

            // Evict the easiest problems from the tail to make room.
            for difficulty in [Difficulty::Easy, Difficulty::Medium] {
                if difficulty == target.difficulty {
                    continue;
                }
                for list in [&mut *rest, &mut *review] {
                    let mut index = list.len();
                    while index > 0 && !candidates.is_empty() {
                        index -= 1;
                        if list[index].difficulty == difficulty {
                            if let Some(swap) = candidates.pop() {
                                list[index] = swap;
                            }
                        }
                    }
                }
                if candidates.is_empty() {
                    break;
                }
            }
        }

        Ok(())
    }
}

fn fits_session(problem: &Problem, allowed_tags: &BTreeSet<String>, cap: Difficulty) -> bool {
    if problem.difficulty.rank() > cap.rank() {
        return false;
    }
    allowed_tags.is_empty() || problem.tags.iter().any(|t| allowed_tags.contains(t))
}

/// Keeps the `slots` best-scoring problems, preserving fetch order among the
/// survivors so ties fall back to store priority.
fn select_by_path_score(
    fresh: Vec<Problem>,
    slots: usize,
    scoring: Option<(&PathScoringState, &PathScoringCache)>,
) -> Vec<Problem> {
    let Some((state, cache)) = scoring else {
        let mut fresh = fresh;
        fresh.truncate(slots);
        return fresh;
    };

    let mut ranked: Vec<(usize, f64)> = fresh
        .iter()
        .enumerate()
        .map(|(index, problem)| (index, calculate_optimal_path_score(Some(problem), state, cache)))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    let mut chosen: Vec<usize> = ranked.into_iter().take(slots).map(|(i, _)| i).collect();
    chosen.sort_unstable();

    let mut by_index: Vec<Option<Problem>> = fresh.into_iter().map(Some).collect();
    chosen
        .into_iter()
        .filter_map(|i| by_index[i].take())
        .collect()
}

/// Proxy for "recent successes": problems already promoted into the upper
/// Leitner boxes.
fn recent_successes(catalog: &[Problem]) -> Vec<u32> {
    catalog
        .iter()
        .filter(|p| p.box_level >= 5 && p.attempt_stats.successful_attempts > 0)
        .map(|p| p.id)
        .collect()
}

fn path_cache_from_graph(graph: &ProblemGraph, request: &SessionRequest) -> PathScoringCache {
    let mut relationship_map = HashMap::new();
    for (from, edges) in &graph.graph {
        for edge in edges {
            relationship_map.insert(
                PathScoringCache::relationship_key(*from, edge.problem_id),
                edge.strength,
            );
        }
    }
    PathScoringCache {
        relationship_map,
        is_plateauing: request
            .struggle_history
            .as_ref()
            .map(|h| h.consecutive_struggles >= PLATEAU_STRUGGLE_GATE)
            .unwrap_or(false),
    }
}

