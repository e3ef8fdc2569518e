//! In-memory store implementations backing tests and the demo driver.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use codemaster_algo::escape_hatch::EscapeHatchState;
use codemaster_algo::leitner;
use codemaster_algo::types::{Problem, TagMastery};

use super::{ProblemStore, ScheduleService, SessionStore, StoreError, TagMasteryStore};
use crate::session::SessionComposition;

const HIGH_FAILURE_GATE: u32 = 3;

#[derive(Default)]
pub struct InMemoryProblemStore {
    problems: RwLock<Vec<Problem>>,
}

impl InMemoryProblemStore {
    pub fn new(problems: Vec<Problem>) -> Self {
        Self {
            problems: RwLock::new(problems),
        }
    }
}

#[async_trait]
impl ProblemStore for InMemoryProblemStore {
    async fn fetch_all_problems(&self) -> Result<Vec<Problem>, StoreError> {
        Ok(self.problems.read().clone())
    }

    async fn fetch_additional_problems(
        &self,
        count: usize,
        exclude_ids: &HashSet<u32>,
    ) -> Result<Vec<Problem>, StoreError> {
        Ok(self
            .problems
            .read()
            .iter()
            .filter(|p| !exclude_ids.contains(&p.id))
            .take(count)
            .cloned()
            .collect())
    }

    async fn problems_with_high_failures(&self) -> Result<Vec<Problem>, StoreError> {
        Ok(self
            .problems
            .read()
            .iter()
            .filter(|p| p.attempt_stats.failed_attempts() >= HIGH_FAILURE_GATE)
            .cloned()
            .collect())
    }
}

/// Schedules reviews straight off the problem list: most overdue first,
/// judged against each problem's Leitner interval.
pub struct InMemoryScheduleService {
    problems: RwLock<Vec<Problem>>,
}

impl InMemoryScheduleService {
    pub fn new(problems: Vec<Problem>) -> Self {
        Self {
            problems: RwLock::new(problems),
        }
    }
}

#[async_trait]
impl ScheduleService for InMemoryScheduleService {
    async fn daily_review_schedule(&self, count: usize) -> Result<Vec<Problem>, StoreError> {
        let now = chrono::Utc::now();
        let mut due: Vec<(i64, Problem)> = self
            .problems
            .read()
            .iter()
            .filter_map(|p| {
                let last = p.last_attempt_date?;
                let overdue =
                    (now - last).num_days() - leitner::review_interval_days(p.box_level);
                (overdue >= 0).then(|| (overdue, p.clone()))
            })
            .collect();
        due.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.id.cmp(&b.1.id)));
        Ok(due.into_iter().take(count).map(|(_, p)| p).collect())
    }
}

#[derive(Default)]
pub struct InMemoryTagMasteryStore {
    rows: RwLock<Vec<TagMastery>>,
}

impl InMemoryTagMasteryStore {
    pub fn new(rows: Vec<TagMastery>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }
}

#[async_trait]
impl TagMasteryStore for InMemoryTagMasteryStore {
    async fn tag_mastery(&self) -> Result<Vec<TagMastery>, StoreError> {
        Ok(self.rows.read().clone())
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionComposition>>,
    hatch_states: RwLock<HashMap<String, EscapeHatchState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn session(&self, session_id: &str) -> Option<SessionComposition> {
        self.sessions.read().get(session_id).cloned()
    }

    pub fn hatch_state(&self, user_id: &str) -> Option<EscapeHatchState> {
        self.hatch_states.read().get(user_id).cloned()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save_session(&self, session: &SessionComposition) -> Result<(), StoreError> {
        self.sessions
            .write()
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn load_escape_hatch_state(
        &self,
        user_id: &str,
    ) -> Result<Option<EscapeHatchState>, StoreError> {
        Ok(self.hatch_states.read().get(user_id).cloned())
    }

    async fn save_escape_hatch_state(
        &self,
        user_id: &str,
        state: &EscapeHatchState,
    ) -> Result<(), StoreError> {
        self.hatch_states
            .write()
            .insert(user_id.to_string(), state.clone());
        Ok(())
    }
}

/// Store that fails every call; exercises the propagation contract.
pub struct FailingProblemStore;

#[async_trait]
impl ProblemStore for FailingProblemStore {
    async fn fetch_all_problems(&self) -> Result<Vec<Problem>, StoreError> {
        Err(StoreError::Backend("catalog unavailable".to_string()))
    }

    async fn fetch_additional_problems(
        &self,
        _count: usize,
        _exclude_ids: &HashSet<u32>,
    ) -> Result<Vec<Problem>, StoreError> {
        Err(StoreError::Backend("catalog unavailable".to_string()))
    }

    async fn problems_with_high_failures(&self) -> Result<Vec<Problem>, StoreError> {
        Err(StoreError::Backend("catalog unavailable".to_string()))
    }
}
