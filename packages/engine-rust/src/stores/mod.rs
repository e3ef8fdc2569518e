//! Injected store collaborators.
//!
//! The engine does not own persistence; the extension side provides a
//! problem catalog, a review schedule, tag-mastery aggregates, and a session
//! document store behind these traits. Errors propagate to the caller
//! unchanged; retry and backoff belong to the store implementations.

pub mod memory;

use std::collections::HashSet;

use async_trait::async_trait;

use codemaster_algo::escape_hatch::EscapeHatchState;
use codemaster_algo::types::{Problem, TagMastery};

use crate::session::SessionComposition;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("store backend failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ProblemStore: Send + Sync {
    /// Full problem catalog.
    async fn fetch_all_problems(&self) -> Result<Vec<Problem>, StoreError>;

    /// Up to `count` problems not present in `exclude_ids`.
    async fn fetch_additional_problems(
        &self,
        count: usize,
        exclude_ids: &HashSet<u32>,
    ) -> Result<Vec<Problem>, StoreError>;

    /// Problems the user keeps failing; input to bridge scoring.
    async fn problems_with_high_failures(&self) -> Result<Vec<Problem>, StoreError>;
}

#[async_trait]
pub trait ScheduleService: Send + Sync {
    /// Review problems due today, bounded by `count`, in due-priority order.
    async fn daily_review_schedule(&self, count: usize) -> Result<Vec<Problem>, StoreError>;
}

#[async_trait]
pub trait TagMasteryStore: Send + Sync {
    async fn tag_mastery(&self) -> Result<Vec<TagMastery>, StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_session(&self, session: &SessionComposition) -> Result<(), StoreError>;

    async fn load_escape_hatch_state(
        &self,
        user_id: &str,
    ) -> Result<Option<EscapeHatchState>, StoreError>;

    async fn save_escape_hatch_state(
        &self,
        user_id: &str,
        state: &EscapeHatchState,
    ) -> Result<(), StoreError>;
}
