pub mod composer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use codemaster_algo::types::{Difficulty, Problem, PromotionType};

/// One composed practice session. Built fresh per request; guard rails
/// mutate the problem lists before the composition is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionComposition {
    pub session_id: String,
    pub user_id: String,
    pub review_problems: Vec<Problem>,
    pub new_problems: Vec<Problem>,
    pub session_length: usize,
    pub difficulty_cap: Difficulty,
    pub promotion_type: PromotionType,
    pub created_at: DateTime<Utc>,
}

impl SessionComposition {
    /// Review problems first, then new/backfill in fetched order.
    pub fn problems(&self) -> Vec<Problem> {
        self.review_problems
            .iter()
            .chain(self.new_problems.iter())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.review_problems.len() + self.new_problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
