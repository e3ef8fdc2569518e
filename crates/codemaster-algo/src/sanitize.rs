//! Problem-record normalization.
//!
//! The extension store hands over loosely-shaped JSON records; this module
//! turns them into typed [`Problem`]s or fails loudly with a descriptive
//! error. Batch normalization wraps each failure with the offending index.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::types::{AttemptStats, Difficulty, Problem, MAX_BOX_LEVEL};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProblemRecordError {
    #[error("missing both leetcode_id and id")]
    MissingId,
    #[error("missing title")]
    MissingTitle,
    #[error("missing difficulty")]
    MissingDifficulty,
    #[error("invalid difficulty `{0}`")]
    InvalidDifficulty(String),
    #[error("missing tags")]
    MissingTags,
    #[error("problem at index {index}: {source}")]
    AtIndex {
        index: usize,
        #[source]
        source: Box<ProblemRecordError>,
    },
}

pub fn normalize_problem(record: &Value) -> Result<Problem, ProblemRecordError> {
    let id = record
        .get("leetcode_id")
        .or_else(|| record.get("id"))
        .and_then(Value::as_u64)
        .ok_or(ProblemRecordError::MissingId)?;

    let title = record
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .ok_or(ProblemRecordError::MissingTitle)?;

    let raw_difficulty = record
        .get("difficulty")
        .and_then(Value::as_str)
        .ok_or(ProblemRecordError::MissingDifficulty)?;
    let difficulty = Difficulty::try_parse(raw_difficulty)
        .ok_or_else(|| ProblemRecordError::InvalidDifficulty(raw_difficulty.to_string()))?;

    let tags = record
        .get("tags")
        .and_then(Value::as_array)
        .filter(|t| !t.is_empty())
        .ok_or(ProblemRecordError::MissingTags)?
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();

    let box_level = record
        .get("boxLevel")
        .and_then(Value::as_u64)
        .map(|b| b.min(u64::from(MAX_BOX_LEVEL)) as u8)
        .unwrap_or(0);

    let attempt_stats = record
        .get("attemptStats")
        .map(|stats| {
            let total = stats
                .get("totalAttempts")
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32;
            let successful = stats
                .get("successfulAttempts")
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32;
            AttemptStats {
                total_attempts: total,
                successful_attempts: successful.min(total),
            }
        })
        .unwrap_or_default();

    let last_attempt_date = record
        .get("lastAttemptDate")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(Problem {
        id: id as u32,
        title: title.to_string(),
        difficulty,
        tags,
        box_level,
        attempt_stats,
        last_attempt_date,
    })
}

pub fn normalize_problems(records: &[Value]) -> Result<Vec<Problem>, ProblemRecordError> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            normalize_problem(record).map_err(|source| ProblemRecordError::AtIndex {
                index,
                source: Box::new(source),
            })
        })
        .collect()
}
