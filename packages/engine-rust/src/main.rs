use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Utc};

use codemaster_algo::types::{AttemptStats, Difficulty, Problem, PromotionType, TagMastery};
use codemaster_engine_rust::config::EngineConfig;
use codemaster_engine_rust::logging;
use codemaster_engine_rust::session::composer::{SessionComposer, SessionRequest};
use codemaster_engine_rust::stores::memory::{
    InMemoryProblemStore, InMemoryScheduleService, InMemorySessionStore, InMemoryTagMasteryStore,
};

fn demo_catalog() -> Vec<Problem> {
    let tags = ["arrays", "dp", "graphs", "strings", "trees"];
    (1..=30u32)
        .map(|id| {
            let total = id % 7;
            Problem {
                id,
                title: format!("problem {id}"),
                difficulty: match id % 3 {
                    0 => Difficulty::Easy,
                    1 => Difficulty::Medium,
                    _ => Difficulty::Hard,
                },
                tags: [tags[id as usize % tags.len()].to_string()].into_iter().collect(),
                box_level: (id % 6) as u8,
                attempt_stats: AttemptStats {
                    total_attempts: total,
                    successful_attempts: total / 2,
                },
                last_attempt_date: Some(Utc::now() - Duration::days(i64::from(id % 20))),
            }
        })
        .collect()
}

fn demo_tag_mastery() -> Vec<TagMastery> {
    vec![
        TagMastery {
            tag: "arrays".to_string(),
            total_attempts: 20,
            successful_attempts: 17,
            decay_score: 0.4,
            mastery_threshold: 0.8,
            mastered: true,
            last_attempt_date: Some(Utc::now() - Duration::days(2)),
        },
        TagMastery {
            tag: "dp".to_string(),
            total_attempts: 49,
            successful_attempts: 32,
            decay_score: 2.1,
            mastery_threshold: 0.8,
            mastered: false,
            last_attempt_date: Some(Utc::now() - Duration::days(16)),
        },
    ]
}

#[tokio::main]
async fn main() {
    let config = EngineConfig::from_env();
    let _log_guard = logging::init_tracing(&config.log_level);

    let catalog = demo_catalog();
    let composer = SessionComposer::new(
        Arc::new(InMemoryProblemStore::new(catalog.clone())),
        Arc::new(InMemoryScheduleService::new(catalog)),
        Arc::new(InMemoryTagMasteryStore::new(demo_tag_mastery())),
        Arc::new(InMemorySessionStore::new()),
        config.clone(),
    );

    let request = SessionRequest {
        user_id: "demo-user".to_string(),
        session_length: config.default_session_length,
        number_of_new_problems: 4,
        allowed_tags: BTreeSet::new(),
        difficulty_cap: Difficulty::Hard,
        promotion_type: PromotionType::Standard,
        recent_performance: None,
        struggle_history: None,
    };

    match composer.compose_session(request).await {
        Ok(session) => {
            tracing::info!(
                session_id = %session.composition.session_id,
                review = session.composition.review_problems.len(),
                new = session.composition.new_problems.len(),
                bridges = session.bridge_problems.len(),
                "demo session composed"
            );
            for message in &session.messages {
                tracing::info!(title = %message.title, body = %message.message, "adaptation");
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "demo composition failed");
        }
    }
}
