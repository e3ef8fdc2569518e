use std::time::Duration;

pub const SESSION_TTL: Duration = Duration::from_secs(10 * 60);
pub const TAG_MASTERY_TTL: Duration = Duration::from_secs(5 * 60);
pub const PATH_SCORE_TTL: Duration = Duration::from_secs(30 * 60);
pub const MESSAGES_TTL: Duration = Duration::from_secs(10 * 60);

pub fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

pub fn tag_mastery_key(user_id: &str) -> String {
    format!("user:{}:tag-mastery", user_id)
}

pub fn path_scores_key(user_id: &str) -> String {
    format!("user:{}:path-scores", user_id)
}

pub fn adaptation_messages_key(user_id: &str, session_id: &str) -> String {
    format!("user:{}:session:{}:messages", user_id, session_id)
}
