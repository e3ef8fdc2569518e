use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub log_level: String,
    /// Share of a session reserved for review problems (floored).
    pub review_ratio: f64,
    pub default_session_length: usize,
    pub relationship_limit: usize,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            review_ratio: 0.4,
            default_session_length: 7,
            relationship_limit: 6,
            cache_capacity: 256,
            cache_ttl: Duration::from_secs(10 * 60),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        if let Ok(val) = std::env::var("ENGINE_SESSION_LENGTH") {
            if let Ok(parsed) = val.parse::<usize>() {
                config.default_session_length = parsed.max(1);
            }
        }
        if let Ok(val) = std::env::var("ENGINE_RELATIONSHIP_LIMIT") {
            if let Ok(parsed) = val.parse::<usize>() {
                config.relationship_limit = parsed.max(1);
            }
        }
        if let Ok(val) = std::env::var("ENGINE_CACHE_CAPACITY") {
            if let Ok(parsed) = val.parse::<usize>() {
                config.cache_capacity = parsed.max(1);
            }
        }
        if let Ok(val) = std::env::var("ENGINE_CACHE_TTL_SECS") {
            if let Ok(parsed) = val.parse::<u64>() {
                config.cache_ttl = Duration::from_secs(parsed.max(1));
            }
        }

        config
    }
}
