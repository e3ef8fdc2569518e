use serde::{Deserialize, Serialize};

/// Per-node edge limit and fallback pairing strength for the relationship
/// graph builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphParams {
    pub relationship_limit: usize,
    pub fallback_strength: f64,
}

impl Default for GraphParams {
    fn default() -> Self {
        Self {
            relationship_limit: 6,
            fallback_strength: 1.0,
        }
    }
}

/// Bridge-problem scoring constants. Edges below `strength_floor` are
/// ignored entirely; they contribute neither strength nor coverage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeParams {
    pub strength_floor: f64,
    pub stale_decay_cutoff: f64,
    pub staleness_multiplier: f64,
    pub max_bridge_problems: usize,
}

impl Default for BridgeParams {
    fn default() -> Self {
        Self {
            strength_floor: 2.0,
            stale_decay_cutoff: 0.7,
            staleness_multiplier: 1.1,
            max_bridge_problems: 2,
        }
    }
}

/// Session guard-rail gates. The accuracy cutoff is exclusive: exactly 0.5
/// does not trigger the poor-performance rail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardRailParams {
    pub min_hard: usize,
    pub min_medium: usize,
    pub hard_session_min_len: usize,
    pub medium_session_min_len: usize,
    pub poor_accuracy_cutoff: f64,
}

impl Default for GuardRailParams {
    fn default() -> Self {
        Self {
            min_hard: 2,
            min_medium: 2,
            hard_session_min_len: 5,
            medium_session_min_len: 4,
            poor_accuracy_cutoff: 0.5,
        }
    }
}
