use crate::stores::StoreError;

/// Engine-level failures. Store errors pass through unchanged; the engine
/// never swallows or retries transport problems.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid session request: {0}")]
    InvalidRequest(String),
}
