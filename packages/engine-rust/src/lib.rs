pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod messages;
pub mod session;
pub mod stores;

pub use config::EngineConfig;
pub use error::EngineError;
pub use session::composer::{ComposedSession, SessionComposer, SessionRequest};
