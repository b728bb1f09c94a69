use async_trait::async_trait;
use thiserror::Error;

use sumika_core::session::{SessionId, SessionState};

pub mod action_log;
pub mod memory;
pub mod property;
pub mod session;

pub use action_log::SqlActionLogRepository;
pub use memory::{InMemoryPropertyStore, InMemorySessionStore};
pub use property::SqlPropertyRepository;
pub use session::SqlSessionStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Session snapshot persistence. A snapshot is written back atomically at
/// turn end and is the only place session state lives between turns.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &SessionId) -> Result<Option<SessionState>, RepositoryError>;
    async fn save(&self, state: &SessionState) -> Result<(), RepositoryError>;
}
