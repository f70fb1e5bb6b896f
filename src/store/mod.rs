// src/store/mod.rs

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::AppError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Device-scoped key/value store that survives a restart of the gateway.
///
/// Written only by the session controller.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    async fn remove(&self, key: &str) -> Result<(), AppError>;
}

/// Store keys owned by one exam session.
#[derive(Debug, Clone)]
pub struct SessionKeys {
    pub start: String,
    pub deadline: String,
    pub answers: String,
    /// Candidate who started the attempt.
    pub owner: String,
}

impl SessionKeys {
    pub fn for_exam(exam_id: &str) -> Self {
        Self {
            start: format!("exam:{}:start", exam_id),
            deadline: format!("exam:{}:deadline", exam_id),
            answers: format!("exam:{}:answers", exam_id),
            owner: format!("exam:{}:owner", exam_id),
        }
    }

    pub fn all(&self) -> [&str; 4] {
        [&self.start, &self.deadline, &self.answers, &self.owner]
    }
}
