// src/services/mod.rs

//! Collaborators consumed by the session controller.

pub mod exam_api;
pub mod prompt;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{exam::ExamDefinition, session::AnswerPayload},
};

pub use exam_api::HttpExamApi;
pub use prompt::{ConfirmationPrompt, RequestConfirmation};

/// Supplies exam metadata and prior completion status.
#[async_trait]
pub trait ExamSource: Send + Sync {
    /// Returns `AppError::NotFound` for unknown exams and
    /// `AppError::Upstream` when the source cannot be reached.
    async fn get_exam(&self, exam_id: &str) -> Result<ExamDefinition, AppError>;
}

/// Accepts the final answers of an attempt.
///
/// Fire-and-forget: the caller never waits for delivery, so implementations
/// own their retries and their error logging.
pub trait SubmissionSink: Send + Sync {
    fn submit(&self, exam_id: &str, answers: AnswerPayload);
}
