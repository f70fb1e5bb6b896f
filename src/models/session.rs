// src/models/session.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::question::PublicQuestion;

/// Lifecycle of one candidate's attempt at one exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    InProgress,
    /// Time ran out, submission not yet dispatched.
    Expired,
    Submitting,
    Submitted,
}

impl SessionState {
    /// States from which a submission may still proceed.
    pub fn accepts_submit(self) -> bool {
        matches!(self, SessionState::InProgress | SessionState::Expired)
    }
}

/// Snapshot of a session handed to the exam page.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub exam_id: String,
    pub state: SessionState,
    pub started_at: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub duration_seconds: u64,
    pub remaining_seconds: u64,

    /// Only populated while the candidate is allowed to see the questions.
    pub questions: Vec<PublicQuestion>,
    pub answers: BTreeMap<String, String>,
}

/// One entry of the payload delivered to the submission sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub answer_text: String,
}

/// Question id -> answer, only for questions with a non-empty answer.
pub type AnswerPayload = BTreeMap<String, SubmittedAnswer>;

/// Body of `POST /exams/{exam_id}/answers` on the remote API.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitAnswersBody {
    pub answers: AnswerPayload,
}

/// DTO for recording one answer.
#[derive(Debug, Deserialize, Validate)]
pub struct SetAnswerRequest {
    #[validate(length(min = 1, max = 128, message = "Question id must be 1-128 characters."))]
    pub question_id: String,

    /// Free text, not validated.
    pub text: String,
}

/// DTO for a manual submission. `confirmed` carries the candidate's answer
/// to the confirmation dialog.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub confirmed: bool,
}

/// What became of a submission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    Submitted,
    /// The candidate declined the confirmation prompt.
    Declined,
    /// Another trigger got there first, or the session was never started.
    Ignored,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub outcome: SubmitOutcome,
    pub session: SessionView,
}

/// Cheap countdown poll.
#[derive(Debug, Serialize)]
pub struct RemainingResponse {
    pub state: SessionState,
    pub remaining_seconds: u64,
}
