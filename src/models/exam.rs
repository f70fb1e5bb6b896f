// src/models/exam.rs

use serde::{Deserialize, Serialize};

use crate::models::question::Question;

/// Completion status reported by the exam data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamStatus {
    Pending,
    Completed,
}

/// Exam metadata as returned by `GET /exams/{exam_id}` on the remote API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamDefinition {
    pub questions: Vec<Question>,
    pub status: ExamStatus,

    /// Allotted time. Falls back to the configured default when absent.
    #[serde(default)]
    pub duration_seconds: Option<u64>,
}

impl ExamDefinition {
    pub fn is_completed(&self) -> bool {
        self.status == ExamStatus::Completed
    }
}
