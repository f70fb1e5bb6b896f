// src/models/question.rs

use serde::{Deserialize, Serialize};

use crate::utils::html::clean_html;

/// A question as served by the exam data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,

    /// The text content of the question. May contain markup.
    pub content: String,

    /// Difficulty label assigned by the exam author (e.g. 'easy', 'hard').
    #[serde(default)]
    pub difficulty: Option<String>,
}

/// DTO for sending a question to the exam page.
/// Content is sanitized since it originates from another system.
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: String,
    pub content: String,
    pub difficulty: Option<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            content: clean_html(&q.content),
            difficulty: q.difficulty.clone(),
        }
    }
}
