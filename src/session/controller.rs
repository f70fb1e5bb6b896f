// src/session/controller.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::{
    clock::Clock,
    error::AppError,
    models::{
        question::{PublicQuestion, Question},
        session::{AnswerPayload, SessionState, SessionView, SubmitOutcome, SubmittedAnswer},
    },
    services::{ExamSource, SubmissionSink},
    store::{DurableStore, SessionKeys},
};

/// What the store remembers about a started attempt.
struct Persisted {
    started_at: DateTime<Utc>,
    owner: Option<String>,
    answers: BTreeMap<String, String>,
}

/// Everything a session needs from the outside world.
#[derive(Clone)]
pub struct SessionServices {
    pub source: Arc<dyn ExamSource>,
    pub sink: Arc<dyn SubmissionSink>,
    pub store: Arc<dyn DurableStore>,
    pub clock: Arc<dyn Clock>,
    pub default_duration_secs: u64,
}

/// One candidate's attempt at one timed exam.
///
/// The deadline is always derived from the persisted start time, so the
/// countdown stays correct across restarts and suspended timers.
pub struct SessionController {
    exam_id: String,
    keys: SessionKeys,
    state: SessionState,
    started_at: Option<DateTime<Utc>>,
    /// Candidate who started the attempt. Fixed once in progress.
    owner: Option<String>,
    duration_secs: u64,
    questions: Vec<Question>,
    answers: BTreeMap<String, String>,
    services: SessionServices,
}

impl SessionController {
    /// Builds the session for `exam_id` from the exam source and whatever the
    /// durable store remembers about a previous start.
    ///
    /// Never writes to the store, so calling it repeatedly before `start`
    /// cannot allocate a start time.
    pub async fn load(exam_id: &str, services: SessionServices) -> Result<Self, AppError> {
        let exam = services.source.get_exam(exam_id).await.map_err(|e| {
            tracing::warn!("Failed to load exam {}: {}", exam_id, e);
            e
        })?;

        let duration_secs = exam
            .duration_seconds
            .unwrap_or(services.default_duration_secs);
        let completed = exam.is_completed();

        let mut session = Self {
            exam_id: exam_id.to_string(),
            keys: SessionKeys::for_exam(exam_id),
            state: SessionState::NotStarted,
            started_at: None,
            owner: None,
            duration_secs,
            questions: exam.questions,
            answers: BTreeMap::new(),
            services,
        };

        if completed {
            tracing::info!("Exam {} already completed", exam_id);
            session.questions.clear();
            session.state = SessionState::Submitted;
            return Ok(session);
        }

        if let Some(persisted) = session.read_persisted().await? {
            tracing::info!(
                "Resuming exam {} started at {}",
                exam_id,
                persisted.started_at.to_rfc3339()
            );
            session.started_at = Some(persisted.started_at);
            session.owner = persisted.owner;
            session.answers = persisted.answers;
            session.state = SessionState::InProgress;
            session.refresh();
        }

        Ok(session)
    }

    /// Reads the persisted start time and answers.
    /// Anything unreadable counts as no prior session.
    async fn read_persisted(&self) -> Result<Option<Persisted>, AppError> {
        let store = &self.services.store;

        let Some(raw_start) = store.get(&self.keys.start).await? else {
            return Ok(None);
        };

        let started_at = match DateTime::parse_from_rfc3339(raw_start.trim()) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => {
                tracing::warn!(
                    "Discarding unreadable start time for exam {}: {}",
                    self.exam_id,
                    e
                );
                return Ok(None);
            }
        };

        let answers = match store.get(&self.keys.answers).await? {
            None => BTreeMap::new(),
            Some(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(answers) => answers,
                Err(e) => {
                    tracing::warn!(
                        "Discarding unreadable answers for exam {}: {}",
                        self.exam_id,
                        e
                    );
                    return Ok(None);
                }
            },
        };

        let owner = store.get(&self.keys.owner).await?;

        Ok(Some(Persisted {
            started_at,
            owner,
            answers,
        }))
    }

    pub fn exam_id(&self) -> &str {
        &self.exam_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn answers(&self) -> &BTreeMap<String, String> {
        &self.answers
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Rejects candidates other than the one who started the attempt.
    /// Sessions without an owner (not started, completed) are open to any
    /// authenticated candidate.
    pub fn ensure_owner(&self, candidate: &str) -> Result<(), AppError> {
        match &self.owner {
            Some(owner) if owner != candidate => Err(AppError::Forbidden(format!(
                "Exam '{}' belongs to another candidate",
                self.exam_id
            ))),
            _ => Ok(()),
        }
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        let started_at = self.started_at?;
        let secs = i64::try_from(self.duration_secs).unwrap_or(i64::MAX);
        let deadline = Duration::try_seconds(secs)
            .and_then(|d| started_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Some(deadline)
    }

    /// `max(0, deadline - now)`, rounded up to whole seconds.
    pub fn remaining_seconds(&self) -> u64 {
        match self.state {
            SessionState::NotStarted => self.duration_secs,
            SessionState::InProgress | SessionState::Expired => {
                let Some(deadline) = self.deadline() else {
                    return 0;
                };
                let ms = (deadline - self.services.clock.now()).num_milliseconds();
                if ms <= 0 { 0 } else { (ms as u64).div_ceil(1000) }
            }
            SessionState::Submitting | SessionState::Submitted => 0,
        }
    }

    /// Marks an in-progress session as expired once its time is up.
    pub fn refresh(&mut self) -> SessionState {
        if self.state == SessionState::InProgress && self.remaining_seconds() == 0 {
            tracing::info!("Time is up for exam {}", self.exam_id);
            self.state = SessionState::Expired;
        }
        self.state
    }

    pub fn view(&self) -> SessionView {
        let questions = if self.state.accepts_submit() {
            self.questions.iter().map(PublicQuestion::from).collect()
        } else {
            Vec::new()
        };

        SessionView {
            exam_id: self.exam_id.clone(),
            state: self.state,
            started_at: self.started_at,
            deadline: self.deadline(),
            duration_seconds: self.duration_secs,
            remaining_seconds: self.remaining_seconds(),
            questions,
            answers: self.answers.clone(),
        }
    }

    /// Starts the countdown on behalf of `candidate`. Only valid from
    /// `NotStarted`; anywhere else it does nothing and returns `false`.
    pub async fn start(&mut self, candidate: &str) -> Result<bool, AppError> {
        self.ensure_owner(candidate)?;
        if self.state != SessionState::NotStarted {
            tracing::debug!(
                "Ignoring start for exam {} in state {:?}",
                self.exam_id,
                self.state
            );
            return Ok(false);
        }

        let now = self.services.clock.now();
        self.started_at = Some(now);
        let Some(deadline) = self.deadline() else {
            self.started_at = None;
            return Err(AppError::InternalServerError(
                "Failed to compute exam deadline".to_string(),
            ));
        };

        if let Err(e) = self.persist_start(candidate, now, deadline).await {
            tracing::error!("Failed to persist start of exam {}: {}", self.exam_id, e);
            self.started_at = None;
            return Err(e);
        }

        self.owner = Some(candidate.to_string());
        self.answers.clear();
        self.state = SessionState::InProgress;
        tracing::info!(
            "Exam {} started, deadline {}",
            self.exam_id,
            deadline.to_rfc3339()
        );
        Ok(true)
    }

    async fn persist_start(
        &self,
        candidate: &str,
        started_at: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let store = &self.services.store;
        // Leftovers from a corrupted earlier attempt.
        store.remove(&self.keys.answers).await?;
        store
            .set(&self.keys.deadline, &deadline.to_rfc3339())
            .await?;
        store.set(&self.keys.owner, candidate).await?;
        store.set(&self.keys.start, &started_at.to_rfc3339()).await
    }

    /// Records an answer and persists the whole answer map before returning.
    pub async fn set_answer(
        &mut self,
        candidate: &str,
        question_id: &str,
        text: &str,
    ) -> Result<(), AppError> {
        self.ensure_owner(candidate)?;
        match self.refresh() {
            SessionState::InProgress => {}
            SessionState::Expired => {
                return Err(AppError::Conflict(format!(
                    "Time is up for exam '{}'",
                    self.exam_id
                )));
            }
            _ => {
                return Err(AppError::Conflict(format!(
                    "Exam '{}' is not in progress",
                    self.exam_id
                )));
            }
        }

        // Only what reached the store counts as answered.
        let mut answers = self.answers.clone();
        answers.insert(question_id.to_string(), text.to_string());

        let raw = serde_json::to_string(&answers)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        self.services.store.set(&self.keys.answers, &raw).await?;

        self.answers = answers;
        Ok(())
    }

    /// Answers to hand to the sink. Empty answers count as unanswered.
    pub fn payload(&self) -> AnswerPayload {
        self.answers
            .iter()
            .filter(|(_, text)| !text.is_empty())
            .map(|(id, text)| {
                (
                    id.clone(),
                    SubmittedAnswer {
                        answer_text: text.clone(),
                    },
                )
            })
            .collect()
    }

    /// Dispatches the answers and closes the session.
    ///
    /// Returns `Ignored` unless the session is `InProgress` or `Expired`.
    /// The transition to `Submitted` does not depend on the sink or on the
    /// store cleanup succeeding.
    pub async fn commit_submit(&mut self, reason: &str) -> SubmitOutcome {
        if !self.refresh().accepts_submit() {
            tracing::debug!(
                "Ignoring {} submit for exam {} in state {:?}",
                reason,
                self.exam_id,
                self.state
            );
            return SubmitOutcome::Ignored;
        }

        self.state = SessionState::Submitting;
        let payload = self.payload();
        tracing::info!(
            "Submitting {} answers for exam {} ({})",
            payload.len(),
            self.exam_id,
            reason
        );
        self.services.sink.submit(&self.exam_id, payload);

        for key in self.keys.all() {
            if let Err(e) = self.services.store.remove(key).await {
                tracing::warn!("Failed to clear {} after submit: {}", key, e);
            }
        }

        self.answers.clear();
        self.questions.clear();
        self.owner = None;
        self.state = SessionState::Submitted;
        SubmitOutcome::Submitted
    }
}
