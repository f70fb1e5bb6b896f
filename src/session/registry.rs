// src/session/registry.rs

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;

use super::{
    controller::{SessionController, SessionServices},
    ticker,
};
use crate::{
    config::SUBMIT_CONFIRMATION_MESSAGE,
    error::AppError,
    models::session::{RemainingResponse, SessionState, SessionView, SubmitOutcome},
    services::ConfirmationPrompt,
};

/// Who is asking to submit.
pub enum SubmitTrigger<'a> {
    /// The candidate pressed "Submit"; requires confirmation.
    Manual {
        candidate: &'a str,
        prompt: &'a dyn ConfirmationPrompt,
    },
    /// The expiry observer saw the countdown reach zero.
    Expiry,
}

impl<'a> SubmitTrigger<'a> {
    pub fn manual(candidate: &'a str, prompt: &'a dyn ConfirmationPrompt) -> Self {
        SubmitTrigger::Manual { candidate, prompt }
    }

    fn label(&self) -> &'static str {
        match self {
            SubmitTrigger::Manual { .. } => "manual",
            SubmitTrigger::Expiry => "expiry",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running { remaining_seconds: u64 },
    Finished,
}

/// Live sessions by exam id.
pub type SessionMap = Arc<Mutex<HashMap<String, SessionHandle>>>;

/// Shared access to one live session.
#[derive(Clone)]
pub struct SessionHandle {
    exam_id: Arc<str>,
    inner: Arc<Mutex<SessionController>>,
    observed: Arc<AtomicBool>,
}

impl SessionHandle {
    pub fn new(controller: SessionController) -> Self {
        Self {
            exam_id: Arc::from(controller.exam_id()),
            inner: Arc::new(Mutex::new(controller)),
            observed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn exam_id(&self) -> &str {
        &self.exam_id
    }

    fn is_same(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Claims the right to run the expiry observer. True exactly once.
    pub(crate) fn claim_observer(&self) -> bool {
        !self.observed.swap(true, Ordering::SeqCst)
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.refresh()
    }

    /// Unchecked snapshot, for callers that already authorized the candidate.
    pub async fn view(&self) -> SessionView {
        let mut session = self.inner.lock().await;
        session.refresh();
        session.view()
    }

    pub async fn view_as(&self, candidate: &str) -> Result<SessionView, AppError> {
        let mut session = self.inner.lock().await;
        session.ensure_owner(candidate)?;
        session.refresh();
        Ok(session.view())
    }

    pub async fn remaining_as(&self, candidate: &str) -> Result<RemainingResponse, AppError> {
        let mut session = self.inner.lock().await;
        session.ensure_owner(candidate)?;
        Ok(RemainingResponse {
            state: session.refresh(),
            remaining_seconds: session.remaining_seconds(),
        })
    }

    pub async fn start(&self, candidate: &str) -> Result<bool, AppError> {
        self.inner.lock().await.start(candidate).await
    }

    pub async fn set_answer(
        &self,
        candidate: &str,
        question_id: &str,
        text: &str,
    ) -> Result<(), AppError> {
        self.inner
            .lock()
            .await
            .set_answer(candidate, question_id, text)
            .await
    }

    /// The only way out of `InProgress`.
    ///
    /// A manual request is confirmed through the prompt first, except once
    /// the session is `Expired`: time is up and the expiry observer would
    /// submit anyway, so there is nothing left for the candidate to decide.
    ///
    /// The prompt is awaited without holding the session lock, so the expiry
    /// observer keeps running underneath it. The state guard is checked again
    /// once the lock is re-acquired, which is what keeps a late manual
    /// confirmation from submitting a second time. The owner cannot change
    /// while the session accepts a submit, so it is only checked up front.
    pub async fn request_submit(
        &self,
        trigger: SubmitTrigger<'_>,
    ) -> Result<SubmitOutcome, AppError> {
        let state = {
            let mut session = self.inner.lock().await;
            if let SubmitTrigger::Manual { candidate, .. } = &trigger {
                session.ensure_owner(candidate)?;
            }
            session.refresh()
        };

        if !state.accepts_submit() {
            tracing::debug!(
                "Ignoring {} submit for exam {} in state {:?}",
                trigger.label(),
                self.exam_id,
                state
            );
            return Ok(SubmitOutcome::Ignored);
        }

        if let SubmitTrigger::Manual { prompt, .. } = &trigger {
            if state == SessionState::InProgress
                && !prompt.confirm(SUBMIT_CONFIRMATION_MESSAGE).await
            {
                tracing::info!("Candidate declined to submit exam {}", self.exam_id);
                return Ok(SubmitOutcome::Declined);
            }
        }

        Ok(self.inner.lock().await.commit_submit(trigger.label()).await)
    }

    /// One observation of the countdown. Submits on expiry.
    pub async fn tick(&self) -> TickOutcome {
        let (state, remaining_seconds) = {
            let mut session = self.inner.lock().await;
            (session.refresh(), session.remaining_seconds())
        };

        match state {
            SessionState::NotStarted | SessionState::InProgress => {
                TickOutcome::Running { remaining_seconds }
            }
            SessionState::Expired => {
                if let Err(e) = self.request_submit(SubmitTrigger::Expiry).await {
                    tracing::error!("Auto-submit of exam {} failed: {}", self.exam_id, e);
                }
                TickOutcome::Finished
            }
            SessionState::Submitting | SessionState::Submitted => TickOutcome::Finished,
        }
    }
}

/// Drops `handle` from `sessions` unless another handle replaced it.
pub(crate) async fn evict(sessions: &SessionMap, handle: &SessionHandle) {
    let mut sessions = sessions.lock().await;
    if sessions
        .get(handle.exam_id())
        .is_some_and(|live| live.is_same(handle))
    {
        sessions.remove(handle.exam_id());
        tracing::debug!("Released session for exam {}", handle.exam_id());
    }
}

/// Sessions of this gateway that are in progress, one per exam id.
///
/// Only started, unsubmitted attempts are kept. Not-started and completed
/// sessions persist nothing and are rebuilt from the exam source on demand.
pub struct SessionRegistry {
    services: SessionServices,
    tick_interval: Duration,
    sessions: SessionMap,
}

impl SessionRegistry {
    pub fn new(services: SessionServices, tick_interval: Duration) -> Self {
        Self {
            services,
            tick_interval,
            sessions: SessionMap::default(),
        }
    }

    pub async fn live_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Returns the session for `exam_id`, loading it if it is not live.
    ///
    /// A resumed session is kept and gets its expiry observer immediately,
    /// so a deadline that passed while the gateway was down is acted on
    /// right away.
    pub async fn load(&self, exam_id: &str) -> Result<SessionHandle, AppError> {
        if let Some(handle) = self.sessions.lock().await.get(exam_id) {
            return Ok(handle.clone());
        }

        let handle = SessionHandle::new(SessionController::load(exam_id, self.services.clone()).await?);
        if !handle.state().await.accepts_submit() {
            return Ok(handle);
        }

        let handle = self.adopt(handle).await;
        self.observe(&handle);
        Ok(handle)
    }

    /// Makes `handle` the live session unless a concurrent request got
    /// there first, in which case that one wins.
    async fn adopt(&self, handle: SessionHandle) -> SessionHandle {
        self.sessions
            .lock()
            .await
            .entry(handle.exam_id().to_string())
            .or_insert(handle)
            .clone()
    }

    fn observe(&self, handle: &SessionHandle) {
        ticker::spawn(handle.clone(), self.tick_interval, self.sessions.clone());
    }

    async fn release_unless_live(&self, handle: &SessionHandle) {
        if !handle.state().await.accepts_submit() {
            evict(&self.sessions, handle).await;
        }
    }

    pub async fn view(&self, candidate: &str, exam_id: &str) -> Result<SessionView, AppError> {
        self.load(exam_id).await?.view_as(candidate).await
    }

    pub async fn remaining(
        &self,
        candidate: &str,
        exam_id: &str,
    ) -> Result<RemainingResponse, AppError> {
        self.load(exam_id).await?.remaining_as(candidate).await
    }

    pub async fn start(&self, candidate: &str, exam_id: &str) -> Result<SessionView, AppError> {
        // Adopted before starting so two concurrent starts share one controller.
        let handle = self.adopt(self.load(exam_id).await?).await;
        let started = handle.start(candidate).await;
        self.release_unless_live(&handle).await;

        if started? {
            self.observe(&handle);
        }
        handle.view_as(candidate).await
    }

    pub async fn set_answer(
        &self,
        candidate: &str,
        exam_id: &str,
        question_id: &str,
        text: &str,
    ) -> Result<(), AppError> {
        self.load(exam_id)
            .await?
            .set_answer(candidate, question_id, text)
            .await
    }

    pub async fn request_submit(
        &self,
        exam_id: &str,
        trigger: SubmitTrigger<'_>,
    ) -> Result<(SubmitOutcome, SessionView), AppError> {
        let handle = self.load(exam_id).await?;
        let outcome = handle.request_submit(trigger).await?;
        if outcome == SubmitOutcome::Submitted {
            evict(&self.sessions, &handle).await;
        }
        Ok((outcome, handle.view().await))
    }
}
