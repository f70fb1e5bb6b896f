// src/handlers/session.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::session::{SetAnswerRequest, SubmitRequest, SubmitResponse},
    services::RequestConfirmation,
    session::{SessionRegistry, SubmitTrigger},
    utils::jwt::Claims,
};

/// Opens the exam page.
///
/// Returns the terminal view for completed exams, the resumed countdown for
/// an exam already in progress, or a not-started view otherwise.
pub async fn load_session(
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.view(&claims.sub, &exam_id).await?))
}

/// Starts the countdown. Repeated calls keep the original start time.
pub async fn start_session(
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions.start(&claims.sub, &exam_id).await?;
    tracing::info!(candidate = %claims.sub, "Exam {} session opened", exam_id);
    Ok(Json(view))
}

/// Records one answer. Persisted before the response is sent.
pub async fn set_answer(
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<String>,
    Json(payload): Json<SetAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    sessions
        .set_answer(&claims.sub, &exam_id, &payload.question_id, &payload.text)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Manual submission. `confirmed` is the candidate's answer to the
/// confirmation dialog; `false` leaves the exam running.
pub async fn submit_session(
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> Result<impl IntoResponse, AppError> {
    let prompt = RequestConfirmation::new(req.confirmed);
    let (outcome, session) = sessions
        .request_submit(&exam_id, SubmitTrigger::manual(&claims.sub, &prompt))
        .await?;

    tracing::info!(
        candidate = %claims.sub,
        "Manual submit of exam {}: {:?}",
        exam_id,
        outcome
    );

    Ok(Json(SubmitResponse { outcome, session }))
}

/// Countdown poll for the exam page.
pub async fn get_remaining(
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.remaining(&claims.sub, &exam_id).await?))
}
