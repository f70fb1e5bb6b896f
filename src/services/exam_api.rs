// src/services/exam_api.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use url::Url;

use super::{ExamSource, SubmissionSink};
use crate::{
    error::AppError,
    models::{
        exam::ExamDefinition,
        session::{AnswerPayload, SubmitAnswersBody},
    },
};

/// Client for the remote HR API.
///
/// * `GET  {base}/exams/{exam_id}` returns the exam definition.
/// * `POST {base}/exams/{exam_id}/answers` accepts the answer payload.
#[derive(Debug, Clone)]
pub struct HttpExamApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpExamApi {
    pub fn new(base_url: Url, token: Option<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Builds `{base}/exams/{exam_id}[/{suffix}]`, percent-encoding the id.
    fn exam_url(&self, exam_id: &str, suffix: Option<&str>) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                AppError::InternalServerError(format!(
                    "Exam API URL cannot be a base: {}",
                    self.base_url
                ))
            })?;
            segments.pop_if_empty().push("exams").push(exam_id);
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Posts the answers and waits for the remote API to accept them.
    pub async fn deliver(&self, exam_id: &str, answers: AnswerPayload) -> Result<(), AppError> {
        let url = self.exam_url(exam_id, Some("answers"))?;
        let response = self
            .authorized(self.client.post(url))
            .json(&SubmitAnswersBody { answers })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "Answer submission for exam '{}' returned {}",
                exam_id, status
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl ExamSource for HttpExamApi {
    async fn get_exam(&self, exam_id: &str) -> Result<ExamDefinition, AppError> {
        let url = self.exam_url(exam_id, None)?;
        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to reach exam service for {}: {:?}", exam_id, e);
                AppError::from(e)
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(AppError::NotFound(format!(
                "Exam '{}' not found",
                exam_id
            ))),
            status if !status.is_success() => Err(AppError::Upstream(format!(
                "Fetching exam '{}' returned {}",
                exam_id, status
            ))),
            _ => Ok(response.json::<ExamDefinition>().await?),
        }
    }
}

impl SubmissionSink for HttpExamApi {
    fn submit(&self, exam_id: &str, answers: AnswerPayload) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!("No runtime available to submit answers for exam {}", exam_id);
            return;
        };

        let api = self.clone();
        let exam_id = exam_id.to_string();
        runtime.spawn(async move {
            let count = answers.len();
            match api.deliver(&exam_id, answers).await {
                Ok(()) => tracing::info!("Submitted {} answers for exam {}", count, exam_id),
                Err(e) => tracing::error!("Failed to submit answers for exam {}: {}", exam_id, e),
            }
        });
    }
}
