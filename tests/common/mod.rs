// tests/common/mod.rs

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assessment::{
    clock::ManualClock,
    config::Config,
    error::AppError,
    models::{
        exam::{ExamDefinition, ExamStatus},
        question::Question,
        session::AnswerPayload,
    },
    routes,
    services::{ExamSource, SubmissionSink},
    session::{SessionRegistry, SessionServices},
    state::AppState,
    store::MemoryStore,
    utils::jwt::{CANDIDATE_ROLE, sign_jwt},
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

#[derive(Default)]
pub struct StaticSource {
    exams: Mutex<HashMap<String, ExamDefinition>>,
}

impl StaticSource {
    pub fn insert(&self, exam_id: &str, duration_seconds: Option<u64>) {
        let exam = ExamDefinition {
            questions: vec![
                Question {
                    id: "q1".to_string(),
                    content: "What is a lifetime?".to_string(),
                    difficulty: Some("medium".to_string()),
                },
                Question {
                    id: "q2".to_string(),
                    content: "<i>Explain</i> Send vs Sync".to_string(),
                    difficulty: Some("hard".to_string()),
                },
            ],
            status: ExamStatus::Pending,
            duration_seconds,
        };
        self.exams.lock().unwrap().insert(exam_id.to_string(), exam);
    }

    pub fn complete(&self, exam_id: &str) {
        if let Some(exam) = self.exams.lock().unwrap().get_mut(exam_id) {
            exam.status = ExamStatus::Completed;
        }
    }
}

#[async_trait]
impl ExamSource for StaticSource {
    async fn get_exam(&self, exam_id: &str) -> Result<ExamDefinition, AppError> {
        self.exams
            .lock()
            .unwrap()
            .get(exam_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Exam '{}' not found", exam_id)))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<(String, AnswerPayload)>>,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<(String, AnswerPayload)> {
        self.calls.lock().unwrap().clone()
    }
}

impl SubmissionSink for RecordingSink {
    fn submit(&self, exam_id: &str, answers: AnswerPayload) {
        self.calls
            .lock()
            .unwrap()
            .push((exam_id.to_string(), answers));
    }
}

pub struct TestApp {
    pub address: String,
    pub token: String,
    pub source: Arc<StaticSource>,
    pub sink: Arc<RecordingSink>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub fn url(&self, exam_id: &str, path: &str) -> String {
        format!("{}/api/exams/{}/session{}", self.address, exam_id, path)
    }
}

/// Spawns the gateway on a random port with in-memory collaborators.
/// The expiry observer is effectively idle; tests drive time via the clock.
pub async fn spawn_app() -> TestApp {
    let source = Arc::new(StaticSource::default());
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
    ));

    let config = Config {
        database_url: "memory".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        rust_log: "error".to_string(),
        exam_api_url: url::Url::parse("http://127.0.0.1:9/").unwrap(),
        exam_api_token: None,
        default_duration_secs: 3600,
        tick_interval_ms: 24 * 3600 * 1000,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
    };

    let services = SessionServices {
        source: source.clone(),
        sink: sink.clone(),
        store: store.clone(),
        clock: clock.clone(),
        default_duration_secs: config.default_duration_secs,
    };
    let sessions = Arc::new(SessionRegistry::new(
        services,
        Duration::from_millis(config.tick_interval_ms),
    ));

    let state = AppState { sessions, config };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let token = sign_jwt("candidate-1", CANDIDATE_ROLE, JWT_SECRET, 600).unwrap();

    TestApp {
        address,
        token,
        source,
        sink,
        store,
        clock,
    }
}

pub fn unique_exam_id() -> String {
    format!("exam_{}", &uuid::Uuid::new_v4().to_string()[..8])
}
