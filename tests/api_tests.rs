// tests/api_tests.rs

mod common;

use chrono::Duration;
use assessment::utils::jwt::{CANDIDATE_ROLE, sign_jwt};
use common::{JWT_SECRET, spawn_app, unique_exam_id};
use serde_json::{Value, json};

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(&format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn session_requires_token() {
    let app = spawn_app().await;
    let exam_id = unique_exam_id();
    app.source.insert(&exam_id, None);
    let client = reqwest::Client::new();

    let response = client
        .get(&app.url(&exam_id, ""))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .get(&app.url(&exam_id, ""))
        .header("Authorization", "Bearer not-a-jwt")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn unknown_exam_is_404() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&app.url("does_not_exist", ""))
        .bearer_auth(&app.token)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("does_not_exist"));
}

#[tokio::test]
async fn invalid_question_id_is_400() {
    let app = spawn_app().await;
    let exam_id = unique_exam_id();
    app.source.insert(&exam_id, None);
    let client = reqwest::Client::new();

    client
        .post(&app.url(&exam_id, "/start"))
        .bearer_auth(&app.token)
        .send()
        .await
        .expect("Start failed");

    let response = client
        .put(&app.url(&exam_id, "/answers"))
        .bearer_auth(&app.token)
        .json(&json!({ "question_id": "", "text": "x" }))
        .send()
        .await
        .expect("Answer failed");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn answer_before_start_is_409() {
    let app = spawn_app().await;
    let exam_id = unique_exam_id();
    app.source.insert(&exam_id, None);
    let client = reqwest::Client::new();

    let response = client
        .put(&app.url(&exam_id, "/answers"))
        .bearer_auth(&app.token)
        .json(&json!({ "question_id": "q1", "text": "x" }))
        .send()
        .await
        .expect("Answer failed");

    assert_eq!(response.status().as_u16(), 409);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_exam_flow() {
    // Arrange
    let app = spawn_app().await;
    let exam_id = unique_exam_id();
    app.source.insert(&exam_id, Some(600));
    let client = reqwest::Client::new();

    // 1. Open the exam page: not started, questions hidden, nothing stored.
    let view: Value = client
        .get(&app.url(&exam_id, ""))
        .bearer_auth(&app.token)
        .send()
        .await
        .expect("Load failed")
        .json()
        .await
        .unwrap();
    assert_eq!(view["state"], "not_started");
    assert_eq!(view["remaining_seconds"], 600);
    assert_eq!(view["questions"].as_array().unwrap().len(), 0);
    assert!(app.store.is_empty());

    // 2. Start
    let view: Value = client
        .post(&app.url(&exam_id, "/start"))
        .bearer_auth(&app.token)
        .send()
        .await
        .expect("Start failed")
        .json()
        .await
        .unwrap();
    assert_eq!(view["state"], "in_progress");
    assert_eq!(view["questions"].as_array().unwrap().len(), 2);
    let started_at = view["started_at"].clone();

    // 3. Answer
    for (question_id, text) in [("q1", "A borrow scope"), ("q2", "")] {
        let response = client
            .put(&app.url(&exam_id, "/answers"))
            .bearer_auth(&app.token)
            .json(&json!({ "question_id": question_id, "text": text }))
            .send()
            .await
            .expect("Answer failed");
        assert_eq!(response.status().as_u16(), 204);
    }

    // 4. Time passes; starting again does not reset the clock.
    app.clock.advance(Duration::seconds(100));
    let view: Value = client
        .post(&app.url(&exam_id, "/start"))
        .bearer_auth(&app.token)
        .send()
        .await
        .expect("Start failed")
        .json()
        .await
        .unwrap();
    assert_eq!(view["started_at"], started_at);
    assert_eq!(view["remaining_seconds"], 500);
    assert_eq!(view["answers"]["q1"], "A borrow scope");

    let remaining: Value = client
        .get(&app.url(&exam_id, "/remaining"))
        .bearer_auth(&app.token)
        .send()
        .await
        .expect("Remaining failed")
        .json()
        .await
        .unwrap();
    assert_eq!(remaining["remaining_seconds"], 500);

    // 5. Decline the confirmation
    let result: Value = client
        .post(&app.url(&exam_id, "/submit"))
        .bearer_auth(&app.token)
        .json(&json!({ "confirmed": false }))
        .send()
        .await
        .expect("Submit failed")
        .json()
        .await
        .unwrap();
    assert_eq!(result["outcome"], "declined");
    assert_eq!(result["session"]["state"], "in_progress");
    assert!(app.sink.calls().is_empty());

    // 6. Confirm
    let result: Value = client
        .post(&app.url(&exam_id, "/submit"))
        .bearer_auth(&app.token)
        .json(&json!({ "confirmed": true }))
        .send()
        .await
        .expect("Submit failed")
        .json()
        .await
        .unwrap();
    assert_eq!(result["outcome"], "submitted");
    assert_eq!(result["session"]["state"], "submitted");

    let calls = app.sink.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, exam_id);
    assert_eq!(calls[0].1.len(), 1);
    assert_eq!(calls[0].1["q1"].answer_text, "A borrow scope");
    assert!(app.store.is_empty());

    // 7. Submitting again is ignored
    let result: Value = client
        .post(&app.url(&exam_id, "/submit"))
        .bearer_auth(&app.token)
        .json(&json!({ "confirmed": true }))
        .send()
        .await
        .expect("Submit failed")
        .json()
        .await
        .unwrap();
    assert_eq!(result["outcome"], "ignored");
    assert_eq!(app.sink.calls().len(), 1);
}

#[tokio::test]
async fn completed_exam_shows_terminal_view() {
    let app = spawn_app().await;
    let exam_id = unique_exam_id();
    app.source.insert(&exam_id, None);
    app.source.complete(&exam_id);
    let client = reqwest::Client::new();

    let view: Value = client
        .get(&app.url(&exam_id, ""))
        .bearer_auth(&app.token)
        .send()
        .await
        .expect("Load failed")
        .json()
        .await
        .unwrap();
    assert_eq!(view["state"], "submitted");
    assert_eq!(view["remaining_seconds"], 0);

    let view: Value = client
        .post(&app.url(&exam_id, "/start"))
        .bearer_auth(&app.token)
        .send()
        .await
        .expect("Start failed")
        .json()
        .await
        .unwrap();
    assert_eq!(view["state"], "submitted");
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn other_candidate_is_403() {
    // Arrange
    let app = spawn_app().await;
    let exam_id = unique_exam_id();
    app.source.insert(&exam_id, Some(600));
    let client = reqwest::Client::new();
    let other = sign_jwt("candidate-2", CANDIDATE_ROLE, JWT_SECRET, 600).unwrap();

    let response = client
        .post(&app.url(&exam_id, "/start"))
        .bearer_auth(&app.token)
        .send()
        .await
        .expect("Start failed");
    assert_eq!(response.status().as_u16(), 200);
    let response = client
        .put(&app.url(&exam_id, "/answers"))
        .bearer_auth(&app.token)
        .json(&json!({ "question_id": "q1", "text": "mine" }))
        .send()
        .await
        .expect("Answer failed");
    assert_eq!(response.status().as_u16(), 204);

    // Act
    let view = client
        .get(&app.url(&exam_id, ""))
        .bearer_auth(&other)
        .send()
        .await
        .expect("Load failed");
    let start = client
        .post(&app.url(&exam_id, "/start"))
        .bearer_auth(&other)
        .send()
        .await
        .expect("Start failed");
    let answer = client
        .put(&app.url(&exam_id, "/answers"))
        .bearer_auth(&other)
        .json(&json!({ "question_id": "q1", "text": "theirs" }))
        .send()
        .await
        .expect("Answer failed");
    let submit = client
        .post(&app.url(&exam_id, "/submit"))
        .bearer_auth(&other)
        .json(&json!({ "confirmed": true }))
        .send()
        .await
        .expect("Submit failed");

    // Assert
    assert_eq!(view.status().as_u16(), 403);
    assert_eq!(start.status().as_u16(), 403);
    assert_eq!(answer.status().as_u16(), 403);
    assert_eq!(submit.status().as_u16(), 403);
    assert!(app.sink.calls().is_empty());

    let view: Value = client
        .get(&app.url(&exam_id, ""))
        .bearer_auth(&app.token)
        .send()
        .await
        .expect("Load failed")
        .json()
        .await
        .unwrap();
    assert_eq!(view["state"], "in_progress");
    assert_eq!(view["answers"]["q1"], "mine");
}
