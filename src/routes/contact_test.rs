use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::rate_limit::RateLimitConfig;
use crate::routes::test_support::body_json;
use crate::state::test_helpers::{
    FailingFeedbackStore, test_app_state, test_app_state_with_limits, test_app_state_with_store,
};
use serde_json::json;

fn body(value: serde_json::Value) -> Result<Json<SubmissionRequest>, JsonRejection> {
    Ok(Json(serde_json::from_value(value).unwrap()))
}

async fn post(state: &AppState, value: serde_json::Value) -> Response {
    let session = TabSession::open(state, None, None).await;
    submit(State(state.clone()), session, body(value)).await
}

#[tokio::test]
async fn empty_feedback_is_rejected_with_rating_message() {
    let state = test_app_state();
    let response = post(&state, json!({"type": "feedback", "feedbackData": {}})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({"error": "La calificación es obligatoria"}));
}

#[tokio::test]
async fn incomplete_contact_is_rejected() {
    let state = test_app_state();
    let response = post(&state, json!({"type": "contact", "contactData": {"name": "Ana"}})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Nombre, email y mensaje son obligatorios");
}

#[tokio::test]
async fn valid_contact_succeeds() {
    let state = test_app_state();
    let response = post(
        &state,
        json!({"type": "contact", "contactData": {"name": "Ana", "email": "ana@example.com", "message": "Hola"}}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn storage_failure_is_internal_error() {
    let state = test_app_state_with_store(Arc::new(FailingFeedbackStore));
    let response = post(&state, json!({"type": "feedback", "feedbackData": {"rating": 4}})).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Error interno del servidor");
}

#[tokio::test]
async fn rate_limit_returns_429() {
    let state = test_app_state_with_limits(RateLimitConfig {
        per_client_limit: 1,
        global_limit: 10,
        window: Duration::from_secs(60),
    });
    let session = TabSession::open(&state, None, None).await;
    let visitor = session.visitor_id.clone();
    let payload = json!({"type": "feedback", "feedbackData": {"rating": 5}});

    let first = submit(State(state.clone()), session, body(payload.clone())).await;
    assert_eq!(first.status(), StatusCode::OK);

    let again = TabSession::open(&state, Some(&visitor), None).await;
    let second = submit(State(state.clone()), again, body(payload)).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn invalid_submissions_do_not_consume_quota() {
    let state = test_app_state_with_limits(RateLimitConfig {
        per_client_limit: 1,
        global_limit: 10,
        window: Duration::from_secs(60),
    });
    let session = TabSession::open(&state, None, None).await;
    let visitor = session.visitor_id.clone();
    let bad = submit(State(state.clone()), session, body(json!({"type": "feedback"}))).await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

    let again = TabSession::open(&state, Some(&visitor), None).await;
    let good = submit(State(state.clone()), again, body(json!({"type": "feedback", "feedbackData": {"rating": 2}}))).await;
    assert_eq!(good.status(), StatusCode::OK);
}

#[test]
fn errors_map_to_statuses() {
    let db = FeedbackError::Database(sqlx::Error::PoolTimedOut);
    assert_eq!(feedback_error_to_status(&db), StatusCode::INTERNAL_SERVER_ERROR);
    let limited = RateLimitError::GlobalExceeded { limit: 1, window_secs: 1 };
    assert_eq!(rate_limit_error_to_status(&limited), StatusCode::TOO_MANY_REQUESTS);
}
