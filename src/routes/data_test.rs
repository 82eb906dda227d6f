use super::*;
use crate::routes::test_support::body_json;
use crate::services::visitor::generate_visitor_id;
use crate::state::AppState;
use crate::state::test_helpers::test_app_state;

/// A tab signed in as guest, reopened the way a follow-up request would be.
async fn guest_session(state: &AppState) -> TabSession {
    let id = generate_visitor_id();
    let session = TabSession::open(state, Some(&id), None).await;
    assert!(session.resolver.sign_in_with_password("invitado", "invitado").await.success);
    TabSession::open(state, Some(&id), None).await
}

// =============================================================================
// dashboard
// =============================================================================

#[tokio::test]
async fn dashboard_requires_identity() {
    let state = test_app_state();
    let session = TabSession::open(&state, None, None).await;
    let response = dashboard(session).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn dashboard_serves_sample_data_to_guest() {
    let state = test_app_state();
    let response = dashboard(guest_session(&state).await).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["kpis"].as_array().unwrap().len(), 4);
}

// =============================================================================
// csv
// =============================================================================

#[tokio::test]
async fn csv_requires_identity() {
    let state = test_app_state();
    let session = TabSession::open(&state, None, None).await;
    let response = upload_csv(session, "date,generatedEnergy,temperature,windSpeed\n".into()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn csv_returns_records_and_summary() {
    let state = test_app_state();
    let text = "date,generatedEnergy,temperature,windSpeed\n2024-01-01,10,20,5\nbad,row\n2024-01-02,30,10,3\n";
    let response = upload_csv(guest_session(&state).await, text.into()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["records"].as_array().unwrap().len(), 2);
    assert_eq!(body["records"][1]["generatedEnergy"], 30.0);
    assert_eq!(body["summary"]["count"], 2);
    assert_eq!(body["summary"]["totalEnergy"], 40.0);
}

#[tokio::test]
async fn csv_missing_columns_is_bad_request() {
    let state = test_app_state();
    let response = upload_csv(guest_session(&state).await, "date,temperature\nx,1\n".into()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["missing"], serde_json::json!(["generatedEnergy", "windSpeed"]));
}

#[tokio::test]
async fn csv_export_renders_comma_delimited() {
    let state = test_app_state();
    let text = "Date;WindSpeed;Temperature;GeneratedEnergy;Notes\n2024-01-01;5;20;10;ok\n";
    let response = export_csv(guest_session(&state).await, text.into()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(
        std::str::from_utf8(&bytes).unwrap(),
        "date,generatedEnergy,temperature,windSpeed\n2024-01-01,10,20,5\n"
    );
}

#[tokio::test]
async fn csv_export_rejects_empty_upload() {
    let state = test_app_state();
    let response = export_csv(guest_session(&state).await, String::new()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn csv_export_missing_columns_matches_upload_error() {
    let state = test_app_state();
    let text = "date,temperature\nx,1\n";
    let exported = body_json(export_csv(guest_session(&state).await, text.into()).await).await;
    let uploaded = body_json(upload_csv(guest_session(&state).await, text.into()).await).await;
    assert_eq!(exported, uploaded);
    assert_eq!(exported["missing"], serde_json::json!(["generatedEnergy", "windSpeed"]));
}
