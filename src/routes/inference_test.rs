use std::path::Path;

use super::*;
use crate::routes::app;
use crate::routes::test_support::body_json;
use crate::state::test_helpers::test_app_state;
use axum::body::Body;
use axum::http::Request;
use tower::ServiceExt;

const BOUNDARY: &str = "enerlytics-test-boundary";

fn multipart_request(field: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"panel.png\"\r\n\
         Content-Type: image/png\r\n\r\n\x01\x02\x03\r\n--{BOUNDARY}--\r\n"
    );
    Request::post("/api/inference/image")
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn lookup_returns_table_entry() {
    let image = "https://storage.enerlytics.app/samples/panel_sucio.jpg".to_owned();
    let Json(body) = lookup(Json(LookupBody { image })).await;
    assert!(body.success);
    assert_eq!(body.result, "https://storage.enerlytics.app/results/panel_sucio_detected.jpg");
}

#[tokio::test]
async fn lookup_echoes_unknown_urls() {
    let url = "https://cdn.example.com/uploads/foto123.jpg";
    let Json(body) = lookup(Json(LookupBody { image: url.into() })).await;
    assert!(body.success);
    assert_eq!(body.result, url);
}

#[tokio::test]
async fn lookup_echoes_missing_image_as_empty() {
    let router = app(test_app_state(), Path::new("website-missing-in-tests"));
    let request = Request::post("/api/inference/lookup")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["result"], "");
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn analyze_without_endpoint_is_unavailable() {
    let router = app(test_app_state(), Path::new("website-missing-in-tests"));
    let response = router.oneshot(multipart_request("image")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn analyze_without_image_field_is_bad_request() {
    let router = app(test_app_state(), Path::new("website-missing-in-tests"));
    let response = router.oneshot(multipart_request("other")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], MISSING_IMAGE_MESSAGE);
}

#[test]
fn inference_errors_map_to_statuses() {
    assert_eq!(inference_error_to_status(&InferenceError::NotConfigured), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        inference_error_to_status(&InferenceError::InvalidImage("x".into())),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        inference_error_to_status(&InferenceError::Upstream { status: 500, body: String::new() }),
        StatusCode::BAD_GATEWAY
    );
}
