//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router serves the JSON API under `/api` and falls back to the
//! static marketing site from `WEBSITE_DIR` for everything else. API handlers
//! take a [`auth::TabSession`] to act for the calling browser tab.

pub mod auth;
pub mod contact;
pub mod data;
pub mod inference;
pub mod preferences;

use std::path::Path;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Serialize;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::services::inference::MAX_IMAGE_BYTES;
use crate::state::AppState;

/// Multipart overhead on top of the largest accepted image.
const UPLOAD_BODY_SLACK: usize = 64 * 1024;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// JSON `{error}` response.
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: message.into() })).into_response()
}

fn api_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/state", get(auth::identity_state))
        .route("/api/auth/sign-in", post(auth::sign_in))
        .route("/api/auth/sign-up", post(auth::sign_up))
        .route("/api/auth/secondary", post(auth::secondary))
        .route("/api/auth/sign-out", post(auth::sign_out))
        .route("/api/dashboard", get(data::dashboard))
        .route("/api/data/csv", post(data::upload_csv))
        .route("/api/data/csv/export", post(data::export_csv))
        .route(
            "/api/inference/image",
            post(inference::analyze_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + UPLOAD_BODY_SLACK)),
        )
        .route("/api/inference/lookup", post(inference::lookup))
        .route("/api/contact", post(contact::submit))
        .route(
            "/api/preferences/locale",
            get(preferences::get_locale).put(preferences::put_locale),
        )
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(state)
}

/// API routes plus the static site fallback.
pub fn app(state: AppState, website_dir: &Path) -> Router {
    let website_service = ServeDir::new(website_dir).append_index_html_on_directories(true);

    api_routes(state)
        .fallback_service(website_service)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::response::Response;

    pub async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
