//! Image inference demo routes.

use axum::extract::State;
use axum::extract::multipart::Multipart;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use super::error_response;
use crate::services::inference::{ImageUpload, InferenceError, lookup_result};
use crate::state::AppState;

const IMAGE_FIELD: &str = "image";
const MISSING_IMAGE_MESSAGE: &str = "No se recibió ninguna imagen";

pub(crate) fn inference_error_to_status(err: &InferenceError) -> StatusCode {
    match err {
        InferenceError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        InferenceError::InvalidImage(_) => StatusCode::BAD_REQUEST,
        InferenceError::Request(_) | InferenceError::Upstream { .. } => StatusCode::BAD_GATEWAY,
    }
}

/// `POST /api/inference/image`: forward the multipart `image` field and
/// stream the endpoint's binary answer back.
pub async fn analyze_image(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let upload = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(IMAGE_FIELD) => {
                let file_name = field.file_name().unwrap_or("image").to_owned();
                let content_type = field.content_type().map(str::to_owned);
                match field.bytes().await {
                    Ok(bytes) => break ImageUpload { file_name, content_type, bytes: bytes.to_vec() },
                    Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
                }
            }
            Ok(Some(_)) => {}
            Ok(None) => return error_response(StatusCode::BAD_REQUEST, MISSING_IMAGE_MESSAGE),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
        }
    };

    match state.inference.analyze(upload).await {
        Ok(output) => ([(CONTENT_TYPE, output.content_type)], output.bytes).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "image analysis failed");
            error_response(inference_error_to_status(&e), e.user_message())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LookupBody {
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub result: String,
    pub success: bool,
}

/// `POST /api/inference/lookup`: result URL for an image URL, echoing
/// unlisted inputs.
pub async fn lookup(Json(body): Json<LookupBody>) -> Json<LookupResponse> {
    Json(LookupResponse { result: lookup_result(&body.image), success: true })
}

#[cfg(test)]
#[path = "inference_test.rs"]
mod tests;
