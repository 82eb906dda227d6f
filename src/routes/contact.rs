//! Contact and feedback form endpoint.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use super::auth::TabSession;
use super::error_response;
use crate::rate_limit::RateLimitError;
use crate::services::feedback::{FeedbackError, INTERNAL_ERROR_MESSAGE, SubmissionRequest};
use crate::state::AppState;

const MALFORMED_BODY_MESSAGE: &str = "Solicitud no válida";

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
}

pub(crate) fn feedback_error_to_status(err: &FeedbackError) -> StatusCode {
    match err {
        FeedbackError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn rate_limit_error_to_status(_err: &RateLimitError) -> StatusCode {
    StatusCode::TOO_MANY_REQUESTS
}

/// `POST /api/contact`: validate, rate limit, then store a submission.
pub async fn submit(
    State(state): State<AppState>,
    session: TabSession,
    body: Result<Json<SubmissionRequest>, JsonRejection>,
) -> Response {
    let jar = session.jar();

    let Ok(Json(request)) = body else {
        return (jar, error_response(StatusCode::BAD_REQUEST, MALFORMED_BODY_MESSAGE)).into_response();
    };
    let submission = match request.validate() {
        Ok(submission) => submission,
        Err(message) => return (jar, error_response(StatusCode::BAD_REQUEST, message)).into_response(),
    };

    if let Err(e) = state.rate_limiter.check_and_record(&session.visitor_id) {
        tracing::warn!(visitor = %session.visitor_id, error = %e, "contact submission rate limited");
        return (jar, error_response(rate_limit_error_to_status(&e), e.user_message())).into_response();
    }

    match state.feedback.save(&session.visitor_id, &submission).await {
        Ok(id) => {
            tracing::info!(%id, kind = submission.kind(), "submission stored");
            let body = SubmitResponse { success: true, message: submission.success_message().to_owned() };
            (jar, Json(body)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, kind = submission.kind(), "failed to store submission");
            (jar, error_response(feedback_error_to_status(&e), INTERNAL_ERROR_MESSAGE)).into_response()
        }
    }
}

#[cfg(test)]
#[path = "contact_test.rs"]
mod tests;
