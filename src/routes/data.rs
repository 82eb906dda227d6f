//! Dashboard data routes. Both require a resolved, signed-in identity.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use super::auth::TabSession;
use super::error_response;
use crate::services::dashboard::dashboard_data;
use crate::services::energy_csv::{CsvError, EnergyRecord, EnergySummary, parse_energy_csv, render_csv, summarize};

#[derive(Debug, Serialize)]
pub struct CsvUploadResponse {
    pub records: Vec<EnergyRecord>,
    pub summary: EnergySummary,
}

#[derive(Debug, Serialize)]
pub struct CsvErrorBody {
    pub error: String,
    pub missing: Vec<String>,
}

pub(crate) fn csv_error_to_status(_err: &CsvError) -> StatusCode {
    StatusCode::BAD_REQUEST
}

/// 400 `{error, missing}` for an unusable upload.
fn csv_error_response(session: &TabSession, err: &CsvError) -> Response {
    let missing = match err {
        CsvError::MissingColumns(names) => names.clone(),
        CsvError::Empty => Vec::new(),
    };
    let body = CsvErrorBody { error: err.to_string(), missing };
    (session.jar(), (csv_error_to_status(err), Json(body))).into_response()
}

/// `GET /api/dashboard`: embedded sample data.
pub async fn dashboard(session: TabSession) -> Response {
    if let Err(response) = session.require_identity().await {
        return response;
    }
    match dashboard_data() {
        Ok(data) => (session.jar(), Json(data)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "embedded dashboard data is malformed");
            (session.jar(), error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error interno del servidor")).into_response()
        }
    }
}

/// `POST /api/data/csv`: parse an uploaded CSV into records plus a summary.
pub async fn upload_csv(session: TabSession, body: String) -> Response {
    if let Err(response) = session.require_identity().await {
        return response;
    }
    match parse_energy_csv(&body) {
        Ok(records) => {
            let summary = summarize(&records);
            tracing::info!(records = summary.count, bytes = body.len(), "csv parsed");
            (session.jar(), Json(CsvUploadResponse { records, summary })).into_response()
        }
        Err(e) => csv_error_response(&session, &e),
    }
}

/// `POST /api/data/csv/export`: the same upload re-rendered as clean,
/// comma-delimited CSV with only the required columns.
pub async fn export_csv(session: TabSession, body: String) -> Response {
    if let Err(response) = session.require_identity().await {
        return response;
    }
    match parse_energy_csv(&body) {
        Ok(records) => (
            session.jar(),
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            render_csv(&records),
        )
            .into_response(),
        Err(e) => csv_error_response(&session, &e),
    }
}

#[cfg(test)]
#[path = "data_test.rs"]
mod tests;
