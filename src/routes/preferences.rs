//! Visitor preferences kept in browser storage (currently the UI language).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use identity::LOCALE_KEY;
use serde::{Deserialize, Serialize};

use super::auth::TabSession;
use super::error_response;

pub const DEFAULT_LOCALE: &str = "es";
pub const SUPPORTED_LOCALES: [&str; 2] = ["es", "en"];

const UNSUPPORTED_LOCALE_MESSAGE: &str = "Idioma no soportado";

#[derive(Debug, Serialize, Deserialize)]
pub struct LocaleBody {
    pub locale: String,
}

fn normalize_locale(raw: &str) -> Option<&'static str> {
    let lowered = raw.trim().to_ascii_lowercase();
    // Accept region tags like `en-US`.
    let primary = lowered.split(['-', '_']).next().unwrap_or_default();
    SUPPORTED_LOCALES.into_iter().find(|locale| *locale == primary)
}

/// `GET /api/preferences/locale`
pub async fn get_locale(session: TabSession) -> Response {
    let locale = session
        .resolver
        .storage()
        .get(LOCALE_KEY)
        .and_then(|stored| normalize_locale(&stored))
        .unwrap_or(DEFAULT_LOCALE);
    (session.jar(), Json(LocaleBody { locale: locale.to_owned() })).into_response()
}

/// `PUT /api/preferences/locale`: shared by every tab of the visitor.
pub async fn put_locale(session: TabSession, Json(body): Json<LocaleBody>) -> Response {
    let Some(locale) = normalize_locale(&body.locale) else {
        return (session.jar(), error_response(StatusCode::BAD_REQUEST, UNSUPPORTED_LOCALE_MESSAGE)).into_response();
    };
    session.resolver.storage().set(LOCALE_KEY, locale);
    (session.jar(), Json(LocaleBody { locale: locale.to_owned() })).into_response()
}

#[cfg(test)]
#[path = "preferences_test.rs"]
mod tests;
