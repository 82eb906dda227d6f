//! Auth routes: tab identity, sign-in flows, sign-out.
//!
//! Every API call is made on behalf of one browser tab. [`TabSession`] finds
//! (or creates) the visitor from the `visitor_id` cookie and the tab from the
//! `x-tab-id` header, and hands the handler that tab's initialized resolver.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use identity::{AuthOutcome, ClientIdentityState, IdentityView, PopupGrant, SessionResolver};
use serde::{Deserialize, Serialize};
use time::Duration;

use super::error_response;
use crate::services::visitor::{TAB_HEADER, VISITOR_COOKIE, generate_visitor_id, is_valid_visitor_id, normalize_tab_id};
use crate::state::AppState;

const VISITOR_COOKIE_MAX_AGE_DAYS: i64 = 365;
const RESOLVE_WAIT: StdDuration = StdDuration::from_secs(2);

const RESOLVING_MESSAGE: &str = "Verificando la sesión, inténtalo de nuevo en un momento";
const UNAUTHORIZED_MESSAGE: &str = "Debes iniciar sesión para acceder";

// =============================================================================
// TAB EXTRACTOR
// =============================================================================

/// The calling tab's resolver. Carries a fresh `visitor_id` cookie when the
/// request arrived without a usable one; handlers return [`TabSession::jar`]
/// so the browser stores it.
pub struct TabSession {
    pub visitor_id: String,
    pub tab_id: String,
    pub resolver: Arc<SessionResolver>,
    issued: Option<Cookie<'static>>,
}

impl TabSession {
    pub async fn open(state: &AppState, cookie: Option<&str>, tab_header: Option<&str>) -> Self {
        let (visitor_id, issued) = match cookie.filter(|id| is_valid_visitor_id(id)) {
            Some(id) => (id.to_owned(), None),
            None => {
                let id = generate_visitor_id();
                let cookie = visitor_cookie(id.clone(), state.cookie_secure);
                (id, Some(cookie))
            }
        };
        let tab_id = normalize_tab_id(tab_header);
        let resolver = state.visitors.tab(&visitor_id, &tab_id).await;
        Self { visitor_id, tab_id, resolver, issued }
    }

    /// Cookie jar to return with the response.
    #[must_use]
    pub fn jar(&self) -> CookieJar {
        match &self.issued {
            Some(cookie) => CookieJar::new().add(cookie.clone()),
            None => CookieJar::new(),
        }
    }

    /// Wait briefly for initial resolution, then require a signed-in role.
    ///
    /// # Errors
    ///
    /// 503 if resolution is still running, 401 for anonymous visitors.
    pub async fn require_identity(&self) -> Result<ClientIdentityState, Response> {
        let state = match tokio::time::timeout(RESOLVE_WAIT, self.resolver.wait_resolved()).await {
            Ok(state) => state,
            Err(_) => self.resolver.snapshot(),
        };
        identity_gate(&state).map_err(|status| {
            let message = if status == StatusCode::SERVICE_UNAVAILABLE { RESOLVING_MESSAGE } else { UNAUTHORIZED_MESSAGE };
            (self.jar(), error_response(status, message)).into_response()
        })?;
        Ok(state)
    }
}

impl<S> axum::extract::FromRequestParts<S> for TabSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let cookie = jar.get(VISITOR_COOKIE).map(Cookie::value);
        let tab = parts
            .headers
            .get(TAB_HEADER)
            .and_then(|v| v.to_str().ok());
        let app_state = AppState::from_ref(state);
        Ok(Self::open(&app_state, cookie, tab).await)
    }
}

fn visitor_cookie(id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((VISITOR_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::days(VISITOR_COOKIE_MAX_AGE_DAYS))
        .build()
}

/// Status for a snapshot that does not grant access, if any.
pub(crate) fn identity_gate(state: &ClientIdentityState) -> Result<(), StatusCode> {
    if state.is_resolving() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    if state.role().is_anonymous() {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(())
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct CredentialsBody {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub secret: String,
}

#[derive(Deserialize)]
pub struct SecondaryBody {
    #[serde(default)]
    pub grant: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignOutResponse {
    pub redirect: String,
}

/// `GET /api/auth/state`: the tab's current identity view.
pub async fn identity_state(session: TabSession) -> Response {
    let view = IdentityView::from(&session.resolver.snapshot());
    (session.jar(), Json(view)).into_response()
}

/// `POST /api/auth/sign-in`: password sign-in (local roles or primary).
pub async fn sign_in(session: TabSession, Json(body): Json<CredentialsBody>) -> Response {
    let outcome = session
        .resolver
        .sign_in_with_password(&body.identifier, &body.secret)
        .await;
    outcome_response(&session, outcome)
}

/// `POST /api/auth/sign-up`: register with the primary provider.
pub async fn sign_up(session: TabSession, Json(body): Json<CredentialsBody>) -> Response {
    let outcome = session
        .resolver
        .sign_up(&body.identifier, &body.secret)
        .await;
    outcome_response(&session, outcome)
}

/// `POST /api/auth/secondary`: complete the popup flow with its ID token.
pub async fn secondary(session: TabSession, Json(body): Json<SecondaryBody>) -> Response {
    let outcome = session
        .resolver
        .sign_in_with_secondary_provider(PopupGrant(body.grant))
        .await;
    outcome_response(&session, outcome)
}

/// `POST /api/auth/sign-out`: clear every session; the shell goes home.
pub async fn sign_out(session: TabSession) -> Response {
    let navigation = session.resolver.sign_out().await;
    let body = SignOutResponse { redirect: navigation.path().to_owned() };
    (session.jar(), Json(body)).into_response()
}

fn outcome_response(session: &TabSession, outcome: AuthOutcome) -> Response {
    (session.jar(), Json(outcome)).into_response()
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
