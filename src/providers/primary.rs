//! Hosted password-auth client (primary provider).
//!
//! Thin HTTP wrapper over the provider's REST endpoints. One instance per
//! visitor: the access token lives in memory and session changes are
//! published on a watch channel. Pure parsing lives in free functions for
//! testability.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use identity::{IdentityError, IdentityRecord, PrimaryProvider, ProviderSession};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::config::PrimaryAuthConfig;

// =============================================================================
// CLIENT
// =============================================================================

pub struct HostedPrimary {
    http: reqwest::Client,
    config: PrimaryAuthConfig,
    access_token: Mutex<Option<String>>,
    session: watch::Sender<ProviderSession>,
}

impl HostedPrimary {
    #[must_use]
    pub fn new(http: reqwest::Client, config: PrimaryAuthConfig) -> Self {
        // A fresh visitor has no stored token, so the state is already known.
        Self {
            http,
            config,
            access_token: Mutex::new(None),
            session: watch::Sender::new(ProviderSession::SignedOut),
        }
    }

    fn token(&self) -> Option<String> {
        self.access_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_session(&self, token: Option<String>, user: Option<IdentityRecord>) {
        *self
            .access_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = token;
        let session = user.map_or(ProviderSession::SignedOut, ProviderSession::SignedIn);
        self.session.send_replace(session);
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.config.base_url)
    }

    async fn post_credentials(&self, path: &str, identifier: &str, secret: &str) -> Result<String, IdentityError> {
        let response = self
            .http
            .post(self.url(path))
            .header("apikey", &self.config.api_key)
            .json(&PasswordRequest { email: identifier, password: secret })
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(IdentityError::classify(parse_error_message(&text, status.as_u16())));
        }
        Ok(text)
    }
}

#[async_trait]
impl PrimaryProvider for HostedPrimary {
    async fn current_session(&self) -> Result<Option<IdentityRecord>, IdentityError> {
        let Some(token) = self.token() else {
            return Ok(None);
        };

        let response = self
            .http
            .get(self.url("user"))
            .header("apikey", &self.config.api_key)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            tracing::debug!("primary session expired");
            self.store_session(None, None);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(IdentityError::classify(parse_error_message(&text, status.as_u16())));
        }

        let user = parse_user(&text)?;
        self.store_session(Some(token), Some(user.clone()));
        Ok(Some(user))
    }

    async fn sign_in_with_password(&self, identifier: &str, secret: &str) -> Result<IdentityRecord, IdentityError> {
        let text = self
            .post_credentials("token?grant_type=password", identifier, secret)
            .await?;
        let (token, user) = parse_token_response(&text)?;
        self.store_session(Some(token), Some(user.clone()));
        Ok(user)
    }

    async fn sign_up(&self, identifier: &str, secret: &str) -> Result<Option<IdentityRecord>, IdentityError> {
        let text = self.post_credentials("signup", identifier, secret).await?;
        match parse_sign_up_response(&text)? {
            Some((token, user)) => {
                self.store_session(Some(token), Some(user.clone()));
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let Some(token) = self.token() else {
            self.store_session(None, None);
            return Ok(());
        };
        // The local session is dropped even if the remote revoke fails.
        self.store_session(None, None);

        let response = self
            .http
            .post(self.url("logout"))
            .header("apikey", &self.config.api_key)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() && status != reqwest::StatusCode::UNAUTHORIZED {
            let text = response.text().await.unwrap_or_default();
            return Err(IdentityError::classify(parse_error_message(&text, status.as_u16())));
        }
        Ok(())
    }

    fn watch(&self) -> watch::Receiver<ProviderSession> {
        self.session.subscribe()
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: WireUser,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: WireMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct WireMetadata {
    full_name: Option<String>,
    name: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireError {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl From<WireUser> for IdentityRecord {
    fn from(user: WireUser) -> Self {
        let WireMetadata { full_name, name, avatar_url } = user.user_metadata;
        Self { id: user.id, email: user.email, display_name: full_name.or(name), photo_url: avatar_url }
    }
}

// =============================================================================
// PARSING
// =============================================================================

fn unexpected(e: &serde_json::Error) -> IdentityError {
    IdentityError::Credential(format!("unexpected auth response: {e}"))
}

fn parse_user(text: &str) -> Result<IdentityRecord, IdentityError> {
    serde_json::from_str::<WireUser>(text)
        .map(IdentityRecord::from)
        .map_err(|e| unexpected(&e))
}

fn parse_token_response(text: &str) -> Result<(String, IdentityRecord), IdentityError> {
    let parsed: TokenResponse = serde_json::from_str(text).map_err(|e| unexpected(&e))?;
    Ok((parsed.access_token, parsed.user.into()))
}

/// `None` when the provider created the account but holds the session back
/// until the address is confirmed.
fn parse_sign_up_response(text: &str) -> Result<Option<(String, IdentityRecord)>, IdentityError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| unexpected(&e))?;
    if value.get("access_token").is_none() {
        return Ok(None);
    }
    let parsed: TokenResponse = serde_json::from_value(value).map_err(|e| unexpected(&e))?;
    Ok(Some((parsed.access_token, parsed.user.into())))
}

/// Pull the human-readable message out of an error body.
fn parse_error_message(text: &str, status: u16) -> String {
    let wire: WireError = serde_json::from_str(text).unwrap_or_default();
    wire.error_description
        .or(wire.msg)
        .or(wire.message)
        .or(wire.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("auth provider returned status {status}"))
}

#[cfg(test)]
#[path = "primary_test.rs"]
mod tests;
