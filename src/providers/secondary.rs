//! Hosted popup identity client (secondary provider).
//!
//! The browser runs the popup and hands back an ID token as the
//! [`PopupGrant`]. This client verifies it with `accounts:lookup` and
//! publishes the resulting user on its watch channel. Sign-out is local; the
//! provider has no server-side session to revoke.

use async_trait::async_trait;
use identity::{IdentityError, IdentityRecord, PopupGrant, ProviderSession, SecondaryProvider};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::config::SecondaryAuthConfig;

const POPUP_CLOSED_MESSAGE: &str = "La ventana de inicio de sesión se cerró antes de completar el acceso";

pub struct HostedSecondary {
    http: reqwest::Client,
    config: SecondaryAuthConfig,
    session: watch::Sender<ProviderSession>,
}

impl HostedSecondary {
    #[must_use]
    pub fn new(http: reqwest::Client, config: SecondaryAuthConfig) -> Self {
        Self { http, config, session: watch::Sender::new(ProviderSession::SignedOut) }
    }

    fn lookup_url(&self) -> String {
        format!("{}/accounts:lookup?key={}", self.config.base_url, self.config.api_key)
    }
}

#[async_trait]
impl SecondaryProvider for HostedSecondary {
    async fn sign_in_with_popup(&self, grant: PopupGrant) -> Result<(), IdentityError> {
        let id_token = grant.0.trim();
        if id_token.is_empty() {
            return Err(IdentityError::Credential(POPUP_CLOSED_MESSAGE.to_owned()));
        }

        let response = self
            .http
            .post(self.lookup_url())
            .json(&LookupRequest { id_token })
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

        let user = parse_lookup(&text)?;
        tracing::info!(user_id = %user.id, "secondary identity verified");
        self.session.send_replace(ProviderSession::SignedIn(user));
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.session.send_replace(ProviderSession::SignedOut);
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
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<WireAccount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAccount {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireErrorEnvelope {
    error: WireErrorBody,
}

#[derive(Debug, Deserialize)]
struct WireErrorBody {
    message: String,
}

fn parse_lookup(text: &str) -> Result<IdentityRecord, IdentityError> {
    let parsed: LookupResponse = serde_json::from_str(text)
        .map_err(|e| IdentityError::Credential(format!("unexpected identity response: {e}")))?;
    let account = parsed
        .users
        .into_iter()
        .next()
        .ok_or_else(|| IdentityError::Credential("identity token has no matching account".to_owned()))?;
    Ok(IdentityRecord {
        id: account.local_id,
        email: account.email,
        display_name: account.display_name,
        photo_url: account.photo_url,
    })
}

fn parse_error_message(text: &str, status: u16) -> String {
    serde_json::from_str::<WireErrorEnvelope>(text)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| format!("identity provider returned status {status}"))
}

#[cfg(test)]
#[path = "secondary_test.rs"]
mod tests;
