//! Hosted identity provider seams.
//!
//! Both providers publish their session on a `watch` channel. The initial
//! value is [`ProviderSession::Unknown`] until the provider has checked its
//! own persisted state; the resolver counts the first definite value as that
//! provider's report.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;

use crate::error::IdentityError;
use crate::record::IdentityRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "user", rename_all = "snake_case")]
pub enum ProviderSession {
    #[default]
    Unknown,
    SignedOut,
    SignedIn(IdentityRecord),
}

impl ProviderSession {
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    #[must_use]
    pub fn user(&self) -> Option<&IdentityRecord> {
        match self {
            Self::SignedIn(user) => Some(user),
            Self::Unknown | Self::SignedOut => None,
        }
    }
}

/// Credential handed back by the secondary provider's popup window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupGrant(pub String);

/// Password-based hosted auth.
#[async_trait]
pub trait PrimaryProvider: Send + Sync {
    /// `false` when the client could not be configured (a no-op stand-in).
    fn is_available(&self) -> bool {
        true
    }

    /// Look up an existing session without prompting.
    async fn current_session(&self) -> Result<Option<IdentityRecord>, IdentityError>;

    async fn sign_in_with_password(&self, identifier: &str, secret: &str) -> Result<IdentityRecord, IdentityError>;

    /// Register an account. `Ok(None)` when the provider requires confirmation
    /// before a session exists.
    async fn sign_up(&self, identifier: &str, secret: &str) -> Result<Option<IdentityRecord>, IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Session change feed.
    fn watch(&self) -> watch::Receiver<ProviderSession>;
}

/// Popup-based hosted identity.
#[async_trait]
pub trait SecondaryProvider: Send + Sync {
    /// Complete the popup flow. Success is published on [`Self::watch`]; the
    /// caller should not assume the session is visible when this returns.
    async fn sign_in_with_popup(&self, grant: PopupGrant) -> Result<(), IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;

    fn watch(&self) -> watch::Receiver<ProviderSession>;
}
