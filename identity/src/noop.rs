//! Stand-in providers for when a hosted client is not configured.
//!
//! They report "signed out" immediately, so resolution never waits on them,
//! and refuse every sign-in with [`IdentityError::ProviderUnavailable`].

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::IdentityError;
use crate::provider::{PopupGrant, PrimaryProvider, ProviderSession, SecondaryProvider};
use crate::record::IdentityRecord;

pub struct UnavailablePrimary {
    session: watch::Sender<ProviderSession>,
}

impl UnavailablePrimary {
    #[must_use]
    pub fn new() -> Self {
        Self { session: watch::Sender::new(ProviderSession::SignedOut) }
    }
}

impl Default for UnavailablePrimary {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PrimaryProvider for UnavailablePrimary {
    fn is_available(&self) -> bool {
        false
    }

    async fn current_session(&self) -> Result<Option<IdentityRecord>, IdentityError> {
        Ok(None)
    }

    async fn sign_in_with_password(&self, _identifier: &str, _secret: &str) -> Result<IdentityRecord, IdentityError> {
        Err(IdentityError::ProviderUnavailable)
    }

    async fn sign_up(&self, _identifier: &str, _secret: &str) -> Result<Option<IdentityRecord>, IdentityError> {
        Err(IdentityError::ProviderUnavailable)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        Ok(())
    }

    fn watch(&self) -> watch::Receiver<ProviderSession> {
        self.session.subscribe()
    }
}

pub struct UnavailableSecondary {
    session: watch::Sender<ProviderSession>,
}

impl UnavailableSecondary {
    #[must_use]
    pub fn new() -> Self {
        Self { session: watch::Sender::new(ProviderSession::SignedOut) }
    }
}

impl Default for UnavailableSecondary {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecondaryProvider for UnavailableSecondary {
    async fn sign_in_with_popup(&self, _grant: PopupGrant) -> Result<(), IdentityError> {
        Err(IdentityError::ProviderUnavailable)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        Ok(())
    }

    fn watch(&self) -> watch::Receiver<ProviderSession> {
        self.session.subscribe()
    }
}
