//! Identity provider wiring.
//!
//! Each visitor gets its own provider clients (sessions are per browser).
//! [`ProviderFactory`] is the seam the visitor registry uses to build them;
//! [`HostedProviders`] falls back to the `identity::noop` stand-ins when a
//! provider is not configured.

pub mod primary;
pub mod secondary;

use std::sync::Arc;

use identity::noop::{UnavailablePrimary, UnavailableSecondary};
use identity::{PrimaryProvider, SecondaryProvider};

use crate::config::{PrimaryAuthConfig, SecondaryAuthConfig};

pub trait ProviderFactory: Send + Sync {
    fn primary(&self) -> Arc<dyn PrimaryProvider>;
    fn secondary(&self) -> Arc<dyn SecondaryProvider>;
}

pub struct HostedProviders {
    http: reqwest::Client,
    primary: Option<PrimaryAuthConfig>,
    secondary: Option<SecondaryAuthConfig>,
}

impl HostedProviders {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        primary: Option<PrimaryAuthConfig>,
        secondary: Option<SecondaryAuthConfig>,
    ) -> Self {
        if primary.is_none() {
            tracing::warn!("primary auth provider not configured; password sign-in disabled");
        }
        if secondary.is_none() {
            tracing::warn!("secondary identity provider not configured; popup sign-in disabled");
        }
        Self { http, primary, secondary }
    }
}

impl ProviderFactory for HostedProviders {
    fn primary(&self) -> Arc<dyn PrimaryProvider> {
        match &self.primary {
            Some(config) => Arc::new(primary::HostedPrimary::new(self.http.clone(), config.clone())),
            None => Arc::new(UnavailablePrimary::new()),
        }
    }

    fn secondary(&self) -> Arc<dyn SecondaryProvider> {
        match &self.secondary {
            Some(config) => Arc::new(secondary::HostedSecondary::new(self.http.clone(), config.clone())),
            None => Arc::new(UnavailableSecondary::new()),
        }
    }
}
