//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! owns the visitor registry (per-browser storage and per-tab resolvers), the
//! submission store, the inference client and the contact rate limiter.
//! Clone is required by Axum; every field is an `Arc` or cheaply clonable.

use std::sync::Arc;

use crate::rate_limit::RateLimiter;
use crate::services::feedback::FeedbackStore;
use crate::services::inference::InferenceClient;
use crate::services::visitor::VisitorRegistry;

#[derive(Clone)]
pub struct AppState {
    pub visitors: Arc<VisitorRegistry>,
    pub feedback: Arc<dyn FeedbackStore>,
    pub inference: Arc<InferenceClient>,
    pub rate_limiter: RateLimiter,
    pub cookie_secure: bool,
}

impl AppState {
    #[must_use]
    pub fn new(
        visitors: Arc<VisitorRegistry>,
        feedback: Arc<dyn FeedbackStore>,
        inference: Arc<InferenceClient>,
        rate_limiter: RateLimiter,
        cookie_secure: bool,
    ) -> Self {
        Self { visitors, feedback, inference, rate_limiter, cookie_secure }
    }
}

#[cfg(test)]
pub mod test_helpers {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use identity::noop::UnavailableSecondary;
    use identity::{IdentityError, IdentityRecord, PrimaryProvider, ProviderSession, SecondaryProvider};
    use tokio::sync::watch;
    use uuid::Uuid;

    use super::*;
    use crate::config::InferenceConfig;
    use crate::providers::{HostedProviders, ProviderFactory};
    use crate::rate_limit::RateLimitConfig;
    use crate::services::feedback::{FeedbackError, LogOnlyFeedbackStore, Submission};

    pub const TEST_IDENTIFIER: &str = "ana@example.com";
    pub const TEST_SECRET: &str = "secreto-seguro";

    /// Primary provider that accepts exactly one credential pair.
    pub struct MockPrimary {
        session: watch::Sender<ProviderSession>,
        pub sign_in_calls: AtomicUsize,
    }

    impl MockPrimary {
        fn new() -> Self {
            Self { session: watch::Sender::new(ProviderSession::SignedOut), sign_in_calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl PrimaryProvider for MockPrimary {
        async fn current_session(&self) -> Result<Option<IdentityRecord>, IdentityError> {
            Ok(self.session.borrow().user().cloned())
        }

        async fn sign_in_with_password(&self, identifier: &str, secret: &str) -> Result<IdentityRecord, IdentityError> {
            self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
            if identifier != TEST_IDENTIFIER || secret != TEST_SECRET {
                return Err(IdentityError::Credential("Invalid login credentials".into()));
            }
            let user = IdentityRecord::new("user-1")
                .with_email(TEST_IDENTIFIER)
                .with_display_name("Ana");
            self.session.send_replace(ProviderSession::SignedIn(user.clone()));
            Ok(user)
        }

        async fn sign_up(&self, _identifier: &str, _secret: &str) -> Result<Option<IdentityRecord>, IdentityError> {
            Ok(None)
        }

        async fn sign_out(&self) -> Result<(), IdentityError> {
            self.session.send_replace(ProviderSession::SignedOut);
            Ok(())
        }

        fn watch(&self) -> watch::Receiver<ProviderSession> {
            self.session.subscribe()
        }
    }

    /// Fresh [`MockPrimary`] per visitor, like the hosted factory.
    pub struct MockProviders;

    impl ProviderFactory for MockProviders {
        fn primary(&self) -> Arc<dyn PrimaryProvider> {
            Arc::new(MockPrimary::new())
        }

        fn secondary(&self) -> Arc<dyn SecondaryProvider> {
            Arc::new(UnavailableSecondary::new())
        }
    }

    /// Every visitor shares one [`MockPrimary`] so a test can inspect it.
    pub struct SharedMockProviders(pub Arc<MockPrimary>);

    impl ProviderFactory for SharedMockProviders {
        fn primary(&self) -> Arc<dyn PrimaryProvider> {
            self.0.clone()
        }

        fn secondary(&self) -> Arc<dyn SecondaryProvider> {
            Arc::new(UnavailableSecondary::new())
        }
    }

    /// Store whose every write fails.
    pub struct FailingFeedbackStore;

    #[async_trait]
    impl FeedbackStore for FailingFeedbackStore {
        async fn save(&self, _visitor_id: &str, _submission: &Submission) -> Result<Uuid, FeedbackError> {
            Err(FeedbackError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    fn build(providers: Arc<dyn ProviderFactory>, feedback: Arc<dyn FeedbackStore>, limits: RateLimitConfig) -> AppState {
        let inference = InferenceClient::new(&InferenceConfig { endpoint: None, timeout: Duration::from_secs(5) })
            .expect("inference client should build");
        AppState::new(
            Arc::new(VisitorRegistry::new(providers, Duration::from_secs(3600))),
            feedback,
            Arc::new(inference),
            RateLimiter::new(limits),
            false,
        )
    }

    /// No providers configured, log-only store.
    #[must_use]
    pub fn test_app_state() -> AppState {
        build(
            Arc::new(HostedProviders::new(reqwest::Client::new(), None, None)),
            Arc::new(LogOnlyFeedbackStore),
            RateLimitConfig::default(),
        )
    }

    /// Mock primary provider that accepts [`TEST_IDENTIFIER`]/[`TEST_SECRET`].
    #[must_use]
    pub fn test_app_state_with_mock_primary() -> AppState {
        build(Arc::new(MockProviders), Arc::new(LogOnlyFeedbackStore), RateLimitConfig::default())
    }

    /// Like [`test_app_state_with_mock_primary`], returning the shared mock.
    #[must_use]
    pub fn test_app_state_with_shared_primary() -> (AppState, Arc<MockPrimary>) {
        let primary = Arc::new(MockPrimary::new());
        let providers = Arc::new(SharedMockProviders(primary.clone()));
        (build(providers, Arc::new(LogOnlyFeedbackStore), RateLimitConfig::default()), primary)
    }

    #[must_use]
    pub fn test_app_state_with_store(feedback: Arc<dyn FeedbackStore>) -> AppState {
        build(Arc::new(MockProviders), feedback, RateLimitConfig::default())
    }

    #[must_use]
    pub fn test_app_state_with_limits(limits: RateLimitConfig) -> AppState {
        build(Arc::new(MockProviders), Arc::new(LogOnlyFeedbackStore), limits)
    }
}
