//! Session resolver: one per browser tab.
//!
//! ARCHITECTURE
//! ============
//! The resolver owns the tab's [`ClientIdentityState`] behind a `watch`
//! channel. Three listener tasks feed it after [`SessionResolver::initialize`]:
//!
//! - storage events from other tabs re-derive the local role,
//! - the primary provider's session feed,
//! - the secondary provider's session feed.
//!
//! Explicit calls (sign-in, sign-up, sign-out) mutate the same channel. All
//! writes go through `send_modify`, so every subscriber sees whole snapshots
//! but no ordering between sources is promised.
//!
//! ERROR HANDLING
//! ==============
//! Public operations never fail. Provider errors are logged and folded into
//! [`AuthOutcome`]; sign-out swallows individual provider failures.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::barrier::{ResolutionBarrier, Source};
use crate::provider::{PopupGrant, PrimaryProvider, ProviderSession, SecondaryProvider};
use crate::record::IdentitySource;
use crate::role::LocalRole;
use crate::state::{ClientIdentityState, Resolution};
use crate::storage::{ADMIN_FLAG_KEY, GUEST_FLAG_KEY, StorageSubscription, TabStorage};

pub const HOME_ROUTE: &str = "/";
pub const MIN_SECRET_LEN: usize = 6;
pub const SHORT_SECRET_MESSAGE: &str = "La contraseña debe tener al menos 6 caracteres";
pub const MISSING_IDENTIFIER_MESSAGE: &str = "El correo electrónico es obligatorio";

const ADMIN_CREDENTIALS: (&str, &str) = ("admin", "admin");
const GUEST_CREDENTIALS: (&str, &str) = ("invitado", "invitado");

// =============================================================================
// RESULTS
// =============================================================================

/// Structured result of a sign-in style call. Serialized as `{success, error}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl AuthOutcome {
    #[must_use]
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, error: Some(message.into()) }
    }
}

/// Where the caller must go after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Home,
}

impl Navigation {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Home => HOME_ROUTE,
        }
    }
}

fn local_role_for(identifier: &str, secret: &str) -> Option<LocalRole> {
    let pair = (identifier, secret);
    if pair == ADMIN_CREDENTIALS {
        Some(LocalRole::Admin)
    } else if pair == GUEST_CREDENTIALS {
        Some(LocalRole::Guest)
    } else {
        None
    }
}

fn barrier_source(source: IdentitySource) -> Source {
    match source {
        IdentitySource::Primary => Source::Primary,
        IdentitySource::Secondary => Source::Secondary,
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

pub struct SessionResolver {
    storage: TabStorage,
    primary: Arc<dyn PrimaryProvider>,
    secondary: Arc<dyn SecondaryProvider>,
    state: watch::Sender<ClientIdentityState>,
    barrier: Mutex<ResolutionBarrier>,
    initialized: AtomicBool,
    pending: AtomicUsize,
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

impl SessionResolver {
    #[must_use]
    pub fn new(
        storage: TabStorage,
        primary: Arc<dyn PrimaryProvider>,
        secondary: Arc<dyn SecondaryProvider>,
    ) -> Arc<Self> {
        Arc::new(Self {
            storage,
            primary,
            secondary,
            state: watch::Sender::new(ClientIdentityState::default()),
            barrier: Mutex::new(ResolutionBarrier::new()),
            initialized: AtomicBool::new(false),
            pending: AtomicUsize::new(0),
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ClientIdentityState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ClientIdentityState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn storage(&self) -> &TabStorage {
        &self.storage
    }

    /// Wait until initial resolution completes. Returns immediately if it
    /// already has.
    pub async fn wait_resolved(&self) -> ClientIdentityState {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|state| !state.is_resolving()).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Start listeners and run the initial check. Later calls are no-ops.
    pub async fn initialize(self: &Arc<Self>) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }
        self.state.send_modify(|s| s.resolution = Resolution::Resolving);

        let subscription = self.storage.subscribe();
        self.spawn_listener(watch_storage(Arc::downgrade(self), subscription));
        self.report(Source::CrossTab);

        let local = self.read_local_role();
        self.state.send_modify(|s| s.local = local);
        self.report(Source::LocalFlags);

        self.spawn_listener(watch_provider(Arc::downgrade(self), self.primary.watch(), IdentitySource::Primary));
        self.spawn_listener(watch_provider(Arc::downgrade(self), self.secondary.watch(), IdentitySource::Secondary));

        if local.is_privileged() {
            debug!(tab = self.storage.tab_id(), ?local, "local session present; skipping primary lookup");
            self.short_circuit();
            return;
        }

        match self.primary.current_session().await {
            Ok(Some(user)) => {
                self.state
                    .send_modify(|s| s.set_fact(IdentitySource::Primary, Some(user)));
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "primary session lookup failed; treating as signed out"),
        }
        self.report(Source::Primary);
    }

    /// Password sign-in. The two hard-coded pairs grant a local role without
    /// contacting any provider.
    pub async fn sign_in_with_password(&self, identifier: &str, secret: &str) -> AuthOutcome {
        if let Some(role) = local_role_for(identifier, secret) {
            self.grant_local_role(role);
            info!(?role, "local session granted");
            return AuthOutcome::ok();
        }

        let result = {
            let _pending = self.begin_pending();
            self.primary.sign_in_with_password(identifier, secret).await
        };
        match result {
            Ok(user) => {
                self.state
                    .send_modify(|s| s.set_fact(IdentitySource::Primary, Some(user)));
                AuthOutcome::ok()
            }
            Err(e) => {
                warn!(error = %e, "primary sign-in failed");
                AuthOutcome::failed(e.provider_message())
            }
        }
    }

    /// Register with the primary provider.
    pub async fn sign_up(&self, identifier: &str, secret: &str) -> AuthOutcome {
        if identifier.trim().is_empty() {
            return AuthOutcome::failed(MISSING_IDENTIFIER_MESSAGE);
        }
        if secret.chars().count() < MIN_SECRET_LEN {
            return AuthOutcome::failed(SHORT_SECRET_MESSAGE);
        }

        let result = {
            let _pending = self.begin_pending();
            self.primary.sign_up(identifier, secret).await
        };
        match result {
            Ok(Some(user)) => {
                self.state
                    .send_modify(|s| s.set_fact(IdentitySource::Primary, Some(user)));
                AuthOutcome::ok()
            }
            Ok(None) => AuthOutcome::ok(),
            Err(e) => {
                warn!(error = %e, network = e.is_network(), "primary sign-up failed");
                AuthOutcome::failed(e.user_message())
            }
        }
    }

    /// Complete the secondary popup flow. The session itself arrives through
    /// the secondary provider's feed.
    pub async fn sign_in_with_secondary_provider(&self, grant: PopupGrant) -> AuthOutcome {
        match self.secondary.sign_in_with_popup(grant).await {
            Ok(()) => AuthOutcome::ok(),
            Err(e) => {
                warn!(error = %e, "secondary sign-in failed");
                AuthOutcome::failed(e.provider_message())
            }
        }
    }

    /// Clear every session this tab can see. Always lands on the home route.
    pub async fn sign_out(&self) -> Navigation {
        self.grant_local_role(LocalRole::None);

        let has_secondary = self.state.borrow().secondary_user().is_some();
        if has_secondary {
            match self.secondary.sign_out().await {
                Ok(()) => self
                    .state
                    .send_modify(|s| s.set_fact(IdentitySource::Secondary, None)),
                Err(e) => warn!(error = %e, "secondary sign-out failed"),
            }
        }

        if self.primary.is_available() {
            match self.primary.sign_out().await {
                Ok(()) => self
                    .state
                    .send_modify(|s| s.set_fact(IdentitySource::Primary, None)),
                Err(e) => warn!(error = %e, "primary sign-out failed"),
            }
        }

        info!(tab = self.storage.tab_id(), "signed out");
        Navigation::Home
    }

    // -------------------------------------------------------------------------
    // internals
    // -------------------------------------------------------------------------

    fn read_local_role(&self) -> LocalRole {
        LocalRole::from_flags(self.storage.flag(ADMIN_FLAG_KEY), self.storage.flag(GUEST_FLAG_KEY))
    }

    fn grant_local_role(&self, role: LocalRole) {
        // Drop the other marker first so other tabs never read both set.
        match role {
            LocalRole::Admin => {
                self.storage.set_flag(GUEST_FLAG_KEY, false);
                self.storage.set_flag(ADMIN_FLAG_KEY, true);
            }
            LocalRole::Guest => {
                self.storage.set_flag(ADMIN_FLAG_KEY, false);
                self.storage.set_flag(GUEST_FLAG_KEY, true);
            }
            LocalRole::None => {
                self.storage.set_flag(ADMIN_FLAG_KEY, false);
                self.storage.set_flag(GUEST_FLAG_KEY, false);
            }
        }
        self.state.send_modify(|s| s.local = role);
    }

    fn rederive_local_role(&self) {
        let local = self.read_local_role();
        let changed = self.state.send_if_modified(|s| {
            if s.local == local {
                return false;
            }
            s.local = local;
            true
        });
        if changed {
            debug!(tab = self.storage.tab_id(), ?local, "local role changed in another tab");
        }
    }

    fn apply_provider_session(&self, source: IdentitySource, session: &ProviderSession) {
        if !session.is_known() {
            return;
        }
        let user = session.user().cloned();
        self.state.send_modify(|s| s.set_fact(source, user));
        self.report(barrier_source(source));
    }

    fn report(&self, source: Source) {
        let completed = self
            .barrier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .report(source);
        if completed {
            self.mark_resolved();
        }
    }

    fn short_circuit(&self) {
        let completed = self
            .barrier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .short_circuit();
        if completed {
            self.mark_resolved();
        }
    }

    fn mark_resolved(&self) {
        self.state.send_modify(|s| s.resolution = Resolution::Resolved);
        debug!(tab = self.storage.tab_id(), "identity resolved");
    }

    fn begin_pending(&self) -> PendingGuard<'_> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| s.sign_in_pending = true);
        PendingGuard { resolver: self }
    }

    fn spawn_listener<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }
}

impl Drop for SessionResolver {
    fn drop(&mut self) {
        let listeners = self
            .listeners
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for handle in listeners.drain(..) {
            handle.abort();
        }
    }
}

/// Clears `sign_in_pending` when the last in-flight call finishes or is
/// cancelled.
struct PendingGuard<'a> {
    resolver: &'a SessionResolver,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.resolver.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.resolver
                .state
                .send_modify(|s| s.sign_in_pending = false);
        }
    }
}

// =============================================================================
// LISTENERS
// =============================================================================

async fn watch_storage(resolver: Weak<SessionResolver>, mut subscription: StorageSubscription) {
    while let Some(event) = subscription.next().await {
        if !event.touches(ADMIN_FLAG_KEY) && !event.touches(GUEST_FLAG_KEY) {
            continue;
        }
        let Some(resolver) = resolver.upgrade() else {
            return;
        };
        resolver.rederive_local_role();
    }
}

async fn watch_provider(
    resolver: Weak<SessionResolver>,
    mut feed: watch::Receiver<ProviderSession>,
    source: IdentitySource,
) {
    loop {
        let session = feed.borrow_and_update().clone();
        {
            let Some(resolver) = resolver.upgrade() else {
                return;
            };
            resolver.apply_provider_session(source, &session);
        }
        if feed.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
