//! Visitor registry: one shared storage per browser, one resolver per tab.
//!
//! ARCHITECTURE
//! ============
//! A visitor is identified by the `visitor_id` cookie and owns a
//! [`SharedStorage`] plus its own provider clients. Each tab (the `x-tab-id`
//! header) gets a [`SessionResolver`] over a fresh [`TabStorage`] view, so a
//! flag written by one tab raises a storage event in the others.
//!
//! LIFECYCLE
//! =========
//! Visitors are created on first contact and evicted by a periodic sweep once
//! idle. Dropping the last `Arc<SessionResolver>` aborts its listener tasks.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use identity::{PrimaryProvider, SecondaryProvider, SessionResolver, SharedStorage};
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::providers::ProviderFactory;
use crate::rate_limit::RateLimiter;

pub const VISITOR_COOKIE: &str = "visitor_id";
pub const TAB_HEADER: &str = "x-tab-id";
pub const DEFAULT_TAB_ID: &str = "main";

const VISITOR_ID_BYTES: usize = 16;
const MAX_TAB_ID_LEN: usize = 64;
const MAX_TABS_PER_VISITOR: usize = 16;

// =============================================================================
// IDS
// =============================================================================

fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Random 16-byte hex visitor id.
#[must_use]
pub fn generate_visitor_id() -> String {
    let bytes: [u8; VISITOR_ID_BYTES] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// Cookie values that did not come from [`generate_visitor_id`] are replaced.
#[must_use]
pub fn is_valid_visitor_id(raw: &str) -> bool {
    raw.len() == VISITOR_ID_BYTES * 2 && raw.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Tab ids are client-chosen; anything unusable maps to the default tab.
#[must_use]
pub fn normalize_tab_id(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_TAB_ID_LEN)
        .filter(|id| id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(DEFAULT_TAB_ID)
        .to_owned()
}

// =============================================================================
// VISITOR
// =============================================================================

struct TabEntry {
    resolver: Arc<SessionResolver>,
    last_seen: Instant,
}

pub struct Visitor {
    storage: Arc<SharedStorage>,
    primary: Arc<dyn PrimaryProvider>,
    secondary: Arc<dyn SecondaryProvider>,
    tabs: Mutex<HashMap<String, TabEntry>>,
    last_seen: Mutex<Instant>,
}

impl Visitor {
    fn new(primary: Arc<dyn PrimaryProvider>, secondary: Arc<dyn SecondaryProvider>, now: Instant) -> Self {
        Self {
            storage: SharedStorage::new(),
            primary,
            secondary,
            tabs: Mutex::new(HashMap::new()),
            last_seen: Mutex::new(now),
        }
    }

    fn tab_at(&self, tab_id: &str, now: Instant) -> Arc<SessionResolver> {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = now;
        let mut tabs = self.tabs.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = tabs.get_mut(tab_id) {
            entry.last_seen = now;
            return entry.resolver.clone();
        }

        if tabs.len() >= MAX_TABS_PER_VISITOR {
            let oldest = tabs
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                debug!(tab = %oldest, "tab limit reached; closing least recent tab");
                tabs.remove(&oldest);
            }
        }

        let resolver = SessionResolver::new(self.storage.open_tab(), self.primary.clone(), self.secondary.clone());
        tabs.insert(tab_id.to_owned(), TabEntry { resolver: resolver.clone(), last_seen: now });
        resolver
    }

    #[cfg(test)]
    fn tab_count(&self) -> usize {
        self.tabs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn last_seen(&self) -> Instant {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

pub struct VisitorRegistry {
    providers: Arc<dyn ProviderFactory>,
    visitors: Mutex<HashMap<String, Arc<Visitor>>>,
    idle: Duration,
}

impl VisitorRegistry {
    #[must_use]
    pub fn new(providers: Arc<dyn ProviderFactory>, idle: Duration) -> Self {
        Self { providers, visitors: Mutex::new(HashMap::new()), idle }
    }

    /// Resolver for a visitor's tab, creating either on first use. The
    /// returned resolver is initialized.
    pub async fn tab(&self, visitor_id: &str, tab_id: &str) -> Arc<SessionResolver> {
        let resolver = self.tab_at(visitor_id, tab_id, Instant::now());
        resolver.initialize().await;
        resolver
    }

    fn tab_at(&self, visitor_id: &str, tab_id: &str, now: Instant) -> Arc<SessionResolver> {
        let visitor = {
            let mut visitors = self.visitors.lock().unwrap_or_else(PoisonError::into_inner);
            visitors
                .entry(visitor_id.to_owned())
                .or_insert_with(|| {
                    debug!(visitor = %visitor_id, "new visitor");
                    Arc::new(Visitor::new(self.providers.primary(), self.providers.secondary(), now))
                })
                .clone()
        };
        visitor.tab_at(tab_id, now)
    }

    #[cfg(test)]
    fn visitor(&self, visitor_id: &str) -> Option<Arc<Visitor>> {
        self.visitors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(visitor_id)
            .cloned()
    }

    #[must_use]
    pub fn visitor_count(&self) -> usize {
        self.visitors.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drop visitors not seen within the idle window. Returns how many went.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    fn evict_idle_at(&self, now: Instant) -> usize {
        let idle = self.idle;
        let mut visitors = self.visitors.lock().unwrap_or_else(PoisonError::into_inner);
        let before = visitors.len();
        visitors.retain(|_, visitor| now.saturating_duration_since(visitor.last_seen()) <= idle);
        before - visitors.len()
    }
}

/// Spawn the idle-visitor sweep. Also prunes the contact rate limiter.
pub fn spawn_visitor_sweep(
    visitors: Arc<VisitorRegistry>,
    rate_limiter: RateLimiter,
    interval: Duration,
) -> JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), "visitor sweep configured");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = visitors.evict_idle();
            rate_limiter.prune();
            if evicted > 0 {
                info!(evicted, remaining = visitors.visitor_count(), "evicted idle visitors");
            }
        }
    })
}

#[cfg(test)]
#[path = "visitor_test.rs"]
mod tests;
