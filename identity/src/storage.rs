//! Browser-style key/value storage shared by every tab of one visitor.
//!
//! DESIGN
//! ======
//! Mirrors `localStorage` semantics: one [`SharedStorage`] per visitor, one
//! [`TabStorage`] handle per tab. A write through one handle broadcasts a
//! [`StorageEvent`] that every *other* tab's subscription receives; the
//! writing tab never sees its own events. A clear, or a subscriber that fell
//! behind the broadcast buffer, surfaces as an event with `key: None`, which
//! listeners treat as "re-read everything".

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

pub const ADMIN_FLAG_KEY: &str = "isAdmin";
pub const GUEST_FLAG_KEY: &str = "isGuest";
pub const LOCALE_KEY: &str = "language";

const FLAG_SET: &str = "true";
const EVENT_CAPACITY: usize = 64;

/// Change notification delivered to other tabs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Changed key, or `None` when the whole storage must be re-read.
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    origin: u64,
}

impl StorageEvent {
    /// True when the event may have changed `key`.
    #[must_use]
    pub fn touches(&self, key: &str) -> bool {
        self.key.as_deref().is_none_or(|k| k == key)
    }
}

pub struct SharedStorage {
    entries: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
    next_tab: AtomicU64,
}

impl SharedStorage {
    #[must_use]
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self { entries: Mutex::new(HashMap::new()), events, next_tab: AtomicU64::new(1) })
    }

    /// Open a handle for a new tab.
    #[must_use]
    pub fn open_tab(self: &Arc<Self>) -> TabStorage {
        let tab = self.next_tab.fetch_add(1, Ordering::Relaxed);
        TabStorage { shared: Arc::clone(self), tab }
    }

    fn with_entries<R>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> R) -> R {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut entries)
    }

    fn emit(&self, event: StorageEvent) {
        // No receivers just means no other tab is listening.
        let _ = self.events.send(event);
    }
}

/// One tab's view of a [`SharedStorage`].
#[derive(Clone)]
pub struct TabStorage {
    shared: Arc<SharedStorage>,
    tab: u64,
}

impl TabStorage {
    #[must_use]
    pub fn tab_id(&self) -> u64 {
        self.tab
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.shared.with_entries(|entries| entries.get(key).cloned())
    }

    /// Store `value` under `key`. Writing an identical value raises no event.
    pub fn set(&self, key: &str, value: &str) {
        let old_value = self
            .shared
            .with_entries(|entries| entries.insert(key.to_owned(), value.to_owned()));
        if old_value.as_deref() == Some(value) {
            return;
        }
        self.shared.emit(StorageEvent {
            key: Some(key.to_owned()),
            old_value,
            new_value: Some(value.to_owned()),
            origin: self.tab,
        });
    }

    pub fn remove(&self, key: &str) {
        let Some(old_value) = self.shared.with_entries(|entries| entries.remove(key)) else {
            return;
        };
        self.shared.emit(StorageEvent {
            key: Some(key.to_owned()),
            old_value: Some(old_value),
            new_value: None,
            origin: self.tab,
        });
    }

    pub fn clear(&self) {
        let had_entries = self.shared.with_entries(|entries| {
            let had = !entries.is_empty();
            entries.clear();
            had
        });
        if had_entries {
            self.shared
                .emit(StorageEvent { key: None, old_value: None, new_value: None, origin: self.tab });
        }
    }

    /// Read a boolean marker. Only the exact string `"true"` counts as set.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).as_deref() == Some(FLAG_SET)
    }

    pub fn set_flag(&self, key: &str, on: bool) {
        if on {
            self.set(key, FLAG_SET);
        } else {
            self.remove(key);
        }
    }

    /// Subscribe to writes made by other tabs.
    #[must_use]
    pub fn subscribe(&self) -> StorageSubscription {
        StorageSubscription { rx: self.shared.events.subscribe(), tab: self.tab }
    }
}

pub struct StorageSubscription {
    rx: broadcast::Receiver<StorageEvent>,
    tab: u64,
}

impl StorageSubscription {
    /// Wait for the next foreign storage event. `None` once the storage is gone.
    pub async fn next(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.origin == self.tab => {}
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(tab = self.tab, skipped, "storage listener lagged; forcing resync");
                    return Some(StorageEvent { key: None, old_value: None, new_value: None, origin: 0 });
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
