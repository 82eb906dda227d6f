//! Identity resolution for a browser tab.
//!
//! SYSTEM CONTEXT
//! ==============
//! A visitor can be "signed in" through four independent signals: two local
//! role markers in browser storage (admin, guest), a primary hosted auth
//! session, and a secondary hosted identity session. Other tabs of the same
//! browser can flip the local markers at any time. This crate reconciles all of
//! them into one [`ClientIdentityState`] per tab via [`SessionResolver`].
//!
//! The crate is transport-agnostic: providers are `async_trait` seams and
//! storage is an in-process model of browser `localStorage` with cross-tab
//! change events. The server wires hosted provider clients into it.

pub mod barrier;
pub mod error;
pub mod noop;
pub mod provider;
pub mod record;
pub mod resolver;
pub mod role;
pub mod state;
pub mod storage;

pub use barrier::{ResolutionBarrier, Source};
pub use error::IdentityError;
pub use provider::{PopupGrant, PrimaryProvider, ProviderSession, SecondaryProvider};
pub use record::{IdentityFact, IdentityRecord, IdentitySource, MergedProfile, merge_profile};
pub use resolver::{AuthOutcome, HOME_ROUTE, MIN_SECRET_LEN, Navigation, SessionResolver};
pub use role::{LocalRole, Role};
pub use state::{ClientIdentityState, IdentityView, Resolution};
pub use storage::{ADMIN_FLAG_KEY, GUEST_FLAG_KEY, LOCALE_KEY, SharedStorage, StorageEvent, TabStorage};
