//! The per-tab identity snapshot published by the resolver.

use serde::Serialize;

use crate::record::{IdentityFact, IdentityRecord, IdentitySource, MergedProfile, merge_profile};
use crate::role::{LocalRole, Role};

const ADMIN_DISPLAY_NAME: &str = "Administrador";
const GUEST_DISPLAY_NAME: &str = "Invitado";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    #[default]
    Unresolved,
    Resolving,
    Resolved,
}

/// Union of every signal that decides what a visitor may see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIdentityState {
    pub local: LocalRole,
    /// Signed-in provider identities, at most one per source.
    pub facts: Vec<IdentityFact>,
    pub resolution: Resolution,
    /// In-flight sign-in or sign-up. Independent from `resolution`.
    pub sign_in_pending: bool,
}

impl ClientIdentityState {
    #[must_use]
    pub fn primary_user(&self) -> Option<&IdentityRecord> {
        self.fact(IdentitySource::Primary)
    }

    #[must_use]
    pub fn secondary_user(&self) -> Option<&IdentityRecord> {
        self.fact(IdentitySource::Secondary)
    }

    #[must_use]
    pub fn is_privileged_admin(&self) -> bool {
        self.local == LocalRole::Admin
    }

    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.local == LocalRole::Guest
    }

    #[must_use]
    pub fn is_resolving(&self) -> bool {
        self.resolution != Resolution::Resolved
    }

    #[must_use]
    pub fn role(&self) -> Role {
        Role::derive(self.local, self.primary_user(), self.secondary_user())
    }

    /// Display profile. Local roles get fixed names; otherwise provider facts
    /// are merged with secondary-first precedence.
    #[must_use]
    pub fn profile(&self) -> Option<MergedProfile> {
        let fixed = match self.local {
            LocalRole::Admin => ADMIN_DISPLAY_NAME,
            LocalRole::Guest => GUEST_DISPLAY_NAME,
            LocalRole::None => return merge_profile(&self.facts),
        };
        Some(MergedProfile { display_name: fixed.to_owned(), email: None, photo_url: None, name_source: None })
    }

    /// Replace or drop the fact for `source`.
    pub fn set_fact(&mut self, source: IdentitySource, record: Option<IdentityRecord>) {
        self.facts.retain(|fact| fact.source != source);
        if let Some(record) = record {
            self.facts.push(IdentityFact { source, record });
            self.facts.sort_by_key(|fact| fact.source.precedence());
        }
    }

    fn fact(&self, source: IdentitySource) -> Option<&IdentityRecord> {
        self.facts
            .iter()
            .find(|fact| fact.source == source)
            .map(|fact| &fact.record)
    }
}

/// Wire shape of [`ClientIdentityState`] for the browser shell.
#[derive(Debug, Clone, Serialize)]
pub struct IdentityView {
    pub primary_user: Option<IdentityRecord>,
    pub secondary_user: Option<IdentityRecord>,
    pub is_privileged_admin: bool,
    pub is_guest: bool,
    pub is_resolving: bool,
    pub sign_in_pending: bool,
    pub resolution: Resolution,
    pub role: Role,
    pub profile: Option<MergedProfile>,
}

impl From<&ClientIdentityState> for IdentityView {
    fn from(state: &ClientIdentityState) -> Self {
        Self {
            primary_user: state.primary_user().cloned(),
            secondary_user: state.secondary_user().cloned(),
            is_privileged_admin: state.is_privileged_admin(),
            is_guest: state.is_guest(),
            is_resolving: state.is_resolving(),
            sign_in_pending: state.sign_in_pending,
            resolution: state.resolution,
            role: state.role(),
            profile: state.profile(),
        }
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
