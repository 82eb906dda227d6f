//! Role variants.
//!
//! The local admin/guest markers live in two separate storage keys, but the
//! resolver only ever holds a single [`LocalRole`], so "admin and guest at the
//! same time" is unrepresentable once read.

use serde::Serialize;

use crate::record::IdentityRecord;

/// Client-side-only session granted by a hard-coded credential pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalRole {
    #[default]
    None,
    Admin,
    Guest,
}

impl LocalRole {
    /// Collapse the two storage markers into one role.
    ///
    /// Both markers present means the storage was edited by hand or two tabs
    /// raced; the less privileged role wins.
    #[must_use]
    pub fn from_flags(admin: bool, guest: bool) -> Self {
        match (admin, guest) {
            (_, true) => Self::Guest,
            (true, false) => Self::Admin,
            (false, false) => Self::None,
        }
    }

    #[must_use]
    pub fn is_privileged(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Resolved role as seen by route guards and UI chrome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Role {
    Anonymous,
    Admin,
    Guest,
    Primary { user: IdentityRecord },
    Secondary { user: IdentityRecord },
    PrimaryAndSecondary { primary: IdentityRecord, secondary: IdentityRecord },
}

impl Role {
    /// Local roles take precedence over remote sessions.
    #[must_use]
    pub fn derive(local: LocalRole, primary: Option<&IdentityRecord>, secondary: Option<&IdentityRecord>) -> Self {
        match local {
            LocalRole::Admin => return Self::Admin,
            LocalRole::Guest => return Self::Guest,
            LocalRole::None => {}
        }
        match (primary, secondary) {
            (None, None) => Self::Anonymous,
            (Some(p), None) => Self::Primary { user: p.clone() },
            (None, Some(s)) => Self::Secondary { user: s.clone() },
            (Some(p), Some(s)) => Self::PrimaryAndSecondary { primary: p.clone(), secondary: s.clone() },
        }
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

#[cfg(test)]
#[path = "role_test.rs"]
mod tests;
