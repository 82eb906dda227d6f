//! Identity records and the merge rule across providers.
//!
//! DESIGN
//! ======
//! The two hosted providers are never unified into one user object. Each signed
//! in provider contributes an [`IdentityFact`]; display fields are resolved by
//! [`merge_profile`] walking the facts in [`IdentitySource::precedence`] order.

use serde::{Deserialize, Serialize};

/// Opaque user record as reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Provider-scoped user identifier.
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl IdentityRecord {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), email: None, display_name: None, photo_url: None }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentitySource {
    Primary,
    Secondary,
}

impl IdentitySource {
    /// Lower ranks win when both providers supply a field.
    #[must_use]
    pub fn precedence(self) -> u8 {
        match self {
            Self::Secondary => 0,
            Self::Primary => 1,
        }
    }
}

/// One authenticated identity reported by one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityFact {
    pub source: IdentitySource,
    pub record: IdentityRecord,
}

/// Display fields resolved across every signed-in provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedProfile {
    pub display_name: String,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    /// Provider whose record supplied the display name.
    pub name_source: Option<IdentitySource>,
}

/// Merge facts into one profile, or `None` when no provider is signed in.
///
/// Each field is taken from the highest-precedence fact that has it. A missing
/// display name falls back to the local part of the resolved email, then to
/// the highest-precedence user id.
#[must_use]
pub fn merge_profile(facts: &[IdentityFact]) -> Option<MergedProfile> {
    let mut ordered: Vec<&IdentityFact> = facts.iter().collect();
    ordered.sort_by_key(|fact| fact.source.precedence());
    let first = ordered.first()?;

    let named = ordered
        .iter()
        .find_map(|fact| non_empty(fact.record.display_name.as_deref()).map(|name| (name, fact.source)));
    let email = ordered
        .iter()
        .find_map(|fact| non_empty(fact.record.email.as_deref()))
        .map(str::to_owned);
    let photo_url = ordered
        .iter()
        .find_map(|fact| non_empty(fact.record.photo_url.as_deref()))
        .map(str::to_owned);

    let (display_name, name_source) = match named {
        Some((name, source)) => (name.to_owned(), Some(source)),
        None => {
            let fallback = email
                .as_deref()
                .and_then(|e| e.split('@').next())
                .filter(|local| !local.is_empty())
                .unwrap_or(first.record.id.as_str());
            (fallback.to_owned(), None)
        }
    };

    Some(MergedProfile { display_name, email, photo_url, name_source })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "record_test.rs"]
mod tests;
