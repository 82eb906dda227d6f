//! Identity error taxonomy.
//!
//! Providers report failures as [`IdentityError`]; the resolver turns them into
//! [`crate::AuthOutcome`] values and never lets them escape.

/// Substrings that mark a provider message as a connectivity failure.
const NETWORK_MARKERS: &[&str] = &[
    "failed to fetch",
    "fetch failed",
    "network",
    "connection",
    "timed out",
    "timeout",
    "dns",
    "unreachable",
];

pub const NETWORK_USER_MESSAGE: &str =
    "No se pudo conectar con el servicio de autenticación. Revisa tu conexión e inténtalo de nuevo.";
pub const UNAVAILABLE_USER_MESSAGE: &str = "El servicio de autenticación no está disponible en este momento.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// Input rejected locally before any provider call.
    #[error("{0}")]
    Validation(String),
    /// The provider client was never configured or failed to initialize.
    #[error("identity provider unavailable")]
    ProviderUnavailable,
    /// The provider rejected the credentials or the request.
    #[error("{0}")]
    Credential(String),
    /// The request never reached the provider or the response was lost.
    #[error("{0}")]
    Network(String),
}

impl IdentityError {
    /// Classify a raw provider message by substring.
    #[must_use]
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_ascii_lowercase();
        if NETWORK_MARKERS.iter().any(|marker| lowered.contains(marker)) {
            Self::Network(message)
        } else {
            Self::Credential(message)
        }
    }

    /// The provider's own message, used verbatim for sign-in failures.
    #[must_use]
    pub fn provider_message(&self) -> String {
        match self {
            Self::ProviderUnavailable => UNAVAILABLE_USER_MESSAGE.to_owned(),
            other => other.to_string(),
        }
    }

    /// Friendlier text that separates connectivity problems from rejections.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => NETWORK_USER_MESSAGE.to_owned(),
            other => other.provider_message(),
        }
    }

    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
