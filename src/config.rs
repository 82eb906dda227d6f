//! Service configuration parsed from environment variables.
//!
//! Only `PORT` can make startup fail. Every external integration is optional:
//! a missing block leaves that integration `None` and the service degrades
//! (no-op providers, log-only feedback store, inference disabled).

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SECONDARY_AUTH_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_VISITOR_IDLE_SECS: u64 = 3600;
pub const DEFAULT_VISITOR_SWEEP_INTERVAL_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid PORT: {0}")]
    InvalidPort(String),
}

/// Hosted password-auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryAuthConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Hosted popup identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryAuthConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceConfig {
    /// Image inference endpoint; `None` disables the upload demo.
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitorConfig {
    pub idle: Duration,
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub website_dir: PathBuf,
    pub cookie_secure: bool,
    pub provider_timeout: Duration,
    pub primary: Option<PrimaryAuthConfig>,
    pub secondary: Option<SecondaryAuthConfig>,
    pub inference: InferenceConfig,
    pub visitors: VisitorConfig,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// - `PORT` (default 3000)
    /// - `DATABASE_URL`: feedback persistence; log-only when absent
    /// - `WEBSITE_DIR`: static marketing site (default `./website`)
    /// - `COOKIE_SECURE`: defaults to `false`
    /// - `PRIMARY_AUTH_URL` + `PRIMARY_AUTH_KEY`
    /// - `SECONDARY_AUTH_API_KEY` (+ optional `SECONDARY_AUTH_URL`)
    /// - `PROVIDER_TIMEOUT_SECS`, `INFERENCE_URL`, `INFERENCE_TIMEOUT_SECS`
    /// - `VISITOR_IDLE_SECS`, `VISITOR_SWEEP_INTERVAL_SECS`
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` is set but not a valid port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_port(env_string("PORT").as_deref())?;
        let website_dir = env_string("WEBSITE_DIR").map_or_else(|| PathBuf::from("website"), PathBuf::from);

        Ok(Self {
            port,
            database_url: env_string("DATABASE_URL"),
            website_dir,
            cookie_secure: env_bool("COOKIE_SECURE").unwrap_or(false),
            provider_timeout: Duration::from_secs(env_parse("PROVIDER_TIMEOUT_SECS", DEFAULT_PROVIDER_TIMEOUT_SECS)),
            primary: primary_config(env_string("PRIMARY_AUTH_URL"), env_string("PRIMARY_AUTH_KEY")),
            secondary: secondary_config(env_string("SECONDARY_AUTH_URL"), env_string("SECONDARY_AUTH_API_KEY")),
            inference: InferenceConfig {
                endpoint: env_string("INFERENCE_URL"),
                timeout: Duration::from_secs(env_parse("INFERENCE_TIMEOUT_SECS", DEFAULT_INFERENCE_TIMEOUT_SECS)),
            },
            visitors: VisitorConfig {
                idle: Duration::from_secs(env_parse("VISITOR_IDLE_SECS", DEFAULT_VISITOR_IDLE_SECS)),
                sweep_interval: Duration::from_secs(env_parse(
                    "VISITOR_SWEEP_INTERVAL_SECS",
                    DEFAULT_VISITOR_SWEEP_INTERVAL_SECS,
                )),
            },
        })
    }
}

/// Non-empty, trimmed env value.
pub(crate) fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_port(raw: Option<&str>) -> Result<u16, ConfigError> {
    match raw {
        None => Ok(DEFAULT_PORT),
        Some(value) => value
            .parse::<u16>()
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| ConfigError::InvalidPort(value.to_owned())),
    }
}

fn primary_config(base_url: Option<String>, api_key: Option<String>) -> Option<PrimaryAuthConfig> {
    Some(PrimaryAuthConfig { base_url: trim_base_url(&base_url?), api_key: api_key? })
}

fn secondary_config(base_url: Option<String>, api_key: Option<String>) -> Option<SecondaryAuthConfig> {
    let base_url = base_url.unwrap_or_else(|| DEFAULT_SECONDARY_AUTH_URL.to_owned());
    Some(SecondaryAuthConfig { base_url: trim_base_url(&base_url), api_key: api_key? })
}

fn trim_base_url(raw: &str) -> String {
    raw.trim_end_matches('/').to_owned()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
