//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `BAZAAR_API_URL` - Marketplace REST API base URL (default: `http://localhost:8000/api`)
//! - `BAZAAR_API_TOKEN` - Bearer token of the signed-in user
//! - `BAZAAR_API_TIMEOUT_SECS` - Per-request timeout shared by all calls (default: 30)
//! - `BAZAAR_STATE_DIR` - Directory holding the local fallback cart cache (default: `.bazaar`)
//! - `BAZAAR_PRODUCT_CACHE_TTL_SECS` - Product detail cache TTL (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_STATE_DIR: &str = ".bazaar";
pub const DEFAULT_PRODUCT_CACHE_TTL_SECS: u64 = 300;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "insert",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Marketplace client configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct ClientConfig {
    /// REST API base URL, always ending in `/`
    pub api_url: Url,
    /// Bearer token of the signed-in user
    pub api_token: Option<SecretString>,
    /// Timeout applied to every request
    pub request_timeout: Duration,
    /// Directory for locally persisted state
    pub state_dir: PathBuf,
    /// How long product details stay cached
    pub product_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .field("state_dir", &self.state_dir)
            .field("product_cache_ttl", &self.product_cache_ttl)
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed or the API token
    /// fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ClientConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = parse_base_url(
            "BAZAAR_API_URL",
            &lookup("BAZAAR_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        )?;

        let api_token = match lookup("BAZAAR_API_TOKEN").filter(|t| !t.is_empty()) {
            Some(token) => {
                validate_secret_strength(&token, "BAZAAR_API_TOKEN")?;
                Some(SecretString::from(token))
            }
            None => None,
        };

        let request_timeout = Duration::from_secs(parse_positive_secs(
            "BAZAAR_API_TIMEOUT_SECS",
            lookup("BAZAAR_API_TIMEOUT_SECS"),
            DEFAULT_TIMEOUT_SECS,
        )?);

        let product_cache_ttl = Duration::from_secs(parse_positive_secs(
            "BAZAAR_PRODUCT_CACHE_TTL_SECS",
            lookup("BAZAAR_PRODUCT_CACHE_TTL_SECS"),
            DEFAULT_PRODUCT_CACHE_TTL_SECS,
        )?);

        let state_dir = PathBuf::from(
            lookup("BAZAAR_STATE_DIR").unwrap_or_else(|| DEFAULT_STATE_DIR.to_string()),
        );

        Ok(Self {
            api_url,
            api_token,
            request_timeout,
            state_dir,
            product_cache_ttl,
            sentry_dsn: lookup("SENTRY_DSN"),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration pointing at `api_url` with every other setting defaulted.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `api_url` is not a valid base URL.
    pub fn for_api_url(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_base_url("BAZAAR_API_URL", api_url)?,
            api_token: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            product_cache_ttl: Duration::from_secs(DEFAULT_PRODUCT_CACHE_TTL_SECS),
            sentry_dsn: None,
            sentry_environment: None,
        })
    }

    /// Expose the API token for building the `Authorization` header.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.api_token.as_ref().map(ExposeSecret::expose_secret)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a base URL and make sure relative joins stay below its path.
fn parse_base_url(var_name: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "URL cannot be used as a base".to_string(),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Parse a positive number of seconds, falling back to `default` when unset.
fn parse_positive_secs(
    var_name: &str,
    value: Option<String>,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };

    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must be greater than zero".to_string(),
        )),
        Ok(secs) => Ok(secs),
        Err(e) => Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            e.to_string(),
        )),
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the token issued at login."
            ),
        ));
    }

    Ok(())
}
