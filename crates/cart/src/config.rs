//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `CART_API_URL` - Stock/product API base URL (default: `http://localhost:3333`)
//! - `CART_API_TOKEN` - Bearer token sent to the stock API
//! - `CART_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `CART_PRODUCT_CACHE_TTL_SECS` - Product metadata cache TTL, `0` disables (default: 300)
//! - `CART_STORAGE_DIR` - Directory holding the persisted cart (default: `.rocket-cart`)
//! - `CART_STORAGE_KEY` - Slot name for the persisted cart (default: `@RocketShoes:cart`)
//! - `CART_CURRENCY` - ISO 4217 code used for display (default: `BRL`)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use rocket_cart_core::CurrencyCode;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:3333";
pub const DEFAULT_STORAGE_DIR: &str = ".rocket-cart";
pub const DEFAULT_STORAGE_KEY: &str = "@RocketShoes:cart";

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Cart application configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Stock/product API configuration
    pub api: ApiConfig,
    /// Persisted cart location
    pub storage: StorageConfig,
    /// Currency used when displaying prices
    pub currency: CurrencyCode,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Stock/product API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL; `/products/{id}` and `/stock/{id}` are resolved against it
    pub base_url: Url,
    /// Optional bearer token
    pub token: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
    /// How long product metadata stays cached (zero disables the cache)
    pub product_cache_ttl: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("product_cache_ttl", &self.product_cache_ttl)
            .finish()
    }
}

impl ApiConfig {
    /// Config pointing at `base_url` with default timeout and cache TTL.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            token: None,
            timeout: Duration::from_secs(10),
            product_cache_ttl: Duration::from_secs(300),
        }
    }
}

/// Where the cart is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub dir: PathBuf,
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid, or if the
    /// API token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`CartConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let base_url_raw = env.or_default("CART_API_URL", DEFAULT_API_URL);
        let base_url = Url::parse(&base_url_raw).map_err(|e| {
            ConfigError::InvalidEnvVar("CART_API_URL".to_string(), e.to_string())
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "CART_API_URL".to_string(),
                "must be a hierarchical URL such as http://host:port".to_string(),
            ));
        }

        let token = match env.optional("CART_API_TOKEN") {
            Some(value) => {
                validate_secret_strength(&value, "CART_API_TOKEN")?;
                Some(SecretString::from(value))
            }
            None => None,
        };

        let api = ApiConfig {
            base_url,
            token,
            timeout: Duration::from_secs(env.parse_or("CART_HTTP_TIMEOUT_SECS", 10)?),
            product_cache_ttl: Duration::from_secs(
                env.parse_or("CART_PRODUCT_CACHE_TTL_SECS", 300)?,
            ),
        };

        let storage = StorageConfig {
            dir: PathBuf::from(env.or_default("CART_STORAGE_DIR", DEFAULT_STORAGE_DIR)),
            key: env.or_default("CART_STORAGE_KEY", DEFAULT_STORAGE_KEY),
        };
        if storage.key.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "CART_STORAGE_KEY".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let currency = env
            .or_default("CART_CURRENCY", CurrencyCode::default().code())
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("CART_CURRENCY".to_string(), e))?;

        Ok(Self {
            api,
            storage,
            currency,
            sentry_dsn: env.optional("SENTRY_DSN"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with the usual defaulting rules.
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable; empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
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
    let len = s.chars().count() as f64;
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated token."
            ),
        ));
    }

    Ok(())
}

/// Expose the token for building an `Authorization` header.
pub(crate) fn bearer_value(token: &SecretString) -> String {
    format!("Bearer {}", token.expose_secret())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CartConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.api.base_url.as_str(), "http://localhost:3333/");
        assert!(config.api.token.is_none());
        assert_eq!(config.api.timeout, Duration::from_secs(10));
        assert_eq!(config.api.product_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.storage, StorageConfig::default());
        assert_eq!(config.currency, CurrencyCode::BRL);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = CartConfig::from_lookup(lookup(&[
            ("CART_API_URL", "https://api.example.test/v1/"),
            ("CART_HTTP_TIMEOUT_SECS", "3"),
            ("CART_PRODUCT_CACHE_TTL_SECS", "0"),
            ("CART_STORAGE_DIR", "/tmp/carts"),
            ("CART_STORAGE_KEY", "session-42"),
            ("CART_CURRENCY", "usd"),
        ]))
        .unwrap();

        assert_eq!(config.api.base_url.path(), "/v1/");
        assert_eq!(config.api.timeout, Duration::from_secs(3));
        assert_eq!(config.api.product_cache_ttl, Duration::ZERO);
        assert_eq!(config.storage.dir, PathBuf::from("/tmp/carts"));
        assert_eq!(config.storage.key, "session-42");
        assert_eq!(config.currency, CurrencyCode::USD);
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() {
        let config = CartConfig::from_lookup(lookup(&[("CART_STORAGE_KEY", "  ")])).unwrap();
        assert_eq!(config.storage.key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn test_invalid_url() {
        let err = CartConfig::from_lookup(lookup(&[("CART_API_URL", "not a url")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "CART_API_URL"));

        let err = CartConfig::from_lookup(lookup(&[("CART_API_URL", "mailto:shop@example.test")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_invalid_timeout() {
        let err =
            CartConfig::from_lookup(lookup(&[("CART_HTTP_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "CART_HTTP_TIMEOUT_SECS")
        );
    }

    #[test]
    fn test_invalid_currency() {
        let err = CartConfig::from_lookup(lookup(&[("CART_CURRENCY", "DOGE")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "CART_CURRENCY"));
    }

    #[test]
    fn test_placeholder_token_rejected() {
        let err =
            CartConfig::from_lookup(lookup(&[("CART_API_TOKEN", "your-token-here")])).unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_low_entropy_token_rejected() {
        let err = CartConfig::from_lookup(lookup(&[("CART_API_TOKEN", "aaaaaaaaaaaaaaaa")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_token_just_below_threshold_rejected() {
        // Nine distinct characters: log2(9) is about 3.17 bits/char.
        let token = "k7Qm2xP9z";
        assert!(shannon_entropy(token) < MIN_ENTROPY_BITS_PER_CHAR);
        assert!(shannon_entropy(token) > 3.0);

        let err = CartConfig::from_lookup(lookup(&[("CART_API_TOKEN", token)])).unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(ref key, _) if key == "CART_API_TOKEN"));
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_api_config_debug_redacts_token() {
        let config = CartConfig::from_lookup(lookup(&[(
            "CART_API_TOKEN",
            "tK9$qW2!zR7@pL4#vN8&",
        )]))
        .unwrap();

        let debug_output = format!("{:?}", config.api);
        assert!(debug_output.contains("localhost:3333"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("tK9$qW2!zR7@pL4#vN8&"));
    }
}
