//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (session store)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `MARKETPLACE_API_URL` - Base URL of the marketplace REST API
//! - `GHN_TOKEN` - Shipping-rate API token
//! - `GHN_SHOP_ID` - Shipping-rate API shop id
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `GHN_API_URL` - Shipping-rate API base URL (default: GHN production gateway)
//! - `GHN_SERVICE_ID` - Service id used for lead-time quotes (default: 53320)
//! - `CART_MAX_LINES` - Maximum distinct cart lines, `0` for unlimited (default: 1)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - Sampling (default: 1.0 / 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_GHN_API_URL: &str = "https://online-gateway.ghn.vn/shiip/public-api";
const DEFAULT_GHN_SERVICE_ID: u32 = 53_320;
const DEFAULT_CART_MAX_LINES: usize = 1;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Marketplace REST API configuration
    pub marketplace: MarketplaceConfig,
    /// Shipping-rate API configuration
    pub shipping: ShippingConfig,
    /// Cart line cap, `None` for unlimited
    pub cart_max_lines: Option<usize>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g. "production")
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Marketplace REST API configuration.
#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    /// Base URL; request paths are appended to it.
    pub api_url: Url,
}

/// Shipping-rate (GHN) API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct ShippingConfig {
    /// Base URL of the public API gateway.
    pub api_url: Url,
    /// API token sent in the `Token` header.
    pub token: SecretString,
    /// Shop id sent in the `ShopId` header.
    pub shop_id: String,
    /// Service id for lead-time quotes.
    pub service_id: u32,
}

impl std::fmt::Debug for ShippingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShippingConfig")
            .field("api_url", &self.api_url.as_str())
            .field("token", &"[REDACTED]")
            .field("shop_id", &self.shop_id)
            .field("service_id", &self.service_id)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let marketplace = MarketplaceConfig::from_env()?;
        let shipping = ShippingConfig::from_env()?;
        let cart_max_lines = parse_cart_max_lines(get_optional_env("CART_MAX_LINES").as_deref())?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            marketplace,
            shipping,
            cart_max_lines,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Only the session database URL, for tools that need nothing else.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if neither `STOREFRONT_DATABASE_URL`
    /// nor `DATABASE_URL` is set.
    pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
        let _ = dotenvy::dotenv();
        get_database_url("STOREFRONT_DATABASE_URL")
    }
}

impl MarketplaceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_url("MARKETPLACE_API_URL", &get_required_env("MARKETPLACE_API_URL")?)?,
        })
    }
}

impl ShippingConfig {
    /// Load the GHN settings on their own (used by the CLI quote command).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the token or shop id is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            api_url: parse_url(
                "GHN_API_URL",
                &get_env_or_default("GHN_API_URL", DEFAULT_GHN_API_URL),
            )?,
            token: get_validated_secret("GHN_TOKEN")?,
            shop_id: get_required_env("GHN_SHOP_ID")?,
            service_id: parse_env("GHN_SERVICE_ID", &DEFAULT_GHN_SERVICE_ID.to_string())?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into any `FromStr` type.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse an absolute base URL, normalising it to end with `/` so that
/// `Url::join` appends rather than replaces the last path segment.
fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// `CART_MAX_LINES`: unset means the default cap, `0` means unlimited.
fn parse_cart_max_lines(value: Option<&str>) -> Result<Option<usize>, ConfigError> {
    let Some(raw) = value else {
        return Ok(Some(DEFAULT_CART_MAX_LINES));
    };
    match raw.trim().parse::<usize>() {
        Ok(0) => Ok(None),
        Ok(n) => Ok(Some(n)),
        Err(e) => Err(ConfigError::InvalidEnvVar(
            "CART_MAX_LINES".to_string(),
            e.to_string(),
        )),
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
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
            #[allow(clippy::cast_precision_loss)]
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_bounds() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > MIN_ENTROPY_BITS_PER_CHAR);
    }

    #[test]
    fn test_validate_secret_strength_rejects_placeholders() {
        let err = validate_secret_strength("your-ghn-token-here", "GHN_TOKEN").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(ref var, _) if var == "GHN_TOKEN"));
        assert!(validate_secret_strength("changeme123", "GHN_TOKEN").is_err());
    }

    #[test]
    fn test_validate_secret_strength_accepts_random_token() {
        assert!(validate_secret_strength("9f1c7d2a-6b4e-4f0a-8c3d-b51e2a7f9d60", "GHN_TOKEN").is_ok());
    }

    #[test]
    fn test_validate_session_secret_length() {
        assert!(validate_session_secret(&SecretString::from("short"), "S").is_err());
        assert!(validate_session_secret(&SecretString::from("a".repeat(32)), "S").is_ok());
    }

    #[test]
    fn test_parse_cart_max_lines() {
        assert_eq!(parse_cart_max_lines(None).unwrap(), Some(1));
        assert_eq!(parse_cart_max_lines(Some("0")).unwrap(), None);
        assert_eq!(parse_cart_max_lines(Some(" 5 ")).unwrap(), Some(5));
        assert!(matches!(
            parse_cart_max_lines(Some("many")),
            Err(ConfigError::InvalidEnvVar(..))
        ));
    }

    #[test]
    fn test_parse_url_appends_trailing_slash() {
        let url = parse_url("X", "https://api.example.vn/api").unwrap();
        assert_eq!(url.as_str(), "https://api.example.vn/api/");
        assert_eq!(
            url.join("wallet/balance").unwrap().as_str(),
            "https://api.example.vn/api/wallet/balance"
        );
        assert!(parse_url("X", "not a url").is_err());
    }

    #[test]
    fn test_shipping_config_debug_redacts_token() {
        let config = ShippingConfig {
            api_url: parse_url("X", DEFAULT_GHN_API_URL).unwrap(),
            token: SecretString::from("super_secret_ghn_token"),
            shop_id: "885".to_string(),
            service_id: DEFAULT_GHN_SERVICE_ID,
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("885"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_ghn_token"));
    }
}
