//! Marketplace REST API client.
//!
//! # Architecture
//!
//! - The marketplace backend is the source of truth for products, auctions,
//!   wallets and orders. Nothing is synced locally.
//! - Product reads are cached in memory via `moka` (5 minute TTL).
//! - The customer's bearer token travels with every request except the
//!   account endpoints listed in [`AUTH_EXCLUDED_PATHS`].
//! - Failed calls carry the backend's own message (see
//!   [`extract_error_message`]) so handlers can show it verbatim.

mod auth;
mod client;
pub mod types;

pub use auth::{CustomerSession, LoginRequest};
pub use client::MarketplaceClient;
pub use types::*;

use serde_json::Value;
use thiserror::Error;

/// Paths that never carry the bearer token.
pub const AUTH_EXCLUDED_PATHS: &[&str] = &[
    "/register",
    "/login",
    "/oauth2/authorization",
    "/user-service/v1/account/confirm-otp",
    "/user-service/v1/account/resend-otp",
    "/user-service/v1/account/forgot-password",
    "/user-service/v1/account/reset-password",
];

/// Shown when the backend gives no usable message.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Errors that can occur when talking to the marketplace API.
#[derive(Debug, Error)]
pub enum MarketplaceError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Login succeeded but no session token could be found in the response.
    #[error("Login response did not contain a token")]
    MissingToken,

    /// Request path could not be joined onto the base URL.
    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

impl MarketplaceError {
    /// Whether the backend rejected the bearer token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. })
    }

    /// Message safe to show to the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::NotFound(_) => "We couldn't find that.".to_string(),
            Self::MissingToken => "Login failed. Please try again.".to_string(),
            Self::Http(_) | Self::Parse(_) | Self::Url(_) => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Whether a request to `path` should carry the bearer token.
#[must_use]
pub fn requires_auth(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    !AUTH_EXCLUDED_PATHS
        .iter()
        .any(|excluded| path.contains(excluded))
}

/// Pull a human-readable message out of an error response body.
///
/// Looks in order at `message` (a string, or the first element of an
/// array), `error` (a string, or its JSON text), `errors` (the first value of
/// an object, or the first element of an array), then a bare string body.
/// Returns `None` when none of those yields text.
#[must_use]
pub fn extract_error_message(body: &str) -> Option<String> {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        let text = body.trim();
        return (!text.is_empty() && !text.starts_with('<')).then(|| text.to_string());
    };

    if let Value::String(text) = &json {
        return non_empty(text);
    }

    if let Some(message) = json.get("message") {
        let found = match message {
            Value::Array(items) => items.first().and_then(text_of),
            other => text_of(other),
        };
        if found.is_some() {
            return found;
        }
    }

    if let Some(error) = json.get("error") {
        let found = match error {
            Value::String(text) => non_empty(text),
            Value::Null => None,
            other => Some(other.to_string()),
        };
        if found.is_some() {
            return found;
        }
    }

    let first_error = match json.get("errors") {
        Some(Value::Object(map)) => map.values().next(),
        Some(Value::Array(items)) => items.first(),
        _ => None,
    };
    first_error.and_then(|value| match value {
        Value::Array(items) => items.first().and_then(text_of),
        other => text_of(other),
    })
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => non_empty(text),
        Value::Null => None,
        Value::Object(map) => map.get("message").and_then(text_of),
        other => Some(other.to_string()),
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_auth() {
        assert!(!requires_auth("/login"));
        assert!(!requires_auth("/register"));
        assert!(!requires_auth("/user-service/v1/account/confirm-otp"));
        assert!(!requires_auth("/user-service/v1/account/reset-password?x=1"));
        assert!(!requires_auth("/oauth2/authorization/google"));
        assert!(!requires_auth("/login/"));
        assert!(requires_auth("/wallet/balance"));
        assert!(requires_auth("/orders"));
        assert!(requires_auth("/product-service/v1/products"));
    }

    #[test]
    fn test_message_string_and_array() {
        assert_eq!(
            extract_error_message(r#"{"message":"Insufficient balance"}"#).unwrap(),
            "Insufficient balance"
        );
        assert_eq!(
            extract_error_message(r#"{"message":["amount must be positive","other"]}"#).unwrap(),
            "amount must be positive"
        );
    }

    #[test]
    fn test_error_string_or_json_text() {
        assert_eq!(
            extract_error_message(r#"{"error":"Auction ended"}"#).unwrap(),
            "Auction ended"
        );
        assert_eq!(
            extract_error_message(r#"{"error":{"code":42}}"#).unwrap(),
            r#"{"code":42}"#
        );
    }

    #[test]
    fn test_errors_object_first_value() {
        assert_eq!(
            extract_error_message(r#"{"errors":{"email":["Email is taken"],"name":"x"}}"#)
                .unwrap(),
            "Email is taken"
        );
        assert_eq!(
            extract_error_message(r#"{"errors":[{"message":"Bad voucher"}]}"#).unwrap(),
            "Bad voucher"
        );
    }

    #[test]
    fn test_bare_string_bodies() {
        assert_eq!(extract_error_message(r#""Forbidden""#).unwrap(), "Forbidden");
        assert_eq!(extract_error_message("Service down").unwrap(), "Service down");
        assert!(extract_error_message("<html><body>502</body></html>").is_none());
        assert!(extract_error_message("").is_none());
        assert!(extract_error_message(r#"{"status":500}"#).is_none());
    }

    #[test]
    fn test_message_precedence() {
        assert_eq!(
            extract_error_message(r#"{"error":"second","message":"first"}"#).unwrap(),
            "first"
        );
        assert_eq!(
            extract_error_message(r#"{"message":"","error":"fallback"}"#).unwrap(),
            "fallback"
        );
    }

    #[test]
    fn test_user_message_hides_transport_details() {
        let err = MarketplaceError::Parse("expected value at line 1".to_string());
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);

        let err = MarketplaceError::Api {
            status: 400,
            message: "Bid too low".to_string(),
        };
        assert_eq!(err.user_message(), "Bid too low");
        assert!(!err.is_unauthorized());
    }
}
