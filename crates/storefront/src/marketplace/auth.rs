//! Password login and the customer session it produces.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use evmarket_core::UserId;

use super::MarketplaceError;

const TOKEN_KEYS: &[&str] = &["token", "accessToken", "access_token"];
const USER_ID_KEYS: &[&str] = &["user_id", "userId", "id", "_id"];
const NESTED_KEYS: &[&str] = &["metadata", "content"];

/// Body of `POST /login`.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Logged-in customer, stored in the visitor's session.
///
/// Implements `Debug` manually to redact the tokens.
#[derive(Clone, Serialize, Deserialize)]
pub struct CustomerSession {
    /// Bearer token for marketplace requests.
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user_id: Option<UserId>,
    pub email: String,
    /// Unix timestamp when the token was obtained.
    pub obtained_at: i64,
}

impl std::fmt::Debug for CustomerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomerSession")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

impl CustomerSession {
    /// Read the session out of a login response.
    ///
    /// The token is taken from `token`, `accessToken` or `access_token` at the
    /// top level, or inside a nested `metadata` / `content` object. The user
    /// id comes from `user_id`, `userId`, `id` or `_id`, also possibly nested
    /// (or under `user`).
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::MissingToken`] when no token is present.
    pub fn from_login_response(body: &Value, email: &str) -> Result<Self, MarketplaceError> {
        let scopes = login_scopes(body);

        let access_token = scopes
            .iter()
            .find_map(|scope| first_string(scope, TOKEN_KEYS))
            .ok_or(MarketplaceError::MissingToken)?;

        let refresh_token = scopes
            .iter()
            .find_map(|scope| first_string(scope, &["refreshToken", "refresh_token"]));

        let user_id = scopes
            .iter()
            .flat_map(|scope| [Some(*scope), scope.get("user")])
            .flatten()
            .find_map(|scope| first_string(scope, USER_ID_KEYS))
            .map(UserId::new);

        Ok(Self {
            access_token,
            refresh_token,
            user_id,
            email: email.to_string(),
            obtained_at: Utc::now().timestamp(),
        })
    }
}

/// The top-level object followed by any nested envelope objects.
fn login_scopes(body: &Value) -> Vec<&Value> {
    let mut scopes = vec![body];
    scopes.extend(
        NESTED_KEYS
            .iter()
            .filter_map(|key| body.get(key))
            .filter(|nested| nested.is_object()),
    );
    scopes
}

fn first_string(scope: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match scope.get(key)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_top_level_token_variants() {
        for key in ["token", "accessToken", "access_token"] {
            let body = json!({ key: "tok-1", "userId": "u1" });
            let session = CustomerSession::from_login_response(&body, "a@b.vn").unwrap();
            assert_eq!(session.access_token, "tok-1");
            assert_eq!(session.user_id.unwrap().as_str(), "u1");
        }
    }

    #[test]
    fn test_nested_metadata_token() {
        let body = json!({
            "message": "ok",
            "metadata": { "accessToken": "tok-2", "refreshToken": "ref-2", "user": { "_id": "u2" } }
        });
        let session = CustomerSession::from_login_response(&body, "a@b.vn").unwrap();
        assert_eq!(session.access_token, "tok-2");
        assert_eq!(session.refresh_token.as_deref(), Some("ref-2"));
        assert_eq!(session.user_id.unwrap().as_str(), "u2");
    }

    #[test]
    fn test_nested_content_token_with_numeric_id() {
        let body = json!({ "content": { "token": "tok-3", "user_id": 77 } });
        let session = CustomerSession::from_login_response(&body, "a@b.vn").unwrap();
        assert_eq!(session.access_token, "tok-3");
        assert_eq!(session.user_id.unwrap().as_str(), "77");
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let body = json!({ "message": "Welcome", "user": { "id": "u4" } });
        assert!(matches!(
            CustomerSession::from_login_response(&body, "a@b.vn"),
            Err(MarketplaceError::MissingToken)
        ));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let body = json!({ "token": "very-secret-token", "refreshToken": "also-secret" });
        let session = CustomerSession::from_login_response(&body, "a@b.vn").unwrap();
        let debug_output = format!("{session:?}");
        assert!(!debug_output.contains("very-secret-token"));
        assert!(!debug_output.contains("also-secret"));
        assert!(debug_output.contains("a@b.vn"));
    }
}
