//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. The session
//! holds the visitor's cart, checkout selection, voucher code and, after
//! login, the marketplace bearer token.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha512};
use sqlx::PgPool;
use tower_sessions::cookie::Key;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "evm_session";

/// Session expiry time in seconds (30 days of inactivity).
///
/// Carts used to live in browser storage with no expiry, so keep them for a
/// long time.
const SESSION_EXPIRY_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Build the session store over `pool`.
///
/// The `tower_sessions` schema must exist; create it with
/// `evmarket-cli migrate`.
#[must_use]
pub fn session_store(pool: &PgPool) -> PostgresStore {
    PostgresStore::new(pool.clone())
}

/// Cookie signing key derived from the session secret.
///
/// `Key` needs 64 bytes; the secret is only guaranteed 32 characters, so it
/// is stretched with SHA-512.
#[must_use]
pub fn signing_key(secret: &SecretString) -> Key {
    let digest = Sha512::digest(secret.expose_secret().as_bytes());
    Key::from(digest.as_slice())
}

/// Create the session layer with `PostgreSQL` store and a signed cookie.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore, SignedCookie> {
    SessionManagerLayer::new(session_store(pool))
        .with_signed(signing_key(&config.session_secret))
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_key_follows_secret() {
        let a = signing_key(&SecretString::from("kq7Zp2VxR9mB4tLw8NcY3hJd6FgS1aEu"));
        let again = signing_key(&SecretString::from("kq7Zp2VxR9mB4tLw8NcY3hJd6FgS1aEu"));
        let b = signing_key(&SecretString::from("Xc5Rn8QwT2yLp6Vm9BzK4sHf7GdJ3aUe"));

        assert_eq!(a.signing(), again.signing());
        assert_ne!(a.signing(), b.signing());
    }
}
