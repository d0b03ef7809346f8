//! Customer authentication extractors.
//!
//! A logged-in customer is a [`CustomerSession`] stored in the session by the
//! login handler. Handlers that talk to authenticated marketplace endpoints
//! take [`RequireCustomer`]; pages that merely look different for customers
//! take [`OptionalCustomer`].

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::htmx::Triggers;
use crate::marketplace::CustomerSession;
use crate::models::session_keys;

/// Login page path.
pub const LOGIN_PATH: &str = "/auth/login";

/// Extractor that requires a logged-in customer.
///
/// # Example
///
/// ```rust,ignore
/// async fn wallet(RequireCustomer(customer): RequireCustomer) -> impl IntoResponse {
///     format!("Hello, {}!", customer.email)
/// }
/// ```
pub struct RequireCustomer(pub CustomerSession);

/// Error returned when a customer is required but not logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page (full page loads).
    RedirectToLogin,
    /// HTMX request: tell the client to navigate to the login page.
    HtmxRedirect,
    /// No session layer in front of the handler.
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::HtmxRedirect => (
                StatusCode::UNAUTHORIZED,
                [("HX-Redirect", LOGIN_PATH)],
                Triggers::new().error("Please log in to continue."),
                (),
            )
                .into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

fn is_htmx(parts: &Parts) -> bool {
    parts.headers.contains_key("HX-Request")
}

impl<S> FromRequestParts<S> for RequireCustomer
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        let customer: CustomerSession = session
            .get(session_keys::CUSTOMER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| {
                if is_htmx(parts) {
                    AuthRejection::HtmxRedirect
                } else {
                    AuthRejection::RedirectToLogin
                }
            })?;

        Ok(Self(customer))
    }
}

/// Extractor that optionally gets the logged-in customer.
///
/// Never rejects; a guest is `None`.
pub struct OptionalCustomer(pub Option<CustomerSession>);

impl<S> FromRequestParts<S> for OptionalCustomer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let customer = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CustomerSession>(session_keys::CUSTOMER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(customer))
    }
}

/// Store the customer in the session after login.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_customer(
    session: &Session,
    customer: &CustomerSession,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CUSTOMER, customer).await
}

/// Remove the customer from the session (logout).
///
/// The cart stays; only the marketplace token is dropped.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_customer(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CustomerSession>(session_keys::CUSTOMER)
        .await?;
    Ok(())
}
