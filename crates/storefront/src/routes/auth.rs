//! Authentication route handlers.
//!
//! Password login against the marketplace API. The returned bearer token is
//! kept in the session; registration and OTP flows stay on the marketplace.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use super::Layout;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::marketplace::LoginRequest;
use crate::middleware::{OptionalCustomer, clear_current_customer, set_current_customer};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Where to go after logging in.
    pub next: Option<String>,
}

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub error: Option<String>,
    pub email: String,
    pub next: String,
}

/// Only same-site paths are followed after login.
#[must_use]
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => "/".to_string(),
    }
}

fn error_message(code: &str) -> &'static str {
    match code {
        "session" => "Your session could not be saved. Please try again.",
        "expired" => "Your session has expired. Please log in again.",
        _ => "Login failed. Please try again.",
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalCustomer(customer): OptionalCustomer,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        layout: Layout::new(customer.as_ref()),
        error: query.error.as_deref().map(|code| error_message(code).to_string()),
        email: String::new(),
        next: safe_next(query.next.as_deref()),
    }
}

/// Handle login form submission.
///
/// On failure the form is shown again with the marketplace's message.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref());
    let credentials = LoginRequest {
        email: form.email.trim().to_string(),
        password: form.password,
    };

    match state.marketplace().login(&credentials).await {
        Ok(customer) => {
            if let Err(e) = set_current_customer(&session, &customer).await {
                tracing::error!("Failed to set session: {}", e);
                return Redirect::to("/auth/login?error=session").into_response();
            }
            if let Some(user_id) = &customer.user_id {
                set_sentry_user(user_id, Some(&customer.email));
            }
            info!("Customer logged in");
            Redirect::to(&next).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Login failed");
            (
                StatusCode::UNAUTHORIZED,
                LoginTemplate {
                    layout: Layout::default(),
                    error: Some(e.user_message()),
                    email: credentials.email,
                    next,
                },
            )
                .into_response()
        }
    }
}

/// Log out. The cart stays in the session.
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_customer(&session).await {
        tracing::error!("Failed to clear session: {}", e);
    }
    clear_sentry_user();
    Redirect::to("/").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/checkout")), "/checkout");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn test_error_codes_have_messages() {
        assert!(error_message("session").contains("session"));
        assert_eq!(error_message("whatever"), "Login failed. Please try again.");
    }
}
