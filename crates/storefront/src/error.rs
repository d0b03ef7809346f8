//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error response also carries an `HX-Trigger` `toast` event so HTMX
//! requests can show the message without swapping content.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::cart::CartError;
use crate::htmx::Triggers;
use crate::marketplace::{GENERIC_ERROR_MESSAGE, MarketplaceError};
use crate::services::auction::BidError;
use crate::services::checkout::CheckoutError;
use crate::services::wallet::WalletError;
use crate::shipping::ShippingError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Marketplace API call failed.
    #[error("Marketplace error: {0}")]
    Marketplace(#[from] MarketplaceError),

    /// Shipping-rate API call failed.
    #[error("Shipping error: {0}")]
    Shipping(#[from] ShippingError),

    /// Cart mutation rejected or not persisted.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout form or order submission failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Bid rejected before it was sent.
    #[error("Bid error: {0}")]
    Bid(#[from] BidError),

    /// Deposit or withdrawal rejected before it was sent.
    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Customer is not logged in.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this is our fault (or an upstream's) rather than the customer's.
    fn is_server_error(&self) -> bool {
        match self {
            Self::Session(_) | Self::Internal(_) => true,
            Self::Marketplace(err) | Self::Checkout(CheckoutError::Marketplace(err)) => {
                matches!(
                    err,
                    MarketplaceError::Http(_) | MarketplaceError::Parse(_) | MarketplaceError::Url(_)
                )
            }
            Self::Shipping(err) => !matches!(err, ShippingError::UnknownArea(_)),
            Self::Cart(err) => matches!(err, CartError::Storage(_)),
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Marketplace(err) | Self::Checkout(CheckoutError::Marketplace(err)) => {
                marketplace_status(err)
            }
            Self::Shipping(ShippingError::UnknownArea(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Shipping(_) => StatusCode::BAD_GATEWAY,
            Self::Cart(CartError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cart(CartError::IndexOutOfRange { .. }) => StatusCode::NOT_FOUND,
            Self::Checkout(CheckoutError::LoginRequired) | Self::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Cart(_)
            | Self::Checkout(_)
            | Self::Bid(_)
            | Self::Wallet(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message shown to the customer. Internal details are never exposed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Session(_) | Self::Internal(_) => GENERIC_ERROR_MESSAGE.to_string(),
            Self::Marketplace(err) | Self::Checkout(CheckoutError::Marketplace(err)) => {
                err.user_message()
            }
            Self::Shipping(ShippingError::UnknownArea(_)) => {
                "We couldn't find that address in the carrier's list.".to_string()
            }
            Self::Shipping(ShippingError::Api { message, .. }) if !message.is_empty() => {
                message.clone()
            }
            Self::Shipping(_) => "Shipping estimate is unavailable right now.".to_string(),
            Self::Cart(CartError::Storage(_)) => GENERIC_ERROR_MESSAGE.to_string(),
            Self::Cart(err) => err.to_string(),
            Self::Checkout(err) => err.to_string(),
            Self::Bid(err) => err.to_string(),
            Self::Wallet(err) => err.to_string(),
            Self::NotFound(_) => "We couldn't find that.".to_string(),
            Self::Unauthorized(_) => "Please log in to continue.".to_string(),
            Self::BadRequest(msg) => msg.clone(),
        }
    }
}

fn marketplace_status(err: &MarketplaceError) -> StatusCode {
    match err {
        MarketplaceError::NotFound(_) => StatusCode::NOT_FOUND,
        MarketplaceError::MissingToken => StatusCode::BAD_GATEWAY,
        e if e.is_unauthorized() => StatusCode::UNAUTHORIZED,
        MarketplaceError::Api { status, .. } if (400..500).contains(status) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::info!(error = %self, "Request rejected");
        }

        let status = self.status();
        let message = self.user_message();

        (status, Triggers::new().error(message.clone()), message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use evmarket_core::Vnd;

    use super::*;
    use crate::htmx::HX_TRIGGER;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Cart(CartError::TooManyLines { max: 1 })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::LoginRequired)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Marketplace(MarketplaceError::Api {
                status: 401,
                message: "expired".to_string()
            })),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Marketplace(MarketplaceError::Api {
                status: 500,
                message: "boom".to_string()
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_backend_message_reaches_customer() {
        let err = AppError::Marketplace(MarketplaceError::Api {
            status: 400,
            message: "Sản phẩm đã hết hàng".to_string(),
        });
        assert_eq!(err.user_message(), "Sản phẩm đã hết hàng");
        assert_eq!(get_status(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::Internal("pool exhausted at 10.0.0.3".to_string());
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_error_response_carries_toast() {
        let err = AppError::Bid(BidError::BelowMinimum {
            minimum: Vnd::new(2_100_000),
        });
        let response = err.into_response();
        let header = response
            .headers()
            .get(HX_TRIGGER)
            .unwrap()
            .to_str()
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(header).unwrap();
        assert_eq!(parsed["toast"]["level"], "error");
        assert_eq!(
            parsed["toast"]["message"],
            "Your bid must be at least 2.100.000 \u{20ab}."
        );
    }
}
