//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database)
//!
//! # Products
//! GET  /                       - Product listing (?q=search&page=n)
//! GET  /products/{id}          - Product detail
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (returns count badge, triggers cart-updated)
//! POST /cart/increment         - One more unit (returns cart_items fragment)
//! POST /cart/decrement         - One fewer unit, floors at one
//! POST /cart/remove            - Remove line (returns cart_items fragment)
//! POST /cart/clear             - Empty the cart
//! GET  /cart/count             - Cart count badge (fragment)
//! GET  /cart/preview           - Cart preview dropdown (fragment)
//!
//! # Checkout
//! GET    /checkout             - Checkout page
//! GET    /checkout/lines       - Lines and summary (fragment)
//! POST   /checkout/select      - Toggle one line or select all
//! POST   /checkout/shipping    - Shipping estimate (fragment)
//! POST   /checkout/voucher     - Apply voucher code
//! DELETE /checkout/voucher     - Remove voucher code
//! POST   /checkout/place       - Place orders
//!
//! # Auctions
//! GET  /auctions               - Auction listing
//! GET  /auctions/{id}          - Auction detail and bid history
//! POST /auctions/{id}/bid      - Place a bid (requires auth)
//!
//! # Wallet (requires auth)
//! GET  /wallet                 - Balance and transactions
//! POST /wallet/deposit         - Deposit
//! POST /wallet/withdraw        - Withdraw
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! POST /auth/logout            - Logout action
//! ```

pub mod auctions;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod products;
pub mod wallet;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tower_sessions::Session;
use tracing::{info, warn};

use crate::marketplace::{CustomerSession, MarketplaceError};
use crate::middleware::clear_current_customer;
use crate::state::AppState;

/// Data the base layout needs on every full page.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    /// Email of the logged-in customer, `None` for guests.
    pub customer_email: Option<String>,
}

impl Layout {
    #[must_use]
    pub fn new(customer: Option<&CustomerSession>) -> Self {
        Self {
            customer_email: customer.map(|c| c.email.clone()),
        }
    }

    #[must_use]
    pub const fn logged_in(&self) -> bool {
        self.customer_email.is_some()
    }
}

/// Drop the stored token when the marketplace rejected it, so the next
/// request asks the customer to log in again.
pub(crate) async fn expire_on_unauthorized(session: &Session, err: &MarketplaceError) {
    if !err.is_unauthorized() {
        return;
    }
    info!("Marketplace rejected the session token, logging out");
    if let Err(e) = clear_current_customer(session).await {
        warn!(error = %e, "Failed to clear expired customer session");
    }
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity (sessions live there).
/// Returns 503 Service Unavailable if the database is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new().route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/increment", post(cart::increment))
        .route("/decrement", post(cart::decrement))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
        .route("/preview", get(cart::preview))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/lines", get(checkout::lines))
        .route("/select", post(checkout::select))
        .route("/shipping", post(checkout::shipping))
        .route(
            "/voucher",
            post(checkout::apply_voucher).delete(checkout::remove_voucher),
        )
        .route("/place", post(checkout::place))
}

/// Create the auction routes router.
pub fn auction_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(auctions::index))
        .route("/{id}", get(auctions::show))
        .route("/{id}/bid", post(auctions::bid))
}

/// Create the wallet routes router.
pub fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wallet::show))
        .route("/deposit", post(wallet::deposit))
        .route("/withdraw", post(wallet::withdraw))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/", get(products::index))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/auctions", auction_routes())
        .nest("/wallet", wallet_routes())
        .nest("/auth", auth_routes())
}
