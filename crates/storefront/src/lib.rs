//! EV Market storefront library.
//!
//! Server-rendered storefront for the EV battery and vehicle marketplace:
//! listings, cart, checkout with shipping quotes, auctions and the wallet.
//! The marketplace backend owns all business data; this crate keeps only the
//! session (cart, checkout selection, voucher and bearer token).

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod htmx;
pub mod marketplace;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod shipping;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// Build the full application: routes, session and request-id layers.
///
/// Sentry and HTTP tracing layers are added by the binary.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.pool(), state.config());

    routes::routes()
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(session_layer)
        .with_state(state)
}
