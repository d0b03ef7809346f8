//! Integration tests for EV Market.
//!
//! The storefront talks to two upstream APIs: the marketplace backend and
//! the GHN shipping-rate gateway. These tests run the real clients against
//! `wiremock` servers standing in for both.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p evmarket-integration-tests
//! ```
//!
//! No database or network access is needed.

#![allow(clippy::unwrap_used)]

use evmarket_storefront::config::{MarketplaceConfig, ShippingConfig};
use evmarket_storefront::marketplace::{CustomerSession, MarketplaceClient};
use evmarket_storefront::shipping::ShippingClient;
use secrecy::SecretString;
use url::Url;
use wiremock::MockServer;

/// Path prefix of the GHN public API on the mock server.
pub const GHN_PREFIX: &str = "/shiip/public-api";

/// Token the fixture customer carries.
pub const TEST_TOKEN: &str = "test-access-token";

/// Marketplace client pointed at `server`.
pub fn marketplace_client(server: &MockServer) -> MarketplaceClient {
    let config = MarketplaceConfig {
        api_url: Url::parse(&server.uri()).unwrap(),
    };
    MarketplaceClient::new(&config).unwrap()
}

/// Shipping client pointed at `server`.
pub fn shipping_client(server: &MockServer) -> ShippingClient {
    let config = ShippingConfig {
        api_url: Url::parse(&format!("{}{GHN_PREFIX}/", server.uri())).unwrap(),
        token: SecretString::from("ghn-test-token"),
        shop_id: "885".to_string(),
        service_id: 53320,
    };
    ShippingClient::new(&config).unwrap()
}

/// A logged-in customer carrying [`TEST_TOKEN`].
pub fn customer() -> CustomerSession {
    CustomerSession {
        access_token: TEST_TOKEN.to_string(),
        refresh_token: None,
        user_id: None,
        email: "buyer@example.com".to_string(),
        obtained_at: 0,
    }
}

/// `Authorization` header value for [`TEST_TOKEN`].
pub fn bearer() -> String {
    format!("Bearer {TEST_TOKEN}")
}
