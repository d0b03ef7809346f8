//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cart::CartStore;
use crate::config::StorefrontConfig;
use crate::marketplace::{MarketplaceClient, MarketplaceError};
use crate::shipping::{ShippingClient, ShippingError};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("marketplace client: {0}")]
    Marketplace(#[from] MarketplaceError),
    #[error("shipping client: {0}")]
    Shipping(#[from] ShippingError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    marketplace: MarketplaceClient,
    shipping: ShippingClient,
    cart: CartStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool (session store)
    ///
    /// # Errors
    ///
    /// Returns an error if either API client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let marketplace = MarketplaceClient::new(&config.marketplace)?;
        let shipping = ShippingClient::new(&config.shipping)?;
        let cart = CartStore::new(config.cart_max_lines);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                marketplace,
                shipping,
                cart,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the marketplace API client.
    #[must_use]
    pub fn marketplace(&self) -> &MarketplaceClient {
        &self.inner.marketplace
    }

    /// Get a reference to the shipping-rate API client.
    #[must_use]
    pub fn shipping(&self) -> &ShippingClient {
        &self.inner.shipping
    }

    /// Get a reference to the process-wide cart store.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }
}
