//! `MarketplaceClient` implementation.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, error, instrument, warn};
use url::Url;

use evmarket_core::{AuctionId, ProductId, Vnd};

use super::auth::{CustomerSession, LoginRequest};
use super::types::{
    Auction, Bid, OrderReceipt, OrderRequest, Product, ProductPage, ProductQuery, Profile,
    WalletTransaction,
};
use super::{GENERIC_ERROR_MESSAGE, MarketplaceError, extract_error_message, requires_auth};
use crate::config::MarketplaceConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const PRODUCT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Product(ProductId),
    Search(ProductQuery),
}

#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<Product>),
    Search(ProductPage),
}

/// Client for the marketplace REST API.
///
/// Cheap to clone. Product reads are cached for 5 minutes; everything
/// customer-specific (wallet, bids, orders, profile) always goes to the API.
#[derive(Clone)]
pub struct MarketplaceClient {
    inner: Arc<MarketplaceClientInner>,
}

struct MarketplaceClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl MarketplaceClient {
    /// Create a new marketplace client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &MarketplaceConfig) -> Result<Self, MarketplaceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("evmarket-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(PRODUCT_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(MarketplaceClientInner {
                client,
                base_url: config.api_url.clone(),
                cache,
            }),
        })
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    /// Build a request, attaching the bearer token unless `path` is one of
    /// the auth-excluded account endpoints.
    fn request(
        &self,
        method: Method,
        path: &str,
        auth: Option<&CustomerSession>,
    ) -> Result<RequestBuilder, MarketplaceError> {
        let url = self.inner.base_url.join(path.trim_start_matches('/'))?;
        let builder = self.inner.client.request(method, url);
        Ok(match auth {
            Some(session) if requires_auth(path) => builder.bearer_auth(&session.access_token),
            _ => builder,
        })
    }

    /// Send a request and return the JSON body (`Null` for an empty body).
    async fn execute(&self, builder: RequestBuilder) -> Result<Value, MarketplaceError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message =
                extract_error_message(&body).unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());
            warn!(
                status = %status,
                message = %message,
                "Marketplace API returned non-success status"
            );
            if status == StatusCode::NOT_FOUND {
                return Err(MarketplaceError::NotFound(message));
            }
            return Err(MarketplaceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse marketplace response"
            );
            MarketplaceError::Parse(e.to_string())
        })
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns the backend's message on rejected credentials, or
    /// [`MarketplaceError::MissingToken`] if the response carries no token.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginRequest) -> Result<CustomerSession, MarketplaceError> {
        let builder = self.request(Method::POST, "/login", None)?.json(credentials);
        let body = self.execute(builder).await?;
        CustomerSession::from_login_response(&body, &credentials.email)
    }

    /// The logged-in customer's profile, with saved delivery addresses.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, auth))]
    pub async fn profile(&self, auth: &CustomerSession) -> Result<Profile, MarketplaceError> {
        let body = self
            .execute(self.request(Method::GET, "/profile", Some(auth))?)
            .await?;
        envelope(body, "user")
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Search listings.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, auth))]
    pub async fn search_products(
        &self,
        query: &ProductQuery,
        auth: Option<&CustomerSession>,
    ) -> Result<ProductPage, MarketplaceError> {
        let cache_key = CacheKey::Search(query.clone());
        if let Some(CacheValue::Search(page)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product search");
            return Ok(page);
        }

        let builder = self
            .request(Method::GET, "/product-service/v1/products", auth)?
            .query(query);
        let body = self.execute(builder).await?;

        // Some deployments answer with a bare array.
        let page = match body {
            Value::Array(_) => ProductPage {
                products: decode(body)?,
                pagination: None,
            },
            Value::Null => ProductPage::default(),
            other => decode(other)?,
        };

        self.inner
            .cache
            .insert(cache_key, CacheValue::Search(page.clone()))
            .await;
        Ok(page)
    }

    /// A single listing.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::NotFound`] for an unknown id, or any other
    /// API failure.
    #[instrument(skip(self, auth), fields(product_id = %id))]
    pub async fn product(
        &self,
        id: &ProductId,
        auth: Option<&CustomerSession>,
    ) -> Result<Product, MarketplaceError> {
        let cache_key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("/product/{id}");
        let body = self
            .execute(self.request(Method::GET, &path, auth)?)
            .await?;
        let product: Product = envelope(body, "product")
            .map_err(|_| MarketplaceError::NotFound(format!("Product not found: {id}")))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    // =========================================================================
    // Auctions
    // =========================================================================

    /// All auctions.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, auth))]
    pub async fn auctions(
        &self,
        auth: Option<&CustomerSession>,
    ) -> Result<Vec<Auction>, MarketplaceError> {
        let body = self
            .execute(self.request(Method::GET, "/auctions", auth)?)
            .await?;
        envelope_or_default(body, "auctions")
    }

    /// One auction.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the auction is missing.
    #[instrument(skip(self, auth), fields(auction_id = %id))]
    pub async fn auction(
        &self,
        id: &AuctionId,
        auth: Option<&CustomerSession>,
    ) -> Result<Auction, MarketplaceError> {
        let path = format!("/auctions/{id}");
        let body = self
            .execute(self.request(Method::GET, &path, auth)?)
            .await?;
        envelope(body, "auction")
            .map_err(|_| MarketplaceError::NotFound(format!("Auction not found: {id}")))
    }

    /// Bid history for an auction, newest first as the backend sends it.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, auth), fields(auction_id = %id))]
    pub async fn bids(
        &self,
        id: &AuctionId,
        auth: Option<&CustomerSession>,
    ) -> Result<Vec<Bid>, MarketplaceError> {
        let path = format!("/auctions/{id}/bids");
        let body = self
            .execute(self.request(Method::GET, &path, auth)?)
            .await?;
        envelope_or_default(body, "bids")
    }

    /// Place a bid. Validation against the minimum and the wallet balance
    /// happens before this call; the backend has the final say.
    ///
    /// # Errors
    ///
    /// Returns the backend's message if the bid is refused.
    #[instrument(skip(self, auth), fields(auction_id = %id, amount = amount.amount()))]
    pub async fn place_bid(
        &self,
        auth: &CustomerSession,
        id: &AuctionId,
        amount: Vnd,
    ) -> Result<(), MarketplaceError> {
        let path = format!("/auctions/{id}/bid");
        let builder = self
            .request(Method::POST, &path, Some(auth))?
            .json(&json!({ "amount": amount }));
        self.execute(builder).await?;
        Ok(())
    }

    // =========================================================================
    // Wallet
    // =========================================================================

    /// Current wallet balance. A missing balance reads as zero.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, auth))]
    pub async fn wallet_balance(&self, auth: &CustomerSession) -> Result<Vnd, MarketplaceError> {
        let body = self
            .execute(self.request(Method::GET, "/wallet/balance", Some(auth))?)
            .await?;
        Ok(balance_of(&body).unwrap_or(Vnd::ZERO))
    }

    /// Deposit into the wallet. Returns the new balance when the backend
    /// reports it.
    ///
    /// # Errors
    ///
    /// Returns the backend's message if the deposit is refused.
    #[instrument(skip(self, auth), fields(amount = amount.amount()))]
    pub async fn deposit(
        &self,
        auth: &CustomerSession,
        amount: Vnd,
    ) -> Result<Option<Vnd>, MarketplaceError> {
        self.wallet_movement("/wallet/deposit", auth, amount).await
    }

    /// Withdraw from the wallet. Returns the new balance when the backend
    /// reports it.
    ///
    /// # Errors
    ///
    /// Returns the backend's message if the withdrawal is refused.
    #[instrument(skip(self, auth), fields(amount = amount.amount()))]
    pub async fn withdraw(
        &self,
        auth: &CustomerSession,
        amount: Vnd,
    ) -> Result<Option<Vnd>, MarketplaceError> {
        self.wallet_movement("/wallet/withdraw", auth, amount).await
    }

    async fn wallet_movement(
        &self,
        path: &str,
        auth: &CustomerSession,
        amount: Vnd,
    ) -> Result<Option<Vnd>, MarketplaceError> {
        let builder = self
            .request(Method::POST, path, Some(auth))?
            .json(&json!({ "amount": amount }));
        let body = self.execute(builder).await?;
        Ok(balance_of(&body))
    }

    /// Wallet transaction history.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, auth))]
    pub async fn transactions(
        &self,
        auth: &CustomerSession,
    ) -> Result<Vec<WalletTransaction>, MarketplaceError> {
        let body = self
            .execute(self.request(Method::GET, "/wallet/transactions", Some(auth))?)
            .await?;
        envelope_or_default(body, "transactions")
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Create one order.
    ///
    /// # Errors
    ///
    /// Returns the backend's message if the order is refused.
    #[instrument(skip(self, auth, order), fields(product_id = %order.product))]
    pub async fn place_order(
        &self,
        auth: &CustomerSession,
        order: &OrderRequest,
    ) -> Result<OrderReceipt, MarketplaceError> {
        let builder = self.request(Method::POST, "/orders", Some(auth))?.json(order);
        let body = self.execute(builder).await?;
        if body.get("order").is_some_and(Value::is_object) {
            envelope(body, "order")
        } else if body.is_object() {
            decode(body)
        } else {
            Ok(OrderReceipt::default())
        }
    }
}

// =============================================================================
// Envelope helpers
// =============================================================================

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, MarketplaceError> {
    serde_json::from_value(value).map_err(|e| MarketplaceError::Parse(e.to_string()))
}

/// Take `body[key]`, falling back to the body itself when there is no
/// envelope.
fn envelope<T: DeserializeOwned>(mut body: Value, key: &str) -> Result<T, MarketplaceError> {
    match body.get_mut(key).map(Value::take) {
        Some(inner) if !inner.is_null() => decode(inner),
        _ => decode(body),
    }
}

/// Like [`envelope`] for list endpoints: a missing list reads as empty.
fn envelope_or_default<T>(mut body: Value, key: &str) -> Result<Vec<T>, MarketplaceError>
where
    T: DeserializeOwned,
{
    if body.is_array() {
        return decode(body);
    }
    match body.get_mut(key).map(Value::take) {
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(inner) => decode(inner),
    }
}

fn balance_of(body: &Value) -> Option<Vnd> {
    body.get("balance")
        .filter(|b| !b.is_null())
        .and_then(|b| serde_json::from_value(b.clone()).ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_unwraps_or_falls_back() {
        let wrapped: Value = json!({ "product": { "_id": "p1", "price": 10 } });
        let product: Product = envelope(wrapped, "product").unwrap();
        assert_eq!(product.id.as_str(), "p1");

        let bare: Value = json!({ "_id": "p2", "price": 10 });
        let product: Product = envelope(bare, "product").unwrap();
        assert_eq!(product.id.as_str(), "p2");
    }

    #[test]
    fn test_envelope_or_default_missing_list_is_empty() {
        let bids: Vec<Bid> = envelope_or_default(json!({ "message": "ok" }), "bids").unwrap();
        assert!(bids.is_empty());
        let bids: Vec<Bid> =
            envelope_or_default(json!({ "bids": [{ "bid_amount": 5 }] }), "bids").unwrap();
        assert_eq!(bids.len(), 1);
    }

    #[test]
    fn test_balance_of() {
        assert_eq!(balance_of(&json!({ "balance": 250_000 })), Some(Vnd::new(250_000)));
        assert_eq!(balance_of(&json!({ "balance": null })), None);
        assert_eq!(balance_of(&json!({})), None);
    }
}
