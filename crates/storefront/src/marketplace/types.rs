//! Marketplace REST API document types.
//!
//! The backend is a document store; most fields are optional and several come
//! in more than one shape. Deserialization is lenient so one odd record does
//! not take down a whole listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use evmarket_core::{
    AddressId, AuctionId, AuctionStatus, CartItem, OrderType, PaymentMethod, ProductId, Quantity,
    ShopId, TransactionKind, TransactionStatus, UserId, VariantId, Vnd,
};

// =============================================================================
// Products
// =============================================================================

/// A battery (or vehicle-with-battery) listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    #[serde(rename = "_id", alias = "id")]
    pub id: ProductId,
    #[serde(default, rename = "productName", alias = "name")]
    pub product_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Vnd,
    /// Sent either as a single URL or as a list.
    #[serde(default, deserialize_with = "one_or_many")]
    pub image_url: Vec<String>,
    /// Seller shop (the backend calls it `creater`).
    #[serde(default, rename = "creater")]
    pub seller: Option<ShopId>,
    #[serde(default)]
    pub battery: Vec<BatterySpec>,
    #[serde(default)]
    pub vehicle: Vec<VehicleSpec>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl Product {
    /// Listing title, falling back to the battery model name.
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(name) = self.product_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        self.battery
            .first()
            .and_then(|b| b.name.as_deref())
            .map_or_else(|| "Battery".to_string(), |name| format!("Battery {name}"))
    }

    /// First image URL, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.image_url.first().map(String::as_str)
    }

    /// Build a cart line for this listing. Listings have a single variant,
    /// so the variant id is the product id.
    #[must_use]
    pub fn to_cart_item(&self, quantity: Quantity) -> CartItem {
        CartItem {
            id: self.id.clone(),
            name: self.display_name(),
            price: self.price,
            image: self.primary_image().unwrap_or_default().to_string(),
            quantity,
            variant_id: VariantId::new(self.id.as_str()),
            shop_id: self.seller.clone().unwrap_or_else(|| ShopId::new("")),
        }
    }
}

/// Battery specification attached to a listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatterySpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default)]
    pub voltage: Option<f64>,
    #[serde(default)]
    pub health_percentage: Option<f64>,
    #[serde(default)]
    pub change_cycles: Option<u32>,
    #[serde(default)]
    pub range_per_change: Option<f64>,
}

/// Vehicle the battery comes from (or ships with).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub mileage: Option<u64>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub body_type: Option<String>,
    #[serde(default)]
    pub fuel_type: Option<String>,
}

/// Search criteria for the product listing endpoint.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    pub current_page: u32,
    pub page_size: u32,
}

/// One page of search results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPage {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl ProductPage {
    /// Total matching products, falling back to this page's length.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.pagination
            .as_ref()
            .and_then(|p| p.total_elements)
            .unwrap_or_else(|| u64::try_from(self.products.len()).unwrap_or(u64::MAX))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub total_elements: Option<u64>,
}

// =============================================================================
// Auctions
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Auction {
    #[serde(rename = "_id", alias = "id")]
    pub id: AuctionId,
    /// Populated listing; `None` when the backend sent only the id.
    #[serde(default, deserialize_with = "populated")]
    pub product: Option<Product>,
    #[serde(default)]
    pub start_price: Vnd,
    #[serde(default)]
    pub current_bid: Option<Vnd>,
    #[serde(default)]
    pub deposit_required: Option<Vnd>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: AuctionStatus,
}

impl Auction {
    /// Title of the auctioned listing.
    #[must_use]
    pub fn title(&self) -> String {
        self.product
            .as_ref()
            .map_or_else(|| format!("Auction {}", self.id), Product::display_name)
    }
}

/// One bid in an auction's history.
#[derive(Debug, Clone, Deserialize)]
pub struct Bid {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "populated")]
    pub user: Option<Bidder>,
    pub bid_amount: Vnd,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_winner: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Bidder {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub user_profile: Option<BidderProfile>,
}

impl Bidder {
    /// Name shown in the bid history.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.user_profile
            .as_ref()
            .and_then(|p| p.name.clone())
            .or_else(|| self.username.clone())
            .unwrap_or_else(|| "Anonymous".to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BidderProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

// =============================================================================
// Wallet
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct WalletTransaction {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Vnd,
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Account
// =============================================================================

/// Logged-in customer's profile.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "address")]
    pub addresses: Vec<Address>,
}

/// Delivery address as stored on the profile (names, not codes).
#[derive(Debug, Clone, Deserialize)]
pub struct Address {
    #[serde(rename = "_id", alias = "id")]
    pub id: AddressId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    pub province: String,
    pub district: String,
    pub ward: String,
}

impl Address {
    /// Single-line rendering for selects and summaries.
    #[must_use]
    pub fn one_line(&self) -> String {
        [
            self.street.as_deref(),
            Some(self.ward.as_str()),
            Some(self.district.as_str()),
            Some(self.province.as_str()),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Body of `POST /orders`. One request buys one product.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OrderRequest {
    pub order_type: OrderType,
    pub product: ProductId,
    /// Empty for direct purchases.
    pub auction: String,
    /// Voucher code, empty when none is applied.
    pub voucher: String,
    pub payment: PaymentMethod,
}

/// Whatever identifying data the backend returns for a created order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderReceipt {
    #[serde(default, alias = "_id", alias = "orderId", alias = "orderCode")]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Helpers
// =============================================================================

/// Accept `"url"`, `["url", ...]` or `null`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(url)) if url.is_empty() => Vec::new(),
        Some(OneOrMany::One(url)) => vec![url],
        Some(OneOrMany::Many(urls)) => urls,
    })
}

/// Accept a populated reference document; a bare id reads as `None`.
fn populated<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Reference<T> {
        Document(T),
        Id(serde::de::IgnoredAny),
    }

    Ok(match Option::<Reference<T>>::deserialize(deserializer)? {
        Some(Reference::Document(doc)) => Some(doc),
        Some(Reference::Id(_)) | None => None,
    })
}
