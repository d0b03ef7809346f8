//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::instrument;

use evmarket_core::{ProductId, Vnd};

use super::Layout;
use crate::error::Result;
use crate::filters;
use crate::marketplace::{Product, ProductQuery};
use crate::middleware::OptionalCustomer;
use crate::state::AppState;

/// Products per listing page.
pub const PAGE_SIZE: u32 = 12;

/// Listing query string: `?q=...&page=...`.
#[derive(Debug, Default, Deserialize)]
pub struct ListingParams {
    pub q: Option<String>,
    pub page: Option<u32>,
}

impl ListingParams {
    /// Backend query for these parameters. Blank searches list everything and
    /// pages start at 1.
    #[must_use]
    pub fn to_query(&self) -> ProductQuery {
        ProductQuery {
            keyword: self
                .q
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(String::from),
            current_page: self.page.unwrap_or(1).max(1),
            page_size: PAGE_SIZE,
        }
    }
}

/// Product card display data.
#[derive(Clone)]
pub struct ProductCardView {
    pub id: String,
    pub name: String,
    pub price: Vnd,
    pub image: Option<String>,
}

impl From<&Product> for ProductCardView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.display_name(),
            price: product.price,
            image: product.primary_image().map(String::from),
        }
    }
}

/// Label/value row on the product page.
#[derive(Clone)]
pub struct SpecRow {
    pub label: &'static str,
    pub value: String,
}

/// Product detail display data.
#[derive(Clone)]
pub struct ProductDetailView {
    pub card: ProductCardView,
    pub description: String,
    pub images: Vec<String>,
    pub specs: Vec<SpecRow>,
}

fn push_spec<T: std::fmt::Display>(
    specs: &mut Vec<SpecRow>,
    label: &'static str,
    value: Option<T>,
    unit: &str,
) {
    if let Some(value) = value {
        specs.push(SpecRow {
            label,
            value: format!("{value}{unit}"),
        });
    }
}

impl From<&Product> for ProductDetailView {
    fn from(product: &Product) -> Self {
        let mut specs = Vec::new();
        if let Some(battery) = product.battery.first() {
            push_spec(&mut specs, "Battery", battery.name.as_deref(), "");
            push_spec(&mut specs, "Capacity", battery.capacity, " kWh");
            push_spec(&mut specs, "Voltage", battery.voltage, " V");
            push_spec(&mut specs, "Health", battery.health_percentage, "%");
            push_spec(&mut specs, "Charge cycles", battery.change_cycles, "");
            push_spec(&mut specs, "Range per charge", battery.range_per_change, " km");
        }
        if let Some(vehicle) = product.vehicle.first() {
            push_spec(&mut specs, "Vehicle", vehicle.name.as_deref(), "");
            push_spec(&mut specs, "Year", vehicle.year, "");
            push_spec(&mut specs, "Mileage", vehicle.mileage, " km");
            push_spec(&mut specs, "Colour", vehicle.color.as_deref(), "");
        }

        Self {
            card: ProductCardView::from(product),
            description: product.description.clone().unwrap_or_default(),
            images: product.image_url.clone(),
            specs,
        }
    }
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub layout: Layout,
    pub products: Vec<ProductCardView>,
    pub q: String,
    pub page: u32,
    pub has_prev: bool,
    pub has_next: bool,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: Layout,
    pub product: ProductDetailView,
}

/// Whether another page follows `page` for `total` results.
fn has_next_page(page: u32, total: u64) -> bool {
    u64::from(page) * u64::from(PAGE_SIZE) < total
}

/// Display product listing with search and paging.
#[instrument(skip(state, customer))]
pub async fn index(
    State(state): State<AppState>,
    OptionalCustomer(customer): OptionalCustomer,
    Query(params): Query<ListingParams>,
) -> Result<impl IntoResponse> {
    let query = params.to_query();
    let page = state
        .marketplace()
        .search_products(&query, customer.as_ref())
        .await?;

    Ok(ProductsIndexTemplate {
        layout: Layout::new(customer.as_ref()),
        products: page.products.iter().map(ProductCardView::from).collect(),
        q: query.keyword.clone().unwrap_or_default(),
        page: query.current_page,
        has_prev: query.current_page > 1,
        has_next: has_next_page(query.current_page, page.total()),
    })
}

/// Display product detail page.
#[instrument(skip(state, customer))]
pub async fn show(
    State(state): State<AppState>,
    OptionalCustomer(customer): OptionalCustomer,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let product = state
        .marketplace()
        .product(&ProductId::new(id), customer.as_ref())
        .await?;

    Ok(ProductShowTemplate {
        layout: Layout::new(customer.as_ref()),
        product: ProductDetailView::from(&product),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_params_normalised() {
        let params = ListingParams {
            q: Some("  VinFast  ".to_string()),
            page: Some(0),
        };
        let query = params.to_query();
        assert_eq!(query.keyword.as_deref(), Some("VinFast"));
        assert_eq!(query.current_page, 1);
        assert_eq!(query.page_size, PAGE_SIZE);

        let blank = ListingParams {
            q: Some("   ".to_string()),
            page: None,
        };
        assert_eq!(blank.to_query().keyword, None);
    }

    #[test]
    fn test_has_next_page() {
        assert!(has_next_page(1, 13));
        assert!(!has_next_page(1, 12));
        assert!(!has_next_page(2, 20));
    }

    #[test]
    fn test_detail_view_lists_known_specs_only() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "_id": "p1",
            "productName": "Pin LFP 60Ah",
            "price": 12_000_000,
            "image_url": ["https://img/1.jpg", "https://img/2.jpg"],
            "battery": [{ "name": "LFP-60", "capacity": 3.2, "healthPercentage": 92.5 }]
        }))
        .unwrap();

        let view = ProductDetailView::from(&product);
        assert_eq!(view.card.name, "Pin LFP 60Ah");
        assert_eq!(view.card.image.as_deref(), Some("https://img/1.jpg"));
        assert_eq!(view.images.len(), 2);
        let labels: Vec<_> = view.specs.iter().map(|s| s.label).collect();
        assert_eq!(labels, ["Battery", "Capacity", "Health"]);
        assert_eq!(view.specs.get(1).unwrap().value, "3.2 kWh");
    }
}
