//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! Every successful mutation answers with `HX-Trigger: cart-updated`; the
//! badge, the preview dropdown and the checkout lines re-fetch on it.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use evmarket_core::{CartItem, ProductId, Quantity, Vnd};

use super::Layout;
use crate::cart::SessionCartStorage;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::htmx::Triggers;
use crate::middleware::OptionalCustomer;
use crate::state::AppState;

/// Characters of a product name shown in the preview dropdown.
pub const PREVIEW_NAME_CHARS: usize = 20;

/// Cut `name` to [`PREVIEW_NAME_CHARS`] characters, marking the cut with `...`.
#[must_use]
pub fn truncate_name(name: &str) -> String {
    if name.chars().count() <= PREVIEW_NAME_CHARS {
        return name.to_string();
    }
    let head: String = name.chars().take(PREVIEW_NAME_CHARS).collect();
    format!("{head}...")
}

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    /// Position in the cart; mutation forms post it back.
    pub index: usize,
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub price: Vnd,
    pub quantity: u32,
    /// `None` when `price * quantity` overflows.
    pub line_total: Option<Vnd>,
    pub image: Option<String>,
}

impl CartItemView {
    pub(crate) fn new(index: usize, item: &CartItem) -> Self {
        Self {
            index,
            id: item.id.to_string(),
            name: item.name.clone(),
            short_name: truncate_name(&item.name),
            price: item.price,
            quantity: item.quantity.get(),
            line_total: item.line_total().ok(),
            image: Some(item.image.clone()).filter(|url| !url.is_empty()),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    /// `None` when a line total or the sum overflows.
    pub subtotal: Option<Vnd>,
    pub line_count: usize,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self::from(&[] as &[CartItem])
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<&[CartItem]> for CartView {
    fn from(items: &[CartItem]) -> Self {
        let subtotal = items.iter().try_fold(Vnd::ZERO, |total, item| {
            total.checked_add(item.line_total().ok()?).ok()
        });
        Self {
            items: items
                .iter()
                .enumerate()
                .map(|(index, item)| CartItemView::new(index, item))
                .collect(),
            subtotal,
            line_count: items.len(),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<u32>,
}

/// Form data naming a cart line by position.
#[derive(Debug, Deserialize)]
pub struct LineForm {
    pub index: usize,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: usize,
}

/// Cart preview dropdown fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_preview.html")]
pub struct CartPreviewTemplate {
    pub cart: CartView,
}

/// Display cart page.
#[instrument(skip(state, session, customer))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
) -> impl IntoResponse {
    let items = state.cart().load(&SessionCartStorage::new(&session)).await;

    CartShowTemplate {
        layout: Layout::new(customer.as_ref()),
        cart: CartView::from(items.as_slice()),
    }
}

/// Add a product to the cart (HTMX).
///
/// The product is looked up so the line carries the current price, name and
/// image. Returns the count badge and fires `cart-updated`.
#[instrument(skip(state, session, customer))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let product = state
        .marketplace()
        .product(&ProductId::new(form.product_id), customer.as_ref())
        .await?;
    let item = product.to_cart_item(Quantity::new(form.quantity.unwrap_or(1)));

    let items = state
        .cart()
        .add(&SessionCartStorage::new(&session), item)
        .await?;

    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product.id.as_str())]));

    Ok((
        Triggers::new()
            .cart_updated()
            .success(format!("{} added to cart", product.display_name())),
        CartCountTemplate { count: items.len() },
    )
        .into_response())
}

/// One more unit of a line (HTMX). Returns the cart items fragment.
#[instrument(skip(state, session))]
pub async fn increment(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LineForm>,
) -> Result<Response> {
    let items = state
        .cart()
        .increment(&SessionCartStorage::new(&session), form.index)
        .await?;
    Ok(items_fragment(&items, Triggers::new().cart_updated()))
}

/// One fewer unit of a line (HTMX). A line at one unit stays at one and no
/// `cart-updated` is fired.
#[instrument(skip(state, session))]
pub async fn decrement(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LineForm>,
) -> Result<Response> {
    let storage = SessionCartStorage::new(&session);
    let before = state.cart().load(&storage).await;
    let items = state.cart().decrement(&storage, form.index).await?;

    let triggers = if items == before {
        Triggers::new()
    } else {
        Triggers::new().cart_updated()
    };
    Ok(items_fragment(&items, triggers))
}

/// Remove a line (HTMX). Returns the cart items fragment.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LineForm>,
) -> Result<Response> {
    let items = state
        .cart()
        .remove_at(&SessionCartStorage::new(&session), form.index)
        .await?;
    Ok(items_fragment(&items, Triggers::new().cart_updated()))
}

/// Empty the cart (HTMX).
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Response> {
    state.cart().clear(&SessionCartStorage::new(&session)).await?;
    Ok(items_fragment(&[], Triggers::new().cart_updated()))
}

/// Get cart count badge (HTMX).
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let items = state.cart().load(&SessionCartStorage::new(&session)).await;
    CartCountTemplate { count: items.len() }
}

/// Get the cart preview dropdown (HTMX).
#[instrument(skip(state, session))]
pub async fn preview(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let items = state.cart().load(&SessionCartStorage::new(&session)).await;
    CartPreviewTemplate {
        cart: CartView::from(items.as_slice()),
    }
}

fn items_fragment(items: &[CartItem], triggers: Triggers) -> Response {
    (
        triggers,
        CartItemsTemplate {
            cart: CartView::from(items),
        },
    )
        .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use evmarket_core::{ShopId, VariantId};

    use super::*;

    fn item(name: &str, price: i64, quantity: u32) -> CartItem {
        CartItem {
            id: ProductId::new(name),
            name: name.to_string(),
            price: Vnd::new(price),
            image: String::new(),
            quantity: Quantity::new(quantity),
            variant_id: VariantId::new(name),
            shop_id: ShopId::new("shop"),
        }
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("Pin LFP 48V"), "Pin LFP 48V");
        assert_eq!(truncate_name("12345678901234567890"), "12345678901234567890");
        assert_eq!(
            truncate_name("Pin lithium VinFast Klara S 2022"),
            "Pin lithium VinFast ..."
        );
        // Counts characters, not bytes.
        assert_eq!(
            truncate_name("Ắc quy xe điện Pega cũ còn tốt"),
            "Ắc quy xe điện Pega ..."
        );
    }

    #[test]
    fn test_cart_view_totals() {
        let items = vec![item("A", 100, 2), item("B", 250, 1)];
        let view = CartView::from(items.as_slice());
        assert_eq!(view.line_count, 2);
        assert_eq!(view.subtotal, Some(Vnd::new(450)));
        assert_eq!(view.items.get(1).unwrap().index, 1);
        assert_eq!(view.items.first().unwrap().line_total, Some(Vnd::new(200)));
        assert!(view.items.first().unwrap().image.is_none());
    }

    #[test]
    fn test_empty_cart_view() {
        let view = CartView::empty();
        assert!(view.is_empty());
        assert_eq!(view.subtotal, Some(Vnd::ZERO));
    }

    #[test]
    fn test_overflowing_subtotal_is_left_out() {
        let items = vec![item("A", i64::MAX, 2), item("B", 250, 1)];
        let view = CartView::from(items.as_slice());
        assert_eq!(view.subtotal, None);
        assert_eq!(view.items.first().unwrap().line_total, None);

        let html = CartItemsTemplate { cart: view }.render().unwrap();
        assert!(!html.contains(">0 ₫"));
    }

    #[test]
    fn test_count_badge_renders_count() {
        let html = CartCountTemplate { count: 3 }.render().unwrap();
        assert!(html.contains('3'));
    }

    #[test]
    fn test_preview_renders_truncated_names_and_empty_state() {
        let items = vec![item("Pin lithium VinFast Klara S 2022", 5_000_000, 2)];
        let html = CartPreviewTemplate {
            cart: CartView::from(items.as_slice()),
        }
        .render()
        .unwrap();
        assert!(html.contains("Pin lithium VinFast ..."));
        assert!(html.contains("5.000.000"));
        assert!(html.contains("10.000.000"));
        assert!(html.contains("/checkout"));

        let html = CartPreviewTemplate {
            cart: CartView::empty(),
        }
        .render()
        .unwrap();
        assert!(html.contains("Your cart is empty"));
    }
}
