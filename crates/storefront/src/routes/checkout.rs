//! Checkout route handlers.
//!
//! The checkout page lists the cart with a checkbox per line, quotes
//! shipping for a delivery address, takes an optional voucher code and
//! places one order per selected line. Selection and voucher live in the
//! session next to the cart.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use evmarket_core::{AddressId, CartItem, PaymentMethod, Vnd};

use super::cart::CartItemView;
use super::{Layout, expire_on_unauthorized};
use crate::cart::{CartError, SessionCartStorage};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::htmx::Triggers;
use crate::marketplace::{Address, CustomerSession};
use crate::middleware::OptionalCustomer;
use crate::models::session_keys;
use crate::services::checkout::{
    CheckoutError, CheckoutSummary, LineKey, Selection, VoucherCode, build_orders,
    remaining_after_order, submit_orders, summarize,
};
use crate::shipping::{DeliveryArea, ShippingQuote};
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// One checkout line with its checkbox state.
#[derive(Clone)]
pub struct CheckoutLineView {
    pub item: CartItemView,
    pub selected: bool,
}

/// Lines plus totals; re-rendered whenever the cart or selection changes.
#[derive(Clone)]
pub struct CheckoutLinesView {
    pub lines: Vec<CheckoutLineView>,
    pub all_selected: bool,
    pub summary: CheckoutSummary,
}

impl CheckoutLinesView {
    /// # Errors
    ///
    /// [`CheckoutError::Money`] if the subtotal overflows.
    pub fn new(items: &[CartItem], selection: &Selection) -> std::result::Result<Self, CheckoutError> {
        Ok(Self {
            lines: items
                .iter()
                .enumerate()
                .map(|(index, item)| CheckoutLineView {
                    item: CartItemView::new(index, item),
                    selected: selection.is_selected(item),
                })
                .collect(),
            all_selected: selection.covers(items),
            summary: summarize(items, selection, None)?,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Saved address offered in the shipping form.
#[derive(Clone)]
pub struct AddressOption {
    pub id: String,
    pub label: String,
}

impl From<&Address> for AddressOption {
    fn from(address: &Address) -> Self {
        let label = match address.name.as_deref() {
            Some(name) if !name.trim().is_empty() => format!("{name}: {}", address.one_line()),
            _ => address.one_line(),
        };
        Self {
            id: address.id.to_string(),
            label,
        }
    }
}

/// Shipping quote display data.
#[derive(Clone)]
pub struct ShippingEstimateView {
    pub fee: Vnd,
    /// `dd/mm/yyyy`, when the carrier gave a date.
    pub expected_delivery: Option<String>,
    pub estimated_total: Vnd,
}

impl ShippingEstimateView {
    fn new(quote: &ShippingQuote, summary: &CheckoutSummary) -> Self {
        Self {
            fee: quote.fee,
            expected_delivery: quote
                .expected_delivery
                .map(|date| date.format("%d/%m/%Y").to_string()),
            estimated_total: summary.estimated_total,
        }
    }
}

/// An order the backend accepted.
#[derive(Clone)]
pub struct PlacedOrderView {
    pub product_name: String,
    pub order_id: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutShowTemplate {
    pub layout: Layout,
    pub checkout: CheckoutLinesView,
    pub voucher: Option<String>,
    pub addresses: Vec<AddressOption>,
    pub logged_in: bool,
}

/// Checkout lines and summary fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/checkout_lines.html")]
pub struct CheckoutLinesTemplate {
    pub checkout: CheckoutLinesView,
}

/// Shipping estimate fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/shipping_estimate.html")]
pub struct ShippingEstimateTemplate {
    pub estimate: ShippingEstimateView,
}

/// Voucher form fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/voucher.html")]
pub struct VoucherTemplate {
    pub voucher: Option<String>,
}

/// Order result fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/order_result.html")]
pub struct OrderResultTemplate {
    pub placed: Vec<PlacedOrderView>,
    pub failure: Option<String>,
}

// =============================================================================
// Forms
// =============================================================================

/// Toggle one line (`index`) or set every line (`all`).
#[derive(Debug, Deserialize)]
pub struct SelectForm {
    pub index: Option<usize>,
    pub all: Option<bool>,
}

/// Either a saved address id or an address typed by name.
#[derive(Debug, Default, Deserialize)]
pub struct ShippingForm {
    pub address_id: Option<String>,
    pub province: Option<String>,
    pub district: Option<String>,
    pub ward: Option<String>,
}

impl ShippingForm {
    /// The typed-in address, when all three levels are filled in.
    #[must_use]
    pub fn typed_area(&self) -> Option<DeliveryArea> {
        let field = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };
        Some(DeliveryArea {
            province: field(&self.province)?,
            district: field(&self.district)?,
            ward: field(&self.ward)?,
        })
    }

    fn address_id(&self) -> Option<AddressId> {
        self.address_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(AddressId::new)
    }
}

#[derive(Debug, Deserialize)]
pub struct VoucherForm {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderForm {
    #[serde(default)]
    pub payment: PaymentMethod,
}

// =============================================================================
// Session Helpers
// =============================================================================

async fn stored_selection(session: &Session) -> Option<Selection> {
    session
        .get::<Selection>(session_keys::CHECKOUT_SELECTION)
        .await
        .ok()
        .flatten()
}

async fn save_selection(
    session: &Session,
    selection: &Selection,
) -> std::result::Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::CHECKOUT_SELECTION, selection)
        .await
}

async fn stored_voucher(session: &Session) -> Option<VoucherCode> {
    session
        .get::<VoucherCode>(session_keys::VOUCHER)
        .await
        .ok()
        .flatten()
}

/// Cart lines and the current selection, with stale lines pruned.
async fn load_checkout(state: &AppState, session: &Session) -> (Vec<CartItem>, Selection) {
    let items = state.cart().load(&SessionCartStorage::new(session)).await;
    let selection = Selection::resolve(stored_selection(session).await, &items);
    (items, selection)
}

async fn saved_addresses(
    state: &AppState,
    session: &Session,
    customer: &CustomerSession,
) -> Vec<Address> {
    match state.marketplace().profile(customer).await {
        Ok(profile) => profile.addresses,
        Err(e) => {
            warn!(error = %e, "Could not load saved addresses");
            expire_on_unauthorized(session, &e).await;
            Vec::new()
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display checkout page.
#[instrument(skip(state, session, customer))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
) -> Result<impl IntoResponse> {
    let (items, selection) = load_checkout(&state, &session).await;
    let checkout = CheckoutLinesView::new(&items, &selection)?;

    let addresses = match &customer {
        Some(customer) => saved_addresses(&state, &session, customer).await,
        None => Vec::new(),
    };

    Ok(CheckoutShowTemplate {
        layout: Layout::new(customer.as_ref()),
        checkout,
        voucher: stored_voucher(&session).await.map(|v| v.to_string()),
        addresses: addresses.iter().map(AddressOption::from).collect(),
        logged_in: customer.is_some(),
    })
}

/// Lines and summary fragment (HTMX, re-fetched on `cart-updated`).
#[instrument(skip(state, session))]
pub async fn lines(State(state): State<AppState>, session: Session) -> Result<impl IntoResponse> {
    let (items, selection) = load_checkout(&state, &session).await;
    Ok(CheckoutLinesTemplate {
        checkout: CheckoutLinesView::new(&items, &selection)?,
    })
}

/// Toggle one line or select/deselect all (HTMX).
#[instrument(skip(state, session))]
pub async fn select(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SelectForm>,
) -> Result<impl IntoResponse> {
    let (items, mut selection) = load_checkout(&state, &session).await;

    match (form.index, form.all) {
        (Some(index), _) => {
            let item = items.get(index).ok_or(CartError::IndexOutOfRange {
                index,
                len: items.len(),
            })?;
            selection.toggle(item);
        }
        (None, Some(all)) => selection.set_all(&items, all),
        (None, None) => {
            return Err(AppError::BadRequest(
                "Choose a line or select all.".to_string(),
            ));
        }
    }

    save_selection(&session, &selection).await?;

    Ok(CheckoutLinesTemplate {
        checkout: CheckoutLinesView::new(&items, &selection)?,
    })
}

/// Quote shipping for a saved address or a typed-in one (HTMX).
#[instrument(skip(state, session, customer))]
pub async fn shipping(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
    Form(form): Form<ShippingForm>,
) -> Result<impl IntoResponse> {
    let area = match (form.address_id(), &customer) {
        (Some(address_id), Some(customer)) => {
            let addresses = saved_addresses(&state, &session, customer).await;
            let address = addresses
                .into_iter()
                .find(|a| a.id == address_id)
                .ok_or_else(|| AppError::NotFound(format!("address {address_id}")))?;
            DeliveryArea {
                province: address.province,
                district: address.district,
                ward: address.ward,
            }
        }
        (Some(_), None) => return Err(CheckoutError::LoginRequired.into()),
        (None, _) => form.typed_area().ok_or_else(|| {
            AppError::BadRequest("Enter province, district and ward.".to_string())
        })?,
    };

    let quote = state.shipping().estimate(&area).await?;

    let (items, selection) = load_checkout(&state, &session).await;
    let summary = summarize(&items, &selection, Some(quote.fee)).map_err(CheckoutError::from)?;

    Ok(ShippingEstimateTemplate {
        estimate: ShippingEstimateView::new(&quote, &summary),
    })
}

/// Apply a voucher code (HTMX). The backend validates it when ordering.
#[instrument(skip(session))]
pub async fn apply_voucher(session: Session, Form(form): Form<VoucherForm>) -> Result<Response> {
    let code = VoucherCode::parse(&form.code)?;
    session.insert(session_keys::VOUCHER, &code).await?;

    Ok((
        Triggers::new().success(format!("Voucher {code} will be applied to your order.")),
        VoucherTemplate {
            voucher: Some(code.to_string()),
        },
    )
        .into_response())
}

/// Remove the voucher code (HTMX).
#[instrument(skip(session))]
pub async fn remove_voucher(session: Session) -> Result<impl IntoResponse> {
    session.remove::<VoucherCode>(session_keys::VOUCHER).await?;
    Ok(VoucherTemplate { voucher: None })
}

/// Place one order per selected line (HTMX).
///
/// Lines the backend accepts leave the cart; unselected lines and lines after
/// a refusal stay.
#[instrument(skip(state, session, customer))]
pub async fn place(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
    Form(form): Form<PlaceOrderForm>,
) -> Result<Response> {
    let customer = customer.ok_or(CheckoutError::LoginRequired)?;
    let (items, selection) = load_checkout(&state, &session).await;
    let voucher = stored_voucher(&session).await;

    let orders = build_orders(&items, &selection, voucher.as_ref(), form.payment)?;
    let outcome = submit_orders(state.marketplace(), &customer, orders).await;

    if outcome.placed.is_empty() {
        let err = outcome
            .failure
            .ok_or_else(|| AppError::Internal("no orders placed and no error".to_string()))?;
        expire_on_unauthorized(&session, &err).await;
        return Err(err.into());
    }

    let purchased: Vec<LineKey> = outcome.placed.iter().map(|(key, _)| key.clone()).collect();
    let remaining = remaining_after_order(&items, &purchased);
    let storage = SessionCartStorage::new(&session);
    if remaining.is_empty() {
        state.cart().clear(&storage).await?;
    } else {
        state.cart().replace(&storage, remaining).await?;
    }
    if outcome.failure.is_none() {
        session.remove::<VoucherCode>(session_keys::VOUCHER).await?;
    }

    add_breadcrumb("checkout", "Orders placed", None);

    let placed: Vec<PlacedOrderView> = outcome
        .placed
        .iter()
        .map(|(key, receipt)| PlacedOrderView {
            product_name: items
                .iter()
                .find(|item| LineKey::from(*item) == *key)
                .map_or_else(|| key.id.to_string(), |item| item.name.clone()),
            order_id: receipt.id.clone(),
        })
        .collect();

    let failure = outcome.failure.map(|e| e.user_message());
    let triggers = match &failure {
        Some(message) => Triggers::new().cart_updated().error(message.clone()),
        None => Triggers::new()
            .cart_updated()
            .success("Your order has been placed."),
    };

    Ok((triggers, OrderResultTemplate { placed, failure }).into_response())
}
