//! Checkout: line selection, totals, voucher code and order submission.
//!
//! Pricing, discounts and payment handling belong to the marketplace backend.
//! This module only sums what the customer selected, validates form input and
//! turns the selection into order requests.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use evmarket_core::{CartItem, MoneyError, OrderType, PaymentMethod, ProductId, VariantId, Vnd};

use crate::marketplace::{
    CustomerSession, MarketplaceClient, MarketplaceError, OrderReceipt, OrderRequest,
};

/// Errors raised while preparing or placing orders.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Please log in to place an order.")]
    LoginRequired,

    #[error("Select at least one product to order.")]
    NothingSelected,

    #[error("Please enter a voucher code.")]
    EmptyVoucher,

    #[error("Order total is too large.")]
    Money(#[from] MoneyError),

    #[error(transparent)]
    Marketplace(#[from] MarketplaceError),
}

/// Identifies a cart line independently of its position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub id: ProductId,
    pub variant_id: VariantId,
}

impl From<&CartItem> for LineKey {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.clone(),
            variant_id: item.variant_id.clone(),
        }
    }
}

/// Which cart lines the customer ticked on the checkout page.
///
/// Stored in the session. A visitor with no stored selection has every line
/// selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    keys: BTreeSet<LineKey>,
}

impl Selection {
    /// Every line in `items`.
    #[must_use]
    pub fn all(items: &[CartItem]) -> Self {
        Self {
            keys: items.iter().map(LineKey::from).collect(),
        }
    }

    /// Nothing selected.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// The stored selection with lines no longer in the cart dropped, or
    /// everything when nothing was stored yet.
    #[must_use]
    pub fn resolve(stored: Option<Self>, items: &[CartItem]) -> Self {
        let Some(mut selection) = stored else {
            return Self::all(items);
        };
        let present: BTreeSet<LineKey> = items.iter().map(LineKey::from).collect();
        selection.keys.retain(|key| present.contains(key));
        selection
    }

    /// Flip one line.
    pub fn toggle(&mut self, item: &CartItem) {
        let key = LineKey::from(item);
        if !self.keys.remove(&key) {
            self.keys.insert(key);
        }
    }

    /// Select every line, or clear the selection when `selected` is false.
    pub fn set_all(&mut self, items: &[CartItem], selected: bool) {
        *self = if selected { Self::all(items) } else { Self::none() };
    }

    #[must_use]
    pub fn is_selected(&self, item: &CartItem) -> bool {
        self.keys.contains(&LineKey::from(item))
    }

    /// Whether every line is selected (false for an empty cart).
    #[must_use]
    pub fn covers(&self, items: &[CartItem]) -> bool {
        !items.is_empty() && items.iter().all(|item| self.is_selected(item))
    }

    /// Selected lines, in cart order.
    #[must_use]
    pub fn pick<'a>(&self, items: &'a [CartItem]) -> Vec<&'a CartItem> {
        items.iter().filter(|item| self.is_selected(item)).collect()
    }
}

/// A voucher code as the customer entered it, tidied up.
///
/// Whether the code is valid and what it discounts is decided by the
/// backend when the order is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherCode(String);

impl VoucherCode {
    /// Trim and upper-case `input`.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::EmptyVoucher`] for blank input.
    pub fn parse(input: &str) -> Result<Self, CheckoutError> {
        let code = input.trim().to_uppercase();
        if code.is_empty() {
            return Err(CheckoutError::EmptyVoucher);
        }
        Ok(Self(code))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VoucherCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Totals shown in the order summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub selected_lines: usize,
    pub subtotal: Vnd,
    /// `None` until an address has been quoted.
    pub shipping_fee: Option<Vnd>,
    /// Subtotal plus the shipping fee when known. Voucher discounts are
    /// applied by the backend and not reflected here.
    pub estimated_total: Vnd,
}

/// Sum `price * quantity` over the selected lines.
///
/// # Errors
///
/// [`MoneyError::Overflow`] if the total does not fit.
pub fn selected_subtotal(items: &[CartItem], selection: &Selection) -> Result<Vnd, MoneyError> {
    selection
        .pick(items)
        .into_iter()
        .map(CartItem::line_total)
        .try_fold(Vnd::ZERO, |total, line| total.checked_add(line?))
}

/// Build the summary for the current selection.
///
/// # Errors
///
/// [`MoneyError::Overflow`] if a total does not fit.
pub fn summarize(
    items: &[CartItem],
    selection: &Selection,
    shipping_fee: Option<Vnd>,
) -> Result<CheckoutSummary, MoneyError> {
    let subtotal = selected_subtotal(items, selection)?;
    let estimated_total = subtotal.checked_add(shipping_fee.unwrap_or(Vnd::ZERO))?;
    Ok(CheckoutSummary {
        selected_lines: selection.pick(items).len(),
        subtotal,
        shipping_fee,
        estimated_total,
    })
}

/// One direct-purchase order request per selected line.
///
/// # Errors
///
/// [`CheckoutError::NothingSelected`] when no line is selected.
pub fn build_orders(
    items: &[CartItem],
    selection: &Selection,
    voucher: Option<&VoucherCode>,
    payment: PaymentMethod,
) -> Result<Vec<(LineKey, OrderRequest)>, CheckoutError> {
    let orders: Vec<_> = selection
        .pick(items)
        .into_iter()
        .map(|item| {
            (
                LineKey::from(item),
                OrderRequest {
                    order_type: OrderType::Direct,
                    product: item.id.clone(),
                    auction: String::new(),
                    voucher: voucher.map(|v| v.as_str().to_string()).unwrap_or_default(),
                    payment,
                },
            )
        })
        .collect();

    if orders.is_empty() {
        return Err(CheckoutError::NothingSelected);
    }
    Ok(orders)
}

/// Cart contents after `purchased` lines were ordered; everything else stays.
#[must_use]
pub fn remaining_after_order(items: &[CartItem], purchased: &[LineKey]) -> Vec<CartItem> {
    items
        .iter()
        .filter(|item| !purchased.contains(&LineKey::from(*item)))
        .cloned()
        .collect()
}

/// Outcome of submitting a batch of orders.
#[derive(Debug)]
pub struct PlacedOrders {
    /// Lines the backend accepted, with its receipt for each.
    pub placed: Vec<(LineKey, OrderReceipt)>,
    /// The error that stopped submission, if any. Lines after it were not sent.
    pub failure: Option<MarketplaceError>,
}

/// Submit orders one at a time, stopping at the first refusal.
///
/// Orders accepted before a failure stay placed; the caller removes exactly
/// those lines from the cart.
#[instrument(skip_all, fields(orders = orders.len()))]
pub async fn submit_orders(
    client: &MarketplaceClient,
    auth: &CustomerSession,
    orders: Vec<(LineKey, OrderRequest)>,
) -> PlacedOrders {
    let mut placed = Vec::with_capacity(orders.len());
    for (key, order) in orders {
        match client.place_order(auth, &order).await {
            Ok(receipt) => {
                info!(product_id = %key.id, order_id = ?receipt.id, "Order placed");
                placed.push((key, receipt));
            }
            Err(e) => {
                warn!(product_id = %key.id, error = %e, "Order refused");
                return PlacedOrders {
                    placed,
                    failure: Some(e),
                };
            }
        }
    }
    PlacedOrders {
        placed,
        failure: None,
    }
}
