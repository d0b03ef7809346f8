//! Session keys.
//!
//! Values stored under these keys:
//!
//! - [`keys::CART`] - the cart as raw JSON text, read by the cart store
//! - [`keys::CUSTOMER`] - `CustomerSession` after a successful login
//! - [`keys::CHECKOUT_SELECTION`] - `Selection` of checkout lines
//! - [`keys::VOUCHER`] - `VoucherCode` applied on the checkout page

/// Session keys for per-visitor state.
pub mod keys {
    /// Key for the persisted cart.
    pub const CART: &str = "cart";

    /// Key for the logged-in customer's marketplace session.
    pub const CUSTOMER: &str = "customer";

    /// Key for the checkout line selection.
    pub const CHECKOUT_SELECTION: &str = "checkout_selection";

    /// Key for the voucher code entered at checkout.
    pub const VOUCHER: &str = "voucher";
}
