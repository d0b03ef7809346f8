//! Session-held models for the storefront.
//!
//! The marketplace backend owns products, orders and wallets; the storefront
//! keeps only per-visitor state in the session.

pub mod session;

pub use session::keys as session_keys;
