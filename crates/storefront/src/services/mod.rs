//! Business rules that sit between the HTTP handlers and the API clients.
//!
//! # Services
//!
//! - `checkout` - Line selection, totals, voucher code, order submission
//! - `auction` - Minimum bid and bid validation
//! - `wallet` - Deposit and withdrawal validation

pub mod auction;
pub mod checkout;
pub mod wallet;
