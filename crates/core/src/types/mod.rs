//! Core types for EV Market.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod money;
pub mod status;

pub use cart::{CartItem, Quantity};
pub use id::*;
pub use money::{MoneyError, Vnd};
pub use status::*;
