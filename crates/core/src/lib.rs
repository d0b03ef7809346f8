//! EV Market Core - Shared types library.
//!
//! This crate provides common types used across all EV Market components:
//! - `storefront` - Public-facing marketplace site (client of the marketplace API)
//! - `cli` - Command-line tools for migrations and operational lookups
//!
//! # Architecture
//!
//! The core crate contains only types and pure arithmetic - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, money, quantities, cart lines and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
