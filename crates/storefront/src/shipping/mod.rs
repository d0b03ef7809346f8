//! Shipping-rate (GHN) API client.
//!
//! Turns a delivery address given by names into the province, district and
//! ward codes the carrier understands, then asks for a fee and an expected
//! delivery date. Master data (provinces, districts, wards) is cached for a
//! day.

mod client;
pub mod types;

pub use client::ShippingClient;
pub use types::{DeliveryArea, District, Parcel, Province, ResolvedArea, ShippingQuote, Ward};

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Errors that can occur when talking to the shipping-rate API.
#[derive(Debug, Error)]
pub enum ShippingError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success code.
    #[error("API error: {code} - {message}")]
    Api { code: i64, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// One of the address names has no match in the carrier's master data.
    #[error("Address not recognised by the carrier: {0}")]
    UnknownArea(String),

    /// Client could not be configured.
    #[error("Configuration error: {0}")]
    Config(String),
}

static ADMIN_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(tỉnh|thành phố)\s+").expect("Invalid regex"));

/// Normalise an administrative name for matching: lower case, without a
/// leading "Tỉnh" or "Thành phố", trimmed.
#[must_use]
pub fn normalize_area_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    ADMIN_PREFIX_RE.replace(&lowered, "").trim().to_string()
}

/// Find the entry whose name matches `wanted` after normalisation.
pub(crate) fn find_by_name<'a, T>(
    entries: &'a [T],
    wanted: &str,
    name_of: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    let wanted = normalize_area_name(wanted);
    entries
        .iter()
        .find(|entry| normalize_area_name(name_of(entry)) == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_prefixes_and_case() {
        assert_eq!(normalize_area_name("Thành phố Hà Nội"), "hà nội");
        assert_eq!(normalize_area_name("  Tỉnh Bình Dương "), "bình dương");
        assert_eq!(normalize_area_name("THÀNH PHỐ Hồ Chí Minh"), "hồ chí minh");
        assert_eq!(normalize_area_name("Quận Cầu Giấy"), "quận cầu giấy");
    }

    #[test]
    fn test_prefix_only_stripped_at_start() {
        assert_eq!(
            normalize_area_name("Khu tỉnh lộ 10"),
            "khu tỉnh lộ 10"
        );
    }

    #[test]
    fn test_find_by_name() {
        let provinces = vec![
            Province {
                id: 201,
                name: "Hà Nội".to_string(),
            },
            Province {
                id: 202,
                name: "Hồ Chí Minh".to_string(),
            },
        ];
        let found = find_by_name(&provinces, "Thành phố Hồ Chí Minh", |p| p.name.as_str());
        assert_eq!(found.map(|p| p.id), Some(202));
        assert!(find_by_name(&provinces, "Đà Nẵng", |p| p.name.as_str()).is_none());
    }
}
